//! Variable bindings for CEL evaluation.
//!
//! The `Activation` trait resolves variable names to values during
//! expression evaluation. The evaluator never mutates an activation;
//! comprehension scopes are layered on top with
//! [`HierarchicalActivation`], so outer bindings reappear unchanged after
//! a macro completes, on success and on error.

use std::collections::HashMap;
use std::sync::Arc;

use super::Value;

/// Trait for resolving variable bindings during evaluation.
pub trait Activation: Send + Sync {
    /// Resolve a variable name to its value.
    ///
    /// Returns `None` if the variable is not defined in this activation.
    fn resolve(&self, name: &str) -> Option<Value>;
}

/// A simple activation backed by a HashMap.
#[derive(Debug, Clone, Default)]
pub struct MapActivation {
    bindings: HashMap<String, Value>,
}

impl MapActivation {
    /// Create a new empty activation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an activation from an iterator of bindings.
    pub fn from_iter(bindings: impl IntoIterator<Item = (String, Value)>) -> Self {
        Self {
            bindings: bindings.into_iter().collect(),
        }
    }

    /// Insert a binding.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.bindings.insert(name.into(), value.into());
    }

    /// Remove a binding.
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.bindings.remove(name)
    }

    /// Get the number of bindings.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl Activation for MapActivation {
    fn resolve(&self, name: &str) -> Option<Value> {
        self.bindings.get(name).cloned()
    }
}

/// A scope overlay that delegates to a parent if a name is not bound
/// locally. Comprehensions use one frame per iteration so iteration
/// variables shadow outer bindings without mutating them.
pub struct HierarchicalActivation<'a> {
    parent: &'a dyn Activation,
    local: HashMap<String, Value>,
}

impl<'a> HierarchicalActivation<'a> {
    /// Create a new overlay on top of a parent.
    pub fn new(parent: &'a dyn Activation) -> Self {
        Self {
            parent,
            local: HashMap::new(),
        }
    }

    /// Add a local binding that shadows the parent.
    pub fn with_binding(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.local.insert(name.into(), value.into());
        self
    }

    /// Insert a local binding.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.local.insert(name.into(), value.into());
    }
}

impl Activation for HierarchicalActivation<'_> {
    fn resolve(&self, name: &str) -> Option<Value> {
        // Check local bindings first, then delegate to parent
        self.local
            .get(name)
            .cloned()
            .or_else(|| self.parent.resolve(name))
    }
}

/// An empty activation with no bindings.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyActivation;

impl EmptyActivation {
    /// Create a new empty activation.
    pub fn new() -> Self {
        Self
    }
}

impl Activation for EmptyActivation {
    fn resolve(&self, _name: &str) -> Option<Value> {
        None
    }
}

impl<T: Activation> Activation for Arc<T> {
    fn resolve(&self, name: &str) -> Option<Value> {
        (**self).resolve(name)
    }
}

impl<T: Activation> Activation for Box<T> {
    fn resolve(&self, name: &str) -> Option<Value> {
        (**self).resolve(name)
    }
}

impl<T: Activation + ?Sized> Activation for &T {
    fn resolve(&self, name: &str) -> Option<Value> {
        (**self).resolve(name)
    }
}
