//! Macro expansion for the CEL comprehension methods.
//!
//! The five comprehension macros (`map`, `filter`, `all`, `exists`,
//! `existsOne`) are syntactic transformations that expand at parse time.
//! A call like `list.all(x, cond)` becomes a [`Expr::Comprehension`] node;
//! the argument expressions are captured unevaluated and re-evaluated per
//! element by the evaluator.
//!
//! Macros are keyed by `name:arg_count`. A macro whose first argument is
//! not a bare identifier cannot be expanded; the parser then keeps the
//! original call with its macro flag set, deferring the failure to
//! evaluation time.

use std::collections::HashMap;

use crate::ast::{BinaryOp, Expr, Span, Spanned, SpannedExpr, UnaryOp};

/// Accumulator variable name used in comprehension expansions.
const ACCU_VAR: &str = "__result__";

/// Result of macro expansion.
#[derive(Debug)]
pub enum MacroExpansion {
    /// Macro was successfully expanded to this expression.
    Expanded(SpannedExpr),
    /// Macro signature matched but the arguments are malformed (the first
    /// argument must be a bare identifier). The string is an error message.
    Error(String),
}

/// Type alias for macro expander functions.
///
/// Receives the span of the entire call, the receiver expression, and the
/// argument expressions (unevaluated sub-ASTs).
pub type MacroExpander =
    fn(span: Span, receiver: SpannedExpr, args: Vec<SpannedExpr>) -> MacroExpansion;

/// Definition of a single macro.
#[derive(Clone)]
pub struct Macro {
    /// The macro name (e.g., "all", "map").
    pub name: &'static str,
    /// The exact number of arguments the macro takes.
    pub arg_count: usize,
    /// The expansion function.
    pub expander: MacroExpander,
}

impl Macro {
    /// Create a new macro definition.
    pub const fn new(name: &'static str, arg_count: usize, expander: MacroExpander) -> Self {
        Self {
            name,
            arg_count,
            expander,
        }
    }

    /// Generate the lookup key for this macro.
    fn key(&self) -> String {
        make_key(self.name, self.arg_count)
    }
}

impl std::fmt::Debug for Macro {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Macro")
            .field("name", &self.name)
            .field("arg_count", &self.arg_count)
            .finish_non_exhaustive()
    }
}

fn make_key(name: &str, arg_count: usize) -> String {
    format!("{}:{}", name, arg_count)
}

/// Registry of receiver-style macros.
#[derive(Debug, Clone)]
pub struct MacroRegistry {
    macros: HashMap<String, Macro>,
}

impl Default for MacroRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl MacroRegistry {
    /// Create an empty macro registry.
    pub fn new() -> Self {
        Self {
            macros: HashMap::new(),
        }
    }

    /// Create a registry with the standard CEL comprehension macros.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        for macro_def in STANDARD_MACROS {
            registry.register(macro_def.clone());
        }
        registry
    }

    /// Register a macro in the registry.
    pub fn register(&mut self, macro_def: Macro) {
        self.macros.insert(macro_def.key(), macro_def);
    }

    /// Look up a macro by name and argument count.
    pub fn lookup(&self, name: &str, arg_count: usize) -> Option<&Macro> {
        self.macros.get(&make_key(name, arg_count))
    }

    /// Check if the registry contains a macro with the given name at any arity.
    pub fn contains(&self, name: &str) -> bool {
        self.macros.values().any(|m| m.name == name)
    }

    /// Get the number of registered macros.
    pub fn len(&self) -> usize {
        self.macros.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.macros.is_empty()
    }
}

/// Standard CEL comprehension macros.
pub static STANDARD_MACROS: &[Macro] = &[
    Macro::new("map", 2, expand_map),
    Macro::new("filter", 2, expand_filter),
    Macro::new("all", 2, expand_all),
    Macro::new("exists", 2, expand_exists),
    Macro::new("existsOne", 2, expand_exists_one),
];

// === Node construction helpers ===
//
// Synthetic nodes carry the span of the macro call that produced them.

fn ident(name: &str, span: &Span) -> SpannedExpr {
    Spanned::new(Expr::Ident(name.to_string()), span.clone())
}

fn accu(span: &Span) -> SpannedExpr {
    ident(ACCU_VAR, span)
}

fn bool_lit(value: bool, span: &Span) -> SpannedExpr {
    Spanned::new(Expr::Bool(value), span.clone())
}

fn int_lit(value: i64, span: &Span) -> SpannedExpr {
    Spanned::new(Expr::Int(value), span.clone())
}

fn empty_list(span: &Span) -> SpannedExpr {
    Spanned::new(Expr::List(Vec::new()), span.clone())
}

fn singleton_list(item: SpannedExpr, span: &Span) -> SpannedExpr {
    Spanned::new(Expr::List(vec![item]), span.clone())
}

fn binary(op: BinaryOp, left: SpannedExpr, right: SpannedExpr, span: &Span) -> SpannedExpr {
    Spanned::new(
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        },
        span.clone(),
    )
}

fn unary(op: UnaryOp, expr: SpannedExpr, span: &Span) -> SpannedExpr {
    Spanned::new(
        Expr::Unary {
            op,
            expr: Box::new(expr),
        },
        span.clone(),
    )
}

fn ternary(
    cond: SpannedExpr,
    then_expr: SpannedExpr,
    else_expr: SpannedExpr,
    span: &Span,
) -> SpannedExpr {
    Spanned::new(
        Expr::Ternary {
            cond: Box::new(cond),
            then_expr: Box::new(then_expr),
            else_expr: Box::new(else_expr),
        },
        span.clone(),
    )
}

/// `pred == true`: strict truth test. Never errors on a non-bool predicate
/// value, which simply counts as "not true"; errors raised while
/// evaluating the predicate itself still propagate.
fn is_true(pred: SpannedExpr, span: &Span) -> SpannedExpr {
    binary(BinaryOp::Eq, pred, bool_lit(true, span), span)
}

fn comprehension(
    iter_var: String,
    iter_range: SpannedExpr,
    accu_init: SpannedExpr,
    loop_condition: SpannedExpr,
    loop_step: SpannedExpr,
    result: SpannedExpr,
    span: Span,
) -> MacroExpansion {
    MacroExpansion::Expanded(Spanned::new(
        Expr::Comprehension {
            iter_var,
            iter_range: Box::new(iter_range),
            accu_var: ACCU_VAR.to_string(),
            accu_init: Box::new(accu_init),
            loop_condition: Box::new(loop_condition),
            loop_step: Box::new(loop_step),
            result: Box::new(result),
        },
        span,
    ))
}

/// Extract the iteration variable name from the first macro argument.
fn iter_var_name(name: &str, args: &[SpannedExpr]) -> Result<String, MacroExpansion> {
    match &args[0].node {
        Expr::Ident(var) => Ok(var.clone()),
        _ => Err(MacroExpansion::Error(format!(
            "{}() requires an identifier as its first argument",
            name
        ))),
    }
}

// === Expanders ===

/// `e.map(x, t)` - transform each element, collecting the results.
fn expand_map(span: Span, receiver: SpannedExpr, mut args: Vec<SpannedExpr>) -> MacroExpansion {
    let var = match iter_var_name("map", &args) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let transform = args.remove(1);

    let step = binary(
        BinaryOp::Add,
        accu(&span),
        singleton_list(transform, &span),
        &span,
    );
    comprehension(
        var,
        receiver,
        empty_list(&span),
        bool_lit(true, &span),
        step,
        accu(&span),
        span,
    )
}

/// `e.filter(x, p)` - keep the elements whose predicate is strictly true.
fn expand_filter(span: Span, receiver: SpannedExpr, mut args: Vec<SpannedExpr>) -> MacroExpansion {
    let var = match iter_var_name("filter", &args) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let pred = args.remove(1);

    let step = ternary(
        is_true(pred, &span),
        binary(
            BinaryOp::Add,
            accu(&span),
            singleton_list(ident(&var, &span), &span),
            &span,
        ),
        accu(&span),
        &span,
    );
    comprehension(
        var,
        receiver,
        empty_list(&span),
        bool_lit(true, &span),
        step,
        accu(&span),
        span,
    )
}

/// `e.all(x, p)` - true iff every predicate is strictly true.
/// Stops iterating after the first element that is not.
fn expand_all(span: Span, receiver: SpannedExpr, mut args: Vec<SpannedExpr>) -> MacroExpansion {
    let var = match iter_var_name("all", &args) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let pred = args.remove(1);

    let step = binary(BinaryOp::And, accu(&span), is_true(pred, &span), &span);
    comprehension(
        var,
        receiver,
        bool_lit(true, &span),
        accu(&span),
        step,
        accu(&span),
        span,
    )
}

/// `e.exists(x, p)` - true iff some predicate is strictly true.
/// Stops iterating after the first element that is.
fn expand_exists(span: Span, receiver: SpannedExpr, mut args: Vec<SpannedExpr>) -> MacroExpansion {
    let var = match iter_var_name("exists", &args) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let pred = args.remove(1);

    let step = binary(BinaryOp::Or, accu(&span), is_true(pred, &span), &span);
    comprehension(
        var,
        receiver,
        bool_lit(false, &span),
        unary(UnaryOp::Not, accu(&span), &span),
        step,
        accu(&span),
        span,
    )
}

/// `e.existsOne(x, p)` - true iff exactly one predicate is strictly true.
/// Stops counting once the count exceeds one.
fn expand_exists_one(
    span: Span,
    receiver: SpannedExpr,
    mut args: Vec<SpannedExpr>,
) -> MacroExpansion {
    let var = match iter_var_name("existsOne", &args) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let pred = args.remove(1);

    let step = ternary(
        is_true(pred, &span),
        binary(BinaryOp::Add, accu(&span), int_lit(1, &span), &span),
        accu(&span),
        &span,
    );
    comprehension(
        var,
        receiver,
        int_lit(0, &span),
        binary(BinaryOp::Le, accu(&span), int_lit(1, &span), &span),
        step,
        binary(BinaryOp::Eq, accu(&span), int_lit(1, &span), &span),
        span,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recv(span: Span) -> SpannedExpr {
        Spanned::new(Expr::Ident("xs".to_string()), span)
    }

    fn args_with_ident(span: &Span) -> Vec<SpannedExpr> {
        vec![
            ident("x", span),
            binary(BinaryOp::Gt, ident("x", span), int_lit(0, span), span),
        ]
    }

    #[test]
    fn standard_registry_contents() {
        let registry = MacroRegistry::standard();
        assert_eq!(registry.len(), 5);
        for name in ["map", "filter", "all", "exists", "existsOne"] {
            assert!(registry.contains(name), "missing macro {}", name);
            assert!(registry.lookup(name, 2).is_some());
            assert!(registry.lookup(name, 1).is_none());
            assert!(registry.lookup(name, 3).is_none());
        }
    }

    #[test]
    fn expand_produces_comprehension() {
        let span = 0..10;
        let registry = MacroRegistry::standard();
        let m = registry.lookup("all", 2).unwrap();

        match (m.expander)(span.clone(), recv(span.clone()), args_with_ident(&span)) {
            MacroExpansion::Expanded(expr) => match expr.node {
                Expr::Comprehension {
                    iter_var, accu_var, ..
                } => {
                    assert_eq!(iter_var, "x");
                    assert_eq!(accu_var, ACCU_VAR);
                }
                other => panic!("expected comprehension, got {:?}", other),
            },
            MacroExpansion::Error(e) => panic!("unexpected expansion error: {}", e),
        }
    }

    #[test]
    fn expand_rejects_non_identifier_first_argument() {
        let span = 0..10;
        let registry = MacroRegistry::standard();
        let m = registry.lookup("map", 2).unwrap();

        let args = vec![int_lit(1, &span), int_lit(2, &span)];
        match (m.expander)(span.clone(), recv(span), args) {
            MacroExpansion::Error(msg) => assert!(msg.contains("identifier")),
            MacroExpansion::Expanded(_) => panic!("expected expansion error"),
        }
    }
}
