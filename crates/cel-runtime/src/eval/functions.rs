//! Function dispatch for CEL evaluation.
//!
//! The [`FunctionTable`] trait is the extension point for embedders: two
//! operations, one for global functions and one for methods. Failures are
//! returned as error values. [`StandardFunctions`] implements the CEL
//! standard library; a custom table typically handles its own names and
//! delegates everything else to a held `StandardFunctions`:
//!
//! ```rust
//! use cel_runtime::{FunctionTable, StandardFunctions, Value};
//!
//! struct MyFunctions {
//!     standard: StandardFunctions,
//! }
//!
//! impl FunctionTable for MyFunctions {
//!     fn call(&self, name: &str, args: &[Value]) -> Value {
//!         match name {
//!             "double" => match args {
//!                 [Value::Int(n)] => Value::Int(n * 2),
//!                 _ => Value::error("double() takes one int"),
//!             },
//!             _ => self.standard.call(name, args),
//!         }
//!     }
//!
//!     fn call_method(&self, receiver: &Value, name: &str, args: &[Value]) -> Value {
//!         self.standard.call_method(receiver, name, args)
//!     }
//! }
//! ```

use std::cmp::Ordering;
use std::sync::Arc;

use super::time::{self, TimestampComponent};
use super::{EvalError, MapKey, Timestamp, Value};
use crate::eval::value::format_double;

/// The comprehension macro method names. Well-formed uses are expanded by
/// the parser and evaluated as comprehensions; a call that reaches the
/// function table under one of these names is malformed.
pub const MACRO_METHODS: &[&str] = &["map", "filter", "all", "exists", "existsOne"];

/// Dispatch surface for functions and methods.
///
/// Implementations must be pure with respect to evaluation: the evaluator
/// calls but never mutates the table, and a table shared across threads
/// must be `Send + Sync`.
pub trait FunctionTable: Send + Sync {
    /// Call a global function by name with already-evaluated arguments.
    fn call(&self, name: &str, args: &[Value]) -> Value;

    /// Call a method on a receiver value by name with already-evaluated
    /// arguments.
    fn call_method(&self, receiver: &Value, name: &str, args: &[Value]) -> Value;
}

impl<T: FunctionTable + ?Sized> FunctionTable for &T {
    fn call(&self, name: &str, args: &[Value]) -> Value {
        (**self).call(name, args)
    }

    fn call_method(&self, receiver: &Value, name: &str, args: &[Value]) -> Value {
        (**self).call_method(receiver, name, args)
    }
}

impl<T: FunctionTable + ?Sized> FunctionTable for Arc<T> {
    fn call(&self, name: &str, args: &[Value]) -> Value {
        (**self).call(name, args)
    }

    fn call_method(&self, receiver: &Value, name: &str, args: &[Value]) -> Value {
        (**self).call_method(receiver, name, args)
    }
}

/// The CEL standard library.
///
/// Stateless and thread-safe; a single instance may serve any number of
/// concurrent evaluations.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardFunctions;

impl StandardFunctions {
    /// Create the standard function table.
    pub fn new() -> Self {
        Self
    }
}

impl FunctionTable for StandardFunctions {
    fn call(&self, name: &str, args: &[Value]) -> Value {
        match name {
            "size" => match args {
                [v] => size_of(v),
                _ => Value::error(EvalError::no_matching_overload(name)),
            },
            "int" => match args {
                [v] => convert_to_int(v),
                _ => Value::error(EvalError::no_matching_overload(name)),
            },
            "uint" => match args {
                [v] => convert_to_uint(v),
                _ => Value::error(EvalError::no_matching_overload(name)),
            },
            "double" => match args {
                [v] => convert_to_double(v),
                _ => Value::error(EvalError::no_matching_overload(name)),
            },
            "string" => match args {
                [v] => convert_to_string(v),
                _ => Value::error(EvalError::no_matching_overload(name)),
            },
            "bool" => match args {
                [v] => convert_to_bool(v),
                _ => Value::error(EvalError::no_matching_overload(name)),
            },
            "type" => match args {
                [v] => Value::String(Arc::from(v.kind_name())),
                _ => Value::error(EvalError::no_matching_overload(name)),
            },
            "has" => match args {
                [container, key] => has(container, key),
                _ => Value::error(EvalError::no_matching_overload(name)),
            },
            "matches" => match args {
                [s, pattern] => matches_regex(s, pattern),
                _ => Value::error(EvalError::no_matching_overload(name)),
            },
            "max" => fold_extreme(name, args, Ordering::Greater),
            "min" => fold_extreme(name, args, Ordering::Less),
            "timestamp" => match args {
                [v] => convert_to_timestamp(v),
                _ => Value::error(EvalError::no_matching_overload(name)),
            },
            "duration" => match args {
                [v] => convert_to_duration(v),
                _ => Value::error(EvalError::no_matching_overload(name)),
            },
            _ => Value::error(EvalError::unknown_function(name)),
        }
    }

    fn call_method(&self, receiver: &Value, name: &str, args: &[Value]) -> Value {
        if MACRO_METHODS.contains(&name) {
            return Value::error(EvalError::invalid_argument(format!(
                "{}() takes an iteration variable and an expression",
                name
            )));
        }

        match name {
            "size" => match args {
                [] => size_of(receiver),
                _ => Value::error(EvalError::no_matching_overload(name)),
            },
            "contains" => match (receiver, args) {
                (Value::String(s), [Value::String(sub)]) => {
                    Value::Bool(s.contains(sub.as_ref()))
                }
                (Value::List(items), [needle]) => {
                    Value::Bool(items.iter().any(|item| item == needle))
                }
                _ => Value::error(EvalError::no_matching_overload(name)),
            },
            "startsWith" => match (receiver, args) {
                (Value::String(s), [Value::String(prefix)]) => {
                    Value::Bool(s.starts_with(prefix.as_ref()))
                }
                _ => Value::error(EvalError::no_matching_overload(name)),
            },
            "endsWith" => match (receiver, args) {
                (Value::String(s), [Value::String(suffix)]) => {
                    Value::Bool(s.ends_with(suffix.as_ref()))
                }
                _ => Value::error(EvalError::no_matching_overload(name)),
            },
            "toLowerCase" => match (receiver, args) {
                (Value::String(s), []) => Value::String(Arc::from(s.to_lowercase())),
                _ => Value::error(EvalError::no_matching_overload(name)),
            },
            "toUpperCase" => match (receiver, args) {
                (Value::String(s), []) => Value::String(Arc::from(s.to_uppercase())),
                _ => Value::error(EvalError::no_matching_overload(name)),
            },
            "trim" => match (receiver, args) {
                (Value::String(s), []) => Value::String(Arc::from(s.trim())),
                _ => Value::error(EvalError::no_matching_overload(name)),
            },
            "replace" => match (receiver, args) {
                (Value::String(s), [Value::String(from), Value::String(to)]) => {
                    Value::String(Arc::from(s.replace(from.as_ref(), to.as_ref())))
                }
                _ => Value::error(EvalError::no_matching_overload(name)),
            },
            "split" => match (receiver, args) {
                (Value::String(s), [Value::String(sep)]) => Value::List(Arc::from(
                    s.split(sep.as_ref())
                        .map(|piece| Value::String(Arc::from(piece)))
                        .collect::<Vec<_>>(),
                )),
                _ => Value::error(EvalError::no_matching_overload(name)),
            },
            "getFullYear" => timestamp_accessor(receiver, args, name, TimestampComponent::FullYear),
            "getMonth" => timestamp_accessor(receiver, args, name, TimestampComponent::Month),
            "getDate" => timestamp_accessor(receiver, args, name, TimestampComponent::Date),
            "getHours" => match (receiver, args) {
                (Value::Duration(d), []) => Value::Int(d.total_hours()),
                _ => timestamp_accessor(receiver, args, name, TimestampComponent::Hours),
            },
            "getMinutes" => match (receiver, args) {
                (Value::Duration(d), []) => Value::Int(d.total_minutes()),
                _ => timestamp_accessor(receiver, args, name, TimestampComponent::Minutes),
            },
            "getSeconds" => match (receiver, args) {
                (Value::Duration(d), []) => Value::Int(d.total_seconds()),
                _ => timestamp_accessor(receiver, args, name, TimestampComponent::Seconds),
            },
            _ => Value::error(EvalError::unknown_method(name)),
        }
    }
}

// === Shared builtin implementations ===

/// `size`: string length in Unicode scalar values, bytes length in
/// octets, list/map lengths in entries.
fn size_of(value: &Value) -> Value {
    match value {
        Value::String(s) => Value::Int(s.chars().count() as i64),
        Value::Bytes(b) => Value::Int(b.len() as i64),
        Value::List(l) => Value::Int(l.len() as i64),
        Value::Map(m) => Value::Int(m.len() as i64),
        _ => Value::error(EvalError::no_matching_overload("size")),
    }
}

/// `has(m, k)`: true iff `m` is a map containing key `k`. Never errors.
fn has(container: &Value, key: &Value) -> Value {
    match container {
        Value::Map(map) => match MapKey::from_value(key) {
            Some(k) => Value::Bool(map.contains_key_coerced(&k)),
            None => Value::Bool(false),
        },
        _ => Value::Bool(false),
    }
}

/// `matches(s, pattern)`: true iff the regular expression matches
/// anywhere in the string.
fn matches_regex(s: &Value, pattern: &Value) -> Value {
    match (s, pattern) {
        (Value::String(s), Value::String(pattern)) => {
            match regex::Regex::new(pattern.as_ref()) {
                Ok(re) => Value::Bool(re.is_match(s.as_ref())),
                Err(e) => Value::error(EvalError::invalid_argument(format!(
                    "invalid regex: {}",
                    e
                ))),
            }
        }
        _ => Value::error(EvalError::no_matching_overload("matches")),
    }
}

/// `max`/`min`: fold the arguments with the ordering relation, erring on
/// the first incomparable pair.
fn fold_extreme(name: &str, args: &[Value], keep: Ordering) -> Value {
    let mut iter = args.iter();
    let mut best = match iter.next() {
        Some(first) => first.clone(),
        None => return Value::error(EvalError::no_matching_overload(name)),
    };

    for candidate in iter {
        match candidate.compare(&best) {
            Some(ord) if ord == keep => best = candidate.clone(),
            Some(_) => {}
            None => return Value::error(EvalError::no_matching_overload(name)),
        }
    }

    best
}

fn timestamp_accessor(
    receiver: &Value,
    args: &[Value],
    name: &str,
    component: TimestampComponent,
) -> Value {
    match (receiver, args) {
        (Value::Timestamp(ts), []) => match ts.to_datetime_utc() {
            Some(dt) => Value::Int(component.extract(&dt)),
            None => Value::error(EvalError::invalid_argument("timestamp out of range")),
        },
        _ => Value::error(EvalError::no_matching_overload(name)),
    }
}

// === Conversions ===

fn convert_to_int(value: &Value) -> Value {
    match value {
        Value::Int(i) => Value::Int(*i),
        Value::UInt(u) => {
            if *u > i64::MAX as u64 {
                Value::error(EvalError::overflow("uint to int overflow"))
            } else {
                Value::Int(*u as i64)
            }
        }
        // Truncates toward zero
        Value::Double(d) => Value::Int(*d as i64),
        Value::String(s) => s
            .parse::<i64>()
            .map(Value::Int)
            .unwrap_or_else(|_| Value::error(EvalError::invalid_conversion("string", "int"))),
        Value::Bool(b) => Value::Int(*b as i64),
        Value::Timestamp(t) => Value::Int(t.seconds),
        _ => Value::error(EvalError::invalid_conversion(value.kind_name(), "int")),
    }
}

fn convert_to_uint(value: &Value) -> Value {
    match value {
        Value::UInt(u) => Value::UInt(*u),
        Value::Int(i) => {
            if *i < 0 {
                Value::error(EvalError::overflow("negative int to uint"))
            } else {
                Value::UInt(*i as u64)
            }
        }
        Value::Double(d) => {
            if *d < 0.0 {
                Value::error(EvalError::overflow("negative double to uint"))
            } else {
                Value::UInt(*d as u64)
            }
        }
        Value::String(s) => s
            .parse::<u64>()
            .map(Value::UInt)
            .unwrap_or_else(|_| Value::error(EvalError::invalid_conversion("string", "uint"))),
        Value::Bool(b) => Value::UInt(*b as u64),
        _ => Value::error(EvalError::invalid_conversion(value.kind_name(), "uint")),
    }
}

fn convert_to_double(value: &Value) -> Value {
    match value {
        Value::Double(d) => Value::Double(*d),
        Value::Int(i) => Value::Double(*i as f64),
        Value::UInt(u) => Value::Double(*u as f64),
        Value::String(s) => s
            .parse::<f64>()
            .map(Value::Double)
            .unwrap_or_else(|_| Value::error(EvalError::invalid_conversion("string", "double"))),
        _ => Value::error(EvalError::invalid_conversion(value.kind_name(), "double")),
    }
}

fn convert_to_string(value: &Value) -> Value {
    match value {
        Value::String(s) => Value::String(s.clone()),
        Value::Bytes(b) => match std::str::from_utf8(b) {
            Ok(s) => Value::String(Arc::from(s)),
            Err(_) => Value::error(EvalError::invalid_conversion("bytes", "string")),
        },
        Value::Double(d) => Value::String(Arc::from(format_double(*d))),
        Value::Timestamp(t) => Value::String(Arc::from(time::format_timestamp(t))),
        Value::Duration(d) => Value::String(Arc::from(time::format_duration(d))),
        other => Value::String(Arc::from(other.to_text())),
    }
}

/// `bool`: truthiness conversion. Numbers are non-zero, strings, bytes,
/// and collections are non-empty, null is false.
fn convert_to_bool(value: &Value) -> Value {
    match value {
        Value::Bool(b) => Value::Bool(*b),
        Value::Int(i) => Value::Bool(*i != 0),
        Value::UInt(u) => Value::Bool(*u != 0),
        Value::Double(d) => Value::Bool(*d != 0.0),
        Value::String(s) => Value::Bool(!s.is_empty()),
        Value::Bytes(b) => Value::Bool(!b.is_empty()),
        Value::List(l) => Value::Bool(!l.is_empty()),
        Value::Map(m) => Value::Bool(!m.is_empty()),
        Value::Null => Value::Bool(false),
        _ => Value::error(EvalError::invalid_conversion(value.kind_name(), "bool")),
    }
}

fn convert_to_timestamp(value: &Value) -> Value {
    match value {
        Value::Timestamp(t) => Value::Timestamp(*t),
        Value::String(s) => match time::parse_timestamp(s) {
            Ok(ts) => Value::Timestamp(ts),
            Err(e) => Value::error(EvalError::invalid_argument(e)),
        },
        Value::Int(i) => {
            let ts = Timestamp::from_seconds(*i);
            if ts.is_valid() {
                Value::Timestamp(ts)
            } else {
                Value::error(EvalError::invalid_argument(
                    "timestamp out of range: must be between year 0001 and 9999",
                ))
            }
        }
        _ => Value::error(EvalError::invalid_conversion(
            value.kind_name(),
            "timestamp",
        )),
    }
}

fn convert_to_duration(value: &Value) -> Value {
    match value {
        Value::Duration(d) => Value::Duration(*d),
        Value::String(s) => match time::parse_duration(s) {
            Ok(d) => Value::Duration(d),
            Err(e) => Value::error(EvalError::invalid_argument(e)),
        },
        Value::Int(i) => {
            let d = super::Duration::from_seconds(*i);
            if d.is_valid() {
                Value::Duration(d)
            } else {
                Value::error(EvalError::invalid_argument(
                    "duration out of range: must be within approximately 10000 years",
                ))
            }
        }
        _ => Value::error(EvalError::invalid_conversion(
            value.kind_name(),
            "duration",
        )),
    }
}
