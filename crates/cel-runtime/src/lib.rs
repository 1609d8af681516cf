//! CEL (Common Expression Language) evaluation engine and standard library.
//!
//! A non-Turing-complete, side-effect-free expression language for policy
//! checks, filters, and predicates. The embedder supplies named bindings
//! and, optionally, a custom function table; this crate parses expression
//! strings (via `cel-syntax`) and evaluates them to dynamically typed
//! values.
//!
//! # Quick Start
//!
//! ```
//! use cel_runtime::{Env, MapActivation, Value};
//!
//! let env = Env::new();
//! let program = env.compile("[1, 2, 3].filter(x, x > limit)").unwrap();
//!
//! let mut activation = MapActivation::new();
//! activation.insert("limit", 1);
//!
//! assert_eq!(program.eval(&activation).unwrap(), Value::list([2, 3]));
//! ```
//!
//! # Architecture
//!
//! - `cel-syntax` turns source text into an AST, expanding the
//!   comprehension macros inline
//! - [`eval`] walks the AST against an [`Activation`] and a
//!   [`FunctionTable`]
//! - [`Env`] and [`Program`] are the thin embedding façade

mod env;
pub mod eval;

pub use env::{CelError, Env};
pub use eval::{
    Activation, Duration, EmptyActivation, EvalError, EvalErrorKind, Evaluator, FunctionTable,
    HierarchicalActivation, MapActivation, MapKey, Program, StandardFunctions, Timestamp, Value,
    ValueError, ValueMap,
};

// Re-export the parsing surface for embedders that work with raw ASTs.
pub use cel_syntax::{parse, ParseError, Span, Spanned, SpannedExpr};
