//! CEL evaluation engine.
//!
//! - `Value` represents runtime values
//! - `Activation` provides variable bindings
//! - `FunctionTable` dispatches functions and methods
//! - `Program` wraps a compiled expression with its function table
//! - `Evaluator` performs tree-walking evaluation

mod activation;
mod error;
mod evaluator;
mod functions;
mod program;
mod time;
mod value;

pub use activation::{Activation, EmptyActivation, HierarchicalActivation, MapActivation};
pub use error::{EvalError, EvalErrorKind};
pub use evaluator::Evaluator;
pub use functions::{FunctionTable, StandardFunctions, MACRO_METHODS};
pub use program::Program;
pub use value::{Duration, MapKey, Timestamp, Value, ValueError, ValueMap};
