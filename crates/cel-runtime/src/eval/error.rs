//! Errors produced while evaluating an expression.
//!
//! During the tree walk these travel wrapped in `Value::Error`; the
//! `Program` boundary unwraps the final error value into `Result::Err`.
//! Propagation is strict: the first failure aborts the evaluation and
//! surfaces unchanged.

use std::fmt;

/// Why an evaluation failed.
///
/// One variant per failure mode the evaluator and the standard function
/// table can hit. The paired message in [`EvalError`] names the offending
/// identifier, index, or kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvalErrorKind {
    /// Zero divisor in `/`.
    DivisionByZero,
    /// Zero divisor in `%`.
    ModuloByZero,
    /// Checked integer arithmetic left the 64-bit range.
    Overflow,
    /// An operand had a kind the operation does not accept.
    TypeMismatch,
    /// A name had no binding in the activation.
    UnknownIdentifier,
    /// A global function name the table does not recognize.
    UnknownFunction,
    /// A method name the table does not recognize on any receiver.
    UnknownMethod,
    /// A list or string index fell outside the collection.
    IndexOutOfBounds,
    /// A map lookup found no entry for the key.
    KeyNotFound,
    /// A malformed argument: bad regex, negative repeat count, or a
    /// macro whose first argument is not an identifier.
    InvalidArgument,
    /// No overload of a function or operator accepts these operand kinds.
    NoMatchingOverload,
    /// A value cannot be converted to the requested kind.
    InvalidConversion,
    /// A state the evaluator should never reach.
    Internal,
}

/// An evaluation failure: a [`EvalErrorKind`] plus a human-readable
/// message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvalError {
    /// The error message.
    pub message: String,
    /// The kind of error.
    pub kind: EvalErrorKind,
}

impl EvalError {
    /// Build an error from a kind and message.
    pub fn new(kind: EvalErrorKind, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind,
        }
    }

    /// Zero divisor in a division.
    pub fn division_by_zero() -> Self {
        Self::new(EvalErrorKind::DivisionByZero, "cannot divide by zero")
    }

    /// Zero divisor in a modulo.
    pub fn modulo_by_zero() -> Self {
        Self::new(EvalErrorKind::ModuloByZero, "cannot take modulo by zero")
    }

    /// Integer arithmetic overflow; `operation` names the failed op.
    pub fn overflow(operation: impl Into<String>) -> Self {
        Self::new(EvalErrorKind::Overflow, operation)
    }

    /// An operand kind the operation does not accept.
    pub fn type_mismatch(expected: &str, actual: &str) -> Self {
        Self::new(
            EvalErrorKind::TypeMismatch,
            format!("expected {}, found {}", expected, actual),
        )
    }

    /// A variable with no binding in the activation.
    pub fn unknown_identifier(name: &str) -> Self {
        Self::new(
            EvalErrorKind::UnknownIdentifier,
            format!("undefined variable '{}'", name),
        )
    }

    /// A global function the table does not recognize.
    pub fn unknown_function(name: &str) -> Self {
        Self::new(
            EvalErrorKind::UnknownFunction,
            format!("no such function '{}'", name),
        )
    }

    /// A method the table does not recognize.
    pub fn unknown_method(name: &str) -> Self {
        Self::new(
            EvalErrorKind::UnknownMethod,
            format!("no such method '{}'", name),
        )
    }

    /// A list or string index outside the collection.
    pub fn index_out_of_bounds(index: i64, len: usize) -> Self {
        Self::new(
            EvalErrorKind::IndexOutOfBounds,
            format!("index {} is out of range for length {}", index, len),
        )
    }

    /// A map lookup that found no entry.
    pub fn key_not_found(key: &str) -> Self {
        Self::new(EvalErrorKind::KeyNotFound, format!("no such key: {}", key))
    }

    /// A malformed argument.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(EvalErrorKind::InvalidArgument, message)
    }

    /// Operand kinds no overload accepts.
    pub fn no_matching_overload(func: &str) -> Self {
        Self::new(
            EvalErrorKind::NoMatchingOverload,
            format!("no overload of '{}' accepts these operands", func),
        )
    }

    /// A conversion the target kind does not support.
    pub fn invalid_conversion(from: &str, to: &str) -> Self {
        Self::new(
            EvalErrorKind::InvalidConversion,
            format!("{} value cannot be converted to {}", from, to),
        )
    }

    /// A state the evaluator should never reach.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(EvalErrorKind::Internal, message)
    }
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for EvalError {}

impl From<&str> for EvalError {
    fn from(message: &str) -> Self {
        Self::new(EvalErrorKind::Internal, message)
    }
}

impl From<String> for EvalError {
    fn from(message: String) -> Self {
        Self::new(EvalErrorKind::Internal, message)
    }
}
