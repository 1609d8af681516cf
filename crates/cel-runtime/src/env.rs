//! The embedding façade: compile and evaluate CEL expressions.

use std::sync::Arc;

use cel_syntax::{parse, ParseError};

use crate::eval::{Activation, EvalError, FunctionTable, Program, StandardFunctions, Value};

/// Either kind of failure surfaced by the one-shot [`Env::eval`].
#[derive(Debug, Clone, thiserror::Error)]
pub enum CelError {
    /// The expression could not be parsed.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),
    /// The expression failed during evaluation.
    #[error("evaluation error: {0}")]
    Eval(#[from] EvalError),
}

/// An evaluation environment: owns the function table and turns source
/// strings into [`Program`]s.
///
/// # Example
///
/// ```
/// use cel_runtime::{Env, MapActivation, Value};
///
/// let env = Env::new();
/// let program = env.compile("age >= 21 && name.startsWith('admin')").unwrap();
///
/// let mut activation = MapActivation::new();
/// activation.insert("age", 25);
/// activation.insert("name", "admin_alice");
///
/// assert_eq!(program.eval(&activation).unwrap(), Value::Bool(true));
/// ```
#[derive(Clone)]
pub struct Env {
    functions: Arc<dyn FunctionTable>,
}

impl Env {
    /// Create an environment with the standard function table.
    pub fn new() -> Self {
        Self {
            functions: Arc::new(StandardFunctions::new()),
        }
    }

    /// Create an environment with a custom function table.
    ///
    /// The table typically handles its own names and delegates the rest to
    /// a held [`StandardFunctions`].
    pub fn with_function_table(table: impl FunctionTable + 'static) -> Self {
        Self {
            functions: Arc::new(table),
        }
    }

    /// Parse an expression into a reusable [`Program`].
    pub fn compile(&self, source: &str) -> Result<Program, ParseError> {
        let ast = parse(source)?;
        Ok(Program::new(Arc::new(ast), self.functions.clone()))
    }

    /// Compile and evaluate in one step.
    pub fn eval(&self, source: &str, activation: &dyn Activation) -> Result<Value, CelError> {
        let program = self.compile(source)?;
        Ok(program.eval(activation)?)
    }
}

impl Default for Env {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Env {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Env").finish_non_exhaustive()
    }
}
