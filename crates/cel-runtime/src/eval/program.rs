//! Compiled CEL program ready for evaluation.
//!
//! A `Program` is a cached AST plus a reference to the function table. It
//! may be evaluated any number of times against different bindings, and
//! shared freely across threads.

use std::sync::Arc;

use cel_syntax::SpannedExpr;

use super::{Activation, EmptyActivation, EvalError, Evaluator, FunctionTable, Value};

/// A compiled CEL program.
#[derive(Clone)]
pub struct Program {
    ast: Arc<SpannedExpr>,
    functions: Arc<dyn FunctionTable>,
}

impl Program {
    /// Create a new program from an AST and function table.
    pub fn new(ast: Arc<SpannedExpr>, functions: Arc<dyn FunctionTable>) -> Self {
        Self { ast, functions }
    }

    /// Get the AST for this program.
    pub fn ast(&self) -> &SpannedExpr {
        &self.ast
    }

    /// Evaluate the program with the given variable bindings.
    pub fn eval(&self, activation: &dyn Activation) -> Result<Value, EvalError> {
        let evaluator = Evaluator::new(activation, &*self.functions);
        match evaluator.eval(&self.ast) {
            Value::Error(e) => Err((*e).clone()),
            value => Ok(value),
        }
    }

    /// Evaluate the program with no variable bindings.
    pub fn eval_empty(&self) -> Result<Value, EvalError> {
        self.eval(&EmptyActivation)
    }
}

impl std::fmt::Debug for Program {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Program").field("ast", &self.ast).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::{MapActivation, StandardFunctions};
    use cel_syntax::parse;

    fn create_program(source: &str) -> Program {
        let ast = parse(source).expect("parse failed");
        Program::new(Arc::new(ast), Arc::new(StandardFunctions::new()))
    }

    #[test]
    fn eval_literal() {
        let program = create_program("42");
        assert_eq!(program.eval_empty().unwrap(), Value::Int(42));
    }

    #[test]
    fn eval_with_variables() {
        let program = create_program("x + y");
        let mut activation = MapActivation::new();
        activation.insert("x", Value::Int(1));
        activation.insert("y", Value::Int(2));
        assert_eq!(program.eval(&activation).unwrap(), Value::Int(3));
    }

    #[test]
    fn reuse_program_across_bindings() {
        let program = create_program("x * 2");

        let mut act1 = MapActivation::new();
        act1.insert("x", Value::Int(5));
        assert_eq!(program.eval(&act1).unwrap(), Value::Int(10));

        let mut act2 = MapActivation::new();
        act2.insert("x", Value::Int(21));
        assert_eq!(program.eval(&act2).unwrap(), Value::Int(42));
    }

    #[test]
    fn errors_surface_as_err() {
        let program = create_program("1 / 0");
        assert!(program.eval_empty().is_err());

        let program = create_program("unbound");
        let err = program.eval_empty().unwrap_err();
        assert!(err.message.contains("unbound"));
    }

    #[test]
    fn program_is_shareable_across_threads() {
        let program = create_program("x + 1");

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let program = program.clone();
                std::thread::spawn(move || {
                    let mut activation = MapActivation::new();
                    activation.insert("x", Value::Int(i));
                    program.eval(&activation).unwrap()
                })
            })
            .collect();

        for (i, handle) in handles.into_iter().enumerate() {
            assert_eq!(handle.join().unwrap(), Value::Int(i as i64 + 1));
        }
    }
}
