//! CEL (Common Expression Language) lexer, parser, and macro expansion.
//!
//! [`parse`] turns an expression string into a [`SpannedExpr`] AST. The
//! comprehension macros (`map`, `filter`, `all`, `exists`, `existsOne`)
//! are expanded inline into [`ast::Expr::Comprehension`] nodes during
//! parsing; everything else is left for the evaluator.

pub mod ast;
mod lexer;
pub mod macros;
mod parser;

pub use ast::{BinaryOp, Expr, Span, Spanned, SpannedExpr, UnaryOp};

use macros::MacroRegistry;

/// A parse error with source location.
///
/// Parsing fails fast: the first lexical or grammatical problem aborts the
/// parse and no expression is returned.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message} at {}..{}", .span.start, .span.end)]
pub struct ParseError {
    pub message: String,
    pub span: Span,
}

/// Parse a CEL expression from source using the standard macros.
pub fn parse(input: &str) -> Result<SpannedExpr, ParseError> {
    parse_with_macros(input, MacroRegistry::standard())
}

/// Parse a CEL expression from source with a custom macro registry.
pub fn parse_with_macros(
    input: &str,
    macros: MacroRegistry,
) -> Result<SpannedExpr, ParseError> {
    let tokens = lexer::lex(input).map_err(|e| ParseError {
        message: e.message,
        span: e.span,
    })?;

    if tokens.is_empty() {
        return Err(ParseError {
            message: "empty expression".to_string(),
            span: 0..0,
        });
    }

    let mut parser = parser::Parser::with_macros(&tokens, macros);
    let ast = parser.parse_expr()?;

    if !parser.at_end() {
        return Err(ParseError {
            message: "unexpected tokens after expression".to_string(),
            span: parser.peek_span(),
        });
    }

    Ok(ast)
}
