//! CEL parser - hand-written recursive descent with inline macro expansion.

use crate::ast::{Expr, Spanned, SpannedExpr};
use crate::lexer::{Span, SpannedToken, Token};
use crate::macros::{MacroExpansion, MacroRegistry};
use crate::ParseError;

/// Recursive descent parser for CEL expressions.
pub struct Parser<'a> {
    tokens: &'a [SpannedToken],
    pos: usize,
    /// Registry of macros for expansion.
    macros: MacroRegistry,
}

impl<'a> Parser<'a> {
    /// Create a new parser for the given token stream with standard macros.
    pub fn new(tokens: &'a [SpannedToken]) -> Self {
        Self::with_macros(tokens, MacroRegistry::standard())
    }

    /// Create a new parser with a custom macro registry.
    pub fn with_macros(tokens: &'a [SpannedToken], macros: MacroRegistry) -> Self {
        Self {
            tokens,
            pos: 0,
            macros,
        }
    }

    // === Utility Methods ===

    /// Peek at the current token without consuming it.
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    /// Get the span of the current token.
    pub fn peek_span(&self) -> Span {
        self.tokens
            .get(self.pos)
            .map(|(_, s)| s.clone())
            .unwrap_or_else(|| self.eof_span())
    }

    /// Get the span representing end-of-input.
    fn eof_span(&self) -> Span {
        let end = self.tokens.last().map(|(_, s)| s.end).unwrap_or(0);
        end..end
    }

    /// Advance to the next token, returning the current one.
    fn advance(&mut self) -> Option<&SpannedToken> {
        let token = self.tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    /// Check if the current token matches the given token.
    fn check(&self, token: &Token) -> bool {
        self.peek().map_or(false, |t| t == token)
    }

    /// Consume the current token if it matches, returning true if consumed.
    fn match_token(&mut self, token: &Token) -> bool {
        if self.check(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Expect a specific token, returning an error if not found.
    fn expect(&mut self, token: &Token) -> Result<Span, ParseError> {
        if self.check(token) {
            let span = self.peek_span();
            self.advance();
            Ok(span)
        } else {
            Err(ParseError {
                message: format!("expected '{}', found {:?}", token, self.peek()),
                span: self.peek_span(),
            })
        }
    }

    /// Check if we've reached the end of the token stream.
    pub fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    // === Expression Parsing ===

    /// Parse an expression (entry point).
    pub fn parse_expr(&mut self) -> Result<SpannedExpr, ParseError> {
        self.parse_ternary()
    }

    /// Parse ternary conditional: expr ? expr : expr (right-associative).
    fn parse_ternary(&mut self) -> Result<SpannedExpr, ParseError> {
        let cond = self.parse_or()?;

        if self.match_token(&Token::Question) {
            let then_expr = self.parse_expr()?;
            self.expect(&Token::Colon)?;
            let else_expr = self.parse_expr()?;
            let span = cond.span.start..else_expr.span.end;

            Ok(Spanned::new(
                Expr::Ternary {
                    cond: Box::new(cond),
                    then_expr: Box::new(then_expr),
                    else_expr: Box::new(else_expr),
                },
                span,
            ))
        } else {
            Ok(cond)
        }
    }

    /// Parse logical OR: expr || expr
    fn parse_or(&mut self) -> Result<SpannedExpr, ParseError> {
        use crate::ast::BinaryOp;

        let mut left = self.parse_and()?;

        while self.match_token(&Token::Or) {
            let right = self.parse_and()?;
            let span = left.span.start..right.span.end;
            left = Spanned::new(
                Expr::Binary {
                    op: BinaryOp::Or,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                span,
            );
        }

        Ok(left)
    }

    /// Parse logical AND: expr && expr
    fn parse_and(&mut self) -> Result<SpannedExpr, ParseError> {
        use crate::ast::BinaryOp;

        let mut left = self.parse_relation()?;

        while self.match_token(&Token::And) {
            let right = self.parse_relation()?;
            let span = left.span.start..right.span.end;
            left = Spanned::new(
                Expr::Binary {
                    op: BinaryOp::And,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                span,
            );
        }

        Ok(left)
    }

    /// Parse relational operators: == != < <= > >= in (left-associative chain).
    fn parse_relation(&mut self) -> Result<SpannedExpr, ParseError> {
        let mut left = self.parse_addition()?;

        while let Some(op) = self.peek_relop() {
            self.advance();
            let right = self.parse_addition()?;
            let span = left.span.start..right.span.end;
            left = Spanned::new(
                Expr::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                span,
            );
        }

        Ok(left)
    }

    /// Check if the current token is a relational operator.
    fn peek_relop(&self) -> Option<crate::ast::BinaryOp> {
        use crate::ast::BinaryOp;

        match self.peek()? {
            Token::EqEq => Some(BinaryOp::Eq),
            Token::Ne => Some(BinaryOp::Ne),
            Token::Lt => Some(BinaryOp::Lt),
            Token::Le => Some(BinaryOp::Le),
            Token::Gt => Some(BinaryOp::Gt),
            Token::Ge => Some(BinaryOp::Ge),
            Token::In => Some(BinaryOp::In),
            _ => None,
        }
    }

    /// Parse additive operators: + -
    fn parse_addition(&mut self) -> Result<SpannedExpr, ParseError> {
        use crate::ast::BinaryOp;

        let mut left = self.parse_mult()?;

        loop {
            let op = if self.match_token(&Token::Plus) {
                BinaryOp::Add
            } else if self.match_token(&Token::Minus) {
                BinaryOp::Sub
            } else {
                break;
            };

            let right = self.parse_mult()?;
            let span = left.span.start..right.span.end;
            left = Spanned::new(
                Expr::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                span,
            );
        }

        Ok(left)
    }

    /// Parse multiplicative operators: * / %
    fn parse_mult(&mut self) -> Result<SpannedExpr, ParseError> {
        use crate::ast::BinaryOp;

        let mut left = self.parse_unary()?;

        loop {
            let op = if self.match_token(&Token::Star) {
                BinaryOp::Mul
            } else if self.match_token(&Token::Slash) {
                BinaryOp::Div
            } else if self.match_token(&Token::Percent) {
                BinaryOp::Mod
            } else {
                break;
            };

            let right = self.parse_unary()?;
            let span = left.span.start..right.span.end;
            left = Spanned::new(
                Expr::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                span,
            );
        }

        Ok(left)
    }

    /// Parse unary operators: - ! (stackable, applied right-to-left).
    fn parse_unary(&mut self) -> Result<SpannedExpr, ParseError> {
        use crate::ast::UnaryOp;

        let start = self.peek_span().start;

        if self.match_token(&Token::Minus) {
            let expr = self.parse_unary()?;
            let span = start..expr.span.end;
            Ok(Spanned::new(
                Expr::Unary {
                    op: UnaryOp::Neg,
                    expr: Box::new(expr),
                },
                span,
            ))
        } else if self.match_token(&Token::Not) {
            let expr = self.parse_unary()?;
            let span = start..expr.span.end;
            Ok(Spanned::new(
                Expr::Unary {
                    op: UnaryOp::Not,
                    expr: Box::new(expr),
                },
                span,
            ))
        } else {
            self.parse_postfix()
        }
    }

    /// Parse postfix operators: . [] () {}
    fn parse_postfix(&mut self) -> Result<SpannedExpr, ParseError> {
        let mut expr = self.parse_atom()?;

        loop {
            if self.check(&Token::LParen) {
                // Function call
                expr = self.parse_call(expr)?;
            } else if self.check(&Token::LBracket) {
                // Index
                expr = self.parse_index(expr)?;
            } else if self.check(&Token::Dot) {
                // Member access
                expr = self.parse_member(expr)?;
            } else if self.check(&Token::LBrace) && self.is_type_expr(&expr) {
                // Struct literal (only if expr is an ident or member chain)
                expr = self.parse_struct_init(expr)?;
            } else {
                break;
            }
        }

        Ok(expr)
    }

    /// Check if the expression can be used as a type name for struct literals.
    fn is_type_expr(&self, expr: &SpannedExpr) -> bool {
        matches!(
            expr.node,
            Expr::Ident(_) | Expr::RootIdent(_) | Expr::Member { .. }
        )
    }

    /// Parse a function call: expr(args...)
    ///
    /// Calls are only valid on identifiers (global functions) and member
    /// fields (methods). Comprehension-macro method calls are expanded
    /// inline; a macro whose first argument is not an identifier is kept
    /// as a call with its macro flag set and fails at evaluation time.
    fn parse_call(&mut self, callee: SpannedExpr) -> Result<SpannedExpr, ParseError> {
        let start = callee.span.start;
        self.expect(&Token::LParen)?;

        let mut args = Vec::new();
        if !self.check(&Token::RParen) {
            args.push(self.parse_expr()?);
            while self.match_token(&Token::Comma) {
                if self.check(&Token::RParen) {
                    break; // trailing comma
                }
                args.push(self.parse_expr()?);
            }
        }

        let end_span = self.expect(&Token::RParen)?;
        let span = start..end_span.end;
        let callee_span = callee.span.clone();

        match callee.node {
            // Global function call: name(args)
            Expr::Ident(name) | Expr::RootIdent(name) => Ok(Spanned::new(
                Expr::Call {
                    target: None,
                    name,
                    args,
                    is_macro: false,
                },
                span,
            )),

            // Method call: receiver.name(args)
            Expr::Member {
                expr: receiver,
                field: name,
                test: _,
            } => {
                if let Some(macro_def) = self.macros.lookup(&name, args.len()) {
                    match (macro_def.expander)(span.clone(), (*receiver).clone(), args.clone()) {
                        MacroExpansion::Expanded(expanded) => return Ok(expanded),
                        MacroExpansion::Error(_) => {
                            return Ok(Spanned::new(
                                Expr::Call {
                                    target: Some(receiver),
                                    name,
                                    args,
                                    is_macro: true,
                                },
                                span,
                            ));
                        }
                    }
                }

                Ok(Spanned::new(
                    Expr::Call {
                        target: Some(receiver),
                        name,
                        args,
                        is_macro: false,
                    },
                    span,
                ))
            }

            _ => Err(ParseError {
                message: "only identifiers and member accesses can be called".to_string(),
                span: callee_span,
            }),
        }
    }

    /// Parse an index operation: expr[index]
    fn parse_index(&mut self, base: SpannedExpr) -> Result<SpannedExpr, ParseError> {
        let start = base.span.start;
        self.expect(&Token::LBracket)?;
        let index = self.parse_expr()?;
        let end_span = self.expect(&Token::RBracket)?;

        Ok(Spanned::new(
            Expr::Index {
                expr: Box::new(base),
                index: Box::new(index),
            },
            start..end_span.end,
        ))
    }

    /// Parse member access: expr.field
    fn parse_member(&mut self, base: SpannedExpr) -> Result<SpannedExpr, ParseError> {
        let start = base.span.start;
        self.expect(&Token::Dot)?;

        let (field, end) = match self.advance() {
            Some((Token::Ident(name), span)) => (name.clone(), span.end),
            other => {
                return Err(ParseError {
                    message: format!(
                        "expected identifier after '.', found {:?}",
                        other.map(|(t, _)| t)
                    ),
                    span: self.peek_span(),
                });
            }
        };

        Ok(Spanned::new(
            Expr::Member {
                expr: Box::new(base),
                field,
                test: false,
            },
            start..end,
        ))
    }

    /// Parse struct initialization: Type{field: value, ...}
    fn parse_struct_init(&mut self, type_name: SpannedExpr) -> Result<SpannedExpr, ParseError> {
        let start = type_name.span.start;
        self.expect(&Token::LBrace)?;

        let mut fields = Vec::new();
        if !self.check(&Token::RBrace) {
            fields.push(self.parse_struct_field()?);
            while self.match_token(&Token::Comma) {
                if self.check(&Token::RBrace) {
                    break; // trailing comma
                }
                fields.push(self.parse_struct_field()?);
            }
        }

        let end_span = self.expect(&Token::RBrace)?;

        Ok(Spanned::new(
            Expr::Struct {
                type_name: Box::new(type_name),
                fields,
            },
            start..end_span.end,
        ))
    }

    /// Parse a struct field: name: value
    fn parse_struct_field(&mut self) -> Result<(String, SpannedExpr), ParseError> {
        let name = match self.advance() {
            Some((Token::Ident(name), _)) => name.clone(),
            other => {
                return Err(ParseError {
                    message: format!("expected field name, found {:?}", other.map(|(t, _)| t)),
                    span: self.peek_span(),
                });
            }
        };

        self.expect(&Token::Colon)?;
        let value = self.parse_expr()?;

        Ok((name, value))
    }

    /// Parse an atom: literal, identifier, parenthesized expression, list, or map.
    fn parse_atom(&mut self) -> Result<SpannedExpr, ParseError> {
        let span = self.peek_span();

        // Clone the token to avoid borrowing issues
        let token = self.peek().cloned();

        match token {
            // Literals
            Some(Token::Int(n)) => {
                self.advance();
                Ok(Spanned::new(Expr::Int(n), span))
            }
            Some(Token::UInt(n)) => {
                self.advance();
                Ok(Spanned::new(Expr::UInt(n), span))
            }
            Some(Token::Double(n)) => {
                self.advance();
                Ok(Spanned::new(Expr::Double(n), span))
            }
            Some(Token::String(s)) => {
                self.advance();
                Ok(Spanned::new(Expr::String(s), span))
            }
            Some(Token::Bytes(b)) => {
                self.advance();
                Ok(Spanned::new(Expr::Bytes(b), span))
            }
            Some(Token::True) => {
                self.advance();
                Ok(Spanned::new(Expr::Bool(true), span))
            }
            Some(Token::False) => {
                self.advance();
                Ok(Spanned::new(Expr::Bool(false), span))
            }
            Some(Token::Null) => {
                self.advance();
                Ok(Spanned::new(Expr::Null, span))
            }

            // Identifier
            Some(Token::Ident(name)) => {
                self.advance();
                Ok(Spanned::new(Expr::Ident(name), span))
            }

            // Reserved word - error
            Some(Token::Reserved(word)) => Err(ParseError {
                message: format!(
                    "'{}' is a reserved word and cannot be used as an identifier",
                    word
                ),
                span,
            }),

            // Root identifier: .name
            Some(Token::Dot) => {
                self.advance();
                match self.advance() {
                    Some((Token::Ident(name), end_span)) => {
                        let name = name.clone();
                        let end = end_span.end;
                        Ok(Spanned::new(Expr::RootIdent(name), span.start..end))
                    }
                    _ => Err(ParseError {
                        message: "expected identifier after '.'".to_string(),
                        span: self.peek_span(),
                    }),
                }
            }

            // Parenthesized expression
            Some(Token::LParen) => {
                self.advance();
                let expr = self.parse_expr()?;
                self.expect(&Token::RParen)?;
                Ok(expr)
            }

            // List literal
            Some(Token::LBracket) => self.parse_list(),

            // Map literal
            Some(Token::LBrace) => self.parse_map(),

            // Error cases
            Some(token) => Err(ParseError {
                message: format!("unexpected token: {:?}", token),
                span,
            }),

            None => Err(ParseError {
                message: "unexpected end of input".to_string(),
                span: self.eof_span(),
            }),
        }
    }

    /// Parse a list literal: [expr, expr, ...]
    fn parse_list(&mut self) -> Result<SpannedExpr, ParseError> {
        let start = self.peek_span().start;
        self.expect(&Token::LBracket)?;

        let mut items = Vec::new();
        if !self.check(&Token::RBracket) {
            items.push(self.parse_expr()?);
            while self.match_token(&Token::Comma) {
                if self.check(&Token::RBracket) {
                    break; // trailing comma
                }
                items.push(self.parse_expr()?);
            }
        }

        let end_span = self.expect(&Token::RBracket)?;

        Ok(Spanned::new(Expr::List(items), start..end_span.end))
    }

    /// Parse a map literal: {expr: expr, expr: expr, ...}
    fn parse_map(&mut self) -> Result<SpannedExpr, ParseError> {
        let start = self.peek_span().start;
        self.expect(&Token::LBrace)?;

        let mut entries = Vec::new();
        if !self.check(&Token::RBrace) {
            let key = self.parse_expr()?;
            self.expect(&Token::Colon)?;
            let value = self.parse_expr()?;
            entries.push((key, value));

            while self.match_token(&Token::Comma) {
                if self.check(&Token::RBrace) {
                    break; // trailing comma
                }
                let key = self.parse_expr()?;
                self.expect(&Token::Colon)?;
                let value = self.parse_expr()?;
                entries.push((key, value));
            }
        }

        let end_span = self.expect(&Token::RBrace)?;

        Ok(Spanned::new(Expr::Map(entries), start..end_span.end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{BinaryOp, UnaryOp};
    use crate::lexer::lex;
    use crate::parse;

    fn parse_expr(input: &str) -> SpannedExpr {
        parse(input).unwrap_or_else(|e| panic!("unexpected parse error: {}", e))
    }

    fn parse_expr_node(input: &str) -> Expr {
        parse_expr(input).node
    }

    #[test]
    fn parse_literals() {
        assert_eq!(parse_expr_node("123"), Expr::Int(123));
        assert_eq!(parse_expr_node("123u"), Expr::UInt(123));
        assert_eq!(parse_expr_node("1.5"), Expr::Double(1.5));
        assert_eq!(
            parse_expr_node(r#""hello""#),
            Expr::String("hello".to_string())
        );
        assert_eq!(parse_expr_node("true"), Expr::Bool(true));
        assert_eq!(parse_expr_node("false"), Expr::Bool(false));
        assert_eq!(parse_expr_node("null"), Expr::Null);
    }

    #[test]
    fn parse_identifier() {
        assert_eq!(parse_expr_node("foo"), Expr::Ident("foo".to_string()));
        assert_eq!(parse_expr_node(".foo"), Expr::RootIdent("foo".to_string()));
    }

    #[test]
    fn parse_list() {
        if let Expr::List(items) = parse_expr_node("[1, 2, 3]") {
            assert_eq!(items.len(), 3);
            assert_eq!(items[0].node, Expr::Int(1));
            assert_eq!(items[1].node, Expr::Int(2));
            assert_eq!(items[2].node, Expr::Int(3));
        } else {
            panic!("expected list");
        }
    }

    #[test]
    fn parse_list_trailing_comma_and_empty() {
        if let Expr::List(items) = parse_expr_node("[1, 2,]") {
            assert_eq!(items.len(), 2);
        } else {
            panic!("expected list");
        }
        assert_eq!(parse_expr_node("[]"), Expr::List(vec![]));
    }

    #[test]
    fn parse_map() {
        if let Expr::Map(entries) = parse_expr_node(r#"{"a": 1, "b": 2}"#) {
            assert_eq!(entries.len(), 2);
            assert_eq!(entries[0].0.node, Expr::String("a".to_string()));
            assert_eq!(entries[0].1.node, Expr::Int(1));
        } else {
            panic!("expected map");
        }
    }

    #[test]
    fn parse_struct() {
        if let Expr::Struct { type_name, fields } = parse_expr_node("Point{x: 1, y: 2}") {
            assert_eq!(type_name.node, Expr::Ident("Point".to_string()));
            assert_eq!(fields.len(), 2);
            assert_eq!(fields[0].0, "x");
            assert_eq!(fields[0].1.node, Expr::Int(1));
        } else {
            panic!("expected struct");
        }
    }

    #[test]
    fn parse_binary_ops() {
        if let Expr::Binary { op, left, right } = parse_expr_node("1 + 2") {
            assert_eq!(op, BinaryOp::Add);
            assert_eq!(left.node, Expr::Int(1));
            assert_eq!(right.node, Expr::Int(2));
        } else {
            panic!("expected binary");
        }
    }

    #[test]
    fn parse_precedence() {
        // 1 + 2 * 3 should parse as 1 + (2 * 3)
        if let Expr::Binary { op, left, right } = parse_expr_node("1 + 2 * 3") {
            assert_eq!(op, BinaryOp::Add);
            assert_eq!(left.node, Expr::Int(1));
            if let Expr::Binary {
                op: inner_op,
                left: inner_left,
                right: inner_right,
            } = &right.node
            {
                assert_eq!(*inner_op, BinaryOp::Mul);
                assert_eq!(inner_left.node, Expr::Int(2));
                assert_eq!(inner_right.node, Expr::Int(3));
            } else {
                panic!("expected inner binary");
            }
        } else {
            panic!("expected binary");
        }
    }

    #[test]
    fn parse_grouping_overrides_precedence() {
        // (1 + 2) * 3 should parse as (1 + 2) * 3
        if let Expr::Binary { op, left, right } = parse_expr_node("(1 + 2) * 3") {
            assert_eq!(op, BinaryOp::Mul);
            assert_eq!(right.node, Expr::Int(3));
            assert!(matches!(
                left.node,
                Expr::Binary {
                    op: BinaryOp::Add,
                    ..
                }
            ));
        } else {
            panic!("expected binary");
        }
    }

    #[test]
    fn parse_associativity() {
        // 1 - 2 - 3 should parse as (1 - 2) - 3 (left associative)
        if let Expr::Binary { op, left, right } = parse_expr_node("1 - 2 - 3") {
            assert_eq!(op, BinaryOp::Sub);
            assert_eq!(right.node, Expr::Int(3));
            if let Expr::Binary {
                op: inner_op,
                left: inner_left,
                right: inner_right,
            } = &left.node
            {
                assert_eq!(*inner_op, BinaryOp::Sub);
                assert_eq!(inner_left.node, Expr::Int(1));
                assert_eq!(inner_right.node, Expr::Int(2));
            } else {
                panic!("expected inner binary");
            }
        } else {
            panic!("expected binary");
        }
    }

    #[test]
    fn parse_unary() {
        if let Expr::Unary { op, expr } = parse_expr_node("-x") {
            assert_eq!(op, UnaryOp::Neg);
            assert_eq!(expr.node, Expr::Ident("x".to_string()));
        } else {
            panic!("expected unary");
        }
    }

    #[test]
    fn parse_stacked_unary() {
        // !!x applies right-to-left
        if let Expr::Unary { op, expr } = parse_expr_node("!!x") {
            assert_eq!(op, UnaryOp::Not);
            assert!(matches!(
                expr.node,
                Expr::Unary {
                    op: UnaryOp::Not,
                    ..
                }
            ));
        } else {
            panic!("expected unary");
        }
    }

    #[test]
    fn parse_member_access() {
        if let Expr::Member { expr, field, test } = parse_expr_node("a.b") {
            assert_eq!(expr.node, Expr::Ident("a".to_string()));
            assert_eq!(field, "b");
            assert!(!test);
        } else {
            panic!("expected member access");
        }
    }

    #[test]
    fn parse_index() {
        if let Expr::Index { expr, index } = parse_expr_node("a[0]") {
            assert_eq!(expr.node, Expr::Ident("a".to_string()));
            assert_eq!(index.node, Expr::Int(0));
        } else {
            panic!("expected index");
        }
    }

    #[test]
    fn parse_global_call() {
        if let Expr::Call {
            target,
            name,
            args,
            is_macro,
        } = parse_expr_node("f(x, y)")
        {
            assert!(target.is_none());
            assert_eq!(name, "f");
            assert_eq!(args.len(), 2);
            assert_eq!(args[0].node, Expr::Ident("x".to_string()));
            assert_eq!(args[1].node, Expr::Ident("y".to_string()));
            assert!(!is_macro);
        } else {
            panic!("expected call");
        }
    }

    #[test]
    fn parse_method_call() {
        if let Expr::Call {
            target,
            name,
            args,
            is_macro,
        } = parse_expr_node("s.startsWith('a')")
        {
            assert_eq!(target.unwrap().node, Expr::Ident("s".to_string()));
            assert_eq!(name, "startsWith");
            assert_eq!(args.len(), 1);
            assert!(!is_macro);
        } else {
            panic!("expected call");
        }
    }

    #[test]
    fn parse_call_on_non_callable_is_error() {
        assert!(parse("1(2)").is_err());
        assert!(parse("[1](0)").is_err());
        assert!(parse("\"s\"(0)").is_err());
    }

    #[test]
    fn parse_ternary() {
        if let Expr::Ternary {
            cond,
            then_expr,
            else_expr,
        } = parse_expr_node("a ? b : c")
        {
            assert_eq!(cond.node, Expr::Ident("a".to_string()));
            assert_eq!(then_expr.node, Expr::Ident("b".to_string()));
            assert_eq!(else_expr.node, Expr::Ident("c".to_string()));
        } else {
            panic!("expected ternary");
        }
    }

    #[test]
    fn parse_nested_ternary_is_right_associative() {
        // a ? b : c ? d : e == a ? b : (c ? d : e)
        if let Expr::Ternary { else_expr, .. } = parse_expr_node("a ? b : c ? d : e") {
            assert!(matches!(else_expr.node, Expr::Ternary { .. }));
        } else {
            panic!("expected ternary");
        }
    }

    #[test]
    fn parse_chained_member_access() {
        if let Expr::Member { expr, field, .. } = parse_expr_node("a.b.c") {
            assert_eq!(field, "c");
            if let Expr::Member {
                expr: inner_expr,
                field: inner_field,
                ..
            } = &expr.node
            {
                assert_eq!(inner_expr.node, Expr::Ident("a".to_string()));
                assert_eq!(inner_field, "b");
            } else {
                panic!("expected inner member");
            }
        } else {
            panic!("expected member access");
        }
    }

    // === Macro Expansion Tests ===

    #[test]
    fn expand_map_macro() {
        let ast = parse_expr("[1,2].map(x, x * 2)");
        if let Expr::Comprehension {
            iter_var,
            iter_range,
            ..
        } = &ast.node
        {
            assert_eq!(iter_var, "x");
            assert!(matches!(iter_range.node, Expr::List(_)));
        } else {
            panic!("expected comprehension, got {:?}", ast.node);
        }
    }

    #[test]
    fn expand_all_exists_filter_exists_one() {
        for src in [
            "[1,2].all(x, x > 0)",
            "[1,2].exists(x, x > 1)",
            "[1,2].filter(x, x > 1)",
            "[1,2].existsOne(x, x > 1)",
        ] {
            let ast = parse_expr(src);
            assert!(
                matches!(ast.node, Expr::Comprehension { .. }),
                "{} did not expand: {:?}",
                src,
                ast.node
            );
        }
    }

    #[test]
    fn macros_nest_and_chain() {
        // filter feeding map: the outer comprehension ranges over the inner one
        let ast = parse_expr("[1,2,3].filter(x, x > 1).map(x, x * 10)");
        if let Expr::Comprehension { iter_range, .. } = &ast.node {
            assert!(matches!(iter_range.node, Expr::Comprehension { .. }));
        } else {
            panic!("expected comprehension, got {:?}", ast.node);
        }
    }

    #[test]
    fn malformed_macro_keeps_flagged_call() {
        // first argument is not a bare identifier: kept as a macro call,
        // which fails at evaluation time
        let ast = parse_expr("[1,2].map(1 + 1, x)");
        if let Expr::Call { name, is_macro, .. } = &ast.node {
            assert_eq!(name, "map");
            assert!(*is_macro);
        } else {
            panic!("expected call, got {:?}", ast.node);
        }
    }

    #[test]
    fn wrong_arg_count_is_plain_call() {
        // exists with 1 arg is not a macro signature; the standard
        // function table rejects it at evaluation time
        let ast = parse_expr("[1,2].exists(x)");
        if let Expr::Call { is_macro, .. } = &ast.node {
            assert!(!is_macro);
        } else {
            panic!("expected call, got {:?}", ast.node);
        }
    }

    #[test]
    fn parse_with_no_macros() {
        use crate::macros::MacroRegistry;

        let tokens = lex("[1,2].all(x, x > 0)").unwrap();
        let mut parser = Parser::with_macros(&tokens, MacroRegistry::new());
        let ast = parser.parse_expr().unwrap();
        assert!(parser.at_end());
        // Without macros, all() is a regular method call
        assert!(matches!(
            ast.node,
            Expr::Call {
                is_macro: false,
                ..
            }
        ));
    }
}
