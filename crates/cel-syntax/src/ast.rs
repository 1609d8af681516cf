//! CEL Abstract Syntax Tree definitions.

/// Source span for error reporting. Uses byte offsets into the source string.
pub type Span = std::ops::Range<usize>;

/// AST node with its source location.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    pub node: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(node: T, span: Span) -> Self {
        Self { node, span }
    }
}

/// A spanned expression.
pub type SpannedExpr = Spanned<Expr>;

/// CEL expression.
///
/// Nodes are created by the parser, owned by the compiled program, and
/// immutable thereafter; they carry no evaluation state.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    // Literals
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Double(f64),
    String(String),
    Bytes(Vec<u8>),

    // Identifiers
    Ident(String),
    /// Leading-dot identifier (`.name`) - resolves against the environment.
    RootIdent(String),

    // Collections
    List(Vec<SpannedExpr>),
    Map(Vec<(SpannedExpr, SpannedExpr)>),
    /// Struct literal: TypeName{field: value, ...}.
    /// The type name is the expression preceding the braces (an identifier
    /// or member chain).
    Struct {
        type_name: Box<SpannedExpr>,
        fields: Vec<(String, SpannedExpr)>,
    },

    // Operations
    Unary {
        op: UnaryOp,
        expr: Box<SpannedExpr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<SpannedExpr>,
        right: Box<SpannedExpr>,
    },
    Ternary {
        cond: Box<SpannedExpr>,
        then_expr: Box<SpannedExpr>,
        else_expr: Box<SpannedExpr>,
    },

    // Access
    /// Field selection: expr.field. When `test` is set the node is a
    /// presence test: a missing field (or a null operand) yields false
    /// instead of an error.
    Member {
        expr: Box<SpannedExpr>,
        field: String,
        test: bool,
    },
    Index {
        expr: Box<SpannedExpr>,
        index: Box<SpannedExpr>,
    },
    /// Function or method call. `target` is the receiver for method calls
    /// and None for global calls. `is_macro` marks a comprehension-macro
    /// call that could not be expanded (its first argument was not a bare
    /// identifier); evaluating such a node is an error.
    Call {
        target: Option<Box<SpannedExpr>>,
        name: String,
        args: Vec<SpannedExpr>,
        is_macro: bool,
    },

    /// Comprehension expression (result of macro expansion).
    ///
    /// Semantics:
    /// ```text
    /// let accu_var = accu_init
    /// for (let iter_var in iter_range) {
    ///    if (!loop_condition) { break }
    ///    accu_var = loop_step
    /// }
    /// return result
    /// ```
    Comprehension {
        /// The name of the iteration variable.
        iter_var: String,
        /// The range over which the comprehension iterates.
        iter_range: Box<SpannedExpr>,
        /// The name of the accumulator variable.
        accu_var: String,
        /// The initial value of the accumulator.
        accu_init: Box<SpannedExpr>,
        /// Returns false when the result has been computed (short-circuit).
        loop_condition: Box<SpannedExpr>,
        /// Computes the next value of the accumulator.
        loop_step: Box<SpannedExpr>,
        /// Computes the final result from the accumulator.
        result: Box<SpannedExpr>,
    },
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// Arithmetic negation (`-`)
    Neg,
    /// Logical negation (`!`)
    Not,
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,

    // Comparison
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,

    // Membership
    In,

    // Logical
    And,
    Or,
}
