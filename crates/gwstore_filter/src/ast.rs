//! Expression tree produced by the parser.
//!
//! The shape mirrors the common expression language: operators are calls to
//! functions with mangled names (`_&&_`, `@in`, ...), and the `all`/`exists`
//! macros are expanded into comprehension nodes at parse time.

use std::fmt;

/// Identifier assigned to every node by the parser.
pub type ExprId = u32;

/// Function names used for operators.
pub mod operators {
    /// Logical conjunction, `a && b`.
    pub const LOGICAL_AND: &str = "_&&_";
    /// Logical disjunction, `a || b`.
    pub const LOGICAL_OR: &str = "_||_";
    /// Logical negation, `!a`.
    pub const LOGICAL_NOT: &str = "!_";
    /// Macro-internal guard that treats errors as `true`.
    pub const NOT_STRICTLY_FALSE: &str = "@not_strictly_false";
    /// Membership, `a in b`.
    pub const IN: &str = "@in";
    /// Equality, `a == b`.
    pub const EQUALS: &str = "_==_";
    /// Inequality, `a != b`.
    pub const NOT_EQUALS: &str = "_!=_";
    /// `a < b`.
    pub const LESS: &str = "_<_";
    /// `a <= b`.
    pub const LESS_EQUALS: &str = "_<=_";
    /// `a > b`.
    pub const GREATER: &str = "_>_";
    /// `a >= b`.
    pub const GREATER_EQUALS: &str = "_>=_";
    /// `a + b`.
    pub const ADD: &str = "_+_";
    /// `a - b`.
    pub const SUBTRACT: &str = "_-_";
    /// `a * b`.
    pub const MULTIPLY: &str = "_*_";
    /// `a / b`.
    pub const DIVIDE: &str = "_/_";
    /// `a % b`.
    pub const MODULO: &str = "_%_";
    /// Arithmetic negation, `-a`.
    pub const NEGATE: &str = "-_";
    /// Indexing, `a[b]`.
    pub const INDEX: &str = "_[_]";
    /// Ternary conditional, `a ? b : c`.
    pub const CONDITIONAL: &str = "_?_:_";
}

/// Name of the accumulator variable introduced by macro expansion.
pub const ACCUMULATOR_VAR: &str = "__result__";

/// A literal value.
#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    /// `null`
    Null,
    /// `true` / `false`
    Bool(bool),
    /// Signed integer literal.
    Int(i64),
    /// Unsigned integer literal (`1u`).
    Uint(u64),
    /// Floating point literal.
    Double(f64),
    /// String literal.
    String(String),
    /// Bytes literal (`b"..."`).
    Bytes(Vec<u8>),
}

impl Constant {
    /// Returns a short name for the literal's kind.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Uint(_) => "uint",
            Self::Double(_) => "double",
            Self::String(_) => "string",
            Self::Bytes(_) => "bytes",
        }
    }
}

/// An expression node.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    /// Parser-assigned node ID, unique within one tree.
    pub id: ExprId,
    /// The node payload.
    pub kind: ExprKind,
}

/// The different kinds of expression nodes.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// A literal.
    Const(Constant),
    /// A variable reference.
    Ident(String),
    /// Field selection, `operand.field`.
    Select {
        /// The expression being selected from.
        operand: Box<Expr>,
        /// The selected field name.
        field: String,
    },
    /// A function or operator call.
    Call {
        /// Receiver for method-style calls (`x.f()`).
        target: Option<Box<Expr>>,
        /// Function name; operators use the names in [`operators`].
        function: String,
        /// Call arguments.
        args: Vec<Expr>,
    },
    /// List construction, `[a, b]`.
    List(Vec<Expr>),
    /// Map construction, `{k: v}`.
    Map(Vec<(Expr, Expr)>),
    /// Message construction, `Type{field: v}`.
    Struct {
        /// Qualified type name.
        type_name: String,
        /// Field initializers.
        fields: Vec<(String, Expr)>,
    },
    /// An expanded macro.
    Comprehension(Box<Comprehension>),
}

impl ExprKind {
    /// Returns the function name if this is a call.
    #[must_use]
    pub fn function(&self) -> Option<&str> {
        match self {
            Self::Call { function, .. } => Some(function),
            _ => None,
        }
    }
}

/// A comprehension produced by `all`/`exists` expansion.
///
/// Evaluation binds `iter_var` to each element of `iter_range` in turn,
/// stops early once `loop_condition` is false, and folds each step into
/// `accu_var` via `loop_step`. The value of `result` is the final answer.
#[derive(Debug, Clone, PartialEq)]
pub struct Comprehension {
    /// Name of the per-element variable.
    pub iter_var: String,
    /// The range being iterated.
    pub iter_range: Expr,
    /// Name of the accumulator variable.
    pub accu_var: String,
    /// Initial accumulator value.
    pub accu_init: Expr,
    /// Early-exit condition, evaluated before each step.
    pub loop_condition: Expr,
    /// Next accumulator value.
    pub loop_step: Expr,
    /// Final result.
    pub result: Expr,
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Uint(u) => write!(f, "{u}u"),
            Self::Double(d) => write!(f, "{d}"),
            Self::String(s) => write!(f, "{s:?}"),
            Self::Bytes(b) => write!(f, "b{:?}", String::from_utf8_lossy(b)),
        }
    }
}
