//! The AST produced by the front end (see [`crate::parser`]) and consumed
//! by the lowering pass (see [`crate::compiler`]).
//!
//! Every node carries a [`Span`]. `if`/`for` bodies are always represented
//! as a plain `Vec<StmtNode>` (the source grammar's `Block`), even when the
//! original source had a single statement. A `Return` with no expression is
//! synthesized by the parser at the tail of any function body that does not
//! already end in one.

use crate::diagnostics::Span;

/// Wraps a node with its source location.
#[derive(Debug, Clone)]
pub struct Spanned<T> {
    pub node: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(node: T, span: Span) -> Self {
        Self { node, span }
    }
}

pub type ExprNode = Spanned<Expr>;
pub type StmtNode = Spanned<Stmt>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    BitXor,
    BitAnd,
    BitOr,
    LogAnd,
    LogOr,
    Eq,
    NotEq,
    Lt,
    Gt,
    Lte,
    Gte,
    Assign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
    ModAssign,
    PowAssign,
    BitXorAssign,
    BitAndAssign,
    BitOrAssign,
}

impl BinaryOp {
    /// Compound-assignment forms require the left-hand side to be an
    /// lvalue (`Variable` or `MemberAccess`), per the lowering rule for
    /// `BinaryOperation`.
    pub fn is_assignment(self) -> bool {
        matches!(
            self,
            Self::Assign
                | Self::AddAssign
                | Self::SubAssign
                | Self::MulAssign
                | Self::DivAssign
                | Self::ModAssign
                | Self::PowAssign
                | Self::BitXorAssign
                | Self::BitAndAssign
                | Self::BitOrAssign
        )
    }

    /// The plain arithmetic/bitwise op a compound assignment applies,
    /// `None` for plain `Assign`.
    pub fn compound_op(self) -> Option<BinaryOp> {
        Some(match self {
            Self::AddAssign => Self::Add,
            Self::SubAssign => Self::Sub,
            Self::MulAssign => Self::Mul,
            Self::DivAssign => Self::Div,
            Self::ModAssign => Self::Mod,
            Self::PowAssign => Self::Pow,
            Self::BitXorAssign => Self::BitXor,
            Self::BitAndAssign => Self::BitAnd,
            Self::BitOrAssign => Self::BitOr,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Pos,
    Not,
    // Reserved but not wired to any token in the current grammar.
    PreInc,
    PreDec,
    PostInc,
    PostDec,
}

#[derive(Debug, Clone)]
pub enum Expr {
    Integer(i64),
    Float(OrderedFloat),
    Str(String),
    True,
    False,
    Null,
    Variable(String),
    SelfExpr,
    Unary {
        op: UnaryOp,
        operand: Box<ExprNode>,
    },
    Binary {
        op: BinaryOp,
        left: Box<ExprNode>,
        right: Box<ExprNode>,
    },
    /// `left` is one of `Variable`, `FunctionCall`, `SelfExpr`, or a nested
    /// `MemberAccess`; `right` is the next link in the chain, or `None` if
    /// this is the tail.
    MemberAccess {
        left: Box<ExprNode>,
        right: Option<Box<ExprNode>>,
    },
    FunctionCall {
        name: String,
        args: Vec<ExprNode>,
    },
    /// `var_ident` names the instance variable being constructed (`None`
    /// means the parser should synthesize `<type_name><counter>`).
    New {
        var_ident: Option<String>,
        constructor: Box<ExprNode>,
    },
}

/// Floats don't implement `Eq`; wrap so `Expr` can still derive structural
/// equality in tests without reaching for a crate just for this.
#[derive(Debug, Clone, Copy)]
pub struct OrderedFloat(pub f64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportTarget {
    Module(String),
    File(String),
}

#[derive(Debug, Clone)]
pub enum Stmt {
    Imports(Vec<StmtNode>),
    /// A bare `{ ... }` block: its own lexical scope with no attached
    /// control construct. Lowered the same way an `if`/`for` body is,
    /// minus the branch/loop instructions around it.
    Block(Vec<StmtNode>),
    Import {
        target: ImportTarget,
        local_path: Option<String>,
    },
    VarDecl {
        name: String,
        init: Option<ExprNode>,
    },
    FnDef {
        name: String,
        args: Vec<String>,
        body: Vec<StmtNode>,
        is_native: bool,
    },
    ClassDef {
        name: String,
        members: Vec<ClassMember>,
    },
    ExprStmt {
        value: ExprNode,
        clear: bool,
    },
    If {
        cond: ExprNode,
        then_block: Vec<StmtNode>,
        else_block: Option<Vec<StmtNode>>,
    },
    For {
        init: Option<Box<StmtNode>>,
        cond: Option<ExprNode>,
        inc: Option<Box<StmtNode>>,
        body: Vec<StmtNode>,
    },
    Return {
        value: Option<ExprNode>,
    },
    /// `levels` counts how many enclosing loop/if frames separate this
    /// statement from the loop it targets; always `1` for the single-loop
    /// case a bare `break`/`continue` describes.
    Break {
        levels: i32,
    },
    Continue {
        levels: i32,
    },
}

#[derive(Debug, Clone)]
pub enum ClassMember {
    Field {
        name: String,
        init: Option<ExprNode>,
    },
    Method {
        name: String,
        args: Vec<String>,
        body: Vec<StmtNode>,
        is_native: bool,
    },
}

/// The root of one parsed file: `module <ident>` followed by top-level
/// statements.
#[derive(Debug, Clone)]
pub struct ModuleAst {
    pub name: String,
    pub span: Span,
    pub children: Vec<StmtNode>,
}
