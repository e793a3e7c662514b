use super::expr::Expr;
use super::type_expr::TypeExpr;
use crate::runtime::error::ErrorKind;

/// A statement and the line it starts on
#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub line: usize,
    pub kind: StmtKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    Expr(ExprStmt),
    Block(BlockStmt),
    VarDecl(VarDeclStmt),
    /// `=`, compound assignment, `++` and `--`
    Assign(AssignStmt),
    Print(PrintStmt),
    If(IfStmt),
    While(WhileStmt),
    DoWhile(DoWhileStmt),
    For(ForStmt),
    Foreach(ForeachStmt),
    Break(BreakStmt),
    Continue,
    Return(ReturnStmt),
    Try(TryStmt),
    Raise(RaiseStmt),
}

impl Stmt {
    pub fn new(line: usize, kind: StmtKind) -> Self {
        Self { line, kind }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExprStmt {
    pub expression: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BlockStmt {
    pub statements: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VarDeclStmt {
    pub name: String,
    pub declared_type: Option<TypeExpr>,
    pub initializer: Option<Expr>,
    pub constant: bool,
}

/// One step of an assignment target path
#[derive(Debug, Clone, PartialEq)]
pub enum Accessor {
    Field(String),
    Index(Vec<Expr>),
}

/// `name`, `name.field`, `name[i].field[j, k]`, ...
#[derive(Debug, Clone, PartialEq)]
pub struct LValue {
    pub name: String,
    pub path: Vec<Accessor>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssignStmt {
    pub target: LValue,
    /// Binary operator applied to the old value first (`+=` -> `+`)
    pub op: Option<super::super::lexer::token_kind::EbsTokenKind>,
    pub value: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PrintStmt {
    pub expression: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfStmt {
    pub condition: Expr,
    pub then_branch: Box<Stmt>,
    pub else_branch: Option<Box<Stmt>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WhileStmt {
    pub condition: Expr,
    pub body: Box<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DoWhileStmt {
    pub body: Box<Stmt>,
    pub condition: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForStmt {
    pub init: Option<Box<Stmt>>,
    pub condition: Option<Expr>,
    pub step: Option<Box<Stmt>>,
    pub body: Box<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForeachStmt {
    pub variable: String,
    pub iterable: Expr,
    pub body: Box<Stmt>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopKind {
    While,
    Do,
    For,
    Foreach,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BreakStmt {
    /// `exit while;` leaves the innermost `while` even from a nested loop
    pub target: Option<LoopKind>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReturnStmt {
    pub value: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WhenClause {
    pub kind: ErrorKind,
    /// Receives the error message
    pub variable: Option<String>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TryStmt {
    pub body: Vec<Stmt>,
    pub handlers: Vec<WhenClause>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RaiseStmt {
    pub kind: ErrorKind,
    pub message: Option<Expr>,
}
