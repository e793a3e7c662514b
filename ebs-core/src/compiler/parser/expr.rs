use super::super::lexer::token_kind::EbsTokenKind;
use super::type_expr::TypeExpr;
use chrono::NaiveDateTime;
use std::fmt;

pub type Expr = Box<ExprKind>;

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Literal(Literal),
    VarRef(VarRef),
    Binary(Binary),
    /// `a < b <= c`, true when every adjacent pair holds
    ChainComparison(ChainComparison),
    Unary(Unary),
    Grouping(Grouping),
    FunctionCall(FunctionCall),
    /// Also covers `.length` / `.size`, resolved at run time
    MemberAccess(MemberAccess),
    IndexAccess(IndexAccess),
    ArrayLiteral(ArrayLiteral),
    JsonLiteral(JsonLiteral),
    /// `int(x)`, `string(y)`; casts to user types parse as calls
    Cast(Cast),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Bool(bool),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
    Date(NaiveDateTime),
}

#[derive(Debug, Clone, PartialEq)]
pub struct VarRef {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Binary {
    pub left: Expr,
    pub op: EbsTokenKind,
    pub right: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChainComparison {
    pub operands: Vec<Expr>,
    /// `ops[i]` sits between `operands[i]` and `operands[i + 1]`
    pub ops: Vec<EbsTokenKind>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Unary {
    pub op: EbsTokenKind,
    pub operand: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Grouping {
    pub expression: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CallArg {
    /// Set for `name = value` arguments
    pub name: Option<String>,
    pub value: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    /// Possibly dotted, e.g. `string.toupper`
    pub name: String,
    pub arguments: Vec<CallArg>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MemberAccess {
    pub object: Expr,
    pub member: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexAccess {
    pub object: Expr,
    /// One entry per dimension: `a[i, j]`
    pub indices: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArrayLiteral {
    pub elements: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct JsonLiteral {
    pub entries: Vec<(String, Expr)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cast {
    pub target: TypeExpr,
    pub value: Expr,
}

impl ExprKind {
    /// The dotted name of a `VarRef` / `MemberAccess` chain, if that is all
    /// this expression is
    pub fn qualified_name(&self) -> Option<String> {
        match self {
            ExprKind::VarRef(v) => Some(v.name.clone()),
            ExprKind::MemberAccess(m) => {
                let mut base = m.object.qualified_name()?;
                base.push('.');
                base.push_str(&m.member);
                Some(base)
            }
            _ => None,
        }
    }
}

impl fmt::Display for ExprKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExprKind::Literal(lit) => match lit {
                Literal::Null => write!(f, "null"),
                Literal::Bool(b) => write!(f, "{b}"),
                Literal::Int(n) => write!(f, "{n}"),
                Literal::Long(n) => write!(f, "{n}L"),
                Literal::Float(n) => write!(f, "{n}f"),
                Literal::Double(n) => write!(f, "{n}"),
                Literal::String(s) => write!(f, "{s:?}"),
                Literal::Date(d) => write!(f, "\"{d}\""),
            },
            ExprKind::VarRef(v) => write!(f, "{}", v.name),
            ExprKind::Binary(b) => write!(f, "({} {} {})", b.left, op_text(b.op), b.right),
            ExprKind::ChainComparison(c) => {
                write!(f, "(")?;
                for (i, operand) in c.operands.iter().enumerate() {
                    if i > 0 {
                        write!(f, " {} ", op_text(c.ops[i - 1]))?;
                    }
                    write!(f, "{operand}")?;
                }
                write!(f, ")")
            }
            ExprKind::Unary(u) => write!(f, "({}{})", op_text(u.op), u.operand),
            ExprKind::Grouping(g) => write!(f, "{}", g.expression),
            ExprKind::FunctionCall(c) => {
                write!(f, "{}(", c.name)?;
                for (i, arg) in c.arguments.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    if let Some(name) = &arg.name {
                        write!(f, "{name} = ")?;
                    }
                    write!(f, "{}", arg.value)?;
                }
                write!(f, ")")
            }
            ExprKind::MemberAccess(m) => write!(f, "{}.{}", m.object, m.member),
            ExprKind::IndexAccess(i) => {
                write!(f, "{}[", i.object)?;
                for (n, index) in i.indices.iter().enumerate() {
                    if n > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{index}")?;
                }
                write!(f, "]")
            }
            ExprKind::ArrayLiteral(a) => {
                write!(f, "[")?;
                for (i, e) in a.elements.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{e}")?;
                }
                write!(f, "]")
            }
            ExprKind::JsonLiteral(j) => {
                write!(f, "{{")?;
                for (i, (k, v)) in j.entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{k:?}: {v}")?;
                }
                write!(f, "}}")
            }
            ExprKind::Cast(c) => write!(f, "{}({})", c.target, c.value),
        }
    }
}

fn op_text(op: EbsTokenKind) -> &'static str {
    match op {
        EbsTokenKind::And => "&&",
        EbsTokenKind::Or => "||",
        EbsTokenKind::Not => "!",
        EbsTokenKind::Typeof => "typeof ",
        other => other.describe(),
    }
}
