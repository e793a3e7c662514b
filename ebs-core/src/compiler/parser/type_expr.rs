//! Type annotations
//!
//! `int`, `string[*]`, `double[3]`, `byte[2, 4]`, `Person[]`, `array`,
//! `queue.int`

use super::expr::Expr;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct TypeExpr {
    pub base: BaseType,
    pub dims: Option<ArrayDims>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BaseType {
    Byte,
    Int,
    Long,
    Float,
    Double,
    String,
    Date,
    Bool,
    Json,
    Map,
    /// The `array` keyword: elements of any type
    Any,
    /// FIFO of the element type
    Queue(Box<BaseType>),
    /// A `typeof` definition or alias
    Named(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ArrayDims {
    /// `[*]` or `[]`
    Dynamic,
    /// `[n]` or `[n, m, ...]`, sizes evaluated at declaration time
    Fixed(Vec<Expr>),
}

impl TypeExpr {
    pub fn scalar(base: BaseType) -> Self {
        Self { base, dims: None }
    }

    pub fn dynamic_array(base: BaseType) -> Self {
        Self {
            base,
            dims: Some(ArrayDims::Dynamic),
        }
    }

    pub fn is_array(&self) -> bool {
        self.dims.is_some()
    }
}

impl fmt::Display for BaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let BaseType::Queue(elem) = self {
            return match **elem {
                BaseType::Any => write!(f, "queue"),
                ref elem => write!(f, "queue.{elem}"),
            };
        }
        let name = match self {
            BaseType::Byte => "byte",
            BaseType::Int => "int",
            BaseType::Long => "long",
            BaseType::Float => "float",
            BaseType::Double => "double",
            BaseType::String => "string",
            BaseType::Date => "date",
            BaseType::Bool => "bool",
            BaseType::Json => "json",
            BaseType::Map => "map",
            BaseType::Any => "array",
            BaseType::Named(name) => name,
            BaseType::Queue(_) => "queue",
        };
        write!(f, "{name}")
    }
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.base)?;
        match &self.dims {
            None => Ok(()),
            Some(ArrayDims::Dynamic) => write!(f, "[*]"),
            Some(ArrayDims::Fixed(sizes)) => {
                write!(f, "[")?;
                for (i, size) in sizes.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{size}")?;
                }
                write!(f, "]")
            }
        }
    }
}
