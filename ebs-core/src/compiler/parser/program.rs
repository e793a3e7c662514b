//! Top-level program model
//!
//! Imports, function declarations and type definitions are hoisted out of
//! the statement stream; only executable statements remain in `statements`.

use super::expr::Expr;
use super::stmt::Stmt;
use super::type_expr::TypeExpr;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub imports: Vec<ImportDecl>,
    pub functions: Vec<FunctionDecl>,
    pub types: Vec<TypeDefDecl>,
    pub statements: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportDecl {
    pub path: String,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    /// `None` accepts any value
    pub ty: Option<TypeExpr>,
    pub default: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    pub name: String,
    pub params: Vec<Param>,
    pub return_type: Option<TypeExpr>,
    pub body: Vec<Stmt>,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    pub name: String,
    pub ty: TypeExpr,
}

/// Storage word of a bitmap type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitWord {
    /// `bitmap`: bits 0..=7 of a byte
    Byte,
    /// `intmap`: bits 0..=31 of an int
    Int,
}

impl BitWord {
    pub fn width(self) -> u8 {
        match self {
            BitWord::Byte => 8,
            BitWord::Int => 32,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BitFieldDef {
    pub name: String,
    pub lo: u8,
    pub hi: u8,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeDef {
    Record(Vec<FieldDef>),
    Bitmap { word: BitWord, fields: Vec<BitFieldDef> },
    Alias(TypeExpr),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeDefDecl {
    pub name: String,
    pub def: TypeDef,
    pub line: usize,
}

impl Program {
    pub fn function(&self, name: &str) -> Option<&FunctionDecl> {
        self.functions
            .iter()
            .find(|f| f.name.eq_ignore_ascii_case(name))
    }
}
