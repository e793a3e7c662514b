//! Type descriptors
//!
//! Resolved forms of the parser's `TypeExpr`: names are looked up, array
//! sizes evaluated, and user types shared through `Rc`.

use super::array::{ArrayShape, ArrayValue};
use super::error::{RuntimeError, RuntimeResult};
use super::queue::QueueValue;
use super::value::{BitmapValue, RecordValue, Value};
use crate::compiler::parser::program::{BitFieldDef, BitWord};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

#[derive(Debug, Clone)]
pub enum TypeDesc {
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
    Any,
    Record(Rc<RecordType>),
    Bitmap(Rc<BitmapType>),
    Array {
        elem: Box<TypeDesc>,
        shape: ArrayShape,
    },
    Queue(Box<TypeDesc>),
}

#[derive(Debug, Clone)]
pub struct FieldType {
    pub name: String,
    pub ty: TypeDesc,
}

#[derive(Debug, Clone)]
pub struct RecordType {
    pub name: String,
    pub fields: Vec<FieldType>,
}

impl RecordType {
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields
            .iter()
            .position(|f| f.name.eq_ignore_ascii_case(name))
    }

    /// A fresh instance with every field at its default
    pub fn instantiate(self: &Rc<Self>) -> RecordValue {
        RecordValue {
            ty: Rc::clone(self),
            fields: self.fields.iter().map(|f| f.ty.default_value()).collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BitmapType {
    pub name: String,
    pub word: BitWord,
    pub fields: Vec<BitFieldDef>,
}

impl BitmapType {
    pub fn field(&self, name: &str) -> Option<&BitFieldDef> {
        self.fields
            .iter()
            .find(|f| f.name.eq_ignore_ascii_case(name))
    }

    fn mask(field: &BitFieldDef) -> u32 {
        let width = u32::from(field.hi - field.lo) + 1;
        if width >= 32 {
            u32::MAX
        } else {
            (1u32 << width) - 1
        }
    }

    /// `(word >> lo) & mask`
    pub fn read(&self, word: u32, field: &BitFieldDef) -> u32 {
        (word >> field.lo) & Self::mask(field)
    }

    /// Clear the field's bits and OR in `value`; `value` must fit the range
    pub fn write(&self, word: u32, field: &BitFieldDef, value: i64) -> RuntimeResult<u32> {
        let mask = Self::mask(field);
        if value < 0 || value > i64::from(mask) {
            return Err(RuntimeError::validation_error(format!(
                "Value {} does not fit field '{}' of {} (bits {}-{})",
                value, field.name, self.name, field.lo, field.hi
            )));
        }
        let cleared = word & !(mask << field.lo);
        Ok(cleared | ((value as u32) << field.lo))
    }

    /// Largest raw word this type can hold
    pub fn word_mask(&self) -> u32 {
        match self.word {
            BitWord::Byte => 0xff,
            BitWord::Int => u32::MAX,
        }
    }
}

impl TypeDesc {
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            TypeDesc::Byte | TypeDesc::Int | TypeDesc::Long | TypeDesc::Float | TypeDesc::Double
        )
    }

    /// Value of a declared-but-uninitialized variable, record field or
    /// backfilled array slot
    pub fn default_value(&self) -> Value {
        match self {
            TypeDesc::Byte => Value::Byte(0),
            TypeDesc::Int => Value::Int(0),
            TypeDesc::Long => Value::Long(0),
            TypeDesc::Float => Value::Float(0.0),
            TypeDesc::Double => Value::Double(0.0),
            TypeDesc::String => Value::Str(String::new()),
            TypeDesc::Bool => Value::Bool(false),
            TypeDesc::Date | TypeDesc::Json | TypeDesc::Any => Value::Null,
            TypeDesc::Map => Value::map(BTreeMap::new()),
            TypeDesc::Record(rt) => Value::record(rt.instantiate()),
            TypeDesc::Bitmap(bt) => Value::Bitmap(BitmapValue {
                ty: Rc::clone(bt),
                word: 0,
            }),
            TypeDesc::Array { elem, shape } => {
                Value::array(ArrayValue::new((**elem).clone(), shape.clone()))
            }
            TypeDesc::Queue(elem) => Value::queue(QueueValue::new((**elem).clone())),
        }
    }

    /// Whether a value of type `self` can be shared as-is by a binding of
    /// type `other`
    pub fn same_as(&self, other: &TypeDesc) -> bool {
        match (self, other) {
            (TypeDesc::Record(a), TypeDesc::Record(b)) => {
                Rc::ptr_eq(a, b) || a.name.eq_ignore_ascii_case(&b.name)
            }
            (TypeDesc::Bitmap(a), TypeDesc::Bitmap(b)) => {
                Rc::ptr_eq(a, b) || a.name.eq_ignore_ascii_case(&b.name)
            }
            (
                TypeDesc::Array { elem: e1, shape: s1 },
                TypeDesc::Array { elem: e2, shape: s2 },
            ) => e1.same_as(e2) && s1 == s2,
            (TypeDesc::Queue(e1), TypeDesc::Queue(e2)) => e1.same_as(e2),
            _ => std::mem::discriminant(self) == std::mem::discriminant(other),
        }
    }
}

impl fmt::Display for TypeDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeDesc::Byte => write!(f, "byte"),
            TypeDesc::Int => write!(f, "int"),
            TypeDesc::Long => write!(f, "long"),
            TypeDesc::Float => write!(f, "float"),
            TypeDesc::Double => write!(f, "double"),
            TypeDesc::String => write!(f, "string"),
            TypeDesc::Date => write!(f, "date"),
            TypeDesc::Bool => write!(f, "bool"),
            TypeDesc::Json => write!(f, "json"),
            TypeDesc::Map => write!(f, "map"),
            TypeDesc::Any => write!(f, "any"),
            TypeDesc::Record(rt) => write!(f, "{}", rt.name),
            TypeDesc::Bitmap(bt) => write!(f, "{}", bt.name),
            TypeDesc::Array { elem, shape } => write!(f, "{elem}{shape}"),
            TypeDesc::Queue(elem) => match **elem {
                TypeDesc::Any => write!(f, "queue"),
                ref elem => write!(f, "queue.{elem}"),
            },
        }
    }
}
