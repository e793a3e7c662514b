//! Runtime values
//!
//! Primitives are copied; `Json`, `Record`, `Array`, `Map` and `Queue` are
//! shared handles, so two variables bound to one composite see each other's
//! writes. `Bitmap` is a plain word plus its type and is copied.

use super::array::ArrayValue;
use super::queue::QueueValue;
use super::types::{BitmapType, RecordType};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

pub type JsonRef = Rc<RefCell<serde_json::Value>>;
pub type RecordRef = Rc<RefCell<RecordValue>>;
pub type ArrayRef = Rc<RefCell<ArrayValue>>;
pub type MapRef = Rc<RefCell<BTreeMap<String, Value>>>;
pub type QueueRef = Rc<RefCell<QueueValue>>;

#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Byte(u8),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Str(String),
    Date(NaiveDateTime),
    Json(JsonRef),
    Record(RecordRef),
    Array(ArrayRef),
    Map(MapRef),
    Queue(QueueRef),
    Bitmap(BitmapValue),
    /// Reference to a user function or builtin by name
    Function(String),
    /// Opaque handle produced by a builtin (file, cursor, ...)
    Resource(ResourceHandle),
}

#[derive(Debug, Clone)]
pub struct RecordValue {
    pub ty: Rc<RecordType>,
    /// Same order as `ty.fields`
    pub fields: Vec<Value>,
}

impl RecordValue {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.ty.field_index(name).and_then(|i| self.fields.get(i))
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Value> {
        let index = self.ty.field_index(name)?;
        self.fields.get_mut(index)
    }
}

#[derive(Debug, Clone)]
pub struct BitmapValue {
    pub ty: Rc<BitmapType>,
    pub word: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceHandle {
    pub id: u64,
    pub kind: String,
}

impl Value {
    pub fn str(s: impl Into<String>) -> Self {
        Value::Str(s.into())
    }

    pub fn json(doc: serde_json::Value) -> Self {
        Value::Json(Rc::new(RefCell::new(doc)))
    }

    pub fn array(array: ArrayValue) -> Self {
        Value::Array(Rc::new(RefCell::new(array)))
    }

    pub fn record(record: RecordValue) -> Self {
        Value::Record(Rc::new(RefCell::new(record)))
    }

    pub fn map(entries: BTreeMap<String, Value>) -> Self {
        Value::Map(Rc::new(RefCell::new(entries)))
    }

    pub fn queue(queue: QueueValue) -> Self {
        Value::Queue(Rc::new(RefCell::new(queue)))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Value::Byte(_) | Value::Int(_) | Value::Long(_) | Value::Float(_) | Value::Double(_)
        )
    }

    pub fn is_integral(&self) -> bool {
        matches!(self, Value::Byte(_) | Value::Int(_) | Value::Long(_))
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Integral value, without conversion from floating point
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Byte(b) => Some(i64::from(*b)),
            Value::Int(n) => Some(i64::from(*n)),
            Value::Long(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Byte(b) => Some(f64::from(*b)),
            Value::Int(n) => Some(f64::from(*n)),
            Value::Long(n) => Some(*n as f64),
            Value::Float(n) => Some(f64::from(*n)),
            Value::Double(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Name reported by `typeof`
    pub fn type_name(&self) -> String {
        match self {
            Value::Null => "null".into(),
            Value::Bool(_) => "bool".into(),
            Value::Byte(_) => "byte".into(),
            Value::Int(_) => "int".into(),
            Value::Long(_) => "long".into(),
            Value::Float(_) => "float".into(),
            Value::Double(_) => "double".into(),
            Value::Str(_) => "string".into(),
            Value::Date(_) => "date".into(),
            Value::Json(_) => "json".into(),
            Value::Record(r) => r.borrow().ty.name.clone(),
            Value::Array(_) => "array".into(),
            Value::Map(_) => "map".into(),
            Value::Queue(_) => "queue".into(),
            Value::Bitmap(b) => b.ty.name.clone(),
            Value::Function(_) => "function".into(),
            Value::Resource(h) => h.kind.clone(),
        }
    }

    /// Same storage, for composites
    pub fn same_ref(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Json(a), Value::Json(b)) => Rc::ptr_eq(a, b),
            (Value::Record(a), Value::Record(b)) => Rc::ptr_eq(a, b),
            (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b),
            (Value::Map(a), Value::Map(b)) => Rc::ptr_eq(a, b),
            (Value::Queue(a), Value::Queue(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Long(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Double(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

/// Parse `YYYY-MM-DD` or `YYYY-MM-DD[T ]HH:MM[:SS]`
pub fn parse_date(text: &str) -> Option<NaiveDateTime> {
    const DATETIME_FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ];

    let text = text.trim();
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Some(date.and_time(NaiveTime::MIN));
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
}

pub fn format_date(date: &NaiveDateTime) -> String {
    if date.time() == NaiveTime::MIN {
        date.format("%Y-%m-%d").to_string()
    } else if date.second() == 0 {
        date.format("%Y-%m-%d %H:%M").to_string()
    } else {
        date.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

fn format_double(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{n:.1}")
    } else {
        n.to_string()
    }
}

/// Textual form used by `print` and string concatenation
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Byte(b) => write!(f, "{b}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Long(n) => write!(f, "{n}"),
            Value::Float(n) => write!(f, "{}", format_double(f64::from(*n))),
            Value::Double(n) => write!(f, "{}", format_double(*n)),
            Value::Str(s) => write!(f, "{s}"),
            Value::Date(d) => write!(f, "{}", format_date(d)),
            Value::Json(doc) => write!(f, "{}", doc.borrow()),
            Value::Record(_) | Value::Map(_) => match super::json::value_to_display_json(self) {
                Ok(doc) => write!(f, "{doc}"),
                Err(_) => write!(f, "{}", self.type_name()),
            },
            Value::Array(_) | Value::Queue(_) => write_sequence(f, self, &mut Vec::new()),
            Value::Bitmap(b) => {
                write!(f, "{}{{", b.ty.name)?;
                for (i, field) in b.ty.fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}={}", field.name, b.ty.read(b.word, field))?;
                }
                write!(f, "}}")
            }
            Value::Function(name) => write!(f, "function {name}"),
            Value::Resource(h) => write!(f, "<{}#{}>", h.kind, h.id),
        }
    }
}

/// `[a, b]` for arrays and queues; one already being written shows as `[...]`
fn write_sequence(f: &mut fmt::Formatter<'_>, value: &Value, open: &mut Vec<*const ()>) -> fmt::Result {
    match value {
        Value::Array(array) => {
            let ptr = Rc::as_ptr(array) as *const ();
            write_items(f, ptr, array.borrow().items.iter(), open)
        }
        Value::Queue(queue) => {
            let ptr = Rc::as_ptr(queue) as *const ();
            write_items(f, ptr, queue.borrow().items.iter(), open)
        }
        other => write!(f, "{other}"),
    }
}

fn write_items<'a>(
    f: &mut fmt::Formatter<'_>,
    ptr: *const (),
    items: impl Iterator<Item = &'a Value>,
    open: &mut Vec<*const ()>,
) -> fmt::Result {
    if open.contains(&ptr) {
        return write!(f, "[...]");
    }

    open.push(ptr);
    write!(f, "[")?;
    for (i, item) in items.enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write_sequence(f, item, open)?;
    }
    open.pop();
    write!(f, "]")
}
