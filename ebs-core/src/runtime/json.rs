//! Value <-> JSON document conversion

use super::error::{RuntimeError, RuntimeResult};
use super::value::{format_date, Value};
use serde_json::{Map, Number};
use std::rc::Rc;

/// Structural JSON form of a value; records keep declared field order.
/// A composite that contains itself cannot be converted.
pub fn value_to_json(value: &Value) -> RuntimeResult<serde_json::Value> {
    JsonWriter::new(false).convert(value)
}

/// JSON form for printing: a composite nested inside itself becomes a
/// `"[...]"` or `"{...}"` placeholder instead of an error
pub(crate) fn value_to_display_json(value: &Value) -> RuntimeResult<serde_json::Value> {
    JsonWriter::new(true).convert(value)
}

struct JsonWriter {
    /// Composites on the current path
    open: Vec<*const ()>,
    placeholders: bool,
}

impl JsonWriter {
    fn new(placeholders: bool) -> Self {
        Self {
            open: Vec::new(),
            placeholders,
        }
    }

    fn convert(&mut self, value: &Value) -> RuntimeResult<serde_json::Value> {
        let (ptr, placeholder) = match value {
            Value::Record(r) => (Rc::as_ptr(r) as *const (), "{...}"),
            Value::Map(m) => (Rc::as_ptr(m) as *const (), "{...}"),
            Value::Array(a) => (Rc::as_ptr(a) as *const (), "[...]"),
            Value::Queue(q) => (Rc::as_ptr(q) as *const (), "[...]"),
            _ => return self.convert_inner(value),
        };
        if self.open.contains(&ptr) {
            if self.placeholders {
                return Ok(serde_json::Value::String(placeholder.to_string()));
            }
            return Err(RuntimeError::validation_error(format!(
                "Cannot convert {} to json: it contains itself",
                value.type_name()
            )));
        }
        self.open.push(ptr);
        let result = self.convert_inner(value);
        self.open.pop();
        result
    }

    fn convert_inner(&mut self, value: &Value) -> RuntimeResult<serde_json::Value> {
        Ok(match value {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Byte(b) => serde_json::Value::from(*b),
            Value::Int(n) => serde_json::Value::from(*n),
            Value::Long(n) => serde_json::Value::from(*n),
            Value::Float(n) => float_to_json(f64::from(*n)),
            Value::Double(n) => float_to_json(*n),
            Value::Str(s) => serde_json::Value::String(s.clone()),
            Value::Date(d) => serde_json::Value::String(format_date(d)),
            Value::Json(doc) => doc.borrow().clone(),
            Value::Record(record) => {
                let record = record.borrow();
                let mut object = Map::new();
                for (field, value) in record.ty.fields.iter().zip(&record.fields) {
                    object.insert(field.name.clone(), self.convert(value)?);
                }
                serde_json::Value::Object(object)
            }
            Value::Array(array) => serde_json::Value::Array(
                array
                    .borrow()
                    .items
                    .iter()
                    .map(|item| self.convert(item))
                    .collect::<RuntimeResult<_>>()?,
            ),
            Value::Map(map) => {
                let mut object = Map::new();
                for (key, value) in map.borrow().iter() {
                    object.insert(key.clone(), self.convert(value)?);
                }
                serde_json::Value::Object(object)
            }
            Value::Queue(queue) => serde_json::Value::Array(
                queue
                    .borrow()
                    .items
                    .iter()
                    .map(|item| self.convert(item))
                    .collect::<RuntimeResult<_>>()?,
            ),
            Value::Bitmap(bitmap) => {
                let mut object = Map::new();
                for field in &bitmap.ty.fields {
                    object.insert(
                        field.name.clone(),
                        serde_json::Value::from(bitmap.ty.read(bitmap.word, field)),
                    );
                }
                serde_json::Value::Object(object)
            }
            Value::Function(_) | Value::Resource(_) => {
                return Err(RuntimeError::type_error(format!(
                    "Cannot convert {} to json",
                    value.type_name()
                )))
            }
        })
    }
}

fn float_to_json(n: f64) -> serde_json::Value {
    Number::from_f64(n)
        .map(serde_json::Value::Number)
        .unwrap_or(serde_json::Value::Null)
}

/// Script value for a JSON node. Scalars become primitives (integers as
/// `int` when they fit, else `long`); arrays and objects become a new
/// `json` value holding a copy of the node.
pub fn json_to_value(node: &serde_json::Value) -> Value {
    match node {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                i32::try_from(i).map(Value::Int).unwrap_or(Value::Long(i))
            } else {
                Value::Double(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        serde_json::Value::String(s) => Value::Str(s.clone()),
        serde_json::Value::Array(_) | serde_json::Value::Object(_) => Value::json(node.clone()),
    }
}

/// Object member by key; exact match first, then case-insensitive
pub fn object_member<'a>(
    object: &'a Map<String, serde_json::Value>,
    key: &str,
) -> Option<&'a serde_json::Value> {
    object.get(key).or_else(|| {
        object
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v)
    })
}

pub fn parse_json_text(text: &str) -> RuntimeResult<serde_json::Value> {
    serde_json::from_str(text)
        .map_err(|e| RuntimeError::parse_error(format!("Invalid JSON: {e}")))
}
