//! Coercion at typed boundaries
//!
//! Applied on typed declarations, assignments to typed bindings, parameter
//! binding and typed returns. Permissive: numbers narrow silently, numeric
//! strings convert, and only shape mismatches fail.

use super::array::{ArrayShape, ArrayValue};
use super::error::{RuntimeError, RuntimeResult};
use super::queue::QueueValue;
use super::json::{json_to_value, object_member, parse_json_text, value_to_json};
use super::types::{RecordType, TypeDesc};
use super::value::{parse_date, BitmapValue, RecordValue, Value};
use std::collections::BTreeMap;
use std::rc::Rc;

pub fn coerce(value: Value, target: &TypeDesc) -> RuntimeResult<Value> {
    if value.is_null() {
        return Ok(match target {
            TypeDesc::Byte
            | TypeDesc::Int
            | TypeDesc::Long
            | TypeDesc::Float
            | TypeDesc::Double
            | TypeDesc::String
            | TypeDesc::Bool => target.default_value(),
            _ => Value::Null,
        });
    }

    match target {
        TypeDesc::Any => Ok(value),
        TypeDesc::Byte => to_integer(&value, target).map(|n| Value::Byte(n as u8)),
        TypeDesc::Int => to_integer(&value, target).map(|n| Value::Int(n as i32)),
        TypeDesc::Long => to_integer(&value, target).map(Value::Long),
        TypeDesc::Float => to_float(&value, target).map(|n| Value::Float(n as f32)),
        TypeDesc::Double => to_float(&value, target).map(Value::Double),
        TypeDesc::String => Ok(match value {
            Value::Str(_) => value,
            other => Value::Str(other.to_string()),
        }),
        TypeDesc::Bool => match &value {
            Value::Bool(_) => Ok(value),
            Value::Str(s) if s.trim().eq_ignore_ascii_case("true") => Ok(Value::Bool(true)),
            Value::Str(s) if s.trim().eq_ignore_ascii_case("false") => Ok(Value::Bool(false)),
            Value::Json(doc) => match doc.borrow().as_bool() {
                Some(b) => Ok(Value::Bool(b)),
                None => Err(mismatch(&value, target)),
            },
            _ => Err(mismatch(&value, target)),
        },
        TypeDesc::Date => match &value {
            Value::Date(_) => Ok(value),
            Value::Str(s) => parse_date(s).map(Value::Date).ok_or_else(|| {
                RuntimeError::type_error(format!("Cannot convert '{s}' to date"))
            }),
            _ => Err(mismatch(&value, target)),
        },
        TypeDesc::Json => match &value {
            Value::Json(_) => Ok(value),
            Value::Str(s) => parse_json_text(s).map(Value::json),
            other => value_to_json(other).map(Value::json),
        },
        TypeDesc::Map => to_map(value, target),
        TypeDesc::Record(rt) => to_record(value, rt),
        TypeDesc::Bitmap(bt) => match &value {
            Value::Bitmap(b) if target.same_as(&TypeDesc::Bitmap(Rc::clone(&b.ty))) => Ok(value),
            v if v.is_integral() => {
                let raw = v.as_i64().unwrap_or_default();
                Ok(Value::Bitmap(BitmapValue {
                    ty: Rc::clone(bt),
                    word: (raw as u32) & bt.word_mask(),
                }))
            }
            _ => Err(mismatch(&value, target)),
        },
        TypeDesc::Array { elem, shape } => to_array(value, elem, shape, target),
        TypeDesc::Queue(elem) => to_queue(value, elem, target),
    }
}

/// A queue of the same element type is shared; arrays, JSON arrays and
/// other queues are copied in order
fn to_queue(value: Value, elem: &TypeDesc, target: &TypeDesc) -> RuntimeResult<Value> {
    let items: Vec<Value> = match &value {
        Value::Queue(queue) => {
            let source = queue.borrow();
            if matches!(elem, TypeDesc::Any) || source.elem.same_as(elem) {
                drop(source);
                return Ok(value);
            }
            source.items.iter().cloned().collect()
        }
        Value::Array(array) => array.borrow().items.clone(),
        Value::Json(doc) => match &*doc.borrow() {
            serde_json::Value::Array(nodes) => nodes.iter().map(json_to_value).collect(),
            _ => return Err(mismatch(&value, target)),
        },
        _ => return Err(mismatch(&value, target)),
    };

    let mut queue = QueueValue::new(elem.clone());
    for item in items {
        queue.enqueue(item)?;
    }
    Ok(Value::queue(queue))
}

/// Explicit conversion such as `int(x)` or `Flags(b)`. Records and maps
/// take only JSON objects; every failure is a type error naming the value.
pub fn cast(value: Value, target: &TypeDesc) -> RuntimeResult<Value> {
    if let (TypeDesc::Record(_) | TypeDesc::Map, Value::Json(doc)) = (target, &value) {
        let doc = doc.borrow();
        if !doc.is_object() {
            let what = if doc.is_array() { "JSON array" } else { "JSON scalar" };
            return Err(RuntimeError::type_error(format!(
                "Cannot cast {what} to {target}: only JSON objects can be cast"
            )));
        }
    }
    coerce(value.clone(), target).map_err(|e| {
        RuntimeError::type_error(format!(
            "Cannot cast value '{value}' to type {target}: {}",
            e.message
        ))
    })
}

fn mismatch(value: &Value, target: &TypeDesc) -> RuntimeError {
    RuntimeError::type_error(format!("Cannot convert {} to {}", value.type_name(), target))
}

fn to_integer(value: &Value, target: &TypeDesc) -> RuntimeResult<i64> {
    match value {
        Value::Byte(_) | Value::Int(_) | Value::Long(_) => Ok(value.as_i64().unwrap_or_default()),
        Value::Float(_) | Value::Double(_) => Ok(value.as_f64().unwrap_or_default() as i64),
        Value::Str(s) => {
            let text = s.trim();
            text.parse::<i64>()
                .ok()
                .or_else(|| text.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f as i64))
                .ok_or_else(|| {
                    RuntimeError::type_error(format!("Cannot convert '{s}' to {target}"))
                })
        }
        Value::Json(doc) => match json_to_value(&doc.borrow()) {
            n if n.is_numeric() => to_integer(&n, target),
            _ => Err(mismatch(value, target)),
        },
        _ => Err(mismatch(value, target)),
    }
}

fn to_float(value: &Value, target: &TypeDesc) -> RuntimeResult<f64> {
    match value {
        v if v.is_numeric() => Ok(v.as_f64().unwrap_or_default()),
        Value::Str(s) => s.trim().parse::<f64>().map_err(|_| {
            RuntimeError::type_error(format!("Cannot convert '{s}' to {target}"))
        }),
        Value::Json(doc) => match doc.borrow().as_f64() {
            Some(n) => Ok(n),
            None => Err(mismatch(value, target)),
        },
        _ => Err(mismatch(value, target)),
    }
}

fn to_map(value: Value, target: &TypeDesc) -> RuntimeResult<Value> {
    match &value {
        Value::Map(_) => Ok(value),
        Value::Json(_) | Value::Record(_) | Value::Str(_) => {
            let doc = match &value {
                Value::Str(s) => parse_json_text(s)?,
                other => value_to_json(other)?,
            };
            let Some(object) = doc.as_object() else {
                return Err(mismatch(&value, target));
            };
            let entries: BTreeMap<String, Value> = object
                .iter()
                .map(|(k, v)| (k.clone(), json_to_value(v)))
                .collect();
            Ok(Value::map(entries))
        }
        _ => Err(mismatch(&value, target)),
    }
}

fn to_record(value: Value, rt: &Rc<RecordType>) -> RuntimeResult<Value> {
    let doc = match &value {
        Value::Record(r) if is_record_of(&r.borrow(), rt) => return Ok(value),
        Value::Record(_) | Value::Map(_) | Value::Json(_) => value_to_json(&value)?,
        Value::Str(s) => parse_json_text(s)?,
        _ => return Err(mismatch(&value, &TypeDesc::Record(Rc::clone(rt)))),
    };
    record_from_json(rt, &doc).map(Value::record)
}

fn is_record_of(record: &RecordValue, rt: &Rc<RecordType>) -> bool {
    Rc::ptr_eq(&record.ty, rt) || record.ty.name.eq_ignore_ascii_case(&rt.name)
}

/// Fill a record from a JSON object, matching keys to fields without
/// regard to case; missing fields take their default, extra keys are
/// ignored, nested records recurse through `coerce`
pub fn record_from_json(rt: &Rc<RecordType>, doc: &serde_json::Value) -> RuntimeResult<RecordValue> {
    let Some(object) = doc.as_object() else {
        return Err(RuntimeError::type_error(format!(
            "Cannot convert json {} to {}",
            json_kind(doc),
            rt.name
        )));
    };

    let mut record = rt.instantiate();
    for (field, slot) in rt.fields.iter().zip(record.fields.iter_mut()) {
        if let Some(node) = object_member(object, &field.name) {
            *slot = coerce(json_to_value(node), &field.ty).map_err(|e| {
                RuntimeError::new(
                    e.kind,
                    format!("Field '{}' of {}: {}", field.name, rt.name, e.message),
                )
            })?;
        }
    }
    Ok(record)
}

fn json_kind(doc: &serde_json::Value) -> &'static str {
    match doc {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

fn to_array(
    value: Value,
    elem: &TypeDesc,
    shape: &ArrayShape,
    target: &TypeDesc,
) -> RuntimeResult<Value> {
    if let Value::Array(array) = &value {
        let shareable = {
            let source = array.borrow();
            source.elem.same_as(elem) && &source.shape == shape
        };
        if shareable {
            return Ok(value);
        }
    }

    let items: Vec<Value> = match &value {
        Value::Array(array) => {
            let source = array.borrow();
            if matches!(shape, ArrayShape::Dims(_)) {
                flatten(&source.items, &mut vec![Rc::as_ptr(array) as *const ()])?
            } else {
                source.items.clone()
            }
        }
        Value::Json(doc) => match &*doc.borrow() {
            serde_json::Value::Array(nodes) => nodes.iter().map(json_to_value).collect(),
            serde_json::Value::Object(object) if object.is_empty() => Vec::new(),
            _ => return Err(mismatch(&value, target)),
        },
        _ => return Err(mismatch(&value, target)),
    };

    let capacity = shape.initial_len();
    if *shape != ArrayShape::Dynamic && items.len() > capacity {
        return Err(RuntimeError::index_error(format!(
            "{} elements do not fit {}",
            items.len(),
            target
        )));
    }

    let mut array = ArrayValue::new(elem.clone(), shape.clone());
    for (i, item) in items.into_iter().enumerate() {
        let item = coerce(item, elem)?;
        if i < array.items.len() {
            array.items[i] = item;
        } else {
            array.items.push(item);
        }
    }
    Ok(Value::array(array))
}

/// Nested arrays in row-major order
fn flatten(items: &[Value], open: &mut Vec<*const ()>) -> RuntimeResult<Vec<Value>> {
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        match item {
            Value::Array(inner) => {
                let ptr = Rc::as_ptr(inner) as *const ();
                if open.contains(&ptr) {
                    return Err(RuntimeError::validation_error(
                        "Cannot flatten an array that contains itself",
                    ));
                }
                open.push(ptr);
                out.extend(flatten(&inner.borrow().items, open)?);
                open.pop();
            }
            other => out.push(other.clone()),
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::error::ErrorKind;
    use crate::runtime::types::FieldType;
    use serde_json::json;

    fn point() -> Rc<RecordType> {
        Rc::new(RecordType {
            name: "Point".into(),
            fields: vec![
                FieldType { name: "x".into(), ty: TypeDesc::Int },
                FieldType { name: "y".into(), ty: TypeDesc::Int },
            ],
        })
    }

    #[test]
    fn test_numeric_string_to_int() {
        assert!(matches!(coerce(Value::str("100"), &TypeDesc::Int).unwrap(), Value::Int(100)));
        assert!(matches!(coerce(Value::str(" 7 "), &TypeDesc::Long).unwrap(), Value::Long(7)));
        assert!(matches!(coerce(Value::str("2.5"), &TypeDesc::Double).unwrap(), Value::Double(d) if d == 2.5));
    }

    #[test]
    fn test_non_numeric_string_is_type_error() {
        let err = coerce(Value::str("abc"), &TypeDesc::Int).unwrap_err();
        assert_eq!(err.kind, ErrorKind::TypeError);
        assert!(coerce(Value::Bool(true), &TypeDesc::Int).is_err());
    }

    #[test]
    fn test_narrowing_truncates() {
        assert!(matches!(coerce(Value::Double(3.9), &TypeDesc::Int).unwrap(), Value::Int(3)));
        assert!(matches!(coerce(Value::Int(300), &TypeDesc::Byte).unwrap(), Value::Byte(44)));
    }

    #[test]
    fn test_widening() {
        assert!(matches!(coerce(Value::Byte(5), &TypeDesc::Long).unwrap(), Value::Long(5)));
        assert!(matches!(coerce(Value::Int(5), &TypeDesc::Double).unwrap(), Value::Double(d) if d == 5.0));
    }

    #[test]
    fn test_null_takes_primitive_default() {
        assert!(matches!(coerce(Value::Null, &TypeDesc::Int).unwrap(), Value::Int(0)));
        assert!(coerce(Value::Null, &TypeDesc::Record(point())).unwrap().is_null());
    }

    #[test]
    fn test_bool_from_string() {
        assert!(matches!(coerce(Value::str("TRUE"), &TypeDesc::Bool).unwrap(), Value::Bool(true)));
        assert!(coerce(Value::str("yes"), &TypeDesc::Bool).is_err());
        assert!(coerce(Value::Int(1), &TypeDesc::Bool).is_err());
    }

    #[test]
    fn test_json_to_record_and_back() {
        let rt = point();
        let doc = Value::json(json!({"X": 1, "y": "2", "extra": true}));
        let record = coerce(doc, &TypeDesc::Record(Rc::clone(&rt))).unwrap();
        assert_eq!(value_to_json(&record).unwrap(), json!({"x": 1, "y": 2}));
    }

    #[test]
    fn test_missing_json_field_gets_default() {
        let record = record_from_json(&point(), &json!({"x": 4})).unwrap();
        assert!(matches!(record.fields[1], Value::Int(0)));
    }

    #[test]
    fn test_nested_record_from_json() {
        let line = Rc::new(RecordType {
            name: "Line".into(),
            fields: vec![
                FieldType { name: "from".into(), ty: TypeDesc::Record(point()) },
                FieldType { name: "to".into(), ty: TypeDesc::Record(point()) },
            ],
        });
        let doc = json!({"from": {"x": 1, "y": 2}, "to": {"x": 3, "y": 4}});
        let record = record_from_json(&line, &doc).unwrap();
        assert_eq!(value_to_json(&Value::record(record)).unwrap(), doc);
    }

    #[test]
    fn test_json_array_to_record_is_type_error() {
        let err = coerce(Value::json(json!([1])), &TypeDesc::Record(point())).unwrap_err();
        assert_eq!(err.kind, ErrorKind::TypeError);
    }

    #[test]
    fn test_cast_failures_are_type_errors() {
        assert!(matches!(cast(Value::str("5"), &TypeDesc::Int).unwrap(), Value::Int(5)));
        let err = cast(Value::str("abc"), &TypeDesc::Int).unwrap_err();
        assert_eq!(err.kind, ErrorKind::TypeError);
        assert!(err.message.starts_with("Cannot cast value 'abc' to type int"));

        let err = cast(Value::json(json!([{"x": 1}])), &TypeDesc::Record(point())).unwrap_err();
        assert!(err.message.contains("only JSON objects"));
        assert!(cast(Value::json(json!([1])), &TypeDesc::Map).is_err());
        assert!(cast(Value::json(json!({"k": 1})), &TypeDesc::Map).is_ok());
    }

    #[test]
    fn test_same_typed_array_is_shared() {
        let target = TypeDesc::Array {
            elem: Box::new(TypeDesc::Int),
            shape: ArrayShape::Dynamic,
        };
        let original = Value::array(ArrayValue::new(TypeDesc::Int, ArrayShape::Dynamic));
        let coerced = coerce(original.clone(), &target).unwrap();
        assert!(original.same_ref(&coerced));
    }

    #[test]
    fn test_array_elements_coerced_into_fixed_shape() {
        let source = Value::array(ArrayValue::from_values(
            TypeDesc::Any,
            vec![Value::str("1"), Value::Double(2.7)],
        ));
        let target = TypeDesc::Array {
            elem: Box::new(TypeDesc::Int),
            shape: ArrayShape::Fixed(3),
        };
        let Value::Array(result) = coerce(source, &target).unwrap() else {
            panic!("expected array");
        };
        let result = result.borrow();
        assert_eq!(result.len(), 3);
        assert!(matches!(result.items[0], Value::Int(1)));
        assert!(matches!(result.items[1], Value::Int(2)));
        assert!(matches!(result.items[2], Value::Int(0)));
    }

    #[test]
    fn test_too_many_elements_for_fixed() {
        let source = Value::json(json!([1, 2, 3]));
        let target = TypeDesc::Array {
            elem: Box::new(TypeDesc::Int),
            shape: ArrayShape::Fixed(2),
        };
        assert_eq!(coerce(source, &target).unwrap_err().kind, ErrorKind::IndexError);
    }

    #[test]
    fn test_array_into_queue_keeps_order() {
        let source = Value::json(json!(["3", 1]));
        let target = TypeDesc::Queue(Box::new(TypeDesc::Int));
        let Value::Queue(queue) = coerce(source, &target).unwrap() else {
            panic!("expected queue");
        };
        let mut queue = queue.borrow_mut();
        assert!(matches!(queue.dequeue(), Value::Int(3)));
        assert!(matches!(queue.dequeue(), Value::Int(1)));
    }

    #[test]
    fn test_same_typed_queue_is_shared() {
        let target = TypeDesc::Queue(Box::new(TypeDesc::String));
        let original = Value::queue(QueueValue::new(TypeDesc::String));
        assert!(original.same_ref(&coerce(original.clone(), &target).unwrap()));
        assert!(coerce(Value::Int(1), &target).is_err());
    }

    #[test]
    fn test_self_containing_array_into_grid() {
        let source = Value::array(ArrayValue::from_values(TypeDesc::Any, vec![]));
        if let Value::Array(inner) = &source {
            inner.borrow_mut().items.push(source.clone());
        }
        let target = TypeDesc::Array {
            elem: Box::new(TypeDesc::Int),
            shape: ArrayShape::Dims(vec![2, 2]),
        };
        assert_eq!(coerce(source, &target).unwrap_err().kind, ErrorKind::ValidationError);
    }

    #[test]
    fn test_empty_object_to_array() {
        let target = TypeDesc::Array {
            elem: Box::new(TypeDesc::String),
            shape: ArrayShape::Dynamic,
        };
        let Value::Array(result) = coerce(Value::json(json!({})), &target).unwrap() else {
            panic!("expected array");
        };
        assert!(result.borrow().is_empty());
    }

    #[test]
    fn test_string_to_json_parses() {
        let v = coerce(Value::str("{\"a\": [1]}"), &TypeDesc::Json).unwrap();
        assert_eq!(value_to_json(&v).unwrap(), json!({"a": [1]}));
        assert_eq!(
            coerce(Value::str("{bad"), &TypeDesc::Json).unwrap_err().kind,
            ErrorKind::ParseError
        );
    }

    #[test]
    fn test_map_from_json_object() {
        let v = coerce(Value::json(json!({"b": 2, "a": 1})), &TypeDesc::Map).unwrap();
        let Value::Map(map) = v else { panic!("expected map") };
        let keys: Vec<String> = map.borrow().keys().cloned().collect();
        assert_eq!(keys, vec!["a", "b"]);
    }
}
