//! Member and index access, and writes through `a.b[i]` paths

use super::operators::binary;
use super::Interpreter;
use crate::compiler::lexer::token_kind::EbsTokenKind;
use crate::compiler::parser::expr::{IndexAccess, MemberAccess};
use crate::compiler::parser::stmt::{Accessor, LValue};
use crate::runtime::coerce::coerce;
use crate::runtime::error::{RuntimeError, RuntimeResult};
use crate::runtime::json::{json_to_value, object_member, value_to_json};
use crate::runtime::types::TypeDesc;
use crate::runtime::value::Value;

/// One evaluated step of an assignment path
#[derive(Debug, Clone)]
enum Step {
    Field(String),
    Index(Vec<Value>),
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Step::Field(name) => write!(f, ".{name}"),
            Step::Index(values) => {
                let parts: Vec<String> = values.iter().map(|v| v.to_string()).collect();
                write!(f, "[{}]", parts.join(", "))
            }
        }
    }
}

fn is_length(member: &str) -> bool {
    member.eq_ignore_ascii_case("length") || member.eq_ignore_ascii_case("size")
}

fn count_value(n: usize) -> Value {
    i32::try_from(n)
        .map(Value::Int)
        .unwrap_or(Value::Long(n as i64))
}

fn word_value(word: u32) -> Value {
    i32::try_from(word)
        .map(Value::Int)
        .unwrap_or(Value::Long(i64::from(word)))
}

/// Composites written through in place
fn is_shared(value: &Value) -> bool {
    matches!(
        value,
        Value::Json(_) | Value::Record(_) | Value::Array(_) | Value::Map(_) | Value::Queue(_)
    )
}

fn index_integer(value: &Value) -> RuntimeResult<i64> {
    value.as_i64().ok_or_else(|| {
        RuntimeError::type_error(format!(
            "Index must be an integer, got {}",
            value.type_name()
        ))
    })
}

fn single<'a>(indices: &'a [Value], what: &str) -> RuntimeResult<&'a Value> {
    match indices {
        [index] => Ok(index),
        _ => Err(RuntimeError::index_error(format!(
            "{what} takes one index, got {}",
            indices.len()
        ))),
    }
}

/// Key text for a map, json object, record or bitmap step
fn key_text(index: &Value) -> String {
    match index {
        Value::Str(s) => s.clone(),
        other => other.to_string(),
    }
}

/// `object.member`
pub(super) fn read_member(object: &Value, member: &str) -> RuntimeResult<Value> {
    match object {
        Value::Null => Err(RuntimeError::null_error(format!(
            "Cannot read '{member}' of null"
        ))),
        Value::Record(record) => {
            let record = record.borrow();
            record.get(member).cloned().ok_or_else(|| {
                RuntimeError::not_found(format!(
                    "Record {} has no field '{member}'",
                    record.ty.name
                ))
            })
        }
        Value::Bitmap(bitmap) => match bitmap.ty.field(member) {
            Some(field) => Ok(word_value(bitmap.ty.read(bitmap.word, field))),
            None => Err(RuntimeError::not_found(format!(
                "Bitmap {} has no field '{member}'",
                bitmap.ty.name
            ))),
        },
        Value::Json(doc) => {
            let doc = doc.borrow();
            match &*doc {
                serde_json::Value::Object(map) => match object_member(map, member) {
                    Some(node) => Ok(json_to_value(node)),
                    None if is_length(member) => Ok(count_value(map.len())),
                    None => Ok(Value::Null),
                },
                serde_json::Value::Array(items) if is_length(member) => Ok(count_value(items.len())),
                serde_json::Value::String(s) if is_length(member) => {
                    Ok(count_value(s.chars().count()))
                }
                _ => Err(RuntimeError::type_error(format!(
                    "Cannot read '{member}' of a json scalar"
                ))),
            }
        }
        Value::Map(map) => {
            let map = map.borrow();
            match map.get(member) {
                Some(value) => Ok(value.clone()),
                None if is_length(member) => Ok(count_value(map.len())),
                None => Ok(Value::Null),
            }
        }
        Value::Array(array) if is_length(member) => Ok(count_value(array.borrow().len())),
        Value::Queue(queue) if is_length(member) => Ok(count_value(queue.borrow().len())),
        Value::Str(s) if is_length(member) => Ok(count_value(s.chars().count())),
        other => Err(RuntimeError::type_error(format!(
            "{} has no member '{member}'",
            other.type_name()
        ))),
    }
}

fn read_json_index(node: &serde_json::Value, index: &Value) -> RuntimeResult<Value> {
    match node {
        serde_json::Value::Array(items) => {
            let i = index_integer(index)?;
            usize::try_from(i)
                .ok()
                .and_then(|i| items.get(i))
                .map(json_to_value)
                .ok_or_else(|| {
                    RuntimeError::index_error(format!(
                        "Index {i} out of bounds for json array of length {}",
                        items.len()
                    ))
                })
        }
        serde_json::Value::Object(map) => Ok(object_member(map, &key_text(index))
            .map(json_to_value)
            .unwrap_or(Value::Null)),
        _ => Err(RuntimeError::type_error("Cannot index a json scalar")),
    }
}

/// `object[i, ...]`
pub(super) fn read_index(object: &Value, indices: &[Value]) -> RuntimeResult<Value> {
    match object {
        Value::Null => Err(RuntimeError::null_error("Cannot index null")),
        Value::Array(array) => {
            let indices = indices
                .iter()
                .map(index_integer)
                .collect::<RuntimeResult<Vec<_>>>()?;
            array.borrow().get(&indices)
        }
        Value::Str(s) => {
            let i = index_integer(single(indices, "A string")?)?;
            usize::try_from(i)
                .ok()
                .and_then(|i| s.chars().nth(i))
                .map(|c| Value::Str(c.to_string()))
                .ok_or_else(|| {
                    RuntimeError::index_error(format!(
                        "Index {i} out of bounds for string of length {}",
                        s.chars().count()
                    ))
                })
        }
        Value::Json(doc) => read_json_index(&doc.borrow(), single(indices, "A json value")?),
        Value::Map(map) => {
            let key = key_text(single(indices, "A map")?);
            Ok(map.borrow().get(&key).cloned().unwrap_or(Value::Null))
        }
        Value::Record(_) | Value::Bitmap(_) => {
            read_member(object, &key_text(single(indices, "A record")?))
        }
        other => Err(RuntimeError::type_error(format!(
            "Cannot index {}",
            other.type_name()
        ))),
    }
}

fn combine(op: Option<EbsTokenKind>, current: Value, rhs: Value) -> RuntimeResult<Value> {
    match op {
        Some(op) => binary(op, current, rhs),
        None => Ok(rhs),
    }
}

fn step_key(step: &Step) -> RuntimeResult<String> {
    match step {
        Step::Field(name) => Ok(name.clone()),
        Step::Index(indices) => Ok(key_text(single(indices, "A keyed value")?)),
    }
}

fn step_indices(step: &Step) -> RuntimeResult<Vec<i64>> {
    match step {
        Step::Index(indices) => indices.iter().map(index_integer).collect(),
        Step::Field(name) => Err(RuntimeError::type_error(format!(
            "Arrays have no field '{name}'"
        ))),
    }
}

/// New content for a slot after writing `rest` below it, or `None` when
/// the write went through a shared handle
fn descend(
    current: Value,
    rest: &[Step],
    op: Option<EbsTokenKind>,
    rhs: Value,
    slot_type: &TypeDesc,
) -> RuntimeResult<Option<Value>> {
    if rest.is_empty() {
        let value = combine(op, current, rhs)?;
        return coerce(value, slot_type).map(Some);
    }
    let mut child = current;
    store(&mut child, rest, op, rhs)?;
    Ok(if is_shared(&child) { None } else { Some(child) })
}

/// Write `rhs` at `steps` below `container`. `steps` is never empty.
fn store(
    container: &mut Value,
    steps: &[Step],
    op: Option<EbsTokenKind>,
    rhs: Value,
) -> RuntimeResult<()> {
    let Some((step, rest)) = steps.split_first() else {
        *container = combine(op, std::mem::take(container), rhs)?;
        return Ok(());
    };

    match container {
        Value::Null => Err(RuntimeError::null_error(format!("Cannot write {step} of null"))),
        Value::Json(doc) => {
            // detach first so `j.a = j` does not alias the borrowed document
            let rhs = json_to_value(&value_to_json(&rhs)?);
            store_json(&mut doc.borrow_mut(), steps, op, rhs)
        }
        Value::Record(record) => {
            let name = step_key(step)?;
            let (index, field_type, current) = {
                let r = record.borrow();
                let index = r.ty.field_index(&name).ok_or_else(|| {
                    RuntimeError::not_found(format!(
                        "Record {} has no field '{name}'",
                        r.ty.name
                    ))
                })?;
                (index, r.ty.fields[index].ty.clone(), r.fields[index].clone())
            };
            if let Some(value) = descend(current, rest, op, rhs, &field_type)? {
                record.borrow_mut().fields[index] = value;
            }
            Ok(())
        }
        Value::Array(array) => {
            let indices = step_indices(step)?;
            let elem = array.borrow().elem.clone();
            // a plain store may grow a dynamic array, so skip the read
            let current = if rest.is_empty() && op.is_none() {
                Value::Null
            } else {
                array.borrow().get(&indices)?
            };
            if let Some(value) = descend(current, rest, op, rhs, &elem)? {
                array.borrow_mut().set(&indices, value)?;
            }
            Ok(())
        }
        Value::Map(map) => {
            let key = step_key(step)?;
            let current = map.borrow().get(&key).cloned().unwrap_or(Value::Null);
            if let Some(value) = descend(current, rest, op, rhs, &TypeDesc::Any)? {
                map.borrow_mut().insert(key, value);
            }
            Ok(())
        }
        Value::Bitmap(bitmap) => {
            if !rest.is_empty() {
                return Err(RuntimeError::type_error("Bitmap fields have no members"));
            }
            let name = step_key(step)?;
            let field = bitmap.ty.field(&name).cloned().ok_or_else(|| {
                RuntimeError::not_found(format!(
                    "Bitmap {} has no field '{name}'",
                    bitmap.ty.name
                ))
            })?;
            let current = word_value(bitmap.ty.read(bitmap.word, &field));
            let value = combine(op, current, rhs)?;
            let raw = match &value {
                Value::Bool(b) => i64::from(*b),
                other => other.as_i64().ok_or_else(|| {
                    RuntimeError::type_error(format!(
                        "Bitmap field '{}' takes an integer, got {}",
                        field.name,
                        other.type_name()
                    ))
                })?,
            };
            bitmap.word = bitmap.ty.write(bitmap.word, &field, raw)?;
            Ok(())
        }
        Value::Str(_) => Err(RuntimeError::type_error("Strings are read-only")),
        other => Err(RuntimeError::type_error(format!(
            "Cannot write {step} of {}",
            other.type_name()
        ))),
    }
}

/// Path writes inside a json document. Missing object members are created
/// and a null node becomes an object or array as the step requires.
fn store_json(
    node: &mut serde_json::Value,
    steps: &[Step],
    op: Option<EbsTokenKind>,
    rhs: Value,
) -> RuntimeResult<()> {
    let Some((step, rest)) = steps.split_first() else {
        let value = combine(op, json_to_value(node), rhs)?;
        *node = value_to_json(&value)?;
        return Ok(());
    };

    if node.is_null() {
        let positional = matches!(step, Step::Index(ix) if ix.len() == 1 && ix[0].is_integral());
        *node = if positional {
            serde_json::Value::Array(Vec::new())
        } else {
            serde_json::Value::Object(serde_json::Map::new())
        };
    }

    let slot = match node {
        serde_json::Value::Object(map) => {
            let key = step_key(step)?;
            let existing = if map.contains_key(&key) {
                Some(key.clone())
            } else {
                map.keys().find(|k| k.eq_ignore_ascii_case(&key)).cloned()
            };
            map.entry(existing.unwrap_or(key))
                .or_insert(serde_json::Value::Null)
        }
        serde_json::Value::Array(items) => {
            let Step::Index(indices) = step else {
                return Err(RuntimeError::type_error(format!(
                    "Cannot write {step} of a json array"
                )));
            };
            let i = index_integer(single(indices, "A json array")?)?;
            let i = usize::try_from(i)
                .map_err(|_| RuntimeError::index_error(format!("Negative index {i}")))?;
            if i >= items.len() {
                items.resize(i + 1, serde_json::Value::Null);
            }
            &mut items[i]
        }
        _ => {
            return Err(RuntimeError::type_error(format!(
                "Cannot write {step} of a json scalar"
            )))
        }
    };
    store_json(slot, rest, op, rhs)
}

impl Interpreter {
    pub(super) fn member_access(&mut self, access: &MemberAccess) -> RuntimeResult<Value> {
        let object = self.evaluate(&access.object)?;
        read_member(&object, &access.member)
    }

    pub(super) fn index_access(&mut self, access: &IndexAccess) -> RuntimeResult<Value> {
        let object = self.evaluate(&access.object)?;
        let indices = access
            .indices
            .iter()
            .map(|e| self.evaluate(e))
            .collect::<RuntimeResult<Vec<_>>>()?;
        read_index(&object, &indices)
    }

    /// `name.a[i] (op)= rhs`
    pub(super) fn assign_path(
        &mut self,
        target: &LValue,
        op: Option<EbsTokenKind>,
        rhs: Value,
    ) -> RuntimeResult<()> {
        let mut steps = Vec::with_capacity(target.path.len());
        for accessor in &target.path {
            steps.push(match accessor {
                Accessor::Field(name) => Step::Field(name.clone()),
                Accessor::Index(exprs) => Step::Index(
                    exprs
                        .iter()
                        .map(|e| self.evaluate(e))
                        .collect::<RuntimeResult<_>>()?,
                ),
            });
        }

        let mut root = self.env.borrow().get(&target.name)?;
        store(&mut root, &steps, op, rhs)?;
        if !is_shared(&root) {
            // value types such as bitmaps are written back whole
            self.env.borrow_mut().write_back(&target.name, root)?;
        }
        Ok(())
    }
}
