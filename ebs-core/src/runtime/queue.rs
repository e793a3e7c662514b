//! FIFO queues
//!
//! A `queue.int` variable holds a shared handle like an array does. The
//! `queue.*` operations ship with the engine through [`QueueBuiltins`], a
//! provider the interpreter consults after the host's builtins.

use super::array::ArrayValue;
use super::builtins::{BuiltinParam, BuiltinProvider, BuiltinSignature};
use super::coerce::coerce;
use super::error::{RuntimeError, RuntimeResult};
use super::interpreter::equals;
use super::types::TypeDesc;
use super::value::{QueueRef, Value};
use std::collections::VecDeque;

#[derive(Debug, Clone)]
pub struct QueueValue {
    pub elem: TypeDesc,
    pub items: VecDeque<Value>,
}

impl QueueValue {
    pub fn new(elem: TypeDesc) -> Self {
        Self {
            elem,
            items: VecDeque::new(),
        }
    }

    /// Coerce `value` to the element type and add it at the back
    pub fn enqueue(&mut self, value: Value) -> RuntimeResult<()> {
        let value = coerce(value, &self.elem)?;
        self.items.push_back(value);
        Ok(())
    }

    /// Front element, or null when empty
    pub fn dequeue(&mut self) -> Value {
        self.items.pop_front().unwrap_or_default()
    }

    pub fn peek(&self) -> Value {
        self.items.front().cloned().unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, value: &Value) -> bool {
        self.items.iter().any(|item| equals(item, value))
    }

    /// Dynamic array of the current contents, front first
    pub fn to_array(&self) -> ArrayValue {
        ArrayValue::from_values(self.elem.clone(), self.items.iter().cloned().collect())
    }
}

const OPERATIONS: [&str; 8] = [
    "enqueue", "dequeue", "peek", "isempty", "size", "clear", "contains", "toarray",
];

/// `queue.enqueue`, `queue.dequeue`, `queue.peek`, `queue.isEmpty`,
/// `queue.size`, `queue.clear`, `queue.contains` and `queue.toArray`
#[derive(Debug, Default, Clone, Copy)]
pub struct QueueBuiltins;

impl QueueBuiltins {
    fn operation(name: &str) -> Option<&'static str> {
        let (prefix, op) = name.split_once('.')?;
        if !prefix.eq_ignore_ascii_case("queue") {
            return None;
        }
        OPERATIONS
            .iter()
            .copied()
            .find(|candidate| candidate.eq_ignore_ascii_case(op))
    }
}

fn target<'a>(name: &str, args: &'a [Value]) -> RuntimeResult<&'a QueueRef> {
    match args.first() {
        Some(Value::Queue(queue)) => Ok(queue),
        None | Some(Value::Null) => Err(RuntimeError::null_error(format!(
            "{name}: queue cannot be null"
        ))),
        Some(other) => Err(RuntimeError::type_error(format!(
            "{name}: first argument must be a queue, got {}",
            other.type_name()
        ))),
    }
}

impl BuiltinProvider for QueueBuiltins {
    fn signature(&self, name: &str) -> Option<BuiltinSignature> {
        let op = Self::operation(name)?;
        let mut params = vec![BuiltinParam::required("queue", TypeDesc::Any)];
        if matches!(op, "enqueue" | "contains") {
            params.push(BuiltinParam::required("value", TypeDesc::Any));
        }
        Some(BuiltinSignature::new(params))
    }

    fn invoke(&self, name: &str, mut args: Vec<Value>) -> RuntimeResult<Value> {
        let op = Self::operation(name)
            .ok_or_else(|| RuntimeError::not_found(format!("Unknown function '{name}'")))?;
        let value = if args.len() > 1 { args.pop() } else { None };
        let queue = target(name, &args)?;

        Ok(match op {
            "enqueue" => {
                queue.borrow_mut().enqueue(value.unwrap_or_default())?;
                Value::Null
            }
            "dequeue" => queue.borrow_mut().dequeue(),
            "peek" => queue.borrow().peek(),
            "isempty" => Value::Bool(queue.borrow().is_empty()),
            "size" => Value::Int(i32::try_from(queue.borrow().len()).unwrap_or(i32::MAX)),
            "clear" => {
                queue.borrow_mut().items.clear();
                Value::Null
            }
            "contains" => Value::Bool(queue.borrow().contains(&value.unwrap_or_default())),
            _ => Value::array(queue.borrow().to_array()),
        })
    }
}
