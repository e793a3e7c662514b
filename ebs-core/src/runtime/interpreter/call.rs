//! Function calls: argument binding, user functions and builtins

use super::{Flow, Interpreter, STACK_GROWTH, STACK_RED_ZONE, TARGET};
use crate::compiler::parser::expr::FunctionCall;
use crate::compiler::parser::program::FunctionDecl;
use crate::runtime::builtins::{BuiltinProvider, BuiltinSignature};
use crate::runtime::coerce::{cast, coerce};
use crate::runtime::environment::{Binding, Environment};
use crate::runtime::error::{RuntimeError, RuntimeResult};
use crate::runtime::queue::QueueBuiltins;
use crate::runtime::types::TypeDesc;
use crate::runtime::value::Value;
use std::rc::Rc;
use tracing::trace;

/// An evaluated call argument, named when written `name = value`
#[derive(Debug, Clone)]
pub struct ArgValue {
    pub name: Option<String>,
    pub value: Value,
}

impl ArgValue {
    pub fn positional(value: Value) -> Self {
        Self { name: None, value }
    }

    pub fn named(name: impl Into<String>, value: Value) -> Self {
        Self {
            name: Some(name.into()),
            value,
        }
    }
}

/// Match arguments to parameter slots. Positional arguments fill slots left
/// to right, named ones go to their parameter; either may come first.
fn bind_slots(
    func_name: &str,
    param_names: &[&str],
    args: Vec<ArgValue>,
) -> RuntimeResult<Vec<Option<Value>>> {
    let mut slots: Vec<Option<Value>> = vec![None; param_names.len()];
    let mut next_positional = 0;

    for arg in args {
        let index = match &arg.name {
            Some(name) => param_names
                .iter()
                .position(|p| p.eq_ignore_ascii_case(name))
                .ok_or_else(|| {
                    RuntimeError::validation_error(format!(
                        "Function '{func_name}' has no parameter '{name}'"
                    ))
                })?,
            None => {
                while next_positional < slots.len() && slots[next_positional].is_some() {
                    next_positional += 1;
                }
                if next_positional >= slots.len() {
                    return Err(RuntimeError::validation_error(format!(
                        "Function '{func_name}' takes {} argument(s)",
                        param_names.len()
                    )));
                }
                next_positional
            }
        };

        if slots[index].is_some() {
            return Err(RuntimeError::validation_error(format!(
                "Parameter '{}' of '{func_name}' given more than once",
                param_names[index]
            )));
        }
        slots[index] = Some(arg.value);
    }
    Ok(slots)
}

fn missing_argument(func_name: &str, param: &str) -> RuntimeError {
    RuntimeError::validation_error(format!(
        "Missing argument '{param}' for function '{func_name}'"
    ))
}

/// Bind and coerce builtin arguments in signature order
fn bind_builtin(
    name: &str,
    signature: &BuiltinSignature,
    args: Vec<ArgValue>,
) -> RuntimeResult<Vec<Value>> {
    let names: Vec<&str> = signature.params.iter().map(|p| p.name.as_str()).collect();
    let slots = bind_slots(name, &names, args)?;

    signature
        .params
        .iter()
        .zip(slots)
        .map(|(param, slot)| match slot {
            Some(value) => coerce(value, &param.ty),
            None => param
                .default
                .clone()
                .ok_or_else(|| missing_argument(name, &param.name)),
        })
        .collect()
}

/// `Flags(3)`: a user type name applied to exactly one positional value
fn cast_call(name: &str, ty: &TypeDesc, args: Vec<ArgValue>) -> RuntimeResult<Value> {
    let mut args = args.into_iter();
    match (args.next(), args.next()) {
        (Some(ArgValue { name: None, value }), None) => {
            trace!(target: TARGET, to = %ty, "Cast to user type");
            cast(value, ty)
        }
        _ => Err(RuntimeError::validation_error(format!(
            "Cast to '{name}' takes exactly one value"
        ))),
    }
}

impl Interpreter {
    pub(super) fn call(&mut self, call: &FunctionCall) -> RuntimeResult<Value> {
        let mut args = Vec::with_capacity(call.arguments.len());
        for arg in &call.arguments {
            args.push(ArgValue {
                name: arg.name.clone(),
                value: self.evaluate(&arg.value)?,
            });
        }
        self.call_named(&call.name, args)
    }

    /// Call a user function or builtin from the host with positional
    /// arguments
    pub fn call_function(&mut self, name: &str, args: Vec<Value>) -> RuntimeResult<Value> {
        self.call_with(name, args.into_iter().map(ArgValue::positional).collect())
    }

    /// Host call allowing named arguments
    pub fn call_with(&mut self, name: &str, args: Vec<ArgValue>) -> RuntimeResult<Value> {
        let result = self.call_named(name, args);
        if self.depth == 0 {
            self.env = Rc::clone(&self.globals);
        }
        result
    }

    /// User functions shadow builtins, host builtins shadow the `queue.*`
    /// operations, and a user type name casts its one argument. A variable
    /// holding a function reference is tried last.
    fn call_named(&mut self, name: &str, args: Vec<ArgValue>) -> RuntimeResult<Value> {
        if let Some(func) = self.functions.get(name).cloned() {
            return self.call_user(&func, args);
        }

        if let Some(signature) = self.builtins.signature(name) {
            let values = bind_builtin(name, &signature, args)?;
            trace!(target: TARGET, name, args = values.len(), "Call builtin");
            return self.builtins.invoke(name, values);
        }

        if let Some(signature) = QueueBuiltins.signature(name) {
            let values = bind_builtin(name, &signature, args)?;
            return QueueBuiltins.invoke(name, values);
        }

        if let Some(ty) = self.types.get(name).cloned() {
            return cast_call(name, &ty, args);
        }

        let target = match self.env.borrow().get(name) {
            Ok(Value::Function(target)) if !target.eq_ignore_ascii_case(name) => Some(target),
            _ => None,
        };
        if let Some(target) = target {
            return self.call_named(&target, args);
        }

        Err(RuntimeError::not_found(format!("Unknown function '{name}'")))
    }

    fn call_user(&mut self, func: &Rc<FunctionDecl>, args: Vec<ArgValue>) -> RuntimeResult<Value> {
        if self.depth >= self.limits.max_recursion_depth {
            return Err(RuntimeError::validation_error(format!(
                "Maximum call depth {} exceeded in '{}'",
                self.limits.max_recursion_depth, func.name
            )));
        }

        trace!(target: TARGET, name = %func.name, depth = self.depth, "Call function");
        // callee sees globals, not the caller's locals
        let scope = Environment::with_parent(&self.globals);
        let previous = std::mem::replace(&mut self.env, scope);
        self.depth += 1;
        let result = stacker::maybe_grow(STACK_RED_ZONE, STACK_GROWTH, || {
            self.invoke_user(func, args)
        });
        self.depth -= 1;
        self.env = previous;

        result.map_err(|e| e.at_line(func.line))
    }

    fn invoke_user(&mut self, func: &FunctionDecl, args: Vec<ArgValue>) -> RuntimeResult<Value> {
        let names: Vec<&str> = func.params.iter().map(|p| p.name.as_str()).collect();
        let slots = bind_slots(&func.name, &names, args)?;

        for (param, slot) in func.params.iter().zip(slots) {
            let declared_type = match &param.ty {
                Some(ty) => Some(self.resolve_type(ty)?),
                None => None,
            };
            let value = match (slot, &param.default) {
                (Some(value), _) => value,
                // defaults may use the parameters bound before them
                (None, Some(default)) => self.evaluate(default)?,
                (None, None) => return Err(missing_argument(&func.name, &param.name)),
            };
            let value = match &declared_type {
                Some(ty) => coerce(value, ty)?,
                None => value,
            };
            self.env.borrow_mut().define(
                &param.name,
                Binding {
                    value,
                    declared_type,
                    constant: false,
                },
            );
        }

        let value = match self.exec_statements(&func.body)? {
            Flow::Return(value) => value,
            _ => Value::Null,
        };

        match &func.return_type {
            Some(ty) => {
                let ty = self.resolve_type(ty)?;
                if value.is_null() {
                    Ok(ty.default_value())
                } else {
                    coerce(value, &ty)
                }
            }
            None => Ok(value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::builtins::BuiltinParam;
    use crate::runtime::error::ErrorKind;
    use crate::runtime::types::TypeDesc;

    fn pos(n: i32) -> ArgValue {
        ArgValue::positional(Value::Int(n))
    }

    #[test]
    fn test_bind_positional_and_named() {
        let slots = bind_slots(
            "f",
            &["a", "b", "c"],
            vec![ArgValue::named("C", Value::Int(3)), pos(1), pos(2)],
        )
        .unwrap();
        let ints: Vec<_> = slots.iter().map(|s| s.as_ref().and_then(Value::as_i64)).collect();
        assert_eq!(ints, vec![Some(1), Some(2), Some(3)]);
    }

    #[test]
    fn test_bind_skips_named_slot() {
        let slots = bind_slots("f", &["a", "b"], vec![ArgValue::named("a", Value::Int(1)), pos(2)]).unwrap();
        assert_eq!(slots[1].as_ref().and_then(Value::as_i64), Some(2));
    }

    #[test]
    fn test_bind_errors() {
        let unknown = bind_slots("f", &["a"], vec![ArgValue::named("z", Value::Null)]).unwrap_err();
        assert_eq!(unknown.kind, ErrorKind::ValidationError);

        let twice = bind_slots("f", &["a"], vec![pos(1), ArgValue::named("a", Value::Null)]).unwrap_err();
        assert!(twice.message.contains("more than once"));

        let too_many = bind_slots("f", &["a"], vec![pos(1), pos(2)]).unwrap_err();
        assert_eq!(too_many.kind, ErrorKind::ValidationError);
    }

    #[test]
    fn test_bind_builtin_defaults_and_coercion() {
        let signature = BuiltinSignature::new(vec![
            BuiltinParam::required("text", TypeDesc::String),
            BuiltinParam::optional("count", TypeDesc::Int, Value::Int(1)),
        ]);
        let values = bind_builtin("repeat", &signature, vec![pos(42)]).unwrap();
        assert_eq!(values[0].as_str(), Some("42"));
        assert_eq!(values[1].as_i64(), Some(1));

        let err = bind_builtin("repeat", &signature, vec![]).unwrap_err();
        assert!(err.message.contains("Missing argument 'text'"));
    }
}
