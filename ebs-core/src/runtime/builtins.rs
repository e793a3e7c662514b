//! Builtin dispatch
//!
//! The interpreter knows builtins only through [`BuiltinProvider`]: a name
//! maps to a parameter signature and a callable. Hosts populate a
//! [`BuiltinRegistry`] once at startup.

use super::environment::NameMap;
use super::error::{RuntimeError, RuntimeResult};
use super::types::TypeDesc;
use super::value::Value;

/// Native callable; arguments arrive bound and coerced in signature order
pub type NativeFn = Box<dyn Fn(Vec<Value>) -> RuntimeResult<Value>>;

#[derive(Debug, Clone)]
pub struct BuiltinParam {
    pub name: String,
    pub ty: TypeDesc,
    /// Used when the caller omits the argument
    pub default: Option<Value>,
}

impl BuiltinParam {
    pub fn required(name: &str, ty: TypeDesc) -> Self {
        Self {
            name: name.to_string(),
            ty,
            default: None,
        }
    }

    pub fn optional(name: &str, ty: TypeDesc, default: Value) -> Self {
        Self {
            name: name.to_string(),
            ty,
            default: Some(default),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct BuiltinSignature {
    pub params: Vec<BuiltinParam>,
}

impl BuiltinSignature {
    pub fn new(params: Vec<BuiltinParam>) -> Self {
        Self { params }
    }
}

pub trait BuiltinProvider {
    fn signature(&self, name: &str) -> Option<BuiltinSignature>;

    fn invoke(&self, name: &str, args: Vec<Value>) -> RuntimeResult<Value>;
}

struct Builtin {
    signature: BuiltinSignature,
    func: NativeFn,
}

/// Case-insensitive table of native functions
#[derive(Default)]
pub struct BuiltinRegistry {
    table: NameMap<Builtin>,
}

impl BuiltinRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `name`; a later registration of the same name replaces it
    pub fn register<F>(&mut self, name: &str, signature: BuiltinSignature, func: F)
    where
        F: Fn(Vec<Value>) -> RuntimeResult<Value> + 'static,
    {
        self.table.insert(
            name,
            Builtin {
                signature,
                func: Box::new(func),
            },
        );
    }

    pub fn contains(&self, name: &str) -> bool {
        self.table.contains(name)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

impl BuiltinProvider for BuiltinRegistry {
    fn signature(&self, name: &str) -> Option<BuiltinSignature> {
        self.table.get(name).map(|b| b.signature.clone())
    }

    fn invoke(&self, name: &str, args: Vec<Value>) -> RuntimeResult<Value> {
        match self.table.get(name) {
            Some(builtin) => (builtin.func)(args),
            None => Err(RuntimeError::not_found(format!(
                "Unknown function '{name}'"
            ))),
        }
    }
}

impl std::fmt::Debug for BuiltinRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&str> = self.table.iter().map(|(name, _)| name).collect();
        names.sort_unstable();
        f.debug_struct("BuiltinRegistry")
            .field("functions", &names)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::error::ErrorKind;

    fn registry() -> BuiltinRegistry {
        let mut reg = BuiltinRegistry::new();
        reg.register(
            "string.toUpper",
            BuiltinSignature::new(vec![BuiltinParam::required("text", TypeDesc::String)]),
            |args| Ok(Value::str(args[0].to_string().to_uppercase())),
        );
        reg
    }

    #[test]
    fn test_lookup_ignores_case() {
        let reg = registry();
        assert!(reg.contains("STRING.TOUPPER"));
        let sig = reg.signature("string.toupper").unwrap();
        assert_eq!(sig.params.len(), 1);
        let out = reg.invoke("String.ToUpper", vec![Value::str("ab")]).unwrap();
        assert_eq!(out.to_string(), "AB");
    }

    #[test]
    fn test_unknown_is_not_found() {
        let reg = registry();
        assert!(reg.signature("nope").is_none());
        let err = reg.invoke("nope", vec![]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFoundError);
    }
}
