//! Scope chain and bindings
//!
//! Every name goes through [`NameKey`], so lookups are case-insensitive in
//! one place instead of at each call site.

use super::coerce::coerce;
use super::error::{RuntimeError, RuntimeResult};
use super::types::TypeDesc;
use super::value::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Lower-cased identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NameKey(String);

impl NameKey {
    pub fn new(name: &str) -> Self {
        NameKey(name.to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for NameKey {
    fn from(name: &str) -> Self {
        NameKey::new(name)
    }
}

/// Case-insensitive name table that remembers each name's first spelling
#[derive(Debug, Clone)]
pub struct NameMap<V> {
    entries: HashMap<NameKey, (String, V)>,
}

impl<V> Default for NameMap<V> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<V> NameMap<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace, returning the previous value
    pub fn insert(&mut self, name: &str, value: V) -> Option<V> {
        self.entries
            .insert(NameKey::new(name), (name.to_string(), value))
            .map(|(_, old)| old)
    }

    pub fn get(&self, name: &str) -> Option<&V> {
        self.entries.get(&NameKey::new(name)).map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut V> {
        self.entries.get_mut(&NameKey::new(name)).map(|(_, v)| v)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(&NameKey::new(name))
    }

    pub fn remove(&mut self, name: &str) -> Option<V> {
        self.entries.remove(&NameKey::new(name)).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries with their original spelling
    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.entries.values().map(|(name, v)| (name.as_str(), v))
    }
}

#[derive(Debug, Clone)]
pub struct Binding {
    pub value: Value,
    /// Assignments are coerced to this type
    pub declared_type: Option<TypeDesc>,
    pub constant: bool,
}

impl Binding {
    pub fn untyped(value: Value) -> Self {
        Self {
            value,
            declared_type: None,
            constant: false,
        }
    }
}

pub type EnvRef = Rc<RefCell<Environment>>;

#[derive(Debug, Default)]
pub struct Environment {
    bindings: NameMap<Binding>,
    parent: Option<EnvRef>,
}

impl Environment {
    pub fn new() -> EnvRef {
        Rc::new(RefCell::new(Self::default()))
    }

    pub fn with_parent(parent: &EnvRef) -> EnvRef {
        Rc::new(RefCell::new(Self {
            bindings: NameMap::new(),
            parent: Some(Rc::clone(parent)),
        }))
    }

    /// Define in this frame, replacing a binding of the same name here
    pub fn define(&mut self, name: &str, binding: Binding) {
        self.bindings.insert(name, binding);
    }

    pub fn define_value(&mut self, name: &str, value: Value) {
        self.define(name, Binding::untyped(value));
    }

    pub fn get(&self, name: &str) -> RuntimeResult<Value> {
        if let Some(binding) = self.bindings.get(name) {
            return Ok(binding.value.clone());
        }
        match &self.parent {
            Some(parent) => parent.borrow().get(name),
            None => Err(RuntimeError::not_found(format!("Undefined variable '{name}'"))),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bindings.contains(name)
            || self
                .parent
                .as_ref()
                .is_some_and(|p| p.borrow().contains(name))
    }

    /// Declared type of the nearest binding, if it has one
    pub fn declared_type(&self, name: &str) -> Option<TypeDesc> {
        match self.bindings.get(name) {
            Some(binding) => binding.declared_type.clone(),
            None => self
                .parent
                .as_ref()
                .and_then(|p| p.borrow().declared_type(name)),
        }
    }

    /// Update the nearest existing binding; never creates one
    pub fn assign(&mut self, name: &str, value: Value) -> RuntimeResult<()> {
        self.update(name, value, true)
    }

    /// Store a field write made through a copied value such as a bitmap.
    /// Constants only forbid rebinding, so this skips the constant check.
    pub fn write_back(&mut self, name: &str, value: Value) -> RuntimeResult<()> {
        self.update(name, value, false)
    }

    fn update(&mut self, name: &str, value: Value, rebinding: bool) -> RuntimeResult<()> {
        if let Some(binding) = self.bindings.get_mut(name) {
            if rebinding && binding.constant {
                return Err(RuntimeError::access_error(format!(
                    "Cannot assign to constant '{name}'"
                )));
            }
            binding.value = match &binding.declared_type {
                Some(ty) => coerce(value, ty)?,
                None => value,
            };
            return Ok(());
        }
        match &self.parent {
            Some(parent) => parent.borrow_mut().update(name, value, rebinding),
            None => Err(RuntimeError::not_found(format!("Undefined variable '{name}'"))),
        }
    }

    /// Names bound in this frame only
    pub fn local_names(&self) -> Vec<String> {
        self.bindings.iter().map(|(name, _)| name.to_string()).collect()
    }
}
