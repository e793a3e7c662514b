//! Array storage
//!
//! One flat `Vec` per array. Multi-dimensional arrays are row-major over
//! fixed extents; dynamic arrays grow on writes past the end.

use super::error::{RuntimeError, RuntimeResult};
use super::types::TypeDesc;
use super::value::Value;
use std::fmt;

/// Largest number of slots one array may hold
pub const MAX_ARRAY_ELEMENTS: usize = 1 << 24;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArrayShape {
    Dynamic,
    Fixed(usize),
    /// Two or more extents
    Dims(Vec<usize>),
}

impl ArrayShape {
    /// Shape for declared extents, rejecting totals past [`MAX_ARRAY_ELEMENTS`]
    pub fn from_dims(dims: Vec<usize>) -> RuntimeResult<Self> {
        let total = dims
            .iter()
            .try_fold(1usize, |acc, &d| acc.checked_mul(d))
            .filter(|total| *total <= MAX_ARRAY_ELEMENTS);
        if total.is_none() {
            let parts: Vec<String> = dims.iter().map(|d| d.to_string()).collect();
            return Err(RuntimeError::index_error(format!(
                "Array size [{}] exceeds the limit of {} elements",
                parts.join(", "),
                MAX_ARRAY_ELEMENTS
            )));
        }
        Ok(match dims.as_slice() {
            [] => ArrayShape::Dynamic,
            [n] => ArrayShape::Fixed(*n),
            _ => ArrayShape::Dims(dims),
        })
    }

    /// Number of slots a fresh array starts with
    pub fn initial_len(&self) -> usize {
        match self {
            ArrayShape::Dynamic => 0,
            ArrayShape::Fixed(n) => *n,
            ArrayShape::Dims(dims) => dims
                .iter()
                .try_fold(1usize, |acc, &d| acc.checked_mul(d))
                .unwrap_or(usize::MAX),
        }
    }

    pub fn rank(&self) -> usize {
        match self {
            ArrayShape::Dims(dims) => dims.len(),
            _ => 1,
        }
    }
}

impl fmt::Display for ArrayShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArrayShape::Dynamic => write!(f, "[*]"),
            ArrayShape::Fixed(n) => write!(f, "[{n}]"),
            ArrayShape::Dims(dims) => {
                let parts: Vec<String> = dims.iter().map(|d| d.to_string()).collect();
                write!(f, "[{}]", parts.join(", "))
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct ArrayValue {
    pub elem: TypeDesc,
    pub shape: ArrayShape,
    pub items: Vec<Value>,
}

impl ArrayValue {
    /// Array of the given shape filled with the element default
    pub fn new(elem: TypeDesc, shape: ArrayShape) -> Self {
        let items = (0..shape.initial_len())
            .map(|_| elem.default_value())
            .collect();
        Self { elem, shape, items }
    }

    /// Dynamic array holding `items` as they are
    pub fn from_values(elem: TypeDesc, items: Vec<Value>) -> Self {
        Self {
            elem,
            shape: ArrayShape::Dynamic,
            items,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Flat slot for `indices`, checking count, sign and per-dimension range.
    /// A dynamic array accepts any non-negative index here; reads check the
    /// length separately.
    fn slot(&self, indices: &[i64]) -> RuntimeResult<usize> {
        if indices.len() != self.shape.rank() {
            return Err(RuntimeError::index_error(format!(
                "Array{} takes {} index(es), got {}",
                self.shape,
                self.shape.rank(),
                indices.len()
            )));
        }
        if let Some(negative) = indices.iter().find(|i| **i < 0) {
            return Err(RuntimeError::index_error(format!(
                "Negative array index {negative}"
            )));
        }

        match &self.shape {
            ArrayShape::Dynamic => Ok(indices[0] as usize),
            ArrayShape::Fixed(n) => {
                let i = indices[0] as usize;
                if i >= *n {
                    Err(RuntimeError::index_error(format!(
                        "Index {i} out of bounds for array of length {n}"
                    )))
                } else {
                    Ok(i)
                }
            }
            ArrayShape::Dims(dims) => {
                let mut flat = 0usize;
                for (axis, (&index, &extent)) in indices.iter().zip(dims).enumerate() {
                    let index = index as usize;
                    if index >= extent {
                        return Err(RuntimeError::index_error(format!(
                            "Index {index} out of bounds for dimension {axis} of length {extent}"
                        )));
                    }
                    flat = flat * extent + index;
                }
                Ok(flat)
            }
        }
    }

    pub fn get(&self, indices: &[i64]) -> RuntimeResult<Value> {
        let slot = self.slot(indices)?;
        self.items.get(slot).cloned().ok_or_else(|| {
            RuntimeError::index_error(format!(
                "Index {} out of bounds for array of length {}",
                slot,
                self.items.len()
            ))
        })
    }

    /// Mutable slot; a dynamic array grows to reach it
    pub fn slot_mut(&mut self, indices: &[i64]) -> RuntimeResult<&mut Value> {
        let slot = self.slot(indices)?;
        if slot >= self.items.len() {
            if self.shape != ArrayShape::Dynamic {
                return Err(RuntimeError::index_error(format!(
                    "Index {slot} out of bounds for array of length {}",
                    self.items.len()
                )));
            }
            if slot >= MAX_ARRAY_ELEMENTS {
                return Err(RuntimeError::index_error(format!(
                    "Index {slot} exceeds the limit of {MAX_ARRAY_ELEMENTS} elements"
                )));
            }
            let elem = &self.elem;
            self.items.resize_with(slot + 1, || elem.default_value());
        }
        Ok(&mut self.items[slot])
    }

    /// Store an already coerced value
    pub fn set(&mut self, indices: &[i64], value: Value) -> RuntimeResult<()> {
        *self.slot_mut(indices)? = value;
        Ok(())
    }

    pub fn push(&mut self, value: Value) -> RuntimeResult<()> {
        if self.shape != ArrayShape::Dynamic {
            return Err(RuntimeError::index_error(format!(
                "Cannot append to fixed array{}",
                self.shape
            )));
        }
        self.items.push(value);
        Ok(())
    }
}
