//! Operator semantics (arithmetic, comparison, equality, unary)

use crate::compiler::lexer::token_kind::EbsTokenKind;
use crate::runtime::error::{RuntimeError, RuntimeResult};
use crate::runtime::value::Value;
use std::cmp::Ordering;
use std::rc::Rc;

/// Numeric promotion order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Rank {
    Byte,
    Int,
    Long,
    Float,
    Double,
}

fn rank(value: &Value) -> Option<Rank> {
    match value {
        Value::Byte(_) => Some(Rank::Byte),
        Value::Int(_) => Some(Rank::Int),
        Value::Long(_) => Some(Rank::Long),
        Value::Float(_) => Some(Rank::Float),
        Value::Double(_) => Some(Rank::Double),
        _ => None,
    }
}

/// byte and int widen to at least int; long with float goes to double
fn result_rank(a: Rank, b: Rank) -> Rank {
    match (a, b) {
        (Rank::Long, Rank::Float) | (Rank::Float, Rank::Long) => Rank::Double,
        _ => a.max(b).max(Rank::Int),
    }
}

fn op_text(op: EbsTokenKind) -> &'static str {
    match op {
        EbsTokenKind::And => "&&",
        EbsTokenKind::Or => "||",
        EbsTokenKind::Typeof => "typeof",
        other => other.describe(),
    }
}

fn operand_error(op: EbsTokenKind, left: &Value, right: &Value) -> RuntimeError {
    RuntimeError::type_error(format!(
        "Cannot apply '{}' to {} and {}",
        op_text(op),
        left.type_name(),
        right.type_name()
    ))
}

/// Evaluate a non-short-circuit binary operator
pub fn binary(op: EbsTokenKind, left: Value, right: Value) -> RuntimeResult<Value> {
    match op {
        EbsTokenKind::Plus => add_values(left, right),
        EbsTokenKind::Minus | EbsTokenKind::Asterisk | EbsTokenKind::Slash | EbsTokenKind::Percent => {
            arithmetic(op, &left, &right)
        }
        EbsTokenKind::Caret => power(&left, &right),
        EbsTokenKind::DoubleEqual => Ok(Value::Bool(equals(&left, &right))),
        EbsTokenKind::ExclamationEqual => Ok(Value::Bool(!equals(&left, &right))),
        EbsTokenKind::LessThan
        | EbsTokenKind::LessThanEqual
        | EbsTokenKind::GreaterThan
        | EbsTokenKind::GreaterThanEqual => compare(op, &left, &right).map(Value::Bool),
        other => Err(RuntimeError::type_error(format!(
            "Unsupported binary operator '{}'",
            op_text(other)
        ))),
    }
}

/// `+`: concatenation when either side is a string, else arithmetic
pub fn add_values(left: Value, right: Value) -> RuntimeResult<Value> {
    if matches!(left, Value::Str(_)) || matches!(right, Value::Str(_)) {
        return Ok(Value::Str(format!("{left}{right}")));
    }
    arithmetic(EbsTokenKind::Plus, &left, &right)
}

fn arithmetic(op: EbsTokenKind, left: &Value, right: &Value) -> RuntimeResult<Value> {
    let (Some(lr), Some(rr)) = (rank(left), rank(right)) else {
        return Err(operand_error(op, left, right));
    };

    match result_rank(lr, rr) {
        rank @ (Rank::Byte | Rank::Int | Rank::Long) => {
            let (Some(a), Some(b)) = (left.as_i64(), right.as_i64()) else {
                return Err(operand_error(op, left, right));
            };
            integral(op, a, b, rank)
        }
        rank => {
            let (Some(a), Some(b)) = (left.as_f64(), right.as_f64()) else {
                return Err(operand_error(op, left, right));
            };
            let result = floating(op, a, b)?;
            Ok(if rank == Rank::Float {
                Value::Float(result as f32)
            } else {
                Value::Double(result)
            })
        }
    }
}

fn integral(op: EbsTokenKind, a: i64, b: i64, rank: Rank) -> RuntimeResult<Value> {
    if matches!(op, EbsTokenKind::Slash | EbsTokenKind::Percent) && b == 0 {
        return Err(RuntimeError::math_error("Division by zero"));
    }
    let result = match op {
        EbsTokenKind::Plus => a.checked_add(b),
        EbsTokenKind::Minus => a.checked_sub(b),
        EbsTokenKind::Asterisk => a.checked_mul(b),
        EbsTokenKind::Slash => a.checked_div(b),
        EbsTokenKind::Percent => a.checked_rem(b),
        other => {
            return Err(RuntimeError::type_error(format!(
                "Unsupported arithmetic operator '{}'",
                op_text(other)
            )))
        }
    }
    .ok_or_else(|| {
        RuntimeError::math_error(format!("Long overflow in {a} {} {b}", op_text(op)))
    })?;

    if rank == Rank::Long {
        return Ok(Value::Long(result));
    }
    // int results that leave the i32 range become long
    Ok(i32::try_from(result)
        .map(Value::Int)
        .unwrap_or(Value::Long(result)))
}

fn floating(op: EbsTokenKind, a: f64, b: f64) -> RuntimeResult<f64> {
    match op {
        EbsTokenKind::Plus => Ok(a + b),
        EbsTokenKind::Minus => Ok(a - b),
        EbsTokenKind::Asterisk => Ok(a * b),
        EbsTokenKind::Slash | EbsTokenKind::Percent if b == 0.0 => {
            Err(RuntimeError::math_error("Division by zero"))
        }
        EbsTokenKind::Slash => Ok(a / b),
        EbsTokenKind::Percent => Ok(a % b),
        other => Err(RuntimeError::type_error(format!(
            "Unsupported arithmetic operator '{}'",
            op_text(other)
        ))),
    }
}

/// `^` always yields a double
fn power(left: &Value, right: &Value) -> RuntimeResult<Value> {
    match (left.as_f64(), right.as_f64()) {
        (Some(base), Some(exponent)) => Ok(Value::Double(base.powf(exponent))),
        _ => Err(operand_error(EbsTokenKind::Caret, left, right)),
    }
}

/// `==` semantics. Null equals only null; numbers compare after promotion;
/// json compares structurally; records, arrays and maps by identity.
pub fn equals(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Null, Value::Null) => true,
        (Value::Null, _) | (_, Value::Null) => false,
        (l, r) if l.is_numeric() && r.is_numeric() => {
            numeric_order(l, r) == Some(Ordering::Equal)
        }
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Str(a), Value::Str(b)) => a == b,
        (Value::Date(a), Value::Date(b)) => a == b,
        (Value::Json(a), Value::Json(b)) => Rc::ptr_eq(a, b) || *a.borrow() == *b.borrow(),
        (Value::Bitmap(a), Value::Bitmap(b)) => {
            a.word == b.word && a.ty.name.eq_ignore_ascii_case(&b.ty.name)
        }
        (Value::Function(a), Value::Function(b)) => a.eq_ignore_ascii_case(b),
        (Value::Resource(a), Value::Resource(b)) => a == b,
        (l, r) => l.same_ref(r),
    }
}

fn numeric_order(left: &Value, right: &Value) -> Option<Ordering> {
    if let (Some(a), Some(b)) = (left.as_i64(), right.as_i64()) {
        return Some(a.cmp(&b));
    }
    left.as_f64()?.partial_cmp(&right.as_f64()?)
}

/// Relational comparison on numbers, strings or dates. A NaN operand
/// compares false.
pub fn compare(op: EbsTokenKind, left: &Value, right: &Value) -> RuntimeResult<bool> {
    match op {
        EbsTokenKind::DoubleEqual => return Ok(equals(left, right)),
        EbsTokenKind::ExclamationEqual => return Ok(!equals(left, right)),
        _ => {}
    }

    let ordering = match (left, right) {
        (l, r) if l.is_numeric() && r.is_numeric() => numeric_order(l, r),
        (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
        (Value::Date(a), Value::Date(b)) => Some(a.cmp(b)),
        _ => return Err(operand_error(op, left, right)),
    };
    let Some(ordering) = ordering else {
        return Ok(false);
    };

    match op {
        EbsTokenKind::LessThan => Ok(ordering.is_lt()),
        EbsTokenKind::LessThanEqual => Ok(ordering.is_le()),
        EbsTokenKind::GreaterThan => Ok(ordering.is_gt()),
        EbsTokenKind::GreaterThanEqual => Ok(ordering.is_ge()),
        other => Err(operand_error(other, left, right)),
    }
}

pub fn unary(op: EbsTokenKind, value: Value) -> RuntimeResult<Value> {
    match op {
        EbsTokenKind::Minus => match value {
            Value::Byte(b) => Ok(Value::Int(-i32::from(b))),
            Value::Int(n) => Ok(n
                .checked_neg()
                .map(Value::Int)
                .unwrap_or(Value::Long(-i64::from(n)))),
            Value::Long(n) => n
                .checked_neg()
                .map(Value::Long)
                .ok_or_else(|| RuntimeError::math_error(format!("Long overflow in -{n}"))),
            Value::Float(n) => Ok(Value::Float(-n)),
            Value::Double(n) => Ok(Value::Double(-n)),
            other => Err(RuntimeError::type_error(format!(
                "Cannot negate {}",
                other.type_name()
            ))),
        },
        EbsTokenKind::Plus if value.is_numeric() => Ok(value),
        EbsTokenKind::Exclamation => match value {
            Value::Bool(b) => Ok(Value::Bool(!b)),
            other => Err(RuntimeError::type_error(format!(
                "Operator '!' expects a bool, got {}",
                other.type_name()
            ))),
        },
        EbsTokenKind::Typeof => Ok(Value::str(value.type_name())),
        other => Err(RuntimeError::type_error(format!(
            "Cannot apply unary '{}' to {}",
            op_text(other),
            value.type_name()
        ))),
    }
}
