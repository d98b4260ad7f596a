// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Arithmetic, bitwise and shift operators.
//!
//! Ints use checked arithmetic; any int/float mix is computed in `f64`.
//! Bools are not numbers here.

use super::errors::{Result, VmError};
use crate::value::Value;

use std::collections::BTreeSet;
use std::sync::Arc;

fn unsupported(op: &'static str, left: &Value, right: &Value) -> VmError {
    VmError::UnsupportedOperands {
        op,
        left: left.type_name().to_string(),
        right: right.type_name().to_string(),
    }
}

fn overflow(op: &'static str) -> VmError {
    VmError::IntegerOverflow { op }
}

/// Both operands as floats when both are numbers.
fn float_pair(left: &Value, right: &Value) -> Option<(f64, f64)> {
    match (left, right) {
        (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
            Some((left.as_f64().ok()?, right.as_f64().ok()?))
        }
        _ => None,
    }
}

/// Largest string (in bytes) or list a repetition may produce.
pub const MAX_REPEAT_LEN: usize = 1 << 24;

/// Length of `len` repeated `count` times, zero for a non-positive count.
fn repeated_len(len: usize, count: i64) -> Result<usize> {
    if count <= 0 {
        return Ok(0);
    }
    let count = usize::try_from(count).map_err(|_| overflow("*"))?;
    match len.checked_mul(count) {
        Some(total) if total <= MAX_REPEAT_LEN => Ok(total),
        _ => Err(VmError::SequenceTooLarge {
            limit: MAX_REPEAT_LEN,
        }),
    }
}

fn repeat_str(s: &str, count: i64) -> Result<String> {
    match repeated_len(s.len(), count)? {
        0 => Ok(String::new()),
        _ => Ok(s.repeat(count as usize)),
    }
}

fn repeat_list(items: &[Value], count: i64) -> Result<Vec<Value>> {
    let total = repeated_len(items.len(), count)?;
    let mut list = Vec::with_capacity(total);
    if total > 0 {
        for _ in 0..count {
            list.extend(items.iter().cloned());
        }
    }
    Ok(list)
}

pub fn add(left: &Value, right: &Value) -> Result<Value> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => a.checked_add(*b).map(Value::Int).ok_or(overflow("+")),
        (Value::String(a), Value::String(b)) => Ok(Value::from(format!("{a}{b}"))),
        (Value::List(a), Value::List(b)) => {
            let mut list = a.as_ref().clone();
            list.extend(b.iter().cloned());
            Ok(Value::from(list))
        }
        _ => match float_pair(left, right) {
            Some((a, b)) => Ok(Value::Float(a + b)),
            None => Err(unsupported("+", left, right)),
        },
    }
}

pub fn sub(left: &Value, right: &Value) -> Result<Value> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => a.checked_sub(*b).map(Value::Int).ok_or(overflow("-")),
        (Value::Set(a), Value::Set(b)) => Ok(Value::from(
            a.difference(b).cloned().collect::<BTreeSet<Value>>(),
        )),
        _ => match float_pair(left, right) {
            Some((a, b)) => Ok(Value::Float(a - b)),
            None => Err(unsupported("-", left, right)),
        },
    }
}

pub fn mul(left: &Value, right: &Value) -> Result<Value> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => a.checked_mul(*b).map(Value::Int).ok_or(overflow("*")),
        (Value::String(s), Value::Int(n)) | (Value::Int(n), Value::String(s)) => {
            Ok(Value::from(repeat_str(s, *n)?))
        }
        (Value::List(l), Value::Int(n)) | (Value::Int(n), Value::List(l)) => {
            Ok(Value::from(repeat_list(l.as_slice(), *n)?))
        }
        _ => match float_pair(left, right) {
            Some((a, b)) => Ok(Value::Float(a * b)),
            None => Err(unsupported("*", left, right)),
        },
    }
}

pub fn true_div(left: &Value, right: &Value) -> Result<Value> {
    match float_pair(left, right) {
        Some((_, b)) if b == 0.0 => Err(VmError::DivisionByZero),
        Some((a, b)) => Ok(Value::Float(a / b)),
        None => Err(unsupported("/", left, right)),
    }
}

pub fn floor_div(left: &Value, right: &Value) -> Result<Value> {
    match (left, right) {
        (Value::Int(_), Value::Int(0)) => Err(VmError::DivisionByZero),
        (Value::Int(a), Value::Int(b)) => {
            let q = a.checked_div(*b).ok_or(overflow("//"))?;
            if a % b != 0 && ((*a < 0) != (*b < 0)) {
                Ok(Value::Int(q - 1))
            } else {
                Ok(Value::Int(q))
            }
        }
        _ => match float_pair(left, right) {
            Some((_, b)) if b == 0.0 => Err(VmError::DivisionByZero),
            Some((a, b)) => Ok(Value::Float((a / b).floor())),
            None => Err(unsupported("//", left, right)),
        },
    }
}

/// Modulo takes the sign of the divisor.
pub fn modulo(left: &Value, right: &Value) -> Result<Value> {
    match (left, right) {
        (Value::Int(_), Value::Int(0)) => Err(VmError::DivisionByZero),
        (Value::Int(a), Value::Int(b)) => {
            let r = a.checked_rem(*b).ok_or(overflow("%"))?;
            if r != 0 && ((r < 0) != (*b < 0)) {
                Ok(Value::Int(r + b))
            } else {
                Ok(Value::Int(r))
            }
        }
        _ => match float_pair(left, right) {
            Some((_, b)) if b == 0.0 => Err(VmError::DivisionByZero),
            Some((a, b)) => {
                let r = a % b;
                if r != 0.0 && ((r < 0.0) != (b < 0.0)) {
                    Ok(Value::Float(r + b))
                } else {
                    Ok(Value::Float(r))
                }
            }
            None => Err(unsupported("%", left, right)),
        },
    }
}

pub fn pow(left: &Value, right: &Value) -> Result<Value> {
    match (left, right) {
        (Value::Int(0), Value::Int(b)) if *b < 0 => Err(VmError::DivisionByZero),
        (Value::Int(a), Value::Int(b)) if *b >= 0 => {
            let exp = u32::try_from(*b).map_err(|_| overflow("**"))?;
            a.checked_pow(exp).map(Value::Int).ok_or(overflow("**"))
        }
        _ => match float_pair(left, right) {
            Some((a, b)) if a == 0.0 && b < 0.0 => Err(VmError::DivisionByZero),
            Some((a, b)) => Ok(Value::Float(a.powf(b))),
            None => Err(unsupported("**", left, right)),
        },
    }
}

fn shift_count(op: &'static str, left: &Value, right: &Value) -> Result<(i64, u32)> {
    match (left, right) {
        (Value::Int(_), Value::Int(b)) if *b < 0 => Err(VmError::NegativeShiftCount),
        (Value::Int(a), Value::Int(b)) => Ok((*a, u32::try_from(*b).unwrap_or(u32::MAX))),
        _ => Err(unsupported(op, left, right)),
    }
}

pub fn left_shift(left: &Value, right: &Value) -> Result<Value> {
    let (a, b) = shift_count("<<", left, right)?;
    if a == 0 {
        return Ok(Value::Int(0));
    }
    if b >= 63 {
        return Err(overflow("<<"));
    }
    let shifted = a << b;
    if shifted >> b != a {
        return Err(overflow("<<"));
    }
    Ok(Value::Int(shifted))
}

pub fn right_shift(left: &Value, right: &Value) -> Result<Value> {
    let (a, b) = shift_count(">>", left, right)?;
    Ok(Value::Int(a >> b.min(63)))
}

pub fn bit_and(left: &Value, right: &Value) -> Result<Value> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a & b)),
        (Value::Bool(a), Value::Bool(b)) => Ok(Value::Bool(*a && *b)),
        (Value::Set(a), Value::Set(b)) => Ok(Value::from(
            a.intersection(b).cloned().collect::<BTreeSet<Value>>(),
        )),
        _ => Err(unsupported("&", left, right)),
    }
}

pub fn bit_or(left: &Value, right: &Value) -> Result<Value> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a | b)),
        (Value::Bool(a), Value::Bool(b)) => Ok(Value::Bool(*a || *b)),
        (Value::Set(a), Value::Set(b)) => {
            let mut union = a.as_ref().clone();
            union.extend(b.iter().cloned());
            Ok(Value::Set(Arc::new(union)))
        }
        _ => Err(unsupported("|", left, right)),
    }
}

pub fn bit_xor(left: &Value, right: &Value) -> Result<Value> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a ^ b)),
        (Value::Bool(a), Value::Bool(b)) => Ok(Value::Bool(a != b)),
        (Value::Set(a), Value::Set(b)) => Ok(Value::from(
            a.symmetric_difference(b)
                .cloned()
                .collect::<BTreeSet<Value>>(),
        )),
        _ => Err(unsupported("^", left, right)),
    }
}

fn unsupported_unary(op: &'static str, operand: &Value) -> VmError {
    VmError::UnsupportedOperand {
        op,
        operand: operand.type_name().to_string(),
    }
}

pub fn invert(operand: &Value) -> Result<Value> {
    match operand {
        Value::Int(a) => Ok(Value::Int(!a)),
        _ => Err(unsupported_unary("~", operand)),
    }
}

pub fn positive(operand: &Value) -> Result<Value> {
    match operand {
        Value::Int(_) | Value::Float(_) => Ok(operand.clone()),
        _ => Err(unsupported_unary("+", operand)),
    }
}

pub fn negative(operand: &Value) -> Result<Value> {
    match operand {
        Value::Int(a) => a.checked_neg().map(Value::Int).ok_or(overflow("-")),
        Value::Float(a) => Ok(Value::Float(-a)),
        _ => Err(unsupported_unary("-", operand)),
    }
}
