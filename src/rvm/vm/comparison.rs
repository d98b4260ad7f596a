// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use super::errors::{Result, VmError};
use crate::rvm::instructions::BinaryOp;
use crate::value::Value;

use core::cmp::Ordering;

fn ordered(op: BinaryOp, ord: Ordering) -> bool {
    match op {
        BinaryOp::Lt => ord == Ordering::Less,
        BinaryOp::Le => ord != Ordering::Greater,
        BinaryOp::Gt => ord == Ordering::Greater,
        _ => ord != Ordering::Less,
    }
}

/// Ordering comparisons `<`, `<=`, `>`, `>=`.
///
/// Sets compare by inclusion. Comparisons involving NaN are false.
pub fn compare(op: BinaryOp, left: &Value, right: &Value) -> Result<bool> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => Ok(ordered(op, a.cmp(b))),
        (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
            let is_nan = |v: &Value| matches!(v, Value::Float(f) if f.is_nan());
            Ok(!is_nan(left) && !is_nan(right) && ordered(op, left.cmp(right)))
        }
        (Value::String(_), Value::String(_))
        | (Value::Bool(_), Value::Bool(_))
        | (Value::List(_), Value::List(_)) => Ok(ordered(op, left.cmp(right))),
        (Value::Set(a), Value::Set(b)) => Ok(match op {
            BinaryOp::Lt => a.len() < b.len() && a.is_subset(b),
            BinaryOp::Le => a.is_subset(b),
            BinaryOp::Gt => a.len() > b.len() && a.is_superset(b),
            _ => a.is_superset(b),
        }),
        _ => Err(VmError::Unorderable {
            op: op.symbol(),
            left: left.type_name().to_string(),
            right: right.type_name().to_string(),
        }),
    }
}

/// Membership test `item in container`.
pub fn contains(container: &Value, item: &Value) -> Result<bool> {
    match container {
        Value::String(s) => match item {
            Value::String(sub) => Ok(s.contains(sub.as_ref())),
            _ => Err(VmError::UnsupportedOperands {
                op: "in",
                left: item.type_name().to_string(),
                right: "str".to_string(),
            }),
        },
        Value::List(l) => Ok(l.contains(item)),
        Value::Set(s) => Ok(s.contains(item)),
        Value::Map(m) => Ok(m.contains_key(item)),
        Value::Object(o) => o.contains(item).map_err(VmError::host),
        _ => Err(VmError::NotAContainer {
            type_name: container.type_name().to_string(),
        }),
    }
}

/// Identity test `left is right`.
///
/// Scalars of the same type are identical when equal; everything else is
/// identical only when both sides share one allocation.
pub fn is_same(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::None, Value::None) => true,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Int(a), Value::Int(b)) => a == b,
        (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
        (Value::String(a), Value::String(b)) => a == b,
        (Value::List(a), Value::List(b)) => std::sync::Arc::ptr_eq(a, b),
        (Value::Set(a), Value::Set(b)) => std::sync::Arc::ptr_eq(a, b),
        (Value::Map(a), Value::Map(b)) => std::sync::Arc::ptr_eq(a, b),
        // Host values order by address.
        (Value::Object(_), Value::Object(_))
        | (Value::Function(_), Value::Function(_))
        | (Value::ContextFunction(_), Value::ContextFunction(_)) => left == right,
        _ => false,
    }
}
