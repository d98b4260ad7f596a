// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use super::errors::{Result, VmError};
use crate::value::Value;

fn normalize_index(index: i64, len: usize) -> Result<usize> {
    let adjusted = if index < 0 {
        i64::try_from(len).ok().and_then(|l| l.checked_add(index))
    } else {
        Some(index)
    };
    match adjusted.and_then(|i| usize::try_from(i).ok()) {
        Some(i) if i < len => Ok(i),
        _ => Err(VmError::IndexOutOfRange { index, len }),
    }
}

/// `container[key]`
pub fn item(container: &Value, key: &Value) -> Result<Value> {
    match (container, key) {
        (Value::List(l), Value::Int(i)) => Ok(l[normalize_index(*i, l.len())?].clone()),
        (Value::String(s), Value::Int(i)) => {
            let count = s.chars().count();
            let idx = normalize_index(*i, count)?;
            match s.chars().nth(idx) {
                Some(c) => Ok(Value::from(c.to_string())),
                None => Err(VmError::IndexOutOfRange { index: *i, len: count }),
            }
        }
        (Value::List(_) | Value::String(_), _) => Err(VmError::InvalidIndex {
            container: container.type_name().to_string(),
            index: key.type_name().to_string(),
        }),
        (Value::Map(m), _) => m.get(key).cloned().ok_or_else(|| VmError::KeyNotFound {
            key: key.repr(),
        }),
        (Value::Object(o), _) => o.item(key).map_err(VmError::host),
        _ => Err(VmError::NotSubscriptable {
            type_name: container.type_name().to_string(),
        }),
    }
}

/// `object.name`; maps expose their string keys as attributes.
pub fn attribute(object: &Value, name: &str) -> Result<Value> {
    let found = match object {
        Value::Object(o) => o.attribute(name),
        Value::Map(m) => m.get(&Value::from(name)).cloned(),
        _ => None,
    };
    found.ok_or_else(|| VmError::MissingAttribute {
        type_name: object.type_name().to_string(),
        name: name.to_string(),
    })
}
