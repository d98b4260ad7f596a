// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::value::Value;

use anyhow::{bail, Result};

pub fn ensure_args_count(fcn: &'static str, args: &[Value], expected: usize) -> Result<()> {
    if args.len() != expected {
        if expected == 1 {
            bail!("{fcn}() takes exactly one argument ({} given)", args.len())
        } else {
            bail!(
                "{fcn}() takes exactly {expected} arguments ({} given)",
                args.len()
            )
        }
    }
    Ok(())
}

pub fn ensure_args_range(fcn: &'static str, args: &[Value], min: usize, max: usize) -> Result<()> {
    if args.len() < min || args.len() > max {
        bail!(
            "{fcn}() takes from {min} to {max} arguments ({} given)",
            args.len()
        )
    }
    Ok(())
}

pub fn ensure_int(fcn: &str, v: &Value) -> Result<i64> {
    match v {
        Value::Int(i) => Ok(*i),
        _ => bail!("{fcn}() expects an int, got '{}'", v.type_name()),
    }
}

pub fn ensure_numeric(fcn: &str, v: &Value) -> Result<f64> {
    match v {
        Value::Int(_) | Value::Float(_) => v.as_f64(),
        _ => bail!("{fcn}() expects a number, got '{}'", v.type_name()),
    }
}

pub fn ensure_string<'a>(fcn: &str, v: &'a Value) -> Result<&'a str> {
    match v {
        Value::String(s) => Ok(s.as_ref()),
        _ => bail!("{fcn}() expects a string, got '{}'", v.type_name()),
    }
}

/// Items of a single iterable argument, or the arguments themselves.
pub fn items_or_args(fcn: &str, args: &[Value]) -> Result<Vec<Value>> {
    match args {
        [] => bail!("{fcn}() expects at least one argument"),
        [single] => single.iter_items(),
        _ => Ok(args.to_vec()),
    }
}
