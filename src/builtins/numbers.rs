// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::builtins;
use crate::builtins::utils::{ensure_args_count, ensure_args_range, ensure_int, ensure_numeric};
use crate::rvm::vm::arithmetic;
use crate::value::Value;

use std::collections::HashMap;

use anyhow::{bail, Result};

pub fn register(m: &mut HashMap<&'static str, builtins::BuiltinFcn>) {
    m.insert("abs", abs);
    m.insert("divmod", divmod);
    m.insert("float", float);
    m.insert("int", int);
    m.insert("pow", pow);
    m.insert("round", round);
}

fn abs(args: &[Value]) -> Result<Value> {
    ensure_args_count("abs", args, 1)?;
    match &args[0] {
        Value::Int(i) => match i.checked_abs() {
            Some(a) => Ok(Value::Int(a)),
            None => bail!("abs() overflows for {i}"),
        },
        v => Ok(Value::Float(ensure_numeric("abs", v)?.abs())),
    }
}

fn divmod(args: &[Value]) -> Result<Value> {
    ensure_args_count("divmod", args, 2)?;
    let q = arithmetic::floor_div(&args[0], &args[1])?;
    let r = arithmetic::modulo(&args[0], &args[1])?;
    Ok(Value::from(vec![q, r]))
}

fn pow(args: &[Value]) -> Result<Value> {
    ensure_args_count("pow", args, 2)?;
    Ok(arithmetic::pow(&args[0], &args[1])?)
}

fn to_int(fcn: &str, f: f64) -> Result<i64> {
    if !f.is_finite() || f < i64::MIN as f64 || f >= i64::MAX as f64 {
        bail!("{fcn}() cannot convert {f} to int");
    }
    Ok(f as i64)
}

fn int(args: &[Value]) -> Result<Value> {
    ensure_args_range("int", args, 0, 1)?;
    Ok(Value::Int(match args.first() {
        None => 0,
        Some(Value::Int(i)) => *i,
        Some(Value::Bool(b)) => i64::from(*b),
        Some(Value::Float(f)) => to_int("int", f.trunc())?,
        Some(Value::String(s)) => match s.trim().parse::<i64>() {
            Ok(i) => i,
            Err(_) => bail!("invalid literal for int(): {}", Value::String(s.clone()).repr()),
        },
        Some(v) => bail!("int() argument must be a string or a number, not '{}'", v.type_name()),
    }))
}

fn float(args: &[Value]) -> Result<Value> {
    ensure_args_range("float", args, 0, 1)?;
    Ok(Value::Float(match args.first() {
        None => 0.0,
        Some(Value::Bool(b)) => f64::from(u8::from(*b)),
        Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "inf" | "+inf" | "infinity" => f64::INFINITY,
            "-inf" | "-infinity" => f64::NEG_INFINITY,
            "nan" => f64::NAN,
            t => match t.parse::<f64>() {
                Ok(f) => f,
                Err(_) => bail!("could not convert string to float: {}", Value::String(s.clone()).repr()),
            },
        },
        Some(v) => ensure_numeric("float", v)?,
    }))
}

// Ties go to the even neighbour.
fn round_half_even(f: f64) -> f64 {
    let r = f.round();
    if (f - f.trunc()).abs() == 0.5 {
        2.0 * (f / 2.0).round()
    } else {
        r
    }
}

fn round(args: &[Value]) -> Result<Value> {
    ensure_args_range("round", args, 1, 2)?;
    let digits = match args.get(1) {
        None | Some(Value::None) => None,
        Some(d) => Some(ensure_int("round", d)?),
    };
    match (&args[0], digits) {
        (Value::Int(i), _) => Ok(Value::Int(*i)),
        (v, None) => Ok(Value::Int(to_int("round", round_half_even(ensure_numeric("round", v)?))?)),
        (v, Some(d)) => {
            let f = ensure_numeric("round", v)?;
            let scale = 10f64.powi(d.clamp(-308, 308) as i32);
            Ok(Value::Float(round_half_even(f * scale) / scale))
        }
    }
}
