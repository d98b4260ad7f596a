// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::builtins;
use crate::builtins::utils::{ensure_args_count, ensure_args_range};
use crate::value::Value;

use std::collections::{BTreeSet, HashMap};

use anyhow::Result;

pub fn register(m: &mut HashMap<&'static str, builtins::BuiltinFcn>) {
    m.insert("bool", bool);
    m.insert("callable", callable);
    m.insert("list", list);
    m.insert("repr", repr);
    m.insert("set", set);
    m.insert("str", str);
    m.insert("type", type_name);
}

fn bool(args: &[Value]) -> Result<Value> {
    ensure_args_range("bool", args, 0, 1)?;
    Ok(Value::Bool(args.first().is_some_and(Value::is_truthy)))
}

fn str(args: &[Value]) -> Result<Value> {
    ensure_args_range("str", args, 0, 1)?;
    Ok(Value::from(
        args.first().map(|v| v.to_string()).unwrap_or_default(),
    ))
}

fn repr(args: &[Value]) -> Result<Value> {
    ensure_args_count("repr", args, 1)?;
    Ok(Value::from(args[0].repr()))
}

fn type_name(args: &[Value]) -> Result<Value> {
    ensure_args_count("type", args, 1)?;
    Ok(Value::from(args[0].type_name()))
}

fn callable(args: &[Value]) -> Result<Value> {
    ensure_args_count("callable", args, 1)?;
    Ok(Value::Bool(args[0].is_callable()))
}

fn set(args: &[Value]) -> Result<Value> {
    ensure_args_range("set", args, 0, 1)?;
    let items = match args.first() {
        Some(v) => v.iter_items()?,
        None => vec![],
    };
    Ok(Value::from(items.into_iter().collect::<BTreeSet<Value>>()))
}

fn list(args: &[Value]) -> Result<Value> {
    ensure_args_range("list", args, 0, 1)?;
    let items = match args.first() {
        Some(v) => v.iter_items()?,
        None => vec![],
    };
    Ok(Value::from(items))
}
