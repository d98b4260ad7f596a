// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::builtins;
use crate::builtins::utils::{ensure_args_count, ensure_args_range, items_or_args};
use crate::rvm::instructions::BinaryOp;
use crate::rvm::vm::{arithmetic, comparison};
use crate::value::Value;

use std::collections::HashMap;

use anyhow::{bail, Result};

pub fn register(m: &mut HashMap<&'static str, builtins::BuiltinFcn>) {
    m.insert("all", all);
    m.insert("any", any);
    m.insert("len", len);
    m.insert("max", max);
    m.insert("min", min);
    m.insert("sorted", sorted);
    m.insert("sum", sum);
}

fn len(args: &[Value]) -> Result<Value> {
    ensure_args_count("len", args, 1)?;
    Ok(Value::from(match &args[0] {
        Value::String(s) => s.chars().count(),
        Value::List(l) => l.len(),
        Value::Set(s) => s.len(),
        Value::Map(m) => m.len(),
        v => bail!("object of type '{}' has no len()", v.type_name()),
    }))
}

fn extreme(fcn: &str, args: &[Value], wanted: BinaryOp) -> Result<Value> {
    let mut items = items_or_args(fcn, args)?.into_iter();
    let Some(mut best) = items.next() else {
        bail!("{fcn}() arg is an empty sequence");
    };
    for item in items {
        if comparison::compare(wanted, &item, &best)? {
            best = item;
        }
    }
    Ok(best)
}

fn max(args: &[Value]) -> Result<Value> {
    extreme("max", args, BinaryOp::Gt)
}

fn min(args: &[Value]) -> Result<Value> {
    extreme("min", args, BinaryOp::Lt)
}

fn sum(args: &[Value]) -> Result<Value> {
    ensure_args_range("sum", args, 1, 2)?;
    let start = args.get(1).cloned().unwrap_or(Value::Int(0));
    args[0]
        .iter_items()?
        .iter()
        .try_fold(start, |acc, item| -> Result<Value> {
            Ok(arithmetic::add(&acc, item)?)
        })
}

fn sorted(args: &[Value]) -> Result<Value> {
    ensure_args_count("sorted", args, 1)?;
    let mut items = args[0].iter_items()?;
    items.sort();
    Ok(Value::from(items))
}

fn any(args: &[Value]) -> Result<Value> {
    ensure_args_count("any", args, 1)?;
    Ok(Value::Bool(args[0].iter_items()?.iter().any(Value::is_truthy)))
}

fn all(args: &[Value]) -> Result<Value> {
    ensure_args_count("all", args, 1)?;
    Ok(Value::Bool(args[0].iter_items()?.iter().all(Value::is_truthy)))
}
