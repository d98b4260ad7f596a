// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::builtins;
use crate::builtins::utils::{ensure_args_count, ensure_args_range, ensure_string};
use crate::rvm::vm::access;
use crate::value::Value;

use std::collections::HashMap;

use anyhow::Result;

pub fn register(m: &mut HashMap<&'static str, builtins::BuiltinFcn>) {
    m.insert("getattr", getattr);
    m.insert("hasattr", hasattr);
}

fn getattr(args: &[Value]) -> Result<Value> {
    ensure_args_range("getattr", args, 2, 3)?;
    let name = ensure_string("getattr", &args[1])?;
    match (access::attribute(&args[0], name), args.get(2)) {
        (Ok(v), _) => Ok(v),
        (Err(_), Some(default)) => Ok(default.clone()),
        (Err(e), None) => Err(e.into()),
    }
}

fn hasattr(args: &[Value]) -> Result<Value> {
    ensure_args_count("hasattr", args, 2)?;
    let name = ensure_string("hasattr", &args[1])?;
    Ok(Value::Bool(access::attribute(&args[0], name).is_ok()))
}
