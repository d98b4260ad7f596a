// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Default builtin functions.
//!
//! All of them are pure functions of their arguments. `rule` is not in this
//! table; policies add it themselves.

pub mod aggregates;
pub mod numbers;
pub mod objects;
pub mod types;
pub mod utils;

use crate::value::{NativeFunction, Value};

use std::collections::{BTreeMap, HashMap};

use anyhow::Result;
use lazy_static::lazy_static;

pub type BuiltinFcn = fn(&[Value]) -> Result<Value>;

#[rustfmt::skip]
lazy_static! {
    pub static ref BUILTINS: HashMap<&'static str, BuiltinFcn> = {
	let mut m : HashMap<&'static str, BuiltinFcn>  = HashMap::new();

	numbers::register(&mut m);
	aggregates::register(&mut m);
	types::register(&mut m);
	objects::register(&mut m);

	m
    };
}

/// The builtins as a name to value table, ready for [`crate::Policy::with_builtins`].
pub fn default_builtins() -> BTreeMap<String, Value> {
    BUILTINS
        .iter()
        .map(|(name, fcn)| {
            (
                name.to_string(),
                Value::Function(NativeFunction::new(name, *fcn)),
            )
        })
        .collect()
}
