// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::value::Value;

use core::fmt;
use std::collections::BTreeMap;

use serde::Serialize;

/// Decision of one rule evaluation plus its authorization attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AuthorizationResult {
    result: bool,
    attrs: BTreeMap<String, Value>,
}

impl AuthorizationResult {
    pub fn new(result: bool) -> Self {
        Self {
            result,
            attrs: BTreeMap::new(),
        }
    }

    pub fn with_attrs(result: bool, attrs: BTreeMap<String, Value>) -> Self {
        Self { result, attrs }
    }

    pub fn result(&self) -> bool {
        self.result
    }

    /// Value of an authorization attribute. Names starting with `_` are
    /// never attributes.
    pub fn get(&self, name: &str) -> Option<&Value> {
        if name.starts_with('_') {
            return None;
        }
        self.attrs.get(name)
    }

    pub fn attrs(&self) -> &BTreeMap<String, Value> {
        &self.attrs
    }

    pub(crate) fn insert_attr(&mut self, name: &str, value: Value) {
        self.attrs.insert(name.to_string(), value);
    }
}

impl fmt::Display for AuthorizationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", if self.result { "allow" } else { "deny" })?;
        for (i, (name, value)) in self.attrs.iter().enumerate() {
            let sep = if i == 0 { " " } else { ", " };
            write!(f, "{sep}{name}={}", value.repr())?;
        }
        Ok(())
    }
}
