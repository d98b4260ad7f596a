// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::diagnostics::Diagnostics;
use crate::parser::compile_rule;
use crate::rvm::program::Program;
use crate::value::Value;

use std::collections::BTreeMap;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

fn is_public(name: &str) -> bool {
    !name.starts_with('_')
}

/// A named rule. The text is compiled on first use and the program is kept
/// for the lifetime of the rule.
#[derive(Debug, Clone)]
pub struct Rule {
    name: String,
    text: String,
    attrs: BTreeMap<String, Value>,
    program: OnceLock<Program>,
}

impl Rule {
    pub fn new(name: &str, text: &str) -> Self {
        Self::with_attrs(name, text, BTreeMap::new())
    }

    /// `attrs` are the defaults of the rule's authorization attributes.
    pub fn with_attrs(name: &str, text: &str, attrs: BTreeMap<String, Value>) -> Self {
        Self {
            name: name.to_string(),
            text: text.to_string(),
            attrs: attrs.into_iter().filter(|(k, _)| is_public(k)).collect(),
            program: OnceLock::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn attrs(&self) -> &BTreeMap<String, Value> {
        &self.attrs
    }

    pub fn compile(&self, diagnostics: &dyn Diagnostics) -> &Program {
        self.program
            .get_or_init(|| compile_rule(&self.name, &self.text, diagnostics))
    }

    /// The program, if the rule has been compiled.
    pub fn program(&self) -> Option<&Program> {
        self.program.get()
    }
}

/// Documentation of a declared rule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleDoc {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attr_docs: BTreeMap<String, String>,
}

impl RuleDoc {
    pub fn new(name: &str, doc: Option<&str>, attr_docs: BTreeMap<String, String>) -> Self {
        Self {
            name: name.to_string(),
            doc: doc.filter(|d| !d.is_empty()).map(str::to_string),
            attr_docs: attr_docs
                .into_iter()
                .filter(|(k, v)| is_public(k) && !v.is_empty())
                .collect(),
        }
    }
}
