// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::authorization::AuthorizationResult;
use crate::builtins;
use crate::diagnostics::{Diagnostics, TracingDiagnostics};
use crate::rules::{Rule, RuleDoc};
use crate::rvm::vm::{call_rule, EvalContext};
use crate::value::Value;

use core::fmt;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use anyhow::{bail, Result};
use parking_lot::RwLock;

/// Resolves identifiers that are neither variables nor builtins.
pub trait SymbolProvider: Send + Sync {
    fn resolve(&self, symbol: &str) -> Option<Value>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PolicyError {
    #[error("rule '{name}' cannot be stored under key '{key}'")]
    NameMismatch { key: String, name: String },
}

/// A set of named rules.
///
/// Every name may have a declared default (with documentation) and an
/// explicitly set rule; the set rule wins. Evaluation never fails: any
/// problem yields a denial.
pub struct Policy {
    defaults: BTreeMap<String, Arc<Rule>>,
    docs: BTreeMap<String, RuleDoc>,
    rules: BTreeMap<String, Arc<Rule>>,
    builtins: BTreeMap<String, Value>,
    resolve_cache: RwLock<BTreeMap<String, Value>>,
    provider: Option<Arc<dyn SymbolProvider>>,
    diagnostics: Arc<dyn Diagnostics>,
}

impl Default for Policy {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Policy")
            .field("rules", &self.names())
            .field("has_provider", &self.provider.is_some())
            .finish()
    }
}

impl Policy {
    /// A policy using the default builtins.
    pub fn new() -> Self {
        Self::with_builtins(builtins::default_builtins())
    }

    /// A policy resolving identifiers from `builtins` first. `rule` is added
    /// unless the table defines it.
    pub fn with_builtins(mut builtins: BTreeMap<String, Value>) -> Self {
        builtins
            .entry("rule".to_string())
            .or_insert_with(|| Value::from_context_fn("rule", call_rule));
        Self {
            defaults: BTreeMap::new(),
            docs: BTreeMap::new(),
            rules: BTreeMap::new(),
            resolve_cache: RwLock::new(builtins.clone()),
            builtins,
            provider: None,
            diagnostics: Arc::new(TracingDiagnostics),
        }
    }

    pub fn set_symbol_provider<P: SymbolProvider + 'static>(&mut self, provider: P) {
        self.provider = Some(Arc::new(provider));
        *self.resolve_cache.write() = self.builtins.clone();
    }

    pub fn set_diagnostics<D: Diagnostics + 'static>(&mut self, diagnostics: D) {
        self.diagnostics = Arc::new(diagnostics);
    }

    pub fn diagnostics(&self) -> &dyn Diagnostics {
        self.diagnostics.as_ref()
    }

    /// Declare the default rule for `name` along with its documentation.
    pub fn declare(
        &mut self,
        name: &str,
        text: &str,
        doc: Option<&str>,
        attrs: BTreeMap<String, Value>,
        attr_docs: BTreeMap<String, String>,
    ) {
        self.defaults
            .insert(name.to_string(), Arc::new(Rule::with_attrs(name, text, attrs)));
        self.docs
            .insert(name.to_string(), RuleDoc::new(name, doc, attr_docs));
    }

    pub fn set_rule(&mut self, rule: Rule) {
        self.rules.insert(rule.name().to_string(), Arc::new(rule));
    }

    pub fn insert(&mut self, key: &str, text: &str) {
        self.set_rule(Rule::new(key, text));
    }

    pub fn insert_rule(&mut self, key: &str, rule: Rule) -> core::result::Result<(), PolicyError> {
        if key != rule.name() {
            return Err(PolicyError::NameMismatch {
                key: key.to_string(),
                name: rule.name().to_string(),
            });
        }
        self.set_rule(rule);
        Ok(())
    }

    /// Remove the set rule; the declared default (if any) applies again.
    pub fn delete_rule(&mut self, name: &str) -> Option<Arc<Rule>> {
        self.rules.remove(name)
    }

    /// The effective rule for `name`.
    pub fn get(&self, name: &str) -> Option<Arc<Rule>> {
        self.rules
            .get(name)
            .or_else(|| self.defaults.get(name))
            .cloned()
    }

    pub fn get_default(&self, name: &str) -> Option<Arc<Rule>> {
        self.defaults.get(name).cloned()
    }

    pub fn declared(&self, name: &str) -> bool {
        self.defaults.contains_key(name)
    }

    /// Documentation of `name`; empty when it was never declared.
    pub fn get_doc(&self, name: &str) -> RuleDoc {
        self.docs
            .get(name)
            .cloned()
            .unwrap_or_else(|| RuleDoc::new(name, None, BTreeMap::new()))
    }

    pub fn docs(&self) -> impl Iterator<Item = &RuleDoc> {
        self.docs.values()
    }

    /// Names of all declared or set rules.
    pub fn names(&self) -> Vec<String> {
        self.defaults
            .keys()
            .chain(self.rules.keys())
            .cloned()
            .collect::<BTreeSet<String>>()
            .into_iter()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.names().len()
    }

    pub fn is_empty(&self) -> bool {
        self.defaults.is_empty() && self.rules.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.rules.contains_key(name) || self.defaults.contains_key(name)
    }

    /// Value of an identifier that is not a variable: builtins, then the
    /// symbol provider, else `None`. Results are cached.
    pub fn resolve(&self, symbol: &str) -> Value {
        if let Some(value) = self.resolve_cache.read().get(symbol) {
            return value.clone();
        }
        let value = self
            .provider
            .as_ref()
            .and_then(|p| p.resolve(symbol))
            .unwrap_or(Value::None);
        self.resolve_cache
            .write()
            .entry(symbol.to_string())
            .or_insert(value)
            .clone()
    }

    /// Evaluate rule `name` against `variables`.
    pub fn evaluate(&self, name: &str, variables: &BTreeMap<String, Value>) -> AuthorizationResult {
        let default = self.defaults.get(name);
        let set = self.rules.get(name);
        let Some(rule) = set.or(default) else {
            tracing::debug!(rule = name, "no such rule");
            return AuthorizationResult::new(false);
        };

        let mut attrs = default.map(|r| r.attrs().clone()).unwrap_or_default();
        if let Some(set) = set {
            attrs.extend(set.attrs().iter().map(|(k, v)| (k.clone(), v.clone())));
        }

        let program = rule.compile(self.diagnostics());
        let mut ctx = EvalContext::new(self, variables, attrs.clone());
        ctx.enter_rule(name);
        match ctx.execute(program, false) {
            Ok(()) => match ctx.take_authorization() {
                Some(result) => result,
                None => {
                    tracing::debug!(rule = name, "rule did not produce a decision");
                    AuthorizationResult::with_attrs(false, attrs)
                }
            },
            Err(err) => {
                ctx.report(name, &err);
                AuthorizationResult::with_attrs(false, attrs)
            }
        }
    }

    fn add_rules(&mut self, rules: &Value) -> Result<()> {
        let Ok(map) = rules.as_map() else {
            bail!("policy file must map rule names to rules");
        };
        for (key, value) in map.iter() {
            let Value::String(name) = key else {
                bail!("rule name {} is not a string", key.repr());
            };
            let rule = match value {
                Value::String(text) => Rule::new(name, text),
                Value::Map(fields) => {
                    let text = match fields.get(&Value::from("text")) {
                        Some(Value::String(text)) => text.clone(),
                        Some(_) => bail!("text of rule {name} is not a string"),
                        None => "".into(),
                    };
                    let attrs = match fields.get(&Value::from("attrs")) {
                        Some(Value::Map(attrs)) => attrs
                            .iter()
                            .map(|(k, v)| (k.to_string(), v.clone()))
                            .collect(),
                        Some(_) => bail!("attrs of rule {name} must be a mapping"),
                        None => BTreeMap::new(),
                    };
                    Rule::with_attrs(name, &text, attrs)
                }
                _ => bail!("rule {name} must be a string or a mapping"),
            };
            self.set_rule(rule);
        }
        Ok(())
    }

    /// Load rules from JSON: an object mapping rule names to rule text, or
    /// to `{"text": ..., "attrs": {...}}`.
    pub fn add_rules_from_json_str(&mut self, json: &str) -> Result<()> {
        self.add_rules(&Value::from_json_str(json)?)
    }

    #[cfg(feature = "yaml")]
    pub fn add_rules_from_yaml_str(&mut self, yaml: &str) -> Result<()> {
        self.add_rules(&Value::from_yaml_str(yaml)?)
    }

    /// Load rules from a `.json` (or, with the `yaml` feature, `.yaml`/`.yml`)
    /// file.
    pub fn add_rules_from_file<P: AsRef<std::path::Path>>(&mut self, path: P) -> Result<()> {
        let path = path.as_ref();
        let contents = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) => bail!("Failed to read {}. {e}", path.display()),
        };
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => self.add_rules_from_json_str(&contents),
            #[cfg(feature = "yaml")]
            Some("yaml" | "yml") => self.add_rules_from_yaml_str(&contents),
            _ => bail!("unsupported policy file {}", path.display()),
        }
    }

    /// A YAML policy file listing every declared rule with its default text,
    /// annotated with the rule's documentation.
    pub fn sample_config(&self) -> Result<String> {
        let mut out = String::new();
        for (name, rule) in self.defaults.iter() {
            let doc = self.get_doc(name);
            if !out.is_empty() {
                out.push('\n');
            }
            if let Some(text) = &doc.doc {
                for line in text.lines() {
                    out.push_str(&format!("# {line}\n"));
                }
            }
            for (attr, attr_doc) in doc.attr_docs.iter() {
                out.push_str(&format!("# {{{{ {attr} }}}}: {attr_doc}\n"));
            }
            out.push_str(&format!(
                "{}: {}\n",
                serde_json::to_string(name)?,
                serde_json::to_string(rule.text())?
            ));
        }
        Ok(out)
    }
}
