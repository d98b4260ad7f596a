// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use super::errors::{Result, VmError};
use crate::authorization::AuthorizationResult;
use crate::policy::Policy;
use crate::value::Value;

use std::collections::BTreeMap;

/// State of one top-level evaluation.
///
/// Nested `rule(name)` calls run on the same context, so they share the
/// operand stack, the rule cache and the cycle-detection stack.
pub struct EvalContext<'a> {
    pub(super) policy: &'a Policy,
    pub(super) variables: &'a BTreeMap<String, Value>,
    pub(super) stack: Vec<Value>,
    pub(super) pc: usize,
    pub(super) step: usize,
    pub(super) attrs: BTreeMap<String, Value>,
    pub(super) authz: Option<AuthorizationResult>,
    pub(super) rule_name_stack: Vec<String>,
    pub(super) rule_cache: BTreeMap<String, bool>,
    pub(super) reported: bool,
}

impl<'a> EvalContext<'a> {
    pub fn new(
        policy: &'a Policy,
        variables: &'a BTreeMap<String, Value>,
        attrs: BTreeMap<String, Value>,
    ) -> Self {
        Self {
            policy,
            variables,
            stack: vec![],
            pc: 0,
            step: 1,
            attrs,
            authz: None,
            rule_name_stack: vec![],
            rule_cache: BTreeMap::new(),
            reported: false,
        }
    }

    pub fn policy(&self) -> &'a Policy {
        self.policy
    }

    pub fn variables(&self) -> &BTreeMap<String, Value> {
        self.variables
    }

    pub fn push(&mut self, value: Value) {
        self.stack.push(value);
    }

    pub fn pop(&mut self) -> Result<Value> {
        self.stack
            .pop()
            .ok_or(VmError::StackUnderflow { pc: self.pc })
    }

    pub fn peek(&self) -> Result<&Value> {
        self.stack
            .last()
            .ok_or(VmError::StackUnderflow { pc: self.pc })
    }

    pub fn stack(&self) -> &[Value] {
        &self.stack
    }

    /// Rules currently being evaluated, outermost first.
    pub fn rule_name_stack(&self) -> &[String] {
        &self.rule_name_stack
    }

    pub fn enter_rule(&mut self, name: &str) {
        self.rule_name_stack.push(name.to_string());
    }

    pub fn authorization(&self) -> Option<&AuthorizationResult> {
        self.authz.as_ref()
    }

    pub fn take_authorization(&mut self) -> Option<AuthorizationResult> {
        self.authz.take()
    }

    /// Report an evaluation error unless one was already reported in this
    /// evaluation.
    pub fn report(&mut self, rule: &str, error: &VmError) {
        if !self.reported {
            self.reported = true;
            self.policy.diagnostics().evaluation_error(rule, error);
        }
    }

    /// Split off the topmost `count` values, oldest first.
    pub(super) fn pop_n(&mut self, count: usize) -> Result<Vec<Value>> {
        let len = self.stack.len();
        if len < count {
            return Err(VmError::StackUnderflow { pc: self.pc });
        }
        Ok(self.stack.split_off(len - count))
    }

    pub(super) fn lookup(&self, name: &str) -> Value {
        match self.variables.get(name) {
            Some(v) => v.clone(),
            None => self.policy.resolve(name),
        }
    }
}
