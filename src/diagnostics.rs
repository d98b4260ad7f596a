// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::lexer::SyntaxError;
use crate::rvm::vm::VmError;

/// Sink for problems found while compiling or evaluating rules.
///
/// Reports are advisory; evaluation has already failed closed when they
/// are made.
pub trait Diagnostics: Send + Sync {
    fn syntax_error(&self, error: &SyntaxError);

    fn evaluation_error(&self, rule: &str, error: &VmError);

    /// `rule(name)` named a rule that is neither set nor declared.
    fn unknown_rule(&self, name: &str, caller: Option<&str>);
}

/// Reports through `tracing` at warn level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn syntax_error(&self, error: &SyntaxError) {
        tracing::warn!(
            rule = %error.rule,
            line = error.line,
            col = error.col,
            "invalid rule: {error}"
        );
    }

    fn evaluation_error(&self, rule: &str, error: &VmError) {
        tracing::warn!(rule, "rule evaluation failed: {error}");
    }

    fn unknown_rule(&self, name: &str, caller: Option<&str>) {
        tracing::warn!(rule = caller.unwrap_or_default(), "unknown rule '{name}'");
    }
}
