// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use super::context::EvalContext;
use super::errors::{Result, VmError};
use crate::value::Value;

/// The `rule(name)` builtin.
///
/// Evaluates the condition of another rule in the current context and
/// pushes its truthiness. Results are cached for the rest of the evaluation;
/// unknown rules count as false.
pub fn call_rule(ctx: &mut EvalContext<'_>, args: &[Value]) -> Result<()> {
    let name = match args {
        [Value::String(name)] => name.to_string(),
        _ => {
            return Err(VmError::InvalidRuleArgument {
                got: args
                    .iter()
                    .map(|a| a.type_name().to_string())
                    .collect::<Vec<String>>()
                    .join(", "),
            })
        }
    };

    if let Some(cached) = ctx.rule_cache.get(&name) {
        ctx.push(Value::Bool(*cached));
        return Ok(());
    }

    let policy = ctx.policy;
    let Some(rule) = policy.get(&name) else {
        let caller = ctx.rule_name_stack.last().map(String::as_str);
        policy.diagnostics().unknown_rule(&name, caller);
        ctx.rule_cache.insert(name, false);
        ctx.push(Value::Bool(false));
        return Ok(());
    };

    let caller = ctx.rule_name_stack.last().cloned().unwrap_or_default();
    if ctx.rule_name_stack.contains(&name) {
        let mut chain = ctx.rule_name_stack.clone();
        chain.push(name);
        let err = VmError::RuleRecursion { chain };
        ctx.report(&caller, &err);
        return Err(err);
    }

    let program = rule.compile(policy.diagnostics());
    ctx.enter_rule(&name);
    let outcome = ctx.execute(program, true);
    ctx.rule_name_stack.pop();
    if let Err(err) = outcome {
        ctx.report(&name, &err);
        return Err(err);
    }

    let condition = ctx.pop()?.is_truthy();
    tracing::debug!(rule = %name, result = condition, "nested rule evaluated");
    ctx.rule_cache.insert(name, condition);
    ctx.push(Value::Bool(condition));
    Ok(())
}
