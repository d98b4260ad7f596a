// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::BTreeMap;

use anyhow::{bail, Result};
use policies::*;
use serde::{Deserialize, Serialize};
use test_generator::test_resources;

#[derive(Serialize, Deserialize, Debug)]
struct Case {
    note: String,
    rule: String,
    #[serde(default)]
    variables: BTreeMap<String, Value>,
    want: Option<Value>,
    want_repr: Option<String>,
    want_error: Option<String>,
    allowed: Option<bool>,
}

#[derive(Serialize, Deserialize, Debug)]
struct Test {
    cases: Vec<Case>,
}

/// Value of the rule's condition, ignoring its attributes.
fn eval_condition(rule: &str, variables: &BTreeMap<String, Value>) -> Result<Value> {
    let policy = Policy::new();
    let program = parse_rule("test", rule)?;
    let mut ctx = EvalContext::new(&policy, variables, BTreeMap::new());
    ctx.execute(&program, true)?;
    Ok(ctx.pop()?)
}

fn yaml_test_impl(file: &str) -> Result<()> {
    let yaml_str = std::fs::read_to_string(file)?;
    let test: Test = serde_yaml::from_str(&yaml_str)?;

    for case in &test.cases {
        print!("case {} ", case.note);
        let truthy = match (eval_condition(&case.rule, &case.variables), &case.want_error) {
            (Ok(value), None) => {
                if let Some(want) = &case.want {
                    assert_eq!(&value, want, "case {}", case.note);
                    // Int and Float compare equal; the kind must match too.
                    assert_eq!(value.type_name(), want.type_name(), "case {}", case.note);
                }
                if let Some(want) = &case.want_repr {
                    assert_eq!(&value.repr(), want, "case {}", case.note);
                }
                value.is_truthy()
            }
            (Ok(value), Some(_)) => bail!("case {} evaluated to {}", case.note, value.repr()),
            (Err(err), Some(expected)) => {
                let msg = format!("{err:#}");
                if !msg.contains(expected.as_str()) {
                    bail!("case {}: `{msg}` does not contain `{expected}`", case.note);
                }
                false
            }
            (Err(err), None) => bail!("case {} failed: {err:#}", case.note),
        };

        // Errors deny.
        let mut policy = Policy::new();
        policy.insert("test", &case.rule);
        let result = policy.evaluate("test", &case.variables);
        assert_eq!(
            result.result(),
            case.allowed.unwrap_or(truthy),
            "case {}",
            case.note
        );
        println!("passed");
    }
    Ok(())
}

fn yaml_test(file: &str) -> Result<()> {
    match yaml_test_impl(file) {
        Ok(_) => Ok(()),
        Err(e) => {
            panic!("{}", e);
        }
    }
}

#[test_resources("tests/evaluation/**/*.yaml")]
fn run(path: &str) {
    yaml_test(path).unwrap()
}
