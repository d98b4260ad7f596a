// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{bail, Result};
use policies::*;

#[derive(Debug)]
struct User {
    name: String,
    groups: Vec<String>,
    admin: bool,
}

impl HostObject for User {
    fn type_name(&self) -> &str {
        "User"
    }

    fn attribute(&self, name: &str) -> Option<Value> {
        match name {
            "name" => Some(Value::from(self.name.as_str())),
            "admin" => Some(Value::Bool(self.admin)),
            "in_group" => {
                let groups = self.groups.clone();
                Some(Value::from_fn("in_group", move |args| match args {
                    [Value::String(g)] => Ok(Value::Bool(groups.iter().any(|x| x == g.as_ref()))),
                    _ => bail!("expects a group name"),
                }))
            }
            _ => None,
        }
    }
}

fn user(name: &str, groups: &[&str], admin: bool) -> Value {
    Value::from_object(User {
        name: name.to_string(),
        groups: groups.iter().map(|g| g.to_string()).collect(),
        admin,
    })
}

fn vars(pairs: &[(&str, Value)]) -> BTreeMap<String, Value> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

#[derive(Default)]
struct Recorded {
    syntax: Vec<String>,
    evaluation: Vec<(String, VmError)>,
    unknown: Vec<(String, Option<String>)>,
}

#[derive(Clone, Default)]
struct Recorder(Arc<Mutex<Recorded>>);

impl Recorder {
    fn syntax_count(&self) -> usize {
        self.0.lock().map(|r| r.syntax.len()).unwrap_or_default()
    }

    fn evaluation(&self) -> Vec<(String, VmError)> {
        self.0
            .lock()
            .map(|r| r.evaluation.clone())
            .unwrap_or_default()
    }

    fn unknown(&self) -> Vec<(String, Option<String>)> {
        self.0.lock().map(|r| r.unknown.clone()).unwrap_or_default()
    }
}

impl Diagnostics for Recorder {
    fn syntax_error(&self, error: &SyntaxError) {
        if let Ok(mut r) = self.0.lock() {
            r.syntax.push(error.message.clone());
        }
    }

    fn evaluation_error(&self, rule: &str, error: &VmError) {
        if let Ok(mut r) = self.0.lock() {
            r.evaluation.push((rule.to_string(), error.clone()));
        }
    }

    fn unknown_rule(&self, name: &str, caller: Option<&str>) {
        if let Ok(mut r) = self.0.lock() {
            r.unknown
                .push((name.to_string(), caller.map(|c| c.to_string())));
        }
    }
}

fn recorded_policy() -> (Policy, Recorder) {
    let recorder = Recorder::default();
    let mut policy = Policy::new();
    policy.set_diagnostics(recorder.clone());
    (policy, recorder)
}

#[test]
fn constant_rule_allows() {
    let mut policy = Policy::new();
    policy.insert("always", "3 + 2 * 4");
    let result = policy.evaluate("always", &BTreeMap::new());
    assert!(result.result());
    assert!(result.attrs().is_empty());
}

#[test]
fn owner_or_admin() {
    let mut policy = Policy::new();
    policy.insert("is_admin", r#"user.in_group("administrators") and user.admin"#);
    policy.insert("can_edit", r#"user.name == owner or rule("is_admin")"#);

    let alice = user("alice", &["administrators"], true);
    let bob = user("bob", &["staff"], false);

    let v = vars(&[("user", alice), ("owner", Value::from("carol"))]);
    assert!(policy.evaluate("can_edit", &v).result());

    let v = vars(&[("user", bob.clone()), ("owner", Value::from("bob"))]);
    assert!(policy.evaluate("can_edit", &v).result());

    let v = vars(&[("user", bob), ("owner", Value::from("carol"))]);
    assert!(!policy.evaluate("can_edit", &v).result());
}

#[test]
fn host_object_identity_and_type() {
    let mut policy = Policy::new();
    policy.insert("same", "a is b and type(a) == \"User\"");
    let alice = user("alice", &[], false);
    let v = vars(&[("a", alice.clone()), ("b", alice)]);
    assert!(policy.evaluate("same", &v).result());

    let v = vars(&[("a", user("x", &[], false)), ("b", user("x", &[], false))]);
    assert!(!policy.evaluate("same", &v).result());
}

#[test]
fn attributes_are_attached() {
    let mut policy = Policy::new();
    policy.insert("big", "level > 400 {{ level=level }}");

    let result = policy.evaluate("big", &vars(&[("level", Value::Int(500))]));
    assert!(result.result());
    assert_eq!(result.get("level"), Some(&Value::Int(500)));

    let result = policy.evaluate("big", &vars(&[("level", Value::Int(5))]));
    assert!(!result.result());
    assert_eq!(result.get("level"), Some(&Value::Int(5)));
}

#[test]
fn syntax_error_is_reported_once() {
    let (mut policy, recorder) = recorded_policy();
    policy.insert("broken", "3 +");
    for _ in 0..3 {
        let result = policy.evaluate("broken", &BTreeMap::new());
        assert!(!result.result());
    }
    assert_eq!(recorder.syntax_count(), 1);
    assert!(recorder.evaluation().is_empty());
}

#[test]
fn deep_nesting_is_a_syntax_error() {
    let (mut policy, recorder) = recorded_policy();
    let depth = 20_000;
    let text = format!("{}1{}", "(".repeat(depth), ")".repeat(depth));
    policy.insert("nested", &text);
    assert!(!policy.evaluate("nested", &BTreeMap::new()).result());
    assert_eq!(recorder.syntax_count(), 1);

    policy.insert("shallow", &format!("{}1{}", "(".repeat(100), ")".repeat(100)));
    assert!(policy.evaluate("shallow", &BTreeMap::new()).result());
}

#[test]
fn oversized_repetition_denies() {
    let (mut policy, recorder) = recorded_policy();
    policy.insert("runtime", r#""x" * n"#);
    policy.insert("folded", r#""x" * 100000000000000"#);
    policy.insert("small", r#"len("ab" * n) == 6"#);

    let n = vars(&[("n", Value::Int(100_000_000_000_000))]);
    assert!(!policy.evaluate("runtime", &n).result());
    assert!(!policy.evaluate("folded", &BTreeMap::new()).result());
    assert!(policy.evaluate("small", &vars(&[("n", Value::Int(3))])).result());

    let reports = recorder.evaluation();
    assert_eq!(reports.len(), 2);
    assert!(reports
        .iter()
        .all(|(_, e)| matches!(e, VmError::SequenceTooLarge { .. })));
    assert_eq!(recorder.syntax_count(), 0);
}

#[test]
fn self_recursion_denies() {
    let (mut policy, recorder) = recorded_policy();
    policy.insert("r", r#"rule("r")"#);
    assert!(!policy.evaluate("r", &BTreeMap::new()).result());

    let reports = recorder.evaluation();
    assert_eq!(reports.len(), 1);
    assert_eq!(
        reports[0],
        (
            "r".to_string(),
            VmError::RuleRecursion {
                chain: vec!["r".to_string(), "r".to_string()]
            }
        )
    );
}

#[test]
fn mutual_recursion_denies() {
    let (mut policy, recorder) = recorded_policy();
    policy.insert("a", r#"rule("b")"#);
    policy.insert("b", r#"x or rule("a")"#);

    assert!(!policy.evaluate("a", &BTreeMap::new()).result());
    let reports = recorder.evaluation();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].0, "b");
    assert_eq!(reports[0].1.to_string(), "rule recursion detected: a -> b -> a");

    // The cycle is never entered when `x` decides.
    assert!(policy
        .evaluate("a", &vars(&[("x", Value::Bool(true))]))
        .result());
    assert_eq!(recorder.evaluation().len(), 1);
}

#[test]
fn unknown_nested_rule_is_false() {
    let (mut policy, recorder) = recorded_policy();
    policy.insert("top", r#"rule("missing") or x"#);

    assert!(policy.evaluate("top", &vars(&[("x", Value::Int(1))])).result());
    assert!(!policy.evaluate("top", &BTreeMap::new()).result());
    assert_eq!(
        recorder.unknown(),
        vec![
            ("missing".to_string(), Some("top".to_string())),
            ("missing".to_string(), Some("top".to_string())),
        ]
    );
}

#[test]
fn unknown_top_level_rule_denies() {
    let (policy, recorder) = recorded_policy();
    let result = policy.evaluate("nothing", &BTreeMap::new());
    assert_eq!(result, AuthorizationResult::new(false));
    assert!(recorder.unknown().is_empty());
}

#[test]
fn nested_rule_results_are_cached() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let count = Value::from_fn("count", move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(Value::Bool(true))
    });

    let mut policy = Policy::new();
    policy.insert("expensive", "count()");
    policy.insert("top", r#"rule("expensive") and rule("expensive")"#);

    let v = vars(&[("count", count)]);
    assert!(policy.evaluate("top", &v).result());
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    // The cache lives for one evaluation only.
    assert!(policy.evaluate("top", &v).result());
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn short_circuit_skips_calls() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let boom = Value::from_fn("boom", move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        bail!("should not run")
    });

    let mut policy = Policy::new();
    policy.insert("and", "a and boom()");
    policy.insert("or", "a or boom()");
    policy.insert("cond", "boom() if a else 1");

    let v = vars(&[("a", Value::Int(0)), ("boom", boom.clone())]);
    assert!(!policy.evaluate("and", &v).result());
    assert!(policy.evaluate("cond", &v).result());

    let v = vars(&[("a", Value::Int(1)), ("boom", boom)]);
    assert!(policy.evaluate("or", &v).result());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn nested_rule_ignores_its_attributes() {
    let mut policy = Policy::new();
    policy.insert("inner", r#"x > 1 {{ inner = "yes" }}"#);
    policy.insert("outer", r#"rule("inner") and x < 10 {{ tag = "t" }}"#);

    let result = policy.evaluate("outer", &vars(&[("x", Value::Int(5))]));
    assert!(result.result());
    assert_eq!(result.get("tag"), Some(&Value::from("t")));
    assert_eq!(result.get("inner"), None);
}

#[test]
fn evaluation_is_idempotent() {
    let mut policy = Policy::new();
    policy.insert("r", "a % 3 == 1 {{ rem = a % 3, half = a / 2 }}");
    let v = vars(&[("a", Value::Int(7))]);
    let first = policy.evaluate("r", &v);
    let second = policy.evaluate("r", &v);
    assert_eq!(first, second);
    assert_eq!(first.get("half"), Some(&Value::Float(3.5)));
}

#[test]
fn errors_fail_closed_with_default_attrs() {
    let (mut policy, recorder) = recorded_policy();
    let mut attrs = BTreeMap::new();
    attrs.insert("review".to_string(), Value::Bool(true));
    attrs.insert("_secret".to_string(), Value::Int(1));
    policy.declare("pay", "amount < 100", Some("Pay without review."), attrs, BTreeMap::new());
    policy.insert("pay", "amount.cents < 100 {{ review = False }}");

    let result = policy.evaluate("pay", &vars(&[("amount", Value::Int(5))]));
    assert!(!result.result());
    assert_eq!(result.get("review"), Some(&Value::Bool(true)));
    assert_eq!(result.get("_secret"), None);
    assert_eq!(recorder.evaluation().len(), 1);
    assert_eq!(recorder.evaluation()[0].0, "pay");
}

#[test]
fn declared_defaults_and_overrides() -> Result<()> {
    let mut policy = Policy::new();
    let mut attrs = BTreeMap::new();
    attrs.insert("review".to_string(), Value::Bool(false));
    let mut attr_docs = BTreeMap::new();
    attr_docs.insert("review".to_string(), "Require a second approver.".to_string());
    policy.declare(
        "pay",
        "amount < 100",
        Some("Who may pay without approval."),
        attrs,
        attr_docs,
    );

    assert!(policy.declared("pay"));
    assert!(policy.contains("pay"));
    assert_eq!(policy.names(), vec!["pay".to_string()]);

    let small = vars(&[("amount", Value::Int(50))]);
    let large = vars(&[("amount", Value::Int(500))]);
    assert!(policy.evaluate("pay", &small).result());
    assert!(!policy.evaluate("pay", &large).result());

    // The override keeps the declared attributes unless it sets them.
    policy.insert("pay", "amount < 1000 {{ review = amount > 100 }}");
    let result = policy.evaluate("pay", &large);
    assert!(result.result());
    assert_eq!(result.get("review"), Some(&Value::Bool(true)));
    assert_eq!(
        policy.evaluate("pay", &small).get("review"),
        Some(&Value::Bool(false))
    );
    assert_eq!(policy.get_default("pay").map(|r| r.text().to_string()), Some("amount < 100".to_string()));

    let deleted = policy.delete_rule("pay");
    assert_eq!(deleted.map(|r| r.text().to_string()), Some("amount < 1000 {{ review = amount > 100 }}".to_string()));
    assert!(!policy.evaluate("pay", &large).result());
    assert!(policy.delete_rule("pay").is_none());

    let doc = policy.get_doc("pay");
    assert_eq!(doc.doc.as_deref(), Some("Who may pay without approval."));
    assert_eq!(
        doc.attr_docs.get("review").map(String::as_str),
        Some("Require a second approver.")
    );
    assert_eq!(policy.get_doc("other").doc, None);
    Ok(())
}

#[test]
fn insert_rule_checks_the_name() {
    let mut policy = Policy::new();
    assert_eq!(
        policy.insert_rule("a", Rule::new("b", "True")),
        Err(PolicyError::NameMismatch {
            key: "a".to_string(),
            name: "b".to_string()
        })
    );
    assert!(policy.is_empty());
    assert_eq!(policy.insert_rule("a", Rule::new("a", "True")), Ok(()));
    assert_eq!(policy.len(), 1);
    assert!(policy.evaluate("a", &BTreeMap::new()).result());
}

#[test]
fn symbol_provider_resolves_free_names() {
    struct Limits;
    impl SymbolProvider for Limits {
        fn resolve(&self, symbol: &str) -> Option<Value> {
            match symbol {
                "threshold" => Some(Value::Int(10)),
                _ => None,
            }
        }
    }

    let mut policy = Policy::new();
    policy.set_symbol_provider(Limits);
    policy.insert("over", "amount > threshold and unknown is None");
    assert!(policy
        .evaluate("over", &vars(&[("amount", Value::Int(11))]))
        .result());
    assert!(!policy
        .evaluate("over", &vars(&[("amount", Value::Int(9))]))
        .result());
    assert_eq!(policy.resolve("threshold"), Value::Int(10));
    // Builtins win over the provider.
    assert!(policy.resolve("len").is_callable());
}

#[test]
fn custom_builtins_replace_defaults() {
    let mut builtins = BTreeMap::new();
    builtins.insert("answer".to_string(), Value::Int(42));
    let mut policy = Policy::with_builtins(builtins);
    policy.insert("r", r#"answer == 42 and len is None and rule("r2")"#);
    policy.insert("r2", "True");
    assert!(policy.evaluate("r", &BTreeMap::new()).result());
}

#[test]
fn concurrent_evaluation() {
    let mut policy = Policy::new();
    policy.insert("even", "n % 2 == 0 {{ n = n }}");
    policy.insert("check", r#"rule("even") and n >= 0"#);
    let policy = Arc::new(policy);

    std::thread::scope(|s| {
        for t in 0..4i64 {
            let policy = policy.clone();
            s.spawn(move || {
                for i in 0..100i64 {
                    let n = t * 100 + i;
                    let result = policy.evaluate("check", &vars(&[("n", Value::Int(n))]));
                    assert_eq!(result.result(), n % 2 == 0);
                }
            });
        }
    });
}

#[test]
fn rules_from_json() -> Result<()> {
    let mut policy = Policy::new();
    policy.add_rules_from_json_str(
        r#"{
            "simple": "x > 1",
            "detailed": {"text": "x > 2", "attrs": {"level": 3}}
        }"#,
    )?;
    let v = vars(&[("x", Value::Int(3))]);
    assert!(policy.evaluate("simple", &v).result());
    let result = policy.evaluate("detailed", &v);
    assert!(result.result());
    assert_eq!(result.get("level"), Some(&Value::Int(3)));

    assert!(policy.add_rules_from_json_str("[1, 2]").is_err());
    assert!(policy.add_rules_from_json_str(r#"{"bad": 1}"#).is_err());
    Ok(())
}

#[test]
fn rules_from_yaml() -> Result<()> {
    let mut policy = Policy::new();
    policy.add_rules_from_yaml_str(
        r#"
edit: 'user == owner'
publish:
  text: 'rule("edit") and approved'
  attrs:
    audit: true
"#,
    )?;
    let v = vars(&[
        ("user", Value::from("a")),
        ("owner", Value::from("a")),
        ("approved", Value::Bool(true)),
    ]);
    let result = policy.evaluate("publish", &v);
    assert!(result.result());
    assert_eq!(result.get("audit"), Some(&Value::Bool(true)));
    Ok(())
}

#[test]
fn rules_from_file() -> Result<()> {
    let dir = std::env::temp_dir().join(format!("policies-test-{}", std::process::id()));
    std::fs::create_dir_all(&dir)?;
    let path = dir.join("rules.json");
    std::fs::write(&path, r#"{"ok": "True"}"#)?;

    let mut policy = Policy::new();
    policy.add_rules_from_file(&path)?;
    assert!(policy.evaluate("ok", &BTreeMap::new()).result());

    assert!(policy.add_rules_from_file(dir.join("rules.txt")).is_err());
    std::fs::remove_dir_all(&dir)?;
    Ok(())
}

#[test]
fn sample_config_lists_declared_rules() -> Result<()> {
    let mut policy = Policy::new();
    let mut attr_docs = BTreeMap::new();
    attr_docs.insert("review".to_string(), "Require a second approver.".to_string());
    policy.declare(
        "pay",
        r#"amount < 100 {{ review = "no" }}"#,
        Some("Who may pay."),
        BTreeMap::new(),
        attr_docs,
    );
    policy.declare("view", "True", None, BTreeMap::new(), BTreeMap::new());
    policy.insert("adhoc", "False");

    let config = policy.sample_config()?;
    assert_eq!(
        config,
        "# Who may pay.\n\
         # {{ review }}: Require a second approver.\n\
         \"pay\": \"amount < 100 {{ review = \\\"no\\\" }}\"\n\
         \n\
         \"view\": \"True\"\n"
    );

    // The sample loads back as a policy file.
    let mut loaded = Policy::new();
    loaded.add_rules_from_yaml_str(&config)?;
    assert_eq!(loaded.names(), vec!["pay".to_string(), "view".to_string()]);
    Ok(())
}

#[test]
fn result_serializes_to_json() -> Result<()> {
    let mut policy = Policy::new();
    policy.insert("r", r#"True {{ level = 2, name = "x" }}"#);
    let result = policy.evaluate("r", &BTreeMap::new());
    assert_eq!(
        serde_json::to_string(&result)?,
        r#"{"result":true,"attrs":{"level":2,"name":"x"}}"#
    );
    assert_eq!(result.to_string(), "allow level=2, name='x'");
    Ok(())
}

#[test]
fn tracing_diagnostics_by_default() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();

    let mut policy = Policy::new();
    policy.insert("broken", "a +");
    policy.insert("failing", "1 // x");
    policy.insert("caller", r#"rule("nowhere")"#);
    let v = vars(&[("x", Value::Int(0))]);
    for name in ["broken", "failing", "caller"] {
        assert!(!policy.evaluate(name, &v).result());
    }
}
