// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg(test)]

use std::collections::{BTreeMap, BTreeSet};

use anyhow::Result;
use policies::*;

#[test]
fn non_string_key() -> Result<()> {
    let mut map = BTreeMap::new();
    map.insert(Value::None, Value::None);
    map.insert(Value::Bool(false), Value::Int(1));
    map.insert(Value::from(2.5), Value::from("x"));
    map.insert(Value::from("key"), Value::from(vec![Value::Int(1)]));

    let json = serde_json::to_string(&Value::from(map))?;
    assert_eq!(json, r#"{"null":null,"false":1,"2.5":"x","key":[1]}"#);
    Ok(())
}

#[test]
fn sets_serialize_as_sorted_arrays() -> Result<()> {
    let set: BTreeSet<Value> = [Value::Int(3), Value::from("a"), Value::Int(1)]
        .into_iter()
        .collect();
    assert_eq!(serde_json::to_string(&Value::from(set))?, r#"[1,3,"a"]"#);
    Ok(())
}

#[test]
fn functions_serialize_as_repr() -> Result<()> {
    let f = Value::from_fn("noop", |_| Ok(Value::None));
    assert_eq!(serde_json::to_string(&f)?, r#""<function noop>""#);
    Ok(())
}

#[test]
fn yaml_values() -> Result<()> {
    let v = Value::from_yaml_str("a: [1, 2.0, yes]\nb: {c: ~}\n")?;
    let map = v.as_map()?;
    let a = map[&Value::from("a")].as_list()?;
    assert_eq!(a[0], Value::Int(1));
    assert_eq!(a[1].type_name(), "float");
    assert_eq!(a[2], Value::from("yes"));
    assert!(map[&Value::from("b")].as_map()?[&Value::from("c")].is_none());
    Ok(())
}

#[test]
fn total_order_across_kinds() {
    let mut items = vec![
        Value::from("b"),
        Value::Int(2),
        Value::None,
        Value::Float(1.5),
        Value::Bool(true),
        Value::new_list(),
        Value::from("a"),
    ];
    items.sort();
    let reprs: Vec<String> = items.iter().map(Value::repr).collect();
    assert_eq!(reprs, ["None", "True", "1.5", "2", "'a'", "'b'", "[]"]);
}

#[test]
fn ints_and_floats_compare_exactly() {
    let big = 1i64 << 53;
    let float = Value::Float(big as f64);
    assert_eq!(Value::Int(big), float);
    assert!(Value::Int(big + 1) > float);
    assert!(Value::Int(i64::MAX) < Value::Float(9.3e18));
    assert!(Value::Int(-3) > Value::Float(-3.5));
    assert!(Value::Int(0) < Value::Float(f64::NAN));

    let set: BTreeSet<Value> = [Value::Int(big), float, Value::Int(big + 1)]
        .into_iter()
        .collect();
    assert_eq!(set.len(), 2);
}

#[test]
fn truthiness() {
    assert!(!Value::None.is_truthy());
    assert!(!Value::Float(0.0).is_truthy());
    assert!(!Value::new_set().is_truthy());
    assert!(!Value::from("").is_truthy());
    assert!(Value::from(" ").is_truthy());
    assert!(Value::from_fn("f", |_| Ok(Value::None)).is_truthy());
}

#[test]
fn display_and_repr() {
    let list = Value::from(vec![Value::from("a"), Value::Float(1.0), Value::None]);
    assert_eq!(list.repr(), "['a', 1.0, None]");
    assert_eq!(list.to_string(), "['a', 1.0, None]");
    assert_eq!(Value::from("a").to_string(), "a");
    assert_eq!(Value::Float(f64::INFINITY).repr(), "inf");
    assert_eq!(Value::Float(1e20).repr(), "100000000000000000000");

    let mut map = BTreeMap::new();
    map.insert("k".to_string(), Value::Int(1));
    assert_eq!(Value::from(map).repr(), "{'k': 1}");
}
