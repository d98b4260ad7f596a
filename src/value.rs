// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::rvm::vm::{self, EvalContext};

use core::cmp::Ordering;
use core::fmt;
use core::hash::{Hash, Hasher};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use anyhow::{anyhow, bail, Result};
use serde::de::{self, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};

/// Capability interface for values supplied by the embedding application.
///
/// Rules reach host objects through variables. Attribute access, item access,
/// membership tests and calls on such a value are delegated to the object.
/// Only `attribute` is mandatory; the other capabilities default to the
/// error a rule author would expect when the object does not support them.
pub trait HostObject: fmt::Debug + Send + Sync {
    /// Name used in error messages and by the `type` builtin.
    fn type_name(&self) -> &str {
        "object"
    }

    /// Look up a named attribute. `None` means the attribute does not exist.
    fn attribute(&self, name: &str) -> Option<Value>;

    fn item(&self, key: &Value) -> Result<Value> {
        let _ = key;
        bail!("'{}' object is not subscriptable", self.type_name())
    }

    fn contains(&self, value: &Value) -> Result<bool> {
        let _ = value;
        bail!("argument of type '{}' is not iterable", self.type_name())
    }

    fn call(&self, args: &[Value]) -> Result<Value> {
        let _ = args;
        bail!("'{}' object is not callable", self.type_name())
    }

    fn is_truthy(&self) -> bool {
        true
    }
}

pub type NativeFcn = dyn Fn(&[Value]) -> Result<Value> + Send + Sync;

/// A named function called positionally; its return value is pushed.
#[derive(Clone)]
pub struct NativeFunction {
    name: Arc<str>,
    fcn: Arc<NativeFcn>,
}

impl NativeFunction {
    pub fn new<F>(name: &str, fcn: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            fcn: Arc::new(fcn),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn call(&self, args: &[Value]) -> Result<Value> {
        (self.fcn)(args)
    }

    fn addr(&self) -> usize {
        Arc::as_ptr(&self.fcn) as *const () as usize
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<function {}>", self.name)
    }
}

pub type ContextFcn = dyn Fn(&mut EvalContext<'_>, &[Value]) -> vm::Result<()> + Send + Sync;

/// A function that receives the evaluation context as its first argument.
///
/// The VM does not push a return value for these; they manipulate the
/// context's operand stack (and authorization result) themselves.
#[derive(Clone)]
pub struct ContextFunction {
    name: Arc<str>,
    fcn: Arc<ContextFcn>,
}

impl ContextFunction {
    pub fn new<F>(name: &str, fcn: F) -> Self
    where
        F: Fn(&mut EvalContext<'_>, &[Value]) -> vm::Result<()> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            fcn: Arc::new(fcn),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn call(&self, ctx: &mut EvalContext<'_>, args: &[Value]) -> vm::Result<()> {
        (self.fcn)(ctx, args)
    }

    fn addr(&self) -> usize {
        Arc::as_ptr(&self.fcn) as *const () as usize
    }
}

impl fmt::Debug for ContextFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<context function {}>", self.name)
    }
}

// Sets need a total order over every variant, so ordering and equality are
// implemented by hand below. Ints and floats compare numerically.
#[derive(Debug, Clone)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(Arc<str>),
    List(Arc<Vec<Value>>),
    Set(Arc<BTreeSet<Value>>),
    Map(Arc<BTreeMap<Value, Value>>),

    // Values owned by the embedding application.
    Object(Arc<dyn HostObject>),
    Function(NativeFunction),
    ContextFunction(ContextFunction),
}

fn object_addr(obj: &Arc<dyn HostObject>) -> usize {
    Arc::as_ptr(obj) as *const () as usize
}

fn cmp_f64(a: f64, b: f64) -> Ordering {
    // NaN sorts after every other number and equal to itself.
    a.partial_cmp(&b)
        .unwrap_or_else(|| a.is_nan().cmp(&b.is_nan()))
}

// Exact comparison of an int with a float, without rounding the int.
fn cmp_int_f64(i: i64, f: f64) -> Ordering {
    // 2^63, the first float above every i64.
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    if f.is_nan() || f >= LIMIT {
        return Ordering::Less;
    }
    if f < -LIMIT {
        return Ordering::Greater;
    }
    let whole = f.trunc();
    match i.cmp(&(whole as i64)) {
        Ordering::Equal => cmp_f64(whole, f),
        ord => ord,
    }
}

fn hash_f64<H: Hasher>(f: f64, state: &mut H) {
    let bits = if f == 0.0 {
        0u64
    } else if f.is_nan() {
        f64::NAN.to_bits()
    } else {
        f.to_bits()
    };
    bits.hash(state)
}

impl Value {
    fn rank(&self) -> u8 {
        match self {
            Value::None => 0,
            Value::Bool(_) => 1,
            Value::Int(_) | Value::Float(_) => 2,
            Value::String(_) => 3,
            Value::List(_) => 4,
            Value::Set(_) => 5,
            Value::Map(_) => 6,
            Value::Object(_) => 7,
            Value::Function(_) => 8,
            Value::ContextFunction(_) => 9,
        }
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::None, Value::None) => Ordering::Equal,
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::Int(a), Value::Float(b)) => cmp_int_f64(*a, *b),
            (Value::Float(a), Value::Int(b)) => cmp_int_f64(*b, *a).reverse(),
            (Value::Float(a), Value::Float(b)) => cmp_f64(*a, *b),
            (Value::String(a), Value::String(b)) => a.cmp(b),
            (Value::List(a), Value::List(b)) => a.cmp(b),
            (Value::Set(a), Value::Set(b)) => a.cmp(b),
            (Value::Map(a), Value::Map(b)) => a.cmp(b),
            (Value::Object(a), Value::Object(b)) => object_addr(a).cmp(&object_addr(b)),
            (Value::Function(a), Value::Function(b)) => a.addr().cmp(&b.addr()),
            (Value::ContextFunction(a), Value::ContextFunction(b)) => a.addr().cmp(&b.addr()),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rank().hash(state);
        match self {
            Value::None => (),
            Value::Bool(b) => b.hash(state),
            Value::Int(i) => hash_f64(*i as f64, state),
            Value::Float(f) => hash_f64(*f, state),
            Value::String(s) => s.hash(state),
            Value::List(l) => l.hash(state),
            Value::Set(s) => s.hash(state),
            Value::Map(m) => m.hash(state),
            Value::Object(o) => object_addr(o).hash(state),
            Value::Function(f) => f.addr().hash(state),
            Value::ContextFunction(f) => f.addr().hash(state),
        }
    }
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        use serde::ser::Error;
        match self {
            Value::None => serializer.serialize_none(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Float(f) => serializer.serialize_f64(*f),
            Value::String(s) => serializer.serialize_str(s.as_ref()),
            Value::List(l) => l.serialize(serializer),

            // display set as an array
            Value::Set(s) => s.serialize(serializer),

            Value::Map(fields) => {
                let mut map = serializer.serialize_map(Some(fields.len()))?;
                for (k, v) in fields.iter() {
                    match k {
                        Value::String(_) => map.serialize_entry(k, v)?,
                        _ => {
                            let key_str = serde_json::to_string(k).map_err(Error::custom)?;
                            map.serialize_entry(&key_str, v)?
                        }
                    }
                }
                map.end()
            }

            // host values have no data representation
            Value::Object(_) | Value::Function(_) | Value::ContextFunction(_) => {
                serializer.serialize_str(&self.repr())
            }
        }
    }
}

struct ValueVisitor;

impl<'de> Visitor<'de> for ValueVisitor {
    type Value = Value;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a value")
    }

    fn visit_unit<E>(self) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(Value::None)
    }

    fn visit_none<E>(self) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(Value::None)
    }

    fn visit_some<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
    where
        D: Deserializer<'de>,
    {
        Value::deserialize(deserializer)
    }

    fn visit_bool<E>(self, v: bool) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(Value::Bool(v))
    }

    fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(Value::Int(v))
    }

    fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(Value::from(v))
    }

    fn visit_i128<E>(self, v: i128) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(match i64::try_from(v) {
            Ok(i) => Value::Int(i),
            Err(_) => Value::Float(v as f64),
        })
    }

    fn visit_u128<E>(self, v: u128) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(match i64::try_from(v) {
            Ok(i) => Value::Int(i),
            Err(_) => Value::Float(v as f64),
        })
    }

    fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(Value::Float(v))
    }

    fn visit_str<E>(self, s: &str) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(Value::from(s))
    }

    fn visit_string<E>(self, s: String) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(Value::from(s))
    }

    fn visit_seq<V>(self, mut visitor: V) -> Result<Self::Value, V::Error>
    where
        V: SeqAccess<'de>,
    {
        let mut list: Vec<Value> = vec![];
        while let Some(v) = visitor.next_element()? {
            list.push(v);
        }
        Ok(Value::from(list))
    }

    fn visit_map<V>(self, mut visitor: V) -> Result<Self::Value, V::Error>
    where
        V: MapAccess<'de>,
    {
        let mut map: BTreeMap<Value, Value> = BTreeMap::new();
        while let Some((key, value)) = visitor.next_entry()? {
            map.insert(key, value);
        }
        Ok(Value::from(map))
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D>(deserializer: D) -> Result<Value, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(ValueVisitor)
    }
}

fn float_repr(f: f64) -> String {
    if f.is_nan() {
        "nan".to_string()
    } else if f.is_infinite() {
        (if f > 0.0 { "inf" } else { "-inf" }).to_string()
    } else if f.fract() == 0.0 && f.abs() < 1e16 {
        format!("{f:.1}")
    } else {
        format!("{f}")
    }
}

fn string_repr(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for ch in s.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(ch),
        }
    }
    out.push('\'');
    out
}

fn join_repr<'a, I: Iterator<Item = &'a Value>>(items: I) -> String {
    items.map(|v| v.repr()).collect::<Vec<String>>().join(", ")
}

impl Value {
    /// Source-like rendering: strings are quoted, containers show their items.
    pub fn repr(&self) -> String {
        match self {
            Value::None => "None".to_string(),
            Value::Bool(true) => "True".to_string(),
            Value::Bool(false) => "False".to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => float_repr(*f),
            Value::String(s) => string_repr(s),
            Value::List(l) => format!("[{}]", join_repr(l.iter())),
            Value::Set(s) if s.is_empty() => "set()".to_string(),
            Value::Set(s) => format!("{{{}}}", join_repr(s.iter())),
            Value::Map(m) => format!(
                "{{{}}}",
                m.iter()
                    .map(|(k, v)| format!("{}: {}", k.repr(), v.repr()))
                    .collect::<Vec<String>>()
                    .join(", ")
            ),
            Value::Object(o) => format!("<{} object>", o.type_name()),
            Value::Function(f) => format!("<function {}>", f.name()),
            Value::ContextFunction(f) => format!("<function {}>", f.name()),
        }
    }

    pub fn type_name(&self) -> &str {
        match self {
            Value::None => "NoneType",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "str",
            Value::List(_) => "list",
            Value::Set(_) => "set",
            Value::Map(_) => "dict",
            Value::Object(o) => o.type_name(),
            Value::Function(_) | Value::ContextFunction(_) => "function",
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::None => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::String(s) => !s.is_empty(),
            Value::List(l) => !l.is_empty(),
            Value::Set(s) => !s.is_empty(),
            Value::Map(m) => !m.is_empty(),
            Value::Object(o) => o.is_truthy(),
            Value::Function(_) | Value::ContextFunction(_) => true,
        }
    }

    pub fn is_callable(&self) -> bool {
        matches!(
            self,
            Value::Function(_) | Value::ContextFunction(_) | Value::Object(_)
        )
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::String(s) => f.write_str(s),
            _ => f.write_str(&self.repr()),
        }
    }
}

impl Value {
    pub fn new_set() -> Value {
        Value::from(BTreeSet::<Value>::new())
    }

    pub fn new_list() -> Value {
        Value::from(vec![])
    }

    pub fn new_map() -> Value {
        Value::from(BTreeMap::<Value, Value>::new())
    }

    pub fn from_fn<F>(name: &str, fcn: F) -> Value
    where
        F: Fn(&[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        Value::Function(NativeFunction::new(name, fcn))
    }

    pub fn from_context_fn<F>(name: &str, fcn: F) -> Value
    where
        F: Fn(&mut EvalContext<'_>, &[Value]) -> vm::Result<()> + Send + Sync + 'static,
    {
        Value::ContextFunction(ContextFunction::new(name, fcn))
    }

    pub fn from_object<T: HostObject + 'static>(obj: T) -> Value {
        Value::Object(Arc::new(obj))
    }

    pub fn from_json_str(json: &str) -> Result<Value> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json_str(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    #[cfg(feature = "yaml")]
    pub fn from_yaml_str(yaml: &str) -> Result<Value> {
        Ok(serde_yaml::from_str(yaml)?)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(i64::from(n))
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Int(i64::from(n))
    }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        match i64::try_from(n) {
            Ok(i) => Value::Int(i),
            Err(_) => Value::Float(n as f64),
        }
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        match i64::try_from(n) {
            Ok(i) => Value::Int(i),
            Err(_) => Value::Float(n as f64),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.into())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s.into())
    }
}

impl From<Vec<Value>> for Value {
    fn from(l: Vec<Value>) -> Self {
        Value::List(Arc::new(l))
    }
}

impl From<BTreeSet<Value>> for Value {
    fn from(s: BTreeSet<Value>) -> Self {
        Value::Set(Arc::new(s))
    }
}

impl From<BTreeMap<Value, Value>> for Value {
    fn from(m: BTreeMap<Value, Value>) -> Self {
        Value::Map(Arc::new(m))
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(m: BTreeMap<String, Value>) -> Self {
        Value::Map(Arc::new(
            m.into_iter().map(|(k, v)| (Value::from(k), v)).collect(),
        ))
    }
}

impl From<NativeFunction> for Value {
    fn from(f: NativeFunction) -> Self {
        Value::Function(f)
    }
}

impl From<ContextFunction> for Value {
    fn from(f: ContextFunction) -> Self {
        Value::ContextFunction(f)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::None, Into::into)
    }
}

impl Value {
    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    pub fn as_bool(&self) -> Result<&bool> {
        match self {
            Value::Bool(b) => Ok(b),
            _ => Err(anyhow!("not a bool")),
        }
    }

    pub fn as_i64(&self) -> Result<i64> {
        match self {
            Value::Int(i) => Ok(*i),
            _ => Err(anyhow!("not an int")),
        }
    }

    /// Numeric value of an int or float.
    pub fn as_f64(&self) -> Result<f64> {
        match self {
            Value::Int(i) => Ok(*i as f64),
            Value::Float(f) => Ok(*f),
            _ => Err(anyhow!("not a number")),
        }
    }

    pub fn as_string(&self) -> Result<&Arc<str>> {
        match self {
            Value::String(s) => Ok(s),
            _ => Err(anyhow!("not a string")),
        }
    }

    pub fn as_list(&self) -> Result<&Vec<Value>> {
        match self {
            Value::List(l) => Ok(l),
            _ => Err(anyhow!("not a list")),
        }
    }

    pub fn as_set(&self) -> Result<&BTreeSet<Value>> {
        match self {
            Value::Set(s) => Ok(s),
            _ => Err(anyhow!("not a set")),
        }
    }

    pub fn as_map(&self) -> Result<&BTreeMap<Value, Value>> {
        match self {
            Value::Map(m) => Ok(m),
            _ => Err(anyhow!("not a map")),
        }
    }

    /// Items of a list, set or map (keys), or the characters of a string.
    pub fn iter_items(&self) -> Result<Vec<Value>> {
        Ok(match self {
            Value::List(l) => l.as_ref().clone(),
            Value::Set(s) => s.iter().cloned().collect(),
            Value::Map(m) => m.keys().cloned().collect(),
            Value::String(s) => s.chars().map(|c| Value::from(c.to_string())).collect(),
            _ => bail!("'{}' object is not iterable", self.type_name()),
        })
    }
}
