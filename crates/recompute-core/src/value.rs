//! Values and value sets
//!
//! A [`ValueSet`] is the keyed bag of attribute values one stateful unit is
//! rendered from. Values are cheap to clone: composite values are shared
//! behind `Arc`, which is also what gives them an identity.
//!
//! # Identity
//!
//! [`Value::identical`] is the reference-level check that runs before any
//! rule is consulted. It is deliberately not structural equality:
//!
//! | Category                    | Identity                       |
//! |-----------------------------|--------------------------------|
//! | `Absent`, `Null`            | always identical to themselves |
//! | `Bool`, `Int`               | equal value                    |
//! | `Float`                     | equal bit pattern              |
//! | `Str`                       | equal content                  |
//! | `List`, `Map`, `Opaque`     | same allocation                |
//!
//! Two maps with equal contents built separately are *not* identical.
//! Values of different variants are never identical (`Int(1)` is not
//! `Float(1.0)`).

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

/// Lookup result for keys that are not present
pub static ABSENT: Value = Value::Absent;

/// Shared handle to a caller-owned object
///
/// Only identity is observable; the engine never looks inside.
#[derive(Clone)]
pub struct Handle(Arc<dyn Any + Send + Sync>);

impl Handle {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Handle(Arc::new(value))
    }

    /// Borrow the wrapped object if it has type `T`
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }

    /// Whether both handles point to the same allocation
    #[inline]
    pub fn same(&self, other: &Handle) -> bool {
        Arc::as_ptr(&self.0) as *const () == Arc::as_ptr(&other.0) as *const ()
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({:p})", Arc::as_ptr(&self.0) as *const ())
    }
}

/// A single attribute value
#[derive(Clone, Debug)]
pub enum Value {
    /// No value (missing key)
    Absent,
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Arc<str>),
    List(Arc<Vec<Value>>),
    Map(Arc<ValueSet>),
    Opaque(Handle),
}

impl Value {
    pub fn str(s: impl AsRef<str>) -> Self {
        Value::Str(Arc::from(s.as_ref()))
    }

    pub fn list(items: impl IntoIterator<Item = Value>) -> Self {
        Value::List(Arc::new(items.into_iter().collect()))
    }

    pub fn map(set: ValueSet) -> Self {
        Value::Map(Arc::new(set))
    }

    pub fn opaque<T: Any + Send + Sync>(value: T) -> Self {
        Value::Opaque(Handle::new(value))
    }

    /// Reference-level equality (see module docs)
    #[inline]
    pub fn identical(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Absent, Value::Absent) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => Arc::ptr_eq(a, b),
            (Value::Map(a), Value::Map(b)) => Arc::ptr_eq(a, b),
            (Value::Opaque(a), Value::Opaque(b)) => a.same(b),
            _ => false,
        }
    }

    /// Structural equality, recursing through lists and maps
    ///
    /// Opaque handles still compare by identity.
    pub fn deep_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::List(a), Value::List(b)) => {
                Arc::ptr_eq(a, b)
                    || (a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.deep_eq(y)))
            }
            (Value::Map(a), Value::Map(b)) => Arc::ptr_eq(a, b) || a.deep_eq(b),
            _ => self.identical(other),
        }
    }

    /// Short name of the variant, used in diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Absent => "absent",
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Opaque(_) => "opaque",
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Value::Absent)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&ValueSet> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }

    /// Element count for strings (chars), lists and maps
    pub fn len(&self) -> Option<usize> {
        match self {
            Value::Str(s) => Some(s.chars().count()),
            Value::List(l) => Some(l.len()),
            Value::Map(m) => Some(m.len()),
            _ => None,
        }
    }

    /// Convert a JSON document: objects become maps, arrays become lists
    pub fn from_json(json: &serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::str(s),
            serde_json::Value::Array(items) => Value::list(items.iter().map(Value::from_json)),
            serde_json::Value::Object(fields) => Value::map(ValueSet::from_json_object(fields)),
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Absent
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        self.deep_eq(other)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::str(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(Arc::from(s))
    }
}

impl From<ValueSet> for Value {
    fn from(set: ValueSet) -> Self {
        Value::map(set)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(Arc::new(items))
    }
}

/// Insertion-ordered mapping from key to value
#[derive(Clone, Debug, Default)]
pub struct ValueSet {
    entries: IndexMap<String, Value>,
}

impl ValueSet {
    pub fn new() -> Self {
        ValueSet::default()
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert or replace a value, keeping the original position of the key
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.entries.insert(key.into(), value.into())
    }

    /// Remove a key, preserving the order of the remaining entries
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.entries.shift_remove(key)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Value at `key`, or [`Value::Absent`] when missing
    #[inline]
    pub fn get_or_absent(&self, key: &str) -> &Value {
        self.entries.get(key).unwrap_or(&ABSENT)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of own keys
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Structural equality of two sets, independent of key order
    pub fn deep_eq(&self, other: &ValueSet) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|(k, v)| other.get(k).is_some_and(|o| v.deep_eq(o)))
    }

    pub fn from_json_object(fields: &serde_json::Map<String, serde_json::Value>) -> Self {
        fields
            .iter()
            .map(|(k, v)| (k.clone(), Value::from_json(v)))
            .collect()
    }
}

impl PartialEq for ValueSet {
    fn eq(&self, other: &ValueSet) -> bool {
        self.deep_eq(other)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for ValueSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        ValueSet {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_primitive_identity() {
        assert!(Value::from(true).identical(&Value::from(true)));
        assert!(!Value::from(true).identical(&Value::from(false)));
        assert!(Value::from(7).identical(&Value::from(7i64)));
        assert!(Value::str("a").identical(&Value::from("a".to_string())));
        assert!(Value::Absent.identical(&Value::Absent));
        assert!(!Value::Absent.identical(&Value::Null));
        assert!(!Value::from(1).identical(&Value::from(1.0)));
    }

    #[test]
    fn test_float_identity_is_bitwise() {
        assert!(Value::Float(f64::NAN).identical(&Value::Float(f64::NAN)));
        assert!(!Value::Float(0.0).identical(&Value::Float(-0.0)));
        // structural equality follows IEEE instead
        assert!(Value::Float(0.0).deep_eq(&Value::Float(-0.0)));
        assert!(!Value::Float(f64::NAN).deep_eq(&Value::Float(f64::NAN)));
    }

    #[test]
    fn test_composite_identity_is_pointer() {
        let a = Value::map(ValueSet::new().with("x", 1));
        let b = Value::map(ValueSet::new().with("x", 1));
        assert!(a.identical(&a.clone()));
        assert!(!a.identical(&b));
        assert!(a.deep_eq(&b));

        let l = Value::list(vec![Value::from(1), Value::from(2)]);
        assert!(l.identical(&l.clone()));
        assert!(!l.identical(&Value::list(vec![Value::from(1), Value::from(2)])));

        let h = Value::opaque(5u32);
        assert!(h.identical(&h.clone()));
        assert!(!h.identical(&Value::opaque(5u32)));
        assert!(!h.deep_eq(&Value::opaque(5u32)));
    }

    #[test]
    fn test_value_set_order_and_lookup() {
        let mut set = ValueSet::new().with("b", 1).with("a", 2).with("c", 3);
        assert_eq!(set.keys().collect::<Vec<_>>(), vec!["b", "a", "c"]);

        set.insert("b", 10);
        set.remove("a");
        assert_eq!(set.keys().collect::<Vec<_>>(), vec!["b", "c"]);
        assert_eq!(set.get("b").and_then(Value::as_int), Some(10));
        assert!(set.get_or_absent("a").is_absent());
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_deep_eq_ignores_key_order() {
        let a = ValueSet::new().with("x", 1).with("y", "two");
        let b = ValueSet::new().with("y", "two").with("x", 1);
        assert_eq!(a, b);
        assert_ne!(a, ValueSet::new().with("x", 1));
    }

    #[test]
    fn test_from_json() {
        let json = serde_json::json!({
            "flag": true,
            "count": 3,
            "ratio": 0.5,
            "tags": ["a", "b"],
            "nested": { "inner": null }
        });
        let value = Value::from_json(&json);
        let set = value.as_map().unwrap();

        assert_eq!(set.get("flag").and_then(Value::as_bool), Some(true));
        assert_eq!(set.get("count").and_then(Value::as_int), Some(3));
        assert!(matches!(set.get("ratio"), Some(Value::Float(r)) if *r == 0.5));
        assert_eq!(set.get("tags").and_then(Value::len), Some(2));
        let nested = set.get("nested").and_then(Value::as_map).unwrap();
        assert!(matches!(nested.get("inner"), Some(Value::Null)));
    }

    #[test]
    fn test_handle_downcast() {
        let value = Value::opaque(String::from("node"));
        match &value {
            Value::Opaque(h) => {
                assert_eq!(h.downcast_ref::<String>().map(String::as_str), Some("node"));
                assert!(h.downcast_ref::<u8>().is_none());
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    fn leaf() -> impl Strategy<Value = Value> {
        prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(Value::Int),
            any::<f64>().prop_map(Value::Float),
            "[a-c]{0,3}".prop_map(Value::from),
        ]
    }

    fn value() -> impl Strategy<Value = Value> {
        leaf().prop_recursive(3, 24, 4, |inner| {
            prop_oneof![
                proptest::collection::vec(inner.clone(), 0..4).prop_map(Value::from),
                proptest::collection::vec(("[a-d]", inner), 0..4)
                    .prop_map(|pairs| Value::map(pairs.into_iter().collect())),
            ]
        })
    }

    proptest! {
        #[test]
        fn prop_identity_is_reflexive_for_clones(v in value()) {
            prop_assert!(v.identical(&v.clone()));
        }

        #[test]
        fn prop_identity_implies_deep_eq_without_floats(a in value(), b in value()) {
            if a.identical(&b) && !matches!(a, Value::Float(_)) {
                prop_assert!(a.deep_eq(&b));
            }
        }

        #[test]
        fn prop_deep_eq_is_symmetric(a in value(), b in value()) {
            prop_assert_eq!(a.deep_eq(&b), b.deep_eq(&a));
        }
    }
}
