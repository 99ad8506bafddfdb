//! Declarative rule documents
//!
//! Rule trees can be written as JSON. A string names a predicate from a
//! [`PredicateRegistry`], an object is a nested rule tree, and anything else
//! is kept as [`Rule::Invalid`] so the gate fails loudly when it is reached.
//!
//! ```json
//! {
//!   "ignored_keys": ["inner_ref"],
//!   "rules": {
//!     "items": "same_length",
//!     "style": { "color": "deep_equal" }
//!   }
//! }
//! ```

use std::collections::HashMap;

use recompute_core::{join_path, GateError, GateResult, Predicate, Rule, RuleTree, Value, ValueSet};
use serde::Deserialize;

use crate::{GateConfig, UpdateGate};

/// Named predicates available to rule documents
#[derive(Clone, Debug)]
pub struct PredicateRegistry {
    predicates: HashMap<String, Predicate>,
}

impl PredicateRegistry {
    /// Registry without any predicates
    pub fn empty() -> Self {
        PredicateRegistry {
            predicates: HashMap::new(),
        }
    }

    /// Registry with the built-in predicates:
    /// - `always_equal`: never a change
    /// - `never_equal`: any non-identical value is a change
    /// - `deep_equal`: structural equality
    /// - `same_length`: equal element count for strings, lists and maps
    pub fn builtin() -> Self {
        let mut registry = PredicateRegistry::empty();
        registry.register("always_equal", Predicate::new(|_, _| true));
        registry.register("never_equal", Predicate::new(|_, _| false));
        registry.register("deep_equal", Predicate::new(|old, new| old.deep_eq(new)));
        registry.register(
            "same_length",
            Predicate::new(|old, new| match (old.len(), new.len()) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            }),
        );
        registry
    }

    /// Register a predicate, replacing any previous one with that name
    pub fn register(&mut self, name: impl Into<String>, predicate: Predicate) {
        let name = name.into();
        let predicate = predicate.named(&name);
        self.predicates.insert(name, predicate);
    }

    pub fn get(&self, name: &str) -> Option<&Predicate> {
        self.predicates.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.predicates.contains_key(name)
    }
}

impl Default for PredicateRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct GateDocument {
    #[serde(default)]
    ignored_keys: Vec<String>,
    #[serde(default = "default_log_decisions")]
    log_decisions: bool,
    #[serde(default)]
    rules: serde_json::Map<String, serde_json::Value>,
}

fn default_log_decisions() -> bool {
    GateConfig::default().log_decisions
}

/// Build a rule tree from a JSON object
pub fn rules_from_json(json: &serde_json::Value, registry: &PredicateRegistry) -> GateResult<RuleTree> {
    match json {
        serde_json::Value::Object(fields) => tree_from_object(fields, "", registry),
        other => Err(GateError::InvalidDocument(format!(
            "expected an object of rules, found {}",
            describe(other)
        ))),
    }
}

/// Parse a rule tree from JSON text
pub fn rules_from_str(text: &str, registry: &PredicateRegistry) -> GateResult<RuleTree> {
    let json: serde_json::Value =
        serde_json::from_str(text).map_err(|e| GateError::InvalidDocument(e.to_string()))?;
    rules_from_json(&json, registry)
}

/// Parse a complete gate document: rules plus gate configuration
pub fn gate_from_str(text: &str, registry: &PredicateRegistry) -> GateResult<UpdateGate> {
    let doc: GateDocument =
        serde_json::from_str(text).map_err(|e| GateError::InvalidDocument(e.to_string()))?;

    let rules = tree_from_object(&doc.rules, "", registry)?;
    let config = doc
        .ignored_keys
        .into_iter()
        .fold(GateConfig::new(), |config, key| config.with_ignored_key(key))
        .with_log_decisions(doc.log_decisions);

    Ok(UpdateGate::with_config(rules, config))
}

fn tree_from_object(
    fields: &serde_json::Map<String, serde_json::Value>,
    prefix: &str,
    registry: &PredicateRegistry,
) -> GateResult<RuleTree> {
    let mut tree = RuleTree::new();
    for (key, entry) in fields {
        let path = join_path(prefix, key);
        let rule = match entry {
            serde_json::Value::String(name) => match registry.get(name) {
                Some(predicate) => Rule::Predicate(predicate.clone()),
                None => {
                    return Err(GateError::UnknownPredicate {
                        path,
                        name: name.clone(),
                    })
                }
            },
            serde_json::Value::Object(nested) => Rule::Nested(tree_from_object(nested, &path, registry)?),
            other => Rule::invalid(describe(other)),
        };
        tree.insert(key.clone(), rule);
    }
    Ok(tree)
}

fn describe(json: &serde_json::Value) -> String {
    match json {
        serde_json::Value::Null => "null".to_string(),
        serde_json::Value::Bool(b) => format!("bool {}", b),
        serde_json::Value::Number(n) => format!("number {}", n),
        serde_json::Value::String(s) => format!("string {:?}", s),
        serde_json::Value::Array(items) => format!("array of {}", items.len()),
        serde_json::Value::Object(fields) => format!("object of {}", fields.len()),
    }
}

/// Convert a JSON object into a value set, e.g. for fixtures
pub fn values_from_str(text: &str) -> GateResult<ValueSet> {
    let json: serde_json::Value =
        serde_json::from_str(text).map_err(|e| GateError::InvalidDocument(e.to_string()))?;
    match Value::from_json(&json) {
        Value::Map(set) => Ok((*set).clone()),
        other => Err(GateError::InvalidDocument(format!(
            "expected an object of values, found {}",
            other.kind()
        ))),
    }
}
