//! Comparison rules
//!
//! A [`RuleTree`] is sparse: only keys that need more than identity
//! equality get an entry. Each entry is a [`Rule`]:
//! - [`Rule::Predicate`] decides equality for the value at that key
//! - [`Rule::Nested`] recurses into a map-valued key with its own tree
//! - [`Rule::Invalid`] is an entry of an unusable shape, kept so that it
//!   fails loudly when reached
//!
//! A key without an entry falls back to [`Value::identical`].

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::{GateError, GateResult, Value, ValueSet};

/// Enclosing value sets of the key a predicate is judging
#[derive(Clone, Copy, Debug)]
pub struct Scope<'a> {
    pub old: &'a ValueSet,
    pub new: &'a ValueSet,
}

type PredicateFn = dyn Fn(&Value, &Value, &Scope<'_>) -> bool + Send + Sync;

/// Caller-supplied equality predicate
///
/// Returning `true` means "treat as equal", which vetoes a change that
/// identity equality alone would have reported.
#[derive(Clone)]
pub struct Predicate {
    name: Option<Arc<str>>,
    f: Arc<PredicateFn>,
}

impl Predicate {
    /// Predicate over the old and new value of one key
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Value, &Value) -> bool + Send + Sync + 'static,
    {
        Predicate {
            name: None,
            f: Arc::new(move |old: &Value, new: &Value, _: &Scope<'_>| f(old, new)),
        }
    }

    /// Predicate that also sees the enclosing old and new value sets
    pub fn contextual<F>(f: F) -> Self
    where
        F: Fn(&Value, &Value, &ValueSet, &ValueSet) -> bool + Send + Sync + 'static,
    {
        Predicate {
            name: None,
            f: Arc::new(move |old: &Value, new: &Value, scope: &Scope<'_>| {
                f(old, new, scope.old, scope.new)
            }),
        }
    }

    pub fn named(mut self, name: impl AsRef<str>) -> Self {
        self.name = Some(Arc::from(name.as_ref()));
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Evaluate the predicate
    #[inline]
    pub fn test(&self, old: &Value, new: &Value, scope: &Scope<'_>) -> bool {
        (self.f)(old, new, scope)
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "Predicate({})", name),
            None => f.write_str("Predicate(<fn>)"),
        }
    }
}

/// One entry in a rule tree
#[derive(Clone, Debug)]
pub enum Rule {
    Predicate(Predicate),
    Nested(RuleTree),
    /// Unusable entry; the string describes what was found
    Invalid(String),
}

impl Rule {
    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(&Value, &Value) -> bool + Send + Sync + 'static,
    {
        Rule::Predicate(Predicate::new(f))
    }

    pub fn contextual<F>(f: F) -> Self
    where
        F: Fn(&Value, &Value, &ValueSet, &ValueSet) -> bool + Send + Sync + 'static,
    {
        Rule::Predicate(Predicate::contextual(f))
    }

    pub fn invalid(shape: impl Into<String>) -> Self {
        Rule::Invalid(shape.into())
    }
}

impl From<Predicate> for Rule {
    fn from(p: Predicate) -> Self {
        Rule::Predicate(p)
    }
}

impl From<RuleTree> for Rule {
    fn from(tree: RuleTree) -> Self {
        Rule::Nested(tree)
    }
}

/// Sparse mapping from key to rule
#[derive(Clone, Debug, Default)]
pub struct RuleTree {
    rules: IndexMap<String, Rule>,
}

impl RuleTree {
    pub fn new() -> Self {
        RuleTree::default()
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, rule: impl Into<Rule>) -> Self {
        self.insert(key, rule);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, rule: impl Into<Rule>) -> Option<Rule> {
        self.rules.insert(key.into(), rule.into())
    }

    pub fn get(&self, key: &str) -> Option<&Rule> {
        self.rules.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.rules.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Rule)> {
        self.rules.iter().map(|(k, r)| (k.as_str(), r))
    }

    /// Report the first invalid entry, depth first
    ///
    /// Comparison only trips over an invalid entry when values differ at
    /// that key; this finds it up front.
    pub fn validate(&self) -> GateResult<()> {
        self.validate_at("")
    }

    fn validate_at(&self, prefix: &str) -> GateResult<()> {
        for (key, rule) in &self.rules {
            let path = join_path(prefix, key);
            match rule {
                Rule::Predicate(_) => {}
                Rule::Nested(tree) => tree.validate_at(&path)?,
                Rule::Invalid(shape) => {
                    return Err(GateError::Configuration {
                        path,
                        shape: shape.clone(),
                    })
                }
            }
        }
        Ok(())
    }
}

/// Dotted path of `key` below `prefix`
pub fn join_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", prefix, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_predicate_receives_scope() {
        let old_set = ValueSet::new().with("unit", "px");
        let new_set = ValueSet::new().with("unit", "em");
        let p = Predicate::contextual(|_, _, old, new| {
            old.get_or_absent("unit").identical(new.get_or_absent("unit"))
        });
        let scope = Scope {
            old: &old_set,
            new: &new_set,
        };
        assert!(!p.test(&Value::from(1), &Value::from(1), &scope));
    }

    #[test]
    fn test_predicate_debug_uses_name() {
        let p = Predicate::new(|_, _| true).named("always_equal");
        assert_eq!(format!("{:?}", p), "Predicate(always_equal)");
        assert_eq!(format!("{:?}", Predicate::new(|_, _| true)), "Predicate(<fn>)");
    }

    #[test]
    fn test_validate_reports_nested_path() {
        let tree = RuleTree::new()
            .with("a", Rule::predicate(|_, _| true))
            .with(
                "obj",
                RuleTree::new().with("inner", RuleTree::new().with("x", Rule::invalid("number 3"))),
            );

        let err = tree.validate().unwrap_err();
        assert_eq!(
            err,
            GateError::Configuration {
                path: "obj.inner.x".into(),
                shape: "number 3".into(),
            }
        );
    }

    #[test]
    fn test_validate_accepts_well_formed_tree() {
        let tree = RuleTree::new()
            .with("a", Rule::predicate(|_, _| false))
            .with("b", RuleTree::new());
        assert!(tree.validate().is_ok());
        assert_eq!(tree.len(), 2);
        assert!(tree.contains_key("b"));
    }

    #[test]
    fn test_join_path() {
        assert_eq!(join_path("", "a"), "a");
        assert_eq!(join_path("a.b", "c"), "a.b.c");
    }
}
