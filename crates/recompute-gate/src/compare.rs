//! Rule-driven equality comparison
//!
//! [`compare`] answers "are these two values equal enough?" for one key:
//! 1. Identical values are equal; no rule is consulted
//! 2. No rule: not identical means not equal
//! 3. Predicate rule: its answer is the verdict
//! 4. Nested rule: both values must be maps with the same number of keys,
//!    then every key of the *old* map is compared with its own sub-rule.
//!    Two lists of equal length are compared the same way, keyed by index
//! 5. Invalid rule: configuration error
//!
//! Keys that only exist in the new map are never visited by step 4. With
//! equal key counts that can only happen when some old key is missing from
//! the new map, and that key is then compared against [`Value::Absent`].

use std::borrow::Cow;

use recompute_core::{GateError, GateResult, Rule, RuleTree, Scope, Value, ValueSet};
use tracing::{debug, trace, warn};

/// Compare two values under an optional rule
///
/// `scope` holds the value sets that contain `old` and `new`; contextual
/// predicates receive it.
pub fn compare(
    old: &Value,
    new: &Value,
    rule: Option<&Rule>,
    scope: &Scope<'_>,
) -> GateResult<bool> {
    let mut path = Vec::new();
    compare_at(old, new, rule, scope, &mut path)
}

/// Compare the values of one top-level key; errors report paths from `key`
pub(crate) fn compare_key<'a>(
    key: &'a str,
    old: &'a Value,
    new: &'a Value,
    rule: &'a Rule,
    scope: &Scope<'_>,
) -> GateResult<bool> {
    let mut path = vec![Cow::Borrowed(key)];
    compare_at(old, new, Some(rule), scope, &mut path)
}

fn compare_at<'a>(
    old: &'a Value,
    new: &'a Value,
    rule: Option<&'a Rule>,
    scope: &Scope<'_>,
    path: &mut Vec<Cow<'a, str>>,
) -> GateResult<bool> {
    if old.identical(new) {
        return Ok(true);
    }

    match rule {
        None => Ok(false),
        Some(Rule::Predicate(predicate)) => {
            let equal = predicate.test(old, new, scope);
            trace!(
                path = %path.join("."),
                predicate = ?predicate,
                equal,
                "predicate consulted"
            );
            Ok(equal)
        }
        Some(Rule::Nested(tree)) => {
            if let (Some(old_set), Some(new_set)) = (old.as_map(), new.as_map()) {
                return compare_maps(old_set, new_set, tree, path);
            }
            if let (Some(old_items), Some(new_items)) = (old.as_list(), new.as_list()) {
                return compare_lists(old_items, new_items, tree, scope, path);
            }
            debug!(
                path = %path.join("."),
                old = old.kind(),
                new = new.kind(),
                "nested rule applied to mismatched values"
            );
            Ok(false)
        }
        Some(Rule::Invalid(shape)) => {
            let path = path.join(".");
            warn!(path = %path, shape = %shape, "invalid rule reached");
            Err(GateError::Configuration {
                path,
                shape: shape.clone(),
            })
        }
    }
}

fn compare_maps<'a>(
    old_set: &'a ValueSet,
    new_set: &'a ValueSet,
    tree: &'a RuleTree,
    path: &mut Vec<Cow<'a, str>>,
) -> GateResult<bool> {
    if old_set.len() != new_set.len() {
        trace!(
            path = %path.join("."),
            old_keys = old_set.len(),
            new_keys = new_set.len(),
            "key count mismatch"
        );
        return Ok(false);
    }

    let inner = Scope {
        old: old_set,
        new: new_set,
    };
    for (key, old_value) in old_set.iter() {
        path.push(Cow::Borrowed(key));
        let new_value = new_set.get_or_absent(key);
        let equal = compare_at(old_value, new_value, tree.get(key), &inner, path)?;
        path.pop();
        if !equal {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Lists are keyed by index: sub-rule `"0"` guards the first element.
/// Elements see the scope of the enclosing map.
fn compare_lists<'a>(
    old_items: &'a [Value],
    new_items: &'a [Value],
    tree: &'a RuleTree,
    scope: &Scope<'_>,
    path: &mut Vec<Cow<'a, str>>,
) -> GateResult<bool> {
    if old_items.len() != new_items.len() {
        trace!(
            path = %path.join("."),
            old_len = old_items.len(),
            new_len = new_items.len(),
            "length mismatch"
        );
        return Ok(false);
    }

    for (index, (old_item, new_item)) in old_items.iter().zip(new_items).enumerate() {
        let key = index.to_string();
        let rule = tree.get(&key);
        path.push(Cow::Owned(key));
        let equal = compare_at(old_item, new_item, rule, scope, path)?;
        path.pop();
        if !equal {
            return Ok(false);
        }
    }
    Ok(true)
}
