//! Reference model of the recompute decision
//!
//! A second, independent rendition of the decision used as an oracle by
//! the fuzzer. It works on [`FuzzRule`] descriptions instead of compiled
//! predicates and follows the decision literally: collect the keys whose
//! identity changed, then drop the ones a rule declares equal.

use recompute_core::{AuxState, Value, ValueSet};

/// Rule shapes the fuzzer generates
#[derive(Clone, Debug)]
pub enum FuzzRule {
    AlwaysEqual,
    NeverEqual,
    DeepEqual,
    Nested(Vec<(String, FuzzRule)>),
    Invalid,
}

impl FuzzRule {
    fn lookup<'a>(entries: &'a [(String, FuzzRule)], key: &str) -> Option<&'a FuzzRule> {
        entries.iter().find(|(k, _)| k == key).map(|(_, r)| r)
    }
}

/// The model's outcome: a verdict, or `None` for a configuration error
pub type ModelVerdict = Option<bool>;

/// Expected verdict for one decision
pub fn expected_verdict(
    previous: &ValueSet,
    previous_aux: &AuxState,
    candidate: &ValueSet,
    candidate_aux: &AuxState,
    rules: &[(String, FuzzRule)],
) -> ModelVerdict {
    let identity_changed: Vec<&str> = candidate
        .keys()
        .filter(|k| !previous.get_or_absent(k).identical(candidate.get_or_absent(k)))
        .collect();

    let mut still_changed = 0;
    let mut failed = false;
    for key in identity_changed {
        match FuzzRule::lookup(rules, key) {
            None => still_changed += 1,
            Some(rule) => match equal_under(previous.get_or_absent(key), candidate.get_or_absent(key), Some(rule)) {
                Some(true) => {}
                Some(false) => still_changed += 1,
                None => failed = true,
            },
        }
    }

    if failed {
        return None;
    }
    Some(still_changed > 0 || !previous_aux.identical(candidate_aux))
}

/// Model comparison of two values under a rule; `None` is an error
pub fn equal_under(old: &Value, new: &Value, rule: Option<&FuzzRule>) -> Option<bool> {
    if old.identical(new) {
        return Some(true);
    }
    match rule {
        None => Some(false),
        Some(FuzzRule::AlwaysEqual) => Some(true),
        Some(FuzzRule::NeverEqual) => Some(false),
        Some(FuzzRule::DeepEqual) => Some(old.deep_eq(new)),
        Some(FuzzRule::Invalid) => None,
        Some(FuzzRule::Nested(entries)) => {
            if let (Some(a), Some(b)) = (old.as_map(), new.as_map()) {
                if a.len() != b.len() {
                    return Some(false);
                }
                for (key, value) in a.iter() {
                    if !equal_under(value, b.get_or_absent(key), FuzzRule::lookup(entries, key))? {
                        return Some(false);
                    }
                }
                return Some(true);
            }
            if let (Some(a), Some(b)) = (old.as_list(), new.as_list()) {
                if a.len() != b.len() {
                    return Some(false);
                }
                for (index, (x, y)) in a.iter().zip(b).enumerate() {
                    if !equal_under(x, y, FuzzRule::lookup(entries, &index.to_string()))? {
                        return Some(false);
                    }
                }
                return Some(true);
            }
            Some(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_identity_only() {
        let a = ValueSet::new().with("x", 1);
        let b = ValueSet::new().with("x", 2);
        assert_eq!(expected_verdict(&a, &Value::Absent, &a, &Value::Absent, &[]), Some(false));
        assert_eq!(expected_verdict(&a, &Value::Absent, &b, &Value::Absent, &[]), Some(true));
        assert_eq!(expected_verdict(&a, &Value::from(1), &a, &Value::from(2), &[]), Some(true));
    }

    #[test]
    fn test_model_invalid_rule() {
        let a = ValueSet::new().with("x", 1);
        let b = ValueSet::new().with("x", 2);
        let rules = vec![("x".to_string(), FuzzRule::Invalid)];
        assert_eq!(expected_verdict(&a, &Value::Absent, &b, &Value::Absent, &rules), None);
        // identical values never reach the rule
        assert_eq!(expected_verdict(&a, &Value::Absent, &a, &Value::Absent, &rules), Some(false));
    }

    #[test]
    fn test_model_nested_lists() {
        let old = Value::list(vec![Value::from(1), Value::from(2)]);
        let new = Value::list(vec![Value::from(1), Value::from(3)]);
        let by_index = FuzzRule::Nested(vec![("1".to_string(), FuzzRule::AlwaysEqual)]);

        assert_eq!(equal_under(&old, &new, Some(&FuzzRule::Nested(Vec::new()))), Some(false));
        assert_eq!(equal_under(&old, &new, Some(&by_index)), Some(true));
        assert_eq!(equal_under(&old, &Value::list(Vec::new()), Some(&by_index)), Some(false));
    }
}
