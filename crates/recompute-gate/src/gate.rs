//! Update gate - the recompute / skip decision
//!
//! A key counts as changed when its candidate value is not identical to the
//! previous one and, if the key has a rule, the rule does not declare the
//! two values equal. Only the candidate's keys are inspected: a key that
//! disappeared is not by itself a change.
//!
//! The gate holds no previous state. Calls for one logical entity must be
//! serialized by the caller, see [`crate::TrackedState`].

use recompute_core::{AuxState, GateResult, RuleTree, Scope, ValueSet};
use tracing::{debug, trace};

use crate::compare::compare_key;
use crate::GateConfig;

/// Decides whether a candidate value set requires recomputing output
#[derive(Clone, Debug, Default)]
pub struct UpdateGate {
    rules: RuleTree,
    config: GateConfig,
}

impl UpdateGate {
    pub fn new(rules: RuleTree) -> Self {
        Self::with_config(rules, GateConfig::default())
    }

    pub fn with_config(rules: RuleTree, config: GateConfig) -> Self {
        UpdateGate { rules, config }
    }

    /// Build a gate, rejecting rule trees with invalid entries up front
    pub fn try_new(rules: RuleTree, config: GateConfig) -> GateResult<Self> {
        rules.validate()?;
        Ok(Self::with_config(rules, config))
    }

    pub fn rules(&self) -> &RuleTree {
        &self.rules
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// `true` when output must be recomputed for the candidate
    ///
    /// Every changed key with a rule is evaluated, so a configuration error
    /// anywhere in the candidate surfaces regardless of key order.
    pub fn should_recompute(
        &self,
        previous: &ValueSet,
        previous_aux: &AuxState,
        candidate: &ValueSet,
        candidate_aux: &AuxState,
    ) -> GateResult<bool> {
        let changed = self.changed_key_count(previous, candidate)?;
        let aux_changed = !previous_aux.identical(candidate_aux);
        let recompute = changed > 0 || aux_changed;

        if self.config.log_decisions {
            debug!(changed, aux_changed, recompute, "update decision");
        }
        Ok(recompute)
    }

    /// Same as [`UpdateGate::should_recompute`] for callers without aux state
    pub fn values_changed(&self, previous: &ValueSet, candidate: &ValueSet) -> GateResult<bool> {
        self.should_recompute(previous, &AuxState::Absent, candidate, &AuxState::Absent)
    }

    fn changed_key_count(&self, previous: &ValueSet, candidate: &ValueSet) -> GateResult<usize> {
        let scope = Scope {
            old: previous,
            new: candidate,
        };
        let mut changed = 0;

        for (key, new_value) in candidate.iter() {
            if self.config.is_ignored(key) {
                continue;
            }

            let old_value = previous.get_or_absent(key);
            if old_value.identical(new_value) {
                continue;
            }

            match self.rules.get(key) {
                None => changed += 1,
                Some(rule) => {
                    if compare_key(key, old_value, new_value, rule, &scope)? {
                        trace!(key, "change vetoed by rule");
                    } else {
                        changed += 1;
                    }
                }
            }
        }

        Ok(changed)
    }
}
