//! Gate Fuzzer - Randomized checks of the update gate
//!
//! Tests:
//! - Verdict agreement with the reference model
//! - Predicates never see identical values
//! - Invalid rules surface as errors, never as verdicts
//! - Tracked state sequences adopt every successful candidate

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use recompute_core::{AuxState, Rule, RuleTree, Value, ValueSet};
use recompute_gate::{TrackedState, UpdateGate};
use tracing::debug;

use crate::model::{expected_verdict, FuzzRule};

/// Fuzzer configuration
#[derive(Clone, Debug)]
pub struct FuzzerConfig {
    /// Keys per top-level value set
    pub key_count: usize,
    /// Maximum nesting depth of map values
    pub max_depth: usize,
    /// Number of decisions to check
    pub case_count: usize,
    /// Probability that a key gets a rule
    pub rule_prob: f64,
    /// Probability that a value is replaced in the candidate
    pub mutation_prob: f64,
    /// Probability that a generated rule is invalid
    pub invalid_prob: f64,
    /// Probability that the aux token changes
    pub aux_change_prob: f64,
    /// Random seed
    pub seed: u64,
}

impl Default for FuzzerConfig {
    fn default() -> Self {
        FuzzerConfig {
            key_count: 12,
            max_depth: 3,
            case_count: 1000,
            rule_prob: 0.5,
            mutation_prob: 0.3,
            invalid_prob: 0.02,
            aux_change_prob: 0.1,
            seed: 42,
        }
    }
}

impl FuzzerConfig {
    /// Light fuzzing for quick tests
    pub fn light() -> Self {
        FuzzerConfig {
            key_count: 6,
            max_depth: 2,
            case_count: 200,
            rule_prob: 0.5,
            mutation_prob: 0.3,
            invalid_prob: 0.0,
            aux_change_prob: 0.1,
            seed: 42,
        }
    }

    /// Heavy fuzzing for thorough testing
    pub fn heavy() -> Self {
        FuzzerConfig {
            key_count: 40,
            max_depth: 5,
            case_count: 10000,
            rule_prob: 0.7,
            mutation_prob: 0.4,
            invalid_prob: 0.05,
            aux_change_prob: 0.05,
            seed: 42,
        }
    }
}

/// Predicate call counters shared by all rules of one case
#[derive(Clone, Debug, Default)]
pub struct Probe {
    calls: Arc<AtomicU64>,
    identical_calls: Arc<AtomicU64>,
}

impl Probe {
    fn instrument(&self, f: fn(&Value, &Value) -> bool) -> Rule {
        let probe = self.clone();
        Rule::predicate(move |old, new| {
            probe.calls.fetch_add(1, Ordering::Relaxed);
            if old.identical(new) {
                probe.identical_calls.fetch_add(1, Ordering::Relaxed);
            }
            f(old, new)
        })
    }

    fn compile(&self, rules: &[(String, FuzzRule)]) -> RuleTree {
        rules.iter().fold(RuleTree::new(), |tree, (key, rule)| {
            tree.with(key.clone(), self.compile_rule(rule))
        })
    }

    fn compile_rule(&self, rule: &FuzzRule) -> Rule {
        match rule {
            FuzzRule::AlwaysEqual => self.instrument(|_, _| true),
            FuzzRule::NeverEqual => self.instrument(|_, _| false),
            FuzzRule::DeepEqual => self.instrument(|old, new| old.deep_eq(new)),
            FuzzRule::Nested(entries) => Rule::Nested(self.compile(entries)),
            FuzzRule::Invalid => Rule::invalid("fuzzed invalid entry"),
        }
    }

    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }

    pub fn identical_calls(&self) -> u64 {
        self.identical_calls.load(Ordering::Relaxed)
    }
}

/// One generated decision
#[derive(Clone, Debug)]
pub struct FuzzCase {
    pub previous: ValueSet,
    pub previous_aux: AuxState,
    pub candidate: ValueSet,
    pub candidate_aux: AuxState,
    pub rules: Vec<(String, FuzzRule)>,
}

/// Fuzz run result
#[derive(Clone, Debug, Default)]
pub struct FuzzResult {
    pub cases: u64,
    pub recomputed: u64,
    pub skipped: u64,
    pub errors: u64,
    /// Gate and model disagreed
    pub mismatches: u64,
    pub predicate_calls: u64,
    /// Predicate calls on identical values
    pub identical_calls: u64,
}

impl FuzzResult {
    pub fn is_valid(&self) -> bool {
        self.mismatches == 0 && self.identical_calls == 0
    }
}

/// Randomized gate checker
pub struct GateFuzzer {
    config: FuzzerConfig,
    rng: StdRng,
}

impl GateFuzzer {
    pub fn new(config: FuzzerConfig) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        GateFuzzer { config, rng }
    }

    /// Check `case_count` independent decisions
    pub fn run(&mut self) -> FuzzResult {
        let mut result = FuzzResult::default();

        for _ in 0..self.config.case_count {
            let case = self.generate_case();
            let probe = Probe::default();
            let gate = UpdateGate::new(probe.compile(&case.rules));

            let verdict = gate
                .should_recompute(&case.previous, &case.previous_aux, &case.candidate, &case.candidate_aux)
                .ok();
            let expected = expected_verdict(
                &case.previous,
                &case.previous_aux,
                &case.candidate,
                &case.candidate_aux,
                &case.rules,
            );

            result.cases += 1;
            match verdict {
                Some(true) => result.recomputed += 1,
                Some(false) => result.skipped += 1,
                None => result.errors += 1,
            }
            if verdict != expected {
                debug!(?verdict, ?expected, "gate disagrees with model");
                result.mismatches += 1;
            }
            result.predicate_calls += probe.calls();
            result.identical_calls += probe.identical_calls();
        }

        result
    }

    /// Feed a sequence of candidates through one tracked entity
    ///
    /// Returns the number of offers whose verdict disagreed with the model.
    pub fn run_sequence(&mut self, steps: usize) -> u64 {
        let mut current = self.generate_set(0);
        let rules = self.generate_rules_for(&current, 0, false);
        let probe = Probe::default();
        let gate = UpdateGate::new(probe.compile(&rules));

        let mut aux = AuxState::Int(0);
        let tracked = TrackedState::new(gate, current.clone(), aux.clone());
        let mut mismatches = 0;

        for _ in 0..steps {
            let candidate = self.mutate_set(&current, 0);
            let candidate_aux = if self.rng.gen_bool(self.config.aux_change_prob) {
                AuxState::Int(self.rng.gen_range(0..3))
            } else {
                aux.clone()
            };

            let expected = expected_verdict(&current, &aux, &candidate, &candidate_aux, &rules);
            let verdict = tracked.offer(candidate.clone(), candidate_aux.clone()).ok();
            if verdict != expected {
                mismatches += 1;
            }
            if verdict.is_some() {
                current = candidate;
                aux = candidate_aux;
            }
        }

        mismatches + probe.identical_calls()
    }

    pub fn generate_case(&mut self) -> FuzzCase {
        let previous = self.generate_set(0);
        let candidate = self.mutate_set(&previous, 0);
        let rules = self.generate_rules_for(&previous, 0, true);

        let previous_aux = AuxState::Int(self.rng.gen_range(0..3));
        let candidate_aux = if self.rng.gen_bool(self.config.aux_change_prob) {
            AuxState::Int(self.rng.gen_range(0..3))
        } else {
            previous_aux.clone()
        };

        FuzzCase {
            previous,
            previous_aux,
            candidate,
            candidate_aux,
            rules,
        }
    }

    fn generate_set(&mut self, depth: usize) -> ValueSet {
        let count = if depth == 0 {
            self.config.key_count
        } else {
            self.rng.gen_range(1..=4)
        };
        (0..count)
            .map(|i| (format!("k{}", i), self.generate_value(depth + 1)))
            .collect()
    }

    fn generate_value(&mut self, depth: usize) -> Value {
        if depth < self.config.max_depth && self.rng.gen_bool(0.25) {
            return Value::map(self.generate_set(depth));
        }
        match self.rng.gen_range(0..6) {
            0 => Value::Null,
            1 => Value::Bool(self.rng.gen()),
            2 => Value::Int(self.rng.gen_range(0..3)),
            3 => Value::Float(f64::from(self.rng.gen_range(0..3u8)) * 0.5),
            4 => Value::str(["a", "b", "c"][self.rng.gen_range(0..3)]),
            _ => Value::list((0..self.rng.gen_range(0..3)).map(Value::Int)),
        }
    }

    /// Candidate derived from `set`: unchanged values keep their identity
    fn mutate_set(&mut self, set: &ValueSet, depth: usize) -> ValueSet {
        let mut out: ValueSet = set
            .iter()
            .filter(|_| !self.rng.gen_bool(0.03))
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();

        let keys: Vec<String> = out.keys().map(str::to_string).collect();
        for key in keys {
            if !self.rng.gen_bool(self.config.mutation_prob) {
                continue;
            }
            let replacement = match out.get_or_absent(&key) {
                Value::Map(inner) if self.rng.gen_bool(0.7) => Value::map(self.mutate_set(inner, depth + 1)),
                _ => self.generate_value(depth + 1),
            };
            out.insert(key, replacement);
        }

        if self.rng.gen_bool(0.03) {
            out.insert(format!("extra{}", self.rng.gen_range(0..4)), self.generate_value(depth + 1));
        }
        out
    }

    fn generate_rules_for(&mut self, set: &ValueSet, depth: usize, allow_invalid: bool) -> Vec<(String, FuzzRule)> {
        let mut rules = Vec::new();
        for (key, value) in set.iter() {
            if !self.rng.gen_bool(self.config.rule_prob) {
                continue;
            }
            let rule = if allow_invalid && self.rng.gen_bool(self.config.invalid_prob) {
                FuzzRule::Invalid
            } else {
                match value {
                    Value::Map(inner) if depth < self.config.max_depth && self.rng.gen_bool(0.6) => {
                        FuzzRule::Nested(self.generate_rules_for(inner, depth + 1, allow_invalid))
                    }
                    Value::List(items) if self.rng.gen_bool(0.5) => {
                        let mut by_index = Vec::new();
                        for index in 0..items.len() {
                            if self.rng.gen_bool(self.config.rule_prob) {
                                by_index.push((index.to_string(), self.generate_leaf_rule()));
                            }
                        }
                        FuzzRule::Nested(by_index)
                    }
                    _ => self.generate_leaf_rule(),
                }
            };
            rules.push((key.to_string(), rule));
        }
        rules
    }

    fn generate_leaf_rule(&mut self) -> FuzzRule {
        match self.rng.gen_range(0..3) {
            0 => FuzzRule::AlwaysEqual,
            1 => FuzzRule::NeverEqual,
            _ => FuzzRule::DeepEqual,
        }
    }
}
