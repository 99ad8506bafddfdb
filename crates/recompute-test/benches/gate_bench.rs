//! Benchmarks for recompute decisions

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use recompute_core::{Rule, RuleTree, Value, ValueSet};
use recompute_gate::UpdateGate;

fn flat_sets(keys: usize) -> (ValueSet, ValueSet) {
    let old: ValueSet = (0..keys).map(|i| (format!("k{}", i), i as i64)).collect();
    let new: ValueSet = (0..keys).map(|i| (format!("k{}", i), i as i64 + 1)).collect();
    (old, new)
}

fn bench_identity_only(c: &mut Criterion) {
    let gate = UpdateGate::default();
    let (old, _) = flat_sets(100);
    let same = old.clone();

    c.bench_function("gate_identity_100_unchanged", |b| {
        b.iter(|| black_box(gate.values_changed(black_box(&old), black_box(&same))))
    });
}

fn bench_all_rules_veto(c: &mut Criterion) {
    let rules = (0..100).fold(RuleTree::new(), |tree, i| {
        tree.with(format!("k{}", i), Rule::predicate(|_, _| true))
    });
    let gate = UpdateGate::new(rules);
    let (old, new) = flat_sets(100);

    c.bench_function("gate_predicates_100_vetoed", |b| {
        b.iter(|| black_box(gate.values_changed(black_box(&old), black_box(&new))))
    });
}

fn bench_nested_rules(c: &mut Criterion) {
    let inner = |v: i64| -> Value {
        Value::map((0..10).map(|i| (format!("f{}", i), v)).collect::<ValueSet>())
    };
    let old: ValueSet = (0..10).map(|i| (format!("k{}", i), inner(i))).collect();
    let new: ValueSet = (0..10).map(|i| (format!("k{}", i), inner(i))).collect();

    let leaf = (0..10).fold(RuleTree::new(), |tree, i| {
        tree.with(format!("f{}", i), Rule::predicate(|a, b| a.deep_eq(b)))
    });
    let rules = (0..10).fold(RuleTree::new(), |tree, i| tree.with(format!("k{}", i), leaf.clone()));
    let gate = UpdateGate::new(rules);

    c.bench_function("gate_nested_10x10_equal", |b| {
        b.iter(|| black_box(gate.values_changed(black_box(&old), black_box(&new))))
    });
}

fn bench_deep_eq(c: &mut Criterion) {
    let a = Value::list((0..256).map(Value::Int));
    let b = Value::list((0..256).map(Value::Int));

    c.bench_function("value_deep_eq_list_256", |bench| {
        bench.iter(|| black_box(a.deep_eq(black_box(&b))))
    });
}

criterion_group!(
    benches,
    bench_identity_only,
    bench_all_rules_veto,
    bench_nested_rules,
    bench_deep_eq,
);
criterion_main!(benches);
