//! Tracked state - a gate composed with the values it guards
//!
//! The gate itself is stateless. `TrackedState` plays the lifecycle role:
//! it keeps the current value set and aux token, asks the gate about each
//! candidate, and then adopts the candidate as the new current state. The
//! candidate is adopted whether or not recompute was required, so the next
//! comparison is always against the most recent values. A candidate that
//! fails with a configuration error is not adopted.
//!
//! Offers are serialized by an internal lock.

use parking_lot::Mutex;
use recompute_core::{AuxState, GateResult, ValueSet};
use tracing::warn;

use crate::UpdateGate;

/// Current value set and aux token of one logical entity
#[derive(Clone, Debug, Default)]
pub struct Snapshot {
    pub values: ValueSet,
    pub aux: AuxState,
}

/// Offer counters
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TrackerStats {
    pub offered: u64,
    pub recomputed: u64,
    pub skipped: u64,
    pub failed: u64,
}

struct Inner {
    current: Snapshot,
    stats: TrackerStats,
}

/// Update gate bound to the state of one entity
pub struct TrackedState {
    gate: UpdateGate,
    inner: Mutex<Inner>,
}

impl TrackedState {
    pub fn new(gate: UpdateGate, values: ValueSet, aux: AuxState) -> Self {
        TrackedState {
            gate,
            inner: Mutex::new(Inner {
                current: Snapshot { values, aux },
                stats: TrackerStats::default(),
            }),
        }
    }

    pub fn gate(&self) -> &UpdateGate {
        &self.gate
    }

    /// Offer a candidate; returns `true` when output must be recomputed
    pub fn offer(&self, values: ValueSet, aux: AuxState) -> GateResult<bool> {
        let mut inner = self.inner.lock();
        inner.stats.offered += 1;

        let verdict = self
            .gate
            .should_recompute(&inner.current.values, &inner.current.aux, &values, &aux);

        match verdict {
            Ok(recompute) => {
                if recompute {
                    inner.stats.recomputed += 1;
                } else {
                    inner.stats.skipped += 1;
                }
                inner.current = Snapshot { values, aux };
                Ok(recompute)
            }
            Err(e) => {
                inner.stats.failed += 1;
                warn!(error = %e, "candidate rejected");
                Err(e)
            }
        }
    }

    /// Replace the current state without consulting the gate
    pub fn force(&self, values: ValueSet, aux: AuxState) {
        self.inner.lock().current = Snapshot { values, aux };
    }

    /// Copy of the current state
    pub fn snapshot(&self) -> Snapshot {
        self.inner.lock().current.clone()
    }

    pub fn stats(&self) -> TrackerStats {
        self.inner.lock().stats.clone()
    }
}
