//! Gate configuration

use std::collections::BTreeSet;

/// Update gate configuration
#[derive(Clone, Debug)]
pub struct GateConfig {
    /// Adapter bookkeeping keys that never count as a change
    pub ignored_keys: BTreeSet<String>,
    /// Emit a debug event for every verdict
    pub log_decisions: bool,
}

impl Default for GateConfig {
    fn default() -> Self {
        GateConfig {
            ignored_keys: BTreeSet::new(),
            log_decisions: true,
        }
    }
}

impl GateConfig {
    pub fn new() -> Self {
        GateConfig::default()
    }

    pub fn with_ignored_key(mut self, key: impl Into<String>) -> Self {
        self.ignored_keys.insert(key.into());
        self
    }

    pub fn with_log_decisions(mut self, enabled: bool) -> Self {
        self.log_decisions = enabled;
        self
    }

    #[inline]
    pub fn is_ignored(&self, key: &str) -> bool {
        self.ignored_keys.contains(key)
    }
}
