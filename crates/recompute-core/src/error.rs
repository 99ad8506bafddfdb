//! Error types for recompute decisions

use thiserror::Error;

/// Errors raised while deciding whether to recompute
///
/// Every variant describes a broken rule configuration. None of them is
/// ever folded into a verdict.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GateError {
    // Rule shape errors
    #[error("Invalid rule at `{path}`: expected a predicate or a nested rule tree, found {shape}")]
    Configuration { path: String, shape: String },

    // Declarative loading errors
    #[error("Unknown predicate `{name}` at `{path}`")]
    UnknownPredicate { path: String, name: String },

    #[error("Invalid rule document: {0}")]
    InvalidDocument(String),
}

impl GateError {
    /// Dotted key path of the rule entry that caused the error, if any
    pub fn path(&self) -> Option<&str> {
        match self {
            GateError::Configuration { path, .. } | GateError::UnknownPredicate { path, .. } => {
                Some(path)
            }
            GateError::InvalidDocument(_) => None,
        }
    }

    /// Whether this is a malformed rule reached during comparison
    pub fn is_configuration(&self) -> bool {
        matches!(self, GateError::Configuration { .. })
    }
}

/// Result type for recompute operations
pub type GateResult<T> = Result<T, GateError>;
