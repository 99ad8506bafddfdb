//! Recompute Core - Value sets and comparison rules
//!
//! This crate defines the types every recompute decision is made from:
//! - Values, value sets and their identity semantics
//! - Rule trees and caller-supplied predicates
//! - Error types

pub mod value;
pub mod rule;
pub mod error;

pub use value::*;
pub use rule::*;
pub use error::*;

/// Opaque secondary token compared by identity alongside a value set
pub type AuxState = Value;
