//! Recompute Gate - Rule-driven change detection
//!
//! This crate decides whether a unit's output must be recomputed:
//! - Recursive rule-driven comparison of values
//! - The update gate turning comparisons into one verdict
//! - Gate configuration and declarative rule documents
//! - State tracking for one entity across updates

pub mod compare;
pub mod config;
pub mod gate;
pub mod document;
pub mod tracked;

pub use compare::*;
pub use config::*;
pub use gate::*;
pub use document::*;
pub use tracked::*;
