//! Recompute Test Harness - Fuzzing and model checks for the update gate
//!
//! This crate provides:
//! - A reference model of the recompute decision
//! - Seeded randomized fuzzing against that model
//! - Tracing setup for test runs

pub mod model;
pub mod fuzzer;
pub mod logging;

pub use model::*;
pub use fuzzer::*;
pub use logging::*;
