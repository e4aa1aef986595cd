//! Backtrack Test Harness - Simulation and validation for lag compensation
//!
//! This crate provides:
//! - A deterministic arena simulator with seeded participant motion
//! - Lagged client views and hit-scan resolution
//! - Test tracing setup
//!
//! Integration tests live under `tests/`, benchmarks under `benches/`.

pub mod arena;
pub mod harness;

pub use arena::*;
pub use harness::*;
