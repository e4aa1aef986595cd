//! Backtrack Time - Tick clock and command timing
//!
//! This crate implements the timing side of lag compensation:
//! - Tick clock with tick <-> time conversion
//! - Target time computation for a requester's command
//! - Per-participant latency estimation

pub mod clock;
pub mod target;
pub mod network;

pub use clock::*;
pub use target::*;
pub use network::*;
