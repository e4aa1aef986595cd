//! Backtrack Compensation - Rewind and restore for server-side lag compensation
//!
//! This crate implements the compensation bracket around a requester's command:
//! - Configuration shared with the admin surface
//! - Collaborator interfaces (world access, permission policy, transmit mask)
//! - Rewind engine (history walk, interpolation, continuity checks)
//! - Restore snapshots (what was overwritten, and with what)
//! - The lag compensator with its begin/end bracket and scope guard

pub mod config;
pub mod world;
pub mod policy;
pub mod rewind;
pub mod restore;
pub mod compensator;

pub use config::*;
pub use world::*;
pub use policy::*;
pub use rewind::*;
pub use restore::*;
pub use compensator::*;
