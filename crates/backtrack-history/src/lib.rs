//! Backtrack History - Position/orientation history for lag compensation
//!
//! This crate implements the recording half of lag compensation:
//! - Immutable history records
//! - Capacity-bounded, newest-first participant tracks
//! - A store with explicit connect/disconnect lifecycle
//! - The once-per-frame history recorder

pub mod record;
pub mod track;
pub mod store;
pub mod recorder;

pub use record::*;
pub use track::*;
pub use store::*;
pub use recorder::*;
