//! Backtrack Core - Fundamental types and primitives
//!
//! This crate defines the types shared by every lag compensation component:
//! - Identifiers (ParticipantId)
//! - Time primitives (SimTime, Tick)
//! - Vector, angle and bounding box math
//! - The live participant state view
//! - Error types

pub mod id;
pub mod time;
pub mod math;
pub mod state;
pub mod error;

pub use id::*;
pub use time::*;
pub use math::*;
pub use state::*;
pub use error::*;
