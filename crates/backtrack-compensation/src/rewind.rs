//! Rewind engine - recover a participant's state at a past time
//!
//! The walk goes from the newest record toward the oldest and stops at the
//! first record stamped at or before the target. History is only trusted up
//! to the most recent death or teleport: crossing either aborts the walk.

use std::fmt;

use backtrack_core::{horizontal_distance_squared, Bounds, QAngle, SimTime, Vec3};
use backtrack_history::{HistoryRecord, ParticipantTrack};

use crate::{LagCompensationConfig, DEFAULT_TELEPORT_DISTANCE};

/// Why no historical state could be produced
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RewindMiss {
    /// No history recorded
    Empty,
    /// The participant was dead at or after the target time
    Dead,
    /// A teleport-sized jump lies between now and the target time
    Teleported,
    /// Every record is newer than the target time
    TooOld,
}

impl fmt::Display for RewindMiss {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            RewindMiss::Empty => "no history",
            RewindMiss::Dead => "history invalidated by death",
            RewindMiss::Teleported => "history invalidated by teleport",
            RewindMiss::TooOld => "target older than history",
        };
        f.write_str(reason)
    }
}

/// Participant state at the target time
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RewoundState {
    pub origin: Vec3,
    pub angles: QAngle,
    pub bounds: Bounds,
    /// Record time for exact matches, target time when interpolated
    pub timestamp: SimTime,
    /// Whether the state was blended from two records
    pub interpolated: bool,
}

impl RewoundState {
    fn exact(record: &HistoryRecord) -> Self {
        RewoundState {
            origin: record.origin,
            angles: record.angles,
            bounds: record.bounds,
            timestamp: record.timestamp,
            interpolated: false,
        }
    }

    /// Blend from `older` toward `newer`
    fn between(older: &HistoryRecord, newer: &HistoryRecord, target: SimTime) -> Self {
        let span = newer.timestamp.secs_since(older.timestamp);
        let frac = (target.secs_since(older.timestamp) / span) as f32;
        debug_assert!(frac > 0.0 && frac <= 1.0, "interpolation must not extrapolate: {frac}");

        RewoundState {
            origin: older.origin.lerp(newer.origin, frac),
            angles: older.angles.lerp(&newer.angles, frac),
            bounds: older.bounds.lerp(&newer.bounds, frac),
            timestamp: target,
            interpolated: true,
        }
    }
}

/// History walker. Deterministic and side-effect free.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RewindEngine {
    /// Squared horizontal jump that counts as a teleport
    teleport_distance_sqr: f32,
}

impl RewindEngine {
    pub fn new(teleport_distance: f32) -> Self {
        RewindEngine {
            teleport_distance_sqr: teleport_distance * teleport_distance,
        }
    }

    pub fn from_config(config: &LagCompensationConfig) -> Self {
        RewindEngine {
            teleport_distance_sqr: config.teleport_distance_sqr(),
        }
    }

    pub fn teleport_distance_sqr(&self) -> f32 {
        self.teleport_distance_sqr
    }

    /// State at `target`, or `None` if history cannot vouch for it
    pub fn rewind(&self, track: &ParticipantTrack, target: SimTime) -> Option<RewoundState> {
        self.try_rewind(track, target).ok()
    }

    /// Like [`rewind`](Self::rewind), reporting why a rewind failed
    pub fn try_rewind(&self, track: &ParticipantTrack, target: SimTime) -> Result<RewoundState, RewindMiss> {
        self.walk(track, target, None)
    }

    /// Rewind a participant currently at `live_origin`.
    ///
    /// The jump from the live origin to the newest record is checked too, so
    /// a participant that teleported since the last recorded frame is not
    /// dragged back across the teleport.
    pub fn rewind_from(
        &self,
        track: &ParticipantTrack,
        target: SimTime,
        live_origin: Vec3,
    ) -> Result<RewoundState, RewindMiss> {
        self.walk(track, target, Some(live_origin))
    }

    fn walk(
        &self,
        track: &ParticipantTrack,
        target: SimTime,
        live_origin: Option<Vec3>,
    ) -> Result<RewoundState, RewindMiss> {
        if track.is_empty() {
            return Err(RewindMiss::Empty);
        }

        let mut prev_origin = live_origin;
        let mut newer: Option<&HistoryRecord> = None;

        for record in track.iter() {
            if !record.alive {
                return Err(RewindMiss::Dead);
            }

            if let Some(prev) = prev_origin {
                if horizontal_distance_squared(record.origin, prev) > self.teleport_distance_sqr {
                    return Err(RewindMiss::Teleported);
                }
            }

            if record.timestamp <= target {
                return Ok(match newer {
                    Some(newer) if record.timestamp < target => RewoundState::between(record, newer, target),
                    _ => RewoundState::exact(record),
                });
            }

            prev_origin = Some(record.origin);
            newer = Some(record);
        }

        Err(RewindMiss::TooOld)
    }
}

impl Default for RewindEngine {
    fn default() -> Self {
        Self::new(DEFAULT_TELEPORT_DISTANCE)
    }
}
