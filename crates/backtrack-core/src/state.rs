//! Live participant state as seen by lag compensation
//!
//! The simulation owns participants; lag compensation only ever sees this
//! flattened view of the fields it records, rewinds and restores.

use serde::{Deserialize, Serialize};

use crate::{Bounds, ParticipantId, QAngle, SimTime, Vec3};

/// Snapshot of a participant's collision-relevant state
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParticipantState {
    pub id: ParticipantId,
    pub origin: Vec3,
    pub angles: QAngle,
    pub bounds: Bounds,
    pub alive: bool,
    /// Time of the participant's last simulated update
    pub simulation_time: SimTime,
}

impl ParticipantState {
    /// Alive participant with a standing hull at `origin`
    pub fn new(id: ParticipantId, origin: Vec3, simulation_time: SimTime) -> Self {
        Self {
            id,
            origin,
            angles: QAngle::ZERO,
            bounds: Bounds::standing(),
            alive: true,
            simulation_time,
        }
    }

    pub fn with_angles(mut self, angles: QAngle) -> Self {
        self.angles = angles;
        self
    }

    pub fn with_bounds(mut self, bounds: Bounds) -> Self {
        self.bounds = bounds;
        self
    }

    pub fn dead(mut self) -> Self {
        self.alive = false;
        self
    }

    /// Center of the collision box in world space
    pub fn center(&self) -> Vec3 {
        self.origin + (self.bounds.mins + self.bounds.maxs) * 0.5
    }
}
