//! Restore snapshots - what a rewind overwrote, and how to undo it
//!
//! Only fields that actually moved are overwritten. On restore a field is
//! reverted only if it still holds the value the rewind wrote; anything else
//! means the simulation legitimately changed it inside the bracket and the
//! new value wins.

use backtrack_core::{Bounds, ParticipantId, ParticipantState, QAngle, SimTime, Vec3};

use crate::ParticipantWorld;

/// Squared origin delta below which a rewind leaves the origin alone
pub const ORIGIN_EPSILON_SQR: f32 = 0.1 * 0.1;

/// Squared angle delta below which a rewind leaves the angles alone
pub const ANGLES_EPSILON_SQR: f32 = 0.1 * 0.1;

/// Fields a rewind can overwrite
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Field {
    Angles,
    Bounds,
    Origin,
}

/// One overwritten field with its pre-rewind and rewound values
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FieldChange {
    Angles { original: QAngle, applied: QAngle },
    Bounds { original: Bounds, applied: Bounds },
    Origin { original: Vec3, applied: Vec3 },
}

impl FieldChange {
    pub fn field(&self) -> Field {
        match self {
            FieldChange::Angles { .. } => Field::Angles,
            FieldChange::Bounds { .. } => Field::Bounds,
            FieldChange::Origin { .. } => Field::Origin,
        }
    }

    fn apply<W: ParticipantWorld + ?Sized>(&self, world: &mut W, id: ParticipantId) {
        match *self {
            FieldChange::Angles { applied, .. } => world.set_angles(id, applied),
            FieldChange::Bounds { applied, .. } => world.set_bounds(id, applied),
            FieldChange::Origin { applied, .. } => world.set_origin(id, applied),
        }
    }

    /// Revert if the live value is still the applied one; returns whether it did
    fn revert<W: ParticipantWorld + ?Sized>(&self, world: &mut W, live: &ParticipantState) -> bool {
        match *self {
            FieldChange::Angles { original, applied } if live.angles == applied => {
                world.set_angles(live.id, original);
                true
            }
            FieldChange::Bounds { original, applied } if live.bounds == applied => {
                world.set_bounds(live.id, original);
                true
            }
            FieldChange::Origin { original, applied } if live.origin == applied => {
                world.set_origin(live.id, original);
                true
            }
            _ => false,
        }
    }
}

/// Per-field restore counts for one participant
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RestoreOutcome {
    /// Fields put back to their pre-rewind values
    pub restored: u32,
    /// Fields left alone because something else changed them
    pub kept: u32,
}

/// Everything needed to undo one participant's rewind
#[derive(Clone, Debug, PartialEq)]
pub struct RestoreSnapshot {
    pub participant: ParticipantId,
    /// Simulation time before the rewind
    pub original_simulation_time: SimTime,
    /// Overwritten fields, in application order
    pub changes: Vec<FieldChange>,
}

impl RestoreSnapshot {
    /// Compare live state with the rewound values. `None` when nothing
    /// differs beyond the epsilons.
    pub fn diff(live: &ParticipantState, origin: Vec3, angles: QAngle, bounds: Bounds) -> Option<Self> {
        let mut changes = Vec::with_capacity(3);

        if (live.angles - angles).length_sqr() > ANGLES_EPSILON_SQR {
            changes.push(FieldChange::Angles {
                original: live.angles,
                applied: angles,
            });
        }

        // exact comparison: hull changes are discrete (standing, crouched)
        if live.bounds != bounds {
            changes.push(FieldChange::Bounds {
                original: live.bounds,
                applied: bounds,
            });
        }

        // origin last so the relink sees the final hull
        if live.origin.distance_squared(origin) > ORIGIN_EPSILON_SQR {
            changes.push(FieldChange::Origin {
                original: live.origin,
                applied: origin,
            });
        }

        if changes.is_empty() {
            return None;
        }

        Some(RestoreSnapshot {
            participant: live.id,
            original_simulation_time: live.simulation_time,
            changes,
        })
    }

    pub fn changed(&self, field: Field) -> bool {
        self.changes.iter().any(|c| c.field() == field)
    }

    /// Overwrite the live participant with the rewound values
    pub fn apply<W: ParticipantWorld + ?Sized>(&self, world: &mut W, rewound_time: SimTime) {
        for change in &self.changes {
            change.apply(world, self.participant);
        }
        world.set_simulation_time(self.participant, rewound_time);
    }

    /// Undo the rewind, keeping fields the simulation changed in the meantime.
    /// The original simulation time is always put back.
    pub fn restore<W: ParticipantWorld + ?Sized>(&self, world: &mut W) -> RestoreOutcome {
        let mut outcome = RestoreOutcome::default();

        let Some(live) = world.live_state(self.participant) else {
            return outcome;
        };

        for change in &self.changes {
            if change.revert(world, &live) {
                outcome.restored += 1;
            } else {
                outcome.kept += 1;
            }
        }

        world.set_simulation_time(self.participant, self.original_simulation_time);
        outcome
    }
}
