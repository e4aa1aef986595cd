//! History record - one recorded participant state

use backtrack_core::{Bounds, ParticipantState, QAngle, SimTime, Vec3};

/// Immutable snapshot of a participant at one simulation time
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistoryRecord {
    pub timestamp: SimTime,
    pub origin: Vec3,
    pub angles: QAngle,
    pub bounds: Bounds,
    pub alive: bool,
}

impl HistoryRecord {
    pub fn new(timestamp: SimTime, origin: Vec3, angles: QAngle, bounds: Bounds, alive: bool) -> Self {
        Self {
            timestamp,
            origin,
            angles,
            bounds,
            alive,
        }
    }

    /// Capture the recordable fields of a live participant
    pub fn capture(state: &ParticipantState) -> Self {
        Self {
            timestamp: state.simulation_time,
            origin: state.origin,
            angles: state.angles,
            bounds: state.bounds,
            alive: state.alive,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use backtrack_core::ParticipantId;

    #[test]
    fn test_capture() {
        let state = ParticipantState::new(ParticipantId::new(1), Vec3::new(1.0, 2.0, 3.0), SimTime(5.0))
            .with_angles(QAngle::new(0.0, 45.0, 0.0))
            .dead();

        let record = HistoryRecord::capture(&state);
        assert_eq!(record.timestamp, SimTime(5.0));
        assert_eq!(record.origin, state.origin);
        assert_eq!(record.angles, state.angles);
        assert_eq!(record.bounds, Bounds::standing());
        assert!(!record.alive);
    }
}
