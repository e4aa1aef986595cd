//! Identity types for lag compensation
//!
//! Participants are addressed by a stable handle that survives for the
//! whole connected session, rather than by a raw slot index.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Participant identity - stable handle for a connected player or combatant
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct ParticipantId(pub u32);

impl ParticipantId {
    #[inline]
    pub fn new(id: u32) -> Self {
        ParticipantId(id)
    }

    /// Index into dense per-participant tables (bitsets, arrays)
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Participant({})", self.0)
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u32> for ParticipantId {
    fn from(id: u32) -> Self {
        ParticipantId(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_participant_id_display() {
        let id = ParticipantId::new(7);
        assert_eq!(format!("{}", id), "#7");
        assert_eq!(format!("{:?}", id), "Participant(7)");
        assert_eq!(id.index(), 7);
    }

    #[test]
    fn test_participant_id_ordering() {
        assert!(ParticipantId::new(1) < ParticipantId::new(2));
        assert_eq!(ParticipantId::from(3), ParticipantId::new(3));
    }
}
