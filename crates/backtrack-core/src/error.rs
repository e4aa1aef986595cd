//! Error types for lag compensation
//!
//! Missing or invalid history is not an error: it simply means a participant
//! is left at live state. Only misuse of the API ends up here.

use thiserror::Error;

use crate::ParticipantId;

/// Core lag compensation errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BacktrackError {
    // Bracket errors
    #[error("Lag compensation already active for requester {requester}")]
    CompensationActive { requester: ParticipantId },

    // Participant errors
    #[error("Unknown participant: {0}")]
    UnknownParticipant(ParticipantId),

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for lag compensation operations
pub type BacktrackResult<T> = Result<T, BacktrackError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = BacktrackError::CompensationActive {
            requester: ParticipantId::new(3),
        };
        assert_eq!(err.to_string(), "Lag compensation already active for requester #3");

        let err = BacktrackError::InvalidConfig("max_unlag is NaN".into());
        assert_eq!(err.to_string(), "Invalid configuration: max_unlag is NaN");
    }
}
