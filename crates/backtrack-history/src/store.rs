//! History store - one track per connected participant

use std::collections::HashMap;

use backtrack_core::ParticipantId;

use crate::ParticipantTrack;

/// Minimum records per track
pub const MIN_TRACK_CAPACITY: usize = 2;

/// Maximum records per track; a full second of history up to 1024 Hz
pub const MAX_TRACK_CAPACITY: usize = 1024;

/// Per-participant history tracks, keyed by participant handle
#[derive(Debug, Clone)]
pub struct HistoryStore {
    tracks: HashMap<ParticipantId, ParticipantTrack>,
    /// Capacity given to each new track
    track_capacity: usize,
}

impl HistoryStore {
    pub fn new(track_capacity: usize) -> Self {
        HistoryStore {
            tracks: HashMap::new(),
            track_capacity: track_capacity.clamp(MIN_TRACK_CAPACITY, MAX_TRACK_CAPACITY),
        }
    }

    /// Start tracking a participant. Reconnecting an already tracked
    /// participant keeps its history.
    pub fn connect(&mut self, id: ParticipantId) {
        let capacity = self.track_capacity;
        self.tracks
            .entry(id)
            .or_insert_with(|| ParticipantTrack::with_capacity(capacity));
    }

    /// Stop tracking a participant and drop its history
    pub fn disconnect(&mut self, id: ParticipantId) -> Option<ParticipantTrack> {
        self.tracks.remove(&id)
    }

    pub fn is_connected(&self, id: ParticipantId) -> bool {
        self.tracks.contains_key(&id)
    }

    pub fn track(&self, id: ParticipantId) -> Option<&ParticipantTrack> {
        self.tracks.get(&id)
    }

    pub fn track_mut(&mut self, id: ParticipantId) -> Option<&mut ParticipantTrack> {
        self.tracks.get_mut(&id)
    }

    /// Connected participants, in no particular order
    pub fn connected(&self) -> impl Iterator<Item = ParticipantId> + '_ {
        self.tracks.keys().copied()
    }

    /// Number of connected participants
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Total records across all tracks
    pub fn record_count(&self) -> usize {
        self.tracks.values().map(ParticipantTrack::len).sum()
    }

    pub fn track_capacity(&self) -> usize {
        self.track_capacity
    }

    /// Drop every record while keeping participants connected
    pub fn clear_all(&mut self) {
        for track in self.tracks.values_mut() {
            track.clear();
        }
    }
}

impl Default for HistoryStore {
    fn default() -> Self {
        // one second at 66 ticks per second, with slack
        Self::new(69)
    }
}
