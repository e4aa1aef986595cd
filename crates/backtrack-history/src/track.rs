//! Participant track - bounded, newest-first ring of history records

use std::collections::VecDeque;

use backtrack_core::SimTime;

use crate::HistoryRecord;

/// Time-ordered history of one participant
/// INVARIANT: timestamps strictly decrease from head (newest) to tail (oldest)
#[derive(Debug, Clone)]
pub struct ParticipantTrack {
    /// Records, front = newest
    records: VecDeque<HistoryRecord>,
    /// Maximum records kept
    capacity: usize,
}

impl ParticipantTrack {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        ParticipantTrack {
            records: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Add a new head record.
    ///
    /// Returns false (and stores nothing) unless the record is strictly newer
    /// than the current head. At capacity the oldest record is dropped.
    pub fn push_head(&mut self, record: HistoryRecord) -> bool {
        if let Some(head) = self.records.front() {
            if !(record.timestamp > head.timestamp) {
                return false;
            }
        }
        if self.records.len() == self.capacity {
            self.records.pop_back();
        }
        self.records.push_front(record);
        true
    }

    /// Drop tail records stamped before `deadline`; returns how many were removed
    pub fn evict_older_than(&mut self, deadline: SimTime) -> usize {
        let mut evicted = 0;
        while let Some(tail) = self.records.back() {
            if tail.timestamp >= deadline {
                break;
            }
            self.records.pop_back();
            evicted += 1;
        }
        evicted
    }

    /// Newest record
    pub fn head(&self) -> Option<&HistoryRecord> {
        self.records.front()
    }

    /// Oldest record
    pub fn tail(&self) -> Option<&HistoryRecord> {
        self.records.back()
    }

    /// Iterate newest to oldest
    pub fn iter(&self) -> impl Iterator<Item = &HistoryRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}

impl FromIterator<HistoryRecord> for ParticipantTrack {
    /// Build a track from records in chronological (oldest first) order
    fn from_iter<I: IntoIterator<Item = HistoryRecord>>(iter: I) -> Self {
        let records: Vec<_> = iter.into_iter().collect();
        let mut track = ParticipantTrack::with_capacity(records.len());
        for record in records {
            track.push_head(record);
        }
        track
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use backtrack_core::{Bounds, QAngle, Vec3};

    fn record_at(t: f64) -> HistoryRecord {
        HistoryRecord::new(SimTime(t), Vec3::new(t as f32, 0.0, 0.0), QAngle::ZERO, Bounds::standing(), true)
    }

    #[test]
    fn test_push_head_orders_newest_first() {
        let mut track = ParticipantTrack::with_capacity(8);
        assert!(track.push_head(record_at(1.0)));
        assert!(track.push_head(record_at(2.0)));
        assert!(track.push_head(record_at(3.0)));

        let times: Vec<f64> = track.iter().map(|r| r.timestamp.as_secs()).collect();
        assert_eq!(times, vec![3.0, 2.0, 1.0]);
        assert_eq!(track.head().unwrap().timestamp, SimTime(3.0));
        assert_eq!(track.tail().unwrap().timestamp, SimTime(1.0));
    }

    #[test]
    fn test_push_head_rejects_stale_timestamps() {
        let mut track = ParticipantTrack::with_capacity(8);
        assert!(track.push_head(record_at(2.0)));
        assert!(!track.push_head(record_at(2.0)));
        assert!(!track.push_head(record_at(1.5)));
        assert_eq!(track.len(), 1);
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let mut track = ParticipantTrack::with_capacity(3);
        for t in 1..=5 {
            track.push_head(record_at(t as f64));
        }

        assert_eq!(track.len(), 3);
        assert_eq!(track.tail().unwrap().timestamp, SimTime(3.0));
        assert_eq!(track.head().unwrap().timestamp, SimTime(5.0));
    }

    #[test]
    fn test_evict_older_than() {
        let mut track: ParticipantTrack = (0..10).map(|i| record_at(18.5 + i as f64 * 0.1)).collect();

        // deadline 19.0: drops 18.5 .. 18.9
        let evicted = track.evict_older_than(SimTime(19.0 - 1e-9));
        assert_eq!(evicted, 5);
        assert!(track.iter().all(|r| r.timestamp.as_secs() >= 19.0 - 1e-9));
        assert_eq!(track.len(), 5);
    }

    #[test]
    fn test_from_iter_chronological() {
        let track: ParticipantTrack = vec![record_at(1.0), record_at(2.0)].into_iter().collect();
        assert_eq!(track.head().unwrap().timestamp, SimTime(2.0));
        assert_eq!(track.capacity(), 2);
    }
}
