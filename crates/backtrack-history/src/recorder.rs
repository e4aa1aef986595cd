//! History recorder - appends one record per participant per frame

use std::collections::{BTreeMap, HashMap, HashSet};

use backtrack_core::{ParticipantId, ParticipantState, SimTime};
use backtrack_time::TickClock;

use crate::{HistoryRecord, HistoryStore};

/// Hard ceiling on history age (seconds)
pub const MAX_RETENTION_SECS: f64 = 1.0;

/// Extra records beyond one retention window, so the oldest bracketing
/// record survives until it ages out
const TRACK_SLACK: usize = 2;

/// Read access to the live participants of the simulation
pub trait ParticipantSource {
    /// Currently active participants
    fn participant_ids(&self) -> Vec<ParticipantId>;

    /// Live state of a participant, `None` if it no longer exists
    fn live_state(&self, id: ParticipantId) -> Option<ParticipantState>;
}

impl ParticipantSource for BTreeMap<ParticipantId, ParticipantState> {
    fn participant_ids(&self) -> Vec<ParticipantId> {
        self.keys().copied().collect()
    }

    fn live_state(&self, id: ParticipantId) -> Option<ParticipantState> {
        self.get(&id).copied()
    }
}

impl ParticipantSource for HashMap<ParticipantId, ParticipantState> {
    fn participant_ids(&self) -> Vec<ParticipantId> {
        self.keys().copied().collect()
    }

    fn live_state(&self, id: ParticipantId) -> Option<ParticipantState> {
        self.get(&id).copied()
    }
}

/// Retention settings for one recorder pass
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Retention {
    /// Global lag compensation switch
    pub enabled: bool,
    /// Maximum history age (seconds), clamped to [0, MAX_RETENTION_SECS]
    pub max_age: f64,
}

impl Retention {
    pub fn new(enabled: bool, max_age: f64) -> Self {
        Retention { enabled, max_age }
    }

    /// Max age with non-finite values treated as zero and clamping applied
    pub fn clamped_max_age(&self) -> f64 {
        if self.max_age.is_finite() {
            self.max_age.clamp(0.0, MAX_RETENTION_SECS)
        } else {
            0.0
        }
    }
}

impl Default for Retention {
    fn default() -> Self {
        Retention {
            enabled: true,
            max_age: MAX_RETENTION_SECS,
        }
    }
}

/// Outcome of one recorder pass
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RecordReport {
    /// New head records appended
    pub recorded: u32,
    /// Participants whose simulation time did not advance
    pub skipped: u32,
    /// Records dropped for exceeding the retention window
    pub evicted: u32,
    /// History was wiped because compensation is off or there is no one to compensate against
    pub cleared: bool,
}

/// Once-per-frame history recorder
#[derive(Debug, Clone, Default)]
pub struct HistoryRecorder {
    store: HistoryStore,
}

impl HistoryRecorder {
    pub fn new(store: HistoryStore) -> Self {
        HistoryRecorder { store }
    }

    /// Recorder whose tracks hold a full retention window at the clock's tick rate
    pub fn for_clock(clock: &TickClock) -> Self {
        let capacity = clock.ticks_covering(MAX_RETENTION_SECS) + TRACK_SLACK;
        Self::new(HistoryStore::new(capacity))
    }

    pub fn store(&self) -> &HistoryStore {
        &self.store
    }

    pub fn connect(&mut self, id: ParticipantId) {
        self.store.connect(id);
    }

    pub fn disconnect(&mut self, id: ParticipantId) {
        self.store.disconnect(id);
    }

    /// Record the current frame.
    ///
    /// Must run once per simulation frame, after every participant has been
    /// simulated for the tick.
    pub fn record_frame<S>(&mut self, source: &S, now: SimTime, retention: Retention) -> RecordReport
    where
        S: ParticipantSource + ?Sized,
    {
        let ids = source.participant_ids();

        if !retention.enabled || ids.len() <= 1 {
            if self.store.record_count() > 0 {
                tracing::debug!(
                    enabled = retention.enabled,
                    participants = ids.len(),
                    "lag compensation inactive, clearing history"
                );
            }
            self.store.clear_all();
            return RecordReport {
                cleared: true,
                ..RecordReport::default()
            };
        }

        let mut report = RecordReport::default();
        let deadline = now.back_by(retention.clamped_max_age());

        // Connected participants that left the simulation lose their history
        let present: HashSet<ParticipantId> = ids.iter().copied().collect();
        let absent: Vec<ParticipantId> = self.store.connected().filter(|id| !present.contains(id)).collect();
        for id in absent {
            if let Some(track) = self.store.track_mut(id) {
                track.clear();
            }
        }

        for id in ids {
            let Some(track) = self.store.track_mut(id) else {
                tracing::trace!(participant = %id, "participant not connected, not recording");
                continue;
            };

            let Some(state) = source.live_state(id) else {
                track.clear();
                continue;
            };

            report.evicted += track.evict_older_than(deadline) as u32;

            if let Some(head) = track.head() {
                // Same or older simulation time: state has not advanced
                if head.timestamp >= state.simulation_time {
                    report.skipped += 1;
                    continue;
                }
            }

            if track.push_head(HistoryRecord::capture(&state)) {
                report.recorded += 1;
            } else {
                report.skipped += 1;
            }
        }

        tracing::trace!(
            recorded = report.recorded,
            skipped = report.skipped,
            evicted = report.evicted,
            now = now.as_secs(),
            "recorded frame history"
        );

        report
    }
}
