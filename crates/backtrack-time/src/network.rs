//! Network model for passive per-participant latency estimation
//!
//! Hosts that already track net-channel latency can feed it straight into a
//! command; this model is for hosts that only observe round-trip samples.

use std::collections::HashMap;

use backtrack_core::ParticipantId;

/// Latency statistics for a single participant
#[derive(Clone, Debug)]
pub struct PeerLatencyModel {
    /// Smoothed round-trip time (seconds)
    pub smoothed_rtt: f64,
    /// Jitter envelope (max deviation from the median)
    pub jitter_envelope: f64,
    /// Recent RTT samples
    samples: Vec<f64>,
    /// Maximum samples to keep
    max_samples: usize,
}

impl PeerLatencyModel {
    pub fn new() -> Self {
        PeerLatencyModel {
            smoothed_rtt: 0.0,
            jitter_envelope: 0.0,
            samples: Vec::new(),
            max_samples: 64,
        }
    }

    /// Update with a new round-trip sample
    pub fn update(&mut self, rtt: f64) {
        if !rtt.is_finite() || rtt < 0.0 {
            return;
        }

        if self.samples.is_empty() {
            self.smoothed_rtt = rtt;
        } else {
            // Exponential moving average
            self.smoothed_rtt = self.smoothed_rtt * 0.875 + rtt * 0.125;
        }

        self.samples.push(rtt);
        if self.samples.len() > self.max_samples {
            self.samples.remove(0);
        }

        let median = Self::median(&self.samples);
        self.jitter_envelope = self
            .samples
            .iter()
            .map(|s| (s - median).abs())
            .fold(0.0, f64::max);
    }

    /// Server -> client one-way latency estimate (seconds)
    pub fn outgoing_latency(&self) -> f64 {
        self.smoothed_rtt * 0.5
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    fn median(values: &[f64]) -> f64 {
        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let mid = sorted.len() / 2;
        if sorted.len() % 2 == 0 {
            (sorted[mid - 1] + sorted[mid]) / 2.0
        } else {
            sorted[mid]
        }
    }
}

impl Default for PeerLatencyModel {
    fn default() -> Self {
        Self::new()
    }
}

/// Latency models for all connected participants
#[derive(Debug, Default)]
pub struct LatencyModel {
    peers: HashMap<ParticipantId, PeerLatencyModel>,
}

impl LatencyModel {
    pub fn new() -> Self {
        LatencyModel::default()
    }

    /// Record a round-trip sample for a participant
    pub fn record_rtt(&mut self, participant: ParticipantId, rtt: f64) {
        self.peers.entry(participant).or_default().update(rtt);
    }

    /// One-way latency estimate, zero for participants with no samples
    pub fn outgoing_latency(&self, participant: ParticipantId) -> f64 {
        self.peers
            .get(&participant)
            .map(PeerLatencyModel::outgoing_latency)
            .unwrap_or(0.0)
    }

    pub fn get_peer(&self, participant: ParticipantId) -> Option<&PeerLatencyModel> {
        self.peers.get(&participant)
    }

    /// Forget a participant's samples (on disconnect)
    pub fn remove(&mut self, participant: ParticipantId) {
        self.peers.remove(&participant);
    }
}
