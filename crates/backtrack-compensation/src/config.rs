//! Lag compensation configuration
//!
//! Values are administratively tunable at runtime. The simulation reads a copy
//! at the start of each recorder pass and each compensation bracket, so a
//! change never lands halfway through a bracket.

use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use backtrack_core::{BacktrackError, BacktrackResult};
use backtrack_history::{Retention, MAX_RETENTION_SECS};

/// Default horizontal jump (world units) treated as a teleport
pub const DEFAULT_TELEPORT_DISTANCE: f32 = 64.0;

/// Lag compensation configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LagCompensationConfig {
    /// Global switch; when off, history is cleared and brackets are no-ops
    pub enabled: bool,
    /// Maximum rewind and history retention (seconds), within [0, 1]
    pub max_unlag: f64,
    /// Horizontal distance between consecutive records that invalidates history
    pub teleport_distance: f32,
    /// Keep rewound participants out of solid space
    pub fix_stuck: bool,
}

impl Default for LagCompensationConfig {
    fn default() -> Self {
        LagCompensationConfig {
            enabled: true,
            max_unlag: MAX_RETENTION_SECS,
            teleport_distance: DEFAULT_TELEPORT_DISTANCE,
            fix_stuck: false,
        }
    }
}

impl LagCompensationConfig {
    /// Configuration with lag compensation switched off
    pub fn disabled() -> Self {
        LagCompensationConfig {
            enabled: false,
            ..Self::default()
        }
    }

    /// Tight rewind window for competitive servers: at most 200ms of
    /// compensation, rewound players kept out of solid space
    pub fn competitive() -> Self {
        LagCompensationConfig {
            max_unlag: 0.2,
            fix_stuck: true,
            ..Self::default()
        }
    }

    /// Parse a JSON config; missing fields take their defaults
    pub fn from_json(json: &str) -> BacktrackResult<Self> {
        let mut config: LagCompensationConfig =
            serde_json::from_str(json).map_err(|e| BacktrackError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        config.max_unlag = config.max_unlag.clamp(0.0, MAX_RETENTION_SECS);
        Ok(config)
    }

    /// Reject values that cannot be clamped into something meaningful
    pub fn validate(&self) -> BacktrackResult<()> {
        if !self.max_unlag.is_finite() {
            return Err(BacktrackError::InvalidConfig(format!(
                "max_unlag must be finite, got {}",
                self.max_unlag
            )));
        }
        if !self.teleport_distance.is_finite() || self.teleport_distance <= 0.0 {
            return Err(BacktrackError::InvalidConfig(format!(
                "teleport_distance must be positive, got {}",
                self.teleport_distance
            )));
        }
        Ok(())
    }

    /// Set the rewind window, clamped to [0, 1] seconds
    pub fn set_max_unlag(&mut self, secs: f64) {
        self.max_unlag = if secs.is_finite() {
            secs.clamp(0.0, MAX_RETENTION_SECS)
        } else {
            0.0
        };
    }

    /// Effective rewind window after clamping
    pub fn effective_max_unlag(&self) -> f64 {
        Retention::new(self.enabled, self.max_unlag).clamped_max_age()
    }

    pub fn teleport_distance_sqr(&self) -> f32 {
        self.teleport_distance * self.teleport_distance
    }

    /// Retention settings for the history recorder
    pub fn retention(&self) -> Retention {
        Retention::new(self.enabled, self.max_unlag)
    }
}

/// Configuration handle shared between the simulation and the admin surface
#[derive(Clone, Debug, Default)]
pub struct SharedConfig {
    inner: Arc<RwLock<LagCompensationConfig>>,
}

impl SharedConfig {
    pub fn new(config: LagCompensationConfig) -> Self {
        SharedConfig {
            inner: Arc::new(RwLock::new(config)),
        }
    }

    /// Copy of the current configuration
    pub fn snapshot(&self) -> LagCompensationConfig {
        self.inner.read().clone()
    }

    /// Modify the configuration in place
    pub fn update<F: FnOnce(&mut LagCompensationConfig)>(&self, f: F) {
        let mut guard = self.inner.write();
        f(&mut *guard);
        tracing::debug!(config = ?*guard, "lag compensation config updated");
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.update(|c| c.enabled = enabled);
    }

    pub fn set_max_unlag(&self, secs: f64) {
        self.update(|c| c.set_max_unlag(secs));
    }

    /// Current effective rewind window (seconds)
    pub fn max_unlag(&self) -> f64 {
        self.inner.read().effective_max_unlag()
    }
}

impl From<LagCompensationConfig> for SharedConfig {
    fn from(config: LagCompensationConfig) -> Self {
        SharedConfig::new(config)
    }
}
