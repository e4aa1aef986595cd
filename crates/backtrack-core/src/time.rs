//! Time primitives for lag compensation
//!
//! Two notions of time flow through the system:
//! - SimTime: simulation time in seconds, what history records are stamped with
//! - Tick: the server's discrete frame counter, what commands are stamped with
//!
//! Conversion between the two lives with the tick clock in `backtrack-time`.

use std::fmt;
use std::ops::{Add, Sub};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Simulation time in seconds since server start
#[derive(Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct SimTime(pub f64);

impl SimTime {
    pub const ZERO: SimTime = SimTime(0.0);

    #[inline]
    pub fn from_secs(secs: f64) -> Self {
        SimTime(secs)
    }

    #[inline]
    pub fn from_millis(millis: i64) -> Self {
        SimTime(millis as f64 / 1000.0)
    }

    #[inline]
    pub fn as_secs(self) -> f64 {
        self.0
    }

    #[inline]
    pub fn as_millis(self) -> f64 {
        self.0 * 1000.0
    }

    #[inline]
    pub fn is_finite(self) -> bool {
        self.0.is_finite()
    }

    /// Seconds elapsed from `earlier` to `self` (negative if `earlier` is later)
    #[inline]
    pub fn secs_since(self, earlier: SimTime) -> f64 {
        self.0 - earlier.0
    }

    /// Move back by `secs`, used for retention horizons
    #[inline]
    pub fn back_by(self, secs: f64) -> Self {
        SimTime(self.0 - secs)
    }

    #[inline]
    pub fn max(self, other: SimTime) -> Self {
        if other.0 > self.0 {
            other
        } else {
            self
        }
    }
}

impl Add<Duration> for SimTime {
    type Output = SimTime;

    #[inline]
    fn add(self, rhs: Duration) -> Self::Output {
        SimTime(self.0 + rhs.as_secs_f64())
    }
}

impl Sub<Duration> for SimTime {
    type Output = SimTime;

    #[inline]
    fn sub(self, rhs: Duration) -> Self::Output {
        SimTime(self.0 - rhs.as_secs_f64())
    }
}

impl fmt::Debug for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t({:.4}s)", self.0)
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4}s", self.0)
    }
}

/// Server tick number
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Tick(pub i32);

impl Tick {
    pub const ZERO: Tick = Tick(0);

    #[inline]
    pub fn new(tick: i32) -> Self {
        Tick(tick)
    }

    #[inline]
    pub fn value(self) -> i32 {
        self.0
    }
}

impl Add<i32> for Tick {
    type Output = Tick;

    #[inline]
    fn add(self, rhs: i32) -> Self::Output {
        Tick(self.0.saturating_add(rhs))
    }
}

impl Sub<i32> for Tick {
    type Output = Tick;

    #[inline]
    fn sub(self, rhs: i32) -> Self::Output {
        Tick(self.0.saturating_sub(rhs))
    }
}

impl Sub<Tick> for Tick {
    type Output = i32;

    #[inline]
    fn sub(self, rhs: Tick) -> Self::Output {
        self.0.saturating_sub(rhs.0)
    }
}

impl fmt::Debug for Tick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tick({})", self.0)
    }
}
