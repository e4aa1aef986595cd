//! Tick clock - fixed-interval simulation time

use backtrack_core::{BacktrackError, BacktrackResult, SimTime, Tick};

/// Default server tick interval (66.67 Hz)
pub const DEFAULT_TICK_INTERVAL: f64 = 0.015;

/// Fixed-rate simulation clock
/// INVARIANT: interval is finite and strictly positive
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TickClock {
    /// Seconds per tick
    interval: f64,
    /// Current tick
    tick: Tick,
}

impl TickClock {
    /// Create a clock with the given tick interval (seconds), starting at tick zero
    pub fn from_interval_secs(interval: f64) -> BacktrackResult<Self> {
        if !interval.is_finite() || interval <= 0.0 {
            return Err(BacktrackError::InvalidConfig(format!(
                "tick interval must be positive, got {interval}"
            )));
        }
        Ok(TickClock {
            interval,
            tick: Tick::ZERO,
        })
    }

    /// Create a clock running at `rate` ticks per second
    pub fn from_tick_rate(rate: u32) -> BacktrackResult<Self> {
        if rate == 0 {
            return Err(BacktrackError::InvalidConfig("tick rate must be non-zero".into()));
        }
        Self::from_interval_secs(1.0 / rate as f64)
    }

    /// Start the clock at a specific tick
    pub fn at_tick(mut self, tick: Tick) -> Self {
        self.tick = tick;
        self
    }

    /// Advance by one tick and return the new tick
    pub fn advance(&mut self) -> Tick {
        self.tick = self.tick + 1;
        self.tick
    }

    /// Current tick
    pub fn tick(&self) -> Tick {
        self.tick
    }

    /// Seconds per tick
    pub fn interval(&self) -> f64 {
        self.interval
    }

    /// Simulation time of the current tick
    pub fn now(&self) -> SimTime {
        self.tick_to_time(self.tick)
    }

    /// Round a duration in seconds to the nearest whole tick count
    pub fn time_to_ticks(&self, secs: f64) -> i32 {
        (0.5 + secs / self.interval).floor() as i32
    }

    /// Duration in seconds of a whole tick count
    pub fn ticks_to_time(&self, ticks: i32) -> f64 {
        self.interval * ticks as f64
    }

    pub fn tick_to_time(&self, tick: Tick) -> SimTime {
        SimTime(self.ticks_to_time(tick.value()))
    }

    /// Number of ticks needed to cover `secs` of history, rounded up
    pub fn ticks_covering(&self, secs: f64) -> usize {
        // tolerate rounding in 1/rate intervals
        (secs / self.interval - 1e-9).ceil().max(0.0) as usize
    }
}

impl Default for TickClock {
    fn default() -> Self {
        TickClock {
            interval: DEFAULT_TICK_INTERVAL,
            tick: Tick::ZERO,
        }
    }
}
