//! Target time computation - where in the past a requester's command happened

use backtrack_core::{SimTime, Tick};

use crate::TickClock;

/// Largest accepted disagreement between the command's tick and the
/// latency estimate before the latency estimate wins (seconds)
pub const MAX_CLOCK_DISAGREEMENT: f64 = 0.2;

/// Timing carried by a requester's command
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CommandTiming {
    /// Tick the client stamped on the command
    pub command_tick: Tick,
    /// Server -> client latency (seconds)
    pub outgoing_latency: f64,
    /// Client view interpolation delay (seconds)
    pub lerp_time: f64,
}

/// Resolved rewind target for one command
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TargetTime {
    /// Tick the world is rewound to
    pub tick: Tick,
    /// Simulation time of `tick`
    pub time: SimTime,
    /// Latency + interpolation correction after clamping (seconds)
    pub correction: f64,
    /// Whether the command tick was discarded in favor of the latency estimate
    pub latency_fallback: bool,
}

/// Compute the rewind target for a command processed at the clock's current tick.
///
/// The correction is the requester's outgoing latency plus its interpolation
/// delay rounded to whole ticks, clamped to `[0, max_unlag]`. The command's own
/// tick (less the interpolation ticks) is trusted unless it disagrees with the
/// correction by more than [`MAX_CLOCK_DISAGREEMENT`], in which case the target
/// is derived from the correction alone.
pub fn target_time(clock: &TickClock, timing: &CommandTiming, max_unlag: f64) -> TargetTime {
    let latency = finite_or_zero(timing.outgoing_latency);
    let lerp = finite_or_zero(timing.lerp_time);
    let max_unlag = finite_or_zero(max_unlag).max(0.0);

    let lerp_ticks = clock.time_to_ticks(lerp);
    let correction = (latency + clock.ticks_to_time(lerp_ticks)).clamp(0.0, max_unlag);

    let now = clock.tick();
    let mut tick = timing.command_tick - lerp_ticks;

    let delta = correction - clock.ticks_to_time(now - tick);
    let latency_fallback = delta.abs() > MAX_CLOCK_DISAGREEMENT;
    if latency_fallback {
        tracing::debug!(
            command_tick = timing.command_tick.value(),
            current_tick = now.value(),
            delta,
            "command tick disagrees with latency, using latency estimate"
        );
        tick = now - clock.time_to_ticks(correction);
    }

    TargetTime {
        tick,
        time: clock.tick_to_time(tick),
        correction,
        latency_fallback,
    }
}

fn finite_or_zero(v: f64) -> f64 {
    if v.is_finite() {
        v
    } else {
        0.0
    }
}

impl TickClock {
    /// See [`target_time`]
    pub fn target_time(&self, timing: &CommandTiming, max_unlag: f64) -> TargetTime {
        target_time(self, timing, max_unlag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clock_at(tick: i32) -> TickClock {
        TickClock::default().at_tick(Tick::new(tick))
    }

    #[test]
    fn test_correction_is_latency_plus_lerp_ticks() {
        let clock = clock_at(1000);
        let timing = CommandTiming {
            command_tick: Tick::new(1000),
            outgoing_latency: 0.05,
            lerp_time: 0.1,
        };

        let target = clock.target_time(&timing, 1.0);
        let lerp_ticks = clock.time_to_ticks(0.1);
        let expected = (0.05 + lerp_ticks as f64 * 0.015).clamp(0.0, 1.0);

        assert_eq!(lerp_ticks, 7);
        assert!((target.correction - expected).abs() < 1e-12);
        assert!(!target.latency_fallback);
        assert_eq!(target.tick, Tick::new(993));
        assert!((target.time.as_secs() - 993.0 * 0.015).abs() < 1e-9);
    }

    #[test]
    fn test_correction_clamped_to_max_unlag() {
        let clock = clock_at(1000);
        let timing = CommandTiming {
            command_tick: Tick::new(1000),
            outgoing_latency: 2.5,
            lerp_time: 0.1,
        };

        let target = clock.target_time(&timing, 1.0);
        assert!((target.correction - 1.0).abs() < 1e-12);

        let target = clock.target_time(&timing, 0.0);
        assert_eq!(target.correction, 0.0);
    }

    #[test]
    fn test_skewed_command_tick_falls_back_to_latency() {
        let clock = clock_at(1000);
        let timing = CommandTiming {
            // client claims a tick 1.6s in the past
            command_tick: Tick::new(900),
            outgoing_latency: 0.05,
            lerp_time: 0.1,
        };

        let target = clock.target_time(&timing, 1.0);
        assert!(target.latency_fallback);
        // 0.155s -> 10 ticks
        assert_eq!(target.tick, Tick::new(990));
    }

    #[test]
    fn test_future_command_tick_falls_back() {
        let clock = clock_at(1000);
        let timing = CommandTiming {
            command_tick: Tick::new(1100),
            outgoing_latency: 0.0,
            lerp_time: 0.0,
        };

        let target = clock.target_time(&timing, 1.0);
        assert!(target.latency_fallback);
        assert_eq!(target.tick, Tick::new(1000));
    }

    #[test]
    fn test_non_finite_inputs_treated_as_zero() {
        let clock = clock_at(50);
        let timing = CommandTiming {
            command_tick: Tick::new(50),
            outgoing_latency: f64::NAN,
            lerp_time: f64::INFINITY,
        };

        let target = clock.target_time(&timing, 1.0);
        assert_eq!(target.correction, 0.0);
        assert_eq!(target.tick, Tick::new(50));
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prop_target_respects_window(
                now in 100i32..100_000,
                behind in -50i32..500,
                latency in 0.0f64..3.0,
                lerp in 0.0f64..0.5,
                max_unlag in 0.0f64..1.0,
            ) {
                let clock = clock_at(now);
                let timing = CommandTiming {
                    command_tick: Tick::new(now - behind),
                    outgoing_latency: latency,
                    lerp_time: lerp,
                };

                let target = clock.target_time(&timing, max_unlag);
                prop_assert!(target.correction >= 0.0 && target.correction <= max_unlag);

                if target.latency_fallback {
                    prop_assert_eq!(target.tick, clock.tick() - clock.time_to_ticks(target.correction));
                } else {
                    let rewound = clock.ticks_to_time(clock.tick() - target.tick);
                    prop_assert!((target.correction - rewound).abs() <= MAX_CLOCK_DISAGREEMENT);
                }
            }
        }
    }
}
