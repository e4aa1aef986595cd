//! Hit-scan harness - what a lagged client saw, and what its shot hits
//!
//! A client renders other participants some ticks in the past. `ClientView`
//! reproduces that delay from arena snapshots, `HitScan` resolves a shot
//! against whatever world it is given: live, or rewound by the compensator.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Once;

use backtrack_compensation::{AllowAll, CommandContext, CompensationPolicy, LagCompensator};
use backtrack_core::{BacktrackResult, ParticipantId, ParticipantState, Tick, Vec3};
use backtrack_history::ParticipantSource;
use tracing_subscriber::EnvFilter;

use crate::SimulatedArena;

/// Default hit-scan range (world units)
pub const DEFAULT_RANGE: f32 = 8192.0;

/// Install a `tracing` subscriber for test output.
///
/// Honors `RUST_LOG`, defaulting to `warn`. Safe to call from every test.
pub fn init_test_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
            .with_test_writer()
            .try_init();
    });
}

/// Participant hit by a shot
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Hit {
    pub participant: ParticipantId,
    /// Distance from the muzzle
    pub distance: f32,
}

/// Instant-hit ray
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HitScan {
    pub start: Vec3,
    /// Unit direction
    pub dir: Vec3,
    pub range: f32,
}

impl HitScan {
    pub fn new(start: Vec3, dir: Vec3) -> Self {
        HitScan {
            start,
            dir: dir.normalize_or_zero(),
            range: DEFAULT_RANGE,
        }
    }

    /// Shot from `shooter`'s center toward `target`'s center
    pub fn aimed_at(shooter: &ParticipantState, target: &ParticipantState) -> Self {
        let start = shooter.center();
        Self::new(start, target.center() - start)
    }

    /// Closest live participant other than `shooter` along the ray
    pub fn trace<S>(&self, world: &S, shooter: ParticipantId) -> Option<Hit>
    where
        S: ParticipantSource + ?Sized,
    {
        world
            .participant_ids()
            .into_iter()
            .filter(|id| *id != shooter)
            .filter_map(|id| world.live_state(id))
            .filter(|state| state.alive)
            .filter_map(|state| {
                state
                    .bounds
                    .ray_hit(state.origin, self.start, self.dir, self.range)
                    .map(|distance| Hit {
                        participant: state.id,
                        distance,
                    })
            })
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
    }
}

/// What one client is currently displaying
#[derive(Debug, Clone)]
pub struct ClientView {
    /// Ticks between the server state and what the client renders
    delay_ticks: usize,
    /// Oldest first
    frames: VecDeque<(Tick, BTreeMap<ParticipantId, ParticipantState>)>,
}

impl ClientView {
    pub fn new(delay_ticks: usize) -> Self {
        ClientView {
            delay_ticks,
            frames: VecDeque::with_capacity(delay_ticks + 1),
        }
    }

    pub fn delay_ticks(&self) -> usize {
        self.delay_ticks
    }

    /// Receive the arena state for the current tick
    pub fn observe(&mut self, arena: &SimulatedArena) {
        if self.frames.len() > self.delay_ticks {
            self.frames.pop_front();
        }
        self.frames.push_back((arena.clock().tick(), arena.snapshot()));
    }

    /// Tick of the frame on screen, once enough frames have arrived
    pub fn displayed_tick(&self) -> Option<Tick> {
        self.displayed_frame().map(|(tick, _)| *tick)
    }

    /// State of `id` as the client sees it
    pub fn displayed(&self, id: ParticipantId) -> Option<ParticipantState> {
        self.displayed_frame().and_then(|(_, frame)| frame.get(&id).copied())
    }

    fn displayed_frame(&self) -> Option<&(Tick, BTreeMap<ParticipantId, ParticipantState>)> {
        if self.frames.len() > self.delay_ticks {
            self.frames.front()
        } else {
            None
        }
    }
}

/// Shot fired by a lagged client at a participant it sees
#[derive(Clone, Debug)]
pub struct LaggedShot {
    pub ctx: CommandContext,
    pub scan: HitScan,
}

impl LaggedShot {
    /// Aim at `target` as displayed by `view`. The command carries the
    /// displayed tick and a latency matching the view delay.
    pub fn at_displayed(
        arena: &SimulatedArena,
        view: &ClientView,
        shooter: ParticipantId,
        target: ParticipantId,
    ) -> Option<Self> {
        let me = arena.live_state(shooter)?;
        let seen = view.displayed(target)?;
        let tick = view.displayed_tick()?;
        let latency = arena.clock().ticks_to_time(view.delay_ticks() as i32);

        Some(LaggedShot {
            ctx: CommandContext::new(shooter, tick).with_latency(latency, 0.0),
            scan: HitScan::aimed_at(&me, &seen),
        })
    }

    /// Resolve against the live world, as a server without compensation would
    pub fn resolve_live(&self, arena: &SimulatedArena) -> Option<Hit> {
        self.scan.trace(arena, self.ctx.requester)
    }

    /// Resolve inside a compensation bracket
    pub fn resolve_compensated(
        &self,
        comp: &mut LagCompensator,
        arena: &mut SimulatedArena,
    ) -> BacktrackResult<Option<Hit>> {
        self.resolve_with(comp, arena, &AllowAll)
    }

    pub fn resolve_with<P>(
        &self,
        comp: &mut LagCompensator,
        arena: &mut SimulatedArena,
        policy: &P,
    ) -> BacktrackResult<Option<Hit>>
    where
        P: CompensationPolicy + ?Sized,
    {
        let clock = *arena.clock();
        comp.compensate(arena, &clock, &self.ctx, policy, |world| {
            self.scan.trace(&*world, self.ctx.requester)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MotionModel;
    use backtrack_core::SimTime;

    #[test]
    fn test_hit_scan_picks_closest() {
        let mut world = BTreeMap::new();
        for (id, x) in [(1, 0.0), (2, 300.0), (3, 200.0)] {
            let id = ParticipantId::new(id);
            world.insert(id, ParticipantState::new(id, Vec3::new(x, 0.0, 0.0), SimTime::ZERO));
        }

        let scan = HitScan::new(Vec3::new(0.0, 0.0, 36.0), Vec3::new(1.0, 0.0, 0.0));
        let hit = scan.trace(&world, ParticipantId::new(1)).unwrap();
        assert_eq!(hit.participant, ParticipantId::new(3));
        assert!((hit.distance - 184.0).abs() < 1e-3);
    }

    #[test]
    fn test_hit_scan_ignores_dead() {
        let mut world = BTreeMap::new();
        let id = ParticipantId::new(2);
        world.insert(id, ParticipantState::new(id, Vec3::new(100.0, 0.0, 0.0), SimTime::ZERO).dead());

        let scan = HitScan::new(Vec3::new(0.0, 0.0, 36.0), Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(scan.trace(&world, ParticipantId::new(1)), None);
    }

    #[test]
    fn test_client_view_delay() {
        let mut arena = SimulatedArena::new(100, 3).unwrap();
        let runner = arena.spawn(1, Vec3::ZERO, MotionModel::runner());
        let mut view = ClientView::new(3);

        for _ in 0..3 {
            arena.step();
            view.observe(&arena);
            assert_eq!(view.displayed(runner), None);
        }

        arena.step();
        view.observe(&arena);
        assert_eq!(view.displayed_tick(), Some(arena.clock().tick() - 3));
        assert!((view.displayed(runner).unwrap().origin.x - 3.2).abs() < 1e-3);
    }
}
