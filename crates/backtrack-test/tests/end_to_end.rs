//! End-to-end lag compensation: lagged clients shooting at moving targets

use backtrack_compensation::{AllowAll, CommandContext, LagCompensationConfig, LagCompensator, StandardPolicy};
use backtrack_core::{ParticipantId, QAngle, Vec3};
use backtrack_history::ParticipantSource;
use backtrack_test::{init_test_tracing, ClientView, LaggedShot, MotionModel, SimulatedArena};
use backtrack_time::LatencyModel;

const TICK_RATE: u32 = 100;

struct Match {
    arena: SimulatedArena,
    comp: LagCompensator,
    view: ClientView,
    shooter: ParticipantId,
    target: ParticipantId,
}

impl Match {
    /// Still shooter south of a target running east at 320 u/s
    fn new(config: LagCompensationConfig, delay_ticks: usize) -> Self {
        init_test_tracing();

        let mut arena = SimulatedArena::new(TICK_RATE, 42).unwrap();
        let shooter = arena.spawn(1, Vec3::new(0.0, -600.0, 0.0), MotionModel::Still);
        let target = arena.spawn(2, Vec3::new(-300.0, 0.0, 0.0), MotionModel::runner());

        let mut comp = LagCompensator::new(config, arena.clock());
        comp.connect(shooter);
        comp.connect(target);

        Match {
            arena,
            comp,
            view: ClientView::new(delay_ticks),
            shooter,
            target,
        }
    }

    fn run(&mut self, ticks: usize) {
        for _ in 0..ticks {
            self.arena.step();
            self.comp.record_frame(&self.arena, self.arena.clock());
            self.view.observe(&self.arena);
        }
    }

    fn shot(&self) -> LaggedShot {
        LaggedShot::at_displayed(&self.arena, &self.view, self.shooter, self.target).unwrap()
    }
}

#[test]
fn test_lagged_shot_hits_with_compensation() {
    let mut m = Match::new(LagCompensationConfig::default(), 20);
    m.run(50);
    let before = m.arena.snapshot();

    let shot = m.shot();
    assert_eq!(shot.resolve_live(&m.arena), None, "target has run out of the line of fire");

    let hit = shot.resolve_compensated(&mut m.comp, &mut m.arena).unwrap();
    assert_eq!(hit.map(|h| h.participant), Some(m.target));

    assert_eq!(m.arena.snapshot(), before);
    assert!(!m.comp.is_active());
}

#[test]
fn test_low_latency_shot_hits_either_way() {
    let mut m = Match::new(LagCompensationConfig::default(), 1);
    m.run(30);

    let shot = m.shot();
    assert!(shot.resolve_live(&m.arena).is_some());
    assert!(shot.resolve_compensated(&mut m.comp, &mut m.arena).unwrap().is_some());
}

#[test]
fn test_disabled_compensation_misses() {
    let mut m = Match::new(LagCompensationConfig::disabled(), 20);
    m.run(50);

    let shot = m.shot();
    assert_eq!(shot.resolve_compensated(&mut m.comp, &mut m.arena).unwrap(), None);
    assert_eq!(m.comp.history().record_count(), 0);
}

#[test]
fn test_rewind_window_caps_reach() {
    let config = LagCompensationConfig {
        max_unlag: 0.05,
        ..LagCompensationConfig::default()
    };
    let mut m = Match::new(config, 40);
    m.run(60);

    let shot = m.shot();
    let clock = *m.arena.clock();
    let report = m.comp.begin(&mut m.arena, &clock, &shot.ctx, &AllowAll).unwrap();
    assert!(report.latency_fallback);
    assert_eq!(report.target_tick, Some(clock.tick() - 5));
    m.comp.end(&mut m.arena);

    assert_eq!(shot.resolve_compensated(&mut m.comp, &mut m.arena).unwrap(), None);
}

#[test]
fn test_teleport_since_displayed_not_compensated() {
    let mut m = Match::new(LagCompensationConfig::default(), 20);
    m.run(40);
    m.arena.teleport(m.target, Vec3::new(2000.0, 2000.0, 0.0));
    m.run(10);

    let shot = m.shot();
    let clock = *m.arena.clock();
    let report = m.comp.begin(&mut m.arena, &clock, &shot.ctx, &AllowAll).unwrap();
    assert_eq!(report.rewound, 0);
    assert_eq!(report.missed, 1);
    assert!(m.arena.live_state(m.target).unwrap().origin.x > 1900.0);
    m.comp.end(&mut m.arena);
}

#[test]
fn test_death_since_displayed_not_compensated() {
    let mut m = Match::new(LagCompensationConfig::default(), 20);
    m.run(40);
    m.arena.kill(m.target);
    m.run(2);
    m.arena.respawn(m.target, Vec3::new(-180.0, 0.0, 0.0));
    m.run(8);

    let shot = m.shot();
    let hit = shot.resolve_compensated(&mut m.comp, &mut m.arena).unwrap();
    assert_eq!(hit, None);
}

#[test]
fn test_crouched_history_restored() {
    let mut m = Match::new(LagCompensationConfig::default(), 20);
    m.arena.crouch(m.target, true);
    m.run(35);
    m.arena.crouch(m.target, false);
    m.run(15);
    let before = m.arena.snapshot();

    let shot = m.shot();
    let clock = *m.arena.clock();
    {
        let scope = m.comp.scope(&mut m.arena, &clock, &shot.ctx, &AllowAll).unwrap();
        let rewound = scope.live_state(m.target).unwrap();
        assert_eq!(rewound.bounds, backtrack_core::Bounds::crouched());
    }

    assert_eq!(m.arena.snapshot(), before);
}

#[test]
fn test_consecutive_requesters_share_history() {
    let mut m = Match::new(LagCompensationConfig::default(), 20);
    let second = m.arena.spawn(3, Vec3::new(0.0, 600.0, 0.0), MotionModel::Still);
    m.comp.connect(second);
    m.run(50);
    let before = m.arena.snapshot();
    let clock = *m.arena.clock();

    for (requester, ticks) in [(m.shooter, 20), (second, 5), (m.shooter, 10)] {
        let ctx = CommandContext::new(requester, clock.tick() - ticks).with_latency(clock.ticks_to_time(ticks), 0.0);
        let end_x = m
            .comp
            .compensate(&mut m.arena, &clock, &ctx, &AllowAll, |world| {
                world.live_state(ParticipantId::new(2)).unwrap().origin.x
            })
            .unwrap();
        let expected = -300.0 + 3.2 * (50 - ticks) as f32;
        assert!((end_x - expected).abs() < 1e-2, "requester {requester}: {end_x} vs {expected}");
        assert_eq!(m.arena.snapshot(), before);
    }
}

#[test]
fn test_standard_policy_limits_targets() {
    let mut m = Match::new(LagCompensationConfig::default(), 20);
    m.run(50);
    let clock = *m.arena.clock();
    let policy = StandardPolicy::new(320.0, m.comp.config().clone());

    // looking north, toward the target's lane
    let ctx = CommandContext::new(m.shooter, clock.tick() - 20)
        .with_latency(0.2, 0.0)
        .with_view_angles(QAngle::new(0.0, 90.0, 0.0));
    let report = m.comp.begin(&mut m.arena, &clock, &ctx, &policy).unwrap();
    assert_eq!(report.rewound, 1);
    m.comp.end(&mut m.arena);

    // looking south, away from it
    let ctx = ctx.with_view_angles(QAngle::new(0.0, -90.0, 0.0));
    let report = m.comp.begin(&mut m.arena, &clock, &ctx, &policy).unwrap();
    assert_eq!(report.rewound, 0);
    assert_eq!(report.skipped, 1);
    m.comp.end(&mut m.arena);
}

#[test]
fn test_fix_stuck_keeps_target_clear_of_blocker() {
    let mut m = Match::new(LagCompensationConfig::competitive(), 15);
    m.run(45);

    // someone now stands where the target was 15 ticks before the shot
    let blocker = m.arena.spawn(3, Vec3::new(-300.0 + 3.2 * 35.0, 0.0, 0.0), MotionModel::Still);
    m.comp.connect(blocker);
    m.run(5);

    let shot = m.shot();
    let clock = *m.arena.clock();
    let live_x = m.arena.live_state(m.target).unwrap().origin.x;
    {
        let scope = m.comp.scope(&mut m.arena, &clock, &shot.ctx, &AllowAll).unwrap();
        assert_eq!(scope.begin_report().rewound, 1);

        let rewound = scope.live_state(m.target).unwrap();
        assert!(rewound.origin.x < live_x, "moved back toward history");
        assert!(rewound.origin.x > -300.0 + 3.2 * 35.0 + 32.0, "stopped short of the blocker");
        assert_eq!(scope.obstruction_at(m.target, &rewound.bounds, rewound.origin), None);
    }

    assert_eq!(m.arena.live_state(m.target).unwrap().origin.x, live_x);
}

#[test]
fn test_latency_from_rtt_samples() {
    let mut m = Match::new(LagCompensationConfig::default(), 10);
    let mut latency = LatencyModel::new();
    for _ in 0..16 {
        latency.record_rtt(m.shooter, 0.2);
    }
    m.run(40);

    let shot = m.shot();
    let ctx = CommandContext::new(m.shooter, shot.ctx.command_tick).with_latency(latency.outgoing_latency(m.shooter), 0.0);
    let shot = LaggedShot { ctx, ..shot };

    assert_eq!(shot.resolve_live(&m.arena), None);
    let hit = shot.resolve_compensated(&mut m.comp, &mut m.arena).unwrap();
    assert_eq!(hit.map(|h| h.participant), Some(m.target));
}
