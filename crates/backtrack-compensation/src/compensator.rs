//! Lag compensator - the begin/end bracket around a requester's command
//!
//! Begin rewinds every participant the requester may compensate against to the
//! moment the requester saw them. End puts them back. Everything between the
//! two (hit detection, damage) runs against the rewound world.

use std::collections::BTreeMap;
use std::ops::{Deref, DerefMut};

use backtrack_core::{BacktrackError, BacktrackResult, ParticipantId, ParticipantState, SimTime, Tick, Vec3};
use backtrack_history::{HistoryRecorder, HistoryStore, RecordReport};
use backtrack_time::{TargetTime, TickClock};

use crate::{
    CommandContext, CompensationPolicy, LagCompensationConfig, ParticipantWorld, RestoreSnapshot, RewindEngine,
    RewoundState, SharedConfig,
};

/// Share of a blocked path a stuck participant is moved along
const UNSTICK_FRACTION_SCALE: f32 = 0.95;

/// Outcome of [`LagCompensator::begin`]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BeginReport {
    pub requester: ParticipantId,
    /// Time the world was rewound to; `None` when the bracket is a no-op
    pub target_time: Option<SimTime>,
    pub target_tick: Option<Tick>,
    /// Command tick was discarded in favor of the latency estimate
    pub latency_fallback: bool,
    /// Participants moved to their historical state
    pub rewound: u32,
    /// Participants without usable history (or already at their historical state)
    pub missed: u32,
    /// Participants excluded by liveness, connection or policy
    pub skipped: u32,
}

impl BeginReport {
    fn idle(requester: ParticipantId) -> Self {
        BeginReport {
            requester,
            target_time: None,
            target_tick: None,
            latency_fallback: false,
            rewound: 0,
            missed: 0,
            skipped: 0,
        }
    }

    fn targeting(requester: ParticipantId, target: &TargetTime) -> Self {
        BeginReport {
            target_time: Some(target.time),
            target_tick: Some(target.tick),
            latency_fallback: target.latency_fallback,
            ..Self::idle(requester)
        }
    }

    /// Whether Begin did nothing at all
    pub fn is_idle(&self) -> bool {
        self.target_time.is_none()
    }
}

/// Outcome of [`LagCompensator::end`]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EndReport {
    /// Fields reverted to their pre-rewind values
    pub restored_fields: u32,
    /// Fields left alone because the simulation changed them inside the bracket
    pub kept_fields: u32,
    /// Participants that had been rewound
    pub participants: u32,
}

/// Per-bracket state threaded through the rewind of each participant
struct Bracket<'c> {
    requester: ParticipantId,
    time: SimTime,
    config: &'c LagCompensationConfig,
    engine: RewindEngine,
    /// Participants currently being rewound; guards fix-stuck recursion
    in_progress: Vec<ParticipantId>,
}

/// Server-side lag compensator.
///
/// Owns the participant history and the restore table of the open bracket.
/// Call [`record_frame`](Self::record_frame) once per tick after simulation,
/// then bracket each requester's command with [`scope`](Self::scope) or
/// [`compensate`](Self::compensate).
#[derive(Debug)]
pub struct LagCompensator {
    config: SharedConfig,
    recorder: HistoryRecorder,
    /// Snapshots of the open bracket, keyed by participant
    restore: BTreeMap<ParticipantId, RestoreSnapshot>,
    /// Requester of the open bracket
    active: Option<ParticipantId>,
}

impl LagCompensator {
    /// Compensator with history sized for the clock's tick rate
    pub fn new(config: impl Into<SharedConfig>, clock: &TickClock) -> Self {
        LagCompensator {
            config: config.into(),
            recorder: HistoryRecorder::for_clock(clock),
            restore: BTreeMap::new(),
            active: None,
        }
    }

    pub fn config(&self) -> &SharedConfig {
        &self.config
    }

    pub fn history(&self) -> &HistoryStore {
        self.recorder.store()
    }

    pub fn connect(&mut self, id: ParticipantId) {
        tracing::debug!(participant = %id, "participant connected");
        self.recorder.connect(id);
    }

    pub fn disconnect(&mut self, id: ParticipantId) {
        tracing::debug!(participant = %id, "participant disconnected");
        self.recorder.disconnect(id);
        self.restore.remove(&id);
    }

    /// Whether a bracket is open
    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Participants rewound by the open bracket
    pub fn rewound(&self) -> impl Iterator<Item = ParticipantId> + '_ {
        self.restore.keys().copied()
    }

    /// Record the current frame into history. Run once per tick, after every
    /// participant has been simulated.
    pub fn record_frame<W>(&mut self, world: &W, clock: &TickClock) -> RecordReport
    where
        W: ParticipantWorld + ?Sized,
    {
        let retention = self.config.snapshot().retention();
        self.recorder.record_frame(world, clock.now(), retention)
    }

    /// Rewind everyone `ctx.requester` may compensate against.
    ///
    /// Must be paired with [`end`](Self::end) before the next `begin`, even
    /// when the bracket turns out to be a no-op.
    pub fn begin<W, P>(
        &mut self,
        world: &mut W,
        clock: &TickClock,
        ctx: &CommandContext,
        policy: &P,
    ) -> BacktrackResult<BeginReport>
    where
        W: ParticipantWorld + ?Sized,
        P: CompensationPolicy + ?Sized,
    {
        if let Some(requester) = self.active {
            return Err(BacktrackError::CompensationActive { requester });
        }

        let requester = world
            .live_state(ctx.requester)
            .ok_or(BacktrackError::UnknownParticipant(ctx.requester))?;

        self.active = Some(ctx.requester);

        let config = self.config.snapshot();
        if !config.enabled || !ctx.wants_compensation || self.recorder.store().len() <= 1 {
            return Ok(BeginReport::idle(ctx.requester));
        }

        let target = clock.target_time(&ctx.timing(), config.effective_max_unlag());
        let mut report = BeginReport::targeting(ctx.requester, &target);
        let mut bracket = Bracket {
            requester: ctx.requester,
            time: target.time,
            config: &config,
            engine: RewindEngine::from_config(&config),
            in_progress: Vec::new(),
        };

        for id in world.participant_ids() {
            if id == ctx.requester || self.restore.contains_key(&id) {
                continue;
            }

            let Some(state) = world.live_state(id) else {
                continue;
            };

            let eligible = state.alive
                && self.recorder.store().is_connected(id)
                && policy.should_compensate(&requester, &state, ctx);
            if !eligible {
                report.skipped += 1;
                continue;
            }

            if self.backtrack(world, &state, &mut bracket) {
                report.rewound += 1;
            } else {
                report.missed += 1;
            }
        }

        tracing::debug!(
            requester = %ctx.requester,
            target_tick = target.tick.value(),
            correction = target.correction,
            rewound = report.rewound,
            missed = report.missed,
            skipped = report.skipped,
            "lag compensation started"
        );

        Ok(report)
    }

    /// Restore every participant rewound by the open bracket.
    ///
    /// Fields the simulation changed inside the bracket keep their new value.
    /// Without an open bracket this does nothing.
    pub fn end<W>(&mut self, world: &mut W) -> EndReport
    where
        W: ParticipantWorld + ?Sized,
    {
        let Some(requester) = self.active.take() else {
            return EndReport::default();
        };

        let mut report = EndReport::default();
        for (_, snapshot) in std::mem::take(&mut self.restore) {
            let outcome = snapshot.restore(world);
            report.restored_fields += outcome.restored;
            report.kept_fields += outcome.kept;
            report.participants += 1;
        }

        if report.kept_fields > 0 {
            tracing::debug!(
                requester = %requester,
                kept = report.kept_fields,
                "fields changed during compensation were left in place"
            );
        }

        report
    }

    /// Open a bracket that ends when the returned guard is dropped
    pub fn scope<'a, W, P>(
        &'a mut self,
        world: &'a mut W,
        clock: &TickClock,
        ctx: &CommandContext,
        policy: &P,
    ) -> BacktrackResult<CompensationScope<'a, W>>
    where
        W: ParticipantWorld + ?Sized,
        P: CompensationPolicy + ?Sized,
    {
        let report = self.begin(world, clock, ctx, policy)?;
        Ok(CompensationScope {
            compensator: self,
            world,
            report,
            finished: false,
        })
    }

    /// Run `f` against the rewound world, restoring afterwards even if `f` panics
    pub fn compensate<W, P, R, F>(
        &mut self,
        world: &mut W,
        clock: &TickClock,
        ctx: &CommandContext,
        policy: &P,
        f: F,
    ) -> BacktrackResult<R>
    where
        W: ParticipantWorld + ?Sized,
        P: CompensationPolicy + ?Sized,
        F: FnOnce(&mut W) -> R,
    {
        let mut scope = self.scope(world, clock, ctx, policy)?;
        let result = f(&mut *scope);
        scope.finish();
        Ok(result)
    }

    /// Rewind one participant; returns whether anything was overwritten
    fn backtrack<W>(&mut self, world: &mut W, live: &ParticipantState, bracket: &mut Bracket<'_>) -> bool
    where
        W: ParticipantWorld + ?Sized,
    {
        let Some(track) = self.recorder.store().track(live.id) else {
            return false;
        };

        let rewound = match bracket.engine.rewind_from(track, bracket.time, live.origin) {
            Ok(rewound) => rewound,
            Err(miss) => {
                tracing::debug!(participant = %live.id, %miss, "not compensated");
                return false;
            }
        };

        let origin = if bracket.config.fix_stuck {
            self.unstick(world, live, &rewound, bracket)
        } else {
            rewound.origin
        };

        let Some(snapshot) = RestoreSnapshot::diff(live, origin, rewound.angles, rewound.bounds) else {
            return false;
        };

        tracing::trace!(participant = %live.id, changes = snapshot.changes.len(), "rewound");
        snapshot.apply(world, rewound.timestamp);
        self.restore.insert(live.id, snapshot);
        true
    }

    /// Keep a rewound origin out of solid space
    fn unstick<W>(
        &mut self,
        world: &mut W,
        live: &ParticipantState,
        rewound: &RewoundState,
        bracket: &mut Bracket<'_>,
    ) -> Vec3
    where
        W: ParticipantWorld + ?Sized,
    {
        let trace = world.trace_hull(live.id, rewound.bounds, rewound.origin, rewound.origin);
        if !trace.start_solid {
            return rewound.origin;
        }

        // Blocked by someone who will be rewound out of the way: do them first
        if let Some(blocker) = trace.hit {
            if blocker != bracket.requester
                && blocker != live.id
                && !self.restore.contains_key(&blocker)
                && !bracket.in_progress.contains(&blocker)
            {
                if let Some(state) = world.live_state(blocker).filter(|s| s.alive) {
                    bracket.in_progress.push(live.id);
                    self.backtrack(world, &state, bracket);
                    bracket.in_progress.pop();

                    let retry = world.trace_hull(live.id, rewound.bounds, rewound.origin, rewound.origin);
                    if !retry.start_solid {
                        return rewound.origin;
                    }
                }
            }
        }

        let path = world.trace_hull(live.id, rewound.bounds, live.origin, rewound.origin);
        if path.start_solid {
            tracing::warn!(participant = %live.id, "live position is solid, keeping rewound origin");
            return rewound.origin;
        }

        live.origin.lerp(rewound.origin, path.fraction * UNSTICK_FRACTION_SCALE)
    }
}

/// Open compensation bracket.
///
/// Dereferences to the rewound world. Dropping the guard (including during a
/// panic) ends the bracket.
pub struct CompensationScope<'a, W: ParticipantWorld + ?Sized> {
    compensator: &'a mut LagCompensator,
    world: &'a mut W,
    report: BeginReport,
    finished: bool,
}

impl<'a, W: ParticipantWorld + ?Sized> CompensationScope<'a, W> {
    pub fn begin_report(&self) -> &BeginReport {
        &self.report
    }

    /// End the bracket now and report what was restored
    pub fn finish(mut self) -> EndReport {
        self.finished = true;
        self.compensator.end(self.world)
    }
}

impl<W: ParticipantWorld + ?Sized> Deref for CompensationScope<'_, W> {
    type Target = W;

    fn deref(&self) -> &W {
        self.world
    }
}

impl<W: ParticipantWorld + ?Sized> DerefMut for CompensationScope<'_, W> {
    fn deref_mut(&mut self) -> &mut W {
        self.world
    }
}

impl<W: ParticipantWorld + ?Sized> Drop for CompensationScope<'_, W> {
    fn drop(&mut self) {
        if !self.finished {
            self.compensator.end(self.world);
        }
    }
}
