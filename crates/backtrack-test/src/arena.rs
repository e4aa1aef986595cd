//! Arena Simulator - deterministic multi-participant world for lag compensation tests
//!
//! Simulates:
//! - Participants moving under simple motion models
//! - Deaths, respawns, teleports and crouching
//! - Static solid boxes for hull traces
//!
//! All randomness comes from a seeded RNG, so a seed reproduces a run exactly.

use std::collections::BTreeMap;

use backtrack_compensation::{HullTrace, ParticipantWorld};
use backtrack_core::{BacktrackResult, Bounds, ParticipantId, ParticipantState, QAngle, SimTime, Vec3};
use backtrack_history::ParticipantSource;
use backtrack_time::TickClock;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Sub-steps used to sweep a hull along a path
const TRACE_STEPS: u32 = 32;

/// Movement model for a simulated participant
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MotionModel {
    /// Does not move
    Still,
    /// Constant velocity (units per second)
    Linear(Vec3),
    /// Constant speed with a randomly drifting heading
    Wander { speed: f32, turn_rate: f32 },
}

impl MotionModel {
    /// Full-speed run along +x
    pub fn runner() -> Self {
        MotionModel::Linear(Vec3::new(320.0, 0.0, 0.0))
    }

    /// Walking pace with frequent turns
    pub fn wanderer() -> Self {
        MotionModel::Wander {
            speed: 150.0,
            turn_rate: 0.3,
        }
    }
}

/// Participant living in the arena
#[derive(Clone, Debug)]
pub struct SimulatedParticipant {
    pub state: ParticipantState,
    pub motion: MotionModel,
    /// Heading for wandering motion (radians)
    heading: f32,
}

/// Something a hull ran into
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Obstruction {
    /// Static world geometry
    Solid,
    Participant(ParticipantId),
}

impl Obstruction {
    pub fn participant(self) -> Option<ParticipantId> {
        match self {
            Obstruction::Solid => None,
            Obstruction::Participant(id) => Some(id),
        }
    }
}

/// Deterministic arena with a tick clock
pub struct SimulatedArena {
    clock: TickClock,
    participants: BTreeMap<ParticipantId, SimulatedParticipant>,
    /// Static boxes as (origin, bounds)
    solids: Vec<(Vec3, Bounds)>,
    rng: StdRng,
}

impl SimulatedArena {
    pub fn new(tick_rate: u32, seed: u64) -> BacktrackResult<Self> {
        Ok(SimulatedArena {
            clock: TickClock::from_tick_rate(tick_rate)?,
            participants: BTreeMap::new(),
            solids: Vec::new(),
            rng: StdRng::seed_from_u64(seed),
        })
    }

    pub fn clock(&self) -> &TickClock {
        &self.clock
    }

    pub fn now(&self) -> SimTime {
        self.clock.now()
    }

    /// Add a participant; returns its id
    pub fn spawn(&mut self, id: u32, origin: Vec3, motion: MotionModel) -> ParticipantId {
        let id = ParticipantId::new(id);
        let heading = self.rng.gen_range(0.0..std::f32::consts::TAU);
        self.participants.insert(
            id,
            SimulatedParticipant {
                state: ParticipantState::new(id, origin, self.clock.now()),
                motion,
                heading,
            },
        );
        id
    }

    /// Spawn `count` wandering participants at random spots within `radius`
    pub fn populate(&mut self, first_id: u32, count: u32, radius: f32) -> Vec<ParticipantId> {
        (first_id..first_id + count)
            .map(|id| {
                let origin = Vec3::new(
                    self.rng.gen_range(-radius..radius),
                    self.rng.gen_range(-radius..radius),
                    0.0,
                );
                self.spawn(id, origin, MotionModel::wanderer())
            })
            .collect()
    }

    pub fn remove(&mut self, id: ParticipantId) {
        self.participants.remove(&id);
    }

    pub fn add_solid(&mut self, origin: Vec3, bounds: Bounds) {
        self.solids.push((origin, bounds));
    }

    pub fn participant(&self, id: ParticipantId) -> Option<&SimulatedParticipant> {
        self.participants.get(&id)
    }

    pub fn set_motion(&mut self, id: ParticipantId, motion: MotionModel) {
        if let Some(p) = self.participants.get_mut(&id) {
            p.motion = motion;
        }
    }

    pub fn kill(&mut self, id: ParticipantId) {
        if let Some(p) = self.participants.get_mut(&id) {
            p.state.alive = false;
        }
    }

    pub fn respawn(&mut self, id: ParticipantId, origin: Vec3) {
        if let Some(p) = self.participants.get_mut(&id) {
            p.state.alive = true;
            p.state.origin = origin;
        }
    }

    /// Instant move, as a spawn point or portal would do
    pub fn teleport(&mut self, id: ParticipantId, to: Vec3) {
        if let Some(p) = self.participants.get_mut(&id) {
            tracing::trace!(participant = %id, from = ?p.state.origin, to = ?to, "teleport");
            p.state.origin = to;
        }
    }

    pub fn crouch(&mut self, id: ParticipantId, crouched: bool) {
        if let Some(p) = self.participants.get_mut(&id) {
            p.state.bounds = if crouched { Bounds::crouched() } else { Bounds::standing() };
        }
    }

    /// Advance one tick: move every live participant and stamp its simulation time
    pub fn step(&mut self) {
        self.clock.advance();
        let dt = self.clock.interval() as f32;
        let now = self.clock.now();

        for p in self.participants.values_mut() {
            if p.state.alive {
                let velocity = match p.motion {
                    MotionModel::Still => Vec3::ZERO,
                    MotionModel::Linear(v) => v,
                    MotionModel::Wander { speed, turn_rate } => {
                        p.heading += self.rng.gen_range(-turn_rate..=turn_rate);
                        p.state.angles.yaw = p.heading.to_degrees();
                        Vec3::new(p.heading.cos() * speed, p.heading.sin() * speed, 0.0)
                    }
                };
                p.state.origin = p.state.origin + velocity * dt;
            }
            p.state.simulation_time = now;
        }
    }

    /// Copy of every participant's live state
    pub fn snapshot(&self) -> BTreeMap<ParticipantId, ParticipantState> {
        self.participants.iter().map(|(id, p)| (*id, p.state)).collect()
    }

    /// First thing the hull overlaps at `origin`, ignoring `mover` and the dead
    pub fn obstruction_at(&self, mover: ParticipantId, bounds: &Bounds, origin: Vec3) -> Option<Obstruction> {
        if self
            .solids
            .iter()
            .any(|(solid_origin, solid)| bounds.overlaps(origin, solid, *solid_origin))
        {
            return Some(Obstruction::Solid);
        }

        self.participants
            .iter()
            .filter(|(id, p)| **id != mover && p.state.alive)
            .find(|(_, p)| bounds.overlaps(origin, &p.state.bounds, p.state.origin))
            .map(|(id, _)| Obstruction::Participant(*id))
    }
}

impl ParticipantSource for SimulatedArena {
    fn participant_ids(&self) -> Vec<ParticipantId> {
        self.participants.keys().copied().collect()
    }

    fn live_state(&self, id: ParticipantId) -> Option<ParticipantState> {
        self.participants.get(&id).map(|p| p.state)
    }
}

impl ParticipantWorld for SimulatedArena {
    fn set_origin(&mut self, id: ParticipantId, origin: Vec3) {
        if let Some(p) = self.participants.get_mut(&id) {
            p.state.origin = origin;
        }
    }

    fn set_angles(&mut self, id: ParticipantId, angles: QAngle) {
        if let Some(p) = self.participants.get_mut(&id) {
            p.state.angles = angles;
        }
    }

    fn set_bounds(&mut self, id: ParticipantId, bounds: Bounds) {
        if let Some(p) = self.participants.get_mut(&id) {
            p.state.bounds = bounds;
        }
    }

    fn set_simulation_time(&mut self, id: ParticipantId, time: SimTime) {
        if let Some(p) = self.participants.get_mut(&id) {
            p.state.simulation_time = time;
        }
    }

    fn trace_hull(&self, mover: ParticipantId, bounds: Bounds, from: Vec3, to: Vec3) -> HullTrace {
        if let Some(hit) = self.obstruction_at(mover, &bounds, from) {
            return HullTrace::solid(hit.participant());
        }

        for step in 1..=TRACE_STEPS {
            let pos = from.lerp(to, step as f32 / TRACE_STEPS as f32);
            if let Some(hit) = self.obstruction_at(mover, &bounds, pos) {
                return HullTrace {
                    start_solid: false,
                    fraction: (step - 1) as f32 / TRACE_STEPS as f32,
                    hit: hit.participant(),
                };
            }
        }

        HullTrace::clear()
    }
}
