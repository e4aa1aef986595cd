//! Collaborator interfaces - what lag compensation needs from the host

use std::collections::BTreeMap;

use backtrack_core::{Bounds, ParticipantId, ParticipantState, QAngle, SimTime, Tick, Vec3};
use backtrack_history::ParticipantSource;
use backtrack_time::CommandTiming;

/// Result of sweeping a participant's hull through the world
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HullTrace {
    /// The hull is already in solid space at the start point
    pub start_solid: bool,
    /// Fraction of the sweep completed before hitting something (1.0 = clear)
    pub fraction: f32,
    /// Participant that blocked the sweep, if any
    pub hit: Option<ParticipantId>,
}

impl HullTrace {
    /// Unobstructed sweep
    pub const fn clear() -> Self {
        HullTrace {
            start_solid: false,
            fraction: 1.0,
            hit: None,
        }
    }

    /// Sweep that starts inside solid space, optionally inside a participant
    pub const fn solid(hit: Option<ParticipantId>) -> Self {
        HullTrace {
            start_solid: true,
            fraction: 0.0,
            hit,
        }
    }
}

/// Live participant state accessor and mutator.
///
/// Implemented by the host simulation. Setters are only called for
/// participants that `live_state` reported.
pub trait ParticipantWorld: ParticipantSource {
    fn set_origin(&mut self, id: ParticipantId, origin: Vec3);

    fn set_angles(&mut self, id: ParticipantId, angles: QAngle);

    fn set_bounds(&mut self, id: ParticipantId, bounds: Bounds);

    fn set_simulation_time(&mut self, id: ParticipantId, time: SimTime);

    /// Sweep `mover`'s hull from `from` to `to`.
    ///
    /// Only consulted when fix-stuck is enabled. Worlds without collision
    /// never block.
    fn trace_hull(&self, mover: ParticipantId, bounds: Bounds, from: Vec3, to: Vec3) -> HullTrace {
        let _ = (mover, bounds, from, to);
        HullTrace::clear()
    }
}

impl ParticipantWorld for BTreeMap<ParticipantId, ParticipantState> {
    fn set_origin(&mut self, id: ParticipantId, origin: Vec3) {
        if let Some(state) = self.get_mut(&id) {
            state.origin = origin;
        }
    }

    fn set_angles(&mut self, id: ParticipantId, angles: QAngle) {
        if let Some(state) = self.get_mut(&id) {
            state.angles = angles;
        }
    }

    fn set_bounds(&mut self, id: ParticipantId, bounds: Bounds) {
        if let Some(state) = self.get_mut(&id) {
            state.bounds = bounds;
        }
    }

    fn set_simulation_time(&mut self, id: ParticipantId, time: SimTime) {
        if let Some(state) = self.get_mut(&id) {
            state.simulation_time = time;
        }
    }
}

/// Set of participants whose state has been transmitted to (and acked by) a client
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TransmitMask {
    words: Vec<u64>,
}

impl TransmitMask {
    pub fn new() -> Self {
        TransmitMask::default()
    }

    pub fn set(&mut self, id: ParticipantId) {
        let (word, bit) = (id.index() / 64, id.index() % 64);
        if self.words.len() <= word {
            self.words.resize(word + 1, 0);
        }
        self.words[word] |= 1u64 << bit;
    }

    pub fn clear(&mut self, id: ParticipantId) {
        let (word, bit) = (id.index() / 64, id.index() % 64);
        if let Some(w) = self.words.get_mut(word) {
            *w &= !(1u64 << bit);
        }
    }

    pub fn contains(&self, id: ParticipantId) -> bool {
        let (word, bit) = (id.index() / 64, id.index() % 64);
        self.words.get(word).is_some_and(|w| *w & (1u64 << bit) != 0)
    }
}

impl FromIterator<ParticipantId> for TransmitMask {
    fn from_iter<I: IntoIterator<Item = ParticipantId>>(iter: I) -> Self {
        let mut mask = TransmitMask::new();
        for id in iter {
            mask.set(id);
        }
        mask
    }
}

/// Everything known about the command being processed for a requester
#[derive(Clone, Debug, PartialEq)]
pub struct CommandContext {
    pub requester: ParticipantId,
    /// Tick the client stamped on the command
    pub command_tick: Tick,
    /// View angles the command was issued with
    pub view_angles: QAngle,
    /// Server -> client latency (seconds)
    pub outgoing_latency: f64,
    /// Client view interpolation delay (seconds)
    pub lerp_time: f64,
    /// The client has not opted out of compensation
    pub wants_compensation: bool,
    /// Participants transmitted to this client; `None` means all
    pub transmit: Option<TransmitMask>,
}

impl CommandContext {
    pub fn new(requester: ParticipantId, command_tick: Tick) -> Self {
        CommandContext {
            requester,
            command_tick,
            view_angles: QAngle::ZERO,
            outgoing_latency: 0.0,
            lerp_time: 0.0,
            wants_compensation: true,
            transmit: None,
        }
    }

    pub fn with_latency(mut self, outgoing_latency: f64, lerp_time: f64) -> Self {
        self.outgoing_latency = outgoing_latency;
        self.lerp_time = lerp_time;
        self
    }

    pub fn with_view_angles(mut self, view_angles: QAngle) -> Self {
        self.view_angles = view_angles;
        self
    }

    pub fn with_transmit(mut self, transmit: TransmitMask) -> Self {
        self.transmit = Some(transmit);
        self
    }

    pub fn opted_out(mut self) -> Self {
        self.wants_compensation = false;
        self
    }

    /// Whether `id` was transmitted to the requester
    pub fn was_transmitted(&self, id: ParticipantId) -> bool {
        self.transmit.as_ref().map_or(true, |mask| mask.contains(id))
    }

    pub fn timing(&self) -> CommandTiming {
        CommandTiming {
            command_tick: self.command_tick,
            outgoing_latency: self.outgoing_latency,
            lerp_time: self.lerp_time,
        }
    }
}
