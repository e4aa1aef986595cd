//! Permission policy - which participants a requester may compensate against

use backtrack_core::ParticipantState;

use crate::{CommandContext, SharedConfig};

/// Decides whether `target` is rewound for `requester`'s command.
///
/// Game rules own this decision (teams, spectators, visibility). The
/// compensator never asks about the requester itself.
pub trait CompensationPolicy {
    fn should_compensate(
        &self,
        requester: &ParticipantState,
        target: &ParticipantState,
        ctx: &CommandContext,
    ) -> bool;
}

impl<F> CompensationPolicy for F
where
    F: Fn(&ParticipantState, &ParticipantState, &CommandContext) -> bool,
{
    fn should_compensate(
        &self,
        requester: &ParticipantState,
        target: &ParticipantState,
        ctx: &CommandContext,
    ) -> bool {
        self(requester, target, ctx)
    }
}

/// Compensate against everyone
#[derive(Clone, Copy, Debug, Default)]
pub struct AllowAll;

impl CompensationPolicy for AllowAll {
    fn should_compensate(&self, _: &ParticipantState, _: &ParticipantState, _: &CommandContext) -> bool {
        true
    }
}

/// cos(45°)
const VIEW_CONE_COS: f32 = 0.707_107;

/// Classic shooter rule set.
///
/// A target is compensated when it was transmitted to the requester and
/// either could have run past the requester within the rewind window, or
/// lies inside a 45° cone around the command's view direction. The rewind
/// window is read from the shared configuration on every decision.
#[derive(Clone, Debug)]
pub struct StandardPolicy {
    /// Fastest a participant can move (units per second)
    pub max_speed: f32,
    /// Cosine of the half-angle of the view cone
    pub cone_cos: f32,
    config: SharedConfig,
}

impl StandardPolicy {
    pub fn new(max_speed: f32, config: impl Into<SharedConfig>) -> Self {
        StandardPolicy {
            max_speed,
            cone_cos: VIEW_CONE_COS,
            config: config.into(),
        }
    }

    /// Distance within which targets are always compensated. Scaled by 1.5
    /// so diagonal movement leaves no dead zones.
    pub fn proximity_radius(&self) -> f32 {
        1.5 * self.max_speed * self.config.max_unlag() as f32
    }
}

impl Default for StandardPolicy {
    fn default() -> Self {
        Self::new(320.0, SharedConfig::default())
    }
}

impl CompensationPolicy for StandardPolicy {
    fn should_compensate(
        &self,
        requester: &ParticipantState,
        target: &ParticipantState,
        ctx: &CommandContext,
    ) -> bool {
        if !ctx.was_transmitted(target.id) {
            return false;
        }

        let diff = target.origin - requester.origin;
        if diff.length() < self.proximity_radius() {
            return true;
        }

        ctx.view_angles.forward().dot(diff.normalize_or_zero()) >= self.cone_cos
    }
}
