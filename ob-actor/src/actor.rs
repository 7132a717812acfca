//! Tagged player variants sharing one capability set.

use ob_core::{GameEnv, Move, PlayerId};

use crate::human::HumanActor;
use crate::policy::{ActorError, PolicyActor};

/// A seat at the table: model-driven or operator-driven.
pub enum PlayerActor {
    Policy(PolicyActor),
    Human(HumanActor),
}

impl PlayerActor {
    pub fn id(&self) -> PlayerId {
        match self {
            PlayerActor::Policy(a) => a.id(),
            PlayerActor::Human(a) => a.id(),
        }
    }

    pub fn reset(&mut self) {
        match self {
            PlayerActor::Policy(a) => a.reset(),
            PlayerActor::Human(a) => a.reset(),
        }
    }

    pub fn ready(&self) -> bool {
        match self {
            PlayerActor::Policy(a) => a.ready(),
            PlayerActor::Human(a) => a.ready(),
        }
    }

    pub fn step_done(&self) -> bool {
        match self {
            PlayerActor::Policy(a) => a.step_done(),
            PlayerActor::Human(a) => a.step_done(),
        }
    }

    pub fn advance(&mut self, env: &dyn GameEnv) -> Result<Option<Move>, ActorError> {
        match self {
            PlayerActor::Policy(a) => a.advance(env),
            PlayerActor::Human(a) => a.advance(env),
        }
    }

    /// Episode belief-resample success fraction; `None` for seats without
    /// counterfactual evaluation.
    pub fn fict_success_rate(&mut self) -> Option<f32> {
        match self {
            PlayerActor::Policy(a) if a.off_belief() => Some(a.fict_success_rate()),
            _ => None,
        }
    }
}
