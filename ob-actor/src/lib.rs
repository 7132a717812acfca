//! Staged player state machines over the batch scheduler.
//!
//! A policy actor cycles observe -> decide -> (counterfactual) ->
//! post-observe, carrying recurrent hidden cells between model calls and, in
//! off-belief mode, re-evaluating the acting partner against a privately
//! cloned what-if transition. A human actor implements the same capability
//! set over an injected decision source.

pub mod actor;
pub mod fict;
pub mod hidden;
pub mod human;
pub mod observe;
pub mod partner;
pub mod policy;
pub mod stage;

pub use actor::PlayerActor;
pub use fict::{CounterfactualEngine, FictitiousState};
pub use hidden::HiddenStateStore;
pub use human::{CallbackSource, ConsoleSource, DecisionSource, HumanActor};
pub use observe::{NullObserver, StageNote, StageObserver};
pub use partner::PartnerLink;
pub use policy::{ActorError, PolicyActor, ACT_METHOD};
pub use stage::Stage;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod actor_tests;
