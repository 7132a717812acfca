//! The per-player staged interaction machine around the batch scheduler.

use std::sync::Arc;

use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use rand_core::SeedableRng;
use thiserror::Error;

use ob_batch::{BatchRunner, CallError, FutureReply, SchedulerError};
use ob_core::{ActorConfig, GameEnv, Move, PlayerId, Tensor, TensorError};

use crate::fict::{CounterfactualEngine, FictitiousState};
use crate::hidden::HiddenStateStore;
use crate::observe::{NullObserver, StageNote, StageObserver};
use crate::partner::PartnerLink;
use crate::stage::Stage;

/// Method every actor request is scheduled under.
pub const ACT_METHOD: &str = "act";

#[derive(Debug, Error)]
pub enum ActorError {
    #[error(transparent)]
    Call(#[from] CallError),
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
    #[error(transparent)]
    Tensor(#[from] TensorError),
    #[error("reply is missing recurrent cell {0:?}")]
    MissingCell(String),
    #[error("stage protocol violation: {0}")]
    Protocol(&'static str),
    #[error("decision source gave no answer")]
    DecisionAborted,
}

/// Rules-following player: observe, submit, decide, optionally advance a
/// counterfactual clone, repeat. One outstanding model call at a time.
pub struct PolicyActor {
    id: PlayerId,
    runner: Arc<BatchRunner>,
    stage: Stage,
    hidden: HiddenStateStore,
    links: Vec<PartnerLink>,
    pending: Option<FutureReply>,
    awaiting_mailbox: bool,
    decided: Option<Move>,
    last_action: Option<u32>,
    actor_at_decide: PlayerId,
    my_turn_at_decide: bool,
    fict_state: Option<FictitiousState>,
    engine: CounterfactualEngine,
    off_belief: bool,
    eps_candidates: Vec<f32>,
    temp_candidates: Vec<f32>,
    eps: f32,
    temperature: f32,
    rng: ChaCha8Rng,
    observer: Box<dyn StageObserver>,
}

impl PolicyActor {
    /// `links` is the full per-player link table; `links[id]` is this actor's
    /// own mailbox and published snapshot.
    pub fn new(
        id: PlayerId,
        runner: Arc<BatchRunner>,
        cfg: &ActorConfig,
        links: Vec<PartnerLink>,
    ) -> Self {
        let hidden = HiddenStateStore::new(runner.initial_hidden(1));
        let rng = ChaCha8Rng::seed_from_u64(cfg.seed.wrapping_add(id as u64));
        let mut actor = Self {
            id,
            runner,
            stage: Stage::ObserveBeforeAct,
            hidden,
            links,
            pending: None,
            awaiting_mailbox: false,
            decided: None,
            last_action: None,
            actor_at_decide: id,
            my_turn_at_decide: false,
            fict_state: None,
            engine: CounterfactualEngine::new(),
            off_belief: cfg.off_belief,
            eps_candidates: cfg.eps.clone(),
            temp_candidates: cfg.temperature.clone(),
            eps: 0.0,
            temperature: 1.0,
            rng,
            observer: Box::new(NullObserver),
        };
        actor.resample_exploration();
        actor.publish();
        actor
    }

    pub fn set_observer(&mut self, observer: Box<dyn StageObserver>) {
        self.observer = observer;
    }

    pub fn id(&self) -> PlayerId {
        self.id
    }

    #[cfg(test)]
    pub fn eps(&self) -> f32 {
        self.eps
    }

    /// Ready for the start of a new episode. An unconsumed mailbox reply is
    /// dropped here; that drop is surfaced through the observer.
    pub fn reset(&mut self) {
        self.stage = Stage::ObserveBeforeAct;
        self.pending = None;
        self.awaiting_mailbox = false;
        self.decided = None;
        self.last_action = None;
        self.fict_state = None;
        if self.own_link().take_inbox().is_some() {
            self.note("reset", "dropped_unconsumed_mailbox_reply");
        }
        self.hidden = HiddenStateStore::new(self.runner.initial_hidden(1));
        self.resample_exploration();
        self.publish();
    }

    /// Never suspends outside the reply wait inside the decide stage.
    pub fn ready(&self) -> bool {
        true
    }

    /// A full observe -> decide cycle has completed.
    pub fn step_done(&self) -> bool {
        self.stage == Stage::ObserveBeforeAct
    }

    pub fn off_belief(&self) -> bool {
        self.off_belief
    }

    pub fn fict_success_rate(&mut self) -> f32 {
        self.engine.success_rate()
    }

    /// Perform exactly one stage transition. Returns the decided move from
    /// the decide stage, `None` from every other stage; off turn the decided
    /// move is the no-op placeholder.
    pub fn advance(&mut self, env: &dyn GameEnv) -> Result<Option<Move>, ActorError> {
        match self.stage {
            Stage::ObserveBeforeAct => self.observe_before_act(env),
            Stage::DecideMove => self.decide_move(env),
            Stage::FictitiousAct => self.fictitious_act(env),
            Stage::ObserveAfterAct => {
                self.stage = if env.terminated() {
                    Stage::StoreTrajectory
                } else {
                    Stage::ObserveBeforeAct
                };
                self.note("observe_after_act", "");
                Ok(None)
            }
            Stage::StoreTrajectory => {
                self.stage = Stage::ObserveBeforeAct;
                self.note("store_trajectory", "");
                Ok(None)
            }
        }
    }

    fn observe_before_act(&mut self, env: &dyn GameEnv) -> Result<Option<Move>, ActorError> {
        self.hidden.begin_step();
        self.publish();
        if self.own_link().has_pending() {
            // A partner re-evaluated us against its counterfactual
            // transition; that reply stands in for our own call this step.
            self.awaiting_mailbox = true;
            self.note("observe_before_act", "mailbox_pending_skip_submit");
        } else {
            let mut request = env.observe(self.id);
            request.insert("eps", Tensor::scalar(self.eps));
            request.insert("temperature", Tensor::scalar(self.temperature));
            self.hidden.attach(&mut request);
            self.pending = Some(self.runner.submit(ACT_METHOD, request)?);
            self.note("observe_before_act", "submitted");
        }
        self.stage = Stage::DecideMove;
        Ok(None)
    }

    fn decide_move(&mut self, env: &dyn GameEnv) -> Result<Option<Move>, ActorError> {
        let future = if self.awaiting_mailbox {
            self.awaiting_mailbox = false;
            self.own_link()
                .take_inbox()
                .ok_or(ActorError::Protocol("mailbox reply vanished before decide"))?
        } else {
            self.pending
                .take()
                .ok_or(ActorError::Protocol("decide without a submitted request"))?
        };
        let mut reply = future.recv()?;
        self.hidden.absorb_reply(&mut reply)?;

        let action = reply.scalar("a")? as u32;
        self.last_action = Some(action);
        self.actor_at_decide = env.current_player();
        self.my_turn_at_decide = self.actor_at_decide == self.id;
        let mv = if self.my_turn_at_decide {
            env.move_for_action(action)
        } else {
            Move::NO_OP
        };
        self.decided = Some(mv);

        if self.off_belief {
            // The clone must predate the real move the driver applies after
            // this stage.
            self.fict_state = Some(FictitiousState::capture(env));
            self.stage = Stage::FictitiousAct;
        } else {
            self.stage = Stage::ObserveAfterAct;
        }
        self.note(
            "decide_move",
            if mv.is_no_op() { "noop" } else { "move" },
        );
        Ok(Some(mv))
    }

    fn fictitious_act(&mut self, _env: &dyn GameEnv) -> Result<Option<Move>, ActorError> {
        let mut fict = self
            .fict_state
            .take()
            .ok_or(ActorError::Protocol("counterfactual stage without a clone"))?;

        let resampled = self.engine.resample(&mut fict, self.id, &mut self.rng);

        let fict_move = if self.my_turn_at_decide {
            self.decided
                .ok_or(ActorError::Protocol("counterfactual stage without a decision"))?
        } else {
            let action = self
                .last_action
                .ok_or(ActorError::Protocol("counterfactual stage without a reply"))?;
            fict.move_for_action(action)
        };

        match fict.apply(fict_move) {
            Ok(_) if !self.my_turn_at_decide => {
                // Re-evaluate the acting partner against the hypothetical
                // post-move state; the partner consumes the reply on its own
                // next decide.
                let partner = self.actor_at_decide;
                let (prev_hidden, eps, temperature) =
                    self.links[partner as usize].snapshot();
                let mut request = fict.observe(partner);
                request.insert("eps", Tensor::scalar(eps));
                request.insert("temperature", Tensor::scalar(temperature));
                for (key, cell) in prev_hidden.iter() {
                    request.insert(key, cell.clone());
                }
                let future = self.runner.submit(ACT_METHOD, request)?;
                if self.links[partner as usize].deliver(future).is_some() {
                    // Another off-turn seat already re-evaluated this
                    // partner this step; only the latest evaluation stands.
                    self.note("fictitious_act", "superseded_mailbox_reply");
                }
                self.note(
                    "fictitious_act",
                    if resampled {
                        "partner_reevaluated"
                    } else {
                        "partner_reevaluated_unresampled"
                    },
                );
            }
            Ok(_) => {
                self.note(
                    "fictitious_act",
                    if resampled { "advanced" } else { "advanced_unresampled" },
                );
            }
            Err(_) => {
                // The hypothesized move can be illegal under the resampled
                // hand; drop the clone and move on.
                self.note("fictitious_act", "apply_failed");
            }
        }
        // `fict` drops here; the real state was never touched.
        self.stage = Stage::ObserveAfterAct;
        Ok(None)
    }

    fn resample_exploration(&mut self) {
        self.eps = self
            .eps_candidates
            .choose(&mut self.rng)
            .copied()
            .unwrap_or(0.0);
        self.temperature = self
            .temp_candidates
            .choose(&mut self.rng)
            .copied()
            .unwrap_or(1.0);
    }

    fn publish(&self) {
        self.own_link()
            .publish(self.hidden.previous().clone(), self.eps, self.temperature);
    }

    fn own_link(&self) -> &PartnerLink {
        &self.links[self.id as usize]
    }

    fn note(&mut self, stage: &'static str, detail: &str) {
        self.observer
            .on_stage(StageNote::new(self.id, stage, detail));
    }
}
