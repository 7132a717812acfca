use std::sync::{Arc, Mutex};

use ob_batch::{BatchModel, BatchRunner, ModelError};
use ob_core::{stack, unstack, ActorConfig, GameConfig, GameEnv, MiniGame, Tensor, TensorMap};

use crate::human::{CallbackSource, HumanActor};
use crate::observe::{StageNote, StageObserver};
use crate::partner::PartnerLink;
use crate::policy::{PolicyActor, ACT_METHOD};

/// Picks the first legal action and bumps every h0 element by one, so each
/// reply's cells are distinguishable from the request's. Records the h0 rows
/// of every request it sees.
struct CellBumpModel {
    seen_h0: Mutex<Vec<Vec<f32>>>,
}

impl CellBumpModel {
    fn new() -> Self {
        Self {
            seen_h0: Mutex::new(Vec::new()),
        }
    }
}

impl BatchModel for CellBumpModel {
    fn invoke(&self, _method: &str, batch: &TensorMap) -> Result<TensorMap, ModelError> {
        let rows = batch
            .get("legal_move")
            .and_then(|t| t.shape().first().copied())
            .ok_or_else(|| ModelError::new("missing legal_move"))?;
        let per_row = unstack(batch, rows).map_err(|e| ModelError::new(e.to_string()))?;
        let mut replies = Vec::with_capacity(rows);
        for row in &per_row {
            let h0 = row
                .get("h0")
                .ok_or_else(|| ModelError::new("missing h0"))?;
            self.seen_h0.lock().unwrap().push(h0.data().to_vec());
            let action = row
                .get("legal_move")
                .and_then(|m| m.data().iter().position(|&v| v > 0.0))
                .unwrap_or(0);
            let bumped: Vec<f32> = h0.data().iter().map(|v| v + 1.0).collect();
            let mut reply = TensorMap::new();
            reply.insert("a", Tensor::scalar(action as f32));
            reply.insert("h0", Tensor::new(bumped, h0.shape().to_vec()));
            replies.push(reply);
        }
        let refs: Vec<&TensorMap> = replies.iter().collect();
        stack(&refs).map_err(|e| ModelError::new(e.to_string()))
    }

    fn initial_hidden(&self, batch_size: usize) -> TensorMap {
        let mut out = TensorMap::new();
        out.insert("h0", Tensor::zeros(vec![batch_size, 2]));
        out
    }
}

#[derive(Clone, Default)]
struct RecordingObserver {
    notes: Arc<Mutex<Vec<StageNote>>>,
}

impl StageObserver for RecordingObserver {
    fn on_stage(&mut self, note: StageNote) {
        self.notes.lock().unwrap().push(note);
    }
}

fn harness() -> (Arc<CellBumpModel>, Arc<BatchRunner>) {
    let model = Arc::new(CellBumpModel::new());
    let runner = Arc::new(BatchRunner::new(
        Arc::clone(&model) as Arc<dyn BatchModel>
    ));
    runner.register_method(ACT_METHOD, 4).unwrap();
    runner.start().unwrap();
    (model, runner)
}

fn actor_cfg(off_belief: bool) -> ActorConfig {
    ActorConfig {
        off_belief,
        ..ActorConfig::default()
    }
}

#[test]
fn reply_cells_feed_the_next_request() {
    let (model, runner) = harness();
    let env = MiniGame::new(&GameConfig::default());
    let links = PartnerLink::links_for(2);
    let mut actor = PolicyActor::new(0, runner, &actor_cfg(false), links);

    // Two full observe -> decide -> post-observe cycles.
    for _ in 0..2 {
        actor.advance(&env).unwrap();
        let mv = actor.advance(&env).unwrap();
        assert!(mv.is_some());
        actor.advance(&env).unwrap();
        assert!(actor.step_done());
    }

    let seen = model.seen_h0.lock().unwrap();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0], vec![0.0, 0.0]);
    assert_eq!(seen[1], vec![1.0, 1.0]);
}

#[test]
fn off_turn_decide_emits_placeholder_without_blocking() {
    let (_model, runner) = harness();
    let env = MiniGame::new(&GameConfig::default());
    let links = PartnerLink::links_for(2);
    // Player 0 opens; this actor sits in seat 1.
    let mut actor = PolicyActor::new(1, runner, &actor_cfg(false), links);

    actor.advance(&env).unwrap();
    let mv = actor.advance(&env).unwrap().unwrap();
    assert!(mv.is_no_op());
}

#[test]
fn observer_sees_the_counterfactual_stage_order() {
    let (_model, runner) = harness();
    let env = MiniGame::new(&GameConfig::default());
    let links = PartnerLink::links_for(2);
    let observer = RecordingObserver::default();
    let mut actor = PolicyActor::new(1, runner, &actor_cfg(true), links.clone());
    actor.set_observer(Box::new(observer.clone()));

    for _ in 0..4 {
        actor.advance(&env).unwrap();
    }

    let notes = observer.notes.lock().unwrap();
    let stages: Vec<&str> = notes.iter().map(|n| n.stage).collect();
    assert_eq!(
        stages,
        vec![
            "observe_before_act",
            "decide_move",
            "fictitious_act",
            "observe_after_act",
        ]
    );
    // Seat 1 decided off turn, so the counterfactual stage re-evaluated the
    // acting player into that player's mailbox.
    assert!(links[0].has_pending());
}

#[test]
fn mailbox_reply_replaces_the_partners_next_call() {
    let (_model, runner) = harness();
    let cfg = GameConfig::default();
    let mut env = MiniGame::new(&cfg);
    let links = PartnerLink::links_for(2);
    let observer = RecordingObserver::default();
    let mut a0 = PolicyActor::new(0, Arc::clone(&runner), &actor_cfg(false), links.clone());
    a0.set_observer(Box::new(observer.clone()));
    let mut a1 = PolicyActor::new(1, runner, &actor_cfg(true), links.clone());

    // Lockstep iterations, driver style.
    a0.advance(&env).unwrap();
    a1.advance(&env).unwrap();
    let mv = a0.advance(&env).unwrap().unwrap();
    a1.advance(&env).unwrap();
    env.apply_move(mv).unwrap();
    a0.advance(&env).unwrap();
    a1.advance(&env).unwrap();
    assert!(links[0].has_pending());

    // Seat 0's next observe skips its own submission and its next decide
    // consumes the delivered reply.
    a0.advance(&env).unwrap();
    let mv = a0.advance(&env).unwrap();
    assert!(mv.is_some());
    assert!(!links[0].has_pending());

    let notes = observer.notes.lock().unwrap();
    assert!(notes
        .iter()
        .any(|n| n.detail == "mailbox_pending_skip_submit"));
}

#[test]
fn counterfactual_stage_leaves_real_state_untouched() {
    let (_model, runner) = harness();
    let env = MiniGame::new(&GameConfig::default());
    let links = PartnerLink::links_for(2);
    let mut actor = PolicyActor::new(0, runner, &actor_cfg(true), links);

    actor.advance(&env).unwrap();
    actor.advance(&env).unwrap();
    let before = env.clone();
    actor.advance(&env).unwrap();
    assert_eq!(env, before);
}

#[test]
fn exploration_resampling_is_deterministic_per_seed() {
    let (_model, runner) = harness();
    let cfg = ActorConfig {
        eps: vec![0.1, 0.5, 0.9],
        seed: 42,
        ..ActorConfig::default()
    };
    let mut a = PolicyActor::new(0, Arc::clone(&runner), &cfg, PartnerLink::links_for(2));
    let mut b = PolicyActor::new(0, runner, &cfg, PartnerLink::links_for(2));

    for _ in 0..5 {
        assert_eq!(a.eps(), b.eps());
        assert!(cfg.eps.contains(&a.eps()));
        a.reset();
        b.reset();
    }
}

#[test]
fn reset_drops_an_unconsumed_mailbox_reply() {
    let (_model, runner) = harness();
    let links = PartnerLink::links_for(2);
    let observer = RecordingObserver::default();
    let mut actor = PolicyActor::new(0, runner, &actor_cfg(false), links.clone());
    actor.set_observer(Box::new(observer.clone()));

    let (future, _fulfiller) = ob_batch::future::reply_slot();
    assert!(links[0].deliver(future).is_none());
    actor.reset();

    assert!(!links[0].has_pending());
    let notes = observer.notes.lock().unwrap();
    assert!(notes
        .iter()
        .any(|n| n.detail == "dropped_unconsumed_mailbox_reply"));
}

#[test]
fn later_mailbox_delivery_supersedes_an_earlier_one() {
    let links = PartnerLink::links_for(3);

    let (first, _first_fulfiller) = ob_batch::future::reply_slot();
    let (second, second_fulfiller) = ob_batch::future::reply_slot();

    assert!(links[0].deliver(first).is_none());
    let superseded = links[0].deliver(second);
    assert!(superseded.is_some());

    // Only the latest delivery is waiting in the mailbox.
    let mut reply = TensorMap::new();
    reply.insert("a", Tensor::scalar(1.0));
    second_fulfiller.fulfill(Ok(reply)).unwrap();
    let got = links[0].take_inbox().unwrap().recv().unwrap();
    assert_eq!(got.scalar("a").unwrap(), 1.0);
    assert!(!links[0].has_pending());
}

#[test]
fn human_actor_plays_the_chosen_move_and_noops_off_turn() {
    let env = MiniGame::new(&GameConfig::default());
    let legal = env.legal_moves(0);
    assert!(legal.len() > 1);

    let source = CallbackSource::new(|_view, _moves| Some(1));
    let mut human = HumanActor::new(0, Box::new(source));
    human.advance(&env).unwrap();
    let mv = human.advance(&env).unwrap().unwrap();
    assert_eq!(mv, legal[1]);
    assert!(human.step_done());

    let source = CallbackSource::new(|_view, _moves| Some(0));
    let mut off_turn = HumanActor::new(1, Box::new(source));
    off_turn.advance(&env).unwrap();
    let mv = off_turn.advance(&env).unwrap().unwrap();
    assert!(mv.is_no_op());
}

#[test]
fn human_actor_noops_on_a_terminated_game() {
    // The last real move can land while the human is mid-cycle in decide;
    // the wind-down then asks it for a move on a finished game.
    let cfg = GameConfig {
        max_steps: 1,
        ..GameConfig::default()
    };
    let mut env = MiniGame::new(&cfg);

    let source = CallbackSource::new(|_view, _moves| Some(0));
    let mut human = HumanActor::new(1, Box::new(source));
    human.advance(&env).unwrap();

    let mv = env.legal_moves(0)[0];
    env.apply_move(mv).unwrap();
    assert!(env.terminated());
    assert_eq!(env.current_player(), 1);

    let mv = human.advance(&env).unwrap().unwrap();
    assert!(mv.is_no_op());
    assert!(human.step_done());
}
