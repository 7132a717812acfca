//! Rules-engine boundary.
//!
//! The harness never interprets game rules itself; it drives any engine that
//! implements `GameEnv`. Moves are opaque ids minted by the engine, plus one
//! designated placeholder emitted by actors whose turn it is not.

use rand_chacha::ChaCha8Rng;
use thiserror::Error;

use crate::tensor::TensorMap;

pub type PlayerId = u8;

/// An opaque engine-defined move id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Move(u32);

impl Move {
    /// Placeholder move emitted by an actor whose turn it is not.
    /// Never passed to `GameEnv::apply_move`.
    pub const NO_OP: Move = Move(u32::MAX);

    pub fn new(id: u32) -> Self {
        Move(id)
    }

    pub fn id(self) -> u32 {
        self.0
    }

    pub fn is_no_op(self) -> bool {
        self == Move::NO_OP
    }
}

#[derive(Debug, Clone, Copy)]
pub struct StepOutcome {
    pub reward: f32,
    pub terminated: bool,
}

#[derive(Debug, Error)]
pub enum EnvError {
    #[error("illegal move {move_id} for player {player}")]
    IllegalMove { player: PlayerId, move_id: u32 },
    #[error("move applied to a terminated game")]
    Terminated,
}

/// What the harness consumes from a rules engine.
///
/// Observation payloads are opaque to the harness; they must at least carry a
/// `"legal_move"` mask row so a policy model can pick a valid action id.
pub trait GameEnv: Send {
    fn num_players(&self) -> usize;

    fn current_player(&self) -> PlayerId;

    fn terminated(&self) -> bool;

    /// Start a fresh episode.
    fn reset(&mut self);

    /// Moves `player` could make were it to act now (empty once terminated).
    fn legal_moves(&self, player: PlayerId) -> Vec<Move>;

    /// Engine lookup from a discrete action id to a concrete move.
    fn move_for_action(&self, action: u32) -> Move;

    fn last_move(&self) -> Option<Move>;

    /// Build `player`'s observation of the current state.
    fn observe(&self, player: PlayerId) -> TensorMap;

    fn apply_move(&mut self, mv: Move) -> Result<StepOutcome, EnvError>;

    /// Deep copy for hypothetical transitions.
    fn clone_state(&self) -> Box<dyn GameEnv>;

    /// Replace `player`'s own hidden cards with a belief-consistent sample.
    /// Returns false when no valid resample exists; the state is then left
    /// unchanged.
    fn resample_hand(&mut self, player: PlayerId, rng: &mut ChaCha8Rng) -> bool;

    /// Episode score so far.
    fn score(&self) -> f32;

    /// Human-readable view of the state from `player`'s seat.
    fn describe(&self, player: PlayerId) -> String;

    /// Human-readable rendering of a move.
    fn describe_move(&self, mv: Move) -> String;
}
