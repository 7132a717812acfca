//! Private what-if transitions over a cloned game state.

use rand_chacha::ChaCha8Rng;

use ob_core::{EnvError, GameEnv, Move, PlayerId, StepOutcome, TensorMap};

/// A temporarily-mutated private copy of game state.
///
/// Lives only for the counterfactual stage of one step: it is advanced and
/// dropped, or dropped unused. Nothing in it ever reaches the real state.
pub struct FictitiousState {
    state: Box<dyn GameEnv>,
}

impl FictitiousState {
    pub fn capture(env: &dyn GameEnv) -> Self {
        Self {
            state: env.clone_state(),
        }
    }

    pub fn move_for_action(&self, action: u32) -> Move {
        self.state.move_for_action(action)
    }

    pub fn apply(&mut self, mv: Move) -> Result<StepOutcome, EnvError> {
        self.state.apply_move(mv)
    }

    pub fn observe(&self, player: PlayerId) -> TensorMap {
        self.state.observe(player)
    }
}

/// Tracks belief-resampling outcomes across counterfactual steps.
///
/// A failed resample is counted and the transition proceeds with the
/// unresampled hand; nothing here is fatal.
#[derive(Debug, Default)]
pub struct CounterfactualEngine {
    successes: u64,
    failures: u64,
}

impl CounterfactualEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Swap `player`'s own hand in the clone for one sampled from belief.
    pub fn resample(
        &mut self,
        fict: &mut FictitiousState,
        player: PlayerId,
        rng: &mut ChaCha8Rng,
    ) -> bool {
        let ok = fict.state.resample_hand(player, rng);
        if ok {
            self.successes += 1;
        } else {
            self.failures += 1;
        }
        ok
    }

    /// Fraction of resamples that succeeded since the last read; counters
    /// reset to zero on every call. No attempts reads as 0.
    pub fn success_rate(&mut self) -> f32 {
        let total = self.successes + self.failures;
        let rate = if total == 0 {
            0.0
        } else {
            self.successes as f32 / total as f32
        };
        self.successes = 0;
        self.failures = 0;
        rate
    }
}
