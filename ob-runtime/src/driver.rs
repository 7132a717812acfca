//! Episode loop: lockstep actors over one game instance.

use serde::Serialize;
use thiserror::Error;

use ob_actor::{ActorError, PlayerActor};
use ob_core::{EnvError, GameEnv};

#[derive(Debug, Error)]
pub enum DriverError {
    #[error(transparent)]
    Actor(#[from] ActorError),
    #[error(transparent)]
    Env(#[from] EnvError),
    #[error("episode made no progress after {0} iterations")]
    Stalled(u64),
}

/// What one finished episode looked like.
#[derive(Debug, Clone, Serialize)]
pub struct EpisodeSummary {
    pub game_id: u64,
    pub steps: u32,
    pub score: f32,
    /// Mean belief-resample success fraction over the off-belief seats;
    /// `None` when no seat ran counterfactual evaluation.
    pub fict_success_rate: Option<f32>,
}

/// Owns every seat at the table and steps them in lockstep: each iteration
/// advances every actor one stage, then applies the single concrete move the
/// acting player produced. Placeholder no-op moves are never applied.
pub struct GameDriver {
    actors: Vec<PlayerActor>,
    max_iters: u64,
}

impl GameDriver {
    pub fn new(actors: Vec<PlayerActor>) -> Self {
        Self {
            actors,
            max_iters: 100_000,
        }
    }

    /// Bound on stage iterations per episode; exceeding it means the
    /// actor/game combination stopped making progress.
    pub fn with_max_iters(mut self, max_iters: u64) -> Self {
        self.max_iters = max_iters;
        self
    }

    pub fn actors_mut(&mut self) -> &mut [PlayerActor] {
        &mut self.actors
    }

    pub fn play_episode(
        &mut self,
        env: &mut dyn GameEnv,
        game_id: u64,
    ) -> Result<EpisodeSummary, DriverError> {
        env.reset();
        for actor in &mut self.actors {
            actor.reset();
        }

        let mut steps: u32 = 0;
        let mut iters: u64 = 0;
        while !env.terminated() {
            iters += 1;
            if iters > self.max_iters {
                return Err(DriverError::Stalled(self.max_iters));
            }
            let mut applied = None;
            for actor in &mut self.actors {
                if let Some(mv) = actor.advance(&*env)? {
                    if !mv.is_no_op() && actor.id() == env.current_player() {
                        applied = Some(mv);
                    }
                }
            }
            if let Some(mv) = applied {
                env.apply_move(mv)?;
                steps += 1;
            }
        }

        // Let every mid-cycle actor wind down to the top of its cycle so no
        // pending reply leaks into the next episode.
        while self.actors.iter().any(|a| !a.step_done()) {
            iters += 1;
            if iters > self.max_iters {
                return Err(DriverError::Stalled(self.max_iters));
            }
            for actor in &mut self.actors {
                if !actor.step_done() {
                    actor.advance(&*env)?;
                }
            }
        }

        let rates: Vec<f32> = self
            .actors
            .iter_mut()
            .filter_map(|a| a.fict_success_rate())
            .collect();
        let fict_success_rate = if rates.is_empty() {
            None
        } else {
            Some(rates.iter().sum::<f32>() / rates.len() as f32)
        };

        Ok(EpisodeSummary {
            game_id,
            steps,
            score: env.score(),
            fict_success_rate,
        })
    }
}
