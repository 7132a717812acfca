//! Operator-driven player. Same capability set as the policy actor, but the
//! decision comes from an injected source instead of the model.

use std::io::{self, BufRead, Write};

use ob_core::{GameEnv, Move, PlayerId};

use crate::policy::ActorError;

/// Where a human move comes from: some frontend gets a rendered view of the
/// state plus the labelled legal moves and answers with an index into them,
/// or `None` to abort.
pub trait DecisionSource: Send {
    fn choose(&mut self, view: &str, moves: &[(Move, String)]) -> Option<usize>;
}

/// Interactive console prompt; reprompts on unparseable input, aborts on EOF.
#[derive(Debug, Default)]
pub struct ConsoleSource;

impl DecisionSource for ConsoleSource {
    fn choose(&mut self, view: &str, moves: &[(Move, String)]) -> Option<usize> {
        if moves.is_empty() {
            return None;
        }
        let stdin = io::stdin();
        let mut line = String::new();
        loop {
            println!("{view}");
            for (i, (_, label)) in moves.iter().enumerate() {
                println!("  [{i}] {label}");
            }
            print!("move> ");
            let _ = io::stdout().flush();
            line.clear();
            match stdin.lock().read_line(&mut line) {
                Ok(0) | Err(_) => return None,
                Ok(_) => {}
            }
            if let Ok(i) = line.trim().parse::<usize>() {
                if i < moves.len() {
                    return Some(i);
                }
            }
            println!("pick an index between 0 and {}", moves.len() - 1);
        }
    }
}

/// Closure-backed source for embedding frontends.
pub struct CallbackSource {
    callback: Box<dyn FnMut(&str, &[(Move, String)]) -> Option<usize> + Send>,
}

impl CallbackSource {
    pub fn new(
        callback: impl FnMut(&str, &[(Move, String)]) -> Option<usize> + Send + 'static,
    ) -> Self {
        Self {
            callback: Box::new(callback),
        }
    }
}

impl DecisionSource for CallbackSource {
    fn choose(&mut self, view: &str, moves: &[(Move, String)]) -> Option<usize> {
        (self.callback)(view, moves)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HumanStage {
    Observe,
    Decide,
}

/// Two-stage observe/decide machine over a `DecisionSource`; emits the no-op
/// placeholder off turn like any other player.
pub struct HumanActor {
    id: PlayerId,
    stage: HumanStage,
    source: Box<dyn DecisionSource>,
}

impl HumanActor {
    pub fn new(id: PlayerId, source: Box<dyn DecisionSource>) -> Self {
        Self {
            id,
            stage: HumanStage::Observe,
            source,
        }
    }

    pub fn id(&self) -> PlayerId {
        self.id
    }

    pub fn reset(&mut self) {
        self.stage = HumanStage::Observe;
    }

    pub fn ready(&self) -> bool {
        true
    }

    pub fn step_done(&self) -> bool {
        self.stage == HumanStage::Observe
    }

    pub fn advance(&mut self, env: &dyn GameEnv) -> Result<Option<Move>, ActorError> {
        match self.stage {
            HumanStage::Observe => {
                self.stage = HumanStage::Decide;
                Ok(None)
            }
            HumanStage::Decide => {
                self.stage = HumanStage::Observe;
                if env.terminated() || env.current_player() != self.id {
                    return Ok(Some(Move::NO_OP));
                }
                let moves: Vec<(Move, String)> = env
                    .legal_moves(self.id)
                    .into_iter()
                    .map(|m| (m, env.describe_move(m)))
                    .collect();
                if moves.is_empty() {
                    return Ok(Some(Move::NO_OP));
                }
                let view = env.describe(self.id);
                let idx = self
                    .source
                    .choose(&view, &moves)
                    .ok_or(ActorError::DecisionAborted)?;
                let mv = moves
                    .get(idx)
                    .map(|(m, _)| *m)
                    .ok_or(ActorError::DecisionAborted)?;
                Ok(Some(mv))
            }
        }
    }
}
