//! A minimal cooperative hidden-hand card game.
//!
//! Players hold cards they cannot see and try to play ranks 1..=max_rank in
//! ascending order onto a shared pile. Wrong plays burn a life, discards
//! recover a hint token, hints spend one. This is not a full game — it is the
//! smallest engine that exercises every part of the `GameEnv` boundary
//! (hidden own hand, belief resampling, cloning, termination) so the harness
//! can run without an external rules engine.

use rand::seq::SliceRandom;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use rand_core::SeedableRng;

use crate::config::GameConfig;
use crate::env::{EnvError, GameEnv, Move, PlayerId, StepOutcome};
use crate::tensor::{Tensor, TensorMap};

#[derive(Debug, Clone, PartialEq)]
pub struct MiniGame {
    players: usize,
    hand_size: usize,
    max_rank: u8,
    copies: usize,
    lives_max: u8,
    hints_max: u8,
    max_steps: u32,

    rng: ChaCha8Rng,
    deck: Vec<u8>,
    hands: Vec<Vec<u8>>,
    pile: u8,
    lives: u8,
    hints: u8,
    steps: u32,
    cur: PlayerId,
    last: Option<Move>,
    done: bool,
}

impl MiniGame {
    pub fn new(cfg: &GameConfig) -> Self {
        let mut g = Self {
            players: cfg.players as usize,
            hand_size: cfg.hand_size,
            max_rank: cfg.max_rank,
            copies: cfg.copies,
            lives_max: cfg.lives,
            hints_max: cfg.hints,
            max_steps: cfg.max_steps,
            rng: ChaCha8Rng::seed_from_u64(cfg.seed),
            deck: Vec::new(),
            hands: Vec::new(),
            pile: 0,
            lives: 0,
            hints: 0,
            steps: 0,
            cur: 0,
            last: None,
            done: false,
        };
        g.reset();
        g
    }

    /// Number of discrete action ids: play/discard per hand slot plus hint.
    pub fn action_space(&self) -> usize {
        2 * self.hand_size + 1
    }

    fn hint_action(&self) -> u32 {
        (2 * self.hand_size) as u32
    }

    fn draw(&mut self, player: usize) {
        if let Some(card) = self.deck.pop() {
            self.hands[player].push(card);
        }
    }

    fn check_termination(&mut self) {
        if self.lives == 0
            || self.pile == self.max_rank
            || self.steps >= self.max_steps
            || (self.deck.is_empty() && self.hands.iter().any(|h| h.is_empty()))
        {
            self.done = true;
        }
    }

    fn illegal(&self, mv: Move) -> EnvError {
        EnvError::IllegalMove {
            player: self.cur,
            move_id: mv.id(),
        }
    }
}

impl GameEnv for MiniGame {
    fn num_players(&self) -> usize {
        self.players
    }

    fn current_player(&self) -> PlayerId {
        self.cur
    }

    fn terminated(&self) -> bool {
        self.done
    }

    fn reset(&mut self) {
        self.deck.clear();
        for rank in 1..=self.max_rank {
            for _ in 0..self.copies {
                self.deck.push(rank);
            }
        }
        self.deck.shuffle(&mut self.rng);

        self.hands = vec![Vec::with_capacity(self.hand_size); self.players];
        for p in 0..self.players {
            for _ in 0..self.hand_size {
                self.draw(p);
            }
        }
        self.pile = 0;
        self.lives = self.lives_max;
        self.hints = self.hints_max;
        self.steps = 0;
        self.cur = 0;
        self.last = None;
        self.done = false;
    }

    fn legal_moves(&self, player: PlayerId) -> Vec<Move> {
        if self.done {
            return Vec::new();
        }
        let hand_len = self.hands[player as usize].len();
        let mut out = Vec::with_capacity(2 * hand_len + 1);
        for i in 0..hand_len {
            out.push(Move::new(i as u32));
        }
        for i in 0..hand_len {
            out.push(Move::new((self.hand_size + i) as u32));
        }
        if self.hints > 0 {
            out.push(Move::new(self.hint_action()));
        }
        out
    }

    fn move_for_action(&self, action: u32) -> Move {
        Move::new(action)
    }

    fn last_move(&self) -> Option<Move> {
        self.last
    }

    fn observe(&self, player: PlayerId) -> TensorMap {
        let p = player as usize;
        let deck_total = (self.max_rank as usize * self.copies) as f32;

        let mut feat = Vec::new();
        feat.push(self.pile as f32 / self.max_rank as f32);
        feat.push(self.lives as f32 / self.lives_max.max(1) as f32);
        feat.push(self.hints as f32 / self.hints_max.max(1) as f32);
        feat.push(self.deck.len() as f32 / deck_total);
        // Other players' hands are visible; the own hand is not.
        for q in 0..self.players {
            if q == p {
                continue;
            }
            for slot in 0..self.hand_size {
                let mut onehot = vec![0.0f32; self.max_rank as usize];
                if let Some(&card) = self.hands[q].get(slot) {
                    onehot[(card - 1) as usize] = 1.0;
                }
                feat.extend_from_slice(&onehot);
            }
        }

        let mut mask = vec![0.0f32; self.action_space()];
        for mv in self.legal_moves(player) {
            mask[mv.id() as usize] = 1.0;
        }

        let mut out = TensorMap::new();
        out.insert("priv_s", Tensor::from_vec(feat));
        out.insert("legal_move", Tensor::from_vec(mask));
        out
    }

    fn apply_move(&mut self, mv: Move) -> Result<StepOutcome, EnvError> {
        if self.done {
            return Err(EnvError::Terminated);
        }
        if mv.is_no_op() || mv.id() as usize > 2 * self.hand_size {
            return Err(self.illegal(mv));
        }

        let p = self.cur as usize;
        let id = mv.id() as usize;
        let mut reward = 0.0;

        if id == 2 * self.hand_size {
            if self.hints == 0 {
                return Err(self.illegal(mv));
            }
            self.hints -= 1;
        } else if id < self.hand_size {
            if id >= self.hands[p].len() {
                return Err(self.illegal(mv));
            }
            let card = self.hands[p].remove(id);
            if card == self.pile + 1 {
                self.pile = card;
                reward = 1.0;
            } else {
                self.lives = self.lives.saturating_sub(1);
            }
            self.draw(p);
        } else {
            let slot = id - self.hand_size;
            if slot >= self.hands[p].len() {
                return Err(self.illegal(mv));
            }
            self.hands[p].remove(slot);
            self.hints = (self.hints + 1).min(self.hints_max);
            self.draw(p);
        }

        self.steps += 1;
        self.last = Some(mv);
        self.cur = ((self.cur as usize + 1) % self.players) as PlayerId;
        self.check_termination();

        Ok(StepOutcome {
            reward,
            terminated: self.done,
        })
    }

    fn clone_state(&self) -> Box<dyn GameEnv> {
        Box::new(self.clone())
    }

    fn resample_hand(&mut self, player: PlayerId, rng: &mut ChaCha8Rng) -> bool {
        let p = player as usize;
        let hand_len = self.hands[p].len();
        // The belief pool is the deck: cards nobody can see. Too few of them
        // means no full replacement hand exists.
        if self.deck.len() < hand_len {
            return false;
        }
        let old = std::mem::take(&mut self.hands[p]);
        let mut new_hand = Vec::with_capacity(hand_len);
        for _ in 0..hand_len {
            let i = rng.gen_range(0..self.deck.len());
            new_hand.push(self.deck.swap_remove(i));
        }
        self.deck.extend(old);
        self.deck.shuffle(rng);
        self.hands[p] = new_hand;
        true
    }

    fn score(&self) -> f32 {
        self.pile as f32
    }

    fn describe(&self, player: PlayerId) -> String {
        let mut s = format!(
            "pile: {}  lives: {}  hints: {}  deck: {}\n",
            self.pile,
            self.lives,
            self.hints,
            self.deck.len()
        );
        for q in 0..self.players {
            if q == player as usize {
                s.push_str(&format!("  player {q} (you): {} hidden cards\n", self.hands[q].len()));
            } else {
                let cards: Vec<String> =
                    self.hands[q].iter().map(|c| c.to_string()).collect();
                s.push_str(&format!("  player {q}: [{}]\n", cards.join(" ")));
            }
        }
        s
    }

    fn describe_move(&self, mv: Move) -> String {
        if mv.is_no_op() {
            return "noop".to_string();
        }
        let id = mv.id() as usize;
        if id < self.hand_size {
            format!("play slot {id}")
        } else if id < 2 * self.hand_size {
            format!("discard slot {}", id - self.hand_size)
        } else if id == 2 * self.hand_size {
            "hint".to_string()
        } else {
            format!("move#{id}")
        }
    }
}
