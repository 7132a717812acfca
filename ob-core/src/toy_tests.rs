use rand_chacha::ChaCha8Rng;
use rand_core::SeedableRng;

use crate::config::GameConfig;
use crate::env::{EnvError, GameEnv, Move};
use crate::toy::MiniGame;

fn small_cfg() -> GameConfig {
    GameConfig {
        players: 2,
        hand_size: 2,
        max_rank: 3,
        copies: 2,
        lives: 2,
        hints: 2,
        max_steps: 32,
        seed: 11,
    }
}

#[test]
fn fresh_game_has_legal_moves_for_both_players() {
    let g = MiniGame::new(&small_cfg());
    assert!(!g.terminated());
    assert_eq!(g.current_player(), 0);
    for p in 0..2 {
        let moves = g.legal_moves(p);
        assert!(!moves.is_empty());
        for mv in moves {
            assert!((mv.id() as usize) < g.action_space());
        }
    }
}

#[test]
fn plays_alternate_and_terminate() {
    let mut g = MiniGame::new(&small_cfg());
    let mut steps = 0;
    while !g.terminated() && steps < 100 {
        let mv = g.legal_moves(g.current_player())[0];
        g.apply_move(mv).unwrap();
        steps += 1;
    }
    assert!(g.terminated());
    assert!(g.legal_moves(0).is_empty());
    assert!(matches!(
        g.apply_move(Move::new(0)),
        Err(EnvError::Terminated)
    ));
}

#[test]
fn illegal_moves_are_rejected() {
    let mut g = MiniGame::new(&small_cfg());
    assert!(matches!(
        g.apply_move(Move::new(99)),
        Err(EnvError::IllegalMove { .. })
    ));
    assert!(matches!(
        g.apply_move(Move::NO_OP),
        Err(EnvError::IllegalMove { .. })
    ));
}

#[test]
fn clone_state_is_isolated() {
    let g = MiniGame::new(&small_cfg());
    let before = g.clone();
    let mut fict = g.clone_state();
    let mv = fict.legal_moves(fict.current_player())[0];
    fict.apply_move(mv).unwrap();
    // Mutating the clone leaves the original untouched.
    assert_eq!(g, before);
    assert_ne!(fict.last_move(), g.last_move());
}

#[test]
fn resample_keeps_hand_size_and_card_pool() {
    let mut g = MiniGame::new(&small_cfg());
    let before = g.clone();
    let mut rng = ChaCha8Rng::seed_from_u64(3);
    assert!(g.resample_hand(0, &mut rng));
    // Same observation shape; the partner's view of player 0 may differ.
    let obs = g.observe(1);
    assert_eq!(
        obs.get("priv_s").unwrap().shape(),
        before.observe(1).get("priv_s").unwrap().shape()
    );
    // Player 0's own view never includes its own hand, so it is unchanged.
    assert_eq!(g.observe(0), before.observe(0));
}

#[test]
fn resample_fails_when_deck_is_short() {
    let cfg = GameConfig {
        players: 2,
        hand_size: 3,
        max_rank: 2,
        copies: 3,
        lives: 2,
        hints: 1,
        max_steps: 16,
        seed: 5,
    };
    // 6-card deck, 6 cards dealt: nothing left to resample from.
    let mut g = MiniGame::new(&cfg);
    let before = g.clone();
    let mut rng = ChaCha8Rng::seed_from_u64(3);
    assert!(!g.resample_hand(0, &mut rng));
    assert_eq!(g, before);
}

#[test]
fn reset_starts_a_new_deal() {
    let mut g = MiniGame::new(&small_cfg());
    let mv = g.legal_moves(0)[0];
    g.apply_move(mv).unwrap();
    g.reset();
    assert!(!g.terminated());
    assert_eq!(g.current_player(), 0);
    assert_eq!(g.last_move(), None);
    assert_eq!(g.score(), 0.0);
}
