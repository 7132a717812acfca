//! Unified configuration schema for the harness.
//!
//! Loaded from YAML; every field has a default so a missing file or section
//! still yields a runnable setup.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Configuration loading errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    /// Request-batching scheduler settings.
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    /// Policy-actor settings.
    #[serde(default)]
    pub actor: ActorConfig,
    /// Built-in game settings.
    #[serde(default)]
    pub game: GameConfig,
    /// Baseline model settings.
    #[serde(default)]
    pub model: ModelConfig,
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let bytes = std::fs::read(path)?;
        Ok(serde_yaml::from_slice(&bytes)?)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SchedulerConfig {
    /// Maximum rows per model invocation before flushing.
    #[serde(default = "default_max_batch")]
    pub max_batch: u32,
}

fn default_max_batch() -> u32 {
    8
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_batch: default_max_batch(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ActorConfig {
    /// Exploration-epsilon candidates; one is resampled per episode reset.
    #[serde(default = "default_eps")]
    pub eps: Vec<f32>,
    /// Boltzmann temperature candidates; empty disables the feature.
    #[serde(default)]
    pub temperature: Vec<f32>,
    /// Enable counterfactual (off-belief) evaluation.
    #[serde(default)]
    pub off_belief: bool,
    /// Base seed for per-actor RNG streams.
    #[serde(default = "default_actor_seed")]
    pub seed: u64,
}

fn default_eps() -> Vec<f32> {
    vec![0.0]
}

fn default_actor_seed() -> u64 {
    1
}

impl Default for ActorConfig {
    fn default() -> Self {
        Self {
            eps: default_eps(),
            temperature: Vec::new(),
            off_belief: false,
            seed: default_actor_seed(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GameConfig {
    #[serde(default = "default_players")]
    pub players: u8,
    #[serde(default = "default_hand_size")]
    pub hand_size: usize,
    /// Card ranks run 1..=max_rank.
    #[serde(default = "default_max_rank")]
    pub max_rank: u8,
    /// Copies of each rank in the deck.
    #[serde(default = "default_copies")]
    pub copies: usize,
    #[serde(default = "default_lives")]
    pub lives: u8,
    #[serde(default = "default_hints")]
    pub hints: u8,
    #[serde(default = "default_max_steps")]
    pub max_steps: u32,
    #[serde(default = "default_game_seed")]
    pub seed: u64,
}

fn default_players() -> u8 {
    2
}

fn default_hand_size() -> usize {
    2
}

fn default_max_rank() -> u8 {
    5
}

fn default_copies() -> usize {
    3
}

fn default_lives() -> u8 {
    2
}

fn default_hints() -> u8 {
    3
}

fn default_max_steps() -> u32 {
    64
}

fn default_game_seed() -> u64 {
    7
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            players: default_players(),
            hand_size: default_hand_size(),
            max_rank: default_max_rank(),
            copies: default_copies(),
            lives: default_lives(),
            hints: default_hints(),
            max_steps: default_max_steps(),
            seed: default_game_seed(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ModelConfig {
    /// Recurrent cell width for the baseline model.
    #[serde(default = "default_hidden_dim")]
    pub hidden_dim: usize,
}

fn default_hidden_dim() -> usize {
    16
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            hidden_dim: default_hidden_dim(),
        }
    }
}
