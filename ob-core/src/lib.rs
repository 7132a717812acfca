//! ob-core: payload tensors, the rules-engine boundary, and configuration.
//!
//! Everything the batching layer and the actors agree on lives here:
//! - `TensorMap`: the opaque named-tensor payloads crossing the model boundary
//! - `GameEnv`: the interface the harness consumes from a rules engine
//! - `MiniGame`: a small built-in cooperative game for tests and demos
//! - `Config`: unified YAML configuration

pub mod config;
pub mod env;
pub mod tensor;
pub mod toy;

pub use config::{ActorConfig, Config, ConfigError, GameConfig, ModelConfig, SchedulerConfig};
pub use env::{EnvError, GameEnv, Move, PlayerId, StepOutcome};
pub use tensor::{stack, unstack, Tensor, TensorError, TensorMap};
pub use toy::MiniGame;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_nonempty() {
        assert!(!VERSION.is_empty());
    }
}

#[cfg(test)]
mod tensor_tests;

#[cfg(test)]
mod toy_tests;
