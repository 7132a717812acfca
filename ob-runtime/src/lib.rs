//! Episode orchestration over the actor and scheduler crates.

pub mod driver;
pub mod trace;

pub use driver::{DriverError, EpisodeSummary, GameDriver};
pub use trace::NdjsonStageObserver;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");


#[cfg(test)]
mod tests {
    #[test]
    fn version_is_nonempty() {
        assert!(!super::VERSION.is_empty());
    }
}
