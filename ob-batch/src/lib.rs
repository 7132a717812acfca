//! Request-batching model scheduler.
//!
//! Callers submit single-row tensor requests against named methods and get
//! back a [`FutureReply`]. A per-method worker thread drains whatever is
//! queued (up to the registered bound), stacks it into one batched model
//! invocation, and splits the reply back out to the callers in drain order.
//! The worker never waits for a batch to fill: latency is bounded by model
//! time, not queue depth.

pub mod batcher;
pub mod future;
pub mod model;
pub mod runner;

pub use future::{CallError, FutureReply};
pub use model::{BatchModel, ModelError, UniformModel};
pub use runner::{BatchRunner, MethodStats, RunnerStatsSnapshot, SchedulerError};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
