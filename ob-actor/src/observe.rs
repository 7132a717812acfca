//! Injectable hook fired on every stage transition.

use ob_core::PlayerId;

/// One stage transition, as seen from the outside.
#[derive(Debug, Clone, PartialEq)]
pub struct StageNote {
    pub actor: PlayerId,
    pub stage: &'static str,
    pub detail: String,
}

impl StageNote {
    pub fn new(actor: PlayerId, stage: &'static str, detail: impl Into<String>) -> Self {
        Self {
            actor,
            stage,
            detail: detail.into(),
        }
    }
}

/// Structured observability sink; tests and loggers implement this to watch
/// transitions without parsing console text.
pub trait StageObserver: Send {
    fn on_stage(&mut self, note: StageNote);
}

/// Discards every note.
#[derive(Debug, Default)]
pub struct NullObserver;

impl StageObserver for NullObserver {
    fn on_stage(&mut self, _note: StageNote) {}
}
