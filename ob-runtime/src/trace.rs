//! NDJSON-backed stage tracing.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use ob_actor::{StageNote, StageObserver};
use ob_logging::{now_ms, NdjsonWriter, StageEventV1};

/// Writes one `stage` event per actor transition. Clone one per seat; all
/// clones share the writer and the current game id.
#[derive(Clone)]
pub struct NdjsonStageObserver {
    writer: Arc<Mutex<NdjsonWriter>>,
    run_id: String,
    game_id: Arc<AtomicU64>,
}

impl NdjsonStageObserver {
    pub fn new(writer: Arc<Mutex<NdjsonWriter>>, run_id: impl Into<String>) -> Self {
        Self {
            writer,
            run_id: run_id.into(),
            game_id: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Tag subsequent events with a new episode id.
    pub fn set_game_id(&self, game_id: u64) {
        self.game_id.store(game_id, Ordering::Relaxed);
    }
}

impl StageObserver for NdjsonStageObserver {
    fn on_stage(&mut self, note: StageNote) {
        let event = StageEventV1 {
            event: "stage",
            ts_ms: now_ms(),
            run_id: self.run_id.clone(),
            game_id: self.game_id.load(Ordering::Relaxed),
            actor: note.actor,
            stage: note.stage,
            detail: note.detail,
        };
        // Tracing is best-effort; a full disk must not kill the episode.
        let _ = self.writer.lock().unwrap().write_event(&event);
    }
}
