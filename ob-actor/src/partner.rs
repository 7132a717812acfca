//! Cheap shared handles between co-playing actors.
//!
//! Actors never own each other. Each player has one `PartnerLink`; every
//! actor holds a clone of every link, addressed by player id. Through its own
//! link an actor publishes the snapshot a partner needs to re-evaluate it
//! (previous hidden cells, exploration parameters) and receives the mailbox
//! reply such a re-evaluation produces.

use std::sync::{Arc, Mutex};

use ob_batch::FutureReply;
use ob_core::TensorMap;

#[derive(Debug, Default)]
struct PartnerShared {
    prev_hidden: TensorMap,
    eps: f32,
    temperature: f32,
    inbox: Option<FutureReply>,
}

/// Shared handle to one player's published state and mailbox.
#[derive(Debug, Clone, Default)]
pub struct PartnerLink {
    shared: Arc<Mutex<PartnerShared>>,
}

impl PartnerLink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build one link per player.
    pub fn links_for(num_players: usize) -> Vec<PartnerLink> {
        (0..num_players).map(|_| PartnerLink::new()).collect()
    }

    /// Publish this player's request-building snapshot.
    pub fn publish(&self, prev_hidden: TensorMap, eps: f32, temperature: f32) {
        let mut sh = self.shared.lock().unwrap();
        sh.prev_hidden = prev_hidden;
        sh.eps = eps;
        sh.temperature = temperature;
    }

    /// Previous hidden cells plus (eps, temperature) as last published.
    pub fn snapshot(&self) -> (TensorMap, f32, f32) {
        let sh = self.shared.lock().unwrap();
        (sh.prev_hidden.clone(), sh.eps, sh.temperature)
    }

    /// Hand a counterfactual re-evaluation future to this player. With
    /// several off-turn evaluators in one step only the latest delivery
    /// stands; a superseded future is handed back so the caller can trace
    /// the drop.
    pub fn deliver(&self, future: FutureReply) -> Option<FutureReply> {
        self.shared.lock().unwrap().inbox.replace(future)
    }

    /// Consume the pending re-evaluation reply, if any.
    pub fn take_inbox(&self) -> Option<FutureReply> {
        self.shared.lock().unwrap().inbox.take()
    }

    pub fn has_pending(&self) -> bool {
        self.shared.lock().unwrap().inbox.is_some()
    }
}
