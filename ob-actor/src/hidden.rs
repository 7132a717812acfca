//! Recurrent cells carried by one actor between model calls.

use ob_core::TensorMap;

use crate::policy::ActorError;

/// Previous/current recurrent state for a single actor.
///
/// `previous` is what goes into the next request and is never touched after
/// submission; `current` is replaced wholesale when a reply arrives. The cell
/// key set is fixed at construction by the model's initial hidden map.
#[derive(Debug, Clone)]
pub struct HiddenStateStore {
    keys: Vec<String>,
    previous: TensorMap,
    current: TensorMap,
}

impl HiddenStateStore {
    pub fn new(initial: TensorMap) -> Self {
        let keys = initial.keys().map(str::to_owned).collect();
        Self {
            keys,
            previous: initial.clone(),
            current: initial,
        }
    }

    /// Snapshot `current` into `previous` at the top of a step.
    pub fn begin_step(&mut self) {
        self.previous = self.current.clone();
    }

    /// Copy the previous cells into an outgoing request.
    pub fn attach(&self, request: &mut TensorMap) {
        for (key, tensor) in self.previous.iter() {
            request.insert(key, tensor.clone());
        }
    }

    /// Replace `current` from a reply, removing the cell keys from it.
    pub fn absorb_reply(&mut self, reply: &mut TensorMap) -> Result<(), ActorError> {
        let mut next = TensorMap::new();
        for key in &self.keys {
            let cell = reply
                .remove(key)
                .ok_or_else(|| ActorError::MissingCell(key.clone()))?;
            next.insert(key.clone(), cell);
        }
        self.current = next;
        Ok(())
    }

    pub fn previous(&self) -> &TensorMap {
        &self.previous
    }
}
