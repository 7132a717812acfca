//! Model boundary: an opaque callable keyed by method name.

use thiserror::Error;

use ob_core::{stack, unstack, Tensor, TensorMap};

/// Opaque failure raised by a model callable.
#[derive(Debug, Error)]
#[error("{msg}")]
pub struct ModelError {
    msg: String,
}

impl ModelError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self { msg: msg.into() }
    }
}

/// A stateful model evaluated one batch at a time.
///
/// Each method is driven by a single worker thread, so a model only needs to
/// be safe for concurrent invocation when more than one method is registered;
/// a model that is not must serialize internally.
pub trait BatchModel: Send + Sync {
    /// Evaluate `batch` (row-stacked requests) under `method`; the reply must
    /// keep the leading dimension and row order of the input.
    fn invoke(&self, method: &str, batch: &TensorMap) -> Result<TensorMap, ModelError>;

    /// Fresh recurrent cells for `batch_size` actors. The returned keys are
    /// the cell names threaded through every subsequent request and reply.
    fn initial_hidden(&self, batch_size: usize) -> TensorMap;
}

/// First-legal-action policy with pass-through recurrent cells.
///
/// A baseline stand-in for a trained model: picks the lowest-id legal action
/// for every row and echoes the hidden cells unchanged.
pub struct UniformModel {
    hidden_dim: usize,
}

impl UniformModel {
    pub fn new(hidden_dim: usize) -> Self {
        Self { hidden_dim }
    }
}

impl BatchModel for UniformModel {
    fn invoke(&self, _method: &str, batch: &TensorMap) -> Result<TensorMap, ModelError> {
        let legal = batch
            .get("legal_move")
            .ok_or_else(|| ModelError::new("batch is missing legal_move"))?;
        let rows = *legal
            .shape()
            .first()
            .ok_or_else(|| ModelError::new("legal_move must be batched"))?;
        let per_row = unstack(batch, rows).map_err(|e| ModelError::new(e.to_string()))?;

        let mut replies = Vec::with_capacity(rows);
        for row in &per_row {
            let mask = row
                .get("legal_move")
                .ok_or_else(|| ModelError::new("row is missing legal_move"))?;
            let action = mask
                .data()
                .iter()
                .position(|&v| v > 0.0)
                .unwrap_or(0);
            let mut reply = TensorMap::new();
            reply.insert("a", Tensor::scalar(action as f32));
            if let Some(h) = row.get("h0") {
                reply.insert("h0", h.clone());
            }
            replies.push(reply);
        }
        let refs: Vec<&TensorMap> = replies.iter().collect();
        stack(&refs).map_err(|e| ModelError::new(e.to_string()))
    }

    fn initial_hidden(&self, batch_size: usize) -> TensorMap {
        let mut out = TensorMap::new();
        out.insert("h0", Tensor::zeros(vec![batch_size, self.hidden_dim]));
        out
    }
}
