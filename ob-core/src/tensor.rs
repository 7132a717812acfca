//! Named-tensor payloads crossing the actor/model boundary.
//!
//! A request or reply is a `TensorMap`: name -> flat `f32` tensor. The
//! batching layer stacks per-caller rows along a new leading dimension and
//! unstacks the aggregate reply back in submission order.

use rustc_hash::FxHashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TensorError {
    #[error("empty batch")]
    EmptyBatch,
    #[error("key {0:?} missing from a batch row")]
    KeyMismatch(String),
    #[error("row shape mismatch for key {0:?}")]
    RowShapeMismatch(String),
    #[error("cannot split {key:?} (leading dim {lead}) into {rows} rows")]
    SplitMismatch {
        key: String,
        lead: usize,
        rows: usize,
    },
    #[error("missing key {0:?}")]
    MissingKey(String),
    #[error("expected single-element tensor at key {0:?}")]
    NotScalar(String),
}

/// A dense row-major `f32` tensor with an explicit shape.
///
/// Scalars carry an empty shape; stacking a scalar across N rows yields
/// shape `[N]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    data: Vec<f32>,
    shape: Vec<usize>,
}

impl Tensor {
    pub fn new(data: Vec<f32>, shape: Vec<usize>) -> Self {
        debug_assert_eq!(
            data.len(),
            shape.iter().product::<usize>(),
            "tensor data length must match shape product"
        );
        Self { data, shape }
    }

    /// Zero-dimensional tensor holding one value.
    pub fn scalar(v: f32) -> Self {
        Self {
            data: vec![v],
            shape: Vec::new(),
        }
    }

    /// One-dimensional tensor over `data`.
    pub fn from_vec(data: Vec<f32>) -> Self {
        let len = data.len();
        Self {
            data,
            shape: vec![len],
        }
    }

    pub fn zeros(shape: Vec<usize>) -> Self {
        let len = shape.iter().product();
        Self {
            data: vec![0.0; len],
            shape,
        }
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The value of a single-element tensor.
    pub fn item(&self) -> Option<f32> {
        if self.data.len() == 1 {
            Some(self.data[0])
        } else {
            None
        }
    }

    /// Index of the largest element; ties go to the lowest index.
    pub fn argmax(&self) -> Option<usize> {
        let mut best: Option<(usize, f32)> = None;
        for (i, &v) in self.data.iter().enumerate() {
            match best {
                Some((_, b)) if v <= b => {}
                _ => best = Some((i, v)),
            }
        }
        best.map(|(i, _)| i)
    }
}

/// Name -> tensor mapping; the opaque Request/Reply payload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TensorMap {
    entries: FxHashMap<String, Tensor>,
}

impl TensorMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, t: Tensor) {
        self.entries.insert(key.into(), t);
    }

    pub fn get(&self, key: &str) -> Option<&Tensor> {
        self.entries.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Tensor> {
        self.entries.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(|k| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Tensor)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Single value stored at `key`.
    pub fn scalar(&self, key: &str) -> Result<f32, TensorError> {
        let t = self
            .get(key)
            .ok_or_else(|| TensorError::MissingKey(key.to_string()))?;
        t.item().ok_or_else(|| TensorError::NotScalar(key.to_string()))
    }
}

impl IntoIterator for TensorMap {
    type Item = (String, Tensor);
    type IntoIter = <FxHashMap<String, Tensor> as IntoIterator>::IntoIter;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Stack N request rows into one batch map.
///
/// Every row must carry the same keys with the same per-key shapes; each
/// output tensor gains a leading dimension of N.
pub fn stack(rows: &[&TensorMap]) -> Result<TensorMap, TensorError> {
    let first = *rows.first().ok_or(TensorError::EmptyBatch)?;
    for row in &rows[1..] {
        for key in row.keys() {
            if !first.contains_key(key) {
                return Err(TensorError::KeyMismatch(key.to_string()));
            }
        }
    }

    let mut out = TensorMap::new();
    for (key, proto) in first.iter() {
        let mut data = Vec::with_capacity(proto.len() * rows.len());
        for row in rows {
            let t = row
                .get(key)
                .ok_or_else(|| TensorError::KeyMismatch(key.to_string()))?;
            if t.shape() != proto.shape() {
                return Err(TensorError::RowShapeMismatch(key.to_string()));
            }
            data.extend_from_slice(t.data());
        }
        let mut shape = Vec::with_capacity(proto.shape().len() + 1);
        shape.push(rows.len());
        shape.extend_from_slice(proto.shape());
        out.insert(key, Tensor::new(data, shape));
    }
    Ok(out)
}

/// Split a batch reply back into `rows` per-caller maps, preserving order.
pub fn unstack(batch: &TensorMap, rows: usize) -> Result<Vec<TensorMap>, TensorError> {
    if rows == 0 {
        return Err(TensorError::EmptyBatch);
    }
    let mut out = vec![TensorMap::new(); rows];
    for (key, t) in batch.iter() {
        let (&lead, rest) = t
            .shape()
            .split_first()
            .ok_or_else(|| TensorError::SplitMismatch {
                key: key.to_string(),
                lead: 0,
                rows,
            })?;
        if lead != rows {
            return Err(TensorError::SplitMismatch {
                key: key.to_string(),
                lead,
                rows,
            });
        }
        let row_len: usize = rest.iter().product();
        for (i, row) in out.iter_mut().enumerate() {
            let slice = &t.data()[i * row_len..(i + 1) * row_len];
            row.insert(key, Tensor::new(slice.to_vec(), rest.to_vec()));
        }
    }
    Ok(out)
}
