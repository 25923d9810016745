//! Token embedding front-end.

use candle_core::{Result, Tensor};
use candle_nn::{embedding, Embedding, Module, VarBuilder};

use crate::error::{ModelError, ModelResult};

/// Embedding-table lookup scaled by `sqrt(d_model)`.
///
/// The scaling counteracts the small variance of freshly initialized
/// embeddings relative to the additive positional signal applied next.
#[derive(Debug)]
pub struct TokenEmbedding {
    inner: Embedding,
    scale: f64,
    vocab_size: usize,
    d_model: usize,
}

impl TokenEmbedding {
    /// Create a `vocab_size x d_model` embedding table under `vb`.
    pub fn new(vocab_size: usize, d_model: usize, vb: VarBuilder) -> ModelResult<Self> {
        let inner = embedding(vocab_size, d_model, vb.pp("table"))
            .map_err(ModelError::stage("embedding table init"))?;
        Ok(Self {
            inner,
            scale: (d_model as f64).sqrt(),
            vocab_size,
            d_model,
        })
    }

    /// Learnable parameter count of the table.
    #[must_use]
    pub fn parameter_count(&self) -> usize {
        self.vocab_size * self.d_model
    }

    /// Map `(batch, seq_len)` integer ids to `(batch, seq_len, d_model)`
    /// scaled feature vectors.
    pub fn forward(&self, ids: &Tensor) -> Result<Tensor> {
        self.inner.forward(ids)? * self.scale
    }
}
