//! Pre-normalization residual wrapper around a sublayer.

use candle_core::{Result, Tensor};
use candle_nn::{layer_norm, Dropout, LayerNorm, Module, VarBuilder};

use crate::error::{ModelError, ModelResult};

/// Residual connection with pre-normalization:
/// `x + dropout(sublayer(layer_norm(x)))`.
///
/// The sublayer is a first-class function value so the wrapper stays
/// independent of which computation it wraps. The normalization happens
/// strictly *before* the sublayer; the skip path adds back the original,
/// unnormalized input.
#[derive(Debug)]
pub struct SublayerConnection {
    norm: LayerNorm,
    dropout: Dropout,
    d_model: usize,
}

impl SublayerConnection {
    /// Create a wrapper with a fresh layer-norm parameter pair under `vb`.
    pub fn new(d_model: usize, dropout: f32, ln_eps: f64, vb: VarBuilder) -> ModelResult<Self> {
        let norm = layer_norm(d_model, ln_eps, vb.pp("norm"))
            .map_err(ModelError::stage("residual layer-norm init"))?;
        Ok(Self {
            norm,
            dropout: Dropout::new(dropout),
            d_model,
        })
    }

    /// Learnable parameter count (layer-norm scale and shift).
    #[must_use]
    pub fn parameter_count(&self) -> usize {
        // Layer-norm scale and shift vectors.
        2 * self.d_model
    }

    /// Normalize, apply `sublayer`, drop out, add back the input.
    pub fn forward<F>(&self, xs: &Tensor, train: bool, sublayer: F) -> Result<Tensor>
    where
        F: FnOnce(&Tensor) -> Result<Tensor>,
    {
        let normed = self.norm.forward(xs)?;
        let out = sublayer(&normed)?;
        xs + self.dropout.forward(&out, train)?
    }
}
