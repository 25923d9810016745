//! Position-wise feed-forward block.

use candle_core::{Result, Tensor};
use candle_nn::{linear, Dropout, Linear, Module, VarBuilder};

use crate::error::{ModelError, ModelResult};

/// Two affine transformations with a rectified-linear nonlinearity and
/// dropout between them: `d_model -> d_ff -> d_model`. Purely pointwise
/// across the sequence axis; no cross-position mixing.
#[derive(Debug)]
pub struct FeedForward {
    w_in: Linear,
    w_out: Linear,
    dropout: Dropout,
    d_model: usize,
    d_ff: usize,
}

impl FeedForward {
    /// Create a feed-forward block with fresh parameters under `vb`.
    pub fn new(d_model: usize, d_ff: usize, dropout: f32, vb: VarBuilder) -> ModelResult<Self> {
        let w_in = linear(d_model, d_ff, vb.pp("w_in"))
            .map_err(ModelError::stage("feed-forward input projection init"))?;
        let w_out = linear(d_ff, d_model, vb.pp("w_out"))
            .map_err(ModelError::stage("feed-forward output projection init"))?;
        Ok(Self {
            w_in,
            w_out,
            dropout: Dropout::new(dropout),
            d_model,
            d_ff,
        })
    }

    /// Learnable parameter count of both affine maps.
    #[must_use]
    pub fn parameter_count(&self) -> usize {
        self.d_model * self.d_ff + self.d_ff + self.d_ff * self.d_model + self.d_model
    }

    /// Apply the block pointwise along the sequence axis.
    pub fn forward(&self, xs: &Tensor, train: bool) -> Result<Tensor> {
        let hidden = self.w_in.forward(xs)?.relu()?;
        let hidden = self.dropout.forward(&hidden, train)?;
        self.w_out.forward(&hidden)
    }
}
