//! Multi-head attention over projected subspaces.

use candle_core::{Result, Tensor};
use candle_nn::{linear, Dropout, Linear, Module, VarBuilder};
use tracing::debug;

use crate::error::{ModelError, ModelResult};

use super::scaled_dot::scaled_dot_product_attention;

/// Multi-head attention: independent linear projections of query, key and
/// value into `num_heads` subspaces of size `d_model / num_heads`, scaled
/// dot-product attention per head, concatenation, and a final output
/// projection back to `d_model`.
///
/// Masks apply identically across heads (broadcast over the head axis).
#[derive(Debug)]
pub struct MultiHeadAttention {
    q_proj: Linear,
    k_proj: Linear,
    v_proj: Linear,
    out_proj: Linear,
    dropout: Dropout,
    num_heads: usize,
    head_dim: usize,
    d_model: usize,
}

impl MultiHeadAttention {
    /// Create a multi-head attention module with freshly initialized
    /// projection parameters under `vb`.
    ///
    /// # Errors
    /// Returns `ModelError::Config` if `d_model` is not divisible by
    /// `num_heads`; the failure happens here, not as a shape error deep
    /// in a forward pass.
    pub fn new(
        d_model: usize,
        num_heads: usize,
        dropout: f32,
        vb: VarBuilder,
    ) -> ModelResult<Self> {
        if num_heads == 0 || d_model % num_heads != 0 {
            return Err(ModelError::Config {
                message: format!(
                    "d_model {} is not divisible by num_heads {}",
                    d_model, num_heads
                ),
            });
        }

        let q_proj = linear(d_model, d_model, vb.pp("q_proj"))
            .map_err(ModelError::stage("query projection init"))?;
        let k_proj = linear(d_model, d_model, vb.pp("k_proj"))
            .map_err(ModelError::stage("key projection init"))?;
        let v_proj = linear(d_model, d_model, vb.pp("v_proj"))
            .map_err(ModelError::stage("value projection init"))?;
        let out_proj = linear(d_model, d_model, vb.pp("out_proj"))
            .map_err(ModelError::stage("output projection init"))?;

        debug!(d_model, num_heads, "created multi-head attention");

        Ok(Self {
            q_proj,
            k_proj,
            v_proj,
            out_proj,
            dropout: Dropout::new(dropout),
            num_heads,
            head_dim: d_model / num_heads,
            d_model,
        })
    }

    /// Number of attention heads.
    #[inline]
    #[must_use]
    pub fn num_heads(&self) -> usize {
        self.num_heads
    }

    /// Size of one attention subspace.
    #[inline]
    #[must_use]
    pub fn head_dim(&self) -> usize {
        self.head_dim
    }

    /// Learnable parameter count of the four projections.
    #[must_use]
    pub fn parameter_count(&self) -> usize {
        // Four d_model x d_model weight matrices plus biases.
        4 * (self.d_model * self.d_model + self.d_model)
    }

    /// Attend `query` to `key`/`value` and return the recombined output of
    /// shape `(batch, query_len, d_model)`.
    pub fn forward(
        &self,
        query: &Tensor,
        key: &Tensor,
        value: &Tensor,
        mask: Option<&Tensor>,
        train: bool,
    ) -> Result<Tensor> {
        let (output, _) = self.forward_with_weights(query, key, value, mask, train)?;
        Ok(output)
    }

    /// Like [`forward`](Self::forward), additionally returning the
    /// per-head attention probabilities of shape
    /// `(batch, num_heads, query_len, key_len)` for introspection.
    pub fn forward_with_weights(
        &self,
        query: &Tensor,
        key: &Tensor,
        value: &Tensor,
        mask: Option<&Tensor>,
        train: bool,
    ) -> Result<(Tensor, Tensor)> {
        let (batch, q_len, _) = query.dims3()?;

        let q = self.split_heads(&self.q_proj.forward(query)?)?;
        let k = self.split_heads(&self.k_proj.forward(key)?)?;
        let v = self.split_heads(&self.v_proj.forward(value)?)?;

        let (attended, weights) =
            scaled_dot_product_attention(&q, &k, &v, mask, Some(&self.dropout), train)?;

        let merged = self.merge_heads(&attended, batch, q_len)?;
        let output = self.out_proj.forward(&merged)?;
        Ok((output, weights))
    }

    /// `(batch, seq, d_model)` -> `(batch, heads, seq, head_dim)`.
    fn split_heads(&self, xs: &Tensor) -> Result<Tensor> {
        let (batch, seq_len, _) = xs.dims3()?;
        xs.reshape((batch, seq_len, self.num_heads, self.head_dim))?
            .transpose(1, 2)?
            .contiguous()
    }

    /// `(batch, heads, seq, head_dim)` -> `(batch, seq, d_model)`.
    fn merge_heads(&self, xs: &Tensor, batch: usize, seq_len: usize) -> Result<Tensor> {
        xs.transpose(1, 2)?
            .contiguous()?
            .reshape((batch, seq_len, self.d_model))
    }
}
