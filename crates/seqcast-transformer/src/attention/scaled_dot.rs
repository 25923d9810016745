//! Scaled dot-product attention.
//!
//! Works on plain `(batch, seq_len, dim)` tensors as well as pre-split
//! per-head `(batch, heads, seq_len, head_dim)` tensors; the key axis is
//! always the second-to-last and the feature axis the last.

use candle_core::{Result, Tensor, D};
use candle_nn::Dropout;

use super::mask::additive_mask;

/// Compute `softmax(q · kᵀ / sqrt(d_k)) · v`.
///
/// `mask`, when supplied, is a `{0, 1}` tensor broadcastable to the score
/// shape; forbidden (`0`) positions receive an effectively infinite
/// negative score on a per-call copy before normalization. `dropout` is
/// applied to the probability matrix in training mode only.
///
/// Returns the attended output together with the post-softmax attention
/// probabilities; each probability row sums to 1 with entries in `[0, 1]`.
///
/// A query row whose keys are all forbidden is a caller error (the
/// softmax is undefined); it is not detected or repaired here.
pub fn scaled_dot_product_attention(
    query: &Tensor,
    key: &Tensor,
    value: &Tensor,
    mask: Option<&Tensor>,
    dropout: Option<&Dropout>,
    train: bool,
) -> Result<(Tensor, Tensor)> {
    let d_k = key.dim(D::Minus1)?;
    let scale = (d_k as f64).sqrt();

    let key_t = key.transpose(D::Minus2, D::Minus1)?.contiguous()?;
    let scores = (query.contiguous()?.matmul(&key_t)? / scale)?;

    let scores = match mask {
        Some(mask) => scores.broadcast_add(&additive_mask(mask)?)?,
        None => scores,
    };

    let weights = candle_nn::ops::softmax(&scores, D::Minus1)?;
    let attended = match dropout {
        Some(dropout) => dropout.forward(&weights, train)?,
        None => weights.clone(),
    };

    let output = attended.matmul(&value.contiguous()?)?;
    Ok((output, weights))
}
