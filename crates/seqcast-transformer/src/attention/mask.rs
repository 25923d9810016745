//! Attention masks: causal structure, padding masks and their combination.
//!
//! Masks are `{0, 1}` tensors broadcastable to the attention-score shape
//! `(batch, num_heads, query_len, key_len)`; `1` permits attention, `0`
//! forbids it. Forbidden positions are pushed to an effectively infinite
//! negative score before softmax via [`additive_mask`].

use std::collections::HashMap;
use std::sync::Mutex;

use candle_core::{DType, Device, Result, Tensor};

/// Additive score applied to forbidden positions. Large enough that the
/// post-softmax probability underflows to exactly zero in f32 for any
/// realistic score range.
pub const MASK_FILL_VALUE: f64 = -1e9;

/// Build the `{0, 1}` causal mask of shape `(1, 1, len, len)`:
/// query position `i` may attend to key positions `j <= i`.
pub fn causal_mask(len: usize, device: &Device) -> Result<Tensor> {
    let mut data = vec![0f32; len * len];
    for q in 0..len {
        for k in 0..=q {
            data[q * len + k] = 1.0;
        }
    }
    Tensor::from_vec(data, (1, 1, len, len), device)
}

/// Memoized causal-mask table keyed by sequence length.
///
/// Rebuilding the mask for a previously seen length returns the cached
/// tensor; a new length is derived fresh and stored. Derivation is pure,
/// so concurrent callers with differing lengths cannot corrupt each
/// other's view. One cache instance serves one device.
#[derive(Debug, Default)]
pub struct CausalMaskCache {
    masks: Mutex<HashMap<usize, Tensor>>,
}

impl CausalMaskCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self {
            masks: Mutex::new(HashMap::new()),
        }
    }

    /// Return the causal mask for `len`, deriving and caching it on first use.
    pub fn mask_for_length(&self, len: usize, device: &Device) -> Result<Tensor> {
        // Rebuilding an identical mask is idempotent, so a poisoned lock
        // can be recovered rather than propagated.
        let mut masks = self.masks.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(mask) = masks.get(&len) {
            return Ok(mask.clone());
        }
        let mask = causal_mask(len, device)?;
        masks.insert(len, mask.clone());
        Ok(mask)
    }

    /// Number of distinct lengths currently cached.
    #[must_use]
    pub fn len(&self) -> usize {
        self.masks.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// True if no mask has been derived yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Combine a causal mask with an optional padding/user mask.
///
/// A position is forbidden if either mask forbids it, so `{0, 1}` masks
/// combine by elementwise multiplication (with broadcasting).
pub fn combine_masks(causal: &Tensor, padding: Option<&Tensor>) -> Result<Tensor> {
    match padding {
        None => Ok(causal.clone()),
        Some(padding) => causal.broadcast_mul(&padding.to_dtype(DType::F32)?),
    }
}

/// Convert a `{0, 1}` mask into the additive bias added to raw attention
/// scores: permitted positions contribute `0`, forbidden positions
/// [`MASK_FILL_VALUE`].
pub fn additive_mask(mask: &Tensor) -> Result<Tensor> {
    let mask = mask.to_dtype(DType::F32)?;
    let inverted = mask.ones_like()?.sub(&mask)?;
    inverted * MASK_FILL_VALUE
}
