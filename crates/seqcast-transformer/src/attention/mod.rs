//! Attention primitives: masking, scaled dot-product attention and the
//! multi-head module built on top of them.

pub mod mask;
pub mod multi_head;
pub mod scaled_dot;

pub use mask::{additive_mask, causal_mask, combine_masks, CausalMaskCache, MASK_FILL_VALUE};
pub use multi_head::MultiHeadAttention;
pub use scaled_dot::scaled_dot_product_attention;
