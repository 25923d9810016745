//! Encoder/decoder attention stack for sequence modeling, built on the
//! candle tensor engine.
//!
//! The crate defines the model side only: attention primitives, block
//! composition and front-ends. Training loops, losses, optimizers,
//! tokenization and checkpoint persistence live with the caller, as does
//! the tensor engine itself (candle supplies tensors, autodiff,
//! parameter initialization and device placement).
//!
//! # Architecture
//!
//! - **attention**: causal/padding masks, scaled dot-product attention,
//!   multi-head attention
//! - **layers**: feed-forward block, pre-norm residual wrapper, token
//!   embedding, sinusoidal positional encoding
//! - **model**: encoder/decoder blocks and stacks, vocabulary projection,
//!   the assembled [`Transformer`]
//!
//! # Example
//!
//! ```rust,no_run
//! use candle_core::{DType, Device, Tensor};
//! use candle_nn::{VarBuilder, VarMap};
//! use seqcast_transformer::{Transformer, TransformerConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let device = Device::Cpu;
//!     let varmap = VarMap::new();
//!     let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
//!
//!     let model = Transformer::new(TransformerConfig::default(), vb)?;
//!     let src = Tensor::zeros((2, 10), DType::U32, &device)?;
//!     let tgt = Tensor::zeros((2, 7), DType::U32, &device)?;
//!     let logprobs = model.forward(&src, &tgt, None, None, false)?;
//!     assert_eq!(logprobs.dims()[2], model.config().tgt_vocab_size);
//!     Ok(())
//! }
//! ```

pub mod attention;
pub mod config;
pub mod error;
pub mod layers;
pub mod model;

pub use attention::{
    additive_mask, causal_mask, combine_masks, scaled_dot_product_attention, CausalMaskCache,
    MultiHeadAttention, MASK_FILL_VALUE,
};
pub use config::{StackConfig, TransformerConfig};
pub use error::{ModelError, ModelResult};
pub use layers::{FeedForward, PositionalEncoding, SublayerConnection, TokenEmbedding};
pub use model::{Decoder, DecoderBlock, Encoder, EncoderBlock, Generator, Transformer};
