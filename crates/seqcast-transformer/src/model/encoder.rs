//! Encoder block and stack.

use candle_core::{Result, Tensor};
use candle_nn::{layer_norm, LayerNorm, Module, VarBuilder};
use tracing::debug;

use crate::attention::MultiHeadAttention;
use crate::config::StackConfig;
use crate::error::{ModelError, ModelResult};
use crate::layers::{FeedForward, SublayerConnection};

/// One encoder block: self-attention and feed-forward, each behind a
/// pre-norm residual wrapper.
#[derive(Debug)]
pub struct EncoderBlock {
    self_attn: MultiHeadAttention,
    feed_forward: FeedForward,
    attn_residual: SublayerConnection,
    ff_residual: SublayerConnection,
}

impl EncoderBlock {
    /// Build a block with fresh parameters under `vb`.
    pub fn new(config: &StackConfig, vb: VarBuilder) -> ModelResult<Self> {
        let self_attn = MultiHeadAttention::new(
            config.d_model,
            config.num_heads,
            config.dropout,
            vb.pp("self_attn"),
        )?;
        let feed_forward =
            FeedForward::new(config.d_model, config.d_ff, config.dropout, vb.pp("ff"))?;
        let attn_residual = SublayerConnection::new(
            config.d_model,
            config.dropout,
            config.ln_eps,
            vb.pp("residual_0"),
        )?;
        let ff_residual = SublayerConnection::new(
            config.d_model,
            config.dropout,
            config.ln_eps,
            vb.pp("residual_1"),
        )?;
        Ok(Self {
            self_attn,
            feed_forward,
            attn_residual,
            ff_residual,
        })
    }

    /// Learnable parameter count of the block.
    #[must_use]
    pub fn parameter_count(&self) -> usize {
        self.self_attn.parameter_count()
            + self.feed_forward.parameter_count()
            + self.attn_residual.parameter_count()
            + self.ff_residual.parameter_count()
    }

    /// Run the block on `xs` of shape `(batch, seq_len, d_model)`.
    pub fn forward(&self, xs: &Tensor, src_mask: Option<&Tensor>, train: bool) -> Result<Tensor> {
        let xs = self.attn_residual.forward(xs, train, |normed| {
            self.self_attn.forward(normed, normed, normed, src_mask, train)
        })?;
        self.ff_residual
            .forward(&xs, train, |normed| self.feed_forward.forward(normed, train))
    }
}

/// Encoder stack: a fixed sequence of blocks built once from the
/// configured count, followed by a final normalization.
#[derive(Debug)]
pub struct Encoder {
    blocks: Vec<EncoderBlock>,
    norm: LayerNorm,
    d_model: usize,
}

impl Encoder {
    /// Build `config.num_layers` blocks under `vb`.
    pub fn new(config: &StackConfig, vb: VarBuilder) -> ModelResult<Self> {
        config.validate()?;
        let mut blocks = Vec::with_capacity(config.num_layers);
        for i in 0..config.num_layers {
            blocks.push(EncoderBlock::new(config, vb.pp(format!("block_{i}")))?);
        }
        let norm = layer_norm(config.d_model, config.ln_eps, vb.pp("norm"))
            .map_err(ModelError::stage("encoder final norm init"))?;

        debug!(
            num_layers = config.num_layers,
            d_model = config.d_model,
            num_heads = config.num_heads,
            "created encoder stack"
        );

        Ok(Self {
            blocks,
            norm,
            d_model: config.d_model,
        })
    }

    /// Number of blocks in the stack.
    #[inline]
    #[must_use]
    pub fn num_layers(&self) -> usize {
        self.blocks.len()
    }

    /// Learnable parameter count of all blocks plus the final norm.
    #[must_use]
    pub fn parameter_count(&self) -> usize {
        let blocks: usize = self.blocks.iter().map(EncoderBlock::parameter_count).sum();
        blocks + 2 * self.d_model
    }

    /// Pass `xs` through every block in order, then normalize.
    pub fn forward(&self, xs: &Tensor, src_mask: Option<&Tensor>, train: bool) -> Result<Tensor> {
        let mut hidden = xs.clone();
        for block in &self.blocks {
            hidden = block.forward(&hidden, src_mask, train)?;
        }
        self.norm.forward(&hidden)
    }
}
