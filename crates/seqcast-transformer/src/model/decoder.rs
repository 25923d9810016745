//! Decoder block and stack with causal self-attention and cross-attention.

use candle_core::{Result, Tensor};
use candle_nn::{layer_norm, LayerNorm, Module, VarBuilder};
use tracing::debug;

use crate::attention::{combine_masks, CausalMaskCache, MultiHeadAttention};
use crate::config::StackConfig;
use crate::error::{ModelError, ModelResult};
use crate::layers::{FeedForward, SublayerConnection};

/// One decoder block: causal self-attention over the decoder input,
/// cross-attention against the encoder output, and feed-forward — each
/// behind a pre-norm residual wrapper.
#[derive(Debug)]
pub struct DecoderBlock {
    self_attn: MultiHeadAttention,
    cross_attn: MultiHeadAttention,
    feed_forward: FeedForward,
    self_residual: SublayerConnection,
    cross_residual: SublayerConnection,
    ff_residual: SublayerConnection,
}

impl DecoderBlock {
    /// Build a block with fresh parameters under `vb`.
    pub fn new(config: &StackConfig, vb: VarBuilder) -> ModelResult<Self> {
        let self_attn = MultiHeadAttention::new(
            config.d_model,
            config.num_heads,
            config.dropout,
            vb.pp("self_attn"),
        )?;
        let cross_attn = MultiHeadAttention::new(
            config.d_model,
            config.num_heads,
            config.dropout,
            vb.pp("cross_attn"),
        )?;
        let feed_forward =
            FeedForward::new(config.d_model, config.d_ff, config.dropout, vb.pp("ff"))?;
        let self_residual = SublayerConnection::new(
            config.d_model,
            config.dropout,
            config.ln_eps,
            vb.pp("residual_0"),
        )?;
        let cross_residual = SublayerConnection::new(
            config.d_model,
            config.dropout,
            config.ln_eps,
            vb.pp("residual_1"),
        )?;
        let ff_residual = SublayerConnection::new(
            config.d_model,
            config.dropout,
            config.ln_eps,
            vb.pp("residual_2"),
        )?;
        Ok(Self {
            self_attn,
            cross_attn,
            feed_forward,
            self_residual,
            cross_residual,
            ff_residual,
        })
    }

    /// Learnable parameter count of the block.
    #[must_use]
    pub fn parameter_count(&self) -> usize {
        self.self_attn.parameter_count()
            + self.cross_attn.parameter_count()
            + self.feed_forward.parameter_count()
            + self.self_residual.parameter_count()
            + self.cross_residual.parameter_count()
            + self.ff_residual.parameter_count()
    }

    /// Run the block.
    ///
    /// `tgt_mask` is the already combined causal + target-padding mask for
    /// the self-attention step; `src_mask` gates which encoder positions
    /// cross-attention may read.
    pub fn forward(
        &self,
        xs: &Tensor,
        memory: &Tensor,
        src_mask: Option<&Tensor>,
        tgt_mask: &Tensor,
        train: bool,
    ) -> Result<Tensor> {
        let xs = self.self_residual.forward(xs, train, |normed| {
            self.self_attn
                .forward(normed, normed, normed, Some(tgt_mask), train)
        })?;
        let xs = self.cross_residual.forward(&xs, train, |normed| {
            self.cross_attn.forward(normed, memory, memory, src_mask, train)
        })?;
        self.ff_residual
            .forward(&xs, train, |normed| self.feed_forward.forward(normed, train))
    }
}

/// Decoder stack: a fixed sequence of blocks plus a final normalization.
///
/// The causal restriction on self-attention is structural, so the stack
/// owns a [`CausalMaskCache`] and combines the cached mask for the current
/// target length with any caller-supplied target padding mask.
#[derive(Debug)]
pub struct Decoder {
    blocks: Vec<DecoderBlock>,
    norm: LayerNorm,
    causal_masks: CausalMaskCache,
    d_model: usize,
}

impl Decoder {
    /// Build `config.num_layers` blocks under `vb`.
    pub fn new(config: &StackConfig, vb: VarBuilder) -> ModelResult<Self> {
        config.validate()?;
        let mut blocks = Vec::with_capacity(config.num_layers);
        for i in 0..config.num_layers {
            blocks.push(DecoderBlock::new(config, vb.pp(format!("block_{i}")))?);
        }
        let norm = layer_norm(config.d_model, config.ln_eps, vb.pp("norm"))
            .map_err(ModelError::stage("decoder final norm init"))?;

        debug!(
            num_layers = config.num_layers,
            d_model = config.d_model,
            num_heads = config.num_heads,
            "created decoder stack"
        );

        Ok(Self {
            blocks,
            norm,
            causal_masks: CausalMaskCache::new(),
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
        let blocks: usize = self.blocks.iter().map(DecoderBlock::parameter_count).sum();
        blocks + 2 * self.d_model
    }

    /// Pass `xs` through every block in order, then normalize.
    ///
    /// `tgt_mask`, when given, is a `{0, 1}` padding mask over target key
    /// positions; it is combined conjunctively with the cached causal mask
    /// for the current target length.
    pub fn forward(
        &self,
        xs: &Tensor,
        memory: &Tensor,
        src_mask: Option<&Tensor>,
        tgt_mask: Option<&Tensor>,
        train: bool,
    ) -> Result<Tensor> {
        let tgt_len = xs.dim(1)?;
        let causal = self.causal_masks.mask_for_length(tgt_len, xs.device())?;
        let combined = combine_masks(&causal, tgt_mask)?;

        let mut hidden = xs.clone();
        for block in &self.blocks {
            hidden = block.forward(&hidden, memory, src_mask, &combined, train)?;
        }
        self.norm.forward(&hidden)
    }
}
