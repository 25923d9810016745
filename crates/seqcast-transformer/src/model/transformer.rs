//! The assembled sequence-to-sequence transformer.

use candle_core::{Tensor, D};
use candle_nn::VarBuilder;
use tracing::debug;

use crate::config::TransformerConfig;
use crate::error::{ModelError, ModelResult};
use crate::layers::{PositionalEncoding, TokenEmbedding};

use super::decoder::Decoder;
use super::encoder::Encoder;
use super::generator::Generator;

/// Encoder/decoder transformer over discrete token ids.
///
/// Data flow: ids -> scaled embedding -> + sinusoidal positional signal
/// -> encoder stack -> decoder stack (causal self-attention plus
/// cross-attention into the encoder output) -> vocabulary
/// log-probabilities.
#[derive(Debug)]
pub struct Transformer {
    src_embed: TokenEmbedding,
    tgt_embed: TokenEmbedding,
    positional: PositionalEncoding,
    encoder: Encoder,
    decoder: Decoder,
    generator: Generator,
    config: TransformerConfig,
}

impl Transformer {
    /// Build the full model with fresh parameters under `vb`.
    ///
    /// # Errors
    /// Returns `ModelError::Config` if `config` violates any
    /// construction-time contract.
    pub fn new(config: TransformerConfig, vb: VarBuilder) -> ModelResult<Self> {
        config.validate()?;

        let src_embed =
            TokenEmbedding::new(config.src_vocab_size, config.stack.d_model, vb.pp("src_embed"))?;
        let tgt_embed =
            TokenEmbedding::new(config.tgt_vocab_size, config.stack.d_model, vb.pp("tgt_embed"))?;
        let positional = PositionalEncoding::new(
            config.stack.d_model,
            config.max_seq_len,
            config.stack.dropout,
            vb.device(),
        )?;
        let encoder = Encoder::new(&config.stack, vb.pp("encoder"))?;
        let decoder = Decoder::new(&config.stack, vb.pp("decoder"))?;
        let generator =
            Generator::new(config.stack.d_model, config.tgt_vocab_size, vb.pp("generator"))?;

        debug!(
            src_vocab = config.src_vocab_size,
            tgt_vocab = config.tgt_vocab_size,
            d_model = config.stack.d_model,
            num_layers = config.stack.num_layers,
            "created transformer"
        );

        Ok(Self {
            src_embed,
            tgt_embed,
            positional,
            encoder,
            decoder,
            generator,
            config,
        })
    }

    /// The configuration the model was built from.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &TransformerConfig {
        &self.config
    }

    /// Total learnable parameter count.
    #[must_use]
    pub fn parameter_count(&self) -> usize {
        self.src_embed.parameter_count()
            + self.tgt_embed.parameter_count()
            + self.encoder.parameter_count()
            + self.decoder.parameter_count()
            + self.generator.parameter_count()
    }

    fn check_len(&self, seq_len: usize) -> ModelResult<()> {
        if seq_len > self.config.max_seq_len {
            return Err(ModelError::SequenceTooLong {
                actual: seq_len,
                max: self.config.max_seq_len,
            });
        }
        Ok(())
    }

    /// Encode `(batch, src_len)` source ids into `(batch, src_len,
    /// d_model)` memory.
    pub fn encode(
        &self,
        src: &Tensor,
        src_mask: Option<&Tensor>,
        train: bool,
    ) -> ModelResult<Tensor> {
        let (_, src_len) = src
            .dims2()
            .map_err(ModelError::stage("source shape check"))?;
        self.check_len(src_len)?;

        let embedded = self
            .src_embed
            .forward(src)
            .map_err(ModelError::stage("source embedding"))?;
        let embedded = self.positional.forward(&embedded, train)?;
        self.encoder
            .forward(&embedded, src_mask, train)
            .map_err(ModelError::stage("encoder stack"))
    }

    /// Decode `(batch, tgt_len)` target ids against encoder `memory`,
    /// returning `(batch, tgt_len, d_model)` hidden states.
    ///
    /// The causal restriction is applied internally; `tgt_mask` only
    /// carries target padding.
    pub fn decode(
        &self,
        tgt: &Tensor,
        memory: &Tensor,
        src_mask: Option<&Tensor>,
        tgt_mask: Option<&Tensor>,
        train: bool,
    ) -> ModelResult<Tensor> {
        let (_, tgt_len) = tgt
            .dims2()
            .map_err(ModelError::stage("target shape check"))?;
        self.check_len(tgt_len)?;

        let embedded = self
            .tgt_embed
            .forward(tgt)
            .map_err(ModelError::stage("target embedding"))?;
        let embedded = self.positional.forward(&embedded, train)?;
        self.decoder
            .forward(&embedded, memory, src_mask, tgt_mask, train)
            .map_err(ModelError::stage("decoder stack"))
    }

    /// Full forward pass: encode, decode, project. Returns
    /// `(batch, tgt_len, tgt_vocab_size)` log-probabilities.
    pub fn forward(
        &self,
        src: &Tensor,
        tgt: &Tensor,
        src_mask: Option<&Tensor>,
        tgt_mask: Option<&Tensor>,
        train: bool,
    ) -> ModelResult<Tensor> {
        let memory = self.encode(src, src_mask, train)?;
        let hidden = self.decode(tgt, &memory, src_mask, tgt_mask, train)?;
        self.generator
            .forward(&hidden)
            .map_err(ModelError::stage("vocabulary projection"))
    }

    /// Greedy autoregressive decoding in evaluation mode: encode `src`
    /// once, then repeatedly feed the grown target prefix through the
    /// decoder and append the argmax token. Returns `(batch, max_len)`
    /// ids beginning with `start_token`.
    pub fn greedy_decode(
        &self,
        src: &Tensor,
        src_mask: Option<&Tensor>,
        max_len: usize,
        start_token: u32,
    ) -> ModelResult<Tensor> {
        if max_len == 0 {
            return Err(ModelError::Config {
                message: "greedy decode needs max_len >= 1".to_string(),
            });
        }
        self.check_len(max_len)?;

        let memory = self.encode(src, src_mask, false)?;
        let (batch, _) = src
            .dims2()
            .map_err(ModelError::stage("source shape check"))?;

        let mut ys = Tensor::full(start_token, (batch, 1), src.device())
            .map_err(ModelError::stage("decode seed build"))?;
        for _ in 1..max_len {
            let hidden = self.decode(&ys, &memory, src_mask, None, false)?;
            let steps = hidden
                .dim(1)
                .map_err(ModelError::stage("decode step count"))?;
            let last = hidden
                .narrow(1, steps - 1, 1)
                .map_err(ModelError::stage("last position slice"))?;
            let logprobs = self
                .generator
                .forward(&last)
                .map_err(ModelError::stage("vocabulary projection"))?;
            let next = logprobs
                .argmax(D::Minus1)
                .map_err(ModelError::stage("argmax selection"))?;
            ys = Tensor::cat(&[&ys, &next], 1).map_err(ModelError::stage("token append"))?;
        }
        Ok(ys)
    }
}
