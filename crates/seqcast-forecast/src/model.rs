//! The single-stack scalar forecaster.

use candle_core::{Result, Tensor};
use candle_nn::{embedding, linear, Dropout, Embedding, Linear, Module, VarBuilder};
use tracing::debug;

use seqcast_transformer::{Encoder, ModelError, ModelResult};

use crate::config::ForecastConfig;

/// Scalar time-series forecaster.
///
/// Each scalar timestep is projected through an affine `1 -> d_model`
/// map, a *learned* positional embedding indexed by absolute window
/// position is added, and the result runs through an encoder stack. Only
/// the last position's hidden state is extrapolated: a final linear map
/// produces `forecast_horizon` scalar predictions.
#[derive(Debug)]
pub struct Forecaster {
    input_proj: Linear,
    position_embed: Embedding,
    dropout: Dropout,
    encoder: Encoder,
    head: Linear,
    config: ForecastConfig,
}

impl Forecaster {
    /// Build the forecaster with fresh parameters under `vb`.
    ///
    /// # Errors
    /// Returns `ModelError::Config` if `config` violates any
    /// construction-time contract.
    pub fn new(config: ForecastConfig, vb: VarBuilder) -> ModelResult<Self> {
        config.validate()?;
        let d_model = config.stack.d_model;

        let input_proj = linear(1, d_model, vb.pp("input_proj"))
            .map_err(ModelError::stage("input projection init"))?;
        let position_embed = embedding(config.block_size, d_model, vb.pp("position_embed"))
            .map_err(ModelError::stage("position embedding init"))?;
        let encoder = Encoder::new(&config.stack, vb.pp("encoder"))?;
        let head = linear(d_model, config.forecast_horizon, vb.pp("head"))
            .map_err(ModelError::stage("forecast head init"))?;

        debug!(
            block_size = config.block_size,
            forecast_horizon = config.forecast_horizon,
            d_model,
            "created forecaster"
        );

        Ok(Self {
            input_proj,
            position_embed,
            dropout: Dropout::new(config.stack.dropout),
            encoder,
            head,
            config,
        })
    }

    /// The configuration the model was built from.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &ForecastConfig {
        &self.config
    }

    /// Total learnable parameter count.
    #[must_use]
    pub fn parameter_count(&self) -> usize {
        let d_model = self.config.stack.d_model;
        let input_proj = d_model + d_model; // 1 x d_model weight + bias
        let positions = self.config.block_size * d_model;
        let head = d_model * self.config.forecast_horizon + self.config.forecast_horizon;
        input_proj + positions + self.encoder.parameter_count() + head
    }

    /// Embed the `(batch, window_len)` scalar window into
    /// `(batch, window_len, d_model)` position-aware features.
    fn embed_window(&self, window: &Tensor, train: bool) -> Result<Tensor> {
        let (_, window_len) = window.dims2()?;

        let projected = self.input_proj.forward(&window.unsqueeze(2)?)?;
        let positions = Tensor::arange(0u32, window_len as u32, window.device())?;
        let position_signal = self.position_embed.forward(&positions)?;
        let summed = projected.broadcast_add(&position_signal)?;
        self.dropout.forward(&summed, train)
    }

    /// Forecast `forecast_horizon` future steps from a
    /// `(batch, window_len)` scalar window, using only the last window
    /// position's final hidden state. Returns `(batch, forecast_horizon)`.
    pub fn forward(&self, window: &Tensor, train: bool) -> ModelResult<Tensor> {
        let (_, window_len) = window
            .dims2()
            .map_err(ModelError::stage("window shape check"))?;
        if window_len > self.config.block_size {
            return Err(ModelError::SequenceTooLong {
                actual: window_len,
                max: self.config.block_size,
            });
        }
        if window_len == 0 {
            return Err(ModelError::DimensionMismatch {
                expected: 1,
                got: 0,
            });
        }

        let embedded = self
            .embed_window(window, train)
            .map_err(ModelError::stage("window embedding"))?;
        let hidden = self
            .encoder
            .forward(&embedded, None, train)
            .map_err(ModelError::stage("encoder stack"))?;

        let last = hidden
            .narrow(1, window_len - 1, 1)
            .map_err(ModelError::stage("last position slice"))?
            .squeeze(1)
            .map_err(ModelError::stage("last position squeeze"))?;
        self.head
            .forward(&last)
            .map_err(ModelError::stage("forecast head"))
    }
}

#[cfg(test)]
mod tests {
    use candle_core::{DType, Device};
    use candle_nn::VarMap;
    use seqcast_transformer::StackConfig;

    use super::*;

    fn small_config() -> ForecastConfig {
        ForecastConfig {
            block_size: 8,
            forecast_horizon: 4,
            stack: StackConfig {
                d_model: 32,
                num_heads: 2,
                num_layers: 2,
                d_ff: 64,
                dropout: 0.0,
                ln_eps: 1e-5,
            },
        }
    }

    fn build(device: &Device) -> (VarMap, Forecaster) {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, device);
        let model = Forecaster::new(small_config(), vb).unwrap();
        (varmap, model)
    }

    fn window(batch: usize, len: usize, device: &Device) -> Tensor {
        let data: Vec<f32> = (0..batch * len).map(|i| (i as f32 * 0.4).sin()).collect();
        Tensor::from_vec(data, (batch, len), device).unwrap()
    }

    #[test]
    fn test_forward_shape() {
        let device = Device::Cpu;
        let (_map, model) = build(&device);
        let out = model.forward(&window(3, 8, &device), false).unwrap();
        assert_eq!(out.dims(), &[3, 4]);
    }

    #[test]
    fn test_shorter_window_accepted() {
        let device = Device::Cpu;
        let (_map, model) = build(&device);
        let out = model.forward(&window(2, 5, &device), false).unwrap();
        assert_eq!(out.dims(), &[2, 4]);
    }

    #[test]
    fn test_window_longer_than_block_size_rejected() {
        let device = Device::Cpu;
        let (_map, model) = build(&device);
        let result = model.forward(&window(1, 9, &device), false);
        assert!(matches!(
            result,
            Err(ModelError::SequenceTooLong { actual: 9, max: 8 })
        ));
    }

    #[test]
    fn test_invalid_head_split_rejected_at_construction() {
        let device = Device::Cpu;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
        let mut config = small_config();
        config.stack.num_heads = 5;
        assert!(matches!(
            Forecaster::new(config, vb),
            Err(ModelError::Config { .. })
        ));
    }

    #[test]
    fn test_only_last_position_feeds_the_head() {
        let device = Device::Cpu;
        let (_map, model) = build(&device);

        // The head reads one hidden state; its input width is d_model and
        // output width the horizon, independent of window length.
        let short = model.forward(&window(1, 3, &device), false).unwrap();
        let long = model.forward(&window(1, 8, &device), false).unwrap();
        assert_eq!(short.dims(), long.dims());
    }

    #[test]
    fn test_parameter_count_matches_structure() {
        let device = Device::Cpu;
        let (_map, model) = build(&device);
        // input_proj: 32 + 32; positions: 8 * 32; head: 32 * 4 + 4.
        let expected_outside_encoder = 64 + 256 + 132;
        assert_eq!(
            model.parameter_count(),
            expected_outside_encoder + model.encoder.parameter_count()
        );
    }
}
