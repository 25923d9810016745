//! Vocabulary projection head.

use candle_core::{Result, Tensor, D};
use candle_nn::{linear, Linear, Module, VarBuilder};

use crate::error::{ModelError, ModelResult};

/// Final linear map from `d_model` to the output vocabulary, normalized
/// to log-probabilities.
#[derive(Debug)]
pub struct Generator {
    proj: Linear,
    d_model: usize,
    vocab_size: usize,
}

impl Generator {
    /// Create the projection under `vb`.
    pub fn new(d_model: usize, vocab_size: usize, vb: VarBuilder) -> ModelResult<Self> {
        let proj = linear(d_model, vocab_size, vb.pp("proj"))
            .map_err(ModelError::stage("generator projection init"))?;
        Ok(Self {
            proj,
            d_model,
            vocab_size,
        })
    }

    /// Learnable parameter count of the projection.
    #[must_use]
    pub fn parameter_count(&self) -> usize {
        self.d_model * self.vocab_size + self.vocab_size
    }

    /// Map hidden states `(..., d_model)` to log-probabilities
    /// `(..., vocab_size)`; each row log-sum-exps to zero.
    pub fn forward(&self, hidden: &Tensor) -> Result<Tensor> {
        let logits = self.proj.forward(hidden)?;
        candle_nn::ops::log_softmax(&logits, D::Minus1)
    }
}

#[cfg(test)]
mod tests {
    use candle_core::{DType, Device};
    use candle_nn::VarMap;

    use super::*;

    #[test]
    fn test_log_probabilities_normalize() {
        let device = Device::Cpu;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
        let generator = Generator::new(8, 11, vb).unwrap();

        let data: Vec<f32> = (0..2 * 3 * 8).map(|i| (i as f32).sin()).collect();
        let hidden = Tensor::from_vec(data, (2, 3, 8), &device).unwrap();
        let logprobs = generator.forward(&hidden).unwrap();
        assert_eq!(logprobs.dims(), &[2, 3, 11]);

        let probs = logprobs.exp().unwrap();
        let sums = probs.sum(D::Minus1).unwrap().flatten_all().unwrap();
        for sum in sums.to_vec1::<f32>().unwrap() {
            assert!((sum - 1.0).abs() < 1e-5, "probabilities sum to {}", sum);
        }
    }

    #[test]
    fn test_parameter_count() {
        let device = Device::Cpu;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
        let generator = Generator::new(8, 11, vb).unwrap();
        assert_eq!(generator.parameter_count(), 8 * 11 + 11);
    }
}
