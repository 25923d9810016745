//! Fixed sinusoidal positional encoding.

use candle_core::{Device, Tensor};
use candle_nn::Dropout;

use crate::error::{ModelError, ModelResult};

/// Base of the geometric frequency schedule, from the standard formula
/// `PE(pos, 2i) = sin(pos / base^(2i/d_model))`,
/// `PE(pos, 2i+1) = cos(pos / base^(2i/d_model))`.
pub const FREQUENCY_BASE: f64 = 10_000.0;

/// Additive absolute-position signal, precomputed once for `max_len`
/// positions and sliced to the first `seq_len` rows per forward call.
///
/// The table is deterministic and not learnable; two calls with the same
/// sequence length return identical values, and a longer table sliced to
/// a shorter length is a prefix match.
#[derive(Debug)]
pub struct PositionalEncoding {
    table: Tensor,
    dropout: Dropout,
    max_len: usize,
}

/// Compute the sinusoidal table rows for positions `0..max_len`.
fn sinusoidal_table(d_model: usize, max_len: usize) -> Vec<f32> {
    let mut data = Vec::with_capacity(max_len * d_model);
    for pos in 0..max_len {
        for i in 0..d_model {
            let pair = (i / 2) as f64;
            let exponent = 2.0 * pair / d_model as f64;
            let angle = pos as f64 / FREQUENCY_BASE.powf(exponent);
            let value = if i % 2 == 0 { angle.sin() } else { angle.cos() };
            data.push(value as f32);
        }
    }
    data
}

impl PositionalEncoding {
    /// Precompute the `(1, max_len, d_model)` table on `device`.
    pub fn new(
        d_model: usize,
        max_len: usize,
        dropout: f32,
        device: &Device,
    ) -> ModelResult<Self> {
        if d_model == 0 || max_len == 0 {
            return Err(ModelError::Config {
                message: format!(
                    "positional encoding needs nonzero dimensions, got d_model {} max_len {}",
                    d_model, max_len
                ),
            });
        }
        let table = Tensor::from_vec(sinusoidal_table(d_model, max_len), (1, max_len, d_model), device)
            .map_err(ModelError::stage("positional table build"))?;
        Ok(Self {
            table,
            dropout: Dropout::new(dropout),
            max_len,
        })
    }

    /// Maximum sequence length the table covers.
    #[inline]
    #[must_use]
    pub fn max_len(&self) -> usize {
        self.max_len
    }

    /// The `(1, seq_len, d_model)` prefix of the table.
    ///
    /// # Errors
    /// Returns `ModelError::SequenceTooLong` when `seq_len` exceeds the
    /// precomputed maximum; the table is never truncated or wrapped.
    pub fn encoding_for_len(&self, seq_len: usize) -> ModelResult<Tensor> {
        if seq_len > self.max_len {
            return Err(ModelError::SequenceTooLong {
                actual: seq_len,
                max: self.max_len,
            });
        }
        self.table
            .narrow(1, 0, seq_len)
            .map_err(ModelError::stage("positional table slice"))
    }

    /// Add the positional signal to `xs` of shape `(batch, seq_len,
    /// d_model)`, then apply dropout in training mode.
    pub fn forward(&self, xs: &Tensor, train: bool) -> ModelResult<Tensor> {
        let seq_len = xs
            .dim(1)
            .map_err(ModelError::stage("positional input rank check"))?;
        let encoding = self.encoding_for_len(seq_len)?;
        let summed = xs
            .broadcast_add(&encoding)
            .map_err(ModelError::stage("positional signal add"))?;
        self.dropout
            .forward(&summed, train)
            .map_err(ModelError::stage("positional dropout"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encoding_is_deterministic() {
        let device = Device::Cpu;
        let pe = PositionalEncoding::new(8, 16, 0.0, &device).unwrap();
        let a = pe.encoding_for_len(10).unwrap();
        let b = pe.encoding_for_len(10).unwrap();
        let diff = a
            .sub(&b)
            .unwrap()
            .abs()
            .unwrap()
            .sum_all()
            .unwrap()
            .to_scalar::<f32>()
            .unwrap();
        assert_eq!(diff, 0.0);
    }

    #[test]
    fn test_longer_table_prefix_matches_shorter_slice() {
        let device = Device::Cpu;
        let long = PositionalEncoding::new(8, 32, 0.0, &device).unwrap();
        let short = PositionalEncoding::new(8, 8, 0.0, &device).unwrap();

        let from_long = long.encoding_for_len(8).unwrap();
        let from_short = short.encoding_for_len(8).unwrap();
        let diff = from_long
            .sub(&from_short)
            .unwrap()
            .abs()
            .unwrap()
            .sum_all()
            .unwrap()
            .to_scalar::<f32>()
            .unwrap();
        assert!(diff < 1e-7, "prefix mismatch, total abs diff {}", diff);
    }

    #[test]
    fn test_even_dims_sine_odd_dims_cosine() {
        let device = Device::Cpu;
        let pe = PositionalEncoding::new(4, 4, 0.0, &device).unwrap();
        let rows = pe
            .encoding_for_len(2)
            .unwrap()
            .squeeze(0)
            .unwrap()
            .to_vec2::<f32>()
            .unwrap();

        // Position 0: sin(0) = 0 on even dims, cos(0) = 1 on odd dims.
        assert!((rows[0][0] - 0.0).abs() < 1e-6);
        assert!((rows[0][1] - 1.0).abs() < 1e-6);
        assert!((rows[0][2] - 0.0).abs() < 1e-6);
        assert!((rows[0][3] - 1.0).abs() < 1e-6);

        // Position 1, dim pair 0: sin(1), cos(1).
        assert!((rows[1][0] - 1f64.sin() as f32).abs() < 1e-6);
        assert!((rows[1][1] - 1f64.cos() as f32).abs() < 1e-6);
    }

    #[test]
    fn test_adjacent_positions_more_similar_than_distant() {
        let device = Device::Cpu;
        let pe = PositionalEncoding::new(64, 32, 0.0, &device).unwrap();
        let rows = pe
            .encoding_for_len(16)
            .unwrap()
            .squeeze(0)
            .unwrap()
            .to_vec2::<f32>()
            .unwrap();

        let dot = |a: &[f32], b: &[f32]| -> f32 { a.iter().zip(b).map(|(x, y)| x * y).sum() };
        let norm = |a: &[f32]| -> f32 { dot(a, a).sqrt() };
        let cosine =
            |a: &[f32], b: &[f32]| -> f32 { dot(a, b) / (norm(a) * norm(b)) };

        let sim_near = cosine(&rows[4], &rows[5]);
        let sim_far = cosine(&rows[4], &rows[15]);
        assert!(
            sim_near > sim_far,
            "adjacent positions ({}) should be more similar than distant ones ({})",
            sim_near,
            sim_far
        );
        assert!(sim_near < 0.9999, "consecutive positions must stay distinct");
    }

    #[test]
    fn test_sequence_beyond_max_len_rejected() {
        let device = Device::Cpu;
        let pe = PositionalEncoding::new(8, 4, 0.0, &device).unwrap();
        let result = pe.encoding_for_len(5);
        assert!(matches!(
            result,
            Err(ModelError::SequenceTooLong { actual: 5, max: 4 })
        ));
    }

    #[test]
    fn test_forward_adds_signal_per_position() {
        let device = Device::Cpu;
        let pe = PositionalEncoding::new(4, 8, 0.0, &device).unwrap();
        let x = Tensor::zeros((2, 3, 4), candle_core::DType::F32, &device).unwrap();
        let out = pe.forward(&x, false).unwrap();
        assert_eq!(out.dims(), &[2, 3, 4]);

        // With zero input the output is exactly the table prefix, batched.
        let expected = pe.encoding_for_len(3).unwrap();
        let first = out.narrow(0, 0, 1).unwrap();
        let diff = first
            .sub(&expected)
            .unwrap()
            .abs()
            .unwrap()
            .sum_all()
            .unwrap()
            .to_scalar::<f32>()
            .unwrap();
        assert!(diff < 1e-7);
    }
}
