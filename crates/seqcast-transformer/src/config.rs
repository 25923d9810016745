//! Configuration for the attention stack and the seq2seq model.
//!
//! # Loading Configuration
//!
//! ```
//! use seqcast_transformer::TransformerConfig;
//!
//! // Use defaults for development
//! let config = TransformerConfig::default();
//! config.validate().expect("Default config should be valid");
//!
//! // From TOML
//! let toml = r#"
//! src_vocab_size = 1000
//! tgt_vocab_size = 1000
//!
//! [stack]
//! d_model = 128
//! num_heads = 4
//! "#;
//! let config = TransformerConfig::from_toml_str(toml).unwrap();
//! assert_eq!(config.stack.d_model, 128);
//! ```
//!
//! # Design Principles
//!
//! - **NO FALLBACKS**: an invalid config returns an error, never a silent default
//! - **FAIL FAST**: divisibility and bound violations surface at validation,
//!   not as shape errors deep inside a forward pass

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};

/// Shape of one encoder/decoder stack: the parameters shared by every
/// block in it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StackConfig {
    /// Width of the per-position feature vector carried through the stack.
    pub d_model: usize,

    /// Number of parallel attention heads. Must evenly divide `d_model`.
    pub num_heads: usize,

    /// Number of blocks in the stack.
    pub num_layers: usize,

    /// Inner dimension of the feed-forward sublayer.
    pub d_ff: usize,

    /// Dropout probability applied to attention weights, sublayer outputs
    /// and front-end embeddings. Training mode only.
    pub dropout: f32,

    /// Epsilon added to the variance denominator in layer normalization.
    pub ln_eps: f64,
}

impl Default for StackConfig {
    fn default() -> Self {
        Self {
            d_model: 512,
            num_heads: 8,
            num_layers: 6,
            d_ff: 2048,
            dropout: 0.1,
            ln_eps: 1e-5,
        }
    }
}

impl StackConfig {
    /// Size of one attention subspace (`d_model / num_heads`).
    #[must_use]
    pub fn head_dim(&self) -> usize {
        self.d_model / self.num_heads
    }

    /// Validate the stack shape.
    ///
    /// # Errors
    /// Returns `ModelError::Config` on the first violated constraint.
    pub fn validate(&self) -> ModelResult<()> {
        if self.d_model == 0 {
            return Err(ModelError::Config {
                message: "d_model must be nonzero".to_string(),
            });
        }
        if self.num_heads == 0 {
            return Err(ModelError::Config {
                message: "num_heads must be nonzero".to_string(),
            });
        }
        if self.d_model % self.num_heads != 0 {
            return Err(ModelError::Config {
                message: format!(
                    "d_model {} is not divisible by num_heads {}",
                    self.d_model, self.num_heads
                ),
            });
        }
        if self.num_layers == 0 {
            return Err(ModelError::Config {
                message: "num_layers must be nonzero".to_string(),
            });
        }
        if self.d_ff == 0 {
            return Err(ModelError::Config {
                message: "d_ff must be nonzero".to_string(),
            });
        }
        if !(0.0..1.0).contains(&self.dropout) {
            return Err(ModelError::Config {
                message: format!("dropout must be in [0, 1), got {}", self.dropout),
            });
        }
        if self.ln_eps <= 0.0 {
            return Err(ModelError::Config {
                message: format!("ln_eps must be positive, got {}", self.ln_eps),
            });
        }
        Ok(())
    }
}

/// Configuration for the full seq2seq transformer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformerConfig {
    /// Source vocabulary size.
    pub src_vocab_size: usize,

    /// Target vocabulary size.
    pub tgt_vocab_size: usize,

    /// Maximum sequence length supported by the positional table.
    /// Longer inputs are rejected, never truncated.
    pub max_seq_len: usize,

    /// Shared shape of the encoder and decoder stacks.
    pub stack: StackConfig,
}

impl Default for TransformerConfig {
    fn default() -> Self {
        Self {
            src_vocab_size: 10_000,
            tgt_vocab_size: 10_000,
            max_seq_len: 512,
            stack: StackConfig::default(),
        }
    }
}

impl TransformerConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    /// - `ModelError::Io` if the file cannot be read
    /// - `ModelError::Config` if TOML parsing fails
    pub fn from_file(path: impl AsRef<Path>) -> ModelResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents).map_err(|e| ModelError::Config {
            message: format!("Failed to parse '{}': {}", path.display(), e),
        })
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    /// Returns `ModelError::Config` if parsing fails.
    pub fn from_toml_str(contents: &str) -> ModelResult<Self> {
        toml::from_str(contents).map_err(|e| ModelError::Config {
            message: format!("Failed to parse TOML: {}", e),
        })
    }

    /// Validate all configuration values, returning the first error found.
    ///
    /// # Errors
    /// Returns `ModelError::Config` with a descriptive message.
    pub fn validate(&self) -> ModelResult<()> {
        if self.src_vocab_size == 0 {
            return Err(ModelError::Config {
                message: "src_vocab_size must be nonzero".to_string(),
            });
        }
        if self.tgt_vocab_size == 0 {
            return Err(ModelError::Config {
                message: "tgt_vocab_size must be nonzero".to_string(),
            });
        }
        if self.max_seq_len == 0 {
            return Err(ModelError::Config {
                message: "max_seq_len must be nonzero".to_string(),
            });
        }
        self.stack.validate().map_err(|e| ModelError::Config {
            message: format!("[stack] {}", e),
        })
    }
}
