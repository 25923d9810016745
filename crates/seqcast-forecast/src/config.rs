//! Configuration for the forecasting model.

use std::path::Path;

use serde::{Deserialize, Serialize};

use seqcast_transformer::{ModelError, ModelResult, StackConfig};

/// Configuration for the single-stack scalar forecaster.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    /// Input window length; sequences longer than this are rejected.
    pub block_size: usize,

    /// Number of future scalar steps predicted from the last position.
    pub forecast_horizon: usize,

    /// Shape of the encoder stack the window is passed through.
    pub stack: StackConfig,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            block_size: 32,
            forecast_horizon: 4,
            stack: StackConfig {
                d_model: 64,
                num_heads: 4,
                num_layers: 2,
                d_ff: 256,
                dropout: 0.1,
                ln_eps: 1e-5,
            },
        }
    }
}

impl ForecastConfig {
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
        if self.block_size == 0 {
            return Err(ModelError::Config {
                message: "block_size must be nonzero".to_string(),
            });
        }
        if self.forecast_horizon == 0 {
            return Err(ModelError::Config {
                message: "forecast_horizon must be nonzero".to_string(),
            });
        }
        self.stack.validate().map_err(|e| ModelError::Config {
            message: format!("[stack] {}", e),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        ForecastConfig::default().validate().expect("defaults valid");
    }

    #[test]
    fn test_zero_horizon_rejected() {
        let config = ForecastConfig {
            forecast_horizon: 0,
            ..ForecastConfig::default()
        };
        assert!(matches!(config.validate(), Err(ModelError::Config { .. })));
    }

    #[test]
    fn test_invalid_stack_reported_with_context() {
        let mut config = ForecastConfig::default();
        config.stack.num_heads = 5;
        let err = config.validate().unwrap_err();
        let message = err.to_string();
        assert!(message.contains("[stack]"), "message was: {}", message);
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = ForecastConfig {
            block_size: 8,
            forecast_horizon: 4,
            stack: StackConfig {
                d_model: 32,
                num_heads: 2,
                num_layers: 1,
                d_ff: 64,
                dropout: 0.0,
                ln_eps: 1e-5,
            },
        };
        let serialized = toml::to_string(&config).expect("serialize");
        let parsed = ForecastConfig::from_toml_str(&serialized).expect("parse");
        assert_eq!(parsed.block_size, 8);
        assert_eq!(parsed.stack.d_model, 32);
    }
}
