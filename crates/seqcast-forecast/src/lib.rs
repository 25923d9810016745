//! Scalar time-series forecasting on a single-stack attention model.
//!
//! The simplified variant of the seq2seq transformer in
//! `seqcast-transformer`: no decoder, no vocabulary. A scalar window is
//! lifted per-timestep into the model dimension, tagged with a learned
//! positional embedding, run through an encoder stack, and the last
//! position's hidden state is projected to a fixed number of future
//! steps.
//!
//! # Example
//!
//! ```rust,no_run
//! use candle_core::{DType, Device, Tensor};
//! use candle_nn::{VarBuilder, VarMap};
//! use seqcast_forecast::{ForecastConfig, Forecaster};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let device = Device::Cpu;
//!     let varmap = VarMap::new();
//!     let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
//!
//!     let model = Forecaster::new(ForecastConfig::default(), vb)?;
//!     let window = Tensor::zeros((16, 32), DType::F32, &device)?;
//!     let forecast = model.forward(&window, false)?;
//!     assert_eq!(forecast.dims(), &[16, 4]);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod model;

pub use config::ForecastConfig;
pub use model::Forecaster;

// The error type and stack shape are shared with the core crate.
pub use seqcast_transformer::{ModelError, ModelResult, StackConfig};
