//! Reusable sublayers: feed-forward, residual wrapping, embeddings and
//! positional encodings.

pub mod embedding;
pub mod feed_forward;
pub mod positional;
pub mod residual;

pub use embedding::TokenEmbedding;
pub use feed_forward::FeedForward;
pub use positional::{PositionalEncoding, FREQUENCY_BASE};
pub use residual::SublayerConnection;
