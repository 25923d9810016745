//! Block composition: encoder/decoder stacks, the projection head and
//! the assembled seq2seq model.

pub mod decoder;
pub mod encoder;
pub mod generator;
pub mod transformer;

pub use decoder::{Decoder, DecoderBlock};
pub use encoder::{Encoder, EncoderBlock};
pub use generator::Generator;
pub use transformer::Transformer;
