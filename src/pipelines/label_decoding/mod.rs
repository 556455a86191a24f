/// Decoder from logits to labels
pub mod decoder;

pub use decoder::{argmax, Decoder};
