/// Batcher that encodes text into fixed-shape tensors
pub mod batcher;

pub use batcher::{Batcher, Row};
