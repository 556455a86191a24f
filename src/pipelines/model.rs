use burn::tensor::{backend::Backend, Tensor};

use super::EncodedBatch;

/// A trait for the opaque sequence classifiers that sit between the tokenizer and the label
/// decoder. Implementations own their weights and device placement; the pipeline only relies on
/// the shape of what comes back.
pub trait Classifier<B: Backend> {
    /// Defines forward pass for inference, returning logits shaped `[batch_size, num_labels]`
    fn classify(&self, input: EncodedBatch<B>) -> anyhow::Result<Tensor<B, 2>>;
}
