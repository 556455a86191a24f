use burn::tensor::{backend::Backend, Int, Tensor};
use derive_new::new;
use serde::{Deserialize, Serialize};

use crate::utils::tensors;

/// Tokenized text for a whole batch, every tensor shaped `[batch_size, max_seq_length]`
#[derive(Debug, Clone, new)]
pub struct EncodedBatch<B: Backend> {
    /// Token ids, right-padded with the pad token id
    pub input_ids: Tensor<B, 2, Int>,

    /// 1 for real tokens, 0 for padding
    pub attention_mask: Tensor<B, 2, Int>,

    /// Segment type ids, when the tokenizer is configured to produce them
    pub token_type_ids: Option<Tensor<B, 2, Int>>,
}

impl<B: Backend> EncodedBatch<B> {
    /// `[batch_size, max_seq_length]`
    pub fn dims(&self) -> [usize; 2] {
        self.input_ids.dims()
    }

    /// Copy the batch back to host rows as `(input_ids, attention_mask, token_type_ids)`
    pub fn into_rows(self) -> (Vec<Vec<i64>>, Vec<Vec<i64>>, Option<Vec<Vec<i64>>>) {
        (
            tensors::int_rows(self.input_ids),
            tensors::int_rows(self.attention_mask),
            self.token_type_ids.map(tensors::int_rows),
        )
    }
}

/// A label with its confidence, as produced by a packaged classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, new)]
pub struct ScoredSentiment {
    /// A label from the configured vocabulary
    pub label: String,

    /// Confidence in `[0, 1]`
    pub score: f32,
}
