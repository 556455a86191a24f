use burn::tensor::{backend::Backend, Tensor};

use crate::{
    pipelines::{model::Classifier, tokenization::Batcher, EncodedBatch, StageConfig},
    utils::tensors,
};

pub type TestBackend = burn::backend::NdArray;

/// A small lowercase WordPiece vocabulary with `[PAD]`=0 `[UNK]`=1 `[CLS]`=2 `[SEP]`=3
pub const FIXTURE_TOKENIZER: &str =
    concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/tokenizer.json");

pub fn fixture_config(max_sequence_length: usize) -> StageConfig {
    StageConfig::new()
        .with_tokenizer_source(FIXTURE_TOKENIZER.to_string())
        .with_max_sequence_length(max_sequence_length)
}

pub fn fixture_batcher(max_sequence_length: usize) -> Batcher<TestBackend> {
    Batcher::from_config(&fixture_config(max_sequence_length), Default::default()).unwrap()
}

/// Returns the same logits row for every item in the batch
pub struct FixedLogits(pub Vec<f32>);

impl<B: Backend> Classifier<B> for FixedLogits {
    fn classify(&self, input: EncodedBatch<B>) -> anyhow::Result<Tensor<B, 2>> {
        let [batch_size, _] = input.input_ids.dims();
        let values = self.0.repeat(batch_size);

        Ok(tensors::float_matrix(
            values,
            [batch_size, self.0.len()],
            &input.input_ids.device(),
        ))
    }
}

/// Token id of "love" in the fixture vocabulary
pub const LOVE_TOKEN: i64 = 5;

/// Positive logits for rows containing "love", negative logits otherwise
pub struct LoveDetector;

impl<B: Backend> Classifier<B> for LoveDetector {
    fn classify(&self, input: EncodedBatch<B>) -> anyhow::Result<Tensor<B, 2>> {
        let device = input.input_ids.device();
        let [batch_size, _] = input.dims();

        let values = tensors::int_rows(input.input_ids)
            .iter()
            .flat_map(|row| {
                if row.contains(&LOVE_TOKEN) {
                    [-2.1, 3.4]
                } else {
                    [1.5, -0.5]
                }
            })
            .collect();

        Ok(tensors::float_matrix(values, [batch_size, 2], &device))
    }
}
