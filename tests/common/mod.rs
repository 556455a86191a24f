#![allow(dead_code)]

use burn::tensor::{backend::Backend, Tensor};
use text_pipeline_stages::{
    pipelines::{tokenization::Batcher, Classifier, EncodedBatch, Stage, StageConfig},
    utils::tensors,
};

pub type TestBackend = burn::backend::NdArray;

pub const TOKENIZER: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/tokenizer.json");

pub fn config(max_sequence_length: usize) -> StageConfig {
    StageConfig::new()
        .with_tokenizer_source(TOKENIZER.to_string())
        .with_max_sequence_length(max_sequence_length)
}

pub fn batcher(max_sequence_length: usize) -> Batcher<TestBackend> {
    Batcher::initialize(config(max_sequence_length)).unwrap()
}

/// Scores each row by whether it contains the "love" token (id 5)
pub struct LovesIt;

impl<B: Backend> Classifier<B> for LovesIt {
    fn classify(&self, input: EncodedBatch<B>) -> anyhow::Result<Tensor<B, 2>> {
        let device = input.input_ids.device();
        let [batch_size, _] = input.dims();

        let values = tensors::int_rows(input.input_ids)
            .iter()
            .flat_map(|row| {
                if row.contains(&5) {
                    [-2.1, 3.4]
                } else {
                    [1.5, -0.5]
                }
            })
            .collect();

        Ok(tensors::float_matrix(values, [batch_size, 2], &device))
    }
}
