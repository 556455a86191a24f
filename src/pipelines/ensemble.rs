use burn::tensor::backend::Backend;
use log::{debug, info};

use super::{
    io::{NamedTensor, Request, Response, LABEL},
    label_decoding::Decoder,
    model::Classifier,
    stage::{isolate, ItemResult, Stage, StageError},
    tokenization::{Batcher, Row},
    StageConfig,
};

/// Tokenizer, classifier and label decoder wired into one text-in, label-out stage
pub struct Ensemble<B: Backend, M> {
    batcher: Batcher<B>,
    model: M,
    decoder: Decoder,
}

impl<B: Backend, M: Classifier<B>> Ensemble<B, M> {
    /// Compose already initialized stages around a classifier
    pub fn new(batcher: Batcher<B>, model: M, decoder: Decoder) -> Self {
        Self {
            batcher,
            model,
            decoder,
        }
    }

    /// Predict one label per text, in input order
    pub fn predict<S: AsRef<str>>(&self, texts: &[S]) -> Result<Vec<String>, StageError> {
        let rows = texts
            .iter()
            .map(|text| self.batcher.encode_row(text.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;

        self.classify_rows(rows)
    }

    fn classify_rows(&self, rows: Vec<Row>) -> Result<Vec<String>, StageError> {
        let batch_size = rows.len();
        let input = self.batcher.assemble(rows)?;

        let logits = self
            .model
            .classify(input)
            .map_err(StageError::from_classifier)?;

        let found = logits.dims();
        let expected = [batch_size, self.decoder.num_labels()];

        if found != expected {
            return Err(StageError::ShapeMismatch {
                expected: expected.to_vec(),
                found: found.to_vec(),
            });
        }

        self.decoder.decode(logits)
    }
}

impl<B: Backend, M: Classifier<B>> Stage for Ensemble<B, M> {
    type Init = (StageConfig, M);

    fn initialize((config, model): Self::Init) -> Result<Self, StageError> {
        let batcher = Batcher::from_config(&config, B::Device::default())?;
        let decoder = Decoder::initialize(config)?;

        info!("Ensemble ready with {} labels", decoder.num_labels());

        Ok(Self::new(batcher, model, decoder))
    }

    /// Malformed items are answered individually; the texts of every other item are classified
    /// together as one batch, so a classifier failure aborts the batch. Each response carries a
    /// `LABEL` tensor with one label per text of its request.
    fn execute(&self, requests: Vec<Request>) -> Result<Vec<ItemResult>, StageError> {
        debug!("Classifying {} requests", requests.len());

        let encoded = requests
            .iter()
            .map(|request| {
                isolate(request.texts().and_then(|texts| {
                    texts
                        .into_iter()
                        .map(|text| self.batcher.encode_row(text))
                        .collect::<Result<Vec<_>, _>>()
                }))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut rows = Vec::new();
        let items: Vec<Result<usize, StageError>> = encoded
            .into_iter()
            .map(|item| {
                item.map(|item_rows| {
                    let count = item_rows.len();
                    rows.extend(item_rows);
                    count
                })
            })
            .collect();

        let expected = rows.len();
        let labels = if rows.is_empty() {
            Vec::new()
        } else {
            self.classify_rows(rows)?
        };

        if labels.len() != expected {
            return Err(StageError::ShapeMismatch {
                expected: vec![expected],
                found: vec![labels.len()],
            });
        }

        let mut labels = labels.into_iter();

        Ok(items
            .into_iter()
            .map(|item| {
                item.map(|count| {
                    let item_labels: Vec<Vec<u8>> = labels
                        .by_ref()
                        .take(count)
                        .map(String::into_bytes)
                        .collect();

                    Response::new(vec![NamedTensor::bytes(LABEL, vec![count], item_labels)])
                })
            })
            .collect())
    }
}
