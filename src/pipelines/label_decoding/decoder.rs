use burn::tensor::{backend::Backend, Tensor};
use log::{debug, info};

use crate::{
    pipelines::{
        io::{NamedTensor, Request, Response, LABEL},
        stage::{isolate, ItemResult, Stage, StageError},
        StageConfig,
    },
    utils::classes::Labels,
};

/// Maps each row of a logits batch to the label with the highest score
#[derive(Debug, Clone)]
pub struct Decoder {
    labels: Labels,
}

impl Decoder {
    /// Creates a new decoder over a fixed label vocabulary
    pub fn new(labels: Labels) -> Self {
        Self { labels }
    }

    /// The label vocabulary
    pub fn labels(&self) -> &Labels {
        &self.labels
    }

    /// Number of logits columns this decoder expects
    pub fn num_labels(&self) -> usize {
        self.labels.len()
    }

    /// Decode a `[batch_size, num_labels]` logits tensor
    pub fn decode<B: Backend>(&self, logits: Tensor<B, 2>) -> Result<Vec<String>, StageError> {
        let [batch_size, num_labels] = logits.dims();
        self.check_shape(&[batch_size, num_labels])?;

        let values = logits.into_data().convert::<f32>().value;

        self.decode_values(&values)
    }

    /// Decode row-major logits whose width is the vocabulary size
    pub fn decode_values(&self, values: &[f32]) -> Result<Vec<String>, StageError> {
        let num_labels = self.num_labels();

        if values.len() % num_labels != 0 {
            return Err(StageError::ShapeMismatch {
                expected: vec![values.len() / num_labels, num_labels],
                found: vec![values.len()],
            });
        }

        values
            .chunks(num_labels)
            .map(|row| {
                let index = argmax(row);

                self.labels
                    .get(index)
                    .map(str::to_string)
                    .ok_or(StageError::LabelOutOfRange {
                        index,
                        size: num_labels,
                    })
            })
            .collect()
    }

    fn check_shape(&self, shape: &[usize]) -> Result<(), StageError> {
        match shape {
            [_, num_labels] if *num_labels == self.num_labels() => Ok(()),
            _ => Err(StageError::ShapeMismatch {
                expected: vec![shape.first().copied().unwrap_or(0), self.num_labels()],
                found: shape.to_vec(),
            }),
        }
    }

    fn decode_request(&self, request: &Request) -> Result<ItemResult, StageError> {
        let (shape, values) = match request.logits() {
            Ok(logits) => logits,
            Err(error) => return isolate(Err(error)),
        };

        self.check_shape(shape)?;

        let labels = self.decode_values(values)?;
        let shape = vec![labels.len()];
        let labels = labels.into_iter().map(String::into_bytes).collect();

        Ok(Ok(Response::new(vec![NamedTensor::bytes(
            LABEL, shape, labels,
        )])))
    }
}

impl Stage for Decoder {
    type Init = StageConfig;

    fn initialize(config: StageConfig) -> Result<Self, StageError> {
        let labels = config.labels()?;

        info!(
            "Label decoder ready: labels={:?}",
            labels.iter().collect::<Vec<_>>()
        );

        Ok(Self::new(labels))
    }

    fn execute(&self, requests: Vec<Request>) -> Result<Vec<ItemResult>, StageError> {
        debug!("Decoding {} requests", requests.len());

        requests
            .iter()
            .map(|request| self.decode_request(request))
            .collect()
    }
}

/// Index of the largest value, preferring the lowest index on ties. NaN never wins, and a row
/// with nothing but NaN selects index 0.
pub fn argmax(row: &[f32]) -> usize {
    let mut best: Option<(usize, f32)> = None;

    for (index, &value) in row.iter().enumerate() {
        if value.is_nan() {
            continue;
        }

        match best {
            Some((_, top)) if value <= top => {}
            _ => best = Some((index, value)),
        }
    }

    best.map_or(0, |(index, _)| index)
}
