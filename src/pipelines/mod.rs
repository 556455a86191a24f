use std::{collections::HashMap, fmt::Display};

use lazy_static::lazy_static;

/// Batched tensors and scored labels shared between stages
pub mod batch;

/// Stage configuration
pub mod config;

/// Tokenizer, classifier and decoder composed into one stage
pub mod ensemble;

/// Host-facing named tensors
pub mod io;

/// Logits to label decoding
pub mod label_decoding;

/// The opaque classifier seam
pub mod model;

/// Single-call sentiment scoring
pub mod sentiment;

/// The stage lifecycle and its errors
pub mod stage;

/// Text to token tensor encoding
pub mod tokenization;

pub use batch::{EncodedBatch, ScoredSentiment};
pub use config::StageConfig;
pub use ensemble::Ensemble;
pub use io::{NamedTensor, Request, Response, TensorData};
pub use label_decoding::Decoder;
pub use model::Classifier;
pub use sentiment::{PackagedClassifier, SentimentStage, TextClassifier};
pub use stage::{ItemResult, Stage, StageError};
pub use tokenization::Batcher;

/// The unique string token that identifies the tokenizer stage
pub static TOKENIZER: &str = "tokenizer";

/// The unique string token that identifies the label decoder stage
pub static LABEL_DECODER: &str = "label-decoder";

lazy_static! {
    /// Host-runnable stages by their string token
    pub static ref PIPELINES_BY_NAME: HashMap<&'static str, Pipeline> = HashMap::from([
        (TOKENIZER, Pipeline::Tokenizer),
        (LABEL_DECODER, Pipeline::LabelDecoder),
    ]);
}

/// Stages a host can run from configuration alone
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum Pipeline {
    /// Text to token tensors
    Tokenizer,

    /// Logits to labels
    LabelDecoder,
}

impl Pipeline {
    /// Get the unique string token that identifies this pipeline
    pub fn as_str(&self) -> &'static str {
        match self {
            Pipeline::Tokenizer => TOKENIZER,
            Pipeline::LabelDecoder => LABEL_DECODER,
        }
    }
}

impl TryFrom<&str> for Pipeline {
    type Error = PipelineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        PIPELINES_BY_NAME
            .get(value.to_lowercase().as_str())
            .copied()
            .ok_or_else(|| PipelineError::Unknown(value.to_string()))
    }
}

impl Display for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Pipeline Error
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    /// No pipeline found for the given string
    #[error("no pipeline found for {0}")]
    Unknown(String),
}
