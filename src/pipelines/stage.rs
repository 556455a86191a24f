use super::io::{Request, Response};

/// The outcome of one request item within a batch
pub type ItemResult = Result<Response, StageError>;

/// A pipeline stage driven by an external host.
///
/// A stage value only exists once [`Stage::initialize`] has succeeded, so the `uninitialized`
/// state is simply the absence of a value and a failed initialization never yields a stage.
/// After that the stage is `ready` and only reads its static configuration.
pub trait Stage: Sized {
    /// Everything the one-time setup needs
    type Init;

    /// Perform the one-time, blocking setup
    fn initialize(init: Self::Init) -> Result<Self, StageError>;

    /// Transform a whole batch of requests.
    ///
    /// The outer error aborts the batch (configuration or wiring failures). Otherwise the result
    /// holds exactly one entry per request, in request order, and input failures stay confined
    /// to the item that caused them.
    fn execute(&self, requests: Vec<Request>) -> Result<Vec<ItemResult>, StageError>;
}

/// Stage Error
#[derive(thiserror::Error, Debug)]
pub enum StageError {
    /// The request was not valid input: missing field, wrong type, or text that is not UTF-8
    #[error("malformed input: {0}")]
    MalformedInput(String),

    /// The tokenizer rejected the text
    #[error("unable to tokenize input: {0}")]
    Tokenization(String),

    /// The opaque classifier failed
    #[error("classifier failed: {0}")]
    Classifier(anyhow::Error),

    /// The tokenizer source or label vocabulary is unavailable or inconsistent
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A tensor did not have the shape the pipeline was wired for
    #[error("shape mismatch: expected {expected:?}, found {found:?}")]
    ShapeMismatch {
        /// The shape the stage was configured for
        expected: Vec<usize>,

        /// The shape that arrived
        found: Vec<usize>,
    },

    /// A class index fell outside the label vocabulary
    #[error("label index {index} is outside a label vocabulary of size {size}")]
    LabelOutOfRange {
        /// The offending index
        index: usize,

        /// The number of labels in the vocabulary
        size: usize,
    },

    /// A packaged classifier produced a label the stage was not configured with
    #[error("label {0:?} is not part of the label vocabulary")]
    UnknownLabel(String),

    /// A packaged classifier produced a confidence outside `[0, 1]`
    #[error("score {0} is outside [0, 1]")]
    InvalidScore(f32),
}

impl StageError {
    /// Fatal errors point at configuration or wiring bugs and abort the whole batch, while the
    /// rest are reported against the single item that caused them
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            StageError::MalformedInput(_)
                | StageError::Tokenization(_)
                | StageError::Classifier(_)
        )
    }

    /// Recover a stage error that crossed an `anyhow` boundary, wrapping anything else as a
    /// classifier failure
    pub fn from_classifier(error: anyhow::Error) -> Self {
        match error.downcast::<StageError>() {
            Ok(error) => error,
            Err(error) => StageError::Classifier(error),
        }
    }
}

/// Route a per-item result: fatal errors abort the batch, the rest stay with their item
pub(crate) fn isolate<T>(
    result: Result<T, StageError>,
) -> Result<Result<T, StageError>, StageError> {
    match result {
        Err(error) if error.is_fatal() => Err(error),
        Err(error) => {
            log::warn!("Rejecting request item: {}", error);

            Ok(Err(error))
        }
        ok => Ok(ok),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_errors_are_not_fatal() {
        assert!(!StageError::MalformedInput("x".into()).is_fatal());
        assert!(!StageError::Tokenization("x".into()).is_fatal());
        assert!(!StageError::Classifier(anyhow!("x")).is_fatal());
    }

    #[test]
    fn wiring_errors_are_fatal() {
        assert!(StageError::Configuration("x".into()).is_fatal());
        assert!(StageError::ShapeMismatch {
            expected: vec![1, 2],
            found: vec![1, 3]
        }
        .is_fatal());
        assert!(StageError::LabelOutOfRange { index: 4, size: 2 }.is_fatal());
        assert!(StageError::UnknownLabel("MAYBE".into()).is_fatal());
        assert!(StageError::InvalidScore(1.5).is_fatal());
    }

    #[test]
    fn stage_errors_survive_an_anyhow_round_trip() {
        let wrapped: anyhow::Error = StageError::InvalidScore(2.0).into();

        assert!(matches!(
            StageError::from_classifier(wrapped),
            StageError::InvalidScore(_)
        ));
        assert!(matches!(
            StageError::from_classifier(anyhow!("model crashed")),
            StageError::Classifier(_)
        ));
    }

    #[test]
    fn isolate_keeps_item_errors_and_propagates_fatal_ones() {
        let item: Result<ItemResult, _> =
            isolate(Err(StageError::MalformedInput("bad".into())));
        assert!(matches!(item, Ok(Err(StageError::MalformedInput(_)))));

        let fatal: Result<ItemResult, _> =
            isolate(Err(StageError::Configuration("bad".into())));
        assert!(matches!(fatal, Err(StageError::Configuration(_))));
    }
}
