/// Packaged text classifiers
pub mod model;

/// The single-call sentiment stage
pub mod pipeline;

pub use model::{PackagedClassifier, TextClassifier};
pub use pipeline::SentimentStage;
