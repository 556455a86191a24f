use std::cmp::Ordering;

use burn::tensor::{activation::softmax, backend::Backend};

use crate::{
    pipelines::{model::Classifier, tokenization::Batcher, ScoredSentiment, StageError},
    utils::{classes::Labels, tensors},
};

/// A packaged classification capability that tokenizes, infers and scores one text in a
/// single call
pub trait TextClassifier {
    /// Classify a text, returning label/score pairs ranked from most to least likely
    fn classify(&self, text: &str) -> anyhow::Result<Vec<ScoredSentiment>>;
}

/// A text classifier assembled from a tokenizer, a logits classifier and a label vocabulary.
/// Probabilities come from a softmax over the label axis.
pub struct PackagedClassifier<B: Backend, M> {
    batcher: Batcher<B>,
    model: M,
    labels: Labels,
}

impl<B: Backend, M: Classifier<B>> PackagedClassifier<B, M> {
    /// Creates a new packaged classifier
    pub fn new(batcher: Batcher<B>, model: M, labels: Labels) -> Self {
        Self {
            batcher,
            model,
            labels,
        }
    }
}

impl<B: Backend, M: Classifier<B>> TextClassifier for PackagedClassifier<B, M> {
    fn classify(&self, text: &str) -> anyhow::Result<Vec<ScoredSentiment>> {
        let input = self.batcher.encode(&[text])?;
        let logits = self.model.classify(input)?;

        let found = logits.dims();
        let expected = [1, self.labels.len()];

        if found != expected {
            return Err(StageError::ShapeMismatch {
                expected: expected.to_vec(),
                found: found.to_vec(),
            }
            .into());
        }

        let probabilities = tensors::float_rows(softmax(logits, 1))
            .into_iter()
            .next()
            .unwrap_or_default();

        let mut ranked: Vec<ScoredSentiment> = self
            .labels
            .iter()
            .zip(probabilities)
            .map(|(label, score)| ScoredSentiment::new(label.to_string(), score))
            .collect();

        // Stable, so equal scores keep label order
        ranked.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));

        Ok(ranked)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::utils::testing::{fixture_batcher, FixedLogits, TestBackend};

    fn packaged(logits: Vec<f32>, labels: &[&str]) -> PackagedClassifier<TestBackend, FixedLogits> {
        PackagedClassifier::new(
            fixture_batcher(8),
            FixedLogits(logits),
            Labels::new(labels).unwrap(),
        )
    }

    #[test]
    fn ranks_labels_by_probability() {
        let classifier = packaged(
            vec![0.1, 2.0, -1.0],
            &["NEGATIVE", "POSITIVE", "NEUTRAL"],
        );

        let ranked = classifier.classify("great movie").unwrap();
        let labels: Vec<_> = ranked.iter().map(|r| r.label.as_str()).collect();

        assert_eq!(labels, vec!["POSITIVE", "NEGATIVE", "NEUTRAL"]);

        let total: f32 = ranked.iter().map(|r| r.score).sum();
        assert!((total - 1.0).abs() < 1e-5);
        assert!(ranked.iter().all(|r| (0.0..=1.0).contains(&r.score)));
    }

    #[test]
    fn equal_probabilities_keep_vocabulary_order() {
        let classifier = packaged(vec![0.0, 0.0], &["NEGATIVE", "POSITIVE"]);

        let ranked = classifier.classify("").unwrap();

        assert_eq!(ranked[0].label, "NEGATIVE");
        assert!((ranked[0].score - 0.5).abs() < 1e-6);
    }

    #[test]
    fn mismatched_logits_width_is_reported_as_a_stage_error() {
        let classifier = packaged(vec![0.2, 0.8], &["1 star", "2 stars", "3 stars"]);

        let error = classifier.classify("good").unwrap_err();

        assert!(matches!(
            StageError::from_classifier(error),
            StageError::ShapeMismatch { .. }
        ));
    }
}
