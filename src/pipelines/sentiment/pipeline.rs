use log::{debug, info};

use super::model::TextClassifier;
use crate::{
    pipelines::{
        io::{NamedTensor, Request, Response, SENTIMENT_LABEL, SENTIMENT_SCORE},
        stage::{isolate, ItemResult, Stage, StageError},
        ScoredSentiment, StageConfig,
    },
    utils::classes::Labels,
};

/// Single-call sentiment stage: one packaged classifier call per text, keeping only the most
/// likely label
pub struct SentimentStage<C> {
    classifier: C,
    labels: Labels,
}

impl<C: TextClassifier> SentimentStage<C> {
    /// Wrap a packaged classifier, accepting only labels from the given vocabulary
    pub fn new(classifier: C, labels: Labels) -> Self {
        Self { classifier, labels }
    }

    /// Score each text independently, in input order. An empty list yields an empty list.
    ///
    /// The first failing text fails the whole call, classifier errors included. Hosts that need
    /// per-item isolation go through [`Stage::execute`] instead.
    pub fn score<S: AsRef<str>>(&self, texts: &[S]) -> Result<Vec<ScoredSentiment>, StageError> {
        texts
            .iter()
            .map(|text| self.score_one(text.as_ref()))
            .collect()
    }

    fn score_one(&self, text: &str) -> Result<ScoredSentiment, StageError> {
        let ranked = self
            .classifier
            .classify(text)
            .map_err(StageError::from_classifier)?;

        let best = ranked
            .into_iter()
            .reduce(|best, next| if next.score > best.score { next } else { best })
            .ok_or_else(|| StageError::Classifier(anyhow!("classifier returned no labels")))?;

        if !self.labels.contains(&best.label) {
            return Err(StageError::UnknownLabel(best.label));
        }

        if !(0.0..=1.0).contains(&best.score) {
            return Err(StageError::InvalidScore(best.score));
        }

        Ok(best)
    }

    fn score_request(&self, request: &Request) -> Result<ItemResult, StageError> {
        let scored = match request.texts() {
            Ok(texts) => isolate(
                texts
                    .into_iter()
                    .map(|text| self.score_one(text))
                    .collect::<Result<Vec<_>, _>>(),
            )?,
            Err(error) => return isolate(Err(error)),
        };

        Ok(scored.map(|scored| {
            let shape = vec![scored.len()];
            let (labels, scores): (Vec<_>, Vec<_>) = scored
                .into_iter()
                .map(|ScoredSentiment { label, score }| (label.into_bytes(), score))
                .unzip();

            Response::new(vec![
                NamedTensor::bytes(SENTIMENT_LABEL, shape.clone(), labels),
                NamedTensor::fp32(SENTIMENT_SCORE, shape, scores),
            ])
        }))
    }
}

impl<C: TextClassifier> Stage for SentimentStage<C> {
    type Init = (StageConfig, C);

    fn initialize((config, classifier): Self::Init) -> Result<Self, StageError> {
        let labels = config.labels()?;

        info!("Sentiment stage ready with {} labels", labels.len());

        Ok(Self::new(classifier, labels))
    }

    fn execute(&self, requests: Vec<Request>) -> Result<Vec<ItemResult>, StageError> {
        debug!("Scoring {} requests", requests.len());

        requests
            .iter()
            .map(|request| self.score_request(request))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{
        pipelines::{io::TensorData, sentiment::PackagedClassifier},
        utils::testing::{fixture_batcher, fixture_config, FixedLogits},
    };

    /// Returns the same ranking for every text
    struct Canned(Vec<ScoredSentiment>);

    impl TextClassifier for Canned {
        fn classify(&self, _text: &str) -> anyhow::Result<Vec<ScoredSentiment>> {
            Ok(self.0.clone())
        }
    }

    /// Positive for anything mentioning "love", negative otherwise
    struct Keyword;

    impl TextClassifier for Keyword {
        fn classify(&self, text: &str) -> anyhow::Result<Vec<ScoredSentiment>> {
            let (label, score) = if text.contains("love") {
                ("POSITIVE", 0.98)
            } else {
                ("NEGATIVE", 0.95)
            };

            Ok(vec![ScoredSentiment::new(label.to_string(), score)])
        }
    }

    struct Broken;

    impl TextClassifier for Broken {
        fn classify(&self, _text: &str) -> anyhow::Result<Vec<ScoredSentiment>> {
            Err(anyhow!("model file is corrupt"))
        }
    }

    fn stage<C: TextClassifier>(classifier: C) -> SentimentStage<C> {
        SentimentStage::initialize((StageConfig::new(), classifier)).unwrap()
    }

    #[test]
    fn scores_each_text_in_order() {
        let stage = stage(Keyword);

        let scored = stage.score(&["I love it", "Terrible service", ""]).unwrap();

        assert_eq!(
            scored,
            vec![
                ScoredSentiment::new("POSITIVE".to_string(), 0.98),
                ScoredSentiment::new("NEGATIVE".to_string(), 0.95),
                ScoredSentiment::new("NEGATIVE".to_string(), 0.95),
            ]
        );
    }

    #[test]
    fn empty_input_yields_empty_output() {
        let texts: [&str; 0] = [];

        assert!(stage(Keyword).score(&texts).unwrap().is_empty());
    }

    #[test]
    fn keeps_the_highest_scoring_pair() {
        let stage = stage(Canned(vec![
            ScoredSentiment::new("NEGATIVE".to_string(), 0.3),
            ScoredSentiment::new("POSITIVE".to_string(), 0.7),
        ]));

        let scored = stage.score(&["good"]).unwrap();

        assert_eq!(scored[0].label, "POSITIVE");
    }

    #[test]
    fn first_pair_wins_a_tie() {
        let stage = stage(Canned(vec![
            ScoredSentiment::new("POSITIVE".to_string(), 0.5),
            ScoredSentiment::new("NEGATIVE".to_string(), 0.5),
        ]));

        assert_eq!(stage.score(&["meh"]).unwrap()[0].label, "POSITIVE");
    }

    #[test]
    fn rejects_labels_outside_the_vocabulary() {
        let stage = stage(Canned(vec![ScoredSentiment::new("MIXED".to_string(), 0.9)]));

        assert!(matches!(
            stage.score(&["so so"]),
            Err(StageError::UnknownLabel(label)) if label == "MIXED"
        ));
    }

    #[test]
    fn rejects_scores_outside_the_unit_interval() {
        let stage = stage(Canned(vec![ScoredSentiment::new("POSITIVE".to_string(), 1.5)]));

        assert!(matches!(
            stage.score(&["wow"]),
            Err(StageError::InvalidScore(_))
        ));
    }

    #[test]
    fn empty_rankings_are_classifier_errors() {
        let stage = stage(Canned(vec![]));

        assert!(matches!(
            stage.score(&["hello"]),
            Err(StageError::Classifier(_))
        ));
    }

    #[test]
    fn classifier_failures_propagate() {
        assert!(matches!(
            stage(Broken).score(&["hello"]),
            Err(StageError::Classifier(_))
        ));
    }

    #[test]
    fn execute_emits_label_and_score_tensors() {
        let stage = stage(Keyword);

        let responses = stage
            .execute(vec![Request::text("I love this product"), Request::new(vec![])])
            .unwrap();

        let response = responses[0].as_ref().unwrap();
        assert_eq!(
            response.output(SENTIMENT_LABEL),
            Some(&TensorData::Bytes {
                shape: vec![1],
                data: vec![b"POSITIVE".to_vec()],
            })
        );
        assert_eq!(
            response.output(SENTIMENT_SCORE),
            Some(&TensorData::Fp32 {
                shape: vec![1],
                data: vec![0.98],
            })
        );
        assert!(matches!(responses[1], Err(StageError::MalformedInput(_))));
    }

    #[test]
    fn execute_scores_every_text_of_a_request() {
        let stage = stage(Keyword);

        let responses = stage
            .execute(vec![Request::with_texts(vec!["Terrible service", "I love it"])])
            .unwrap();
        let response = responses[0].as_ref().unwrap();

        assert_eq!(
            response.output(SENTIMENT_LABEL),
            Some(&TensorData::Bytes {
                shape: vec![2],
                data: vec![b"NEGATIVE".to_vec(), b"POSITIVE".to_vec()],
            })
        );
        assert_eq!(
            response.output(SENTIMENT_SCORE),
            Some(&TensorData::Fp32 {
                shape: vec![2],
                data: vec![0.95, 0.98],
            })
        );
    }

    #[test]
    fn execute_isolates_classifier_failures_that_score_propagates() {
        let stage = stage(Broken);

        assert!(stage.score(&["hello"]).is_err());

        let responses = stage
            .execute(vec![Request::text("hello"), Request::text("again")])
            .unwrap();

        assert_eq!(responses.len(), 2);
        assert!(responses
            .iter()
            .all(|response| matches!(response, Err(StageError::Classifier(_)))));
    }

    #[test]
    fn execute_aborts_on_an_unknown_label() {
        let stage = stage(Canned(vec![ScoredSentiment::new("MIXED".to_string(), 0.9)]));

        assert!(matches!(
            stage.execute(vec![Request::text("so so")]),
            Err(StageError::UnknownLabel(_))
        ));
    }

    #[test]
    fn packaged_classifier_drives_the_stage() {
        let config = fixture_config(16);
        let classifier = PackagedClassifier::new(
            fixture_batcher(16),
            FixedLogits(vec![-2.1, 3.4]),
            config.labels().unwrap(),
        );
        let stage = SentimentStage::initialize((config, classifier)).unwrap();

        let scored = stage.score(&["", "Terrible service"]).unwrap();

        assert_eq!(scored.len(), 2);
        assert!(scored.iter().all(|s| s.label == "POSITIVE"));
        assert!(scored.iter().all(|s| s.score > 0.99 && s.score <= 1.0));
    }
}
