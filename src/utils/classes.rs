use std::{collections::BTreeMap, hash::Hash};

use crate::pipelines::StageError;

/// Invert a map by swapping keys and values
pub fn invert_map<K, V, MK, MV>(original: MK) -> MV
where
    K: Ord + Hash + Eq,
    V: Ord + Hash + Eq + Clone,
    MK: IntoIterator<Item = (K, V)>,
    MV: FromIterator<(V, K)>,
{
    original
        .into_iter()
        .map(|(key, value)| (value, key))
        .collect()
}

/// A fixed, ordered label vocabulary. Position `i` names logits column `i`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Labels {
    /// Class ids to label names
    id2label: Vec<String>,

    /// Label names to class ids
    label2id: BTreeMap<String, usize>,
}

impl Labels {
    /// Build a vocabulary, rejecting empty, blank, padded or duplicate labels. Labels are
    /// stored exactly as given.
    pub fn new<S: AsRef<str>>(labels: &[S]) -> Result<Self, StageError> {
        let id2label: Vec<String> = labels
            .iter()
            .map(|label| label.as_ref().to_string())
            .collect();

        if id2label.is_empty() {
            return Err(StageError::Configuration(
                "the label vocabulary is empty".to_string(),
            ));
        }

        if let Some(index) = id2label.iter().position(|label| label.trim().is_empty()) {
            return Err(StageError::Configuration(format!(
                "label {index} in the label vocabulary is blank"
            )));
        }

        if let Some(label) = id2label.iter().find(|label| label.trim() != label.as_str()) {
            return Err(StageError::Configuration(format!(
                "label {label:?} has leading or trailing whitespace"
            )));
        }

        let label2id: BTreeMap<String, usize> = invert_map(id2label.iter().cloned().enumerate());

        if label2id.len() != id2label.len() {
            return Err(StageError::Configuration(
                "the label vocabulary contains duplicate labels".to_string(),
            ));
        }

        Ok(Self { id2label, label2id })
    }

    /// Number of labels
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.id2label.len()
    }

    /// The label for a class id
    pub fn get(&self, index: usize) -> Option<&str> {
        self.id2label.get(index).map(String::as_str)
    }

    /// Whether the label belongs to the vocabulary
    pub fn contains(&self, label: &str) -> bool {
        self.label2id.contains_key(label)
    }

    /// Labels in class id order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.id2label.iter().map(String::as_str)
    }
}
