use std::path::Path;

use tokenizers::Tokenizer;

use crate::utils::classes::Labels;

use super::StageError;

/// Configuration recognized by every stage
#[derive(burn::config::Config, Debug)]
pub struct StageConfig {
    /// The fixed length L of every encoded row
    #[config(default = 128)]
    pub max_sequence_length: usize,

    /// The ordered label vocabulary, where label `i` names logits column `i`
    #[config(default = "vec![\"NEGATIVE\".to_string(), \"POSITIVE\".to_string()]")]
    pub label_vocabulary: Vec<String>,

    /// A local `tokenizer.json` path or a Hugging Face model id (e.g., "distilbert-base-uncased")
    #[config(default = "\"distilbert-base-uncased\".to_string()")]
    pub tokenizer_source: String,

    /// Overrides the pad token id derived from the tokenizer
    pub pad_token_id: Option<u32>,

    /// Whether the tokenizer emits segment type ids
    #[config(default = false)]
    pub return_token_type_ids: bool,
}

impl StageConfig {
    /// The validated label vocabulary
    pub fn labels(&self) -> Result<Labels, StageError> {
        Labels::new(&self.label_vocabulary)
    }

    /// Load the tokenizer named by `tokenizer_source`
    pub fn load_tokenizer(&self) -> Result<Tokenizer, StageError> {
        let source = self.tokenizer_source.as_str();
        let path = Path::new(source);

        let tokenizer = if path.is_file() {
            Tokenizer::from_file(path)
        } else if path.extension().is_some_and(|ext| ext == "json") {
            return Err(StageError::Configuration(format!(
                "tokenizer file {source:?} does not exist"
            )));
        } else {
            Tokenizer::from_pretrained(source, None)
        };

        tokenizer.map_err(|e| {
            StageError::Configuration(format!("unable to load tokenizer from {source:?}: {e}"))
        })
    }
}
