use burn::tensor::backend::Backend;
use log::{debug, info};
use tokenizers::{PaddingParams, PaddingStrategy, PostProcessor, Tokenizer, TruncationParams};

use crate::{
    pipelines::{
        io::{self, NamedTensor, Request, Response, ATTENTION_MASK, INPUT_IDS, TOKEN_TYPE_IDS},
        stage::{isolate, ItemResult, Stage, StageError},
        EncodedBatch, StageConfig,
    },
    utils::tensors,
};

/// The pad token looked up when neither the config nor the tokenizer names a pad id
pub static DEFAULT_PAD_TOKEN: &str = "[PAD]";

/// One encoded text, exactly `max_seq_length` long
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    /// Token ids
    pub input_ids: Vec<i64>,

    /// Attention mask
    pub attention_mask: Vec<i64>,

    /// Segment type ids, if requested
    pub token_type_ids: Option<Vec<i64>>,
}

/// Row-major `(input_ids, attention_mask, token_type_ids)` for a stack of rows
fn flatten(rows: Vec<Row>) -> (Vec<i64>, Vec<i64>, Vec<i64>) {
    let capacity = rows.iter().map(|row| row.input_ids.len()).sum();

    let mut input_ids = Vec::with_capacity(capacity);
    let mut attention_mask = Vec::with_capacity(capacity);
    let mut token_type_ids = Vec::new();

    for row in rows {
        input_ids.extend(row.input_ids);
        attention_mask.extend(row.attention_mask);

        if let Some(type_ids) = row.token_type_ids {
            token_type_ids.extend(type_ids);
        }
    }

    (input_ids, attention_mask, token_type_ids)
}

/// Encodes raw text into fixed-length token id, attention mask and segment id tensors
#[derive(Clone)]
pub struct Batcher<B: Backend> {
    /// Tokenizer for converting text to token IDs, configured to truncate and pad to
    /// `max_seq_length`
    tokenizer: Tokenizer,

    /// The fixed length of every encoded row
    max_seq_length: usize,

    /// ID of the padding token
    pad_token_id: u32,

    /// Whether to emit segment type ids
    return_token_type_ids: bool,

    /// Device on which to build tensors (e.g., CPU or CUDA device)
    device: B::Device,
}

impl<B: Backend> Batcher<B> {
    /// Creates a new batcher around an already loaded tokenizer
    pub fn new(
        mut tokenizer: Tokenizer,
        config: &StageConfig,
        device: B::Device,
    ) -> Result<Self, StageError> {
        let max_seq_length = config.max_sequence_length;

        let special_tokens = tokenizer
            .get_post_processor()
            .map(|processor| processor.added_tokens(false))
            .unwrap_or(0);

        if max_seq_length <= special_tokens {
            return Err(StageError::Configuration(format!(
                "max_sequence_length {} leaves no room for text next to {} special tokens",
                max_seq_length, special_tokens
            )));
        }

        let pad_token_id = config
            .pad_token_id
            .or_else(|| tokenizer.get_padding().map(|padding| padding.pad_id))
            .or_else(|| tokenizer.token_to_id(DEFAULT_PAD_TOKEN))
            .ok_or_else(|| {
                StageError::Configuration(format!(
                    "no pad token id configured and the tokenizer has no {} token",
                    DEFAULT_PAD_TOKEN
                ))
            })?;

        let pad_token = tokenizer.id_to_token(pad_token_id).ok_or_else(|| {
            StageError::Configuration(format!(
                "pad token id {} is not part of the tokenizer vocabulary",
                pad_token_id
            ))
        })?;

        tokenizer.with_padding(Some(PaddingParams {
            strategy: PaddingStrategy::Fixed(max_seq_length),
            pad_id: pad_token_id,
            pad_type_id: 0,
            pad_token,
            ..Default::default()
        }));

        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: max_seq_length,
                ..Default::default()
            }))
            .map_err(|e| {
                StageError::Configuration(format!("unable to configure truncation: {e}"))
            })?;

        Ok(Self {
            tokenizer,
            max_seq_length,
            pad_token_id,
            return_token_type_ids: config.return_token_type_ids,
            device,
        })
    }

    /// Load the tokenizer named by the config and create a batcher on the given device
    pub fn from_config(config: &StageConfig, device: B::Device) -> Result<Self, StageError> {
        let tokenizer = config.load_tokenizer()?;
        let batcher = Self::new(tokenizer, config, device)?;

        info!(
            "Tokenizer ready: source={} max_sequence_length={} pad_token_id={}",
            config.tokenizer_source, batcher.max_seq_length, batcher.pad_token_id
        );

        Ok(batcher)
    }

    /// The fixed length L of every encoded row
    pub fn max_seq_length(&self) -> usize {
        self.max_seq_length
    }

    /// ID of the padding token
    pub fn pad_token_id(&self) -> u32 {
        self.pad_token_id
    }

    /// Encode a batch of texts into `[batch_size, max_seq_length]` tensors
    pub fn encode<S: AsRef<str>>(&self, texts: &[S]) -> Result<EncodedBatch<B>, StageError> {
        let rows = texts
            .iter()
            .map(|text| self.encode_row(text.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;

        self.assemble(rows)
    }

    /// Encode raw byte strings, failing the whole batch if any of them is not UTF-8
    pub fn encode_raw<T: AsRef<[u8]>>(&self, texts: &[T]) -> Result<EncodedBatch<B>, StageError> {
        let texts = texts
            .iter()
            .enumerate()
            .map(|(index, raw)| {
                io::utf8(raw.as_ref()).map_err(|e| {
                    StageError::MalformedInput(format!("batch item {index}: {e}"))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        self.encode(&texts)
    }

    /// Encode one text into a row of exactly `max_seq_length` ids
    pub fn encode_row(&self, text: &str) -> Result<Row, StageError> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| StageError::Tokenization(e.to_string()))?;

        if encoding.len() != self.max_seq_length {
            return Err(StageError::ShapeMismatch {
                expected: vec![self.max_seq_length],
                found: vec![encoding.len()],
            });
        }

        Ok(Row {
            input_ids: widen(encoding.get_ids()),
            attention_mask: widen(encoding.get_attention_mask()),
            token_type_ids: self
                .return_token_type_ids
                .then(|| widen(encoding.get_type_ids())),
        })
    }

    /// Stack encoded rows into batch tensors
    pub fn assemble(&self, rows: Vec<Row>) -> Result<EncodedBatch<B>, StageError> {
        if rows.is_empty() {
            return Err(StageError::MalformedInput(
                "a batch must contain at least one text".to_string(),
            ));
        }

        let shape = [rows.len(), self.max_seq_length];
        let (input_ids, attention_mask, token_type_ids) = flatten(rows);

        let token_type_ids = self
            .return_token_type_ids
            .then(|| tensors::int_matrix(token_type_ids, shape, &self.device));

        Ok(EncodedBatch::new(
            tensors::int_matrix(input_ids, shape, &self.device),
            tensors::int_matrix(attention_mask, shape, &self.device),
            token_type_ids,
        ))
    }

    /// Host tensors for the rows of one request, each INT64 `[rows, max_seq_length]`
    fn respond(&self, rows: Vec<Row>) -> Response {
        let shape = vec![rows.len(), self.max_seq_length];
        let (input_ids, attention_mask, token_type_ids) = flatten(rows);

        let mut outputs = vec![
            NamedTensor::int64(INPUT_IDS, shape.clone(), input_ids),
            NamedTensor::int64(ATTENTION_MASK, shape.clone(), attention_mask),
        ];

        if self.return_token_type_ids {
            outputs.push(NamedTensor::int64(TOKEN_TYPE_IDS, shape, token_type_ids));
        }

        Response::new(outputs)
    }
}

impl<B: Backend> Stage for Batcher<B> {
    type Init = StageConfig;

    fn initialize(config: StageConfig) -> Result<Self, StageError> {
        Self::from_config(&config, B::Device::default())
    }

    fn execute(&self, requests: Vec<Request>) -> Result<Vec<ItemResult>, StageError> {
        debug!("Tokenizing {} requests", requests.len());

        requests
            .iter()
            .map(|request| {
                let rows = request.texts().and_then(|texts| {
                    texts
                        .into_iter()
                        .map(|text| self.encode_row(text))
                        .collect::<Result<Vec<_>, _>>()
                });

                isolate(rows.map(|rows| self.respond(rows)))
            })
            .collect()
    }
}

fn widen(values: &[u32]) -> Vec<i64> {
    values.iter().map(|&value| i64::from(value)).collect()
}
