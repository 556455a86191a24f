use derive_new::new;
use serde::{Deserialize, Serialize};

use super::stage::StageError;

/// Raw UTF-8 texts, shaped `[n]`
pub static TEXT: &str = "TEXT";

/// Classifier logits shaped `[batch_size, num_labels]`
pub static LOGITS: &str = "LOGITS";

/// Decoded labels, one UTF-8 string per logits row
pub static LABEL: &str = "LABEL";

/// Token ids
pub static INPUT_IDS: &str = "input_ids";

/// Attention mask
pub static ATTENTION_MASK: &str = "attention_mask";

/// Segment type ids
pub static TOKEN_TYPE_IDS: &str = "token_type_ids";

/// Sentiment label from the single-call stage
pub static SENTIMENT_LABEL: &str = "label";

/// Sentiment confidence from the single-call stage
pub static SENTIMENT_SCORE: &str = "score";

/// The element type, shape and row-major contents of a host tensor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "datatype", rename_all = "UPPERCASE")]
pub enum TensorData {
    /// 64-bit signed integers
    Int64 {
        /// Dimensions
        shape: Vec<usize>,

        /// Row-major values
        data: Vec<i64>,
    },

    /// 32-bit floats
    Fp32 {
        /// Dimensions
        shape: Vec<usize>,

        /// Row-major values
        data: Vec<f32>,
    },

    /// Byte strings
    Bytes {
        /// Dimensions
        shape: Vec<usize>,

        /// Row-major values
        data: Vec<Vec<u8>>,
    },
}

impl TensorData {
    /// The tensor dimensions
    pub fn shape(&self) -> &[usize] {
        match self {
            TensorData::Int64 { shape, .. }
            | TensorData::Fp32 { shape, .. }
            | TensorData::Bytes { shape, .. } => shape,
        }
    }

    /// The name of the element type
    pub fn datatype(&self) -> &'static str {
        match self {
            TensorData::Int64 { .. } => "INT64",
            TensorData::Fp32 { .. } => "FP32",
            TensorData::Bytes { .. } => "BYTES",
        }
    }

    fn len(&self) -> usize {
        match self {
            TensorData::Int64 { data, .. } => data.len(),
            TensorData::Fp32 { data, .. } => data.len(),
            TensorData::Bytes { data, .. } => data.len(),
        }
    }
}

/// A tensor exchanged with the host, addressed by name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, new)]
pub struct NamedTensor {
    /// The tensor name
    pub name: String,

    /// The tensor contents
    #[serde(flatten)]
    pub data: TensorData,
}

impl NamedTensor {
    /// An INT64 tensor
    pub fn int64(name: &str, shape: Vec<usize>, data: Vec<i64>) -> Self {
        Self::new(name.to_string(), TensorData::Int64 { shape, data })
    }

    /// An FP32 tensor
    pub fn fp32(name: &str, shape: Vec<usize>, data: Vec<f32>) -> Self {
        Self::new(name.to_string(), TensorData::Fp32 { shape, data })
    }

    /// A BYTES tensor
    pub fn bytes(name: &str, shape: Vec<usize>, data: Vec<Vec<u8>>) -> Self {
        Self::new(name.to_string(), TensorData::Bytes { shape, data })
    }
}

/// One request item as delivered by the host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, new)]
pub struct Request {
    /// Named input tensors
    pub inputs: Vec<NamedTensor>,
}

impl Request {
    /// A request carrying a single text
    pub fn text(text: impl Into<Vec<u8>>) -> Self {
        Self::new(vec![NamedTensor::bytes(TEXT, vec![1], vec![text.into()])])
    }

    /// A request carrying several texts in one `TEXT` tensor
    pub fn with_texts<T: Into<Vec<u8>>>(texts: Vec<T>) -> Self {
        let data: Vec<Vec<u8>> = texts.into_iter().map(Into::into).collect();

        Self::new(vec![NamedTensor::bytes(TEXT, vec![data.len()], data)])
    }

    /// A request carrying a logits matrix, one inner vector per row
    pub fn with_logits(rows: Vec<Vec<f32>>) -> Self {
        let width = rows.first().map_or(0, Vec::len);
        let shape = vec![rows.len(), width];

        Self::new(vec![NamedTensor::fp32(
            LOGITS,
            shape,
            rows.into_iter().flatten().collect(),
        )])
    }

    /// Look up an input by name
    pub fn input(&self, name: &str) -> Option<&TensorData> {
        self.inputs
            .iter()
            .find(|tensor| tensor.name == name)
            .map(|tensor| &tensor.data)
    }

    /// Every text in the `TEXT` input, in order. Each element must be UTF-8.
    pub fn texts(&self) -> Result<Vec<&str>, StageError> {
        match self.input(TEXT) {
            Some(TensorData::Bytes { data, .. }) if data.is_empty() => Err(
                StageError::MalformedInput(format!("input {TEXT} holds no text")),
            ),
            Some(TensorData::Bytes { data, .. }) => data
                .iter()
                .enumerate()
                .map(|(index, raw)| {
                    utf8(raw).map_err(|e| {
                        StageError::MalformedInput(format!("input {TEXT}[{index}]: {e}"))
                    })
                })
                .collect(),
            Some(other) => Err(StageError::MalformedInput(format!(
                "input {TEXT} must be BYTES, found {}",
                other.datatype()
            ))),
            None => Err(StageError::MalformedInput(format!(
                "missing required input {TEXT}"
            ))),
        }
    }

    /// The `LOGITS` input as its shape and row-major values
    pub fn logits(&self) -> Result<(&[usize], &[f32]), StageError> {
        match self.input(LOGITS) {
            Some(TensorData::Fp32 { shape, data }) => {
                if shape.iter().product::<usize>() != data.len() {
                    return Err(StageError::MalformedInput(format!(
                        "input {LOGITS} has shape {shape:?} but holds {} values",
                        data.len()
                    )));
                }

                Ok((shape.as_slice(), data.as_slice()))
            }
            Some(other) => Err(StageError::MalformedInput(format!(
                "input {LOGITS} must be FP32, found {}",
                other.datatype()
            ))),
            None => Err(StageError::MalformedInput(format!(
                "missing required input {LOGITS}"
            ))),
        }
    }
}

/// One response item returned to the host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, new)]
pub struct Response {
    /// Named output tensors
    pub outputs: Vec<NamedTensor>,
}

impl Response {
    /// Look up an output by name
    pub fn output(&self, name: &str) -> Option<&TensorData> {
        self.outputs
            .iter()
            .find(|tensor| tensor.name == name)
            .map(|tensor| &tensor.data)
    }

    /// The number of elements in the named output, if present
    pub fn output_len(&self, name: &str) -> Option<usize> {
        self.output(name).map(TensorData::len)
    }
}

/// Decode raw bytes as UTF-8, rejecting anything else rather than substituting placeholders
pub fn utf8(raw: &[u8]) -> Result<&str, StageError> {
    std::str::from_utf8(raw)
        .map_err(|e| StageError::MalformedInput(format!("text is not valid UTF-8: {e}")))
}
