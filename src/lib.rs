//! # Text Pipeline Stages
//!
//! Deterministic stages for multi-stage text inference: a tokenizer that turns raw text into
//! fixed-shape tensors, a label decoder that turns logits back into labels, and a single-call
//! sentiment stage wrapping a packaged classifier.
#![forbid(unsafe_code)]

/// Pipeline stages
pub mod pipelines;

/// Utilities
pub mod utils;

/// Error macros
#[macro_use]
extern crate anyhow;
