//! Payload conversion gate
//!
//! The target payload shape is a three-way policy fixed at configuration
//! time: keep the whole envelope, keep the raw bytes, or run the injected
//! [`MessageConverter`]. Conversion only ever happens in the third case.

use crate::headers::MessageHeaders;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Target payload shape for produced messages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadMode {
    /// The full inbound envelope becomes the payload; no conversion.
    Envelope,
    /// The raw payload bytes, untouched; no conversion. The default.
    #[default]
    Bytes,
    /// Run the configured converter over the raw bytes.
    Convert,
}

/// Conversion failure raised out of the delivery pipeline.
#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("failed to convert payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to convert payload: {0}")]
    Other(String),
}

/// Converts raw payload bytes into a structured value.
///
/// Only the contract this adapter requires is defined here; a converter may
/// consult the headers (content type, user properties) to pick a strategy.
pub trait MessageConverter: Send + Sync {
    fn to_payload(
        &self,
        payload: &Bytes,
        headers: &MessageHeaders,
    ) -> Result<serde_json::Value, ConversionError>;
}

/// Default converter: parse the payload as JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonMessageConverter;

impl MessageConverter for JsonMessageConverter {
    fn to_payload(
        &self,
        payload: &Bytes,
        _headers: &MessageHeaders,
    ) -> Result<serde_json::Value, ConversionError> {
        Ok(serde_json::from_slice(payload)?)
    }
}
