//! Push-channel envelope decoding.
//!
//! Envelopes look like `{"type": "EventNewLibrary", "id": 5}`. Only the two
//! library event types carry meaning here; every other type decodes to
//! [`LibraryEvent::Unknown`] so new server events do not break old clients.

use marquee_model::{
    EVENT_NEW_LIBRARY, EVENT_REMOVE_LIBRARY, LibraryEvent, LibraryId,
};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Deserialize)]
struct RawEnvelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    id: Option<Value>,
}

#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("malformed envelope: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("{kind} envelope has no library id")]
    MissingId { kind: String },

    #[error("{kind} envelope has an unusable library id: {value}")]
    InvalidId { kind: String, value: String },
}

pub fn decode_envelope(text: &str) -> Result<LibraryEvent, EnvelopeError> {
    let raw: RawEnvelope = serde_json::from_str(text)?;
    match raw.kind.as_str() {
        EVENT_NEW_LIBRARY => Ok(LibraryEvent::Added(library_id(raw)?)),
        EVENT_REMOVE_LIBRARY => Ok(LibraryEvent::Removed(library_id(raw)?)),
        _ => Ok(LibraryEvent::Unknown { kind: raw.kind }),
    }
}

// Ids normally arrive as numbers; numeric strings are accepted too.
fn library_id(raw: RawEnvelope) -> Result<LibraryId, EnvelopeError> {
    let Some(value) = raw.id else {
        return Err(EnvelopeError::MissingId { kind: raw.kind });
    };

    let parsed = match &value {
        Value::Number(number) => number.as_i64(),
        Value::String(text) => text.trim().parse::<i64>().ok(),
        _ => None,
    };

    parsed.map(LibraryId).ok_or_else(|| EnvelopeError::InvalidId {
        kind: raw.kind,
        value: value.to_string(),
    })
}
