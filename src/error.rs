//! Error types for valley-metrics

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fatal errors that abort a run before any statistics are produced
#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("Landmark configuration invalid: {0}")]
    Configuration(String),

    #[error("Unparseable start time {value:?} for user {user_id}")]
    StartTime { user_id: i64, value: String },

    #[error("Invalid ingest JSON: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// A single field the decoder could not parse.
///
/// Produced by the pure decoding functions; carries the offending raw text
/// and the field name so the upstream encoder can be debugged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("field {field}: cannot decode {raw:?}")]
pub struct DecodeError {
    /// Name of the field that failed (e.g. "rotation_euler")
    pub field: String,
    /// The raw text that failed to parse
    pub raw: String,
}

impl DecodeError {
    pub fn new(field: impl Into<String>, raw: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            raw: raw.into(),
        }
    }
}

/// A skipped record, reported alongside partial results.
///
/// One bad line never aborts a user's reconstruction; the failure is
/// collected here with enough context to trace it back to its source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodeFailure {
    pub user_id: i64,
    pub timestamp: String,
    /// Wire name of the record kind (e.g. "POSLOG")
    pub kind: String,
    /// Name of the field that failed to parse
    pub field: String,
    /// The full raw payload of the skipped record
    pub payload: String,
}

impl std::fmt::Display for DecodeFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "user {} {} [{}] field {}: skipped payload {:?}",
            self.user_id, self.timestamp, self.kind, self.field, self.payload
        )
    }
}
