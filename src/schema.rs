//! Ingest document schema
//!
//! The persistence collaborator exports one user per NDJSON line: identity
//! columns plus the ordered `(timestamp, logtype, logline)` triples. Field
//! aliases accept the storage column names as-is.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::AnalyticsError;
use crate::types::{LogKind, RawLogRecord, UserSession};

/// One `(timestamp, kind, payload)` triple as exported from storage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordDocument {
    pub timestamp: String,
    #[serde(alias = "logtype")]
    pub kind: String,
    #[serde(alias = "logline")]
    pub payload: String,
}

/// One user's exported row plus their telemetry stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserDocument {
    #[serde(alias = "id")]
    pub user_id: i64,
    #[serde(alias = "user")]
    pub username: String,
    pub perspective: String,
    #[serde(alias = "starttime")]
    pub start_time: String,
    #[serde(default, alias = "endtime")]
    pub end_time: Option<String>,
    #[serde(default)]
    pub records: Vec<RecordDocument>,
}

impl UserDocument {
    /// Map the wire document into the domain session, resolving wire kind
    /// names through [`LogKind`]
    pub fn into_session(self) -> UserSession {
        UserSession {
            user_id: self.user_id,
            username: self.username,
            perspective: self.perspective,
            start_time: self.start_time,
            end_time: self.end_time,
            records: self
                .records
                .into_iter()
                .map(|record| RawLogRecord {
                    timestamp: record.timestamp,
                    kind: LogKind::from_wire(&record.kind),
                    payload: record.payload,
                })
                .collect(),
        }
    }
}

/// Parse an NDJSON cohort export (one user per line; blank lines ignored)
pub fn parse_ndjson(input: &str) -> Result<Vec<UserSession>, AnalyticsError> {
    input
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| {
            let document: UserDocument = serde_json::from_str(line)?;
            Ok(document.into_session())
        })
        .collect()
}

/// Parse the curated `username -> end_time` override table
pub fn parse_overrides(input: &str) -> Result<BTreeMap<String, String>, AnalyticsError> {
    Ok(serde_json::from_str(input)?)
}
