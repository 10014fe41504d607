//! Core types for the valley-metrics pipeline
//!
//! This module defines the data structures that flow through each stage of the
//! engine: raw log records, typed events, resolved sessions, and the raw
//! position export.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Timestamp format used by the persistence layer (`datetime(unixepoch)`),
/// sortable lexically.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Kind of a raw telemetry log line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogKind {
    /// Periodic position/rotation sample (`POSLOG`)
    PositionSample,
    /// Region-of-interest enter trigger (`TRIGGER_ROI_ENTER`)
    RegionTrigger,
    /// Client-side pickup record (`ITEMPICKUP`); pickups are re-derived
    /// from triggers, so these lines are carried but not decoded
    ItemPickup,
    /// Slider feedback rating (`FEEDBACK`)
    Feedback,
    /// Any other wire name (`INFO`, `GAMESESSION`, `VIDEOREC`, ...)
    #[serde(untagged)]
    Other(String),
}

impl LogKind {
    /// Map a wire name from the telemetry stream to its kind
    pub fn from_wire(name: &str) -> Self {
        match name {
            "POSLOG" => LogKind::PositionSample,
            "TRIGGER_ROI_ENTER" => LogKind::RegionTrigger,
            "ITEMPICKUP" => LogKind::ItemPickup,
            "FEEDBACK" => LogKind::Feedback,
            other => LogKind::Other(other.to_string()),
        }
    }

    pub fn as_wire(&self) -> &str {
        match self {
            LogKind::PositionSample => "POSLOG",
            LogKind::RegionTrigger => "TRIGGER_ROI_ENTER",
            LogKind::ItemPickup => "ITEMPICKUP",
            LogKind::Feedback => "FEEDBACK",
            LogKind::Other(name) => name.as_str(),
        }
    }
}

/// One persisted telemetry line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawLogRecord {
    /// Timestamp string, sortable lexically
    pub timestamp: String,
    /// Record kind
    pub kind: LogKind,
    /// Opaque encoded payload; format depends on `kind`
    pub payload: String,
}

/// One user's participation: identity, declared session bounds, and the
/// ordered telemetry stream. Record order is significant and preserved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSession {
    pub user_id: i64,
    /// External identifier, used for override-table lookups
    pub username: String,
    /// Cohort attribute (viewpoint) the aggregator groups by
    pub perspective: String,
    pub start_time: String,
    /// Absent until the client posts a session end
    pub end_time: Option<String>,
    pub records: Vec<RawLogRecord>,
}

/// Camera rotation as recorded; the encoding generation determines whether
/// three or four components were written
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Rotation {
    Euler([f64; 3]),
    Quaternion([f64; 4]),
}

/// Decoded position sample fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionSample {
    pub position: [f64; 3],
    pub rotation: Rotation,
    /// Camera yaw/pitch pair
    pub rotation_euler: [f64; 2],
    pub position_delta: f64,
    pub rotation_delta: f64,
    pub path_distance: f64,
    pub is_jumping: bool,
    pub is_running: bool,
}

/// A typed event reconstructed from one user's raw stream.
///
/// Events are derived, never mutated, and live only for the duration of one
/// reconstruction pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TypedEvent {
    PositionSample {
        user_id: i64,
        timestamp: String,
        sample: PositionSample,
    },
    ItemPickup {
        user_id: i64,
        timestamp: String,
        /// Id of the matched landmark, assigned at calibration
        landmark_id: usize,
    },
    RegionVisit {
        user_id: i64,
        timestamp: String,
        region_name: String,
    },
    FeedbackRating {
        user_id: i64,
        timestamp: String,
        value: f64,
    },
}

impl TypedEvent {
    pub fn user_id(&self) -> i64 {
        match self {
            TypedEvent::PositionSample { user_id, .. }
            | TypedEvent::ItemPickup { user_id, .. }
            | TypedEvent::RegionVisit { user_id, .. }
            | TypedEvent::FeedbackRating { user_id, .. } => *user_id,
        }
    }

    pub fn timestamp(&self) -> &str {
        match self {
            TypedEvent::PositionSample { timestamp, .. }
            | TypedEvent::ItemPickup { timestamp, .. }
            | TypedEvent::RegionVisit { timestamp, .. }
            | TypedEvent::FeedbackRating { timestamp, .. } => timestamp,
        }
    }
}

/// A user's session once its end time and normalized duration are
/// authoritatively determined
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedSession {
    pub user_id: i64,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    /// Normalized duration in seconds, always in `[0, 3600)`
    pub duration_secs: i64,
}

/// One raw position sample exposed for downstream spatial-density consumers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionPoint {
    pub user_id: i64,
    pub timestamp: String,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_kind_wire_roundtrip() {
        assert_eq!(LogKind::from_wire("POSLOG"), LogKind::PositionSample);
        assert_eq!(LogKind::from_wire("TRIGGER_ROI_ENTER"), LogKind::RegionTrigger);
        assert_eq!(LogKind::from_wire("ITEMPICKUP"), LogKind::ItemPickup);
        assert_eq!(LogKind::from_wire("FEEDBACK"), LogKind::Feedback);
        assert_eq!(
            LogKind::from_wire("GAMESESSION"),
            LogKind::Other("GAMESESSION".to_string())
        );

        assert_eq!(LogKind::PositionSample.as_wire(), "POSLOG");
        assert_eq!(
            LogKind::Other("OUTOFBOUNDS".to_string()).as_wire(),
            "OUTOFBOUNDS"
        );
    }

    #[test]
    fn test_typed_event_accessors() {
        let event = TypedEvent::RegionVisit {
            user_id: 3,
            timestamp: "2024-12-05 11:20:00".to_string(),
            region_name: "Waterfall".to_string(),
        };

        assert_eq!(event.user_id(), 3);
        assert_eq!(event.timestamp(), "2024-12-05 11:20:00");
    }

    #[test]
    fn test_rotation_serialization_shape() {
        let euler = Rotation::Euler([1.0, 2.0, 3.0]);
        let quat = Rotation::Quaternion([0.0, 0.0, 0.0, 1.0]);

        assert_eq!(serde_json::to_string(&euler).unwrap(), "[1.0,2.0,3.0]");
        assert_eq!(
            serde_json::to_string(&quat).unwrap(),
            "[0.0,0.0,0.0,1.0]"
        );

        let back: Rotation = serde_json::from_str("[0.1,0.2,0.3,0.4]").unwrap();
        assert_eq!(back, Rotation::Quaternion([0.1, 0.2, 0.3, 0.4]));
    }
}
