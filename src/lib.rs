//! valley-metrics - Session analytics engine for game telemetry event streams
//!
//! The engine reconstructs typed event sequences from per-user raw telemetry
//! log lines and derives session-level and cohort-level statistics through a
//! deterministic pipeline: landmark calibration → per-line decoding →
//! stateful event reconstruction → session resolution → cohort aggregation.
//!
//! ## Modules
//!
//! - **landmarks**: self-calibrated proximity threshold over the fixed landmark set
//! - **decoder**: raw payload → typed payload, with per-field failures
//! - **reconstruct**: ordered per-user scan deriving pickups and visits
//! - **session**: authoritative end times and normalized durations
//! - **aggregate**: per-user and cohort statistics
//! - **pipeline**: orchestration and the cohort report

pub mod aggregate;
pub mod decoder;
pub mod error;
pub mod landmarks;
pub mod pipeline;
pub mod reconstruct;
pub mod schema;
pub mod session;
pub mod types;

pub use aggregate::{CohortStatistics, UserStatistics};
pub use error::{AnalyticsError, DecodeFailure};
pub use landmarks::{LandmarkSet, FORAGING_TRIGGER};
pub use pipeline::{analyze_sessions, CohortReport, OverrideTable, SessionAnalyzer};
pub use reconstruct::reconstruct;
pub use types::{LogKind, RawLogRecord, TypedEvent, UserSession};

/// Engine version embedded in all report payloads
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for report payloads
pub const PRODUCER_NAME: &str = "valley-metrics";
