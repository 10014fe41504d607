//! Pipeline orchestration
//!
//! This module provides the public API for valley-metrics. It orchestrates
//! the full run from per-user raw record streams to the cohort report:
//! landmark calibration → per-user reconstruction → session resolution →
//! cohort aggregation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::aggregate::{self, CohortStatistics, UserReconstruction, UserStatistics};
use crate::error::{AnalyticsError, DecodeFailure};
use crate::landmarks::LandmarkSet;
use crate::reconstruct::reconstruct;
use crate::session::{self, DEFAULT_MIN_SESSION_SECS};
use crate::types::{PositionPoint, TypedEvent, UserSession};
use crate::{ENGINE_VERSION, PRODUCER_NAME};

/// Override table mapping `username -> end_time`, curated by the caller
pub type OverrideTable = BTreeMap<String, String>;

/// Producer metadata embedded in every report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Producer {
    pub name: String,
    pub version: String,
    pub run_id: String,
}

/// A user whose session could not be resolved; the run continues without them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionFault {
    pub user_id: i64,
    pub username: String,
    pub detail: String,
}

/// Complete output of one analytics run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CohortReport {
    pub producer: Producer,
    pub computed_at_utc: String,
    pub users: Vec<UserStatistics>,
    pub cohort: CohortStatistics,
    /// Flat position export for spatial-density consumers; covers every
    /// reconstructable user, including sessions below the duration filter
    pub positions: Vec<PositionPoint>,
    /// Per-record decode failures, surfaced alongside partial results
    pub warnings: Vec<DecodeFailure>,
    pub session_faults: Vec<SessionFault>,
}

/// Analyze a cohort with the built-in landmark set and default minimum
/// session duration (stateless, one-shot).
pub fn analyze_sessions(
    users: &[UserSession],
    overrides: &OverrideTable,
) -> Result<CohortReport, AnalyticsError> {
    Ok(SessionAnalyzer::new()?.analyze(users, overrides))
}

/// Calibrated analyzer, reusable across runs.
///
/// Construction performs landmark calibration; a configuration error here
/// aborts before any record is processed, so no partially-calibrated run
/// ever emits statistics.
pub struct SessionAnalyzer {
    landmarks: LandmarkSet,
    min_session_secs: i64,
}

impl SessionAnalyzer {
    /// Create an analyzer over the built-in world landmark set
    pub fn new() -> Result<Self, AnalyticsError> {
        Ok(Self {
            landmarks: LandmarkSet::calibrate()?,
            min_session_secs: DEFAULT_MIN_SESSION_SECS,
        })
    }

    /// Create an analyzer over an explicit landmark set
    pub fn with_landmarks(landmarks: LandmarkSet) -> Self {
        Self {
            landmarks,
            min_session_secs: DEFAULT_MIN_SESSION_SECS,
        }
    }

    /// Override the minimum-duration inclusion filter
    pub fn min_session_secs(mut self, secs: i64) -> Self {
        self.min_session_secs = secs;
        self
    }

    pub fn landmarks(&self) -> &LandmarkSet {
        &self.landmarks
    }

    /// Run the full pipeline over a cohort snapshot.
    ///
    /// Per-user reconstruction is independent; the aggregation fold is the
    /// single serialization point.
    pub fn analyze(&self, users: &[UserSession], overrides: &OverrideTable) -> CohortReport {
        let mut per_user = Vec::with_capacity(users.len());
        let mut positions = Vec::new();
        let mut warnings = Vec::new();
        let mut session_faults = Vec::new();

        for user in users {
            // Stage 1: reconstruct the typed event sequence
            let (events, failures) = reconstruct(user, &self.landmarks);
            warnings.extend(failures);

            // Raw position export covers every reconstructable user
            for event in &events {
                if let TypedEvent::PositionSample { timestamp, sample, .. } = event {
                    positions.push(PositionPoint {
                        user_id: user.user_id,
                        timestamp: timestamp.clone(),
                        x: sample.position[0],
                        y: sample.position[1],
                        z: sample.position[2],
                    });
                }
            }

            // Stage 2: resolve the session bounds
            let override_end = overrides.get(&user.username).map(String::as_str);
            match session::resolve(user, override_end, &events) {
                Ok(resolved) => per_user.push(UserReconstruction {
                    user_id: user.user_id,
                    username: user.username.clone(),
                    perspective: user.perspective.clone(),
                    resolved,
                    events,
                }),
                Err(err) => session_faults.push(SessionFault {
                    user_id: user.user_id,
                    username: user.username.clone(),
                    detail: err.to_string(),
                }),
            }
        }

        // Stage 3: fold into per-user and cohort statistics
        let (user_stats, cohort) = aggregate::aggregate(&per_user, self.min_session_secs);

        CohortReport {
            producer: Producer {
                name: PRODUCER_NAME.to_string(),
                version: ENGINE_VERSION.to_string(),
                run_id: uuid::Uuid::new_v4().to_string(),
            },
            computed_at_utc: chrono::Utc::now().to_rfc3339(),
            users: user_stats,
            cohort,
            positions,
            warnings,
            session_faults,
        }
    }
}
