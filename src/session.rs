//! Session resolution
//!
//! Determines an authoritative end time for each user and normalizes the
//! session duration. End-time candidates are tried in precedence order:
//! the user's own recorded end time, the curated override table, the last
//! reconstructed event, and finally the start time itself, so resolution
//! always terminates with a concrete value.
//!
//! The upstream clock never wraps past a full hour within one session, so
//! the raw duration is taken modulo one hour to absorb day/hour-boundary
//! artifacts in the raw timestamps. The modulo is part of the contract;
//! downstream consumers rely on durations in `[0, 3600)`.

use chrono::NaiveDateTime;

use crate::error::AnalyticsError;
use crate::types::{ResolvedSession, TypedEvent, UserSession, TIMESTAMP_FORMAT};

/// Sessions shorter than this are treated as noise and excluded from
/// cohort aggregation (they remain valid for event reconstruction).
pub const DEFAULT_MIN_SESSION_SECS: i64 = 300;

/// One hour, the wrap period of the upstream session clock
pub const SESSION_WRAP_SECS: i64 = 3600;

/// Resolve a user's end time and normalized duration.
///
/// A candidate end time that fails timestamp parsing is treated as absent
/// and the chain falls through. Only an unparseable start time fails, and
/// the caller decides whether that excludes the user or aborts the run.
pub fn resolve(
    user: &UserSession,
    override_end: Option<&str>,
    events: &[TypedEvent],
) -> Result<ResolvedSession, AnalyticsError> {
    let start = parse_timestamp(&user.start_time).ok_or_else(|| AnalyticsError::StartTime {
        user_id: user.user_id,
        value: user.start_time.clone(),
    })?;

    let end = user
        .end_time
        .as_deref()
        .and_then(parse_timestamp)
        .or_else(|| override_end.and_then(parse_timestamp))
        .or_else(|| events.last().and_then(|event| parse_timestamp(event.timestamp())))
        .unwrap_or(start);

    let duration_secs = (end - start).num_seconds().rem_euclid(SESSION_WRAP_SECS);

    Ok(ResolvedSession {
        user_id: user.user_id,
        start_time: start,
        end_time: end,
        duration_secs,
    })
}

/// Whether a resolved session passes the minimum-duration filter
pub fn meets_minimum(session: &ResolvedSession, min_session_secs: i64) -> bool {
    session.duration_secs >= min_session_secs
}

/// Format a normalized duration as `M:SS`
pub fn format_duration(duration_secs: i64) -> String {
    format!("{}:{:02}", duration_secs / 60, duration_secs % 60)
}

fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw.trim(), TIMESTAMP_FORMAT).ok()
}
