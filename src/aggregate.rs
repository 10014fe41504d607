//! Cohort aggregation
//!
//! Folds per-user reconstructed events and resolved sessions into per-user
//! statistics and cohort-wide statistics. The fold operates on immutable
//! per-user results; only sessions passing the minimum-duration filter are
//! included. Every rate and average over an empty cohort or an empty
//! feedback set is reported as absent, never NaN or a panic.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::session;
use crate::types::{ResolvedSession, TypedEvent};

/// Sentinel reported when a user collected no pickups
pub const NO_PICKUP_SENTINEL: f64 = -1.0;

/// One user's reconstruction outcome, the immutable unit the fold consumes
#[derive(Debug, Clone)]
pub struct UserReconstruction {
    pub user_id: i64,
    pub username: String,
    pub perspective: String,
    pub resolved: ResolvedSession,
    pub events: Vec<TypedEvent>,
}

/// Per-user statistics record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserStatistics {
    pub user_id: i64,
    pub username: String,
    pub perspective: String,
    pub start_time: String,
    pub end_time: String,
    pub duration_seconds: i64,
    pub duration_display: String,
    /// Ordered landmark ids from the user's pickups
    pub pickup_list: Vec<usize>,
    /// Normalized duration per pickup; [`NO_PICKUP_SENTINEL`] at zero pickups
    pub avg_seconds_per_pickup: f64,
    /// Mean of the user's own feedback values; absent with zero feedback
    pub avg_curiosity_index: Option<f64>,
}

/// Visit statistics for one region
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionVisitStats {
    /// Distinct visitors; at most one visit counts per (user, region)
    pub visits: u32,
    /// Visits per included user
    pub visit_rate: f64,
}

/// Pickup statistics for one landmark
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandmarkPickupStats {
    pub pickups: u32,
    /// Pickups per included user
    pub pickup_rate: f64,
    /// Pickup counts broken down by the cohort attribute
    pub by_perspective: BTreeMap<String, u32>,
}

/// Cohort-wide statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CohortStatistics {
    /// Users passing the minimum-duration filter
    pub included_users: u32,
    /// Distinct included users per perspective
    pub perspective_counts: BTreeMap<String, u32>,
    /// Keyed by region name
    pub region_visits: BTreeMap<String, RegionVisitStats>,
    /// Keyed by landmark id
    pub landmark_pickups: BTreeMap<usize, LandmarkPickupStats>,
    /// Mean over all feedback values of included users (computed over the
    /// flat value list, not over per-user means)
    pub avg_curiosity_index: Option<f64>,
    /// The same mean bucketed by perspective
    pub avg_curiosity_by_perspective: BTreeMap<String, f64>,
    /// Mean normalized session duration across included users
    pub avg_session_secs: Option<f64>,
    /// Mean pickup count across included users
    pub avg_pickups_per_user: Option<f64>,
}

/// Fold included users into per-user and cohort statistics.
///
/// `per_user` entries whose sessions fall below `min_session_secs` are
/// excluded from both outputs.
pub fn aggregate(
    per_user: &[UserReconstruction],
    min_session_secs: i64,
) -> (Vec<UserStatistics>, CohortStatistics) {
    let included: Vec<&UserReconstruction> = per_user
        .iter()
        .filter(|entry| session::meets_minimum(&entry.resolved, min_session_secs))
        .collect();

    let mut users = Vec::with_capacity(included.len());
    let mut perspective_counts: BTreeMap<String, u32> = BTreeMap::new();
    let mut region_visitors: BTreeMap<String, u32> = BTreeMap::new();
    let mut landmark_counts: BTreeMap<usize, (u32, BTreeMap<String, u32>)> = BTreeMap::new();
    let mut all_feedback: Vec<f64> = Vec::new();
    let mut feedback_by_perspective: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    let mut total_duration: i64 = 0;
    let mut total_pickups: u64 = 0;

    for entry in &included {
        let mut pickup_list = Vec::new();
        let mut feedback = Vec::new();
        let mut visited: BTreeSet<&str> = BTreeSet::new();

        for event in &entry.events {
            match event {
                TypedEvent::ItemPickup { landmark_id, .. } => {
                    pickup_list.push(*landmark_id);
                    let (count, by_perspective) =
                        landmark_counts.entry(*landmark_id).or_default();
                    *count += 1;
                    *by_perspective
                        .entry(entry.perspective.clone())
                        .or_default() += 1;
                }
                TypedEvent::RegionVisit { region_name, .. } => {
                    visited.insert(region_name.as_str());
                }
                TypedEvent::FeedbackRating { value, .. } => feedback.push(*value),
                TypedEvent::PositionSample { .. } => {}
            }
        }

        // at most one visit per (user, region), however often re-entered
        for region in visited {
            *region_visitors.entry(region.to_string()).or_default() += 1;
        }

        *perspective_counts
            .entry(entry.perspective.clone())
            .or_default() += 1;

        all_feedback.extend_from_slice(&feedback);
        feedback_by_perspective
            .entry(entry.perspective.clone())
            .or_default()
            .extend_from_slice(&feedback);

        total_duration += entry.resolved.duration_secs;
        total_pickups += pickup_list.len() as u64;

        let avg_seconds_per_pickup = if pickup_list.is_empty() {
            NO_PICKUP_SENTINEL
        } else {
            entry.resolved.duration_secs as f64 / pickup_list.len() as f64
        };

        users.push(UserStatistics {
            user_id: entry.user_id,
            username: entry.username.clone(),
            perspective: entry.perspective.clone(),
            start_time: entry
                .resolved
                .start_time
                .format(crate::types::TIMESTAMP_FORMAT)
                .to_string(),
            end_time: entry
                .resolved
                .end_time
                .format(crate::types::TIMESTAMP_FORMAT)
                .to_string(),
            duration_seconds: entry.resolved.duration_secs,
            duration_display: session::format_duration(entry.resolved.duration_secs),
            pickup_list,
            avg_seconds_per_pickup,
            avg_curiosity_index: mean(&feedback),
        });
    }

    let included_count = included.len() as u32;

    let region_visits = region_visitors
        .into_iter()
        .map(|(region, visits)| {
            let stats = RegionVisitStats {
                visits,
                visit_rate: visits as f64 / included_count as f64,
            };
            (region, stats)
        })
        .collect();

    let landmark_pickups = landmark_counts
        .into_iter()
        .map(|(landmark_id, (pickups, by_perspective))| {
            let stats = LandmarkPickupStats {
                pickups,
                pickup_rate: pickups as f64 / included_count as f64,
                by_perspective,
            };
            (landmark_id, stats)
        })
        .collect();

    let avg_curiosity_by_perspective = feedback_by_perspective
        .into_iter()
        .filter_map(|(perspective, values)| mean(&values).map(|avg| (perspective, avg)))
        .collect();

    let cohort = CohortStatistics {
        included_users: included_count,
        perspective_counts,
        region_visits,
        landmark_pickups,
        avg_curiosity_index: mean(&all_feedback),
        avg_curiosity_by_perspective,
        avg_session_secs: if included_count == 0 {
            None
        } else {
            Some(total_duration as f64 / included_count as f64)
        },
        avg_pickups_per_user: if included_count == 0 {
            None
        } else {
            Some(total_pickups as f64 / included_count as f64)
        },
    };

    (users, cohort)
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ResolvedSession;
    use chrono::NaiveDateTime;
    use pretty_assertions::assert_eq;

    fn resolved(user_id: i64, duration_secs: i64) -> ResolvedSession {
        let start =
            NaiveDateTime::parse_from_str("2024-12-05 11:17:00", crate::types::TIMESTAMP_FORMAT)
                .unwrap();
        ResolvedSession {
            user_id,
            start_time: start,
            end_time: start + chrono::Duration::seconds(duration_secs),
            duration_secs,
        }
    }

    fn entry(
        user_id: i64,
        perspective: &str,
        duration_secs: i64,
        events: Vec<TypedEvent>,
    ) -> UserReconstruction {
        UserReconstruction {
            user_id,
            username: format!("U{user_id:04}"),
            perspective: perspective.to_string(),
            resolved: resolved(user_id, duration_secs),
            events,
        }
    }

    fn pickup(user_id: i64, landmark_id: usize) -> TypedEvent {
        TypedEvent::ItemPickup {
            user_id,
            timestamp: "2024-12-05 11:20:00".to_string(),
            landmark_id,
        }
    }

    fn visit(user_id: i64, region: &str) -> TypedEvent {
        TypedEvent::RegionVisit {
            user_id,
            timestamp: "2024-12-05 11:21:00".to_string(),
            region_name: region.to_string(),
        }
    }

    fn rating(user_id: i64, value: f64) -> TypedEvent {
        TypedEvent::FeedbackRating {
            user_id,
            timestamp: "2024-12-05 11:22:00".to_string(),
            value,
        }
    }

    #[test]
    fn test_empty_cohort_is_absent_not_nan() {
        let (users, cohort) = aggregate(&[], 300);

        assert!(users.is_empty());
        assert_eq!(cohort.included_users, 0);
        assert_eq!(cohort.avg_curiosity_index, None);
        assert_eq!(cohort.avg_session_secs, None);
        assert_eq!(cohort.avg_pickups_per_user, None);
        assert!(cohort.region_visits.is_empty());
        assert!(cohort.landmark_pickups.is_empty());
    }

    #[test]
    fn test_short_sessions_are_excluded() {
        let per_user = vec![
            entry(1, "BIRD", 120, vec![rating(1, 0.9)]),
            entry(2, "GROUND", 900, vec![rating(2, 0.5)]),
        ];

        let (users, cohort) = aggregate(&per_user, 300);

        assert_eq!(users.len(), 1);
        assert_eq!(users[0].user_id, 2);
        assert_eq!(cohort.included_users, 1);
        assert_eq!(cohort.avg_curiosity_index, Some(0.5));
    }

    #[test]
    fn test_pickup_rate_sentinel_and_average() {
        let per_user = vec![
            entry(1, "BIRD", 600, vec![pickup(1, 0), pickup(1, 2)]),
            entry(2, "BIRD", 900, vec![]),
        ];

        let (users, _) = aggregate(&per_user, 300);

        assert_eq!(users[0].pickup_list, vec![0, 2]);
        assert_eq!(users[0].avg_seconds_per_pickup, 300.0);
        assert_eq!(users[1].pickup_list, Vec::<usize>::new());
        assert_eq!(users[1].avg_seconds_per_pickup, NO_PICKUP_SENTINEL);
    }

    #[test]
    fn test_region_visits_dedup_per_user() {
        let per_user = vec![
            entry(
                1,
                "BIRD",
                600,
                vec![visit(1, "Waterfall"), visit(1, "Waterfall"), visit(1, "Cave")],
            ),
            entry(2, "GROUND", 600, vec![visit(2, "Waterfall")]),
        ];

        let (_, cohort) = aggregate(&per_user, 300);

        let waterfall = &cohort.region_visits["Waterfall"];
        assert_eq!(waterfall.visits, 2);
        assert_eq!(waterfall.visit_rate, 1.0);

        let cave = &cohort.region_visits["Cave"];
        assert_eq!(cave.visits, 1);
        assert_eq!(cave.visit_rate, 0.5);
    }

    #[test]
    fn test_landmark_pickups_by_perspective() {
        let per_user = vec![
            entry(1, "BIRD", 600, vec![pickup(1, 3), pickup(1, 3)]),
            entry(2, "GROUND", 600, vec![pickup(2, 3), pickup(2, 5)]),
        ];

        let (_, cohort) = aggregate(&per_user, 300);

        let lm3 = &cohort.landmark_pickups[&3];
        assert_eq!(lm3.pickups, 3);
        assert_eq!(lm3.pickup_rate, 1.5);
        assert_eq!(lm3.by_perspective["BIRD"], 2);
        assert_eq!(lm3.by_perspective["GROUND"], 1);

        let lm5 = &cohort.landmark_pickups[&5];
        assert_eq!(lm5.pickups, 1);
        assert_eq!(lm5.pickup_rate, 0.5);
    }

    #[test]
    fn test_curiosity_global_mean_is_over_values_not_users() {
        // user 1 contributes two values, user 2 one; the global mean
        // weights values, not users
        let per_user = vec![
            entry(1, "BIRD", 600, vec![rating(1, 1.0), rating(1, 0.0)]),
            entry(2, "GROUND", 600, vec![rating(2, 0.8)]),
        ];

        let (users, cohort) = aggregate(&per_user, 300);

        assert_eq!(users[0].avg_curiosity_index, Some(0.5));
        assert_eq!(users[1].avg_curiosity_index, Some(0.8));
        assert_eq!(cohort.avg_curiosity_index, Some(0.6));
        assert_eq!(cohort.avg_curiosity_by_perspective["BIRD"], 0.5);
        assert_eq!(cohort.avg_curiosity_by_perspective["GROUND"], 0.8);
    }

    #[test]
    fn test_user_without_feedback_has_absent_curiosity() {
        let per_user = vec![entry(1, "BIRD", 600, vec![])];
        let (users, cohort) = aggregate(&per_user, 300);

        assert_eq!(users[0].avg_curiosity_index, None);
        assert_eq!(cohort.avg_curiosity_index, None);
        assert!(cohort.avg_curiosity_by_perspective.is_empty());
    }

    #[test]
    fn test_perspective_distribution_and_cohort_means() {
        let per_user = vec![
            entry(1, "BIRD", 600, vec![pickup(1, 0)]),
            entry(2, "BIRD", 1200, vec![]),
            entry(3, "GROUND", 900, vec![pickup(3, 1), pickup(3, 2)]),
        ];

        let (_, cohort) = aggregate(&per_user, 300);

        assert_eq!(cohort.perspective_counts["BIRD"], 2);
        assert_eq!(cohort.perspective_counts["GROUND"], 1);
        assert_eq!(cohort.avg_session_secs, Some(900.0));
        assert_eq!(cohort.avg_pickups_per_user, Some(1.0));
    }
}
