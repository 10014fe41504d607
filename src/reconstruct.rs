//! User event reconstruction
//!
//! A single ordered pass over one user's raw records, carrying the most
//! recent successfully decoded position sample. Foraging triggers combine
//! that sample with the calibrated landmark set to derive pickups; every
//! other region trigger becomes a visit. Decode failures are isolated per
//! record and collected for reporting.

use crate::decoder;
use crate::error::{DecodeError, DecodeFailure};
use crate::landmarks::{LandmarkSet, FORAGING_TRIGGER};
use crate::types::{LogKind, RawLogRecord, TypedEvent, UserSession};

/// Reconstruct one user's typed event sequence.
///
/// Output order equals input order; the only state carried across records
/// is the last decoded position sample. No user's reconstruction depends
/// on another's, so callers may fan this out freely.
pub fn reconstruct(
    user: &UserSession,
    landmarks: &LandmarkSet,
) -> (Vec<TypedEvent>, Vec<DecodeFailure>) {
    let mut events = Vec::new();
    let mut failures = Vec::new();
    let mut last_position: Option<[f64; 3]> = None;

    for record in &user.records {
        match &record.kind {
            LogKind::PositionSample => match decoder::decode_position(&record.payload) {
                Ok(sample) => {
                    last_position = Some(sample.position);
                    events.push(TypedEvent::PositionSample {
                        user_id: user.user_id,
                        timestamp: record.timestamp.clone(),
                        sample,
                    });
                }
                Err(err) => failures.push(failure(user, record, err)),
            },

            LogKind::RegionTrigger => {
                if record.payload == FORAGING_TRIGGER {
                    // No prior sample means no pickup is derivable; that is
                    // not an error.
                    if let Some(point) = last_position {
                        if let Some(landmark) = landmarks.first_within(point) {
                            events.push(TypedEvent::ItemPickup {
                                user_id: user.user_id,
                                timestamp: record.timestamp.clone(),
                                landmark_id: landmark.id,
                            });
                        }
                    }
                } else {
                    events.push(TypedEvent::RegionVisit {
                        user_id: user.user_id,
                        timestamp: record.timestamp.clone(),
                        region_name: record.payload.clone(),
                    });
                }
            }

            LogKind::Feedback => match decoder::decode_feedback(&record.payload) {
                Ok(value) => events.push(TypedEvent::FeedbackRating {
                    user_id: user.user_id,
                    timestamp: record.timestamp.clone(),
                    value,
                }),
                Err(err) => failures.push(failure(user, record, err)),
            },

            // Raw pickups are re-derived from triggers; other wire names
            // (INFO, GAMESESSION, ...) carry no event.
            LogKind::ItemPickup | LogKind::Other(_) => {}
        }
    }

    (events, failures)
}

fn failure(user: &UserSession, record: &RawLogRecord, err: DecodeError) -> DecodeFailure {
    DecodeFailure {
        user_id: user.user_id,
        timestamp: record.timestamp.clone(),
        kind: record.kind.as_wire().to_string(),
        field: err.field,
        payload: record.payload.clone(),
    }
}
