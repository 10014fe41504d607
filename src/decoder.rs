//! Log-line decoding
//!
//! Pure functions that turn one raw encoded payload into a typed event
//! payload, or a [`DecodeError`] naming the offending field. Decoding is
//! deterministic and side-effect free; callers decide what to do with a
//! failure.
//!
//! Position payloads are underscore-delimited:
//!
//! ```text
//! (x, y, z)_(qx, qy, qz, qw)_yaw,pitch_POSDELTA:v_ROTDELTA:v_PD:v_JMP:0_RUN:1
//! ```
//!
//! Clients running under comma-decimal locales write `,` where a decimal
//! point belongs; scalar values are normalized before parsing, and the
//! yaw/pitch pair is reassembled when it carries extra commas.

use crate::error::DecodeError;
use crate::types::{LogKind, PositionSample, Rotation};

/// Field count of a position payload
const POSITION_FIELDS: usize = 8;

/// A successfully decoded payload, one variant per decodable kind
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedPayload {
    Position(PositionSample),
    Region(String),
    Feedback(f64),
}

/// Decode a payload according to its record kind.
///
/// Returns `Ok(None)` for kinds that carry no decodable payload
/// (`ITEMPICKUP` and unrecognized wire names are carried, not decoded).
pub fn decode(kind: &LogKind, payload: &str) -> Result<Option<DecodedPayload>, DecodeError> {
    match kind {
        LogKind::PositionSample => {
            decode_position(payload).map(|sample| Some(DecodedPayload::Position(sample)))
        }
        LogKind::RegionTrigger => Ok(Some(DecodedPayload::Region(payload.to_string()))),
        LogKind::Feedback => {
            decode_feedback(payload).map(|value| Some(DecodedPayload::Feedback(value)))
        }
        LogKind::ItemPickup | LogKind::Other(_) => Ok(None),
    }
}

/// Decode the 8-field position payload
pub fn decode_position(payload: &str) -> Result<PositionSample, DecodeError> {
    let fields: Vec<&str> = payload.split('_').collect();
    if fields.len() != POSITION_FIELDS {
        return Err(DecodeError::new("field_count", payload));
    }

    let position = parse_bracketed_vector("position", fields[0])?;
    let position = match position.as_slice() {
        [x, y, z] => [*x, *y, *z],
        _ => return Err(DecodeError::new("position", fields[0])),
    };

    let rotation = parse_bracketed_vector("rotation", fields[1])?;
    let rotation = match rotation.as_slice() {
        [x, y, z] => Rotation::Euler([*x, *y, *z]),
        [x, y, z, w] => Rotation::Quaternion([*x, *y, *z, *w]),
        _ => return Err(DecodeError::new("rotation", fields[1])),
    };

    let rotation_euler = parse_euler_pair(fields[2])?;
    let position_delta = parse_labeled_scalar("position_delta", fields[3])?;
    let rotation_delta = parse_labeled_scalar("rotation_delta", fields[4])?;
    let path_distance = parse_labeled_scalar("path_distance", fields[5])?;
    let is_jumping = parse_flag("is_jumping", fields[6])?;
    let is_running = parse_flag("is_running", fields[7])?;

    Ok(PositionSample {
        position,
        rotation,
        rotation_euler,
        position_delta,
        rotation_delta,
        path_distance,
        is_jumping,
        is_running,
    })
}

/// Decode a feedback payload: one scalar, comma-normalized
pub fn decode_feedback(payload: &str) -> Result<f64, DecodeError> {
    parse_float("feedback", &normalize_decimal(payload))
}

/// Replace a locale decimal comma with a dot
fn normalize_decimal(raw: &str) -> String {
    raw.replace(',', ".")
}

fn parse_float(field: &'static str, raw: &str) -> Result<f64, DecodeError> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| DecodeError::new(field, raw))
}

/// Parse a `(a, b, c)` or `(a, b, c, d)` vector field
fn parse_bracketed_vector(field: &'static str, raw: &str) -> Result<Vec<f64>, DecodeError> {
    let inner = raw
        .strip_prefix('(')
        .and_then(|rest| rest.strip_suffix(')'))
        .ok_or_else(|| DecodeError::new(field, raw))?;

    inner
        .split(", ")
        .map(|component| parse_float(field, component))
        .collect()
}

/// Parse the yaw/pitch pair.
///
/// A comma-decimal locale turns `12.3,45.6` into `12,3,45,6`; with more
/// than one comma the first two tokens form the first float and the rest
/// form the second, each joined with a dot.
fn parse_euler_pair(raw: &str) -> Result<[f64; 2], DecodeError> {
    let tokens: Vec<&str> = raw.split(',').collect();

    let (first, second) = match tokens.len() {
        2 => (tokens[0].to_string(), tokens[1].to_string()),
        n if n > 2 => (tokens[..2].join("."), tokens[2..].join(".")),
        _ => return Err(DecodeError::new("rotation_euler", raw)),
    };

    Ok([
        parse_float("rotation_euler", &first)?,
        parse_float("rotation_euler", &second)?,
    ])
}

/// Parse a `LABEL:value` scalar field, normalizing a decimal comma
fn parse_labeled_scalar(field: &'static str, raw: &str) -> Result<f64, DecodeError> {
    let (_, value) = raw
        .split_once(':')
        .ok_or_else(|| DecodeError::new(field, raw))?;
    parse_float(field, &normalize_decimal(value))
}

/// Parse a `LABEL:0|1` flag field.
///
/// The value is interpreted as an integer flag; anything that fails integer
/// parsing is a decode failure rather than a truthy non-empty string.
fn parse_flag(field: &'static str, raw: &str) -> Result<bool, DecodeError> {
    let (_, value) = raw
        .split_once(':')
        .ok_or_else(|| DecodeError::new(field, raw))?;
    value
        .trim()
        .parse::<i64>()
        .map(|flag| flag != 0)
        .map_err(|_| DecodeError::new(field, raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const WELL_FORMED: &str = "(-20.031, 36.944, -6.575)_(0.00000, 0.70711, 0.00000, 0.70711)_353.420,12.300_POSDELTA:0.0421_ROTDELTA:1.2500_PD:14.320_JMP:0_RUN:1";

    #[test]
    fn test_decode_position_well_formed() {
        let sample = decode_position(WELL_FORMED).unwrap();

        assert_eq!(sample.position, [-20.031, 36.944, -6.575]);
        assert_eq!(
            sample.rotation,
            Rotation::Quaternion([0.0, 0.70711, 0.0, 0.70711])
        );
        assert_eq!(sample.rotation_euler, [353.42, 12.3]);
        assert_eq!(sample.position_delta, 0.0421);
        assert_eq!(sample.rotation_delta, 1.25);
        assert_eq!(sample.path_distance, 14.32);
        assert!(!sample.is_jumping);
        assert!(sample.is_running);
    }

    #[test]
    fn test_decode_position_three_float_rotation() {
        let payload = "(1.0, 2.0, 3.0)_(10.000, 20.000, 30.000)_90.000,5.000_POSDELTA:0.1_ROTDELTA:0.2_PD:0.3_JMP:1_RUN:0";
        let sample = decode_position(payload).unwrap();

        assert_eq!(sample.rotation, Rotation::Euler([10.0, 20.0, 30.0]));
        assert!(sample.is_jumping);
        assert!(!sample.is_running);
    }

    #[test]
    fn test_euler_pair_with_locale_commas() {
        // two floats written under a comma-decimal locale
        assert_eq!(parse_euler_pair("12,3,45,6").unwrap(), [12.3, 45.6]);
        // only one of the two carries a fraction
        assert_eq!(parse_euler_pair("12,3,45").unwrap(), [12.3, 45.0]);
        // plain encoding
        assert_eq!(parse_euler_pair("353.420,12.300").unwrap(), [353.42, 12.3]);
    }

    #[test]
    fn test_scalar_with_decimal_comma() {
        assert_eq!(parse_labeled_scalar("position_delta", "POSDELTA:0,0421").unwrap(), 0.0421);
    }

    #[test]
    fn test_decode_feedback_normalizes_comma() {
        assert_eq!(decode_feedback("7,5").unwrap(), 7.5);
        assert_eq!(decode_feedback("0.73").unwrap(), 0.73);
    }

    #[test]
    fn test_flag_is_integer_not_truthiness() {
        assert!(parse_flag("is_jumping", "JMP:1").unwrap());
        assert!(!parse_flag("is_jumping", "JMP:0").unwrap());
        // a non-integer value is a failure, not "true because non-empty"
        let err = parse_flag("is_jumping", "JMP:yes").unwrap_err();
        assert_eq!(err.field, "is_jumping");
    }

    #[test]
    fn test_wrong_field_count_fails() {
        let err = decode_position("(1.0, 2.0, 3.0)_only").unwrap_err();
        assert_eq!(err.field, "field_count");
    }

    #[test]
    fn test_bad_float_names_field() {
        let payload = "(1.0, abc, 3.0)_(0.0, 0.0, 0.0, 1.0)_1.0,2.0_POSDELTA:0.1_ROTDELTA:0.2_PD:0.3_JMP:0_RUN:0";
        let err = decode_position(payload).unwrap_err();
        assert_eq!(err.field, "position");
        assert_eq!(err.raw, "abc");
    }

    #[test]
    fn test_decode_is_deterministic() {
        let kind = LogKind::PositionSample;
        let first = decode(&kind, WELL_FORMED).unwrap();
        let second = decode(&kind, WELL_FORMED).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_undecodable_kinds_pass_through() {
        assert_eq!(decode(&LogKind::ItemPickup, "BANANA_3").unwrap(), None);
        assert_eq!(
            decode(&LogKind::Other("INFO".to_string()), "START POSLOG").unwrap(),
            None
        );
    }

    #[test]
    fn test_region_payload_is_the_name() {
        let decoded = decode(&LogKind::RegionTrigger, "Waterfall").unwrap();
        assert_eq!(decoded, Some(DecodedPayload::Region("Waterfall".to_string())));
    }
}
