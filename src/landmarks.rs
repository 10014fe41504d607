//! Landmark calibration
//!
//! Computes, once per run, the absolute landmark positions and the
//! self-calibrated proximity threshold used to match position samples to
//! landmarks. The threshold is a quarter of the minimum pairwise squared
//! distance, i.e. a matching radius of half the smallest landmark
//! separation, so no two landmarks can claim the same sample point.

use serde::{Deserialize, Serialize};

use crate::error::AnalyticsError;

/// World-space base position the landmark offsets are relative to
pub const WORLD_BASE: [f64; 3] = [-20.03064, 36.94436, -6.575068];

/// The region-trigger name that, combined with proximity, derives a pickup
pub const FORAGING_TRIGGER: &str = "Foraging_Banana";

/// Fixed forage spawn offsets relative to [`WORLD_BASE`]
const LANDMARK_OFFSETS: &[[f64; 3]] = &[
    [0.0, 0.0, 0.0],
    [14.2, -1.3, 9.8],
    [-11.6, 0.4, 18.9],
    [23.7, 2.1, -7.4],
    [-18.3, -0.8, -14.2],
    [6.9, 1.7, 25.3],
    [31.5, -2.6, 12.1],
    [-26.4, 3.2, 6.7],
];

/// A fixed point of interest used as a proximity anchor.
///
/// Immutable after construction; ids follow construction order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub id: usize,
    pub position: [f64; 3],
}

/// The calibrated landmark set and its proximity threshold
#[derive(Debug, Clone)]
pub struct LandmarkSet {
    landmarks: Vec<Landmark>,
    threshold_sq: f64,
}

impl LandmarkSet {
    /// Calibrate the built-in world landmark set
    pub fn calibrate() -> Result<Self, AnalyticsError> {
        Self::from_offsets(WORLD_BASE, LANDMARK_OFFSETS)
    }

    /// Calibrate from an explicit base position and offset list.
    ///
    /// Fewer than two landmarks leaves the threshold undefined and is a
    /// fatal configuration error, not a per-record failure.
    pub fn from_offsets(base: [f64; 3], offsets: &[[f64; 3]]) -> Result<Self, AnalyticsError> {
        if offsets.len() < 2 {
            return Err(AnalyticsError::Configuration(format!(
                "proximity threshold undefined with {} landmark(s); at least 2 required",
                offsets.len()
            )));
        }

        let landmarks: Vec<Landmark> = offsets
            .iter()
            .enumerate()
            .map(|(id, offset)| Landmark {
                id,
                position: [
                    base[0] + offset[0],
                    base[1] + offset[1],
                    base[2] + offset[2],
                ],
            })
            .collect();

        let mut min_pair_sq = f64::INFINITY;
        for (i, a) in landmarks.iter().enumerate() {
            for b in &landmarks[i + 1..] {
                let d = distance_sq(a.position, b.position);
                if d < min_pair_sq {
                    min_pair_sq = d;
                }
            }
        }

        Ok(Self {
            landmarks,
            threshold_sq: 0.25 * min_pair_sq,
        })
    }

    /// Squared-distance matching threshold, constant for the run
    pub fn threshold_sq(&self) -> f64 {
        self.threshold_sq
    }

    /// Landmarks in construction (id) order
    pub fn landmarks(&self) -> &[Landmark] {
        &self.landmarks
    }

    /// First landmark whose squared distance to `point` is strictly below
    /// the threshold. Iteration follows construction order, so ties break
    /// toward the lowest id.
    pub fn first_within(&self, point: [f64; 3]) -> Option<&Landmark> {
        self.landmarks
            .iter()
            .find(|landmark| distance_sq(landmark.position, point) < self.threshold_sq)
    }
}

fn distance_sq(a: [f64; 3], b: [f64; 3]) -> f64 {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    let dz = a[2] - b[2];
    dx * dx + dy * dy + dz * dz
}
