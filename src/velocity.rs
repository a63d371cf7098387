//! Per-sample velocity from distance/time deltas.
//!
//! Velocity at an interior sample is the central difference over its two
//! neighbours, smoothed with a 3-point moving average. Endpoints stay at zero.
//!
//! ## Example
//! ```rust
//! use best_efforts::{Sample, velocity::estimate_velocities};
//! use chrono::{Duration, TimeZone, Utc};
//!
//! let start = Utc.with_ymd_and_hms(2019, 5, 28, 11, 45, 53).unwrap();
//! let samples: Vec<Sample> = (0..5)
//!     .map(|i| Sample::new(i as f64 * 100.0, start + Duration::seconds(i * 10)))
//!     .collect();
//! let refs: Vec<&Sample> = samples.iter().collect();
//!
//! let profile = estimate_velocities(&refs);
//! assert_eq!(profile.velocities[2], 36.0);
//! ```

use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::{BestEffortError, Result};
use crate::types::{seconds_between, Sample};

/// Conversion factor from m/s to km/h.
pub const MPS_TO_KMH: f64 = 3.6;

/// Fewest samples that have an interior point.
pub const MIN_VELOCITY_SAMPLES: usize = 3;

/// Velocities for a flattened sample sequence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VelocityProfile {
    /// One velocity per sample in km/h
    pub velocities: Vec<f64>,
    /// Indices at a zero or negative time delta, in order
    pub degenerate: Vec<usize>,
}

impl VelocityProfile {
    pub fn has_degenerate(&self) -> bool {
        !self.degenerate.is_empty()
    }
}

/// Central-difference velocity for each sample.
///
/// Endpoints and samples whose neighbours share a timestamp have no defined
/// value. The second element lists every index whose time does not advance
/// past the previous sample, plus interior indices without a defined value.
fn raw_velocities(samples: &[&Sample]) -> (Vec<Option<f64>>, Vec<usize>) {
    let n = samples.len();
    let mut raw = vec![None; n];
    let mut degenerate = Vec::new();

    for i in 1..n {
        let mut stalled = seconds_between(&samples[i - 1].time, &samples[i].time) <= 0.0;

        if i + 1 < n {
            let (prev, next) = (samples[i - 1], samples[i + 1]);
            let dt = seconds_between(&prev.time, &next.time);
            if dt > 0.0 {
                let dd = next.distance_meters - prev.distance_meters;
                raw[i] = Some(dd / dt * MPS_TO_KMH);
            } else {
                stalled = true;
            }
        }

        if stalled {
            degenerate.push(i);
        }
    }

    (raw, degenerate)
}

/// Estimate velocity (km/h) for every sample.
///
/// Fewer than 3 samples yields all zeros. A zero time delta never divides:
/// the affected raw value is left out of every window it falls in, and a
/// sample whose whole window is undefined gets 0.
pub fn estimate_velocities(samples: &[&Sample]) -> VelocityProfile {
    let n = samples.len();
    let mut velocities = vec![0.0; n];
    let (raw, degenerate) = raw_velocities(samples);

    for i in 1..n.saturating_sub(1) {
        let (sum, count) = raw[i - 1..=i + 1]
            .iter()
            .flatten()
            .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
        if count > 0 {
            velocities[i] = sum / count as f64;
        }
    }

    if !degenerate.is_empty() {
        warn!(
            "[Velocity] {} of {} samples have a zero time delta, first at index {}",
            degenerate.len(),
            n,
            degenerate[0]
        );
    }

    VelocityProfile {
        velocities,
        degenerate,
    }
}

/// Strict variant of [`estimate_velocities`].
///
/// Fails with `InsufficientData` below 3 samples and with
/// `DegenerateTimeDelta` at the first zero time delta.
pub fn try_estimate_velocities(samples: &[&Sample]) -> Result<VelocityProfile> {
    if samples.len() < MIN_VELOCITY_SAMPLES {
        return Err(BestEffortError::InsufficientData {
            sample_count: samples.len(),
            minimum_required: MIN_VELOCITY_SAMPLES,
        });
    }

    let profile = estimate_velocities(samples);
    match profile.degenerate.first() {
        Some(&index) => Err(BestEffortError::DegenerateTimeDelta { index }),
        None => Ok(profile),
    }
}
