//! Best-effort search: fastest time to cover a target distance.
//!
//! A two-pointer scan over the flattened samples of one activity. For each
//! start sample the end pointer advances to the first sample at least the
//! target distance away; it never moves backwards, so each query is O(n).
//! The elapsed time of a span is scaled by `target / actual` to correct for
//! the overshoot of discrete samples past the target.
//!
//! ## Example
//! ```rust
//! use best_efforts::{Sample, best_span::{find_best_span, RaceDistance}};
//! use chrono::{Duration, TimeZone, Utc};
//!
//! let start = Utc.with_ymd_and_hms(2019, 5, 28, 11, 45, 53).unwrap();
//! let samples: Vec<Sample> = (0..10)
//!     .map(|i| Sample::new(i as f64 * 100.0, start + Duration::seconds(i * 10)))
//!     .collect();
//! let refs: Vec<&Sample> = samples.iter().collect();
//!
//! let best = find_best_span(&refs, 500.0).unwrap();
//! assert_eq!(best.seconds, 50.0);
//! assert!(find_best_span(&refs, RaceDistance::Kilometers1.meters()).is_none());
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{BestEffortError, Result};
use crate::types::{seconds_between, Sample};

/// Fewest samples that can form a span.
pub const MIN_SPAN_SAMPLES: usize = 2;

/// Canonical race distances used for personal-best reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RaceDistance {
    Meters400,
    Kilometers1,
    Kilometers2,
    Kilometers3,
    Kilometers5,
    Kilometers10,
    Kilometers20,
    HalfMarathon,
    Marathon,
}

impl RaceDistance {
    /// Every canonical distance, shortest first.
    pub const ALL: [RaceDistance; 9] = [
        RaceDistance::Meters400,
        RaceDistance::Kilometers1,
        RaceDistance::Kilometers2,
        RaceDistance::Kilometers3,
        RaceDistance::Kilometers5,
        RaceDistance::Kilometers10,
        RaceDistance::Kilometers20,
        RaceDistance::HalfMarathon,
        RaceDistance::Marathon,
    ];

    /// Distance in meters.
    pub fn meters(&self) -> f64 {
        match self {
            RaceDistance::Meters400 => 400.0,
            RaceDistance::Kilometers1 => 1000.0,
            RaceDistance::Kilometers2 => 2000.0,
            RaceDistance::Kilometers3 => 3000.0,
            RaceDistance::Kilometers5 => 5000.0,
            RaceDistance::Kilometers10 => 10000.0,
            RaceDistance::Kilometers20 => 20000.0,
            RaceDistance::HalfMarathon => 21097.5,
            RaceDistance::Marathon => 42193.0,
        }
    }

    /// Short label, also accepted by `FromStr`.
    pub fn label(&self) -> &'static str {
        match self {
            RaceDistance::Meters400 => "400m",
            RaceDistance::Kilometers1 => "1k",
            RaceDistance::Kilometers2 => "2k",
            RaceDistance::Kilometers3 => "3k",
            RaceDistance::Kilometers5 => "5k",
            RaceDistance::Kilometers10 => "10k",
            RaceDistance::Kilometers20 => "20k",
            RaceDistance::HalfMarathon => "half",
            RaceDistance::Marathon => "marathon",
        }
    }
}

impl fmt::Display for RaceDistance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for RaceDistance {
    type Err = BestEffortError;

    /// Accepts the short label or the distance in whole meters.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        RaceDistance::ALL
            .iter()
            .copied()
            .find(|d| d.label() == wanted || format!("{}", d.meters().floor()) == wanted)
            .ok_or_else(|| BestEffortError::UnknownDistance(s.to_string()))
    }
}

/// The fastest span found for one target distance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestSpan {
    /// Target distance in meters
    pub target_meters: f64,
    /// Elapsed time normalized to the target distance, in seconds
    pub seconds: f64,
    /// Distance actually covered between the two samples
    pub actual_meters: f64,
    /// Index of the first sample of the span in the flattened sequence
    pub start_index: usize,
    /// Index of the last sample of the span in the flattened sequence
    pub end_index: usize,
}

impl BestSpan {
    /// Average pace over the span in seconds per kilometer.
    pub fn pace_seconds_per_km(&self) -> f64 {
        self.seconds / self.target_meters * 1000.0
    }
}

/// Best span (or none) for one canonical distance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistanceBest {
    pub distance: RaceDistance,
    pub best: Option<BestSpan>,
}

/// Best spans of one activity, one entry per requested distance in order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BestSpans {
    pub entries: Vec<DistanceBest>,
}

impl BestSpans {
    /// Best span at a distance, if the activity covered it.
    pub fn get(&self, distance: RaceDistance) -> Option<&BestSpan> {
        self.entries
            .iter()
            .find(|e| e.distance == distance)
            .and_then(|e| e.best.as_ref())
    }

    /// Best time in seconds at a distance.
    pub fn seconds(&self, distance: RaceDistance) -> Option<f64> {
        self.get(distance).map(|b| b.seconds)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DistanceBest> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Find the fastest span covering at least `target_meters`.
///
/// Returns `None` for fewer than 2 samples, a non-positive target, or when the
/// whole sequence is shorter than the target. Spans with no elapsed time are
/// never candidates. Equal times keep the span that starts first.
pub fn find_best_span(samples: &[&Sample], target_meters: f64) -> Option<BestSpan> {
    let n = samples.len();
    if n < MIN_SPAN_SAMPLES || !target_meters.is_finite() || target_meters <= 0.0 {
        return None;
    }

    let covered =
        |from: usize, to: usize| samples[to].distance_meters - samples[from].distance_meters;

    if covered(0, n - 1) < target_meters {
        return None; // Activity too short
    }

    let mut best: Option<BestSpan> = None;
    let mut right = 1;

    for left in 0..n - 1 {
        while covered(left, right) < target_meters {
            if right < n - 1 {
                right += 1;
            } else {
                return best;
            }
        }

        let actual_meters = covered(left, right);
        let actual_seconds = seconds_between(&samples[left].time, &samples[right].time);
        if actual_seconds <= 0.0 {
            continue; // Timestamps stalled over the span
        }
        let seconds = actual_seconds * (target_meters / actual_meters);

        if best.as_ref().map_or(true, |b| seconds < b.seconds) {
            best = Some(BestSpan {
                target_meters,
                seconds,
                actual_meters,
                start_index: left,
                end_index: right,
            });
        }
    }

    best
}

/// Like [`find_best_span`], but reports too few samples as an error.
pub fn try_find_best_span(samples: &[&Sample], target_meters: f64) -> Result<Option<BestSpan>> {
    if samples.len() < MIN_SPAN_SAMPLES {
        return Err(BestEffortError::InsufficientData {
            sample_count: samples.len(),
            minimum_required: MIN_SPAN_SAMPLES,
        });
    }
    Ok(find_best_span(samples, target_meters))
}

/// Run the search once per distance.
pub fn compute_best_spans(samples: &[&Sample], distances: &[RaceDistance]) -> BestSpans {
    let entries = distances
        .iter()
        .map(|&distance| DistanceBest {
            distance,
            best: find_best_span(samples, distance.meters()),
        })
        .collect();

    BestSpans { entries }
}

/// Format seconds as `h:mm:ss` or `m:ss.s`.
pub fn format_span_time(seconds: f64) -> String {
    if !seconds.is_finite() || seconds < 0.0 {
        return "N/A".to_string();
    }
    let tenths = (seconds * 10.0).round() as u64;
    if tenths < 36_000 {
        format!("{}:{:02}.{}", tenths / 600, (tenths % 600) / 10, tenths % 10)
    } else {
        let total = seconds.round() as u64;
        format!("{}:{:02}:{:02}", total / 3600, (total % 3600) / 60, total % 60)
    }
}

/// Format a pace in seconds per kilometer as `m:ss/km`.
pub fn format_pace(seconds_per_km: f64) -> String {
    if !seconds_per_km.is_finite() || seconds_per_km <= 0.0 {
        return "N/A".to_string();
    }
    let total = seconds_per_km.round() as u64;
    format!("{}:{:02}/km", total / 60, total % 60)
}
