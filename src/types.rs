//! Activity hierarchy: Sample ⊂ Track ⊂ Lap ⊂ Activity ⊂ Database.
//!
//! Each container owns its children. Algorithms never walk the tree directly;
//! they consume the flattened, non-owning view from [`Activity::samples`].

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::BestEffortError;

// ============================================================================
// Enumerations
// ============================================================================

/// Sport recorded for an activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sport {
    Running,
    Biking,
    #[default]
    Other,
}

impl FromStr for Sport {
    type Err = BestEffortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Running" => Ok(Sport::Running),
            "Biking" => Ok(Sport::Biking),
            "Other" => Ok(Sport::Other),
            _ => Err(BestEffortError::UnknownSport(s.to_string())),
        }
    }
}

impl fmt::Display for Sport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Sport::Running => "Running",
            Sport::Biking => "Biking",
            Sport::Other => "Other",
        };
        f.write_str(name)
    }
}

/// What closed a lap on the recording device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TriggerMethod {
    #[default]
    Manual,
    Distance,
    Location,
    Time,
    HeartRate,
}

impl FromStr for TriggerMethod {
    type Err = BestEffortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Manual" => Ok(TriggerMethod::Manual),
            "Distance" => Ok(TriggerMethod::Distance),
            "Location" => Ok(TriggerMethod::Location),
            "Time" => Ok(TriggerMethod::Time),
            "HeartRate" => Ok(TriggerMethod::HeartRate),
            _ => Err(BestEffortError::UnknownTriggerMethod(s.to_string())),
        }
    }
}

impl fmt::Display for TriggerMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TriggerMethod::Manual => "Manual",
            TriggerMethod::Distance => "Distance",
            TriggerMethod::Location => "Location",
            TriggerMethod::Time => "Time",
            TriggerMethod::HeartRate => "HeartRate",
        };
        f.write_str(name)
    }
}

/// Lap intensity as reported by the device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Intensity {
    #[default]
    Active,
    Resting,
}

impl Intensity {
    pub fn is_active(&self) -> bool {
        matches!(self, Intensity::Active)
    }
}

impl FromStr for Intensity {
    type Err = BestEffortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Active" => Ok(Intensity::Active),
            "Resting" => Ok(Intensity::Resting),
            _ => Err(BestEffortError::UnknownIntensity(s.to_string())),
        }
    }
}

// ============================================================================
// Sample
// ============================================================================

/// A GPS coordinate with latitude and longitude.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpsPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GpsPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Check if the point has valid coordinates.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// One time-stamped reading.
///
/// `velocity` is derived by the finishing pass and cannot be set by callers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Cumulative distance in meters
    pub distance_meters: f64,
    pub time: DateTime<Utc>,
    /// Derived velocity in km/h (0 until the activity is finished)
    #[serde(default)]
    velocity: f64,
    pub position: Option<GpsPoint>,
    pub altitude_meters: f64,
    pub heart_rate_bpm: Option<u16>,
    pub cadence: Option<u8>,
    pub sensor_present: bool,
}

impl Sample {
    /// Create a sample with only the fields the algorithms need.
    pub fn new(distance_meters: f64, time: DateTime<Utc>) -> Self {
        Self {
            distance_meters,
            time,
            ..Default::default()
        }
    }

    /// Velocity in km/h.
    pub fn velocity(&self) -> f64 {
        self.velocity
    }

    pub(crate) fn set_velocity(&mut self, velocity: f64) {
        self.velocity = velocity;
    }
}

/// Seconds elapsed from `from` to `to`, at millisecond resolution.
pub(crate) fn seconds_between(from: &DateTime<Utc>, to: &DateTime<Utc>) -> f64 {
    (*to - *from).num_milliseconds() as f64 / 1000.0
}

// ============================================================================
// Containers
// ============================================================================

/// Ordered run of samples.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub samples: Vec<Sample>,
}

impl Track {
    pub fn new(samples: Vec<Sample>) -> Self {
        Self { samples }
    }
}

/// A lap with the device's summary values and its tracks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Lap {
    pub start_time: DateTime<Utc>,
    pub total_time_seconds: f64,
    pub distance_meters: f64,
    /// Maximum speed in m/s
    pub maximum_speed: f64,
    pub calories: u32,
    pub average_heart_rate_bpm: u16,
    pub maximum_heart_rate_bpm: u16,
    pub intensity: Intensity,
    pub cadence: u8,
    pub trigger_method: TriggerMethod,
    pub notes: String,
    pub tracks: Vec<Track>,
}

impl Lap {
    /// Create a lap with empty summary values.
    pub fn new(start_time: DateTime<Utc>, tracks: Vec<Track>) -> Self {
        Self {
            start_time,
            tracks,
            ..Default::default()
        }
    }

    pub fn sample_count(&self) -> usize {
        self.tracks.iter().map(|t| t.samples.len()).sum()
    }
}

/// A recorded activity before the finishing pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub sport: Sport,
    /// Activity start time, used as its identifier
    pub id: DateTime<Utc>,
    pub laps: Vec<Lap>,
}

impl Activity {
    pub fn new(sport: Sport, id: DateTime<Utc>, laps: Vec<Lap>) -> Self {
        Self { sport, id, laps }
    }

    /// All samples in recording order: laps, then tracks, then samples.
    pub fn samples(&self) -> Vec<&Sample> {
        self.laps
            .iter()
            .flat_map(|lap| lap.tracks.iter())
            .flat_map(|track| track.samples.iter())
            .collect()
    }

    pub(crate) fn samples_mut(&mut self) -> impl Iterator<Item = &mut Sample> {
        self.laps
            .iter_mut()
            .flat_map(|lap| lap.tracks.iter_mut())
            .flat_map(|track| track.samples.iter_mut())
    }

    pub fn sample_count(&self) -> usize {
        self.laps.iter().map(Lap::sample_count).sum()
    }

    /// Distance between the first and last sample in meters.
    pub fn total_distance(&self) -> f64 {
        let samples = self.samples();
        match (samples.first(), samples.last()) {
            (Some(first), Some(last)) => last.distance_meters - first.distance_meters,
            _ => 0.0,
        }
    }

    /// Time between the first and last sample in seconds.
    pub fn elapsed_seconds(&self) -> f64 {
        let samples = self.samples();
        match (samples.first(), samples.last()) {
            (Some(first), Some(last)) => seconds_between(&first.time, &last.time),
            _ => 0.0,
        }
    }

    /// Whether distance and time never decrease across the flattened samples.
    ///
    /// Best-span search relies on this; recordings that reset distance at each
    /// lap fail the check.
    pub fn is_distance_monotonic(&self) -> bool {
        self.samples()
            .windows(2)
            .all(|w| w[1].distance_meters >= w[0].distance_meters && w[1].time >= w[0].time)
    }
}

/// Ordered collection of raw activities.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Database {
    pub activities: Vec<Activity>,
}

impl Database {
    pub fn new(activities: Vec<Activity>) -> Self {
        Self { activities }
    }
}
