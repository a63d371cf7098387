//! Unified error handling for the best-efforts library.
//!
//! Only the normalization boundary, the codec and the strict finishing mode
//! return errors. The core algorithms degrade to zero velocities or "no span"
//! instead of failing.

use thiserror::Error;

/// Unified error type for best-efforts operations.
#[derive(Debug, Error)]
pub enum BestEffortError {
    /// A parser record is missing a required field
    #[error("Sample {index} is malformed: missing {field}")]
    MalformedSample { field: &'static str, index: usize },

    /// A parser lap record is missing a required field
    #[error("Lap {index} is malformed: missing {field}")]
    MalformedLap { field: &'static str, index: usize },

    /// A parser activity record is missing a required field
    #[error("Activity is malformed: missing {field}")]
    MalformedActivity { field: &'static str },

    /// The timestamp at `index` does not advance, so no velocity can be derived
    #[error("Degenerate time delta around sample {index}")]
    DegenerateTimeDelta { index: usize },

    /// Too few samples for the requested computation
    #[error("{sample_count} samples, minimum {minimum_required} required")]
    InsufficientData {
        sample_count: usize,
        minimum_required: usize,
    },

    /// Lap trigger method name not recognized
    #[error("Unknown trigger method '{0}'")]
    UnknownTriggerMethod(String),

    /// Sport name not recognized
    #[error("Unknown sport '{0}'")]
    UnknownSport(String),

    /// Lap intensity name not recognized
    #[error("Unknown intensity '{0}'")]
    UnknownIntensity(String),

    /// Race distance label not recognized
    #[error("Unknown race distance '{0}'")]
    UnknownDistance(String),

    /// MessagePack encoding failed
    #[error("Encode error: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    /// MessagePack decoding failed
    #[error("Decode error: {0}")]
    Decode(#[from] rmp_serde::decode::Error),

    /// JSON encoding or decoding failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Filesystem access failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for best-efforts operations.
pub type Result<T> = std::result::Result<T, BestEffortError>;

/// Extension trait for converting Option to BestEffortError.
pub trait OptionExt<T> {
    /// Convert a missing record field into a malformed sample error.
    fn ok_or_malformed(self, field: &'static str, index: usize) -> Result<T>;

    /// Convert Option to Result with insufficient data error.
    fn ok_or_insufficient_data(self, sample_count: usize, minimum: usize) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_malformed(self, field: &'static str, index: usize) -> Result<T> {
        self.ok_or(BestEffortError::MalformedSample { field, index })
    }

    fn ok_or_insufficient_data(self, sample_count: usize, minimum: usize) -> Result<T> {
        self.ok_or(BestEffortError::InsufficientData {
            sample_count,
            minimum_required: minimum,
        })
    }
}
