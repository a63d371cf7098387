//! # Best Efforts
//!
//! Velocity estimation and best-effort search for recorded runs.
//!
//! This library provides:
//! - An owned activity hierarchy (Sample ⊂ Track ⊂ Lap ⊂ Activity ⊂ Database)
//! - Per-sample velocity from smoothed central differences
//! - Fastest time over canonical race distances (400 m to marathon)
//! - A lossless persistence codec and best-of-batch comparison
//!
//! ## Features
//!
//! - **`parallel`** - Finish databases of activities in parallel with rayon
//!
//! ## Quick Start
//!
//! ```rust
//! use best_efforts::{Activity, AnalysisConfig, Lap, RaceDistance, Sample, Sport, Track};
//! use chrono::{Duration, TimeZone, Utc};
//!
//! let start = Utc.with_ymd_and_hms(2019, 5, 28, 11, 45, 53).unwrap();
//! let samples: Vec<Sample> = (0..10)
//!     .map(|i| Sample::new(i as f64 * 100.0, start + Duration::seconds(i * 10)))
//!     .collect();
//! let activity = Activity::new(
//!     Sport::Running,
//!     start,
//!     vec![Lap::new(start, vec![Track::new(samples)])],
//! );
//!
//! let finished = activity.finish(&AnalysisConfig::default()).unwrap();
//! assert_eq!(finished.best(RaceDistance::Meters400).unwrap().seconds, 40.0);
//! assert_eq!(finished.samples()[4].velocity(), 36.0);
//! ```

// Unified error handling
pub mod error;
pub use error::{BestEffortError, OptionExt, Result};

// Activity hierarchy
pub mod types;
pub use types::{
    Activity, Database, GpsPoint, Intensity, Lap, Sample, Sport, Track, TriggerMethod,
};

// Velocity estimation
pub mod velocity;
pub use velocity::{estimate_velocities, VelocityProfile};

// Best-span search over race distances
pub mod best_span;
pub use best_span::{
    compute_best_spans, find_best_span, BestSpan, BestSpans, DistanceBest, RaceDistance,
};

// Two-phase construction: raw hierarchy -> finished hierarchy
pub mod finish;
pub use finish::{AnalysisConfig, FinishedActivity, FinishedDatabase};

// Parser-facing records
pub mod normalize;
pub use normalize::{database_from_json, normalize_activity, normalize_database};

// Persistence codec
pub mod codec;

// Cross-activity comparison
pub mod batch;
pub use batch::{best_of_batch, best_progression, BatchBest};
