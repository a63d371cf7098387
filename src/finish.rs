//! Finishing pass: raw hierarchy in, velocity and best-span enriched hierarchy out.
//!
//! A raw [`Activity`] is built once from normalized input. [`Activity::finish`]
//! consumes it, writes every sample's velocity, runs the best-span search once
//! per configured distance and returns a [`FinishedActivity`] that only hands
//! out shared references.

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::best_span::{compute_best_spans, BestSpan, BestSpans, RaceDistance};
use crate::error::{BestEffortError, Result};
use crate::types::{Activity, Database, Lap, Sample, Sport};
use crate::velocity::estimate_velocities;

/// Configuration for the finishing pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Distances to search for best spans.
    /// Default: every canonical race distance
    pub distances: Vec<RaceDistance>,

    /// Only search best spans over samples with `sensor_present` set.
    /// Velocity is always estimated over every sample. Default: false
    pub sensor_samples_only: bool,

    /// Fail with `DegenerateTimeDelta` instead of skipping samples whose time
    /// does not advance. Default: false
    pub strict_time_deltas: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            distances: RaceDistance::ALL.to_vec(),
            sensor_samples_only: false,
            strict_time_deltas: false,
        }
    }
}

/// An activity after the finishing pass. Read-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinishedActivity {
    activity: Activity,
    best_spans: BestSpans,
    /// Flattened indices at a zero or negative time delta
    degenerate_samples: Vec<usize>,
}

impl FinishedActivity {
    pub fn activity(&self) -> &Activity {
        &self.activity
    }

    pub fn sport(&self) -> Sport {
        self.activity.sport
    }

    pub fn id(&self) -> DateTime<Utc> {
        self.activity.id
    }

    pub fn laps(&self) -> &[Lap] {
        &self.activity.laps
    }

    /// All samples in recording order, velocities populated.
    pub fn samples(&self) -> Vec<&Sample> {
        self.activity.samples()
    }

    pub fn best_spans(&self) -> &BestSpans {
        &self.best_spans
    }

    /// Best span at a canonical distance, if the activity covered it.
    pub fn best(&self, distance: RaceDistance) -> Option<&BestSpan> {
        self.best_spans.get(distance)
    }

    pub fn degenerate_samples(&self) -> &[usize] {
        &self.degenerate_samples
    }

    /// Replace the lap set, recomputing velocities and best spans.
    pub fn with_laps(self, laps: Vec<Lap>, config: &AnalysisConfig) -> Result<FinishedActivity> {
        let mut activity = self.activity;
        activity.laps = laps;
        activity.finish(config)
    }

    /// Give up the enrichment and get the hierarchy back for editing.
    pub fn into_activity(self) -> Activity {
        self.activity
    }
}

impl Activity {
    /// Run the finishing pass.
    ///
    /// Only fails in strict mode, on a zero time delta.
    pub fn finish(mut self, config: &AnalysisConfig) -> Result<FinishedActivity> {
        if !self.is_distance_monotonic() {
            warn!(
                "[Finish] Activity {} has decreasing distance or time; best spans may be wrong",
                self.id
            );
        }

        let profile = estimate_velocities(&self.samples());
        if config.strict_time_deltas {
            if let Some(&index) = profile.degenerate.first() {
                return Err(BestEffortError::DegenerateTimeDelta { index });
            }
        }

        for (sample, velocity) in self.samples_mut().zip(profile.velocities) {
            sample.set_velocity(velocity);
        }

        let best_spans = {
            let samples = self.samples();
            if config.sensor_samples_only {
                search_sensor_samples(&samples, &config.distances)
            } else {
                compute_best_spans(&samples, &config.distances)
            }
        };

        let covered = best_spans.iter().filter(|e| e.best.is_some()).count();
        info!(
            "[Finish] Activity {} ({}): {} samples, {}/{} distances covered",
            self.id,
            self.sport,
            self.sample_count(),
            covered,
            best_spans.len()
        );

        Ok(FinishedActivity {
            activity: self,
            best_spans,
            degenerate_samples: profile.degenerate,
        })
    }
}

/// Search only sensor samples, reporting span indices in the full sequence.
fn search_sensor_samples(samples: &[&Sample], distances: &[RaceDistance]) -> BestSpans {
    let (indices, sensor): (Vec<usize>, Vec<&Sample>) = samples
        .iter()
        .enumerate()
        .filter(|(_, s)| s.sensor_present)
        .map(|(i, s)| (i, *s))
        .unzip();

    debug!(
        "[Finish] {} of {} samples have a sensor",
        sensor.len(),
        samples.len()
    );

    let mut spans = compute_best_spans(&sensor, distances);
    for span in spans.entries.iter_mut().filter_map(|e| e.best.as_mut()) {
        span.start_index = indices[span.start_index];
        span.end_index = indices[span.end_index];
    }
    spans
}

/// Ordered collection of finished activities.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FinishedDatabase {
    pub activities: Vec<FinishedActivity>,
}

impl Database {
    /// Finish every activity, keeping input order.
    ///
    /// Activities are independent, so the `parallel` feature finishes them
    /// concurrently with identical results.
    pub fn finish(self, config: &AnalysisConfig) -> Result<FinishedDatabase> {
        #[cfg(feature = "parallel")]
        let activities = self
            .activities
            .into_par_iter()
            .map(|a| a.finish(config))
            .collect::<Result<Vec<_>>>()?;

        #[cfg(not(feature = "parallel"))]
        let activities = self
            .activities
            .into_iter()
            .map(|a| a.finish(config))
            .collect::<Result<Vec<_>>>()?;

        Ok(FinishedDatabase { activities })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Track;
    use chrono::{Duration, TimeZone};

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2019, 5, 28, 11, 45, 53).unwrap()
    }

    /// One lap per chunk of distances, samples 10 s apart throughout.
    fn activity(chunks: &[&[f64]]) -> Activity {
        let mut t = 0;
        let laps = chunks
            .iter()
            .map(|chunk| {
                let lap_start = start() + Duration::seconds(t);
                let samples = chunk
                    .iter()
                    .map(|&d| {
                        let s = Sample::new(d, start() + Duration::seconds(t));
                        t += 10;
                        s
                    })
                    .collect();
                Lap::new(lap_start, vec![Track::new(samples)])
            })
            .collect();
        Activity::new(Sport::Running, start(), laps)
    }

    #[test]
    fn test_finish_populates_velocity_across_laps() {
        let finished = activity(&[&[0.0, 100.0, 200.0], &[300.0, 400.0, 500.0]])
            .finish(&AnalysisConfig::default())
            .unwrap();

        let velocities: Vec<f64> = finished.samples().iter().map(|s| s.velocity()).collect();
        assert_eq!(velocities, vec![0.0, 36.0, 36.0, 36.0, 36.0, 0.0]);
        assert_eq!(finished.best(RaceDistance::Meters400).unwrap().seconds, 40.0);
        assert!(finished.best(RaceDistance::Kilometers1).is_none());
        assert_eq!(finished.best_spans().len(), RaceDistance::ALL.len());
        assert!(finished.degenerate_samples().is_empty());
    }

    #[test]
    fn test_custom_distances() {
        let config = AnalysisConfig {
            distances: vec![RaceDistance::Meters400],
            ..Default::default()
        };
        let finished = activity(&[&[0.0, 100.0, 200.0, 300.0, 400.0]])
            .finish(&config)
            .unwrap();
        assert_eq!(finished.best_spans().len(), 1);
    }

    #[test]
    fn test_sensor_only_maps_indices_back() {
        let mut raw = activity(&[&[0.0, 100.0, 200.0, 300.0, 400.0, 500.0]]);
        for (i, sample) in raw.samples_mut().enumerate() {
            sample.sensor_present = i >= 1;
        }
        let config = AnalysisConfig {
            sensor_samples_only: true,
            ..Default::default()
        };

        let finished = raw.finish(&config).unwrap();
        let best = finished.best(RaceDistance::Meters400).unwrap();
        assert_eq!(best.start_index, 1);
        assert_eq!(best.end_index, 5);
    }

    #[test]
    fn test_strict_mode_rejects_degenerate() {
        let mut raw = activity(&[&[0.0, 10.0, 20.0, 30.0]]);
        let same = raw.laps[0].tracks[0].samples[1].time;
        raw.laps[0].tracks[0].samples[3].time = same;
        raw.laps[0].tracks[0].samples[2].time = same;

        let lenient = raw.clone().finish(&AnalysisConfig::default()).unwrap();
        assert_eq!(lenient.degenerate_samples(), &[2, 3]);

        let strict = AnalysisConfig {
            strict_time_deltas: true,
            ..Default::default()
        };
        assert!(matches!(
            raw.finish(&strict),
            Err(BestEffortError::DegenerateTimeDelta { index: 2 })
        ));
    }

    #[test]
    fn test_single_equal_pair_across_laps() {
        // the second lap starts at the timestamp the first one ended on
        let mut raw = activity(&[&[0.0, 100.0, 200.0], &[300.0, 400.0, 500.0]]);
        raw.laps[1].tracks[0].samples[0].time = raw.laps[0].tracks[0].samples[2].time;

        let lenient = raw.clone().finish(&AnalysisConfig::default()).unwrap();
        assert_eq!(lenient.degenerate_samples(), &[3]);
        assert!(lenient
            .best_spans()
            .iter()
            .filter_map(|e| e.best.as_ref())
            .all(|b| b.seconds > 0.0));

        let strict = AnalysisConfig {
            strict_time_deltas: true,
            ..Default::default()
        };
        assert!(matches!(
            raw.finish(&strict),
            Err(BestEffortError::DegenerateTimeDelta { index: 3 })
        ));
    }

    #[test]
    fn test_with_laps_recomputes() {
        let config = AnalysisConfig::default();
        let finished = activity(&[&[0.0, 100.0, 200.0]]).finish(&config).unwrap();
        assert!(finished.best(RaceDistance::Meters400).is_none());

        let longer = activity(&[&[0.0, 100.0, 200.0, 300.0, 400.0]]).laps;
        let refinished = finished.with_laps(longer, &config).unwrap();
        assert_eq!(refinished.best(RaceDistance::Meters400).unwrap().seconds, 40.0);
    }

    #[test]
    fn test_finish_is_idempotent() {
        let config = AnalysisConfig::default();
        let raw = activity(&[&[0.0, 37.2, 81.9, 120.4], &[166.0, 209.3, 262.8, 300.1, 433.5]]);

        let first = raw.clone().finish(&config).unwrap();
        let second = first.clone().into_activity().finish(&config).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_database_finish_keeps_order() {
        let mut short = activity(&[&[0.0, 100.0]]);
        short.sport = Sport::Biking;
        let db = Database::new(vec![activity(&[&[0.0, 100.0, 200.0, 300.0, 400.0]]), short]);

        let finished = db.finish(&AnalysisConfig::default()).unwrap();
        assert_eq!(finished.activities.len(), 2);
        assert_eq!(finished.activities[0].sport(), Sport::Running);
        assert_eq!(finished.activities[1].sport(), Sport::Biking);
        assert!(finished.activities[1].best(RaceDistance::Meters400).is_none());
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn test_parallel_matches_sequential() {
        let config = AnalysisConfig::default();
        let activities: Vec<Activity> = (1..=12)
            .map(|k| {
                let step = 40.0 + k as f64 * 7.3;
                let first: Vec<f64> = (0..15).map(|i| i as f64 * step).collect();
                let second: Vec<f64> = (15..40)
                    .map(|i| i as f64 * step + (i % 3) as f64)
                    .collect();
                activity(&[&first[..], &second[..]])
            })
            .collect();

        let sequential = activities
            .clone()
            .into_iter()
            .map(|a| a.finish(&config))
            .collect::<Result<Vec<_>>>()
            .unwrap();
        let parallel = Database::new(activities).finish(&config).unwrap();

        assert_eq!(parallel.activities, sequential);
    }
}
