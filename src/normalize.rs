//! Parser-facing records and their conversion into the typed hierarchy.
//!
//! A parser for any source format fills these loosely-typed records (or emits
//! the equivalent camelCase JSON). Conversion checks required fields and maps
//! enum names exhaustively; nothing here re-validates ordering.

use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{BestEffortError, OptionExt, Result};
use crate::types::{
    Activity, Database, GpsPoint, Intensity, Lap, Sample, Sport, Track, TriggerMethod,
};

/// One reading as delivered by a parser.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SampleRecord {
    pub distance_meters: Option<f64>,
    pub time: Option<DateTime<Utc>>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub altitude_meters: Option<f64>,
    pub heartrate_bpm: Option<u16>,
    pub cadence: Option<u8>,
    pub sensor_present: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TrackRecord {
    pub samples: Vec<SampleRecord>,
}

/// Lap summary and tracks as delivered by a parser.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LapRecord {
    pub start_time: Option<DateTime<Utc>>,
    pub total_time_seconds: f64,
    pub distance_meters: f64,
    pub maximum_speed: f64,
    pub calories: u32,
    #[serde(alias = "averageHeartRateBPM")]
    pub average_heart_rate_bpm: u16,
    #[serde(alias = "maximumHeartRateBPM")]
    pub maximum_heart_rate_bpm: u16,
    pub intensity: Option<String>,
    pub cadence: u8,
    pub trigger_method: Option<String>,
    pub notes: String,
    pub tracks: Vec<TrackRecord>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ActivityRecord {
    pub sport: String,
    pub id: Option<DateTime<Utc>>,
    pub laps: Vec<LapRecord>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DatabaseRecord {
    pub activities: Vec<ActivityRecord>,
}

/// Convert one sample record. `index` is its position in the flattened
/// activity and only feeds error reports.
pub fn normalize_sample(record: SampleRecord, index: usize) -> Result<Sample> {
    let distance_meters = record
        .distance_meters
        .ok_or_malformed("distance_meters", index)?;
    let time = record.time.ok_or_malformed("time", index)?;

    let position = match (record.latitude, record.longitude) {
        (Some(lat), Some(lng)) => Some(GpsPoint::new(lat, lng)),
        (None, None) => None,
        (Some(_), None) => {
            return Err(BestEffortError::MalformedSample {
                field: "longitude",
                index,
            })
        }
        (None, Some(_)) => {
            return Err(BestEffortError::MalformedSample {
                field: "latitude",
                index,
            })
        }
    };

    let mut sample = Sample::new(distance_meters, time);
    sample.position = position;
    sample.altitude_meters = record.altitude_meters.unwrap_or_default();
    sample.heart_rate_bpm = record.heartrate_bpm;
    sample.cadence = record.cadence;
    sample.sensor_present = record.sensor_present.unwrap_or(false);
    Ok(sample)
}

/// Convert a lap record. `first_sample` is the flattened index of its first
/// sample; `lap_index` reports a missing start time.
fn normalize_lap(record: LapRecord, lap_index: usize, first_sample: usize) -> Result<Lap> {
    let start_time = record
        .start_time
        .ok_or(BestEffortError::MalformedLap {
            field: "start_time",
            index: lap_index,
        })?;
    let trigger_method: TriggerMethod = match record.trigger_method {
        Some(name) => name.parse()?,
        None => Default::default(),
    };
    let intensity: Intensity = match record.intensity {
        Some(name) => name.parse()?,
        None => Default::default(),
    };

    let mut index = first_sample;
    let mut tracks = Vec::with_capacity(record.tracks.len());
    for track in record.tracks {
        let mut samples = Vec::with_capacity(track.samples.len());
        for sample in track.samples {
            samples.push(normalize_sample(sample, index)?);
            index += 1;
        }
        tracks.push(Track::new(samples));
    }

    Ok(Lap {
        start_time,
        total_time_seconds: record.total_time_seconds,
        distance_meters: record.distance_meters,
        maximum_speed: record.maximum_speed,
        calories: record.calories,
        average_heart_rate_bpm: record.average_heart_rate_bpm,
        maximum_heart_rate_bpm: record.maximum_heart_rate_bpm,
        intensity,
        cadence: record.cadence,
        trigger_method,
        notes: record.notes,
        tracks,
    })
}

/// Convert an activity record into a raw [`Activity`].
pub fn normalize_activity(record: ActivityRecord) -> Result<Activity> {
    let sport: Sport = record.sport.parse()?;
    let id = record
        .id
        .ok_or(BestEffortError::MalformedActivity { field: "id" })?;

    let mut first_sample = 0;
    let mut laps = Vec::with_capacity(record.laps.len());
    for (lap_index, lap) in record.laps.into_iter().enumerate() {
        let lap = normalize_lap(lap, lap_index, first_sample)?;
        first_sample += lap.sample_count();
        laps.push(lap);
    }

    debug!(
        "[Normalize] Activity {} ({}): {} laps, {} samples",
        id,
        sport,
        laps.len(),
        first_sample
    );

    Ok(Activity::new(sport, id, laps))
}

pub fn normalize_database(record: DatabaseRecord) -> Result<Database> {
    let activities = record
        .activities
        .into_iter()
        .map(normalize_activity)
        .collect::<Result<Vec<_>>>()?;
    Ok(Database::new(activities))
}

/// Parse a camelCase JSON database record and normalize it.
pub fn database_from_json(json: &str) -> Result<Database> {
    let record: DatabaseRecord = serde_json::from_str(json)?;
    normalize_database(record)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ACTIVITY_JSON: &str = r#"{
        "activities": [{
            "sport": "Running",
            "id": "2019-05-28T11:45:53Z",
            "laps": [{
                "startTime": "2019-05-28T11:45:53Z",
                "totalTimeSeconds": 20.0,
                "distanceMeters": 200.0,
                "maximumSpeed": 10.0,
                "calories": 12,
                "averageHeartRateBPM": 150,
                "maximumHeartRateBPM": 160,
                "intensity": "Active",
                "cadence": 88,
                "triggerMethod": "Distance",
                "notes": "warmup",
                "tracks": [{
                    "samples": [
                        {"distanceMeters": 0.0, "time": "2019-05-28T11:45:53Z",
                         "latitude": 51.5, "longitude": -0.12, "altitudeMeters": 12.5,
                         "heartrateBpm": 140, "cadence": 86, "sensorPresent": true},
                        {"distanceMeters": 100.0, "time": "2019-05-28T11:46:03Z"},
                        {"distanceMeters": 200.0, "time": "2019-05-28T11:46:13Z"}
                    ]
                }]
            }]
        }]
    }"#;

    #[test]
    fn test_database_from_json() {
        let db = database_from_json(ACTIVITY_JSON).unwrap();
        assert_eq!(db.activities.len(), 1);

        let activity = &db.activities[0];
        assert_eq!(activity.sport, Sport::Running);
        assert_eq!(activity.sample_count(), 3);

        let lap = &activity.laps[0];
        assert_eq!(lap.trigger_method, TriggerMethod::Distance);
        assert_eq!(lap.intensity, Intensity::Active);
        assert_eq!(lap.average_heart_rate_bpm, 150);
        assert_eq!(lap.notes, "warmup");

        let first = &lap.tracks[0].samples[0];
        assert_eq!(first.position, Some(GpsPoint::new(51.5, -0.12)));
        assert_eq!(first.altitude_meters, 12.5);
        assert_eq!(first.heart_rate_bpm, Some(140));
        assert!(first.sensor_present);

        let second = &lap.tracks[0].samples[1];
        assert!(second.position.is_none());
        assert!(!second.sensor_present);
        assert_eq!(second.velocity(), 0.0);
    }

    #[test]
    fn test_missing_distance_is_malformed() {
        let json = ACTIVITY_JSON.replace(r#""distanceMeters": 100.0, "#, "");
        assert!(matches!(
            database_from_json(&json),
            Err(BestEffortError::MalformedSample {
                field: "distance_meters",
                index: 1
            })
        ));
    }

    #[test]
    fn test_half_position_is_malformed() {
        let record = SampleRecord {
            distance_meters: Some(0.0),
            time: Some(Utc::now()),
            latitude: Some(51.5),
            ..Default::default()
        };
        assert!(matches!(
            normalize_sample(record, 4),
            Err(BestEffortError::MalformedSample {
                field: "longitude",
                index: 4
            })
        ));
    }

    #[test]
    fn test_unknown_trigger_method() {
        let json = ACTIVITY_JSON.replace("\"Distance\"", "\"Lap\"");
        assert!(matches!(
            database_from_json(&json),
            Err(BestEffortError::UnknownTriggerMethod(name)) if name == "Lap"
        ));
    }

    #[test]
    fn test_unknown_sport() {
        let json = ACTIVITY_JSON.replace("\"Running\"", "\"Swimming\"");
        assert!(matches!(
            database_from_json(&json),
            Err(BestEffortError::UnknownSport(_))
        ));
    }

    #[test]
    fn test_sample_index_spans_laps() {
        let sample = |d: Option<f64>| SampleRecord {
            distance_meters: d,
            time: Some(Utc::now()),
            ..Default::default()
        };
        let lap = |samples: Vec<SampleRecord>| LapRecord {
            start_time: Some(Utc::now()),
            tracks: vec![TrackRecord { samples }],
            ..Default::default()
        };
        let record = ActivityRecord {
            sport: "Running".to_string(),
            id: Some(Utc::now()),
            laps: vec![
                lap(vec![sample(Some(0.0)), sample(Some(1.0))]),
                lap(vec![sample(Some(2.0)), sample(None)]),
            ],
        };

        assert!(matches!(
            normalize_activity(record),
            Err(BestEffortError::MalformedSample { index: 3, .. })
        ));
    }

    #[test]
    fn test_missing_lap_and_activity_fields() {
        let json = ACTIVITY_JSON.replace(r#""startTime": "2019-05-28T11:45:53Z","#, "");
        assert!(matches!(
            database_from_json(&json),
            Err(BestEffortError::MalformedLap {
                field: "start_time",
                index: 0
            })
        ));

        let json = ACTIVITY_JSON.replace(r#""id": "2019-05-28T11:45:53Z","#, "");
        assert!(matches!(
            database_from_json(&json),
            Err(BestEffortError::MalformedActivity { field: "id" })
        ));
    }
}
