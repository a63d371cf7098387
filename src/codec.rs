//! Persistence for finished activities.
//!
//! MessagePack (via `rmp-serde`, with field names) is the on-disk format;
//! JSON is offered for inspection and interchange. Both round-trip every
//! field of the hierarchy, derived velocities and best spans included.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Result;
use crate::finish::FinishedActivity;

/// File extension used for persisted activities.
pub const ACTIVITY_EXTENSION: &str = "msgpack";

pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    Ok(rmp_serde::to_vec_named(value)?)
}

pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    Ok(rmp_serde::from_slice(bytes)?)
}

pub fn to_json<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

pub fn from_json<T: DeserializeOwned>(json: &str) -> Result<T> {
    Ok(serde_json::from_str(json)?)
}

/// File name for an activity: its id with `:` replaced so it is portable.
pub fn activity_file_name(activity: &FinishedActivity) -> String {
    format!(
        "{}.{}",
        activity.id().format("%Y-%m-%dT%H_%M_%SZ"),
        ACTIVITY_EXTENSION
    )
}

pub fn write_file(path: &Path, activity: &FinishedActivity) -> Result<()> {
    let bytes = encode(activity)?;
    fs::write(path, &bytes)?;
    debug!("[Codec] Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}

pub fn read_file(path: &Path) -> Result<FinishedActivity> {
    let bytes = fs::read(path)?;
    decode(&bytes)
}

/// Load every persisted activity in a directory, sorted by file name.
///
/// Files that fail to decode are logged and skipped so one bad file does not
/// hide the rest of the batch.
pub fn load_dir(dir: &Path) -> Result<Vec<(PathBuf, FinishedActivity)>> {
    let mut paths: Vec<PathBuf> = fs::read_dir(dir)?
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == ACTIVITY_EXTENSION))
        .collect();
    paths.sort();

    let mut activities = Vec::with_capacity(paths.len());
    for path in paths {
        match read_file(&path) {
            Ok(activity) => activities.push((path, activity)),
            Err(e) => warn!("[Codec] Skipping {}: {}", path.display(), e),
        }
    }

    debug!(
        "[Codec] Loaded {} activities from {}",
        activities.len(),
        dir.display()
    );
    Ok(activities)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::finish::AnalysisConfig;
    use crate::types::{Activity, GpsPoint, Lap, Sample, Sport, Track, TriggerMethod};
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2019, 5, 28, 11, 45, 53).unwrap()
    }

    fn finished() -> FinishedActivity {
        let samples = (0..6)
            .map(|i| {
                let time = start() + Duration::milliseconds(i * 9_750);
                let mut s = Sample::new(i as f64 * 83.3, time);
                s.position = Some(GpsPoint::new(51.5 + i as f64 * 1e-4, -0.12));
                s.heart_rate_bpm = Some(140 + i as u16);
                s.sensor_present = true;
                s
            })
            .collect();
        let mut lap = Lap::new(start(), vec![Track::new(samples)]);
        lap.trigger_method = TriggerMethod::HeartRate;
        lap.notes = "intervals".to_string();
        Activity::new(Sport::Running, start(), vec![lap])
            .finish(&AnalysisConfig::default())
            .unwrap()
    }

    #[test]
    fn test_msgpack_roundtrip() {
        let activity = finished();
        let decoded: FinishedActivity = decode(&encode(&activity).unwrap()).unwrap();

        assert_eq!(decoded, activity);
        assert!(decoded.samples()[2].velocity() > 0.0);
        assert_eq!(
            decoded.best_spans().seconds(crate::RaceDistance::Meters400),
            activity.best_spans().seconds(crate::RaceDistance::Meters400)
        );
    }

    #[test]
    fn test_json_roundtrip() {
        let activity = finished();
        let json = to_json(&activity).unwrap();
        assert!(json.contains("HeartRate"));

        let decoded: FinishedActivity = from_json(&json).unwrap();
        assert_eq!(decoded, activity);
    }

    #[test]
    fn test_decode_garbage() {
        assert!(decode::<FinishedActivity>(&[0xc1, 0x00]).is_err());
    }

    #[test]
    fn test_file_name() {
        assert_eq!(
            activity_file_name(&finished()),
            "2019-05-28T11_45_53Z.msgpack"
        );
    }
}
