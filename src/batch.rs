//! Best-of-batch comparison across finished activities.
//!
//! Activities are compared in the order given. An activity only replaces the
//! current best when it is strictly faster, so ties go to the earlier one.

use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};

use crate::best_span::{BestSpan, RaceDistance};
use crate::finish::FinishedActivity;
use crate::types::Sport;

/// The best span of one activity in a batch, with where it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchBest {
    /// Caller-supplied label, typically the file the activity was loaded from
    pub source: String,
    pub activity_id: DateTime<Utc>,
    pub span: BestSpan,
}

/// Every new best in batch order: the last entry is the batch best.
///
/// Activities whose sport differs from `sport` (when given) or that never
/// covered `distance` are skipped.
pub fn best_progression<'a, I>(
    activities: I,
    sport: Option<Sport>,
    distance: RaceDistance,
) -> Vec<BatchBest>
where
    I: IntoIterator<Item = (&'a str, &'a FinishedActivity)>,
{
    let mut progression: Vec<BatchBest> = Vec::new();
    let mut analyzed = 0;

    for (source, activity) in activities {
        if sport.is_some_and(|s| s != activity.sport()) {
            continue;
        }
        analyzed += 1;

        let Some(span) = activity.best(distance) else {
            continue;
        };
        let improves = progression
            .last()
            .map_or(true, |best| span.seconds < best.span.seconds);
        if improves {
            progression.push(BatchBest {
                source: source.to_string(),
                activity_id: activity.id(),
                span: span.clone(),
            });
        }
    }

    info!(
        "[Batch] {} activities analyzed for {}, {} new bests",
        analyzed,
        distance,
        progression.len()
    );
    progression
}

/// Fastest activity in the batch for `distance`.
pub fn best_of_batch<'a, I>(
    activities: I,
    sport: Option<Sport>,
    distance: RaceDistance,
) -> Option<BatchBest>
where
    I: IntoIterator<Item = (&'a str, &'a FinishedActivity)>,
{
    best_progression(activities, sport, distance).pop()
}
