//! Nearest-in-time lookup of a capture time against the track.

use crate::{
    track::{Track, TrackPoint},
    Error, Result,
};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Default maximum time difference, in seconds, for a match to be accepted.
pub const DEFAULT_TOLERANCE_SECONDS: f64 = 300.;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub matched_timestamp: NaiveDateTime,
    /// Absolute difference between the capture time and the matched point.
    pub time_difference_seconds: f64,
}

impl MatchResult {
    /// A match is accepted only when strictly closer than the tolerance.
    pub fn is_within(&self, tolerance_seconds: f64) -> bool {
        self.time_difference_seconds < tolerance_seconds
    }
}

/// Find the track point closest in time to `instant`.
///
/// Every point is visited in ascending timestamp order and only a strictly smaller difference
/// replaces the current best, so on a tie the earlier point wins.
pub fn nearest(track: &Track, instant: NaiveDateTime) -> Result<MatchResult> {
    nearest_point(track, instant).map(|(_, m)| m)
}

/// Like [`nearest`], also returning the matched point itself.
pub fn nearest_point(track: &Track, instant: NaiveDateTime) -> Result<(&TrackPoint, MatchResult)> {
    let mut best: Option<(&TrackPoint, MatchResult)> = None;

    for point in track.iter() {
        let difference = seconds_between(point.timestamp, instant);
        if best.map_or(true, |(_, b)| difference < b.time_difference_seconds) {
            best = Some((
                point,
                MatchResult {
                    matched_timestamp: point.timestamp,
                    time_difference_seconds: difference,
                },
            ));
        }
    }

    best.ok_or(Error::EmptyTrack)
}

fn seconds_between(a: NaiveDateTime, b: NaiveDateTime) -> f64 {
    let d = if a >= b { a - b } else { b - a };
    let nanos = d.num_nanoseconds().unwrap_or(i64::MAX);
    nanos as f64 / 1e9
}
