//! GPS tracks: the timestamped positions a photo's capture time is matched against.

mod gpx;

pub use gpx::{load, load_file};

use crate::Error;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt, str::FromStr};

/// The GPX flavours we know how to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// Strava exports: the `<time>` of each point is trusted as-is.
    Strava,
    /// GPSLogger exports: the document `<name>` holds the phone's clock time at the start of the
    /// log, and every point is shifted so that the first point lands exactly on it.
    GpsLogger,
}

impl FromStr for Dialect {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strava" => Ok(Dialect::Strava),
            "gpslogger" => Ok(Dialect::GpsLogger),
            _ => Err(Error::UnsupportedDialect(s.to_string())),
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Dialect::Strava => write!(f, "strava"),
            Dialect::GpsLogger => write!(f, "gpslogger"),
        }
    }
}

/// A single position record from the track log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackPoint {
    /// Instant of the fix, UTC semantics, after any device clock compensation.
    pub timestamp: NaiveDateTime,
    pub latitude: f64,
    pub longitude: f64,
    /// Elevation in metres; negative below the reference level.
    pub altitude: f64,
    /// Speed in metres per second, if the logger recorded it.
    pub speed: Option<f64>,
    pub satellites: Option<String>,
    /// The `<time>` text exactly as it appeared in the document.
    pub raw_time_text: String,
}

impl TrackPoint {
    /// UTC time of the fix as logged by the receiver. Unlike `timestamp` this is never shifted
    /// onto the device clock.
    pub fn fix_time(&self) -> NaiveDateTime {
        gpx::parse_gpx_time(&self.raw_time_text).unwrap_or(self.timestamp)
    }
}

/// All points of a track, keyed and ordered by timestamp.
///
/// Two records with the same timestamp can't coexist: the one inserted last wins.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Track {
    points: BTreeMap<NaiveDateTime, TrackPoint>,
}

impl Track {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a point, returning the point it replaced if one already had the same timestamp.
    pub fn insert(&mut self, point: TrackPoint) -> Option<TrackPoint> {
        self.points.insert(point.timestamp, point)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn get(&self, timestamp: &NaiveDateTime) -> Option<&TrackPoint> {
        self.points.get(timestamp)
    }

    /// Iterate over the points in ascending timestamp order.
    pub fn iter(&self) -> impl Iterator<Item = &TrackPoint> {
        self.points.values()
    }

    /// The point with the smallest timestamp.
    pub fn first(&self) -> Option<&TrackPoint> {
        self.points.values().next()
    }

    /// The point with the largest timestamp.
    pub fn last(&self) -> Option<&TrackPoint> {
        self.points.values().next_back()
    }
}

impl FromIterator<TrackPoint> for Track {
    fn from_iter<T: IntoIterator<Item = TrackPoint>>(iter: T) -> Self {
        let mut track = Track::new();
        for point in iter {
            track.insert(point);
        }
        track
    }
}

#[cfg(test)]
pub(crate) fn point_at(timestamp: NaiveDateTime, latitude: f64, longitude: f64) -> TrackPoint {
    TrackPoint {
        timestamp,
        latitude,
        longitude,
        altitude: 0.,
        speed: None,
        satellites: None,
        raw_time_text: timestamp.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
    }
}
