//! Capture time correction: shift by the correction delta, interpret as local time in the track's
//! timezone, convert to UTC.

use crate::{correction::CorrectionDelta, track::Track, Error, Result};
use chrono::{LocalResult, NaiveDateTime, TimeZone};
use chrono_tz::Tz;
use once_cell::unsync::OnceCell;
use tracing::info;

/// Exif `DateTime` layout.
const CAPTURE_TIME_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

/// Looks up the timezone for a coordinate.
pub trait TimezoneResolver {
    fn resolve(&self, latitude: f64, longitude: f64) -> Option<Tz>;
}

/// Offline coordinate-to-timezone lookup backed by `tzf-rs`.
pub struct TzfResolver {
    finder: tzf_rs::DefaultFinder,
}

impl TzfResolver {
    pub fn new() -> Self {
        TzfResolver {
            finder: tzf_rs::DefaultFinder::new(),
        }
    }
}

impl Default for TzfResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl TimezoneResolver for TzfResolver {
    fn resolve(&self, latitude: f64, longitude: f64) -> Option<Tz> {
        let name = self.finder.get_tz_name(longitude, latitude);
        if name.is_empty() {
            return None;
        }
        name.parse().ok()
    }
}

/// A zone chosen by the user; the coordinates are ignored.
#[derive(Debug, Clone, Copy)]
pub struct FixedTimezone(pub Tz);

impl TimezoneResolver for FixedTimezone {
    fn resolve(&self, _latitude: f64, _longitude: f64) -> Option<Tz> {
        Some(self.0)
    }
}

/// Converts camera capture times to UTC.
///
/// All photos are assumed to be taken in a single timezone. It is resolved from the earliest
/// point of the track the first time it's needed and reused for the rest of the run.
pub struct TimeCorrector {
    resolver: Box<dyn TimezoneResolver>,
    zone: OnceCell<Tz>,
}

impl TimeCorrector {
    pub fn new(resolver: impl TimezoneResolver + 'static) -> Self {
        TimeCorrector {
            resolver: Box::new(resolver),
            zone: OnceCell::new(),
        }
    }

    /// The run's timezone, resolved on first use.
    pub fn timezone(&self, track: &Track) -> Result<Tz> {
        self.zone
            .get_or_try_init(|| {
                let point = track.first().ok_or(Error::EmptyTrack)?;
                let zone = self
                    .resolver
                    .resolve(point.latitude, point.longitude)
                    .ok_or(Error::TimezoneResolution {
                        latitude: point.latitude,
                        longitude: point.longitude,
                    })?;
                info!(
                    "timezone {} resolved from the track point at {}",
                    zone.name(),
                    point.timestamp
                );
                Ok(zone)
            })
            .map(|zone| *zone)
    }

    /// Apply `delta` to a raw capture time and return the corresponding UTC instant.
    pub fn correct(
        &self,
        raw_capture_time: NaiveDateTime,
        delta: &CorrectionDelta,
        track: &Track,
    ) -> Result<NaiveDateTime> {
        let local = delta.apply(raw_capture_time)?;
        self.to_utc(local, track)
    }

    /// Interpret an already corrected capture time as wall-clock time in the run's timezone.
    pub fn to_utc(&self, local: NaiveDateTime, track: &Track) -> Result<NaiveDateTime> {
        localize_to_utc(local, self.timezone(track)?)
    }
}

/// Convert a local wall-clock time in `zone` to naive UTC. Times inside a daylight-saving gap or
/// overlap are rejected rather than guessed.
pub fn localize_to_utc(local: NaiveDateTime, zone: Tz) -> Result<NaiveDateTime> {
    match zone.from_local_datetime(&local) {
        LocalResult::Single(dt) => Ok(dt.naive_utc()),
        LocalResult::Ambiguous(..) | LocalResult::None => Err(Error::AmbiguousLocalTime {
            time: local.to_string(),
            timezone: zone.name().to_string(),
        }),
    }
}

/// Parse an Exif `YYYY:MM:DD HH:MM:SS` capture time.
pub fn parse_capture_time(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim_matches(|c: char| c == '\0' || c.is_whitespace());
    NaiveDateTime::parse_from_str(text, CAPTURE_TIME_FORMAT).ok()
}

pub fn format_capture_time(time: NaiveDateTime) -> String {
    time.format(CAPTURE_TIME_FORMAT).to_string()
}
