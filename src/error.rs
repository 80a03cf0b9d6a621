//! Error type shared by every stage of the geotagging pipeline.

use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The track document is missing a required element or contains a malformed value.
    #[error("failed to parse track document: {0}")]
    Parse(String),

    #[error("unsupported GPX source {0:?}, choose \"strava\" or \"gpslogger\"")]
    UnsupportedDialect(String),

    /// The correction delta is not of the form `±DD:HH:MM:SS`.
    #[error("invalid correction {text:?}: {reason}")]
    Format { text: String, reason: String },

    #[error("the track contains no points, no image can be matched")]
    EmptyTrack,

    #[error("no timezone found for coordinates lat={latitude}, lon={longitude}")]
    TimezoneResolution { latitude: f64, longitude: f64 },

    /// The local time falls into a daylight-saving gap or overlap in the resolved zone.
    #[error("local time {time} is ambiguous or nonexistent in timezone {timezone}")]
    AmbiguousLocalTime { time: String, timezone: String },

    #[error("image {} has no capture time in its Exif data", .0.display())]
    MissingCaptureTime(PathBuf),

    #[error("image {} has an unreadable capture time {text:?}", .path.display())]
    InvalidCaptureTime { path: PathBuf, text: String },

    #[error("value {0} cannot be encoded as an Exif rational")]
    Encoding(f64),

    #[error("unable to parse image {}: {message}", .path.display())]
    Image { path: PathBuf, message: String },

    #[error("serialized Exif data is {0} bytes, which does not fit into a single APP1 segment")]
    ExifTooLarge(usize),

    #[error("there was an i/o error {0} at {}", .1.display())]
    Io(std::io::Error, Box<Path>),
}

impl Error {
    pub(crate) fn parse(msg: impl Into<String>) -> Self {
        Error::Parse(msg.into())
    }

    pub(crate) fn io(e: std::io::Error, path: impl AsRef<Path>) -> Self {
        Error::Io(e, path.as_ref().into())
    }

    /// Whether this error concerns a single image's capture time, which a run may be
    /// configured to skip instead of aborting.
    pub fn is_capture_time_error(&self) -> bool {
        matches!(
            self,
            Error::MissingCaptureTime(_) | Error::InvalidCaptureTime { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
