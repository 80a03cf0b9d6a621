//! Command-line configuration. Every option can also come from a `GEOTAG_*` environment variable.

use crate::{
    correction::CorrectionDelta,
    logging::LogLevel,
    matcher::DEFAULT_TOLERANCE_SECONDS,
    pipeline::MissingTimePolicy,
    time::{FixedTimezone, TimeCorrector, TzfResolver},
    track::Dialect,
};
use chrono_tz::Tz;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "geotag")]
#[command(about = "Write GPS positions from a GPX track into the Exif data of JPEG photos")]
#[command(version)]
pub struct Cli {
    /// Directory containing the JPEG images to tag
    #[arg(long, env = "GEOTAG_INPUT")]
    pub input_location: PathBuf,

    /// GPX track file
    #[arg(long, env = "GEOTAG_GPX")]
    pub gpx_location: PathBuf,

    /// Application that recorded the track: strava or gpslogger
    #[arg(long, env = "GEOTAG_GPX_SOURCE", default_value = "strava")]
    pub gpx_source: Dialect,

    /// Offset added to every camera capture time, as ±DD:HH:MM:SS
    #[arg(
        long,
        env = "GEOTAG_CORRECTION",
        default_value = "+00:00:00:00",
        allow_hyphen_values = true
    )]
    pub correction: CorrectionDelta,

    /// Largest accepted time difference between a photo and a track point, in seconds
    #[arg(
        long,
        env = "GEOTAG_TOLERANCE",
        default_value_t = DEFAULT_TOLERANCE_SECONDS,
        value_parser = parse_tolerance
    )]
    pub tolerance: f64,

    /// IANA timezone the camera clock was set to, instead of looking it up from the track
    #[arg(long, env = "GEOTAG_TIMEZONE", value_parser = parse_timezone)]
    pub timezone: Option<Tz>,

    /// What to do with images that have no readable capture time
    #[arg(long, value_enum, default_value_t = MissingTimePolicy::Abort)]
    pub on_missing_time: MissingTimePolicy,

    /// Report what would be written without modifying any image
    #[arg(long)]
    pub dry_run: bool,

    /// Log level used when RUST_LOG is not set
    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,
}

fn parse_tolerance(s: &str) -> Result<f64, String> {
    let seconds: f64 = s.parse().map_err(|e| format!("{}", e))?;
    if seconds.is_finite() && seconds > 0. {
        Ok(seconds)
    } else {
        Err("tolerance must be a positive number of seconds".to_string())
    }
}

fn parse_timezone(s: &str) -> Result<Tz, String> {
    s.parse::<Tz>().map_err(|e| e.to_string())
}

/// Resolved settings for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub input_location: PathBuf,
    pub gpx_location: PathBuf,
    pub gpx_source: Dialect,
    pub correction: CorrectionDelta,
    pub tolerance_seconds: f64,
    pub timezone: Option<Tz>,
    pub on_missing_time: MissingTimePolicy,
    pub dry_run: bool,
    pub log_level: LogLevel,
}

impl From<Cli> for Settings {
    fn from(cli: Cli) -> Self {
        Settings {
            input_location: cli.input_location,
            gpx_location: cli.gpx_location,
            gpx_source: cli.gpx_source,
            correction: cli.correction,
            tolerance_seconds: cli.tolerance,
            timezone: cli.timezone,
            on_missing_time: cli.on_missing_time,
            dry_run: cli.dry_run,
            log_level: cli.log_level,
        }
    }
}

impl Settings {
    /// Parse the process arguments and environment, exiting with a usage message on error.
    pub fn from_args() -> Self {
        Cli::parse().into()
    }

    /// A corrector using the configured zone, or the offline lookup when none is configured.
    pub fn time_corrector(&self) -> TimeCorrector {
        match self.timezone {
            Some(zone) => TimeCorrector::new(FixedTimezone(zone)),
            None => TimeCorrector::new(TzfResolver::new()),
        }
    }
}

#[cfg(test)]
mod test {
    use super::{Cli, Settings};
    use crate::{
        correction::CorrectionDelta, logging::LogLevel, pipeline::MissingTimePolicy,
        track::Dialect,
    };
    use clap::Parser;
    use std::path::PathBuf;

    fn parse(args: &[&str]) -> Result<Settings, clap::Error> {
        let mut argv = vec!["geotag", "--input-location", "photos", "--gpx-location", "ride.gpx"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).map(Settings::from)
    }

    #[test]
    fn test_defaults() {
        let settings = parse(&[]).unwrap();
        assert_eq!(settings.input_location, PathBuf::from("photos"));
        assert_eq!(settings.gpx_location, PathBuf::from("ride.gpx"));
        assert_eq!(settings.gpx_source, Dialect::Strava);
        assert!(settings.correction.is_zero());
        assert_eq!(settings.tolerance_seconds, 300.);
        assert_eq!(settings.timezone, None);
        assert_eq!(settings.on_missing_time, MissingTimePolicy::Abort);
        assert!(!settings.dry_run);
        assert_eq!(settings.log_level, LogLevel::Info);
    }

    #[test]
    fn test_all_options() {
        let settings = parse(&[
            "--gpx-source",
            "GPSLogger",
            "--correction",
            "-00:01:30:00",
            "--tolerance",
            "60",
            "--timezone",
            "Europe/Amsterdam",
            "--on-missing-time",
            "skip",
            "--dry-run",
            "--log-level",
            "debug",
        ])
        .unwrap();

        assert_eq!(settings.gpx_source, Dialect::GpsLogger);
        assert_eq!(
            settings.correction,
            CorrectionDelta::parse("-00:01:30:00").unwrap()
        );
        assert_eq!(settings.tolerance_seconds, 60.);
        assert_eq!(settings.timezone, Some(chrono_tz::Europe::Amsterdam));
        assert_eq!(settings.on_missing_time, MissingTimePolicy::Skip);
        assert!(settings.dry_run);
        assert_eq!(settings.log_level, LogLevel::Debug);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(parse(&["--gpx-source", "garmin"]).is_err());
        assert!(parse(&["--correction", "00:01:00:00"]).is_err());
        assert!(parse(&["--tolerance", "0"]).is_err());
        assert!(parse(&["--tolerance", "soon"]).is_err());
        assert!(parse(&["--timezone", "Mars/Olympus_Mons"]).is_err());
        assert!(Cli::try_parse_from(["geotag", "--gpx-location", "ride.gpx"]).is_err());
    }
}
