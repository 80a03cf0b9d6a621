//! GPX parsing for Strava and GPSLogger exports.

use super::{Dialect, Track, TrackPoint};
use crate::{Error, Result};
use chrono::{DateTime, Duration, NaiveDateTime};
use std::path::Path;
use tracing::{debug, info};

/// Read and parse a GPX file.
pub fn load_file(path: impl AsRef<Path>, dialect: Dialect) -> Result<Track> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| Error::io(e, path))?;
    let track = load(&content, dialect)?;
    info!("{} points loaded from {}", track.len(), path.display());
    Ok(track)
}

/// Parse a GPX document into a track.
///
/// Every `<trkpt>` needs `lat`/`lon` attributes and `<ele>`/`<time>` children:
/// ```xml
/// <trkpt lat="52.04561" lon="4.45885">
///   <ele>10.0</ele>
///   <time>2021-06-01T12:00:00Z</time>
///   <speed>1.2</speed>
///   <sat>7</sat>
/// </trkpt>
/// ```
/// `<speed>` and `<sat>` are only read for [`Dialect::GpsLogger`].
pub fn load(document: &str, dialect: Dialect) -> Result<Track> {
    let doc = roxmltree::Document::parse(document)
        .map_err(|e| Error::parse(format!("XML parse error: {}", e)))?;

    let device_time = match dialect {
        Dialect::GpsLogger => Some(parse_device_time(&doc)?),
        Dialect::Strava => None,
    };

    let mut track = Track::new();
    let mut offset: Option<Duration> = None;

    for (index, node) in doc
        .descendants()
        .filter(|n| n.is_element() && n.tag_name().name() == "trkpt")
        .enumerate()
    {
        let mut point = parse_trackpoint(node, index, dialect)?;

        // The logger's clock may differ from the phone's; the difference is measured on the first
        // point and removed from all of them.
        if let Some(device_time) = device_time {
            let offset = *offset.get_or_insert_with(|| point.timestamp - device_time);
            point.timestamp -= offset;
        }

        debug!(
            "lat={}, lon={}, alt={}, datetime={}, speed={:?}, sat={:?}",
            point.latitude,
            point.longitude,
            point.altitude,
            point.timestamp,
            point.speed,
            point.satellites
        );

        if let Some(previous) = track.insert(point) {
            debug!(
                "point #{} replaces an earlier point with the same timestamp {}",
                index, previous.timestamp
            );
        }
    }

    if let Some(offset) = offset.filter(|o| !o.is_zero()) {
        info!(
            "compensated a {}s difference between the logger and the device clock",
            offset.num_seconds()
        );
    }

    Ok(track)
}

/// Extract the device clock time from the GPSLogger `<name>` header, whose last word has the
/// form `YYYYMMDD-HHMMSS`.
fn parse_device_time(doc: &roxmltree::Document) -> Result<NaiveDateTime> {
    let name = doc
        .descendants()
        .find(|n| n.is_element() && n.tag_name().name() == "name")
        .and_then(|n| n.text())
        .ok_or_else(|| Error::parse("GPSLogger document has no <name> header"))?;

    let token = name
        .split_whitespace()
        .last()
        .ok_or_else(|| Error::parse("GPSLogger <name> header is empty"))?;

    NaiveDateTime::parse_from_str(token, "%Y%m%d-%H%M%S").map_err(|e| {
        Error::parse(format!(
            "GPSLogger <name> header {:?} is not a YYYYMMDD-HHMMSS timestamp: {}",
            name, e
        ))
    })
}

fn parse_trackpoint(node: roxmltree::Node, index: usize, dialect: Dialect) -> Result<TrackPoint> {
    let coordinate = |attr: &str, max: f64| -> Result<f64> {
        let text = node
            .attribute(attr)
            .ok_or_else(|| Error::parse(format!("trkpt #{} has no {} attribute", index, attr)))?;
        let value: f64 = text.trim().parse().map_err(|_| {
            Error::parse(format!("trkpt #{} has an invalid {} {:?}", index, attr, text))
        })?;
        if !(-max..=max).contains(&value) {
            return Err(Error::parse(format!(
                "trkpt #{} has {} {} outside of [-{}, {}]",
                index, attr, value, max, max
            )));
        }
        Ok(value)
    };

    let latitude = coordinate("lat", 90.)?;
    let longitude = coordinate("lon", 180.)?;

    let ele = child_text(node, "ele")
        .ok_or_else(|| Error::parse(format!("trkpt #{} has no <ele>", index)))?;
    let altitude = parse_number(ele, "ele", index)?;

    let raw_time_text = child_text(node, "time")
        .ok_or_else(|| Error::parse(format!("trkpt #{} has no <time>", index)))?
        .to_string();
    let timestamp = parse_gpx_time(&raw_time_text).ok_or_else(|| {
        Error::parse(format!(
            "trkpt #{} has an invalid <time> {:?}",
            index, raw_time_text
        ))
    })?;

    let (speed, satellites) = match dialect {
        Dialect::Strava => (None, None),
        Dialect::GpsLogger => {
            let speed = child_text(node, "speed")
                .map(|s| parse_number(s, "speed", index))
                .transpose()?;
            let satellites = child_text(node, "sat").map(str::to_string);
            (speed, satellites)
        }
    };

    Ok(TrackPoint {
        timestamp,
        latitude,
        longitude,
        altitude,
        speed,
        satellites,
        raw_time_text,
    })
}

/// Trimmed text of the first child element with the given local name.
fn child_text<'a>(node: roxmltree::Node<'a, '_>, name: &str) -> Option<&'a str> {
    node.children()
        .find(|n| n.is_element() && n.tag_name().name() == name)
        .and_then(|n| n.text())
        .map(str::trim)
}

/// Parse a finite number; `NaN` and `inf` are rejected here rather than when the point is encoded.
fn parse_number(text: &str, element: &str, index: usize) -> Result<f64> {
    text.parse::<f64>()
        .ok()
        .filter(|x| x.is_finite())
        .ok_or_else(|| {
            Error::parse(format!(
                "trkpt #{} has an invalid <{}> {:?}",
                index, element, text
            ))
        })
}

/// Parse a GPX `<time>` into a naive UTC timestamp. Times without an offset are taken to be UTC.
pub(crate) fn parse_gpx_time(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.naive_utc())
        .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f"))
        .ok()
}
