//! WebAssembly bindings for the `libgeotag` crate.

use crate::{
    correction::CorrectionDelta,
    exif::{self, gps, IFDDataContents, IFDDataFormat, IFDTag, TIFFByteAlignment},
    parse,
    pipeline::{ImageOutcome, JpegStore, Pipeline},
    time::{FixedTimezone, TimeCorrector, TzfResolver},
    track::{self, Dialect},
    JPEGFile,
};
use chrono_tz::Tz;
use serde::Serialize;
use std::{convert::TryFrom, path::Path};
use wasm_bindgen::prelude::*;

fn js_error(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    JsValue::from_serde(value).map_err(|_| JsValue::from_str("Unable to convert result to JSON!"))
}

fn parse_image(i: &[u8]) -> Result<JPEGFile, JsValue> {
    match JPEGFile::parse(i) {
        Ok((_, img)) => Ok(img),
        Err(e) => {
            let msg = format!(
                "Unable to parse image: Error: {}",
                parse::pretty_error_message(i, e)
            );
            Err(JsValue::from_str(&msg))
        }
    }
}

/// Perform some preprocessing on the IFD entries extracted by the Exif parser so that they're
/// easier to display in the browser.
fn preprocess_ifd_entries(entries: &mut [exif::IFDEntry]) {
    for e in entries.iter_mut() {
        match (e.data_format, e.tagtype()) {
            // Convert GPS coordinates to a single floating point value
            (_, IFDTag::GPSLatitude) | (_, IFDTag::GPSLongitude) => {
                let coords: Result<Vec<_>, _> = e.content.iter().map(f64::try_from).collect();
                if let Ok(coords) = coords {
                    if coords.len() != 3 {
                        continue;
                    }
                    let loc = gps::degrees_to_decimal(coords[0], coords[1], coords[2]);

                    // We round to six decimal places before returning the coordinate
                    let loc = (loc * 1e6).round() / 1e6;
                    e.content = vec![IFDDataContents::DoubleFloat(loc)];
                }
            }
            // Convert all other rational datatypes to floating point
            (IFDDataFormat::UnsignedRational, _) | (IFDDataFormat::SignedRational, _) => {
                e.content = e
                    .content
                    .iter()
                    .map(|x| match f64::try_from(x) {
                        Ok(v) => IFDDataContents::DoubleFloat(v),
                        Err(_) => x.to_owned(),
                    })
                    .collect();
            }
            // Do nothing for remaining unmatched tags / data types
            _ => {}
        }
    }
}

/// Parse a JPEG file and return the Exif metadata stored in the image.
#[wasm_bindgen]
pub fn extract_exif_data(i: &[u8]) -> Result<JsValue, JsValue> {
    let img = parse_image(i)?;

    // Try to extract Exif data, if we can find any
    let mut exif_entries = img.exif_metadata();
    if exif_entries.is_empty() {
        return Err(JsValue::from_str("No Exif data was found in the image"));
    }
    preprocess_ifd_entries(&mut exif_entries);
    to_js(&exif_entries)
}

/// The decimal `[latitude, longitude]` stored in the image, or `null`.
#[wasm_bindgen]
pub fn read_gps_location(i: &[u8]) -> Result<JsValue, JsValue> {
    let img = parse_image(i)?;
    match img.exif().and_then(|exif| exif.gps_location()) {
        Some((lat, lon)) => to_js(&[lat, lon]),
        None => Ok(JsValue::NULL),
    }
}

/// Encode a coordinate the way it would be written into an image.
#[wasm_bindgen]
pub fn encode_coordinate(latitude: f64, longitude: f64) -> Result<JsValue, JsValue> {
    #[derive(Serialize)]
    struct Encoded {
        latitude_ref: &'static str,
        latitude: gps::Dms,
        longitude_ref: &'static str,
        longitude: gps::Dms,
    }

    let (lat_dms, lon_dms) = gps::to_dms(latitude, longitude).map_err(js_error)?;
    to_js(&Encoded {
        latitude_ref: gps::latitude_ref(latitude),
        latitude: lat_dms,
        longitude_ref: gps::longitude_ref(longitude),
        longitude: lon_dms,
    })
}

/// Geotag an in-memory JPEG against a GPX document and return the new image bytes. The image is
/// returned with only its capture time corrected when no track point is close enough.
///
/// An empty `timezone` looks the zone up from the track.
#[wasm_bindgen]
pub fn geotag_jpeg(
    image: &[u8],
    gpx: &str,
    gpx_source: &str,
    correction: &str,
    timezone: &str,
    tolerance_seconds: f64,
) -> Result<Vec<u8>, JsValue> {
    let dialect: Dialect = gpx_source.parse().map_err(js_error)?;
    let delta = CorrectionDelta::parse(correction).map_err(js_error)?;
    let corrector = if timezone.trim().is_empty() {
        TimeCorrector::new(TzfResolver::new())
    } else {
        let zone: Tz = timezone.trim().parse().map_err(js_error)?;
        TimeCorrector::new(FixedTimezone(zone))
    };

    let track = track::load(gpx, dialect).map_err(js_error)?;
    let pipeline = Pipeline::new(track, delta, corrector, JpegStore)
        .map_err(js_error)?
        .with_tolerance(tolerance_seconds);

    let mut img = parse_image(image)?;
    let mut exif = img
        .exif()
        .cloned()
        .unwrap_or_else(|| exif::ExifData::new(TIFFByteAlignment::LittleEndian));
    let outcome = pipeline
        .tag_exif(&mut exif, Path::new("image"))
        .map_err(js_error)?;
    if let ImageOutcome::NoMatch { nearest, .. } = outcome {
        web_log(&format!(
            "no track point within {}s, nearest is {}s away",
            tolerance_seconds, nearest.time_difference_seconds
        ));
    }

    img.set_exif(exif);
    img.to_bytes().map_err(js_error)
}

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = console, js_name = log)]
    fn web_log(s: &str);
}
