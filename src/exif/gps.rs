//! Various utilities for dealing with GPS information: encoding decimal coordinates into the
//! rational triples used by the Exif GPS IFD, and decoding them back.

use super::{IFDDataContents, IFDEntry, IFDTag, IFD};
use crate::{track::TrackPoint, Error, Result};
use chrono::Timelike;
use serde::{Deserialize, Serialize};

/// Upper bound on the decimal digits of an encoded numerator. Exif rationals are 32-bit, and nine
/// digits always fit.
pub const MAX_RATIONAL_DIGITS: usize = 9;

/// `GPSVersionID` written with every GPS IFD.
const GPS_VERSION: [u8; 4] = [2, 2, 0, 0];

/// An unsigned Exif rational.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rational {
    pub numerator: u32,
    pub denominator: u32,
}

impl Rational {
    pub fn new(numerator: u32, denominator: u32) -> Self {
        Rational {
            numerator,
            denominator,
        }
    }

    pub fn integer(value: u32) -> Self {
        Self::new(value, 1)
    }

    pub fn to_f64(self) -> f64 {
        self.numerator as f64 / self.denominator as f64
    }
}

impl From<Rational> for IFDDataContents {
    fn from(r: Rational) -> Self {
        IFDDataContents::UnsignedRational(r.numerator, r.denominator)
    }
}

/// Degrees, minutes and seconds.
pub type Dms = [Rational; 3];

/// Convert a non-negative decimal into `numerator / 10^k`, where `k` is the number of fractional
/// digits in the shortest decimal text of `value`.
///
/// When the numerator would need more than [`MAX_RATIONAL_DIGITS`] digits, fractional digits are
/// dropped from the right (truncation, never rounding) until it fits. Integral values are encoded
/// as `(value, 1)`.
pub fn to_rational(value: f64) -> Result<Rational> {
    if !value.is_finite() || (value.is_sign_negative() && value != 0.) {
        return Err(Error::Encoding(value));
    }

    // `Display` for f64 yields the shortest text that round-trips, never in exponent notation, so
    // the encoding is the same on every platform.
    let text = value.abs().to_string();
    let (int_part, frac_part) = match text.split_once('.') {
        Some((i, f)) => (i, f),
        None => (text.as_str(), ""),
    };

    if int_part.len() > MAX_RATIONAL_DIGITS {
        return Err(Error::Encoding(value));
    }
    let keep = frac_part.len().min(MAX_RATIONAL_DIGITS - int_part.len());
    let frac_part = &frac_part[..keep];

    let numerator = format!("{}{}", int_part, frac_part)
        .parse::<u32>()
        .map_err(|_| Error::Encoding(value))?;
    Ok(Rational::new(numerator, 10u32.pow(keep as u32)))
}

/// Split one decimal coordinate into degrees, minutes and seconds of its magnitude.
pub fn coordinate_to_dms(value: f64) -> Result<Dms> {
    if !value.is_finite() {
        return Err(Error::Encoding(value));
    }

    let value = value.abs();
    let degrees = value.trunc();
    let minutes_raw = (value - degrees) * 60.;
    let minutes = minutes_raw.trunc();
    let seconds = (minutes_raw - minutes) * 60.;

    Ok([
        Rational::integer(degrees as u32),
        Rational::integer(minutes as u32),
        to_rational(seconds)?,
    ])
}

/// Encode a latitude/longitude pair.
pub fn to_dms(latitude: f64, longitude: f64) -> Result<(Dms, Dms)> {
    Ok((coordinate_to_dms(latitude)?, coordinate_to_dms(longitude)?))
}

/// Hemisphere of a latitude, decided by the sign of its whole degrees.
pub fn latitude_ref(latitude: f64) -> &'static str {
    if latitude.trunc().is_sign_negative() {
        "S"
    } else {
        "N"
    }
}

pub fn longitude_ref(longitude: f64) -> &'static str {
    if longitude.trunc().is_sign_negative() {
        "W"
    } else {
        "E"
    }
}

/// Encode an altitude in metres as a magnitude and a reference flag: 0 above sea level, 1 below.
pub fn encode_altitude(altitude: f64) -> Result<(Rational, u8)> {
    if altitude < 0. {
        Ok((to_rational(-altitude)?, 1))
    } else {
        Ok((to_rational(altitude)?, 0))
    }
}

/// Convert latitude and longitude coordinates from degrees/minutes/seconds to decimal.
pub fn degrees_to_decimal(degrees: f64, minutes: f64, seconds: f64) -> f64 {
    degrees + minutes / 60. + seconds / 3600.
}

/// Everything written into the GPS IFD for one image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoEncoding {
    pub latitude_dms: Dms,
    pub longitude_dms: Dms,
    pub latitude_ref: String,
    pub longitude_ref: String,
    pub altitude: Rational,
    pub altitude_ref: u8,
    /// UTC hour, minute and second of the fix.
    pub gps_time: Dms,
    /// UTC date of the fix as `YYYY:MM:DD`.
    pub gps_date: String,
    /// Empty when the logger didn't record it.
    pub satellites: String,
    /// Speed in km/h.
    pub speed: Option<Rational>,
}

impl GeoEncoding {
    pub fn from_point(point: &TrackPoint) -> Result<Self> {
        let (latitude_dms, longitude_dms) = to_dms(point.latitude, point.longitude)?;
        let (altitude, altitude_ref) = encode_altitude(point.altitude)?;
        let fix_time = point.fix_time();
        let time = fix_time.time();
        let speed = match point.speed {
            Some(speed) => Some(to_rational(speed.max(0.) * 3.6)?),
            None => None,
        };

        Ok(GeoEncoding {
            latitude_dms,
            longitude_dms,
            latitude_ref: latitude_ref(point.latitude).to_string(),
            longitude_ref: longitude_ref(point.longitude).to_string(),
            altitude,
            altitude_ref,
            gps_time: [
                Rational::integer(time.hour()),
                Rational::integer(time.minute()),
                Rational::integer(time.second()),
            ],
            gps_date: fix_time.format("%Y:%m:%d").to_string(),
            satellites: point.satellites.clone().unwrap_or_default(),
            speed,
        })
    }

    /// The latitude and longitude this encoding decodes to.
    pub fn decimal(&self) -> (f64, f64) {
        let decode = |dms: &Dms, negative: bool| {
            let v = degrees_to_decimal(dms[0].to_f64(), dms[1].to_f64(), dms[2].to_f64());
            if negative {
                -v
            } else {
                v
            }
        };
        (
            decode(&self.latitude_dms, self.latitude_ref == "S"),
            decode(&self.longitude_dms, self.longitude_ref == "W"),
        )
    }

    /// Build a complete GPS IFD.
    pub fn to_ifd(&self) -> IFD {
        let mut ifd = IFD::default();
        ifd.set_entry(IFDEntry::bytes(IFDTag::GPSVersionID, &GPS_VERSION));
        ifd.set_entry(IFDEntry::ascii(IFDTag::GPSLatitudeRef, &self.latitude_ref));
        ifd.set_entry(IFDEntry::rationals(IFDTag::GPSLatitude, &self.latitude_dms));
        ifd.set_entry(IFDEntry::ascii(IFDTag::GPSLongitudeRef, &self.longitude_ref));
        ifd.set_entry(IFDEntry::rationals(IFDTag::GPSLongitude, &self.longitude_dms));
        ifd.set_entry(IFDEntry::bytes(IFDTag::GPSAltitudeRef, &[self.altitude_ref]));
        ifd.set_entry(IFDEntry::rationals(IFDTag::GPSAltitude, &[self.altitude]));
        ifd.set_entry(IFDEntry::rationals(IFDTag::GPSTimeStamp, &self.gps_time));
        ifd.set_entry(IFDEntry::ascii(IFDTag::GPSSatellites, &self.satellites));
        if let Some(speed) = self.speed {
            ifd.set_entry(IFDEntry::ascii(IFDTag::GPSSpeedRef, "K"));
            ifd.set_entry(IFDEntry::rationals(IFDTag::GPSSpeed, &[speed]));
        }
        ifd.set_entry(IFDEntry::ascii(IFDTag::GPSDateStamp, &self.gps_date));
        ifd
    }
}
