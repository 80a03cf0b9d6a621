//! Provides the IFDTag enum, which names the IFD tags the geotagger reads or writes. Entries with
//! any other tag are still parsed and written back, they just keep their numeric code.

use derive_try_from_primitive::TryFromPrimitive;
use serde::{Deserialize, Serialize};
use std::convert::TryFrom;

#[derive(Debug, Clone, Copy, TryFromPrimitive, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u16)]
pub enum IFDTag {
    // Catch-all tag for unknown entry types
    Unknown = 0xffff,

    // GPS tags
    // Taken from https://www.exiftool.org/TagNames/GPS.html
    GPSVersionID = 0x0000,
    GPSLatitudeRef = 0x0001,
    GPSLatitude = 0x0002,
    GPSLongitudeRef = 0x0003,
    GPSLongitude = 0x0004,
    GPSAltitudeRef = 0x0005,
    GPSAltitude = 0x0006,
    GPSTimeStamp = 0x0007,
    GPSSatellites = 0x0008,
    GPSSpeedRef = 0x000c,
    GPSSpeed = 0x000d,
    GPSDateStamp = 0x001d,

    // Taken from https://www.exiftool.org/TagNames/EXIF.html
    DateTime = 0x0132,
    JpegIFOffset = 0x0201,
    JpegIFByteCount = 0x0202,
    ExifOffset = 0x8769,
    GPSInfo = 0x8825,
    DateTimeOriginal = 0x9003,
    ExifInteroperabilityOffset = 0xa005,
}

impl IFDTag {
    /// Look up the tag for a raw code. If the tag type is unknown, return `IFDTag::Unknown`.
    pub fn from_code(code: u16) -> Self {
        Self::try_from(code).unwrap_or(IFDTag::Unknown)
    }

    /// Tags whose value is the offset of a nested IFD.
    pub fn is_subifd_pointer(self) -> bool {
        matches!(
            self,
            IFDTag::ExifOffset | IFDTag::GPSInfo | IFDTag::ExifInteroperabilityOffset
        )
    }
}
