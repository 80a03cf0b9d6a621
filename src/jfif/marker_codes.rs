//! Defines the `JFIFMarkerCode` type, which classifies the JFIF markers by how their segment has to
//! be read and where metadata may be inserted around them.

use crate::impl_parse_for_enum;
use serde::{Deserialize, Serialize};
use std::convert::{From, TryFrom};

/// Marker codes for JFIF segments. See ISO/IEC 10918-1: 1993(E), p. 36 for more information.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub enum JFIFMarkerCode {
    SOI,      // 0xFFD8: Start of image
    EOI,      // 0xFFD9: End of image
    SOS,      // 0xFFDA: Start of scan
    RSTm(u8), // 0xFFD0 - 0xFFD7: Restart with modulo 8 count "m"
    APPm(u8), // 0xFFE0 - 0xFFEF: Reserved for application segments
    COM,      // 0xFFFE: Comment
    TEM,      // 0xFF01: For temporary private use in arithmetic coding

    // Every other marker (frame headers, tables, reserved codes) carries a length-prefixed
    // segment that we copy through untouched. Stores the last byte of the code.
    Other(u8),
}

// Define JFIFMarkerCode::parse(i: parse::Input) -> parse::Result by parsing the marker code from a
// 16-bit integer.
impl_parse_for_enum!(JFIFMarkerCode, be_u16);

impl JFIFMarkerCode {
    pub fn as_bytes(self) -> [u8; 2] {
        u16::from(self).to_be_bytes()
    }

    /// Markers that stand alone, without a length field or data section.
    pub fn is_standalone(self) -> bool {
        matches!(
            self,
            JFIFMarkerCode::SOI | JFIFMarkerCode::EOI | JFIFMarkerCode::RSTm(_) | JFIFMarkerCode::TEM
        )
    }
}

impl TryFrom<u16> for JFIFMarkerCode {
    type Error = &'static str;

    fn try_from(code: u16) -> Result<Self, Self::Error> {
        let result = match code {
            0xFF01 => JFIFMarkerCode::TEM,
            0xFFD8 => JFIFMarkerCode::SOI,
            0xFFD9 => JFIFMarkerCode::EOI,
            0xFFDA => JFIFMarkerCode::SOS,
            0xFFFE => JFIFMarkerCode::COM,

            // Note that we use the (a..=b) syntax to define a `RangeInclusive` rather than
            // `Range`, so both ends are included.
            0xFFD0..=0xFFD7 => JFIFMarkerCode::RSTm((code & 0x000F) as u8),
            0xFFE0..=0xFFEF => JFIFMarkerCode::APPm((code & 0x000F) as u8),
            0xFF02..=0xFFFD => JFIFMarkerCode::Other((code & 0x00FF) as u8),

            // 0xFF00 is a stuffed byte inside entropy-coded data and 0xFFFF is fill; neither
            // starts a segment. Anything not beginning with 0xFF isn't a marker at all.
            _ => return Err("Invalid marker code (code must begin with 0xFF!)"),
        };

        Ok(result)
    }
}

impl From<JFIFMarkerCode> for u16 {
    fn from(marker: JFIFMarkerCode) -> Self {
        match marker {
            JFIFMarkerCode::TEM => 0xFF01,
            JFIFMarkerCode::SOI => 0xFFD8,
            JFIFMarkerCode::EOI => 0xFFD9,
            JFIFMarkerCode::SOS => 0xFFDA,
            JFIFMarkerCode::COM => 0xFFFE,

            JFIFMarkerCode::RSTm(code) => 0xFFD0 | (code as u16),
            JFIFMarkerCode::APPm(code) => 0xFFE0 | (code as u16),
            JFIFMarkerCode::Other(code) => 0xFF00 | (code as u16),
        }
    }
}
