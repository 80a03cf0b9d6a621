#![forbid(unsafe_code)]

pub mod config;
pub mod correction;
pub mod error;
pub mod exif;
pub mod files;
pub mod jfif;
pub mod logging;
pub mod matcher;
pub mod parse;
pub mod pipeline;
pub mod time;
pub mod track;
pub mod version;

pub use error::{Error, Result};

use exif::ExifData;
use jfif::{JFIFMarkerCode, JFIFSegment, ParseableSegment};
use tracing::trace;

#[cfg(target_arch = "wasm32")]
pub mod wasm;

/// A JPEG file split into its segments. Serializing it with `to_bytes` reproduces the input
/// byte for byte unless a segment was changed.
#[derive(Debug, Clone, PartialEq)]
pub struct JPEGFile {
    pub file_size: usize,
    pub segments: Vec<JFIFSegment>,
}

impl JPEGFile {
    pub fn parse(i: parse::Input) -> parse::Result<Self> {
        use nom::{bytes::complete::tag, combinator::peek, error::context};

        let file_size = i.len();
        let soi = JFIFMarkerCode::SOI.as_bytes();
        context("Start of image", peek(tag(&soi[..])))(i)?;

        let mut segments = Vec::new();
        let mut current_input = i;
        let mut offset = 0;
        while !current_input.is_empty() {
            let (i, seg) = context("JFIF segment", JFIFSegment::parse)(current_input)?;
            let data = seg.data();
            trace!(
                "{:?}: magic = {:?}, start = 0x{:x}, end = 0x{:x}",
                seg,
                data.marker(),
                offset,
                offset + data.segment_size()
            );
            offset += data.segment_size();
            current_input = i;
            segments.push(seg);
        }

        let file = JPEGFile {
            file_size,
            segments,
        };

        Ok((current_input, file))
    }

    /// The first Exif segment of the image.
    pub fn exif(&self) -> Option<&ExifData> {
        self.segments.iter().find_map(|s| match s {
            JFIFSegment::ExifSegment(data) => Some(data),
            _ => None,
        })
    }

    pub fn exif_mut(&mut self) -> Option<&mut ExifData> {
        self.segments.iter_mut().find_map(|s| match s {
            JFIFSegment::ExifSegment(data) => Some(data),
            _ => None,
        })
    }

    /// Every IFD entry of the Exif segment, or nothing if the image has none.
    pub fn exif_metadata(&self) -> Vec<exif::IFDEntry> {
        self.exif()
            .map(ExifData::collect_ifd_entries)
            .unwrap_or_default()
    }

    /// Replace the Exif segment, or insert one right after the start of the image (and after a
    /// JFIF APP0 header, which has to come first) if the image has none.
    pub fn set_exif(&mut self, exif: ExifData) {
        let existing = self.segments.iter().position(|s| match s {
            JFIFSegment::ExifSegment(_) => true,
            JFIFSegment::Unknown(seg) => seg.is_exif_like(),
        });

        match existing {
            Some(n) => self.segments[n] = JFIFSegment::ExifSegment(exif),
            None => {
                let mut at = self
                    .segments
                    .iter()
                    .position(|s| s.data().marker() == JFIFMarkerCode::SOI)
                    .map_or(0, |n| n + 1);
                if self
                    .segments
                    .get(at)
                    .map_or(false, |s| s.data().marker() == JFIFMarkerCode::APPm(0x00))
                {
                    at += 1;
                }
                self.segments.insert(at, JFIFSegment::ExifSegment(exif));
            }
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut bytes = Vec::with_capacity(self.file_size);
        for seg in self.segments.iter() {
            bytes.extend_from_slice(&seg.to_bytes()?);
        }
        Ok(bytes)
    }
}
