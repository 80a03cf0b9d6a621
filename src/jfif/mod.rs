//! Traits and functions for dealing with JFIF data in an image.

mod marker_codes;

pub use marker_codes::JFIFMarkerCode;
use crate::{exif::ExifData, parse};
use nom::error::context;
use std::fmt;
use tracing::warn;

pub trait ParseableSegment {
    /// Returns `true` if we believe that this `ParseableSegment` can parse this segment of the
    /// input. Otherwise, returns `false`.
    fn can_parse_segment(i: parse::Input) -> bool
    where
        Self: Sized;

    /// Returns the segment marker for the parsed segment.
    fn marker(&self) -> JFIFMarkerCode;

    /// Returns the size (in bytes) of the JFIF segment's data section. If the segment doesn't have
    /// a data section, this function should return `None`.
    fn data_size(&self) -> Option<usize>;

    /// Returns the full size of the JFIF segment, including the size bytes and the magic bytes at
    /// the start of the segment.
    fn segment_size(&self) -> usize {
        let marker = self.marker();
        match (self.data_size(), marker) {
            // Standalone markers only consist of the two magic bytes
            _ if marker.is_standalone() => 2,

            // For SOS, the segment size is the data size plus two magic bytes
            (None, JFIFMarkerCode::SOS) => 2,
            (Some(sz), JFIFMarkerCode::SOS) => sz + 2,

            // For all other markers, the segment size is the data size plus two magic bytes plus
            // two size bytes
            (None, _) => 4,
            (Some(sz), _) => sz + 4,
        }
    }

    /// Parse the data bytes of the JFIF segment, returning a new instance of the
    /// `ParseableSegment` implementor. `magic` contains the marker bytes for the segment, and
    /// `size` is the size of the data section.
    fn parse_data_bytes(
        i: parse::Input,
        magic: JFIFMarkerCode,
        data_size: usize,
    ) -> parse::Result<Self>
    where
        Self: Sized;

    /// Parse the JFIF segment starting from the segment marker.
    fn parse(i: parse::Input) -> parse::Result<Self>
    where
        Self: Sized,
    {
        use nom::{bytes::complete::take, combinator::verify, number::complete::be_u16};

        let (i, magic) = context("Segment magic", JFIFMarkerCode::parse)(i)?;

        let (i, data, data_size) = match magic {
            // For standalone markers, there isn't any data associated with the tag.
            m if m.is_standalone() => (i, &i[0..0], 0),

            // For the marker SOS, the data includes the scan header and the entropy-coded data
            // up to the EOI marker at the end of the file. Progressive images carry further
            // tables and scans in between; they are kept inside this segment's data untouched.
            JFIFMarkerCode::SOS => {
                let eoi = JFIFMarkerCode::EOI.as_bytes();
                let data_size = if i.ends_with(&eoi) {
                    i.len() - eoi.len()
                } else {
                    i.len()
                };
                let (i, data) = context("SOS data", take(data_size))(i)?;
                (i, data, data_size)
            }

            // For all remaining tags, the next two bytes should specify the size of the data
            // section. We retrieve the size from those bytes, and then retrieve the data from that
            // size.
            _ => {
                // The data section size includes the two bytes that are used to store the size, so
                // the actual number of data bytes is the stored size minus two. This also means
                // that the stored size must always be >= 2.
                let mut parser = context("Data section size", verify(be_u16, |&x| x >= 2));
                let (i, data_size) = parser(i)?;
                let data_size = (data_size - 2) as usize;

                let (i, data) = context("Data section", take(data_size))(i)?;
                (i, data, data_size)
            }
        };

        let (_, result) = context("Data section parser", |x| {
            Self::parse_data_bytes(x, magic, data_size)
        })(data)?;
        Ok((i, result))
    }
}

/// A type implementing the `ParseableSegment` trait that can be used to match an arbitrary JFIF
/// segment.
#[derive(Debug, Clone, PartialEq)]
pub struct UnknownJFIFSegment {
    pub magic: JFIFMarkerCode,
    pub data_size: usize,
    pub data: Vec<u8>,
}

impl UnknownJFIFSegment {
    /// Serialize the segment exactly as it was read.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.segment_size());
        bytes.extend_from_slice(&self.magic.as_bytes());
        match self.magic {
            m if m.is_standalone() => {}
            JFIFMarkerCode::SOS => bytes.extend_from_slice(&self.data),
            _ => {
                bytes.extend_from_slice(&((self.data.len() + 2) as u16).to_be_bytes());
                bytes.extend_from_slice(&self.data);
            }
        }
        bytes
    }

    /// An APP1 segment announcing Exif data that couldn't be parsed.
    pub fn is_exif_like(&self) -> bool {
        self.magic == JFIFMarkerCode::APPm(0x01) && self.data.starts_with(b"Exif\x00\x00")
    }
}

impl ParseableSegment for UnknownJFIFSegment {
    fn can_parse_segment(i: parse::Input) -> bool {
        // We can parse arbitrary segments with this input so long as they begin with a valid
        // marker
        JFIFMarkerCode::parse(i).is_ok()
    }

    fn marker(&self) -> JFIFMarkerCode {
        self.magic
    }

    fn data_size(&self) -> Option<usize> {
        Some(self.data_size)
    }

    fn parse_data_bytes(
        i: parse::Input,
        magic: JFIFMarkerCode,
        data_size: usize,
    ) -> parse::Result<Self> {
        use nom::bytes::complete::take;

        // Since we don't know anything about the segment, we don't have any way of handling the
        // input bytes. So instead, we're just going to store all of the data bytes into an array
        // and return that data alongside the segment.
        let (i, data) = context("UnknownJFIFSegment data bytes", take(data_size))(i)?;
        let data = data.to_vec();
        let seg = UnknownJFIFSegment {
            magic,
            data_size,
            data,
        };

        Ok((i, seg))
    }
}

/// An enum that wraps around different segment types that we can detect in a JPEG image.
#[derive(Clone, PartialEq)]
pub enum JFIFSegment {
    ExifSegment(ExifData),
    Unknown(UnknownJFIFSegment),
}

impl fmt::Debug for JFIFSegment {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            JFIFSegment::ExifSegment(_) => write!(f, "ExifSegment"),
            JFIFSegment::Unknown(_) => write!(f, "Unknown segment"),
        }
    }
}

impl JFIFSegment {
    pub fn parse(i: parse::Input) -> parse::Result<Self> {
        // We run parsers over the next segment by first checking the segment magic, and then
        // running over parsers for segments that start with that magic in order of priority.
        let (_, magic) = context("Segment magic", JFIFMarkerCode::parse)(i)?;

        let parse_unknown = || -> parse::Result<Self> {
            let (i, data) = context("JFIFSegment::Unknown", UnknownJFIFSegment::parse)(i)?;
            Ok((i, JFIFSegment::Unknown(data)))
        };

        match magic {
            JFIFMarkerCode::APPm(0x01) if ExifData::can_parse_segment(i) => {
                match context("JFIFSegment::ExifSegment", ExifData::parse)(i) {
                    Ok((i, data)) => Ok((i, JFIFSegment::ExifSegment(data))),
                    Err(nom::Err::Incomplete(needed)) => Err(nom::Err::Incomplete(needed)),
                    Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
                        // A broken Exif block is kept as opaque bytes so that the rest of the
                        // image can still be read and rewritten.
                        let msg = parse::pretty_error_message(i, nom::Err::Error(e));
                        warn!("keeping unreadable Exif data as-is: {}", msg);
                        parse_unknown()
                    }
                }
            }
            _ => parse_unknown(),
        }
    }

    pub fn data(&self) -> &dyn ParseableSegment {
        match self {
            JFIFSegment::ExifSegment(data) => data,
            JFIFSegment::Unknown(data) => data,
        }
    }

    pub fn to_bytes(&self) -> crate::Result<Vec<u8>> {
        match self {
            JFIFSegment::ExifSegment(data) => data.to_segment_bytes(),
            JFIFSegment::Unknown(data) => Ok(data.to_bytes()),
        }
    }
}

#[cfg(test)]
mod test {
    use super::{JFIFMarkerCode, JFIFSegment, ParseableSegment, UnknownJFIFSegment};

    #[test]
    fn test_parse_length_prefixed_segment() {
        let data = b"\xff\xfe\x00\x07hello\xff\xd9";
        let (rest, seg) = UnknownJFIFSegment::parse(data).unwrap();
        assert_eq!(rest, b"\xff\xd9");
        assert_eq!(seg.magic, JFIFMarkerCode::COM);
        assert_eq!(seg.data, b"hello");
        assert_eq!(seg.segment_size(), 9);
        assert_eq!(seg.to_bytes(), &data[..9]);

        // The stored size must cover the two size bytes.
        assert!(UnknownJFIFSegment::parse(b"\xff\xfe\x00\x01").is_err());
        // A segment can't be longer than the input.
        assert!(UnknownJFIFSegment::parse(b"\xff\xfe\x00\x10abc").is_err());
    }

    #[test]
    fn test_parse_standalone_and_scan() {
        let (rest, soi) = UnknownJFIFSegment::parse(b"\xff\xd8\xff\xd9").unwrap();
        assert_eq!(soi.magic, JFIFMarkerCode::SOI);
        assert_eq!(soi.segment_size(), 2);
        assert_eq!(soi.to_bytes(), b"\xff\xd8");
        assert_eq!(rest, b"\xff\xd9");

        let scan = b"\xff\xda\x00\x02\x01\x02\xff\xd0\x03\xff\xd9";
        let (rest, sos) = UnknownJFIFSegment::parse(scan).unwrap();
        assert_eq!(sos.magic, JFIFMarkerCode::SOS);
        assert_eq!(sos.to_bytes(), &scan[..scan.len() - 2]);
        assert_eq!(rest, b"\xff\xd9");

        // Trailing bytes after the scan without an EOI all belong to the scan.
        let (rest, sos) = UnknownJFIFSegment::parse(b"\xff\xda\x01\x02").unwrap();
        assert!(rest.is_empty());
        assert_eq!(sos.data, b"\x01\x02");
    }

    #[test]
    fn test_broken_exif_is_kept_opaque() {
        // Exif header followed by a TIFF header with a bad magic number.
        let data = b"\xff\xe1\x00\x10Exif\x00\x00II\x00\x2a\x08\x00\x00\x00";
        let (rest, seg) = JFIFSegment::parse(data).unwrap();
        assert!(rest.is_empty());
        match seg {
            JFIFSegment::Unknown(seg) => {
                assert!(seg.is_exif_like());
                assert_eq!(seg.to_bytes(), data.to_vec());
            }
            other => panic!("expected an opaque segment, got {:?}", other),
        }
    }
}
