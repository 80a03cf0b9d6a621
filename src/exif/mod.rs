//! Parsing and editing of the Exif data structure.

pub mod gps;
mod tags;
mod writer;

pub use tags::IFDTag;

use crate::{
    impl_parse_for_enum,
    jfif::{JFIFMarkerCode, ParseableSegment},
    parse,
};
use derive_try_from_primitive::TryFromPrimitive;
use gps::Rational;
use nom::{
    bytes::complete::{tag, take},
    error::context,
    sequence::tuple,
};
use serde::Serialize;
use std::convert::TryFrom;
use tracing::warn;

/// Nested IFDs deeper than this are not followed; real files use at most IFD0 -> Exif -> Interop.
const MAX_IFD_DEPTH: usize = 4;

/// The Exif data structure containing all of the metadata specified in
/// an Exif section.
#[derive(Debug, Clone, PartialEq)]
pub struct ExifData {
    pub data_size: usize,
    pub tiff_header: TIFFHeader,
    /// The main image IFD, with the Exif, GPS and Interoperability IFDs nested under it.
    pub ifd0: IFD,
    /// IFD1 and the JPEG thumbnail it points to, if the file has one.
    pub thumbnail: Option<Thumbnail>,
}

/// The thumbnail image stored after IFD1.
#[derive(Debug, Clone, PartialEq)]
pub struct Thumbnail {
    pub ifd: IFD,
    pub data: Vec<u8>,
}

impl ExifData {
    const MARKER: JFIFMarkerCode = JFIFMarkerCode::APPm(0x01);
    const HEADER: &'static [u8] = b"Exif\x00\x00";

    /// Create an empty Exif structure.
    pub fn new(alignment: TIFFByteAlignment) -> Self {
        ExifData {
            data_size: 0,
            tiff_header: TIFFHeader {
                alignment,
                initial_offset: 8,
            },
            ifd0: IFD::default(),
            thumbnail: None,
        }
    }

    pub fn alignment(&self) -> TIFFByteAlignment {
        self.tiff_header.alignment
    }

    pub fn collect_ifd_entries(&self) -> Vec<IFDEntry> {
        collect_ifd_entries(&self.ifd0)
    }

    /// The capture time text: IFD0 `DateTime`, or `DateTimeOriginal` from the Exif IFD when the
    /// former is absent or blank.
    pub fn capture_time_text(&self) -> Option<String> {
        let date_time = self.ifd0.entry(IFDTag::DateTime);
        let original = self
            .ifd0
            .subifd(IFDTag::ExifOffset)
            .and_then(|ifd| ifd.entry(IFDTag::DateTimeOriginal));

        date_time
            .and_then(IFDEntry::as_str)
            .filter(|s| !s.trim().is_empty())
            .or_else(|| original.and_then(IFDEntry::as_str))
            .map(str::to_string)
            .filter(|s| !s.trim().is_empty())
    }

    /// Overwrite IFD0 `DateTime`.
    pub fn set_capture_time(&mut self, text: &str) {
        self.ifd0.set_entry(IFDEntry::ascii(IFDTag::DateTime, text));
    }

    pub fn gps_ifd(&self) -> Option<&IFD> {
        self.ifd0.subifd(IFDTag::GPSInfo)
    }

    /// Replace the whole GPS IFD; any GPS tags that were there before are dropped.
    pub fn set_gps_ifd(&mut self, ifd: IFD) {
        self.ifd0.set_subifd(IFDTag::GPSInfo, ifd);
    }

    /// The decimal `(latitude, longitude)` stored in the GPS IFD, if any.
    pub fn gps_location(&self) -> Option<(f64, f64)> {
        let ifd = self.gps_ifd()?;
        let coordinate = |value: IFDTag, reference: IFDTag, negative: &str| -> Option<f64> {
            let parts: Vec<f64> = ifd
                .entry(value)?
                .content
                .iter()
                .map(f64::try_from)
                .collect::<Result<_, _>>()
                .ok()?;
            if parts.len() != 3 {
                return None;
            }
            let decimal = gps::degrees_to_decimal(parts[0], parts[1], parts[2]);
            match ifd.entry(reference).and_then(IFDEntry::as_str) {
                Some(r) if r.trim() == negative => Some(-decimal),
                _ => Some(decimal),
            }
        };

        Some((
            coordinate(IFDTag::GPSLatitude, IFDTag::GPSLatitudeRef, "S")?,
            coordinate(IFDTag::GPSLongitude, IFDTag::GPSLongitudeRef, "W")?,
        ))
    }

    /// Serialize this structure into a complete APP1 segment, marker included.
    pub fn to_segment_bytes(&self) -> crate::Result<Vec<u8>> {
        writer::write_segment(self)
    }

    /// Verify that the data section contains the correct header bytes.
    fn parse_data_bytes_header(i: parse::Input) -> parse::Result<&[u8]> {
        context("Exif data section header", tag(Self::HEADER))(i)
    }

    /// Parse IFD1 and extract the thumbnail it points to. A broken thumbnail doesn't prevent the
    /// rest of the metadata from being used, so failures only drop the thumbnail.
    fn parse_thumbnail(
        tiff: parse::Input,
        offset: u32,
        alignment: TIFFByteAlignment,
    ) -> Option<Thumbnail> {
        let parsed = parse::slice_from(tiff, offset as usize)
            .and_then(|(_, i)| IFD::parse(i, tiff, alignment));
        let ifd = match parsed {
            Ok((_, ifd)) => ifd,
            Err(_) => {
                warn!("ignoring unreadable IFD1 at offset 0x{:x}", offset);
                return None;
            }
        };

        let value = |t: IFDTag| match ifd.entry(t).and_then(|e| e.content.first()) {
            Some(IFDDataContents::UnsignedLong(x)) => Some(*x as usize),
            Some(IFDDataContents::UnsignedShort(x)) => Some(*x as usize),
            _ => None,
        };

        let data = match (value(IFDTag::JpegIFOffset), value(IFDTag::JpegIFByteCount)) {
            (Some(start), Some(len)) if start.checked_add(len).map_or(false, |e| e <= tiff.len()) => {
                tiff[start..start + len].to_vec()
            }
            (None, None) => Vec::new(),
            _ => {
                warn!("ignoring thumbnail with out-of-range data");
                return None;
            }
        };

        Some(Thumbnail { ifd, data })
    }
}

impl ParseableSegment for ExifData {
    fn can_parse_segment(i: parse::Input) -> bool {
        use nom::number::complete::be_u16;

        // We should be able to parse this segment if the first few bytes match the following
        // pattern:
        //
        //      APP1 header + 2 size bytes + "Exif\x00\x00"
        //
        let marker = Self::MARKER.as_bytes();
        let mut parser = tuple((
            tag(&marker[..]),
            be_u16,
            Self::parse_data_bytes_header,
        ));
        parser(i).is_ok()
    }

    fn marker(&self) -> JFIFMarkerCode {
        Self::MARKER
    }

    fn data_size(&self) -> Option<usize> {
        Some(self.data_size)
    }

    fn parse_data_bytes(
        i: parse::Input,
        _magic: JFIFMarkerCode,
        data_size: usize,
    ) -> parse::Result<Self> {
        let (i, _) = context("Exif header", tag(Self::HEADER))(i)?;

        // All offsets inside the Exif data are relative to the start of the TIFF header.
        let tiff = i;
        let (_, tiff_header) = context("TIFF header", TIFFHeader::parse)(tiff)?;
        let alignment = tiff_header.alignment;

        let (ifd_input, _) = context("IFD0 offset", |x| {
            parse::slice_from(x, tiff_header.initial_offset as usize)
        })(tiff)?;
        let (_, ifd0) = context("IFD0", |x| IFD::parse(x, tiff, alignment))(ifd_input)?;

        let thumbnail = ifd0
            .offset_to_next
            .and_then(|offset| Self::parse_thumbnail(tiff, offset, alignment));

        let exif_data = ExifData {
            data_size,
            tiff_header,
            ifd0,
            thumbnail,
        };

        Ok((&tiff[tiff.len()..], exif_data))
    }
}

/// TIFF header used within the Exif data structure to specify its layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TIFFHeader {
    pub alignment: TIFFByteAlignment,
    pub initial_offset: u32,
}

impl TIFFHeader {
    pub fn parse(i: parse::Input) -> parse::Result<Self> {
        use nom::combinator::verify;

        let (i, alignment) = context("Byte alignment", TIFFByteAlignment::parse)(i)?;
        let (i, _) = context(
            "Alignment check",
            verify(|x| alignment.parse_u16(x), |&x| x == 0x002a),
        )(i)?;
        let (i, initial_offset) = context("Initial offset", |x| alignment.parse_u32(x))(i)?;

        Ok((
            i,
            TIFFHeader {
                alignment,
                initial_offset,
            },
        ))
    }
}

/// Two-byte tag representing the byte alignment for the TIFF data.
#[derive(Debug, Clone, Copy, TryFromPrimitive, PartialEq, Eq)]
#[repr(u16)]
pub enum TIFFByteAlignment {
    LittleEndian = 0x4949, // "II" = Intel-type byte alignment
    BigEndian = 0x4d4d,    // "MM" = Motorola-type byte alignment
}

macro_rules! TIFFByteAlignment_parse_numeric {
    ($fn_name: ident, $type: ident, $le_number_parser: ident, $be_number_parser: ident) => {
        impl TIFFByteAlignment {
            pub fn $fn_name<'a>(&self, i: parse::Input<'a>) -> parse::Result<'a, $type> {
                use nom::number::complete::{$be_number_parser, $le_number_parser};
                match self {
                    TIFFByteAlignment::LittleEndian => $le_number_parser(i),
                    TIFFByteAlignment::BigEndian => $be_number_parser(i),
                }
            }
        }
    };
}

impl_parse_for_enum!(TIFFByteAlignment, be_u16);
TIFFByteAlignment_parse_numeric!(parse_u8, u8, le_u8, be_u8);
TIFFByteAlignment_parse_numeric!(parse_i8, i8, le_i8, be_i8);
TIFFByteAlignment_parse_numeric!(parse_u16, u16, le_u16, be_u16);
TIFFByteAlignment_parse_numeric!(parse_i16, i16, le_i16, be_i16);
TIFFByteAlignment_parse_numeric!(parse_u32, u32, le_u32, be_u32);
TIFFByteAlignment_parse_numeric!(parse_i32, i32, le_i32, be_i32);
TIFFByteAlignment_parse_numeric!(parse_f32, f32, le_f32, be_f32);
TIFFByteAlignment_parse_numeric!(parse_f64, f64, le_f64, be_f64);

/// Encapsulates an IFD (Image File Directory) in the image metadata.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IFD {
    pub entries: Vec<IFDEntry>,
    pub subifds: Vec<SubIFD>,
    pub offset_to_next: Option<u32>,
}

/// An IFD nested inside another one, together with the tag of the entry that points to it.
#[derive(Debug, Clone, PartialEq)]
pub struct SubIFD {
    pub pointer: IFDTag,
    pub ifd: IFD,
}

impl IFD {
    pub fn parse<'a>(
        i: parse::Input<'a>,
        original_input: parse::Input<'a>,
        alignment: TIFFByteAlignment,
    ) -> parse::Result<'a, Self> {
        Self::parse_nested(i, original_input, alignment, 0)
    }

    fn parse_nested<'a>(
        i: parse::Input<'a>,
        original_input: parse::Input<'a>,
        alignment: TIFFByteAlignment,
        depth: usize,
    ) -> parse::Result<'a, Self> {
        let (i, num_entries) = context("Number of IFD entries", |x| alignment.parse_u16(x))(i)?;
        let mut entries = Vec::with_capacity(num_entries as usize);
        let mut current_input = i;

        for _ in 0..num_entries {
            let (next_i, entry) = context("IFD entry", |i| {
                IFDEntry::parse(i, original_input, alignment)
            })(current_input)?;
            current_input = next_i;
            entries.push(entry);
        }

        let i = current_input;
        let (i, offset_to_next) = context("Offset to next IFD", |x| alignment.parse_u32(x))(i)?;
        let offset_to_next = if offset_to_next == 0 {
            None
        } else {
            Some(offset_to_next)
        };

        // Check whether there are sub-IFDs. If there are, we read them before exiting.
        let mut subifds = Vec::new();
        if depth < MAX_IFD_DEPTH {
            for e in entries.iter().filter(|e| e.tagtype().is_subifd_pointer()) {
                if let Some(IFDDataContents::UnsignedLong(offset)) = e.content.first() {
                    let (sub_input, _) = parse::slice_from(original_input, *offset as usize)?;
                    let (_, ifd) = context("Sub-IFD", |x| {
                        IFD::parse_nested(x, original_input, alignment, depth + 1)
                    })(sub_input)?;
                    subifds.push(SubIFD {
                        pointer: e.tagtype(),
                        ifd,
                    });
                }
            }
        }

        let ifd = IFD {
            entries,
            subifds,
            offset_to_next,
        };
        Ok((i, ifd))
    }

    pub fn entry(&self, tag: IFDTag) -> Option<&IFDEntry> {
        self.entries.iter().find(|e| e.tag == tag as u16)
    }

    /// Insert an entry, replacing any entry that has the same tag.
    pub fn set_entry(&mut self, entry: IFDEntry) {
        match self.entries.iter_mut().find(|e| e.tag == entry.tag) {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
    }

    pub fn subifd(&self, pointer: IFDTag) -> Option<&IFD> {
        self.subifds
            .iter()
            .find(|s| s.pointer == pointer)
            .map(|s| &s.ifd)
    }

    /// Insert or replace a nested IFD along with the entry that points to it. The pointer's
    /// value is filled in when the structure is written.
    pub fn set_subifd(&mut self, pointer: IFDTag, ifd: IFD) {
        self.set_entry(IFDEntry::long(pointer, 0));
        match self.subifds.iter_mut().find(|s| s.pointer == pointer) {
            Some(existing) => existing.ifd = ifd,
            None => self.subifds.push(SubIFD { pointer, ifd }),
        }
    }
}

/// Recursively crawl an IFD and all linked IFDs to retrieve all of the `IFDEntry` instances they
/// contain and put them into a single `Vec`.
pub fn collect_ifd_entries(ifd: &IFD) -> Vec<IFDEntry> {
    let mut entries = ifd.entries.clone();
    for sub_ifd in ifd.subifds.iter() {
        entries.append(&mut collect_ifd_entries(&sub_ifd.ifd))
    }

    entries
}

/// Represents a single IFD (Image File Directory) entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IFDEntry {
    /// Raw tag code; kept as a number so that tags we don't know survive a rewrite.
    pub tag: u16,
    pub data_format: IFDDataFormat,
    pub n_components: u32,
    pub content: Vec<IFDDataContents>,
}

impl IFDEntry {
    pub fn parse<'a>(
        i: parse::Input<'a>,
        original_input: parse::Input<'a>,
        alignment: TIFFByteAlignment,
    ) -> parse::Result<'a, Self> {
        let (i, (tag, data_format, n_components)) = tuple((
            context("IFD tag", |x| alignment.parse_u16(x)),
            context("Data format", |x| IFDDataFormat::parse(x, alignment)),
            context("Number of components", |x| alignment.parse_u32(x)),
        ))(i)?;

        let content_size = data_format
            .bytes_per_component()
            .saturating_mul(n_components as usize);

        // If the total data size is <= 4 bytes, then the data is stored within the next four
        // bytes. Otherwise, an offset is stored, and we have to extract the value by visiting that
        // offset.
        let mut parser = context("IFD entry contents", |x| {
            IFDDataContents::parse(x, data_format, n_components, alignment)
        });
        let (i, content) = if content_size <= 4 {
            let (i, inline) = context("IFD entry inline value", take(4usize))(i)?;
            let (_, content) = parser(inline)?;
            (i, content)
        } else {
            let (i, offset) = context("IFD entry offset", |x| alignment.parse_u32(x))(i)?;
            let (data, _) = parse::slice_from(original_input, offset as usize)?;
            let (_, content) = parser(data)?;
            (i, content)
        };

        Ok((
            i,
            IFDEntry {
                tag,
                data_format,
                n_components,
                content,
            },
        ))
    }

    pub fn tagtype(&self) -> IFDTag {
        IFDTag::from_code(self.tag)
    }

    /// An ASCII entry; the component count includes the terminating NUL.
    pub fn ascii(tag: IFDTag, text: &str) -> Self {
        IFDEntry {
            tag: tag as u16,
            data_format: IFDDataFormat::AsciiString,
            n_components: text.len() as u32 + 1,
            content: vec![IFDDataContents::AsciiString(
                text.bytes().chain(std::iter::once(0)).collect(),
            )],
        }
    }

    pub fn bytes(tag: IFDTag, values: &[u8]) -> Self {
        IFDEntry {
            tag: tag as u16,
            data_format: IFDDataFormat::UnsignedByte,
            n_components: values.len() as u32,
            content: values
                .iter()
                .map(|x| IFDDataContents::UnsignedByte(*x))
                .collect(),
        }
    }

    pub fn long(tag: IFDTag, value: u32) -> Self {
        IFDEntry {
            tag: tag as u16,
            data_format: IFDDataFormat::UnsignedLong,
            n_components: 1,
            content: vec![IFDDataContents::UnsignedLong(value)],
        }
    }

    pub fn rationals(tag: IFDTag, values: &[Rational]) -> Self {
        IFDEntry {
            tag: tag as u16,
            data_format: IFDDataFormat::UnsignedRational,
            n_components: values.len() as u32,
            content: values.iter().map(|r| (*r).into()).collect(),
        }
    }

    /// The text of an ASCII entry up to its first NUL, or `None` if it isn't valid UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        match self.content.first() {
            Some(IFDDataContents::AsciiString(bytes)) => {
                std::str::from_utf8(ascii_text(bytes)).ok()
            }
            _ => None,
        }
    }
}

/// The bytes of an ASCII value before its terminating NUL.
fn ascii_text(bytes: &[u8]) -> &[u8] {
    let end = bytes.iter().position(|x| *x == 0).unwrap_or(bytes.len());
    &bytes[..end]
}

fn serialize_ascii<S: serde::Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&String::from_utf8_lossy(ascii_text(bytes)))
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, TryFromPrimitive, Serialize)]
#[repr(u16)]
pub enum IFDDataFormat {
    UnsignedByte = 1,
    AsciiString = 2,
    UnsignedShort = 3,
    UnsignedLong = 4,
    UnsignedRational = 5,
    SignedByte = 6,
    Undefined = 7,
    SignedShort = 8,
    SignedLong = 9,
    SignedRational = 10,
    SingleFloat = 11,
    DoubleFloat = 12,
}

impl IFDDataFormat {
    pub fn parse(i: parse::Input, alignment: TIFFByteAlignment) -> parse::Result<Self> {
        use nom::{combinator::map_res, error::ErrorKind};

        let parser = map_res(
            |x| alignment.parse_u16(x),
            |x| Self::try_from(x).map_err(|_| ErrorKind::Alt),
        );
        context("IFD Data Format", parser)(i)
    }

    pub fn bytes_per_component(&self) -> usize {
        match self {
            IFDDataFormat::UnsignedByte => 1,
            IFDDataFormat::AsciiString => 1,
            IFDDataFormat::UnsignedShort => 2,
            IFDDataFormat::UnsignedLong => 4,
            IFDDataFormat::UnsignedRational => 8,
            IFDDataFormat::SignedByte => 1,
            IFDDataFormat::Undefined => 1,
            IFDDataFormat::SignedShort => 2,
            IFDDataFormat::SignedLong => 4,
            IFDDataFormat::SignedRational => 8,
            IFDDataFormat::SingleFloat => 4,
            IFDDataFormat::DoubleFloat => 8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum IFDDataContents {
    UnsignedByte(u8),
    /// All `n_components` bytes as stored, NUL terminator and padding included, so that text
    /// in a legacy encoding is written back unchanged.
    AsciiString(#[serde(serialize_with = "serialize_ascii")] Vec<u8>),
    UnsignedShort(u16),
    UnsignedLong(u32),
    UnsignedRational(u32, u32),
    SignedByte(i8),
    Undefined(Vec<u8>),
    SignedShort(i16),
    SignedLong(i32),
    SignedRational(i32, i32),
    SingleFloat(f32),
    DoubleFloat(f64),
}

impl IFDDataContents {
    pub fn parse(
        i: parse::Input,
        format: IFDDataFormat,
        n_components: u32,
        alignment: TIFFByteAlignment,
    ) -> parse::Result<Vec<Self>> {
        match format {
            IFDDataFormat::AsciiString | IFDDataFormat::Undefined => {
                // For both of these formats, n_components refers to the number of characters/bytes
                // in the data type, rather than the number of instances of the data type that
                // exist. Therefore, the logic for parsing these types is equivalent to the logic
                // for parsing a single instance of them.
                let (i, result) = Self::parse_one(i, format, n_components, alignment)?;
                Ok((i, vec![result]))
            }
            _ => {
                // For all other formats, n_components refers to the number of instances of the
                // type that exist, e.g. three rationals for a GPS coordinate.
                let mut contents = Vec::new();
                let mut i = i;
                for _ in 0..n_components {
                    let (next_i, res) = Self::parse_one(i, format, n_components, alignment)?;
                    i = next_i;
                    contents.push(res);
                }
                Ok((i, contents))
            }
        }
    }

    /// Parse a single value of the input data format.
    fn parse_one(
        i: parse::Input,
        format: IFDDataFormat,
        n_components: u32,
        alignment: TIFFByteAlignment,
    ) -> parse::Result<Self> {
        let n_components = n_components as usize;

        match format {
            IFDDataFormat::UnsignedByte => {
                let (i, x) = alignment.parse_u8(i)?;
                Ok((i, IFDDataContents::UnsignedByte(x)))
            }
            IFDDataFormat::AsciiString => {
                let (i, s) = take(n_components)(i)?;
                Ok((i, IFDDataContents::AsciiString(s.to_vec())))
            }
            IFDDataFormat::UnsignedShort => {
                let (i, x) = alignment.parse_u16(i)?;
                Ok((i, IFDDataContents::UnsignedShort(x)))
            }
            IFDDataFormat::UnsignedLong => {
                let (i, x) = alignment.parse_u32(i)?;
                Ok((i, IFDDataContents::UnsignedLong(x)))
            }
            IFDDataFormat::UnsignedRational => {
                let (i, (num, denom)) =
                    tuple((|x| alignment.parse_u32(x), |x| alignment.parse_u32(x)))(i)?;
                Ok((i, IFDDataContents::UnsignedRational(num, denom)))
            }
            IFDDataFormat::SignedByte => {
                let (i, x) = alignment.parse_i8(i)?;
                Ok((i, IFDDataContents::SignedByte(x)))
            }
            IFDDataFormat::Undefined => {
                let (i, x) = take(n_components)(i)?;
                Ok((i, IFDDataContents::Undefined(x.to_vec())))
            }
            IFDDataFormat::SignedShort => {
                let (i, x) = alignment.parse_i16(i)?;
                Ok((i, IFDDataContents::SignedShort(x)))
            }
            IFDDataFormat::SignedLong => {
                let (i, x) = alignment.parse_i32(i)?;
                Ok((i, IFDDataContents::SignedLong(x)))
            }
            IFDDataFormat::SignedRational => {
                let (i, (num, denom)) =
                    tuple((|x| alignment.parse_i32(x), |x| alignment.parse_i32(x)))(i)?;
                Ok((i, IFDDataContents::SignedRational(num, denom)))
            }
            IFDDataFormat::SingleFloat => {
                let (i, x) = alignment.parse_f32(i)?;
                Ok((i, IFDDataContents::SingleFloat(x)))
            }
            IFDDataFormat::DoubleFloat => {
                let (i, x) = alignment.parse_f64(i)?;
                Ok((i, IFDDataContents::DoubleFloat(x)))
            }
        }
    }
}

impl TryFrom<&IFDDataContents> for f64 {
    type Error = &'static str;

    fn try_from(data: &IFDDataContents) -> Result<Self, Self::Error> {
        match data {
            IFDDataContents::UnsignedByte(x) => Ok(*x as f64),
            IFDDataContents::UnsignedShort(x) => Ok(*x as f64),
            IFDDataContents::UnsignedLong(x) => Ok(*x as f64),
            IFDDataContents::SignedByte(x) => Ok(*x as f64),
            IFDDataContents::SignedShort(x) => Ok(*x as f64),
            IFDDataContents::SignedLong(x) => Ok(*x as f64),
            IFDDataContents::SingleFloat(x) => Ok(*x as f64),
            IFDDataContents::DoubleFloat(x) => Ok(*x),
            IFDDataContents::UnsignedRational(_, 0) | IFDDataContents::SignedRational(_, 0) => {
                Err("Rational with a zero denominator")
            }
            IFDDataContents::UnsignedRational(x, y) => Ok((*x as f64) / (*y as f64)),
            IFDDataContents::SignedRational(x, y) => Ok((*x as f64) / (*y as f64)),
            _ => Err("Cannot convert data type to f64"),
        }
    }
}
