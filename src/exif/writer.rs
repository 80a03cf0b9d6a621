//! Serialization of `ExifData` back into an APP1 segment.
//!
//! The layout is rebuilt from scratch on every write: TIFF header, IFD0 with its nested IFDs,
//! then IFD1 and the thumbnail. Values that don't fit into an entry's four value bytes are placed
//! right after the directory that refers to them.

use super::{
    ExifData, IFDDataContents, IFDDataFormat, IFDEntry, IFDTag, TIFFByteAlignment, IFD,
};
use crate::{jfif::JFIFMarkerCode, Error, Result};

/// Largest value the two length bytes of a JPEG segment can hold.
const MAX_SEGMENT_LENGTH: usize = u16::MAX as usize;

macro_rules! TIFFByteAlignment_write_numeric {
    ($fn_name: ident, $type: ident) => {
        impl TIFFByteAlignment {
            pub fn $fn_name(&self, buf: &mut Vec<u8>, x: $type) {
                match self {
                    TIFFByteAlignment::LittleEndian => buf.extend_from_slice(&x.to_le_bytes()),
                    TIFFByteAlignment::BigEndian => buf.extend_from_slice(&x.to_be_bytes()),
                }
            }
        }
    };
}

TIFFByteAlignment_write_numeric!(write_u16, u16);
TIFFByteAlignment_write_numeric!(write_i16, i16);
TIFFByteAlignment_write_numeric!(write_u32, u32);
TIFFByteAlignment_write_numeric!(write_i32, i32);
TIFFByteAlignment_write_numeric!(write_u64, u64);

/// Build the complete APP1 segment, marker and length bytes included.
pub(super) fn write_segment(exif: &ExifData) -> Result<Vec<u8>> {
    let tiff = TiffWriter::new(exif.alignment()).finish(exif);

    let length = 2 + ExifData::HEADER.len() + tiff.len();
    if length > MAX_SEGMENT_LENGTH {
        return Err(Error::ExifTooLarge(length));
    }

    let mut segment = Vec::with_capacity(length + 2);
    segment.extend_from_slice(&JFIFMarkerCode::APPm(0x01).as_bytes());
    segment.extend_from_slice(&(length as u16).to_be_bytes());
    segment.extend_from_slice(ExifData::HEADER);
    segment.extend_from_slice(&tiff);
    Ok(segment)
}

/// Where a directory ended up in the output.
struct WrittenIFD {
    start: u32,
    /// Position of the "offset to next IFD" field.
    next_field: usize,
    /// Position of the four value bytes of every entry, by tag.
    value_fields: Vec<(u16, usize)>,
}

impl WrittenIFD {
    fn value_field(&self, tag: IFDTag) -> Option<usize> {
        self.value_fields
            .iter()
            .find(|(t, _)| *t == tag as u16)
            .map(|(_, at)| *at)
    }
}

struct TiffWriter {
    alignment: TIFFByteAlignment,
    buf: Vec<u8>,
}

impl TiffWriter {
    fn new(alignment: TIFFByteAlignment) -> Self {
        TiffWriter {
            alignment,
            buf: Vec::new(),
        }
    }

    /// Serialize the whole structure; offsets in the result are relative to its first byte.
    fn finish(mut self, exif: &ExifData) -> Vec<u8> {
        match self.alignment {
            TIFFByteAlignment::LittleEndian => self.buf.extend_from_slice(b"II"),
            TIFFByteAlignment::BigEndian => self.buf.extend_from_slice(b"MM"),
        }
        self.alignment.write_u16(&mut self.buf, 0x002a);
        self.alignment.write_u32(&mut self.buf, 8);

        let ifd0 = self.write_ifd(&exif.ifd0);

        if let Some(thumbnail) = &exif.thumbnail {
            let mut ifd1 = thumbnail.ifd.clone();
            ifd1.subifds.clear();
            if !thumbnail.data.is_empty() {
                ifd1.set_entry(IFDEntry::long(IFDTag::JpegIFOffset, 0));
                ifd1.set_entry(IFDEntry::long(
                    IFDTag::JpegIFByteCount,
                    thumbnail.data.len() as u32,
                ));
            }

            let written = self.write_ifd(&ifd1);
            self.patch_u32(ifd0.next_field, written.start);

            if let Some(at) = written.value_field(IFDTag::JpegIFOffset) {
                self.align();
                let offset = self.buf.len() as u32;
                self.buf.extend_from_slice(&thumbnail.data);
                self.patch_u32(at, offset);
            }
        }

        self.buf
    }

    /// Append a directory followed by its out-of-line values, then its nested directories.
    fn write_ifd(&mut self, ifd: &IFD) -> WrittenIFD {
        // A pointer entry whose directory we never read would point at garbage after the rewrite.
        let mut entries: Vec<&IFDEntry> = ifd
            .entries
            .iter()
            .filter(|e| !e.tagtype().is_subifd_pointer() || ifd.subifd(e.tagtype()).is_some())
            .collect();
        entries.sort_by_key(|e| e.tag);

        self.align();
        let start = self.buf.len();
        self.alignment.write_u16(&mut self.buf, entries.len() as u16);
        let directory = self.buf.len();
        self.buf.resize(directory + entries.len() * 12 + 4, 0);
        let next_field = directory + entries.len() * 12;

        let mut value_fields = Vec::with_capacity(entries.len());
        for (n, entry) in entries.iter().enumerate() {
            let (count, data) = encode_entry(entry, self.alignment);

            let mut field = Vec::with_capacity(12);
            self.alignment.write_u16(&mut field, entry.tag);
            self.alignment.write_u16(&mut field, entry.data_format as u16);
            self.alignment.write_u32(&mut field, count);
            let at = directory + n * 12;
            self.buf[at..at + 8].copy_from_slice(&field);

            let value_at = at + 8;
            if data.len() <= 4 {
                self.buf[value_at..value_at + data.len()].copy_from_slice(&data);
            } else {
                self.align();
                let offset = self.buf.len() as u32;
                self.buf.extend_from_slice(&data);
                self.patch_u32(value_at, offset);
            }
            value_fields.push((entry.tag, value_at));
        }

        for sub in ifd.subifds.iter() {
            let at = value_fields
                .iter()
                .find(|(t, _)| *t == sub.pointer as u16)
                .map(|(_, at)| *at);
            if let Some(at) = at {
                let written = self.write_ifd(&sub.ifd);
                self.patch_u32(at, written.start);
            }
        }

        WrittenIFD {
            start: start as u32,
            next_field,
            value_fields,
        }
    }

    /// IFDs and values must start on a word boundary.
    fn align(&mut self) {
        if self.buf.len() % 2 == 1 {
            self.buf.push(0);
        }
    }

    fn patch_u32(&mut self, at: usize, x: u32) {
        let mut bytes = Vec::with_capacity(4);
        self.alignment.write_u32(&mut bytes, x);
        self.buf[at..at + 4].copy_from_slice(&bytes);
    }
}

/// Encode an entry's values, returning the component count to record alongside them.
fn encode_entry(entry: &IFDEntry, alignment: TIFFByteAlignment) -> (u32, Vec<u8>) {
    let mut data = Vec::new();

    match (entry.data_format, entry.content.first()) {
        (IFDDataFormat::AsciiString, Some(IFDDataContents::AsciiString(bytes))) => {
            data.extend_from_slice(bytes);
            let count = (entry.n_components as usize).max(bytes.len());
            data.resize(count, 0);
            return (count as u32, data);
        }
        (IFDDataFormat::Undefined, Some(IFDDataContents::Undefined(bytes))) => {
            data.extend_from_slice(bytes);
            return (bytes.len() as u32, data);
        }
        _ => {}
    }

    for value in entry.content.iter() {
        match value {
            IFDDataContents::UnsignedByte(x) => data.push(*x),
            IFDDataContents::SignedByte(x) => data.push(*x as u8),
            IFDDataContents::AsciiString(bytes) | IFDDataContents::Undefined(bytes) => {
                data.extend_from_slice(bytes)
            }
            IFDDataContents::UnsignedShort(x) => alignment.write_u16(&mut data, *x),
            IFDDataContents::SignedShort(x) => alignment.write_i16(&mut data, *x),
            IFDDataContents::UnsignedLong(x) => alignment.write_u32(&mut data, *x),
            IFDDataContents::SignedLong(x) => alignment.write_i32(&mut data, *x),
            IFDDataContents::UnsignedRational(n, d) => {
                alignment.write_u32(&mut data, *n);
                alignment.write_u32(&mut data, *d);
            }
            IFDDataContents::SignedRational(n, d) => {
                alignment.write_i32(&mut data, *n);
                alignment.write_i32(&mut data, *d);
            }
            IFDDataContents::SingleFloat(x) => alignment.write_u32(&mut data, x.to_bits()),
            IFDDataContents::DoubleFloat(x) => alignment.write_u64(&mut data, x.to_bits()),
        }
    }

    (entry.content.len() as u32, data)
}

#[cfg(test)]
mod test {
    use super::encode_entry;
    use crate::{
        exif::{
            gps::Rational, ExifData, IFDDataContents, IFDDataFormat, IFDEntry, IFDTag,
            TIFFByteAlignment, Thumbnail, IFD,
        },
        jfif::ParseableSegment,
        Error,
    };

    fn sample(alignment: TIFFByteAlignment) -> ExifData {
        let mut exif = ExifData::new(alignment);
        exif.set_capture_time("2021:06:01 14:00:02");

        let mut gps = IFD::default();
        gps.set_entry(IFDEntry::bytes(IFDTag::GPSVersionID, &[2, 2, 0, 0]));
        gps.set_entry(IFDEntry::ascii(IFDTag::GPSLatitudeRef, "N"));
        gps.set_entry(IFDEntry::rationals(
            IFDTag::GPSLatitude,
            &[
                Rational::integer(52),
                Rational::integer(2),
                Rational::new(441960000, 10000000),
            ],
        ));
        exif.set_gps_ifd(gps);
        exif
    }

    #[test]
    fn test_written_segment_parses_back() {
        for alignment in [TIFFByteAlignment::LittleEndian, TIFFByteAlignment::BigEndian] {
            let exif = sample(alignment);
            let bytes = exif.to_segment_bytes().unwrap();
            assert_eq!(&bytes[..2], &[0xff, 0xe1]);
            assert_eq!(
                u16::from_be_bytes([bytes[2], bytes[3]]) as usize,
                bytes.len() - 2
            );

            let (rest, parsed) = ExifData::parse(&bytes).unwrap();
            assert!(rest.is_empty());
            assert_eq!(parsed.alignment(), alignment);
            assert_eq!(parsed.ifd0.subifds, exif.ifd0.subifds);
            assert_eq!(
                parsed.capture_time_text().as_deref(),
                Some("2021:06:01 14:00:02")
            );
        }
    }

    #[test]
    fn test_unknown_entries_survive() {
        let mut exif = sample(TIFFByteAlignment::BigEndian);
        let mut make = IFDEntry::ascii(IFDTag::Unknown, "Camera maker");
        make.tag = 0x010f;
        exif.ifd0.set_entry(make.clone());

        let bytes = exif.to_segment_bytes().unwrap();
        let (_, parsed) = ExifData::parse(&bytes).unwrap();
        assert!(parsed.ifd0.entries.contains(&make));
    }

    #[test]
    fn test_thumbnail_is_carried_over() {
        let mut exif = sample(TIFFByteAlignment::LittleEndian);
        exif.thumbnail = Some(Thumbnail {
            ifd: IFD::default(),
            data: vec![0xff, 0xd8, 0x01, 0x02, 0x03, 0xff, 0xd9],
        });

        let bytes = exif.to_segment_bytes().unwrap();
        let (_, parsed) = ExifData::parse(&bytes).unwrap();
        let thumbnail = parsed.thumbnail.unwrap();
        assert_eq!(thumbnail.data, vec![0xff, 0xd8, 0x01, 0x02, 0x03, 0xff, 0xd9]);
        assert!(thumbnail.ifd.entry(IFDTag::JpegIFByteCount).is_some());
    }

    #[test]
    fn test_ascii_count_includes_terminator() {
        let entry = IFDEntry::ascii(IFDTag::GPSLatitudeRef, "N");
        let (count, data) = encode_entry(&entry, TIFFByteAlignment::BigEndian);
        assert_eq!(count, 2);
        assert_eq!(data, b"N\x00");

        // A declared count larger than the text pads with NULs.
        let mut entry = IFDEntry::ascii(IFDTag::DateTime, "2021");
        entry.n_components = 20;
        let (count, data) = encode_entry(&entry, TIFFByteAlignment::BigEndian);
        assert_eq!(count, 20);
        assert_eq!(data.len(), 20);
    }

    #[test]
    fn test_non_utf8_text_is_written_back_unchanged() {
        let mut exif = sample(TIFFByteAlignment::LittleEndian);
        // Latin-1 "Café" for Artist, and a Copyright holding two NUL-separated strings.
        let artist = IFDEntry {
            tag: 0x013b,
            data_format: IFDDataFormat::AsciiString,
            n_components: 5,
            content: vec![IFDDataContents::AsciiString(b"Caf\xe9\x00".to_vec())],
        };
        let copyright = IFDEntry {
            tag: 0x8298,
            data_format: IFDDataFormat::AsciiString,
            n_components: 8,
            content: vec![IFDDataContents::AsciiString(b"Ann\x00Bob\x00".to_vec())],
        };
        exif.ifd0.set_entry(artist.clone());
        exif.ifd0.set_entry(copyright.clone());

        let bytes = exif.to_segment_bytes().unwrap();
        let (_, parsed) = ExifData::parse(&bytes).unwrap();
        assert!(parsed.ifd0.entries.contains(&artist));
        assert!(parsed.ifd0.entries.contains(&copyright));
        let parsed_artist = parsed.ifd0.entries.iter().find(|e| e.tag == 0x013b);
        assert_eq!(parsed_artist.and_then(IFDEntry::as_str), None);

        // A second rewrite is byte for byte identical to the first.
        assert_eq!(parsed.to_segment_bytes().unwrap(), bytes);
    }

    #[test]
    fn test_oversized_exif_is_rejected() {
        let mut exif = ExifData::new(TIFFByteAlignment::LittleEndian);
        let mut note = IFDEntry::bytes(IFDTag::Unknown, &vec![0u8; 70_000]);
        note.tag = 0x927c;
        exif.ifd0.set_entry(note);

        assert!(matches!(
            exif.to_segment_bytes(),
            Err(Error::ExifTooLarge(_))
        ));
    }
}
