//! Per-image orchestration: read the capture time, correct it, match it against the track and
//! write the result back into the image.

use crate::{
    correction::CorrectionDelta,
    exif::{gps::GeoEncoding, ExifData, TIFFByteAlignment},
    matcher::{self, MatchResult, DEFAULT_TOLERANCE_SECONDS},
    parse,
    time::{self, TimeCorrector},
    track::Track,
    Error, JPEGFile, Result,
};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::{debug, info, info_span, warn};

/// Reads and writes the metadata container of an image.
pub trait MetadataStore {
    /// The image's Exif data. An image without any yields an empty structure.
    fn load(&self, path: &Path) -> Result<ExifData>;

    /// Replace the image's Exif data, leaving everything else in the file untouched.
    fn save(&self, path: &Path, exif: &ExifData) -> Result<()>;
}

impl<T: MetadataStore + ?Sized> MetadataStore for &T {
    fn load(&self, path: &Path) -> Result<ExifData> {
        (**self).load(path)
    }

    fn save(&self, path: &Path, exif: &ExifData) -> Result<()> {
        (**self).save(path, exif)
    }
}

/// Stores Exif data in the APP1 segment of JPEG files.
#[derive(Debug, Clone, Copy, Default)]
pub struct JpegStore;

impl JpegStore {
    fn read(path: &Path) -> Result<JPEGFile> {
        let data = fs::read(path).map_err(|e| Error::io(e, path))?;
        match JPEGFile::parse(&data) {
            Ok((_, jpeg)) => Ok(jpeg),
            Err(e) => Err(Error::Image {
                path: path.to_path_buf(),
                message: parse::pretty_error_message(&data, e),
            }),
        }
    }
}

impl MetadataStore for JpegStore {
    fn load(&self, path: &Path) -> Result<ExifData> {
        let jpeg = Self::read(path)?;
        Ok(jpeg
            .exif()
            .cloned()
            .unwrap_or_else(|| ExifData::new(TIFFByteAlignment::LittleEndian)))
    }

    fn save(&self, path: &Path, exif: &ExifData) -> Result<()> {
        let mut jpeg = Self::read(path)?;
        jpeg.set_exif(exif.clone());
        write_atomically(path, &jpeg.to_bytes()?)
    }
}

/// Write to a sibling temporary file, then rename it over `path`.
fn write_atomically(path: &Path, bytes: &[u8]) -> Result<()> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp = path.with_file_name(format!(".{}.geotag-tmp", file_name));

    fs::write(&temp, bytes).map_err(|e| Error::io(e, &temp))?;
    if let Err(e) = fs::rename(&temp, path) {
        let _ = fs::remove_file(&temp);
        return Err(Error::io(e, path));
    }
    Ok(())
}

/// What to do with an image whose capture time is missing or unreadable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MissingTimePolicy {
    /// Stop the whole run at the first such image.
    #[default]
    Abort,
    /// Leave the image alone and continue with the next one.
    Skip,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ImageOutcome {
    /// GPS data was written.
    Tagged {
        capture_time_utc: NaiveDateTime,
        matched: MatchResult,
        encoding: GeoEncoding,
    },
    /// The nearest point was outside the tolerance; only the capture time was corrected.
    NoMatch {
        capture_time_utc: NaiveDateTime,
        nearest: MatchResult,
    },
    Skipped { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageReport {
    pub path: PathBuf,
    pub outcome: ImageOutcome,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
    pub images: Vec<ImageReport>,
}

impl RunSummary {
    fn count(&self, f: impl Fn(&ImageOutcome) -> bool) -> usize {
        self.images.iter().filter(|r| f(&r.outcome)).count()
    }

    pub fn tagged(&self) -> usize {
        self.count(|o| matches!(o, ImageOutcome::Tagged { .. }))
    }

    pub fn unmatched(&self) -> usize {
        self.count(|o| matches!(o, ImageOutcome::NoMatch { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, ImageOutcome::Skipped { .. }))
    }
}

/// Geotags images against one track.
pub struct Pipeline<S = JpegStore> {
    track: Track,
    delta: CorrectionDelta,
    corrector: TimeCorrector,
    store: S,
    tolerance_seconds: f64,
    on_missing_time: MissingTimePolicy,
    dry_run: bool,
}

impl<S: MetadataStore> Pipeline<S> {
    /// Fails with `EmptyTrack` when no image could ever be matched.
    pub fn new(
        track: Track,
        delta: CorrectionDelta,
        corrector: TimeCorrector,
        store: S,
    ) -> Result<Self> {
        if track.is_empty() {
            return Err(Error::EmptyTrack);
        }

        Ok(Pipeline {
            track,
            delta,
            corrector,
            store,
            tolerance_seconds: DEFAULT_TOLERANCE_SECONDS,
            on_missing_time: MissingTimePolicy::default(),
            dry_run: false,
        })
    }

    pub fn with_tolerance(mut self, seconds: f64) -> Self {
        self.tolerance_seconds = seconds;
        self
    }

    pub fn with_missing_time_policy(mut self, policy: MissingTimePolicy) -> Self {
        self.on_missing_time = policy;
        self
    }

    /// Do everything except writing the images.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn track(&self) -> &Track {
        &self.track
    }

    /// Process every image in order. The timezone is resolved before the first image so that a
    /// lookup failure aborts the run before any file is touched.
    pub fn run(&self, images: &[PathBuf]) -> Result<RunSummary> {
        let zone = self.corrector.timezone(&self.track)?;
        info!(
            "tagging {} images against {} track points in {} (correction {}, tolerance {}s)",
            images.len(),
            self.track.len(),
            zone.name(),
            self.delta,
            self.tolerance_seconds
        );

        let mut summary = RunSummary::default();
        for path in images {
            let outcome = self.process_image(path)?;
            summary.images.push(ImageReport {
                path: path.clone(),
                outcome,
            });
        }

        info!(
            "done: {} tagged, {} without a match, {} skipped",
            summary.tagged(),
            summary.unmatched(),
            summary.skipped()
        );
        Ok(summary)
    }

    pub fn process_image(&self, path: &Path) -> Result<ImageOutcome> {
        let span = info_span!("image", path = %path.display());
        let _enter = span.enter();

        let mut exif = self.store.load(path)?;
        match self.tag_exif(&mut exif, path) {
            Ok(outcome) => {
                if self.dry_run {
                    debug!("dry run, not writing");
                } else {
                    self.store.save(path, &exif)?;
                }
                Ok(outcome)
            }
            Err(e)
                if e.is_capture_time_error() && self.on_missing_time == MissingTimePolicy::Skip =>
            {
                warn!("skipping: {}", e);
                Ok(ImageOutcome::Skipped {
                    reason: e.to_string(),
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Correct the capture time in `exif` and, if the track has a point close enough, replace its
    /// GPS data. `path` only labels errors.
    pub fn tag_exif(&self, exif: &mut ExifData, path: &Path) -> Result<ImageOutcome> {
        let text = exif
            .capture_time_text()
            .ok_or_else(|| Error::MissingCaptureTime(path.to_path_buf()))?;
        let raw = time::parse_capture_time(&text).ok_or_else(|| Error::InvalidCaptureTime {
            path: path.to_path_buf(),
            text: text.clone(),
        })?;

        let local = self.delta.apply(raw)?;
        let capture_time_utc = self.corrector.to_utc(local, &self.track)?;
        exif.set_capture_time(&time::format_capture_time(local));

        let (point, matched) = matcher::nearest_point(&self.track, capture_time_utc)?;
        if !matched.is_within(self.tolerance_seconds) {
            info!(
                "no track point within {}s of {} UTC, nearest is {}s away",
                self.tolerance_seconds, capture_time_utc, matched.time_difference_seconds
            );
            return Ok(ImageOutcome::NoMatch {
                capture_time_utc,
                nearest: matched,
            });
        }

        let encoding = GeoEncoding::from_point(point)?;
        exif.set_gps_ifd(encoding.to_ifd());
        info!(
            "matched {} UTC to the point at {} ({}s), lat={} lon={} alt={}",
            capture_time_utc,
            matched.matched_timestamp,
            matched.time_difference_seconds,
            point.latitude,
            point.longitude,
            point.altitude
        );

        Ok(ImageOutcome::Tagged {
            capture_time_utc,
            matched,
            encoding,
        })
    }
}

#[cfg(test)]
mod test {
    use super::{ImageOutcome, MetadataStore, MissingTimePolicy, Pipeline};
    use crate::{
        correction::CorrectionDelta,
        exif::{gps::Rational, ExifData, IFDEntry, IFDTag, TIFFByteAlignment, IFD},
        time::{FixedTimezone, TimeCorrector, TimezoneResolver},
        track::{point_at, Dialect, Track},
        Error, Result,
    };
    use chrono::{NaiveDate, NaiveDateTime};
    use chrono_tz::Tz;
    use std::{
        cell::RefCell,
        collections::HashMap,
        path::{Path, PathBuf},
    };

    #[derive(Default)]
    struct MemoryStore {
        images: RefCell<HashMap<PathBuf, ExifData>>,
        saves: RefCell<Vec<PathBuf>>,
    }

    impl MemoryStore {
        fn with_image(self, name: &str, capture_time: Option<&str>) -> Self {
            let mut exif = ExifData::new(TIFFByteAlignment::LittleEndian);
            if let Some(t) = capture_time {
                exif.set_capture_time(t);
            }
            self.images.borrow_mut().insert(PathBuf::from(name), exif);
            self
        }

        fn get(&self, name: &str) -> ExifData {
            self.images.borrow()[Path::new(name)].clone()
        }
    }

    impl MetadataStore for MemoryStore {
        fn load(&self, path: &Path) -> Result<ExifData> {
            self.images.borrow().get(path).cloned().ok_or_else(|| {
                Error::io(std::io::ErrorKind::NotFound.into(), path)
            })
        }

        fn save(&self, path: &Path, exif: &ExifData) -> Result<()> {
            self.images
                .borrow_mut()
                .insert(path.to_path_buf(), exif.clone());
            self.saves.borrow_mut().push(path.to_path_buf());
            Ok(())
        }
    }

    fn utc(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2021, 6, 1)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    fn track() -> Track {
        let mut point = point_at(utc(12, 0, 0), 52.04561, 4.45885);
        point.altitude = 10.;
        vec![point].into_iter().collect()
    }

    fn pipeline<'a>(store: &'a MemoryStore, correction: &str) -> Pipeline<&'a MemoryStore> {
        Pipeline::new(
            track(),
            CorrectionDelta::parse(correction).unwrap(),
            TimeCorrector::new(FixedTimezone(chrono_tz::Europe::Amsterdam)),
            store,
        )
        .unwrap()
    }

    fn paths(names: &[&str]) -> Vec<PathBuf> {
        names.iter().map(PathBuf::from).collect()
    }

    fn gps_entry(exif: &ExifData, tag: IFDTag) -> Option<IFDEntry> {
        exif.gps_ifd().and_then(|ifd| ifd.entry(tag)).cloned()
    }

    #[test]
    fn test_tags_image_within_tolerance() {
        // 14:00:02 in Amsterdam summer time is 12:00:02 UTC, two seconds after the point.
        let store = MemoryStore::default().with_image("a.jpg", Some("2021:06:01 14:00:02"));
        let summary = pipeline(&store, "+00:00:00:00")
            .run(&paths(&["a.jpg"]))
            .unwrap();
        assert_eq!(summary.tagged(), 1);

        match &summary.images[0].outcome {
            ImageOutcome::Tagged {
                capture_time_utc,
                matched,
                ..
            } => {
                assert_eq!(*capture_time_utc, utc(12, 0, 2));
                assert_eq!(matched.time_difference_seconds, 2.);
            }
            other => panic!("expected a tagged image, got {:?}", other),
        }

        let exif = store.get("a.jpg");
        let text = |tag| gps_entry(&exif, tag).and_then(|e| e.as_str().map(str::to_string));
        assert_eq!(text(IFDTag::GPSLatitudeRef).as_deref(), Some("N"));
        assert_eq!(text(IFDTag::GPSLongitudeRef).as_deref(), Some("E"));
        assert_eq!(text(IFDTag::GPSDateStamp).as_deref(), Some("2021:06:01"));
        assert_eq!(
            gps_entry(&exif, IFDTag::GPSAltitudeRef),
            Some(IFDEntry::bytes(IFDTag::GPSAltitudeRef, &[0]))
        );
        assert_eq!(
            gps_entry(&exif, IFDTag::GPSLatitude),
            Some(IFDEntry::rationals(
                IFDTag::GPSLatitude,
                &[
                    Rational::integer(52),
                    Rational::integer(2),
                    Rational::new(441960000, 10000000)
                ]
            ))
        );

        let (lat, lon) = exif.gps_location().unwrap();
        assert!((lat - 52.04561).abs() < 1e-8);
        assert!((lon - 4.45885).abs() < 1e-8);
    }

    #[test]
    fn test_corrected_time_is_written_back() {
        // Camera clock one hour slow.
        let store = MemoryStore::default().with_image("a.jpg", Some("2021:06:01 13:00:02"));
        let summary = pipeline(&store, "+00:01:00:00")
            .run(&paths(&["a.jpg"]))
            .unwrap();
        assert_eq!(summary.tagged(), 1);
        assert_eq!(
            store.get("a.jpg").capture_time_text().as_deref(),
            Some("2021:06:01 14:00:02")
        );
    }

    #[test]
    fn test_outside_tolerance_only_corrects_time() {
        let store = MemoryStore::default()
            .with_image("far.jpg", Some("2021:06:01 13:50:00"))
            .with_image("edge.jpg", Some("2021:06:01 14:05:00"));
        let summary = pipeline(&store, "+00:00:00:10")
            .run(&paths(&["far.jpg", "edge.jpg"]))
            .unwrap();

        assert_eq!(summary.tagged(), 0);
        assert_eq!(summary.unmatched(), 2);
        match &summary.images[1].outcome {
            ImageOutcome::NoMatch { nearest, .. } => {
                assert_eq!(nearest.time_difference_seconds, 310.)
            }
            other => panic!("expected no match, got {:?}", other),
        }

        let far = store.get("far.jpg");
        assert!(far.gps_ifd().is_none());
        assert_eq!(far.capture_time_text().as_deref(), Some("2021:06:01 13:50:10"));
        assert_eq!(store.saves.borrow().len(), 2);
    }

    #[test]
    fn test_tolerance_boundary() {
        let store = MemoryStore::default().with_image("a.jpg", Some("2021:06:01 14:05:00"));
        let outcome = pipeline(&store, "+00:00:00:00")
            .process_image(Path::new("a.jpg"))
            .unwrap();
        assert!(matches!(outcome, ImageOutcome::NoMatch { .. }));

        let outcome = pipeline(&store, "+00:00:00:00")
            .with_tolerance(301.)
            .process_image(Path::new("a.jpg"))
            .unwrap();
        assert!(matches!(outcome, ImageOutcome::Tagged { .. }));
    }

    #[test]
    fn test_sub_second_difference_under_tolerance_is_tagged() {
        let doc = r#"<gpx><trk><trkseg>
            <trkpt lat="52.04561" lon="4.45885"><ele>10</ele><time>2021-06-01T11:55:00.500Z</time></trkpt>
            </trkseg></trk></gpx>"#;
        let store = MemoryStore::default().with_image("a.jpg", Some("2021:06:01 14:00:00"));
        let pipeline = Pipeline::new(
            crate::track::load(doc, Dialect::Strava).unwrap(),
            CorrectionDelta::default(),
            TimeCorrector::new(FixedTimezone(chrono_tz::Europe::Amsterdam)),
            &store,
        )
        .unwrap();

        let summary = pipeline.run(&paths(&["a.jpg"])).unwrap();
        match &summary.images[0].outcome {
            ImageOutcome::Tagged { matched, .. } => {
                assert_eq!(matched.time_difference_seconds, 299.5)
            }
            other => panic!("expected a tagged image, got {:?}", other),
        }
        assert_eq!(*store.saves.borrow(), vec![PathBuf::from("a.jpg")]);
        assert!(store.get("a.jpg").gps_location().is_some());
    }

    #[test]
    fn test_replaces_existing_gps_data() {
        let store = MemoryStore::default().with_image("a.jpg", Some("2021:06:01 14:00:02"));
        {
            let mut images = store.images.borrow_mut();
            let exif = images.get_mut(Path::new("a.jpg")).unwrap();
            let mut old = IFD::default();
            old.set_entry(IFDEntry::ascii(IFDTag::GPSSpeedRef, "M"));
            old.set_entry(IFDEntry::ascii(IFDTag::GPSLatitudeRef, "S"));
            exif.set_gps_ifd(old);
        }

        pipeline(&store, "+00:00:00:00")
            .run(&paths(&["a.jpg"]))
            .unwrap();
        let exif = store.get("a.jpg");
        assert!(gps_entry(&exif, IFDTag::GPSSpeedRef).is_none());
        assert_eq!(
            gps_entry(&exif, IFDTag::GPSLatitudeRef),
            Some(IFDEntry::ascii(IFDTag::GPSLatitudeRef, "N"))
        );
    }

    #[test]
    fn test_missing_capture_time_policy() {
        let store = MemoryStore::default()
            .with_image("a.jpg", None)
            .with_image("b.jpg", Some("2021:06:01 14:00:02"))
            .with_image("c.jpg", Some("not a date"));
        let images = paths(&["a.jpg", "b.jpg", "c.jpg"]);

        match pipeline(&store, "+00:00:00:00").run(&images) {
            Err(Error::MissingCaptureTime(path)) => assert_eq!(path, PathBuf::from("a.jpg")),
            other => panic!("expected a missing capture time, got {:?}", other),
        }
        assert!(store.saves.borrow().is_empty());

        let summary = pipeline(&store, "+00:00:00:00")
            .with_missing_time_policy(MissingTimePolicy::Skip)
            .run(&images)
            .unwrap();
        assert_eq!(summary.skipped(), 2);
        assert_eq!(summary.tagged(), 1);
        assert_eq!(*store.saves.borrow(), vec![PathBuf::from("b.jpg")]);
    }

    #[test]
    fn test_dry_run_writes_nothing() {
        let store = MemoryStore::default().with_image("a.jpg", Some("2021:06:01 14:00:02"));
        let summary = pipeline(&store, "+00:00:00:00")
            .dry_run(true)
            .run(&paths(&["a.jpg"]))
            .unwrap();
        assert_eq!(summary.tagged(), 1);
        assert!(store.saves.borrow().is_empty());
        assert!(store.get("a.jpg").gps_ifd().is_none());
    }

    #[test]
    fn test_fatal_conditions_abort_before_any_image() {
        struct NowhereResolver;

        impl TimezoneResolver for NowhereResolver {
            fn resolve(&self, _: f64, _: f64) -> Option<Tz> {
                None
            }
        }

        let store = MemoryStore::default().with_image("a.jpg", Some("2021:06:01 14:00:02"));
        let result = Pipeline::new(
            Track::new(),
            CorrectionDelta::default(),
            TimeCorrector::new(FixedTimezone(Tz::UTC)),
            &store,
        );
        assert!(matches!(result, Err(Error::EmptyTrack)));

        let pipeline = Pipeline::new(
            track(),
            CorrectionDelta::default(),
            TimeCorrector::new(NowhereResolver),
            &store,
        )
        .unwrap();
        assert!(matches!(
            pipeline.run(&paths(&["a.jpg"])),
            Err(Error::TimezoneResolution { .. })
        ));
        assert!(store.saves.borrow().is_empty());
    }
}
