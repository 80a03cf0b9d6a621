//! The correction delta applied to every image's capture time.
//!
//! A camera whose clock is known to be off by a fixed amount is corrected with a delta written as
//! `+DD:HH:MM:SS` (move the capture time forward) or `-DD:HH:MM:SS` (move it back).

use crate::{Error, Result};
use chrono::{Duration, NaiveDateTime};
use nom::{
    character::complete::{char, digit1, one_of},
    combinator::{all_consuming, map_res},
    error::{context, convert_error, VerboseError},
    sequence::{preceded, tuple},
};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

type StrResult<'a, O> = nom::IResult<&'a str, O, VerboseError<&'a str>>;

/// A signed `days:hours:minutes:seconds` offset. A single sign governs all four components, so
/// they are either all non-negative or all non-positive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrectionDelta {
    days: i64,
    hours: i64,
    minutes: i64,
    seconds: i64,
}

impl CorrectionDelta {
    /// Parse a delta of the form `±DD:HH:MM:SS`.
    pub fn parse(text: &str) -> Result<Self> {
        let trimmed = text.trim();
        let (_, (sign, d, h, m, s)) =
            all_consuming(Self::parse_fields)(trimmed).map_err(|e| {
                let reason = match e {
                    nom::Err::Error(e) | nom::Err::Failure(e) => convert_error(trimmed, e),
                    nom::Err::Incomplete(_) => "incomplete input".to_string(),
                };
                Error::Format {
                    text: text.to_string(),
                    reason: reason.trim_end().to_string(),
                }
            })?;

        let factor = if sign == '-' { -1 } else { 1 };
        Ok(CorrectionDelta {
            days: factor * i64::from(d),
            hours: factor * i64::from(h),
            minutes: factor * i64::from(m),
            seconds: factor * i64::from(s),
        })
    }

    fn parse_fields(i: &str) -> StrResult<(char, u32, u32, u32, u32)> {
        fn field(i: &str) -> StrResult<u32> {
            context("numeric field", map_res(digit1, |x: &str| x.parse::<u32>()))(i)
        }

        tuple((
            context("sign (+ or -)", one_of("+-")),
            context("days", field),
            context("hours", preceded(char(':'), field)),
            context("minutes", preceded(char(':'), field)),
            context("seconds", preceded(char(':'), field)),
        ))(i)
    }

    /// The `(days, hours, minutes, seconds)` components with the sign applied.
    pub fn components(&self) -> (i64, i64, i64, i64) {
        (self.days, self.hours, self.minutes, self.seconds)
    }

    pub fn is_negative(&self) -> bool {
        self.days < 0 || self.hours < 0 || self.minutes < 0 || self.seconds < 0
    }

    pub fn is_zero(&self) -> bool {
        self.to_duration().is_zero()
    }

    pub fn to_duration(&self) -> Duration {
        Duration::days(self.days)
            + Duration::hours(self.hours)
            + Duration::minutes(self.minutes)
            + Duration::seconds(self.seconds)
    }

    /// Add the delta to a timezone-naive timestamp.
    pub fn apply(&self, time: NaiveDateTime) -> Result<NaiveDateTime> {
        time.checked_add_signed(self.to_duration())
            .ok_or_else(|| Error::Format {
                text: self.to_string(),
                reason: format!("correcting {} leaves the supported date range", time),
            })
    }
}

impl FromStr for CorrectionDelta {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for CorrectionDelta {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let sign = if self.is_negative() { '-' } else { '+' };
        write!(
            f,
            "{}{:02}:{:02}:{:02}:{:02}",
            sign,
            self.days.abs(),
            self.hours.abs(),
            self.minutes.abs(),
            self.seconds.abs()
        )
    }
}

#[cfg(test)]
mod test {
    use super::CorrectionDelta;
    use crate::Error;
    use chrono::{Duration, NaiveDate};

    #[test]
    fn test_parse_correction_delta() {
        let cases = [
            ("+01:01:01:01", (1, 1, 1, 1)),
            ("-01:01:01:01", (-1, -1, -1, -1)),
            ("+00:01:00:00", (0, 1, 0, 0)),
            ("-00:01:00:00", (0, -1, 0, 0)),
            ("+00:00:00:00", (0, 0, 0, 0)),
            (" -3:12:30:05\n", (-3, -12, -30, -5)),
        ];

        for (text, expected) in cases.iter() {
            let delta = CorrectionDelta::parse(text).unwrap();
            assert_eq!(delta.components(), *expected, "parsing {:?}", text);
        }
    }

    #[test]
    fn test_signs_are_uniform() {
        for text in ["+02:03:04:05", "-02:03:04:05", "-00:00:00:07", "+00:00:00:00"].iter() {
            let (d, h, m, s) = CorrectionDelta::parse(text).unwrap().components();
            if text.starts_with('-') {
                assert!(d <= 0 && h <= 0 && m <= 0 && s <= 0);
            } else {
                assert!(d >= 0 && h >= 0 && m >= 0 && s >= 0);
            }
        }
    }

    #[test]
    fn test_zero_delta() {
        let delta = CorrectionDelta::parse("+00:00:00:00").unwrap();
        assert!(delta.is_zero());
        assert_eq!(delta.to_duration(), Duration::zero());
        assert_eq!(delta, CorrectionDelta::default());
    }

    #[test]
    fn test_duration_and_apply() {
        let delta = CorrectionDelta::parse("-01:02:03:04").unwrap();
        assert_eq!(
            delta.to_duration(),
            -(Duration::days(1) + Duration::hours(2) + Duration::minutes(3) + Duration::seconds(4))
        );

        let time = NaiveDate::from_ymd_opt(2021, 6, 2)
            .unwrap()
            .and_hms_opt(14, 3, 4)
            .unwrap();
        let expected = NaiveDate::from_ymd_opt(2021, 6, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        assert_eq!(delta.apply(time).unwrap(), expected);
    }

    #[test]
    fn test_rejects_malformed_input() {
        let bad = [
            "",
            "01:01:01:01",
            "+01:01:01",
            "+01:01:01:01:01",
            "+aa:01:01:01",
            "*01:01:01:01",
            "+01:01:01:-1",
            "+01;01;01;01",
        ];
        for text in bad.iter() {
            match CorrectionDelta::parse(text) {
                Err(Error::Format { text: t, .. }) => assert_eq!(&t, text),
                other => panic!("expected a format error for {:?}, got {:?}", text, other),
            }
        }
    }

    #[test]
    fn test_display_roundtrips() {
        for text in ["+01:02:03:04", "-10:00:00:59"].iter() {
            let delta: CorrectionDelta = text.parse().unwrap();
            assert_eq!(&delta.to_string(), text);
        }
    }
}
