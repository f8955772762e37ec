use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::ser::{Serialize, Serializer};
use time::format_description::FormatItem;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime, Time};

use crate::error::{Error, Result};

use super::ser::DATETIME_TOKEN;

/// A wire `dateTime.iso8601` value, kept to the second.
///
/// The wire form carries no offset: a value built from a zoned date keeps
/// its local clock time and drops the offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DateTime(PrimitiveDateTime);

const WITH_TIME: &[&[FormatItem<'static>]] = &[
    format_description!("[year][month][day]T[hour]:[minute]:[second]"),
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
    format_description!("[year][month][day]T[hour]:[minute]"),
    format_description!("[year]-[month]-[day]T[hour]:[minute]"),
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
    format_description!("[year]-[month]-[day] [hour]:[minute]"),
];

const DATE_ONLY: &[&[FormatItem<'static>]] = &[
    format_description!("[year]-[month]-[day]"),
    format_description!("[year]/[month]/[day]"),
];

fn zone_suffix() -> &'static Regex {
    static ZONE: OnceLock<Regex> = OnceLock::new();
    ZONE.get_or_init(|| {
        Regex::new(r"(?i)^(.*?\d:\d\d(?::\d\d)?)(?:[.,]\d+)?\s*(?:z|utc|gmt|[+-]\d\d(?::?\d\d)?)?$").unwrap()
    })
}

fn is_numeric(s: &str) -> bool {
    let s = s.trim();
    !s.is_empty() && s.parse::<f64>().is_ok() && s.chars().any(|c| c.is_ascii_digit())
}

impl DateTime {
    pub fn new(datetime: PrimitiveDateTime) -> DateTime {
        // sub-second precision does not survive the wire format
        let time = datetime.time();
        let time = Time::from_hms(time.hour(), time.minute(), time.second()).unwrap_or(time);
        DateTime(PrimitiveDateTime::new(datetime.date(), time))
    }

    /// A unix timestamp, read as UTC.
    pub fn from_timestamp(timestamp: i64) -> Result<DateTime> {
        OffsetDateTime::from_unix_timestamp(timestamp)
            .map(DateTime::from)
            .map_err(|e| Error::value(format!("Invalid timestamp {}: {}", timestamp, e)))
    }

    /// Parses a timestamp or one of the common ISO-8601 spellings.
    pub fn parse(input: &str) -> Result<DateTime> {
        let trimmed = input.trim();
        if is_numeric(trimmed) {
            let timestamp = trimmed.parse::<f64>().map(|f| f as i64).unwrap_or(0);
            return DateTime::from_timestamp(timestamp);
        }

        if let Some(captures) = zone_suffix().captures(trimmed) {
            let local = captures.get(1).map_or(trimmed, |m| m.as_str());
            for format in WITH_TIME {
                if let Ok(parsed) = PrimitiveDateTime::parse(local, *format) {
                    return Ok(DateTime::new(parsed));
                }
            }
        }
        for format in DATE_ONLY {
            if let Ok(date) = Date::parse(trimmed, *format) {
                return Ok(DateTime(date.midnight()));
            }
        }

        Err(Error::value(format!(
            "Unable to parse '{}' as a dateTime.iso8601 value",
            input
        )))
    }

    pub fn as_primitive(&self) -> PrimitiveDateTime {
        self.0
    }

    /// Seconds since the epoch, reading the clock time as UTC.
    pub fn timestamp(&self) -> i64 {
        self.0.assume_utc().unix_timestamp()
    }
}

impl fmt::Display for DateTime {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let (date, time) = (self.0.date(), self.0.time());
        write!(
            f,
            "{:04}{:02}{:02}T{:02}:{:02}:{:02}",
            date.year(),
            u8::from(date.month()),
            date.day(),
            time.hour(),
            time.minute(),
            time.second()
        )
    }
}

impl FromStr for DateTime {
    type Err = Error;

    fn from_str(s: &str) -> Result<DateTime> {
        DateTime::parse(s)
    }
}

impl From<PrimitiveDateTime> for DateTime {
    fn from(datetime: PrimitiveDateTime) -> DateTime {
        DateTime::new(datetime)
    }
}

impl From<OffsetDateTime> for DateTime {
    fn from(datetime: OffsetDateTime) -> DateTime {
        DateTime::new(PrimitiveDateTime::new(datetime.date(), datetime.time()))
    }
}

impl From<Date> for DateTime {
    fn from(date: Date) -> DateTime {
        DateTime(date.midnight())
    }
}

impl Serialize for DateTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> ::std::result::Result<S::Ok, S::Error> {
        serializer.serialize_newtype_struct(DATETIME_TOKEN, &self.to_string())
    }
}
