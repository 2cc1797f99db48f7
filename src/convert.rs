//! Conversion of raw XML text into typed property values.

use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};

use crate::error::{ReaderError, Result};

/// A timezone-aware instant read from a document.
pub type Timestamp = DateTime<FixedOffset>;

/// How a property's raw text is turned into a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Conversion {
    Text,
    Integer,
    Float,
    Timestamp,
}

impl fmt::Display for Conversion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Text => "text",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Timestamp => "timestamp",
        };
        f.write_str(name)
    }
}

/// A converted scalar property value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Integer(i64),
    Float(f64),
    Timestamp(Timestamp),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(x) => Some(*x),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<&Timestamp> {
        match self {
            Self::Timestamp(t) => Some(t),
            _ => None,
        }
    }

    pub fn conversion(&self) -> Conversion {
        match self {
            Self::Text(_) => Conversion::Text,
            Self::Integer(_) => Conversion::Integer,
            Self::Float(_) => Conversion::Float,
            Self::Timestamp(_) => Conversion::Timestamp,
        }
    }
}

/// Convert present text according to `kind`.
pub fn convert(raw: &str, kind: Conversion) -> Result<Value> {
    Ok(match kind {
        Conversion::Text => Value::Text(String::from_text(raw)?),
        Conversion::Integer => Value::Integer(i64::from_text(raw)?),
        Conversion::Float => Value::Float(f64::from_text(raw)?),
        Conversion::Timestamp => Value::Timestamp(Timestamp::from_text(raw)?),
    })
}

/// Types a property can be read as.
pub trait FromText: Sized {
    const KIND: Conversion;

    fn from_text(raw: &str) -> Result<Self>;
}

impl FromText for String {
    const KIND: Conversion = Conversion::Text;

    fn from_text(raw: &str) -> Result<Self> {
        Ok(raw.to_string())
    }
}

impl FromText for i64 {
    const KIND: Conversion = Conversion::Integer;

    fn from_text(raw: &str) -> Result<Self> {
        raw.trim()
            .parse()
            .map_err(|source| ReaderError::InvalidInteger {
                value: raw.to_string(),
                source,
            })
    }
}

impl FromText for f64 {
    const KIND: Conversion = Conversion::Float;

    fn from_text(raw: &str) -> Result<Self> {
        raw.trim()
            .parse()
            .map_err(|source| ReaderError::InvalidFloat {
                value: raw.to_string(),
                source,
            })
    }
}

impl FromText for Timestamp {
    const KIND: Conversion = Conversion::Timestamp;

    fn from_text(raw: &str) -> Result<Self> {
        parse_timestamp(raw)
    }
}

// `%#z` takes `Z`, `+HH`, `+HHMM` and `+HH:MM`.
const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%#z",
    "%Y-%m-%d %H:%M:%S%.f%#z",
    "%Y-%m-%dT%H:%M%#z",
    "%Y%m%dT%H%M%S%.f%#z",
    "%Y%m%dT%H%M%#z",
];
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y%m%dT%H%M%S%.f",
    "%Y%m%dT%H%M",
];
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y%m%d"];

/// Parse an ISO-8601 date-time into a zoned instant.
///
/// Accepts RFC 3339 (`2021-02-26T19:51:08.000Z`), times without seconds
/// (`2021-02-26T19:51Z`), hour-only or colon-less offsets (`+01`, `+0100`),
/// the basic format (`20210226T195108Z`), and date-times or bare dates
/// without an offset, which are read as UTC.
pub fn parse_timestamp(raw: &str) -> Result<Timestamp> {
    let text = raw.trim();
    let rfc3339_err = match DateTime::parse_from_rfc3339(text) {
        Ok(ts) => return Ok(ts),
        Err(e) => e,
    };
    if let Some(ts) = OFFSET_FORMATS
        .iter()
        .find_map(|fmt| DateTime::parse_from_str(text, fmt).ok())
    {
        return Ok(ts);
    }
    if let Some(naive) = NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
    {
        return Ok(naive.and_utc().fixed_offset());
    }
    if let Some(midnight) = DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
        .and_then(|d| d.and_hms_opt(0, 0, 0))
    {
        return Ok(midnight.and_utc().fixed_offset());
    }
    Err(ReaderError::InvalidTimestamp {
        value: raw.to_string(),
        source: rfc3339_err,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};

    #[test]
    fn test_text_passthrough() {
        assert_eq!(
            convert(" Running ", Conversion::Text).unwrap(),
            Value::Text(" Running ".to_string())
        );
    }

    #[test]
    fn test_numbers_trim_whitespace() {
        assert_eq!(i64::from_text("\n  150 ").unwrap(), 150);
        assert_eq!(f64::from_text(" 45.0").unwrap(), 45.0);
    }

    #[test]
    fn test_malformed_numbers_fail() {
        assert!(i64::from_text("50.0").unwrap_err().is_conversion_error());
        assert!(f64::from_text("abc").unwrap_err().is_conversion_error());
        assert!(f64::from_text("").unwrap_err().is_conversion_error());
    }

    #[test]
    fn test_rfc3339_with_millis() {
        let ts = parse_timestamp("2021-02-26T19:51:08.000Z").unwrap();
        let expected = FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2021, 2, 26, 19, 51, 8)
            .unwrap();
        assert_eq!(ts, expected);
    }

    #[test]
    fn test_offset_preserved() {
        let ts = parse_timestamp("2021-02-26T12:51:08-07:00").unwrap();
        assert_eq!(ts.offset().local_minus_utc(), -7 * 3600);
        assert_eq!(ts.hour(), 12);
    }

    #[test]
    fn test_offset_without_colon() {
        let ts = parse_timestamp("2021-02-26T12:51:08+0100").unwrap();
        assert_eq!(ts.offset().local_minus_utc(), 3600);
    }

    #[test]
    fn test_minutes_without_seconds() {
        let ts = parse_timestamp("2021-02-26T19:51Z").unwrap();
        assert_eq!(ts, parse_timestamp("2021-02-26T19:51:00Z").unwrap());
        let naive = parse_timestamp("2021-02-26T19:51").unwrap();
        assert_eq!(naive, ts);
    }

    #[test]
    fn test_hour_only_offset() {
        let ts = parse_timestamp("2021-02-26T19:51:08+01").unwrap();
        assert_eq!(ts.offset().local_minus_utc(), 3600);
        assert_eq!(ts, parse_timestamp("2021-02-26T18:51:08Z").unwrap());
        let west = parse_timestamp("2021-02-26T12:51:08-07").unwrap();
        assert_eq!(west.offset().local_minus_utc(), -7 * 3600);
    }

    #[test]
    fn test_basic_format() {
        let ts = parse_timestamp("20210226T195108Z").unwrap();
        assert_eq!(ts, parse_timestamp("2021-02-26T19:51:08Z").unwrap());
        let offset = parse_timestamp("20210226T205108+0100").unwrap();
        assert_eq!(offset, ts);
        let day = parse_timestamp("20210226").unwrap();
        assert_eq!(day, parse_timestamp("2021-02-26").unwrap());
    }

    #[test]
    fn test_naive_read_as_utc() {
        let ts = parse_timestamp("2021-02-26T19:51:08").unwrap();
        assert_eq!(ts.offset().local_minus_utc(), 0);
        assert_eq!(ts, parse_timestamp("2021-02-26T19:51:08Z").unwrap());
        let day = parse_timestamp("2021-02-26").unwrap();
        assert_eq!(day.hour(), 0);
    }

    #[test]
    fn test_bad_timestamp() {
        let err = parse_timestamp("yesterday").unwrap_err();
        assert!(matches!(err, ReaderError::InvalidTimestamp { .. }));
    }

    #[test]
    fn test_value_conversion_tag() {
        let v = convert("7", Conversion::Integer).unwrap();
        assert_eq!(v.conversion(), Conversion::Integer);
        assert_eq!(v.as_i64(), Some(7));
        assert_eq!(v.as_f64(), None);
    }
}
