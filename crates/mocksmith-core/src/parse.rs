//! Parsers for the alternate text representations the validator accepts.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;

const TIME_FORMATS: &[&str] = &["%H:%M:%S%.f", "%H:%M:%S", "%H:%M"];
const NAIVE_TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];
const ZONED_TIMESTAMP_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%:z"];

/// Timestamp text with or without an explicit offset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum ParsedTimestamp {
    Naive(NaiveDateTime),
    Zoned(DateTime<FixedOffset>),
}

pub(crate) fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" | "t" | "y" | "on" => Some(true),
        "false" | "no" | "0" | "f" | "n" | "off" => Some(false),
        _ => None,
    }
}

pub(crate) fn parse_decimal(raw: &str) -> Option<Decimal> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if raw.contains(['e', 'E']) {
        return Decimal::from_scientific(raw).ok();
    }
    Decimal::from_str_exact(raw).ok()
}

pub(crate) fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}

pub(crate) fn parse_time(raw: &str) -> Option<NaiveTime> {
    let raw = raw.trim();
    TIME_FORMATS
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(raw, format).ok())
}

pub(crate) fn parse_timestamp(raw: &str) -> Option<ParsedTimestamp> {
    let raw = raw.trim();
    if let Ok(value) = DateTime::parse_from_rfc3339(raw) {
        return Some(ParsedTimestamp::Zoned(value));
    }
    if let Some(value) = ZONED_TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| DateTime::parse_from_str(raw, format).ok())
    {
        return Some(ParsedTimestamp::Zoned(value));
    }
    if let Some(value) = NAIVE_TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
    {
        return Some(ParsedTimestamp::Naive(value));
    }
    parse_date(raw)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(ParsedTimestamp::Naive)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamps_keep_their_offset() {
        let parsed = parse_timestamp("2024-03-15T14:30:45.123+02:00").unwrap();
        let ParsedTimestamp::Zoned(value) = parsed else {
            panic!("expected zoned timestamp");
        };
        assert_eq!(value.offset().local_minus_utc(), 7200);

        let parsed = parse_timestamp("2024-03-15 14:30").unwrap();
        assert!(matches!(parsed, ParsedTimestamp::Naive(_)));

        let parsed = parse_timestamp("2024-03-15").unwrap();
        assert_eq!(
            parsed,
            ParsedTimestamp::Naive(
                NaiveDate::from_ymd_opt(2024, 3, 15)
                    .unwrap()
                    .and_hms_opt(0, 0, 0)
                    .unwrap()
            )
        );
        assert!(parse_timestamp("15/03/2024").is_none());
    }

    #[test]
    fn decimals_parse_exactly() {
        assert_eq!(parse_decimal(" 123.45 ").unwrap().to_string(), "123.45");
        assert_eq!(parse_decimal("1.5e2").unwrap(), Decimal::from(150));
        assert!(parse_decimal("12a").is_none());
        assert!(parse_decimal("").is_none());
    }

    #[test]
    fn times_with_and_without_seconds() {
        assert_eq!(
            parse_time("14:30").unwrap(),
            NaiveTime::from_hms_opt(14, 30, 0).unwrap()
        );
        assert_eq!(
            parse_time("14:30:45.5").unwrap(),
            NaiveTime::from_hms_milli_opt(14, 30, 45, 500).unwrap()
        );
    }
}
