//! Microsecond lattices for time and timestamp precision.

use chrono::{DateTime, NaiveDateTime, NaiveTime, Timelike};

use crate::types::MAX_TEMPORAL_PRECISION;

pub const MICROS_PER_SECOND: i64 = 1_000_000;
pub const MICROS_PER_DAY: i64 = 86_400 * MICROS_PER_SECOND;

/// Size of one step of the declared precision, in microseconds.
pub fn unit_micros(precision: u32) -> i64 {
    10_i64.pow(MAX_TEMPORAL_PRECISION - precision.min(MAX_TEMPORAL_PRECISION))
}

/// Drop sub-second digits finer than `precision`.
pub fn truncate_nanos(nanos: u32, precision: u32) -> u32 {
    let unit = 10_u32.pow(9 - precision.min(MAX_TEMPORAL_PRECISION));
    nanos / unit * unit
}

/// Truncate the sub-second part of a time or timestamp to `precision` digits.
pub fn truncate_subsecond<T: Timelike>(value: T, precision: u32) -> T {
    match value.with_nanosecond(truncate_nanos(value.nanosecond(), precision)) {
        Some(truncated) => truncated,
        None => value,
    }
}

pub fn time_to_micros(value: NaiveTime) -> i64 {
    let nanos = value.nanosecond().min(999_999_999);
    i64::from(value.num_seconds_from_midnight()) * MICROS_PER_SECOND + i64::from(nanos / 1_000)
}

pub fn micros_to_time(micros: i64) -> Option<NaiveTime> {
    if !(0..MICROS_PER_DAY).contains(&micros) {
        return None;
    }
    let seconds = u32::try_from(micros / MICROS_PER_SECOND).ok()?;
    let nanos = u32::try_from(micros % MICROS_PER_SECOND * 1_000).ok()?;
    NaiveTime::from_num_seconds_from_midnight_opt(seconds, nanos)
}

pub fn timestamp_to_micros(value: NaiveDateTime) -> i64 {
    value.and_utc().timestamp_micros()
}

pub fn micros_to_timestamp(micros: i64) -> Option<NaiveDateTime> {
    DateTime::from_timestamp_micros(micros).map(|value| value.naive_utc())
}

/// Largest multiple of `unit` not above `value`.
pub fn floor_to_unit(value: i64, unit: i64) -> i64 {
    value.div_euclid(unit) * unit
}

/// Smallest multiple of `unit` not below `value`.
pub fn ceil_to_unit(value: i64, unit: i64) -> i64 {
    -(-value).div_euclid(unit) * unit
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncation_never_rounds() {
        let value = NaiveTime::from_hms_micro_opt(10, 0, 0, 123_999).unwrap();
        assert_eq!(
            truncate_subsecond(value, 3),
            NaiveTime::from_hms_micro_opt(10, 0, 0, 123_000).unwrap()
        );
        assert_eq!(
            truncate_subsecond(value, 0),
            NaiveTime::from_hms_opt(10, 0, 0).unwrap()
        );
    }

    #[test]
    fn unit_rounding() {
        assert_eq!(unit_micros(6), 1);
        assert_eq!(unit_micros(3), 1_000);
        assert_eq!(floor_to_unit(-1_500, 1_000), -2_000);
        assert_eq!(ceil_to_unit(-1_500, 1_000), -1_000);
        assert_eq!(ceil_to_unit(1_500, 1_000), 2_000);
    }

    #[test]
    fn micros_round_trip() {
        let value = NaiveTime::from_hms_micro_opt(23, 59, 59, 999_999).unwrap();
        assert_eq!(micros_to_time(time_to_micros(value)), Some(value));
        assert_eq!(micros_to_time(MICROS_PER_DAY), None);
    }
}
