//! Validator/coercer: raw value in, canonical in-domain value or a typed error out.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use crate::domain::{Bounds, EffectiveDomain, Limit, Step, is_float_multiple};
use crate::error::{Offending, ValidationError, Violation};
use crate::parse::{ParsedTimestamp, parse_bool, parse_date, parse_decimal, parse_time, parse_timestamp};
use crate::temporal::truncate_subsecond;
use crate::types::{FloatWidth, TypeDomain};
use crate::value::{Literal, Value};

/// Validate `raw` against `domain`, returning its canonical form.
///
/// Pure: the same input against the same domain always yields the same
/// value or the same error.
pub fn validate(raw: &Value, domain: &EffectiveDomain) -> Result<Value, ValidationError> {
    let check = Check { raw, domain };
    if raw.is_null() {
        return Err(check.fail(Violation::NullNotAllowed));
    }
    match domain.type_domain() {
        TypeDomain::Integer { width, signed } => check.integer(width.range(*signed)),
        TypeDomain::Decimal { precision, scale } => check.decimal(*precision, *scale),
        TypeDomain::Float { width, .. } => check.float(*width),
        TypeDomain::Boolean => check.boolean(),
        TypeDomain::Date => check.date(),
        TypeDomain::Time { precision } => check.time(*precision),
        TypeDomain::Timestamp {
            precision,
            with_timezone,
        } => check.timestamp(*precision, *with_timezone),
        TypeDomain::Char { length } => check.string(Some(*length)),
        TypeDomain::Varchar { .. } | TypeDomain::Text { .. } => check.string(None),
        TypeDomain::Binary { length } => check.binary(Some(*length)),
        TypeDomain::VarBinary { .. } | TypeDomain::Blob { .. } => check.binary(None),
        TypeDomain::Choice { members } => check.choice(members),
    }
}

struct Check<'a> {
    raw: &'a Value,
    domain: &'a EffectiveDomain,
}

impl Check<'_> {
    fn fail(&self, violation: Violation) -> ValidationError {
        ValidationError::new(
            violation,
            Offending::describe(self.raw, self.domain.is_sensitive()),
        )
    }

    fn mismatch(&self) -> ValidationError {
        self.fail(Violation::TypeMismatch {
            expected: self.domain.sql_type(),
        })
    }

    fn malformed(&self, reason: &str) -> ValidationError {
        self.fail(Violation::Malformed {
            expected: self.domain.sql_type(),
            reason: reason.to_string(),
        })
    }

    fn out_of_range(&self) -> ValidationError {
        self.fail(Violation::OutOfTypeRange {
            sql_type: self.domain.sql_type(),
        })
    }

    fn below(&self, bound: impl ToString, inclusive: bool) -> ValidationError {
        self.fail(Violation::BelowMinimum {
            bound: bound.to_string(),
            inclusive,
        })
    }

    fn above(&self, bound: impl ToString, inclusive: bool) -> ValidationError {
        self.fail(Violation::AboveMaximum {
            bound: bound.to_string(),
            inclusive,
        })
    }

    fn ordered<T: PartialOrd + ToString>(
        &self,
        value: &T,
        lower: Option<&T>,
        upper: Option<&T>,
    ) -> Result<(), ValidationError> {
        if let Some(lower) = lower
            && value < lower
        {
            return Err(self.below(lower.to_string(), true));
        }
        if let Some(upper) = upper
            && value > upper
        {
            return Err(self.above(upper.to_string(), true));
        }
        Ok(())
    }

    fn integer(&self, (type_lower, type_upper): (i128, i128)) -> Result<Value, ValidationError> {
        let value = match self.raw {
            Value::Int(value) => *value,
            Value::Float(value) => {
                if !value.is_finite() || value.fract() != 0.0 {
                    return Err(self.mismatch());
                }
                if value.abs() >= 1e38 {
                    return Err(self.out_of_range());
                }
                *value as i128
            }
            Value::Decimal(value) => {
                if !value.fract().is_zero() {
                    return Err(self.mismatch());
                }
                value.to_i128().ok_or_else(|| self.out_of_range())?
            }
            Value::Text(text) => parse_integer_text(text).ok_or_else(|| self.malformed("not an integer"))?,
            _ => return Err(self.mismatch()),
        };
        if value < type_lower || value > type_upper {
            return Err(self.out_of_range());
        }
        if let Bounds::Integer { lower, upper } = self.domain.bounds() {
            self.ordered(&value, lower.as_ref(), upper.as_ref())?;
        }
        if let Some(Step::Integer(step)) = self.domain.step()
            && value.rem_euclid(step) != 0
        {
            return Err(self.fail(Violation::NotMultipleOf {
                divisor: step.to_string(),
            }));
        }
        Ok(Value::Int(value))
    }

    fn decimal(&self, precision: u32, scale: u32) -> Result<Value, ValidationError> {
        let value = match self.raw {
            Value::Decimal(value) => *value,
            Value::Int(value) => {
                Decimal::try_from_i128_with_scale(*value, 0).map_err(|_| self.out_of_range())?
            }
            Value::Float(value) => {
                if !value.is_finite() {
                    return Err(self.mismatch());
                }
                parse_decimal(&value.to_string()).ok_or_else(|| self.out_of_range())?
            }
            Value::Text(text) => parse_decimal(text).ok_or_else(|| self.malformed("not a number"))?,
            _ => return Err(self.mismatch()),
        };
        let normalized = value.normalize();
        if normalized.scale() > scale {
            return Err(self.fail(Violation::ScaleExceeded {
                scale,
                digits: normalized.scale(),
            }));
        }
        let integer_digits = integer_digits(normalized);
        if integer_digits + scale > precision {
            return Err(self.fail(Violation::PrecisionExceeded {
                precision,
                scale,
                integer_digits,
            }));
        }
        let mut canonical = normalized;
        canonical.rescale(scale);
        if let Bounds::Decimal { lower, upper } = self.domain.bounds() {
            self.ordered(&canonical, lower.as_ref(), upper.as_ref())?;
        }
        if let Some(Step::Decimal(step)) = self.domain.step()
            && !canonical.checked_rem(step).is_some_and(|rem| rem.is_zero())
        {
            return Err(self.fail(Violation::NotMultipleOf {
                divisor: step.to_string(),
            }));
        }
        Ok(Value::Decimal(canonical))
    }

    fn float(&self, width: FloatWidth) -> Result<Value, ValidationError> {
        let value = match self.raw {
            Value::Float(value) => *value,
            Value::Int(value) => *value as f64,
            Value::Decimal(value) => value.to_f64().ok_or_else(|| self.out_of_range())?,
            Value::Text(text) => text
                .trim()
                .parse::<f64>()
                .map_err(|_| self.malformed("not a number"))?,
            _ => return Err(self.mismatch()),
        };
        if !value.is_finite() {
            return Err(self.out_of_range());
        }
        if width == FloatWidth::Single && value.abs() > f64::from(f32::MAX) {
            return Err(self.out_of_range());
        }
        if let Bounds::Float { lower, upper } = self.domain.bounds() {
            if let Some(Limit {
                value: bound,
                inclusive,
            }) = *lower
                && (value < bound || (!inclusive && value == bound))
            {
                return Err(self.below(bound, inclusive));
            }
            if let Some(Limit {
                value: bound,
                inclusive,
            }) = *upper
                && (value > bound || (!inclusive && value == bound))
            {
                return Err(self.above(bound, inclusive));
            }
        }
        if let Some(Step::Float(step)) = self.domain.step()
            && !is_float_multiple(value, step)
        {
            return Err(self.fail(Violation::NotMultipleOf {
                divisor: step.to_string(),
            }));
        }
        Ok(Value::Float(value))
    }

    fn boolean(&self) -> Result<Value, ValidationError> {
        let value = match self.raw {
            Value::Bool(value) => *value,
            Value::Int(1) => true,
            Value::Int(0) => false,
            Value::Text(text) => {
                parse_bool(text).ok_or_else(|| self.malformed("not a boolean literal"))?
            }
            _ => return Err(self.mismatch()),
        };
        Ok(Value::Bool(value))
    }

    fn date(&self) -> Result<Value, ValidationError> {
        let value = match self.raw {
            Value::Date(value) => *value,
            Value::Timestamp(value) => value.date(),
            Value::TimestampTz(value) => value.naive_local().date(),
            Value::Text(text) => parse_date(text)
                .or_else(|| parse_timestamp(text).map(|parsed| local_naive(parsed).date()))
                .ok_or_else(|| self.malformed("expected YYYY-MM-DD"))?,
            _ => return Err(self.mismatch()),
        };
        if let Bounds::Date { lower, upper } = self.domain.bounds() {
            self.ordered(&value, lower.as_ref(), upper.as_ref())?;
        }
        Ok(Value::Date(value))
    }

    fn time(&self, precision: u32) -> Result<Value, ValidationError> {
        let value = match self.raw {
            Value::Time(value) => *value,
            Value::Timestamp(value) => value.time(),
            Value::TimestampTz(value) => value.time(),
            Value::Text(text) => parse_time(text)
                .or_else(|| parse_timestamp(text).map(|parsed| local_naive(parsed).time()))
                .ok_or_else(|| self.malformed("expected HH:MM[:SS[.ffffff]]"))?,
            _ => return Err(self.mismatch()),
        };
        let value: NaiveTime = truncate_subsecond(value, precision);
        if let Bounds::Time { lower, upper } = self.domain.bounds() {
            self.ordered(&value, lower.as_ref(), upper.as_ref())?;
        }
        Ok(Value::Time(value))
    }

    fn timestamp(&self, precision: u32, with_timezone: bool) -> Result<Value, ValidationError> {
        let parsed = match self.raw {
            Value::Timestamp(value) => ParsedTimestamp::Naive(*value),
            Value::TimestampTz(value) => ParsedTimestamp::Zoned(*value),
            Value::Date(value) => ParsedTimestamp::Naive(midnight(*value)),
            Value::Text(text) => {
                parse_timestamp(text).ok_or_else(|| self.malformed("expected an ISO 8601 timestamp"))?
            }
            _ => return Err(self.mismatch()),
        };
        let (canonical, utc) = match (parsed, with_timezone) {
            (ParsedTimestamp::Naive(value), true) => {
                let value = truncate_subsecond(value, precision);
                let zoned: DateTime<FixedOffset> = value.and_utc().fixed_offset();
                (Value::TimestampTz(zoned), value)
            }
            (ParsedTimestamp::Zoned(value), true) => {
                let value = truncate_subsecond(value, precision);
                (Value::TimestampTz(value), value.naive_utc())
            }
            (ParsedTimestamp::Naive(value), false) => {
                let value = truncate_subsecond(value, precision);
                (Value::Timestamp(value), value)
            }
            (ParsedTimestamp::Zoned(_), false) => {
                return Err(self.fail(Violation::TimezoneNotAllowed));
            }
        };
        if let Bounds::Timestamp { lower, upper } = self.domain.bounds() {
            self.ordered(&utc, lower.as_ref(), upper.as_ref())?;
        }
        Ok(canonical)
    }

    fn string(&self, pad_to: Option<usize>) -> Result<Value, ValidationError> {
        let Value::Text(raw) = self.raw else {
            return Err(self.mismatch());
        };
        let rules = self.domain.text();
        let transformed = rules.transform(raw);
        let content = if pad_to.is_some() {
            transformed.trim_end_matches(' ')
        } else {
            transformed.as_str()
        };

        let length = self.domain.length();
        let actual = content.chars().count();
        if let Some(max) = length.max
            && actual > max
        {
            return Err(self.fail(Violation::LengthExceeded { max, actual }));
        }
        if let Some(expected) = length.exact
            && actual != expected
        {
            return Err(self.fail(Violation::LengthMismatch { expected, actual }));
        }
        if actual < length.min {
            return Err(self.fail(Violation::TooShort {
                min: length.min,
                actual,
            }));
        }
        if let Some(prefix) = &rules.prefix
            && !starts_with_padded(content, prefix, pad_to)
        {
            return Err(self.fail(Violation::MissingPrefix {
                prefix: prefix.clone(),
            }));
        }
        if let Some(suffix) = &rules.suffix
            && !content.ends_with(suffix.as_str())
        {
            return Err(self.fail(Violation::MissingSuffix {
                suffix: suffix.clone(),
            }));
        }
        if let Some(pattern) = &rules.pattern
            && !pattern.is_match(content)
        {
            return Err(self.fail(Violation::PatternMismatch {
                pattern: pattern.source().to_string(),
            }));
        }
        if let Some(kind) = self.domain.semantic()
            && let Some(format) = kind.format_name()
            && !kind.check_format(content)
        {
            return Err(self.fail(Violation::InvalidFormat { format }));
        }

        let mut canonical = content.to_string();
        if let Some(width) = pad_to {
            canonical.extend(std::iter::repeat_n(' ', width - actual));
        }
        Ok(Value::Text(canonical))
    }

    fn binary(&self, pad_to: Option<usize>) -> Result<Value, ValidationError> {
        let mut bytes = match self.raw {
            Value::Bytes(bytes) => bytes.clone(),
            // Text that decodes as hex is taken as hex, matching the wire form
            // `flatten` writes; anything else is its UTF-8 bytes.
            Value::Text(text) => hex::decode(text).unwrap_or_else(|_| text.as_bytes().to_vec()),
            _ => return Err(self.mismatch()),
        };
        let length = self.domain.length();
        let actual = bytes.len();
        if let Some(max) = length.max
            && actual > max
        {
            return Err(self.fail(Violation::LengthExceeded { max, actual }));
        }
        if let Some(expected) = length.exact
            && actual != expected
        {
            return Err(self.fail(Violation::LengthMismatch { expected, actual }));
        }
        if actual < length.min {
            return Err(self.fail(Violation::TooShort {
                min: length.min,
                actual,
            }));
        }
        if let Some(width) = pad_to {
            bytes.resize(width, 0);
        }
        Ok(Value::Bytes(bytes))
    }

    fn choice(&self, members: &[Literal]) -> Result<Value, ValidationError> {
        members
            .iter()
            .find(|member| member_matches(member, self.raw))
            .map(Literal::to_value)
            .ok_or_else(|| self.fail(Violation::NotAMember))
    }
}

/// Prefix check for fixed-width text sees the trailing padding, so a prefix
/// ending in spaces still matches a value padded up to it.
fn starts_with_padded(content: &str, prefix: &str, pad_to: Option<usize>) -> bool {
    if content.starts_with(prefix) {
        return true;
    }
    let Some(width) = pad_to else {
        return false;
    };
    let padding = width.saturating_sub(content.chars().count());
    let mut padded = String::with_capacity(content.len() + padding);
    padded.push_str(content);
    padded.extend(std::iter::repeat_n(' ', padding));
    padded.starts_with(prefix)
}

fn parse_integer_text(text: &str) -> Option<i128> {
    let text = text.trim();
    if let Ok(value) = text.parse::<i128>() {
        return Some(value);
    }
    let value = parse_decimal(text)?;
    if value.fract().is_zero() {
        value.to_i128()
    } else {
        None
    }
}

fn integer_digits(value: Decimal) -> u32 {
    let whole = value.trunc().normalize();
    whole
        .mantissa()
        .unsigned_abs()
        .checked_ilog10()
        .map_or(0, |digits| digits + 1)
}

fn member_matches(member: &Literal, raw: &Value) -> bool {
    match (member, raw) {
        (Literal::Bool(expected), Value::Bool(value)) => expected == value,
        (Literal::Int(expected), Value::Int(value)) => i128::from(*expected) == *value,
        (Literal::Int(expected), Value::Float(value)) => *expected as f64 == *value,
        (Literal::Int(expected), Value::Text(text)) => text.trim().parse::<i64>() == Ok(*expected),
        (Literal::UInt(expected), Value::Int(value)) => i128::from(*expected) == *value,
        (Literal::UInt(expected), Value::Text(text)) => text.trim().parse::<u64>() == Ok(*expected),
        (Literal::Float(expected), Value::Float(value)) => expected == value,
        (Literal::Float(expected), Value::Int(value)) => *expected == *value as f64,
        (Literal::Text(expected), Value::Text(value)) => expected == value,
        _ => false,
    }
}

fn local_naive(parsed: ParsedTimestamp) -> NaiveDateTime {
    match parsed {
        ParsedTimestamp::Naive(value) => value,
        ParsedTimestamp::Zoned(value) => value.naive_local(),
    }
}

fn midnight(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::ConstraintSet;
    use crate::domain::compose;

    fn domain(tdd: TypeDomain) -> EffectiveDomain {
        EffectiveDomain::new(tdd).unwrap()
    }

    #[test]
    fn integer_digits_ignore_fraction() {
        assert_eq!(integer_digits(Decimal::new(12345, 2)), 3);
        assert_eq!(integer_digits(Decimal::new(5, 1)), 0);
        assert_eq!(integer_digits(Decimal::new(-1000, 0)), 4);
    }

    #[test]
    fn integers_accept_integral_alternates() {
        let domain = domain(TypeDomain::integer());
        assert_eq!(validate(&Value::Float(42.0), &domain), Ok(Value::Int(42)));
        assert_eq!(validate(&Value::from(" 42 "), &domain), Ok(Value::Int(42)));
        assert_eq!(validate(&Value::from("4.2e1"), &domain), Ok(Value::Int(42)));
        assert_eq!(validate(&Value::from(42_u8), &domain), Ok(Value::Int(42)));

        let err = validate(&Value::Float(4.5), &domain).unwrap_err();
        assert_eq!(err.code(), "type_mismatch");
        let err = validate(&Value::Bool(true), &domain).unwrap_err();
        assert_eq!(err.code(), "type_mismatch");
        let err = validate(&Value::from("forty"), &domain).unwrap_err();
        assert!(err.is_coercion_ambiguity());
    }

    #[test]
    fn unsigned_integers_reject_negatives() {
        let domain = domain(TypeDomain::unsigned(crate::types::IntegerWidth::Small));
        assert_eq!(validate(&Value::Int(65_535), &domain), Ok(Value::Int(65_535)));
        let err = validate(&Value::Int(-1), &domain).unwrap_err();
        assert_eq!(err.code(), "out_of_type_range");
    }

    #[test]
    fn decimals_rescale_to_declared_scale() {
        let domain = domain(TypeDomain::decimal(5, 2));
        let value = validate(&Value::from("1.5"), &domain).unwrap();
        assert_eq!(value.to_string(), "1.50");
        let value = validate(&Value::from("2.500"), &domain).unwrap();
        assert_eq!(value.to_string(), "2.50");
        let value = validate(&Value::Float(0.1), &domain).unwrap();
        assert_eq!(value.to_string(), "0.10");
    }

    #[test]
    fn float_bounds_keep_exclusivity() {
        let domain = compose(TypeDomain::double(), ConstraintSet::new().gt(0.0).le(1.0)).unwrap();
        assert_eq!(validate(&Value::Float(1.0), &domain), Ok(Value::Float(1.0)));
        let err = validate(&Value::Float(0.0), &domain).unwrap_err();
        assert_eq!(
            err.violation,
            Violation::BelowMinimum {
                bound: "0".to_string(),
                inclusive: false
            }
        );
        let err = validate(&Value::Float(f64::NAN), &domain).unwrap_err();
        assert_eq!(err.code(), "out_of_type_range");
    }

    #[test]
    fn real_rejects_values_beyond_single_precision() {
        let domain = domain(TypeDomain::real());
        assert!(validate(&Value::Float(1e39), &domain).is_err());
        assert!(validate(&Value::Float(1e38), &domain).is_ok());
    }

    #[test]
    fn strings_apply_transforms_before_checks() {
        let domain = compose(
            TypeDomain::varchar(5),
            ConstraintSet::new().strip_whitespace().to_upper().prefix("A"),
        )
        .unwrap();
        assert_eq!(validate(&Value::from("  abc  "), &domain), Ok(Value::from("ABC")));
        let err = validate(&Value::from("bcd"), &domain).unwrap_err();
        assert_eq!(err.code(), "missing_prefix");
    }

    #[test]
    fn char_prefix_may_end_in_padding() {
        let domain = compose(TypeDomain::char(3), ConstraintSet::new().prefix("ab ")).unwrap();
        assert_eq!(validate(&Value::from("ab"), &domain), Ok(Value::from("ab ")));
        assert_eq!(validate(&Value::from("ab "), &domain), Ok(Value::from("ab ")));
        let wider = compose(TypeDomain::char(5), ConstraintSet::new().prefix("ab ")).unwrap();
        assert_eq!(validate(&Value::from("ab cd"), &wider), Ok(Value::from("ab cd")));
        let err = validate(&Value::from("abcd"), &wider).unwrap_err();
        assert_eq!(err.code(), "missing_prefix");
    }

    #[test]
    fn zoned_input_gives_its_local_date() {
        let domain = domain(TypeDomain::Date);
        let local = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        let zoned = DateTime::parse_from_rfc3339("2024-03-15T23:30:00-05:00").unwrap();
        assert_eq!(validate(&Value::TimestampTz(zoned), &domain), Ok(Value::Date(local)));
        assert_eq!(
            validate(&Value::from("2024-03-15T23:30:00-05:00"), &domain),
            Ok(Value::Date(local))
        );
    }

    #[test]
    fn binary_text_prefers_hex() {
        let fixed = domain(TypeDomain::Binary { length: 2 });
        assert_eq!(
            validate(&Value::from("cafe"), &fixed),
            Ok(Value::Bytes(vec![0xca, 0xfe]))
        );
        let open = domain(TypeDomain::VarBinary { max_length: 4 });
        assert_eq!(validate(&Value::from("xyz"), &open), Ok(Value::Bytes(b"xyz".to_vec())));
    }

    #[test]
    fn unsigned_choice_members_match_large_values() {
        let domain = domain(TypeDomain::choice([u64::MAX]));
        assert_eq!(
            validate(&Value::from("18446744073709551615"), &domain),
            Ok(Value::Int(i128::from(u64::MAX)))
        );
    }

    #[test]
    fn semantic_formats_are_checked() {
        let domain = compose(
            TypeDomain::varchar(100),
            ConstraintSet::new().semantic(crate::semantic::SemanticKind::Email),
        )
        .unwrap();
        assert!(validate(&Value::from("ana@example.com"), &domain).is_ok());
        let err = validate(&Value::from("not-an-email"), &domain).unwrap_err();
        assert_eq!(
            err.violation,
            Violation::InvalidFormat {
                format: "email address"
            }
        );
    }

    #[test]
    fn time_accepts_timestamps_and_truncates() {
        let domain = domain(TypeDomain::time_with_precision(3));
        let value = validate(&Value::from("2024-03-15T14:30:45.123456"), &domain).unwrap();
        assert_eq!(
            value,
            Value::Time(NaiveTime::from_hms_micro_opt(14, 30, 45, 123_000).unwrap())
        );
    }

    #[test]
    fn choice_matches_members() {
        let domain = domain(TypeDomain::choice([1, 2, 3]));
        assert_eq!(validate(&Value::from("2"), &domain), Ok(Value::Int(2)));
        assert_eq!(validate(&Value::Float(3.0), &domain), Ok(Value::Int(3)));
        assert_eq!(
            validate(&Value::Int(4), &domain).unwrap_err().code(),
            "not_a_member"
        );
    }
}
