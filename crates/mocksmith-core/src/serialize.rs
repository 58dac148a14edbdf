//! Wire-safe primitive form of canonical values and its inverse.

use serde::{Serialize, Serializer};
use serde_json::{Number, Value as Json};

use crate::domain::EffectiveDomain;
use crate::error::{Offending, ValidationError, Violation};
use crate::validation::validate;
use crate::value::Value;

/// Convert a canonical value into a JSON primitive.
///
/// Decimals are exact strings, binary values are lower-case hex, temporal
/// values are ISO 8601 strings. Integers outside the `i64`/`u64` range and
/// non-finite floats become strings.
pub fn to_primitive(value: &Value) -> Json {
    match value {
        Value::Null => Json::Null,
        Value::Bool(value) => Json::Bool(*value),
        Value::Int(value) => {
            if let Ok(small) = i64::try_from(*value) {
                Json::from(small)
            } else if let Ok(large) = u64::try_from(*value) {
                Json::from(large)
            } else {
                Json::String(value.to_string())
            }
        }
        Value::Float(value) => Number::from_f64(*value)
            .map(Json::Number)
            .unwrap_or_else(|| Json::String(value.to_string())),
        Value::Bytes(bytes) => Json::String(hex::encode(bytes)),
        other => Json::String(other.to_string()),
    }
}

/// Read a JSON primitive back as a raw value.
///
/// Arrays and objects have no scalar reading and return `None`. Strings stay
/// text; the validator recovers decimals, temporal values and hex binary.
pub fn from_primitive(json: &Json) -> Option<Value> {
    match json {
        Json::Null => Some(Value::Null),
        Json::Bool(value) => Some(Value::Bool(*value)),
        Json::Number(number) => {
            if let Some(value) = number.as_i64() {
                Some(Value::Int(i128::from(value)))
            } else if let Some(value) = number.as_u64() {
                Some(Value::Int(i128::from(value)))
            } else {
                number.as_f64().map(Value::Float)
            }
        }
        Json::String(text) => Some(Value::Text(text.clone())),
        Json::Array(_) | Json::Object(_) => None,
    }
}

/// Read a JSON primitive into the canonical value of `domain`.
pub fn parse_primitive(json: &Json, domain: &EffectiveDomain) -> Result<Value, ValidationError> {
    match from_primitive(json) {
        Some(raw) => validate(&raw, domain),
        None => {
            let offending = if domain.is_sensitive() {
                Offending::Length(json.to_string().chars().count())
            } else {
                Offending::Value(json.to_string())
            };
            Err(ValidationError::new(
                Violation::TypeMismatch {
                    expected: domain.sql_type(),
                },
                offending,
            ))
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        to_primitive(self).serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveTime};
    use rust_decimal::Decimal;
    use serde_json::json;

    use super::*;
    use crate::types::TypeDomain;

    #[test]
    fn primitives_follow_wire_rules() {
        assert_eq!(to_primitive(&Value::Decimal(Decimal::new(12345, 2))), json!("123.45"));
        assert_eq!(to_primitive(&Value::Bytes(vec![0xde, 0xad])), json!("dead"));
        assert_eq!(
            to_primitive(&Value::Date(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap())),
            json!("2024-02-29")
        );
        assert_eq!(
            to_primitive(&Value::Time(NaiveTime::from_hms_micro_opt(8, 5, 0, 250_000).unwrap())),
            json!("08:05:00.250")
        );
        assert_eq!(to_primitive(&Value::Int(u64::MAX.into())), json!(u64::MAX));
        assert_eq!(to_primitive(&Value::Float(f64::NAN)), json!("NaN"));
        assert_eq!(to_primitive(&Value::Null), Json::Null);
    }

    #[test]
    fn parse_recovers_canonical_values() {
        let domain = EffectiveDomain::new(TypeDomain::decimal(10, 2)).unwrap();
        let value = Value::Decimal(Decimal::new(-5, 2));
        assert_eq!(parse_primitive(&to_primitive(&value), &domain), Ok(value));

        let domain = EffectiveDomain::new(TypeDomain::binary(3)).unwrap();
        let value = Value::Bytes(vec![1, 2, 0]);
        assert_eq!(parse_primitive(&to_primitive(&value), &domain), Ok(value));

        let err = parse_primitive(&json!([1]), &domain).unwrap_err();
        assert_eq!(err.code(), "type_mismatch");
    }
}
