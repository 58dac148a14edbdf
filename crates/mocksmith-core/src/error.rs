use std::fmt;

use thiserror::Error;

use crate::value::Value;

/// Raised while composing a field's effective domain.
///
/// A definition error is fatal to the field declaration it came from.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DefinitionError {
    /// The type parameters themselves are invalid (zero width, scale above precision).
    #[error("invalid type {sql_type}: {reason}")]
    InvalidType { sql_type: String, reason: String },
    /// A constraint was attached to a kind it cannot apply to.
    #[error("constraint '{constraint}' does not apply to {sql_type}")]
    NotApplicable {
        constraint: &'static str,
        sql_type: String,
    },
    /// A constraint argument could not be interpreted for the kind.
    #[error("invalid '{constraint}' for {sql_type}: {reason}")]
    InvalidArgument {
        constraint: &'static str,
        sql_type: String,
        reason: String,
    },
    /// Lower bound is above upper bound once both are normalized.
    #[error("empty range for {sql_type}: lower bound {lower} is above upper bound {upper}")]
    EmptyRange {
        sql_type: String,
        lower: String,
        upper: String,
    },
    /// The range contains no multiple of the divisor.
    #[error("no multiple of {divisor} in [{lower}, {upper}] for {sql_type}")]
    NoMultipleInRange {
        sql_type: String,
        divisor: String,
        lower: String,
        upper: String,
    },
    /// Two constraints contradict each other.
    #[error("conflicting constraints for {sql_type}: {reason}")]
    Conflict { sql_type: String, reason: String },
    /// The pattern does not compile.
    #[error("invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

/// The rule a value failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    NullNotAllowed,
    /// The native representation cannot stand for this kind at all.
    TypeMismatch { expected: String },
    /// An alternate representation was recognised but is malformed.
    Malformed { expected: String, reason: String },
    /// Outside the fixed range of the kind (integer width, float width).
    OutOfTypeRange { sql_type: String },
    BelowMinimum { bound: String, inclusive: bool },
    AboveMaximum { bound: String, inclusive: bool },
    NotMultipleOf { divisor: String },
    LengthExceeded { max: usize, actual: usize },
    TooShort { min: usize, actual: usize },
    LengthMismatch { expected: usize, actual: usize },
    PrecisionExceeded {
        precision: u32,
        scale: u32,
        integer_digits: u32,
    },
    ScaleExceeded { scale: u32, digits: u32 },
    TimezoneNotAllowed,
    MissingPrefix { prefix: String },
    MissingSuffix { suffix: String },
    PatternMismatch { pattern: String },
    InvalidFormat { format: &'static str },
    NotAMember,
}

impl Violation {
    /// Stable machine-readable code for the rule.
    pub fn code(&self) -> &'static str {
        match self {
            Violation::NullNotAllowed => "null_not_allowed",
            Violation::TypeMismatch { .. } => "type_mismatch",
            Violation::Malformed { .. } => "malformed",
            Violation::OutOfTypeRange { .. } => "out_of_type_range",
            Violation::BelowMinimum { .. } => "below_minimum",
            Violation::AboveMaximum { .. } => "above_maximum",
            Violation::NotMultipleOf { .. } => "not_multiple_of",
            Violation::LengthExceeded { .. } => "length_exceeded",
            Violation::TooShort { .. } => "too_short",
            Violation::LengthMismatch { .. } => "length_mismatch",
            Violation::PrecisionExceeded { .. } => "precision_exceeded",
            Violation::ScaleExceeded { .. } => "scale_exceeded",
            Violation::TimezoneNotAllowed => "timezone_not_allowed",
            Violation::MissingPrefix { .. } => "missing_prefix",
            Violation::MissingSuffix { .. } => "missing_suffix",
            Violation::PatternMismatch { .. } => "pattern_mismatch",
            Violation::InvalidFormat { .. } => "invalid_format",
            Violation::NotAMember => "not_a_member",
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::NullNotAllowed => f.write_str("value is required"),
            Violation::TypeMismatch { expected } => write!(f, "expected {expected}"),
            Violation::Malformed { expected, reason } => {
                write!(f, "cannot read value as {expected}: {reason}")
            }
            Violation::OutOfTypeRange { sql_type } => write!(f, "out of range for {sql_type}"),
            Violation::BelowMinimum { bound, inclusive } => {
                let op = if *inclusive { ">=" } else { ">" };
                write!(f, "must be {op} {bound}")
            }
            Violation::AboveMaximum { bound, inclusive } => {
                let op = if *inclusive { "<=" } else { "<" };
                write!(f, "must be {op} {bound}")
            }
            Violation::NotMultipleOf { divisor } => write!(f, "must be a multiple of {divisor}"),
            Violation::LengthExceeded { max, actual } => {
                write!(f, "length {actual} exceeds maximum {max}")
            }
            Violation::TooShort { min, actual } => {
                write!(f, "length {actual} is below minimum {min}")
            }
            Violation::LengthMismatch { expected, actual } => {
                write!(f, "length {actual} differs from required length {expected}")
            }
            Violation::PrecisionExceeded {
                precision,
                scale,
                integer_digits,
            } => write!(
                f,
                "{integer_digits} integer digits do not fit precision {precision} with scale {scale}"
            ),
            Violation::ScaleExceeded { scale, digits } => {
                write!(f, "{digits} fractional digits exceed scale {scale}")
            }
            Violation::TimezoneNotAllowed => f.write_str("time zone not supported by this type"),
            Violation::MissingPrefix { prefix } => write!(f, "must start with '{prefix}'"),
            Violation::MissingSuffix { suffix } => write!(f, "must end with '{suffix}'"),
            Violation::PatternMismatch { pattern } => write!(f, "must match pattern '{pattern}'"),
            Violation::InvalidFormat { format } => write!(f, "not a valid {format}"),
            Violation::NotAMember => f.write_str("not one of the allowed values"),
        }
    }
}

/// How the offending value is reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Offending {
    /// Rendered value.
    Value(String),
    /// Length only, used for sensitive domains.
    Length(usize),
}

impl Offending {
    pub fn describe(value: &Value, sensitive: bool) -> Self {
        if sensitive {
            let len = match value {
                Value::Bytes(bytes) => bytes.len(),
                Value::Text(text) => text.chars().count(),
                other => other.to_string().chars().count(),
            };
            Offending::Length(len)
        } else {
            Offending::Value(value.to_string())
        }
    }
}

impl fmt::Display for Offending {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Offending::Value(value) => write!(f, "'{value}'"),
            Offending::Length(len) => write!(f, "<redacted, length {len}>"),
        }
    }
}

/// A concrete value failed a domain or constraint check.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}{} (got {})", field_prefix(.field), .violation, .offending)]
pub struct ValidationError {
    pub field: Option<String>,
    pub violation: Violation,
    pub offending: Offending,
}

impl ValidationError {
    pub fn new(violation: Violation, offending: Offending) -> Self {
        Self {
            field: None,
            violation,
            offending,
        }
    }

    /// Attach the field the value belonged to.
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn code(&self) -> &'static str {
        self.violation.code()
    }

    /// True when an alternate representation was malformed rather than out of range.
    pub fn is_coercion_ambiguity(&self) -> bool {
        matches!(self.violation, Violation::Malformed { .. })
    }
}

fn field_prefix(field: &Option<String>) -> String {
    match field {
        Some(field) => format!("{field}: "),
        None => String::new(),
    }
}
