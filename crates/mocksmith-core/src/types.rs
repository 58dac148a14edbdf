use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::DefinitionError;
use crate::value::Literal;

/// Largest decimal precision representable exactly.
pub const MAX_DECIMAL_PRECISION: u32 = 28;
/// Finest sub-second precision for temporal kinds (microseconds).
pub const MAX_TEMPORAL_PRECISION: u32 = 6;

/// Bit width of an integer column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum IntegerWidth {
    Tiny,
    Small,
    Regular,
    Big,
}

impl IntegerWidth {
    pub fn bits(self) -> u32 {
        match self {
            IntegerWidth::Tiny => 8,
            IntegerWidth::Small => 16,
            IntegerWidth::Regular => 32,
            IntegerWidth::Big => 64,
        }
    }

    /// Inclusive native range for the width.
    pub fn range(self, signed: bool) -> (i128, i128) {
        let bits = self.bits();
        if signed {
            (-(1_i128 << (bits - 1)), (1_i128 << (bits - 1)) - 1)
        } else {
            (0, (1_i128 << bits) - 1)
        }
    }

    fn sql_name(self) -> &'static str {
        match self {
            IntegerWidth::Tiny => "TINYINT",
            IntegerWidth::Small => "SMALLINT",
            IntegerWidth::Regular => "INTEGER",
            IntegerWidth::Big => "BIGINT",
        }
    }
}

/// Storage width of a floating-point column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FloatWidth {
    Single,
    Double,
}

/// Coarse classification of a type domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    BoundedInteger,
    FixedString,
    VariableString,
    LargeText,
    FixedDecimal,
    FloatingPoint,
    Boolean,
    Date,
    Time,
    Timestamp,
    FixedBinary,
    VariableBinary,
    LargeBinary,
    Choice,
}

/// Type Domain Definition: a database-like type and its native value space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TypeDomain {
    Integer {
        width: IntegerWidth,
        #[serde(default = "default_true")]
        signed: bool,
    },
    Char {
        length: usize,
    },
    Varchar {
        length: usize,
    },
    Text {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_length: Option<usize>,
    },
    Decimal {
        precision: u32,
        scale: u32,
    },
    Float {
        width: FloatWidth,
        /// Declared binary precision for `FLOAT(p)`.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        precision: Option<u32>,
    },
    Boolean,
    Date,
    Time {
        #[serde(default = "default_temporal_precision")]
        precision: u32,
    },
    Timestamp {
        #[serde(default = "default_temporal_precision")]
        precision: u32,
        #[serde(default = "default_true")]
        with_timezone: bool,
    },
    Binary {
        length: usize,
    },
    #[serde(rename = "varbinary")]
    VarBinary {
        max_length: usize,
    },
    Blob {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_length: Option<usize>,
    },
    Choice {
        members: Vec<Literal>,
    },
}

fn default_true() -> bool {
    true
}

fn default_temporal_precision() -> u32 {
    MAX_TEMPORAL_PRECISION
}

impl TypeDomain {
    pub fn integer() -> Self {
        Self::Integer {
            width: IntegerWidth::Regular,
            signed: true,
        }
    }

    pub fn tiny_int() -> Self {
        Self::Integer {
            width: IntegerWidth::Tiny,
            signed: true,
        }
    }

    pub fn small_int() -> Self {
        Self::Integer {
            width: IntegerWidth::Small,
            signed: true,
        }
    }

    pub fn big_int() -> Self {
        Self::Integer {
            width: IntegerWidth::Big,
            signed: true,
        }
    }

    pub fn unsigned(width: IntegerWidth) -> Self {
        Self::Integer {
            width,
            signed: false,
        }
    }

    pub fn char(length: usize) -> Self {
        Self::Char { length }
    }

    pub fn varchar(length: usize) -> Self {
        Self::Varchar { length }
    }

    pub fn text() -> Self {
        Self::Text { max_length: None }
    }

    pub fn text_with_max(max_length: usize) -> Self {
        Self::Text {
            max_length: Some(max_length),
        }
    }

    pub fn decimal(precision: u32, scale: u32) -> Self {
        Self::Decimal { precision, scale }
    }

    /// `DECIMAL(19, 4)`.
    pub fn money() -> Self {
        Self::decimal(19, 4)
    }

    pub fn real() -> Self {
        Self::Float {
            width: FloatWidth::Single,
            precision: None,
        }
    }

    pub fn double() -> Self {
        Self::Float {
            width: FloatWidth::Double,
            precision: None,
        }
    }

    /// `FLOAT(p)`: single width up to 24 bits of mantissa, double above.
    pub fn float(precision: u32) -> Self {
        let width = if precision <= 24 {
            FloatWidth::Single
        } else {
            FloatWidth::Double
        };
        Self::Float {
            width,
            precision: Some(precision),
        }
    }

    pub fn boolean() -> Self {
        Self::Boolean
    }

    pub fn date() -> Self {
        Self::Date
    }

    pub fn time() -> Self {
        Self::Time {
            precision: MAX_TEMPORAL_PRECISION,
        }
    }

    pub fn time_with_precision(precision: u32) -> Self {
        Self::Time { precision }
    }

    /// Zoned timestamp with microsecond precision.
    pub fn timestamp() -> Self {
        Self::Timestamp {
            precision: MAX_TEMPORAL_PRECISION,
            with_timezone: true,
        }
    }

    pub fn timestamp_with(precision: u32, with_timezone: bool) -> Self {
        Self::Timestamp {
            precision,
            with_timezone,
        }
    }

    /// Naive timestamp with microsecond precision.
    pub fn datetime() -> Self {
        Self::Timestamp {
            precision: MAX_TEMPORAL_PRECISION,
            with_timezone: false,
        }
    }

    pub fn binary(length: usize) -> Self {
        Self::Binary { length }
    }

    pub fn varbinary(max_length: usize) -> Self {
        Self::VarBinary { max_length }
    }

    pub fn blob() -> Self {
        Self::Blob { max_length: None }
    }

    pub fn blob_with_max(max_length: usize) -> Self {
        Self::Blob {
            max_length: Some(max_length),
        }
    }

    pub fn choice<I, L>(members: I) -> Self
    where
        I: IntoIterator<Item = L>,
        L: Into<Literal>,
    {
        Self::Choice {
            members: members.into_iter().map(Into::into).collect(),
        }
    }

    pub fn kind(&self) -> TypeKind {
        match self {
            TypeDomain::Integer { .. } => TypeKind::BoundedInteger,
            TypeDomain::Char { .. } => TypeKind::FixedString,
            TypeDomain::Varchar { .. } => TypeKind::VariableString,
            TypeDomain::Text { .. } => TypeKind::LargeText,
            TypeDomain::Decimal { .. } => TypeKind::FixedDecimal,
            TypeDomain::Float { .. } => TypeKind::FloatingPoint,
            TypeDomain::Boolean => TypeKind::Boolean,
            TypeDomain::Date => TypeKind::Date,
            TypeDomain::Time { .. } => TypeKind::Time,
            TypeDomain::Timestamp { .. } => TypeKind::Timestamp,
            TypeDomain::Binary { .. } => TypeKind::FixedBinary,
            TypeDomain::VarBinary { .. } => TypeKind::VariableBinary,
            TypeDomain::Blob { .. } => TypeKind::LargeBinary,
            TypeDomain::Choice { .. } => TypeKind::Choice,
        }
    }

    pub fn is_string(&self) -> bool {
        matches!(
            self,
            TypeDomain::Char { .. } | TypeDomain::Varchar { .. } | TypeDomain::Text { .. }
        )
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            TypeDomain::Integer { .. } | TypeDomain::Decimal { .. } | TypeDomain::Float { .. }
        )
    }

    pub fn is_temporal(&self) -> bool {
        matches!(
            self,
            TypeDomain::Date | TypeDomain::Time { .. } | TypeDomain::Timestamp { .. }
        )
    }

    pub fn is_binary(&self) -> bool {
        matches!(
            self,
            TypeDomain::Binary { .. } | TypeDomain::VarBinary { .. } | TypeDomain::Blob { .. }
        )
    }

    /// Character limit imposed by the type itself.
    pub fn max_chars(&self) -> Option<usize> {
        match self {
            TypeDomain::Char { length } | TypeDomain::Varchar { length } => Some(*length),
            TypeDomain::Text { max_length } => *max_length,
            _ => None,
        }
    }

    /// Byte limit imposed by the type itself.
    pub fn max_bytes(&self) -> Option<usize> {
        match self {
            TypeDomain::Binary { length } => Some(*length),
            TypeDomain::VarBinary { max_length } => Some(*max_length),
            TypeDomain::Blob { max_length } => *max_length,
            _ => None,
        }
    }

    pub fn sql_type(&self) -> String {
        match self {
            TypeDomain::Integer { width, signed } => {
                if *signed {
                    width.sql_name().to_string()
                } else {
                    format!("{} UNSIGNED", width.sql_name())
                }
            }
            TypeDomain::Char { length } => format!("CHAR({length})"),
            TypeDomain::Varchar { length } => format!("VARCHAR({length})"),
            TypeDomain::Text { .. } => "TEXT".to_string(),
            TypeDomain::Decimal { precision, scale } => format!("DECIMAL({precision},{scale})"),
            TypeDomain::Float { width, precision } => match (precision, width) {
                (Some(precision), _) => format!("FLOAT({precision})"),
                (None, FloatWidth::Single) => "REAL".to_string(),
                (None, FloatWidth::Double) => "DOUBLE PRECISION".to_string(),
            },
            TypeDomain::Boolean => "BOOLEAN".to_string(),
            TypeDomain::Date => "DATE".to_string(),
            TypeDomain::Time { precision } => {
                if *precision == MAX_TEMPORAL_PRECISION {
                    "TIME".to_string()
                } else {
                    format!("TIME({precision})")
                }
            }
            TypeDomain::Timestamp {
                precision,
                with_timezone,
            } => {
                let mut name = if *precision == MAX_TEMPORAL_PRECISION {
                    "TIMESTAMP".to_string()
                } else {
                    format!("TIMESTAMP({precision})")
                };
                if *with_timezone {
                    name.push_str(" WITH TIME ZONE");
                }
                name
            }
            TypeDomain::Binary { length } => format!("BINARY({length})"),
            TypeDomain::VarBinary { max_length } => format!("VARBINARY({max_length})"),
            TypeDomain::Blob { .. } => "BLOB".to_string(),
            TypeDomain::Choice { members } => {
                let members: Vec<String> = members.iter().map(ToString::to_string).collect();
                format!("ENUM({})", members.join(","))
            }
        }
    }

    /// Check the type parameters on their own, before any constraint is applied.
    pub fn check(&self) -> Result<(), DefinitionError> {
        let invalid = |reason: &str| {
            Err(DefinitionError::InvalidType {
                sql_type: self.sql_type(),
                reason: reason.to_string(),
            })
        };
        match self {
            TypeDomain::Char { length: 0 } | TypeDomain::Varchar { length: 0 } => {
                invalid("length must be > 0")
            }
            TypeDomain::Text {
                max_length: Some(0),
            }
            | TypeDomain::Blob {
                max_length: Some(0),
            } => invalid("max_length must be > 0"),
            TypeDomain::Binary { length: 0 } => invalid("length must be > 0"),
            TypeDomain::VarBinary { max_length: 0 } => invalid("max_length must be > 0"),
            TypeDomain::Decimal { precision, scale } => {
                if *precision == 0 {
                    invalid("precision must be > 0")
                } else if *precision > MAX_DECIMAL_PRECISION {
                    invalid("precision must be <= 28")
                } else if scale > precision {
                    invalid("scale must be <= precision")
                } else {
                    Ok(())
                }
            }
            TypeDomain::Float {
                precision: Some(precision),
                ..
            } if *precision == 0 || *precision > 53 => invalid("precision must be in 1..=53"),
            TypeDomain::Time { precision } | TypeDomain::Timestamp { precision, .. }
                if *precision > MAX_TEMPORAL_PRECISION =>
            {
                invalid("precision must be in 0..=6")
            }
            TypeDomain::Choice { members } => {
                if members.is_empty() {
                    return invalid("at least one member is required");
                }
                for (idx, member) in members.iter().enumerate() {
                    if members[..idx].contains(member) {
                        return invalid(&format!("duplicate member {member}"));
                    }
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

impl fmt::Display for TypeDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql_type())
    }
}
