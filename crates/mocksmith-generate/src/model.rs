use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::errors::GenerationError;

/// Options for the mock generator.
///
/// Every field has a documented default, so a TOML file only needs the keys
/// it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GenerateOptions {
    /// Probability that an optional field resolves to absent. Default `0.2`.
    pub absent_probability: f64,
    /// Anchor of the default date and timestamp window. Default 2024-01-01.
    pub base_date: NaiveDate,
    /// Days before `base_date` in the default window. Default 3650.
    pub past_days: u32,
    /// Days after `base_date` in the default window. Default 365.
    pub future_days: u32,
    /// Default float window, used when a float has no bounds. Default `[0, 10000]`.
    pub float_min: f64,
    pub float_max: f64,
    /// Length cap for text without a declared maximum. Default 200.
    pub text_max: usize,
    /// Size window for blobs without a declared maximum. Default `100..=1000`.
    pub blob_min: usize,
    pub blob_max: usize,
    /// Attempts before a pattern or pool generator gives up. Default 50.
    pub max_attempts: u32,
    /// Repeat cap for unbounded regex repetitions. Default 32.
    pub max_repeat: u32,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            absent_probability: 0.2,
            base_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default(),
            past_days: 3650,
            future_days: 365,
            float_min: 0.0,
            float_max: 10000.0,
            text_max: 200,
            blob_min: 100,
            blob_max: 1000,
            max_attempts: 50,
            max_repeat: 32,
        }
    }
}

impl GenerateOptions {
    pub fn from_toml_str(input: &str) -> Result<Self, GenerationError> {
        let options: Self = toml::from_str(input)?;
        options.validate()?;
        Ok(options)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, GenerationError> {
        let input = std::fs::read_to_string(path)?;
        Self::from_toml_str(&input)
    }

    pub fn validate(&self) -> Result<(), GenerationError> {
        check_probability(self.absent_probability)?;
        if !self.float_min.is_finite() || !self.float_max.is_finite() {
            return Err(invalid("float_min and float_max must be finite"));
        }
        if self.float_min >= self.float_max {
            return Err(invalid("float_min must be < float_max"));
        }
        if self.text_max == 0 {
            return Err(invalid("text_max must be > 0"));
        }
        if self.blob_min > self.blob_max {
            return Err(invalid("blob_min must be <= blob_max"));
        }
        if self.max_attempts == 0 {
            return Err(invalid("max_attempts must be > 0"));
        }
        if self.max_repeat == 0 {
            return Err(invalid("max_repeat must be > 0"));
        }
        Ok(())
    }

    /// Width of the default float window.
    pub fn float_span(&self) -> f64 {
        self.float_max - self.float_min
    }

    /// Width of the default date window, in days.
    pub fn window_days(&self) -> i64 {
        i64::from(self.past_days) + i64::from(self.future_days)
    }
}

pub(crate) fn check_probability(p: f64) -> Result<(), GenerationError> {
    if (0.0..=1.0).contains(&p) {
        Ok(())
    } else {
        Err(invalid(&format!(
            "absent probability {p} must be between 0 and 1"
        )))
    }
}

fn invalid(reason: &str) -> GenerationError {
    GenerationError::InvalidOptions(reason.to_string())
}
