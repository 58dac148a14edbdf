use mocksmith_core::ValidationError;
use thiserror::Error;

/// Errors emitted by the mock generator.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// A caller-supplied override failed validation. Carries the exact
    /// error direct validation of the same value produces.
    #[error("override rejected: {0}")]
    InvalidOverride(ValidationError),
    /// The domain admits no value the generator can reach.
    #[error("cannot generate {sql_type}: {reason}")]
    Unsatisfiable { sql_type: String, reason: String },
    /// A generator produced a value its own domain rejects.
    #[error("generator '{generator}' produced an invalid {sql_type}: {source}")]
    Inconsistent {
        generator: &'static str,
        sql_type: String,
        source: ValidationError,
    },
    #[error("unknown generator '{0}'")]
    UnknownGenerator(String),
    #[error("invalid options: {0}")]
    InvalidOptions(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl GenerationError {
    /// The validation error behind a rejected override or inconsistent output.
    pub fn validation_error(&self) -> Option<&ValidationError> {
        match self {
            GenerationError::InvalidOverride(err) => Some(err),
            GenerationError::Inconsistent { source, .. } => Some(source),
            _ => None,
        }
    }
}
