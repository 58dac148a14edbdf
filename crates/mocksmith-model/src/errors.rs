use mocksmith_core::{DefinitionError, ValidationError};
use mocksmith_generate::GenerationError;
use thiserror::Error;

/// Schema violation found in a JSON model declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclarationIssue {
    pub path: String,
    pub message: String,
}

impl DeclarationIssue {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for DeclarationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Problem with one field of an instance.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    #[error("{0}")]
    Invalid(ValidationError),
    #[error("{field}: required field is missing")]
    Missing { field: String },
    #[error("{field}: not a field of this model")]
    Unknown { field: String },
}

impl FieldError {
    pub fn field(&self) -> Option<&str> {
        match self {
            FieldError::Invalid(err) => err.field.as_deref(),
            FieldError::Missing { field } | FieldError::Unknown { field } => Some(field),
        }
    }
}

/// Errors emitted at the model boundary.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("field '{field}': {source}")]
    Definition {
        field: String,
        source: DefinitionError,
    },
    #[error("field '{field}': unknown constraint keyword '{keyword}'")]
    UnknownKeyword { field: String, keyword: String },
    #[error("field '{field}': constraint '{keyword}' {reason}")]
    InvalidKeyword {
        field: String,
        keyword: String,
        reason: String,
    },
    #[error("duplicate field '{0}'")]
    DuplicateField(String),
    #[error("declaration does not match its schema: {}", join(.0))]
    Declaration(Vec<DeclarationIssue>),
    #[error("schema error: {0}")]
    Schema(String),
    #[error("{model}: {} invalid field(s): {}", .errors.len(), join(.errors))]
    Invalid {
        model: String,
        errors: Vec<FieldError>,
    },
    #[error("field '{field}': {source}")]
    Generation {
        field: String,
        source: GenerationError,
    },
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ModelError {
    /// Field errors of a rejected instance, empty for every other error.
    pub fn field_errors(&self) -> &[FieldError] {
        match self {
            ModelError::Invalid { errors, .. } => errors,
            _ => &[],
        }
    }
}

fn join<T: std::fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

pub type Result<T, E = ModelError> = std::result::Result<T, E>;
