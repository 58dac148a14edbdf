//! Database-shaped column types for plain data models.
//!
//! A [`TypeDomain`] describes a column kind, a [`ConstraintSet`] narrows it,
//! and [`compose`] folds both into an immutable [`EffectiveDomain`] that
//! [`validate`] checks raw values against.

pub mod constraints;
pub mod domain;
pub mod error;
pub mod field;
mod parse;
pub mod semantic;
pub mod serialize;
pub mod temporal;
pub mod types;
pub mod validation;
pub mod value;

pub use constraints::ConstraintSet;
pub use domain::{Bounds, EffectiveDomain, compose, compose_at};
pub use error::{DefinitionError, Offending, ValidationError, Violation};
pub use field::{FieldDescriptor, FieldType};
pub use semantic::SemanticKind;
pub use serialize::{from_primitive, parse_primitive, to_primitive};
pub use types::{FloatWidth, IntegerWidth, TypeDomain, TypeKind};
pub use validation::validate;
pub use value::{Literal, Value};

pub type Result<T, E = ValidationError> = std::result::Result<T, E>;
