//! Model boundary for mocksmith.
//!
//! A [`ModelIntrospector`] hands over a model's ordered fields. From there
//! [`validate_instance`] checks real data, [`MockBuilder`] produces mock
//! instances, and [`flatten`] turns either into wire-safe primitives. Models
//! can be registered by hand with [`ModelSchema`] or declared as JSON with
//! [`ModelDeclaration`].

pub mod adapter;
pub mod builder;
pub mod declaration;
pub mod errors;
pub mod instance;
pub mod introspect;

pub use adapter::{ConstraintAdapter, KeywordAdapter};
pub use builder::MockBuilder;
pub use declaration::{
    FieldDeclaration, ModelDeclaration, declaration_json_schema, validate_declaration_json,
};
pub use errors::{DeclarationIssue, FieldError, ModelError, Result};
pub use instance::{Instance, flatten, generate_field, validate_field, validate_instance};
pub use introspect::{ModelIntrospector, ModelSchema};
