use std::sync::Arc;

use crate::domain::EffectiveDomain;
use crate::value::Value;

/// What a field is declared as.
#[derive(Debug, Clone)]
pub enum FieldType {
    /// A composed domain, shared by every instance of the model.
    Typed(Arc<EffectiveDomain>),
    /// A declared type the engine has no domain for. Carries its name.
    Unsupported(String),
}

/// One field of a model as handed over by an introspector.
///
/// The default is kept raw; it is validated only when an instance needs it.
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    pub name: String,
    pub field_type: FieldType,
    pub optional: bool,
    pub default: Option<Value>,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, domain: impl Into<Arc<EffectiveDomain>>) -> Self {
        Self {
            name: name.into(),
            field_type: FieldType::Typed(domain.into()),
            optional: false,
            default: None,
        }
    }

    pub fn unsupported(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field_type: FieldType::Unsupported(type_name.into()),
            optional: false,
            default: None,
        }
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn domain(&self) -> Option<&EffectiveDomain> {
        match &self.field_type {
            FieldType::Typed(domain) => Some(domain),
            FieldType::Unsupported(_) => None,
        }
    }

    /// SQL name of the declared type, or the unsupported type's name.
    pub fn type_name(&self) -> String {
        match &self.field_type {
            FieldType::Typed(domain) => domain.sql_type(),
            FieldType::Unsupported(name) => name.clone(),
        }
    }
}
