use std::collections::BTreeSet;

use mocksmith_core::{ConstraintSet, FieldDescriptor, TypeDomain, compose};

use crate::builder::MockBuilder;
use crate::errors::{ModelError, Result};

/// Source of a model's declared fields.
///
/// Implemented once per framework that can describe its models; the engine
/// only ever sees the name and the ordered field list.
pub trait ModelIntrospector {
    fn model_name(&self) -> &str;

    /// Fields in declaration order.
    fn fields(&self) -> &[FieldDescriptor];

    fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields().iter().find(|field| field.name == name)
    }
}

/// Model registered by hand, field by field.
///
/// ```ignore
/// let users = ModelSchema::new("User")
///     .field("id", TypeDomain::big_int(), ConstraintSet::new().positive())?
///     .field("email", TypeDomain::varchar(255), ConstraintSet::new().semantic(SemanticKind::Email))?
///     .optional_field("bio", TypeDomain::text(), ConstraintSet::new())?;
/// ```
#[derive(Debug, Clone)]
pub struct ModelSchema {
    name: String,
    fields: Vec<FieldDescriptor>,
    names: BTreeSet<String>,
}

impl ModelSchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            names: BTreeSet::new(),
        }
    }

    /// Compose and append a required field.
    pub fn field(
        self,
        name: impl Into<String>,
        tdd: TypeDomain,
        constraints: ConstraintSet,
    ) -> Result<Self> {
        let name = name.into();
        let domain = compose(tdd, constraints).map_err(|source| ModelError::Definition {
            field: name.clone(),
            source,
        })?;
        self.push(FieldDescriptor::new(name, domain))
    }

    /// Compose and append an optional field.
    pub fn optional_field(
        self,
        name: impl Into<String>,
        tdd: TypeDomain,
        constraints: ConstraintSet,
    ) -> Result<Self> {
        let name = name.into();
        let domain = compose(tdd, constraints).map_err(|source| ModelError::Definition {
            field: name.clone(),
            source,
        })?;
        self.push(FieldDescriptor::new(name, domain).optional())
    }

    /// Append a prepared descriptor.
    pub fn push(mut self, field: FieldDescriptor) -> Result<Self> {
        if !self.names.insert(field.name.clone()) {
            return Err(ModelError::DuplicateField(field.name));
        }
        self.fields.push(field);
        Ok(self)
    }

    /// Builder for mock instances of this model.
    pub fn mock(&self) -> MockBuilder<'_> {
        MockBuilder::new(self)
    }
}

impl ModelIntrospector for ModelSchema {
    fn model_name(&self) -> &str {
        &self.name
    }

    fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fields_keep_declaration_order() {
        let schema = ModelSchema::new("Order")
            .field("id", TypeDomain::integer(), ConstraintSet::new())
            .and_then(|schema| {
                schema.optional_field("note", TypeDomain::text(), ConstraintSet::new())
            })
            .and_then(|schema| {
                schema.push(FieldDescriptor::unsupported("payload", "map<string, any>"))
            })
            .expect("schema builds");
        let names: Vec<_> = schema.fields().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["id", "note", "payload"]);
        assert!(ModelIntrospector::field(&schema, "note").expect("note").optional);
    }

    #[test]
    fn duplicates_and_bad_constraints_are_rejected() {
        let err = ModelSchema::new("Order")
            .field("id", TypeDomain::integer(), ConstraintSet::new())
            .and_then(|schema| schema.field("id", TypeDomain::integer(), ConstraintSet::new()))
            .unwrap_err();
        assert!(matches!(err, ModelError::DuplicateField(name) if name == "id"));

        let err = ModelSchema::new("Order")
            .field("qty", TypeDomain::integer(), ConstraintSet::new().gt(10).lt(5))
            .unwrap_err();
        assert!(matches!(err, ModelError::Definition { field, .. } if field == "qty"));
    }
}
