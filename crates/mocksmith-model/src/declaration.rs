use std::collections::BTreeMap;

use chrono::{NaiveDateTime, Utc};
use jsonschema::JSONSchema;
use schemars::JsonSchema;
use schemars::schema::RootSchema;
use schemars::schema_for;
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

use mocksmith_core::{FieldDescriptor, TypeDomain, compose_at, from_primitive};

use crate::adapter::{ConstraintAdapter, KeywordAdapter};
use crate::errors::{DeclarationIssue, ModelError, Result};
use crate::introspect::ModelSchema;

/// A model written as JSON.
///
/// ```json
/// {
///   "name": "User",
///   "fields": [
///     {"name": "id", "type": {"kind": "integer", "width": "big", "signed": true},
///      "constraints": {"minimum": 1}},
///     {"name": "email", "constraints": {"semantic": "email"}},
///     {"name": "bio", "type": {"kind": "text"}, "optional": true}
///   ]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ModelDeclaration {
    pub name: String,
    pub fields: Vec<FieldDeclaration>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct FieldDeclaration {
    pub name: String,
    /// Column type. May be left out when `constraints.semantic` names a
    /// subtype, which then supplies its default column.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_domain: Option<TypeDomain>,
    /// Name of a type the engine cannot generate or validate. Excludes `type`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unsupported: Option<String>,
    /// Constraint keywords, in snake case or JSON Schema spelling.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub constraints: BTreeMap<String, Json>,
    #[serde(default)]
    pub optional: bool,
    /// Raw default, validated when an instance needs it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Json>,
}

/// JSON Schema for model declarations.
pub fn declaration_json_schema() -> RootSchema {
    schema_for!(ModelDeclaration)
}

/// Check a declaration document against the declaration JSON Schema.
pub fn validate_declaration_json(document: &Json) -> Result<()> {
    let schema = serde_json::to_value(declaration_json_schema())?;
    let compiled = JSONSchema::compile(&schema).map_err(|err| ModelError::Schema(err.to_string()))?;

    if let Err(errors) = compiled.validate(document) {
        let issues: Vec<DeclarationIssue> = errors
            .map(|error| {
                let path = error.instance_path.to_string();
                let path = if path.is_empty() { "/".to_string() } else { path };
                DeclarationIssue::new(path, error.to_string())
            })
            .collect();
        return Err(ModelError::Declaration(issues));
    }
    Ok(())
}

impl ModelDeclaration {
    /// Parse a declaration after checking it against the declaration schema.
    pub fn from_json(document: &Json) -> Result<Self> {
        validate_declaration_json(document)?;
        Ok(serde_json::from_value(document.clone())?)
    }

    pub fn from_json_str(input: &str) -> Result<Self> {
        let document: Json = serde_json::from_str(input)?;
        Self::from_json(&document)
    }

    /// Compose every field with the keyword adapter, resolving `past` and
    /// `future` against the current UTC clock.
    pub fn compile(&self) -> Result<ModelSchema> {
        self.compile_with(&KeywordAdapter, Utc::now().naive_utc())
    }

    /// Compose every field with `adapter`, resolving `past` and `future`
    /// against `reference`.
    pub fn compile_with(
        &self,
        adapter: &dyn ConstraintAdapter,
        reference: NaiveDateTime,
    ) -> Result<ModelSchema> {
        let mut schema = ModelSchema::new(&self.name);
        for field in &self.fields {
            schema = schema.push(field.descriptor(adapter, reference)?)?;
        }
        Ok(schema)
    }
}

impl FieldDeclaration {
    fn descriptor(
        &self,
        adapter: &dyn ConstraintAdapter,
        reference: NaiveDateTime,
    ) -> Result<FieldDescriptor> {
        let mut descriptor = match (&self.type_domain, &self.unsupported) {
            (Some(_), Some(_)) => {
                return Err(self.issue("declares both 'type' and 'unsupported'"));
            }
            (None, Some(type_name)) => FieldDescriptor::unsupported(&self.name, type_name),
            (type_domain, None) => {
                let constraints = adapter.adapt(&self.name, &self.constraints)?;
                let tdd = match (type_domain, constraints.semantic) {
                    (Some(tdd), _) => tdd.clone(),
                    (None, Some(kind)) => kind.default_type(),
                    (None, None) => {
                        return Err(self.issue("needs a 'type' or a semantic constraint"));
                    }
                };
                let domain = compose_at(tdd, constraints, reference).map_err(|source| {
                    ModelError::Definition {
                        field: self.name.clone(),
                        source,
                    }
                })?;
                FieldDescriptor::new(&self.name, domain)
            }
        };

        if self.optional {
            descriptor = descriptor.optional();
        }
        if let Some(default) = &self.default {
            let value = from_primitive(default)
                .ok_or_else(|| self.issue("default must be a string, number, boolean or null"))?;
            descriptor = descriptor.with_default(value);
        }
        Ok(descriptor)
    }

    fn issue(&self, message: &str) -> ModelError {
        ModelError::Declaration(vec![DeclarationIssue::new(
            format!("/fields/{}", self.name),
            message,
        )])
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use mocksmith_core::SemanticKind;

    use super::*;
    use crate::introspect::ModelIntrospector;

    #[test]
    fn semantic_fields_take_their_default_column() {
        let declaration = ModelDeclaration::from_json(&json!({
            "name": "Contact",
            "fields": [
                {"name": "email", "constraints": {"semantic": "email"}},
                {"name": "country", "constraints": {"format": "country_code"}, "optional": true}
            ]
        }))
        .expect("declaration parses");
        let schema = declaration.compile().expect("declaration compiles");
        let email = ModelIntrospector::field(&schema, "email").and_then(|f| f.domain()).unwrap();
        assert_eq!(email.sql_type(), "VARCHAR(255)");
        assert_eq!(email.semantic(), Some(SemanticKind::Email));
        assert!(ModelIntrospector::field(&schema, "country").unwrap().optional);
    }

    #[test]
    fn schema_violations_are_reported_with_paths() {
        let err = ModelDeclaration::from_json(&json!({
            "name": "Broken",
            "fields": [{"name": 7}]
        }))
        .unwrap_err();
        let ModelError::Declaration(issues) = err else {
            panic!("expected declaration error");
        };
        assert!(issues.iter().any(|issue| issue.path.starts_with("/fields/0")));
    }

    #[test]
    fn object_defaults_are_rejected() {
        let declaration = ModelDeclaration::from_json(&json!({
            "name": "Order",
            "fields": [{"name": "qty", "type": {"kind": "integer", "width": "regular", "signed": true}, "default": {"n": 1}}]
        }))
        .expect("declaration parses");
        assert!(matches!(
            declaration.compile(),
            Err(ModelError::Declaration(_))
        ));
    }
}
