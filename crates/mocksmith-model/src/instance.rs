use std::collections::BTreeMap;

use rand::RngCore;
use serde_json::{Map, Value as Json};
use tracing::debug;

use mocksmith_core::{
    EffectiveDomain, FieldDescriptor, FieldType, ValidationError, Value, to_primitive, validate,
};
use mocksmith_generate::{GenerationError, GenerationRequest, MockGenerator, Resolution, resolve};

use crate::errors::{FieldError, ModelError, Result};
use crate::introspect::ModelIntrospector;

/// Field values of one model instance, in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    model: String,
    fields: Vec<(String, Resolution)>,
}

impl Instance {
    pub(crate) fn new(model: impl Into<String>, fields: Vec<(String, Resolution)>) -> Self {
        Self {
            model: model.into(),
            fields,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn resolution(&self, name: &str) -> Option<&Resolution> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, resolution)| resolution)
    }

    /// Value of a field, `None` when absent, unsupported or undeclared.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.resolution(name).and_then(Resolution::value)
    }

    pub fn is_absent(&self, name: &str) -> bool {
        self.resolution(name).is_some_and(Resolution::is_absent)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Resolution)> {
        self.fields
            .iter()
            .map(|(name, resolution)| (name.as_str(), resolution))
    }
}

/// Validate one raw value for a field of a real instance.
pub fn validate_field(
    name: &str,
    raw: &Value,
    domain: &EffectiveDomain,
) -> std::result::Result<Value, ValidationError> {
    validate(raw, domain).map_err(|err| err.with_field(name))
}

/// Resolve one field of a mock instance.
///
/// An entry in `overrides` is validated and used as is; otherwise the value
/// is generated, or left absent for optional fields.
pub fn generate_field(
    field: &FieldDescriptor,
    overrides: &BTreeMap<String, Value>,
    generator: &MockGenerator,
    rng: &mut dyn RngCore,
) -> std::result::Result<Resolution, GenerationError> {
    let request = GenerationRequest {
        override_value: overrides.get(&field.name),
        absent_probability: None,
    };
    resolve(field, request, generator, rng)
}

/// Validate a raw instance against every field of `model`.
///
/// All field errors are collected. Missing fields fall back to their default,
/// which is validated here; optional fields without one are absent, and
/// required fields without one are reported missing. Keys the model does not
/// declare are reported as unknown.
pub fn validate_instance(
    model: &dyn ModelIntrospector,
    raw: &BTreeMap<String, Value>,
) -> Result<Instance> {
    let mut errors = Vec::new();
    let mut fields = Vec::with_capacity(model.fields().len());

    for name in raw.keys() {
        if model.field(name).is_none() {
            errors.push(FieldError::Unknown {
                field: name.clone(),
            });
        }
    }

    for field in model.fields() {
        let supplied = raw.get(&field.name).or(field.default.as_ref());
        match resolve_supplied(field, supplied) {
            Ok(resolution) => fields.push((field.name.clone(), resolution)),
            Err(err) => errors.push(err),
        }
    }

    if !errors.is_empty() {
        debug!(model = model.model_name(), errors = errors.len(), "instance rejected");
        return Err(ModelError::Invalid {
            model: model.model_name().to_string(),
            errors,
        });
    }
    Ok(Instance::new(model.model_name(), fields))
}

fn resolve_supplied(
    field: &FieldDescriptor,
    supplied: Option<&Value>,
) -> std::result::Result<Resolution, FieldError> {
    let raw = match supplied {
        Some(Value::Null) | None if field.optional => return Ok(Resolution::Absent),
        None => {
            return Err(FieldError::Missing {
                field: field.name.clone(),
            });
        }
        Some(raw) => raw,
    };
    match &field.field_type {
        FieldType::Typed(domain) => validate_field(&field.name, raw, domain)
            .map(Resolution::Value)
            .map_err(FieldError::Invalid),
        FieldType::Unsupported(_) => Ok(Resolution::Value(raw.clone())),
    }
}

/// Flatten an instance into wire-safe primitives.
///
/// Dates and times become ISO 8601 strings, decimals exact strings, binary
/// values hex, numbers and booleans stay JSON scalars and absent fields
/// become `null`. Unsupported fields without a value are left out.
pub fn flatten(instance: &Instance) -> Map<String, Json> {
    let mut map = Map::new();
    for (name, resolution) in instance.iter() {
        match resolution {
            Resolution::Value(value) => {
                map.insert(name.to_string(), to_primitive(value));
            }
            Resolution::Absent => {
                map.insert(name.to_string(), Json::Null);
            }
            Resolution::Unsupported { .. } => {}
        }
    }
    map
}
