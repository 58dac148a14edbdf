use rand::{Rng, RngCore};
use tracing::debug;

use mocksmith_core::{FieldDescriptor, FieldType, Value};

use crate::engine::MockGenerator;
use crate::errors::GenerationError;
use crate::model::check_probability;

/// Outcome of resolving one field for a mock instance.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Value(Value),
    /// The field was left out. Distinct from every in-domain value.
    Absent,
    /// No domain for the field's declared type; the caller decides how to
    /// report it.
    Unsupported { type_name: String },
}

impl Resolution {
    pub fn is_absent(&self) -> bool {
        matches!(self, Resolution::Absent)
    }

    pub fn value(&self) -> Option<&Value> {
        match self {
            Resolution::Value(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_value(self) -> Option<Value> {
        match self {
            Resolution::Value(value) => Some(value),
            _ => None,
        }
    }
}

/// Per-call knobs for [`resolve`].
#[derive(Debug, Clone, Copy, Default)]
pub struct GenerationRequest<'a> {
    pub override_value: Option<&'a Value>,
    /// Absence probability for optional fields. Falls back to the
    /// generator's configured `absent_probability`.
    pub absent_probability: Option<f64>,
}

impl<'a> GenerationRequest<'a> {
    pub fn with_override(value: &'a Value) -> Self {
        Self {
            override_value: Some(value),
            absent_probability: None,
        }
    }

    pub fn absent_probability(mut self, p: f64) -> Self {
        self.absent_probability = Some(p);
        self
    }
}

/// Decide what a field contributes to a mock instance.
///
/// An override always wins and is validated. Otherwise an optional field is
/// absent with the request's probability, and a required field is always
/// generated.
pub fn resolve(
    field: &FieldDescriptor,
    request: GenerationRequest<'_>,
    generator: &MockGenerator,
    rng: &mut dyn RngCore,
) -> Result<Resolution, GenerationError> {
    let domain = match &field.field_type {
        FieldType::Typed(domain) => domain,
        FieldType::Unsupported(type_name) => {
            if let Some(value) = request.override_value {
                debug!(field = %field.name, "override on unsupported field passed through");
                return Ok(Resolution::Value(value.clone()));
            }
            return Ok(Resolution::Unsupported {
                type_name: type_name.clone(),
            });
        }
    };

    if let Some(value) = request.override_value {
        let value = generator
            .generate(domain, Some(value), rng)
            .map_err(|err| attach_field(err, &field.name))?;
        debug!(field = %field.name, "override accepted");
        return Ok(Resolution::Value(value));
    }

    if field.optional {
        let p = request
            .absent_probability
            .unwrap_or(generator.options().absent_probability);
        check_probability(p)?;
        if rng.random_bool(p) {
            debug!(field = %field.name, "optional field left absent");
            return Ok(Resolution::Absent);
        }
    }

    let value = generator
        .generate(domain, None, rng)
        .map_err(|err| attach_field(err, &field.name))?;
    debug!(field = %field.name, sql_type = %domain.sql_type(), "field generated");
    Ok(Resolution::Value(value))
}

fn attach_field(err: GenerationError, name: &str) -> GenerationError {
    match err {
        GenerationError::InvalidOverride(source) => {
            GenerationError::InvalidOverride(source.with_field(name))
        }
        GenerationError::Inconsistent {
            generator,
            sql_type,
            source,
        } => GenerationError::Inconsistent {
            generator,
            sql_type,
            source: source.with_field(name),
        },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use mocksmith_core::{EffectiveDomain, TypeDomain};

    use super::*;

    fn field(optional: bool) -> FieldDescriptor {
        let field = FieldDescriptor::new("age", EffectiveDomain::new(TypeDomain::small_int()).unwrap());
        if optional { field.optional() } else { field }
    }

    #[test]
    fn required_fields_are_never_absent() {
        let generator = MockGenerator::default();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let request = GenerationRequest::default().absent_probability(1.0);
        for _ in 0..100 {
            let resolution = resolve(&field(false), request, &generator, &mut rng).unwrap();
            assert!(resolution.value().is_some());
        }
    }

    #[test]
    fn override_beats_absence() {
        let generator = MockGenerator::default();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let raw = Value::from("42");
        let request = GenerationRequest::with_override(&raw).absent_probability(1.0);
        let resolution = resolve(&field(true), request, &generator, &mut rng).unwrap();
        assert_eq!(resolution, Resolution::Value(Value::Int(42)));
    }

    #[test]
    fn rejected_override_names_the_field() {
        let generator = MockGenerator::default();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let raw = Value::Int(100_000);
        let err = resolve(
            &field(false),
            GenerationRequest::with_override(&raw),
            &generator,
            &mut rng,
        )
        .unwrap_err();
        let source = err.validation_error().expect("validation error");
        assert_eq!(source.field.as_deref(), Some("age"));
    }

    #[test]
    fn probability_out_of_range_is_rejected() {
        let generator = MockGenerator::default();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let request = GenerationRequest::default().absent_probability(1.5);
        let err = resolve(&field(true), request, &generator, &mut rng).unwrap_err();
        assert!(matches!(err, GenerationError::InvalidOptions(_)));
    }

    #[test]
    fn unsupported_fields_are_reported() {
        let generator = MockGenerator::default();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let field = FieldDescriptor::unsupported("payload", "Vec<Json>");
        let resolution = resolve(&field, GenerationRequest::default(), &generator, &mut rng).unwrap();
        assert_eq!(
            resolution,
            Resolution::Unsupported {
                type_name: "Vec<Json>".to_string()
            }
        );
    }
}
