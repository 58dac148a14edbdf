use std::collections::BTreeMap;
use std::sync::LazyLock;

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use mocksmith_core::Value;
use mocksmith_generate::{GenerationError, GenerationRequest, MockGenerator, Resolution, resolve};

use crate::errors::{FieldError, ModelError, Result};
use crate::instance::Instance;
use crate::introspect::ModelIntrospector;

static DEFAULT_GENERATOR: LazyLock<MockGenerator> = LazyLock::new(MockGenerator::default);

/// Fluent builder for mock instances.
///
/// Overridden fields are validated; every other field is generated, or left
/// absent for optional fields. With a seed, each field draws from its own
/// `ChaCha8Rng` derived from the seed and the field name, so declaring a new
/// field leaves the other fields' values unchanged.
pub struct MockBuilder<'a> {
    model: &'a dyn ModelIntrospector,
    generator: &'a MockGenerator,
    overrides: BTreeMap<String, Value>,
    seed: Option<u64>,
    absent_probability: Option<f64>,
}

impl<'a> MockBuilder<'a> {
    pub fn new(model: &'a dyn ModelIntrospector) -> Self {
        Self {
            model,
            generator: &DEFAULT_GENERATOR,
            overrides: BTreeMap::new(),
            seed: None,
            absent_probability: None,
        }
    }

    /// Generate with custom options instead of the defaults.
    pub fn generator(mut self, generator: &'a MockGenerator) -> Self {
        self.generator = generator;
        self
    }

    /// Fix a field's value.
    pub fn set(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.overrides.insert(field.into(), value.into());
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Absence probability for optional fields, instead of the generator's.
    pub fn absent_probability(mut self, p: f64) -> Self {
        self.absent_probability = Some(p);
        self
    }

    pub fn build(&self) -> Result<Instance> {
        let model_name = self.model.model_name();
        let mut errors: Vec<FieldError> = self
            .overrides
            .keys()
            .filter(|name| self.model.field(name).is_none())
            .map(|name| FieldError::Unknown {
                field: name.clone(),
            })
            .collect();

        let mut thread_rng = rand::rng();
        let mut fields = Vec::with_capacity(self.model.fields().len());
        for field in self.model.fields() {
            let mut seeded = self.seed.map(|seed| field_rng(seed, &field.name));
            let rng: &mut dyn RngCore = match seeded.as_mut() {
                Some(rng) => rng,
                None => &mut thread_rng,
            };
            let request = GenerationRequest {
                override_value: self.overrides.get(&field.name),
                absent_probability: self.absent_probability,
            };
            match resolve(field, request, self.generator, rng) {
                Ok(Resolution::Unsupported { type_name }) => {
                    warn!(
                        model = model_name,
                        field = %field.name,
                        type_name = %type_name,
                        "no generator for field type, left unset"
                    );
                    fields.push((field.name.clone(), Resolution::Unsupported { type_name }));
                }
                Ok(resolution) => fields.push((field.name.clone(), resolution)),
                Err(GenerationError::InvalidOverride(source)) => {
                    errors.push(FieldError::Invalid(source));
                }
                Err(source) => {
                    return Err(ModelError::Generation {
                        field: field.name.clone(),
                        source,
                    });
                }
            }
        }

        if !errors.is_empty() {
            return Err(ModelError::Invalid {
                model: model_name.to_string(),
                errors,
            });
        }
        info!(
            model = model_name,
            fields = fields.len(),
            overrides = self.overrides.len(),
            seeded = self.seed.is_some(),
            "mock instance built"
        );
        Ok(Instance::new(model_name, fields))
    }
}

/// Independent stream per field: SHA-256 of the seed and the field name.
fn field_rng(seed: u64, field: &str) -> ChaCha8Rng {
    let mut hasher = Sha256::new();
    hasher.update(seed.to_le_bytes());
    hasher.update(field.as_bytes());
    ChaCha8Rng::from_seed(hasher.finalize().into())
}
