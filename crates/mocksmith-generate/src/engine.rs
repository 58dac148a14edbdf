use std::sync::LazyLock;

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

use mocksmith_core::{EffectiveDomain, Value, validate};

use crate::errors::GenerationError;
use crate::generators::{GeneratorContext, GeneratorRegistry};
use crate::model::GenerateOptions;

static DEFAULT_GENERATOR: LazyLock<MockGenerator> = LazyLock::new(MockGenerator::default);

/// Produces values guaranteed to pass validation for their domain.
#[derive(Debug, Default)]
pub struct MockGenerator {
    registry: GeneratorRegistry,
    options: GenerateOptions,
}

impl MockGenerator {
    pub fn new(options: GenerateOptions) -> Result<Self, GenerationError> {
        options.validate()?;
        Ok(Self {
            registry: GeneratorRegistry::new(),
            options,
        })
    }

    pub fn options(&self) -> &GenerateOptions {
        &self.options
    }

    pub fn registry(&self) -> &GeneratorRegistry {
        &self.registry
    }

    /// One value for `domain`.
    ///
    /// An override skips generation and goes through the validator as is;
    /// a rejected override carries the same error direct validation gives.
    /// Generated values are validated before they are returned, so the
    /// result is already canonical.
    pub fn generate(
        &self,
        domain: &EffectiveDomain,
        override_value: Option<&Value>,
        rng: &mut dyn RngCore,
    ) -> Result<Value, GenerationError> {
        if let Some(value) = override_value {
            return validate(value, domain).map_err(GenerationError::InvalidOverride);
        }

        let generator = self.registry.for_domain(domain)?;
        let ctx = GeneratorContext {
            domain,
            options: &self.options,
        };
        let candidate = generator.generate(&ctx, rng)?;
        validate(&candidate, domain).map_err(|source| GenerationError::Inconsistent {
            generator: generator.id(),
            sql_type: domain.sql_type(),
            source,
        })
    }
}

/// Generate with the default options.
pub fn generate(
    domain: &EffectiveDomain,
    rng: &mut dyn RngCore,
    override_value: Option<&Value>,
) -> Result<Value, GenerationError> {
    DEFAULT_GENERATOR.generate(domain, override_value, rng)
}

/// Seeded generator used for reproducible runs.
pub fn rng_from_seed(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}

#[cfg(test)]
mod tests {
    use mocksmith_core::{ConstraintSet, TypeDomain, Violation, compose};

    use super::*;

    #[test]
    fn generated_values_are_canonical() {
        let domain = EffectiveDomain::new(TypeDomain::char(6)).unwrap();
        let mut rng = rng_from_seed(42);
        for _ in 0..50 {
            let value = generate(&domain, &mut rng, None).expect("generated");
            assert_eq!(validate(&value, &domain).expect("valid"), value);
        }
    }

    #[test]
    fn override_is_validated_not_repaired() {
        let domain = EffectiveDomain::new(TypeDomain::varchar(3)).unwrap();
        let mut rng = rng_from_seed(1);
        let raw = Value::from("toolong");
        let err = generate(&domain, &mut rng, Some(&raw)).unwrap_err();
        let direct = validate(&raw, &domain).unwrap_err();
        assert_eq!(err.validation_error(), Some(&direct));
        assert!(matches!(
            direct.violation,
            Violation::LengthExceeded { max: 3, .. }
        ));
    }

    #[test]
    fn invalid_options_are_rejected() {
        let options = GenerateOptions {
            absent_probability: -0.1,
            ..GenerateOptions::default()
        };
        assert!(matches!(
            MockGenerator::new(options),
            Err(GenerationError::InvalidOptions(_))
        ));
    }

    #[test]
    fn custom_window_moves_dates() {
        let options = GenerateOptions {
            base_date: chrono::NaiveDate::from_ymd_opt(2030, 1, 1).unwrap(),
            past_days: 0,
            future_days: 0,
            ..GenerateOptions::default()
        };
        let generator = MockGenerator::new(options).unwrap();
        let domain = compose(TypeDomain::date(), ConstraintSet::new()).unwrap();
        let mut rng = rng_from_seed(9);
        let value = generator.generate(&domain, None, &mut rng).unwrap();
        assert_eq!(value, Value::Date(chrono::NaiveDate::from_ymd_opt(2030, 1, 1).unwrap()));
    }
}
