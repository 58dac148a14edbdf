use std::collections::BTreeMap;

use rand::RngCore;

use mocksmith_core::{EffectiveDomain, TypeDomain, Value};

use crate::errors::GenerationError;
use crate::model::GenerateOptions;

pub mod primitives;
pub mod semantic;
pub mod text;

/// Inputs shared by every generator call.
#[derive(Debug, Clone, Copy)]
pub struct GeneratorContext<'a> {
    pub domain: &'a EffectiveDomain,
    pub options: &'a GenerateOptions,
}

impl GeneratorContext<'_> {
    pub(crate) fn unsatisfiable(&self, reason: impl Into<String>) -> GenerationError {
        GenerationError::Unsatisfiable {
            sql_type: self.domain.sql_type(),
            reason: reason.into(),
        }
    }
}

/// Produces a candidate value for an effective domain.
///
/// Generators read the composed rules from the domain and never keep state
/// between calls; all randomness comes from `rng`.
pub trait Generator: Send + Sync {
    fn id(&self) -> &'static str;

    fn generate(
        &self,
        ctx: &GeneratorContext<'_>,
        rng: &mut dyn RngCore,
    ) -> Result<Value, GenerationError>;
}

/// Generators keyed by id.
pub struct GeneratorRegistry {
    generators: BTreeMap<&'static str, Box<dyn Generator>>,
}

impl GeneratorRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            generators: BTreeMap::new(),
        };
        primitives::register(&mut registry);
        text::register(&mut registry);
        semantic::register(&mut registry);
        registry
    }

    pub fn register_generator(&mut self, generator: Box<dyn Generator>) {
        self.generators.insert(generator.id(), generator);
    }

    pub fn generator(&self, id: &str) -> Option<&dyn Generator> {
        self.generators.get(id).map(Box::as_ref)
    }

    pub fn ids(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.generators.keys().copied()
    }

    /// Generator the domain resolves to.
    pub fn for_domain(&self, domain: &EffectiveDomain) -> Result<&dyn Generator, GenerationError> {
        let id = generator_id(domain);
        self.generator(id)
            .ok_or_else(|| GenerationError::UnknownGenerator(id.to_string()))
    }
}

impl Default for GeneratorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for GeneratorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.generators.keys()).finish()
    }
}

/// Registry id for a domain: semantic pools first, then patterns, then the kind.
pub fn generator_id(domain: &EffectiveDomain) -> &'static str {
    if let Some(kind) = domain.semantic() {
        return semantic::id_for(kind);
    }
    match domain.type_domain() {
        TypeDomain::Integer { .. } => "primitive.int",
        TypeDomain::Decimal { .. } => "primitive.decimal",
        TypeDomain::Float { .. } => "primitive.float",
        TypeDomain::Boolean => "primitive.bool",
        TypeDomain::Date => "primitive.date",
        TypeDomain::Time { .. } => "primitive.time",
        TypeDomain::Timestamp { .. } => "primitive.timestamp",
        TypeDomain::Binary { .. } | TypeDomain::VarBinary { .. } | TypeDomain::Blob { .. } => {
            "primitive.binary"
        }
        TypeDomain::Choice { .. } => "primitive.choice",
        TypeDomain::Char { .. } | TypeDomain::Varchar { .. } | TypeDomain::Text { .. } => {
            if domain.text().pattern.is_some() {
                "text.pattern"
            } else {
                "text.filler"
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use mocksmith_core::{ConstraintSet, SemanticKind, compose};

    use super::*;

    #[test]
    fn every_domain_resolves_to_a_registered_generator() {
        let registry = GeneratorRegistry::new();
        let domains = [
            compose(TypeDomain::integer(), ConstraintSet::new()),
            compose(TypeDomain::varchar(8), ConstraintSet::new().pattern("[a-z]+")),
            compose(TypeDomain::text(), ConstraintSet::new()),
            compose(
                TypeDomain::varchar(40),
                ConstraintSet::new().semantic(SemanticKind::Ipv6Address),
            ),
            compose(TypeDomain::blob(), ConstraintSet::new()),
        ];
        let ids: Vec<_> = domains
            .iter()
            .map(|domain| {
                let domain = domain.as_ref().expect("domain composes");
                registry.for_domain(domain).expect("generator").id()
            })
            .collect();
        assert_eq!(
            ids,
            [
                "primitive.int",
                "text.pattern",
                "text.filler",
                "semantic.ipv6_address",
                "primitive.binary"
            ]
        );
        assert_eq!(registry.ids().count(), 25);
    }
}
