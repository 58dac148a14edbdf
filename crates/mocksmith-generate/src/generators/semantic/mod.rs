use fake::Fake;
use fake::faker::address::en::{CityName, StateName};
use fake::faker::internet::en::SafeEmail;
use fake::faker::lorem::en::Word;
use fake::faker::name::en::{FirstName, LastName, Name};
use rand::{Rng, RngCore};
use tracing::debug;

use mocksmith_core::{SemanticKind, Value, validate};

use crate::errors::GenerationError;
use crate::generators::text::PatternSampler;
use crate::generators::{Generator, GeneratorContext, GeneratorRegistry};

const ALL_KINDS: &[SemanticKind] = &[
    SemanticKind::FirstName,
    SemanticKind::LastName,
    SemanticKind::FullName,
    SemanticKind::Email,
    SemanticKind::PhoneNumber,
    SemanticKind::CountryCode,
    SemanticKind::State,
    SemanticKind::City,
    SemanticKind::ZipCode,
    SemanticKind::Url,
    SemanticKind::IpAddress,
    SemanticKind::Ipv4Address,
    SemanticKind::Ipv6Address,
    SemanticKind::Uuid,
];

pub fn register(registry: &mut GeneratorRegistry) {
    for &kind in ALL_KINDS {
        registry.register_generator(Box::new(SemanticGenerator { kind }));
    }
}

pub fn id_for(kind: SemanticKind) -> &'static str {
    match kind {
        SemanticKind::FirstName => "semantic.first_name",
        SemanticKind::LastName => "semantic.last_name",
        SemanticKind::FullName => "semantic.full_name",
        SemanticKind::Email => "semantic.email",
        SemanticKind::PhoneNumber => "semantic.phone_number",
        SemanticKind::CountryCode => "semantic.country_code",
        SemanticKind::State => "semantic.state",
        SemanticKind::City => "semantic.city",
        SemanticKind::ZipCode => "semantic.zip_code",
        SemanticKind::Url => "semantic.url",
        SemanticKind::IpAddress => "semantic.ip_address",
        SemanticKind::Ipv4Address => "semantic.ipv4_address",
        SemanticKind::Ipv6Address => "semantic.ipv6_address",
        SemanticKind::Uuid => "semantic.uuid",
    }
}

/// Realistic values for one semantic kind.
///
/// Candidates are drawn from the kind's pool and checked against the whole
/// domain. Free-form kinds are cut or padded to fit the length rule; kinds
/// with a format fall back to their shortest valid shape when the pool keeps
/// missing. A declared pattern the pool cannot meet is sampled directly.
struct SemanticGenerator {
    kind: SemanticKind,
}

impl Generator for SemanticGenerator {
    fn id(&self) -> &'static str {
        id_for(self.kind)
    }

    fn generate(
        &self,
        ctx: &GeneratorContext<'_>,
        rng: &mut dyn RngCore,
    ) -> Result<Value, GenerationError> {
        let window = BodyWindow::new(ctx);
        let free_form = self.kind.format_name().is_none();

        let mut last_error = None;
        for _ in 0..ctx.options.max_attempts {
            let mut body = candidate(self.kind, rng);
            if free_form {
                body = window.fit(body, self.kind, rng);
            }
            match validate(&Value::Text(window.wrap(&body)), ctx.domain) {
                Ok(value) => return Ok(value),
                Err(err) => last_error = Some(err),
            }
        }

        if let Some(body) = fallback(self.kind, &window, rng) {
            debug!(
                generator = self.id(),
                sql_type = %ctx.domain.sql_type(),
                "semantic pool exhausted, using fallback shape"
            );
            if let Ok(value) = validate(&Value::Text(window.wrap(&body)), ctx.domain) {
                return Ok(value);
            }
        }

        if let Some(sampler) = PatternSampler::new(ctx)? {
            debug!(
                generator = self.id(),
                sql_type = %ctx.domain.sql_type(),
                "semantic pool misses the pattern, sampling it"
            );
            return sampler.generate(ctx, rng);
        }

        let reason = match last_error {
            Some(err) => format!(
                "no {} fits after {} attempts: {}",
                self.kind.name(),
                ctx.options.max_attempts,
                err.violation
            ),
            None => format!("no {} fits", self.kind.name()),
        };
        Err(ctx.unsatisfiable(reason))
    }
}

/// Length window for the part between prefix and suffix.
struct BodyWindow {
    prefix: String,
    suffix: String,
    min: usize,
    max: Option<usize>,
}

impl BodyWindow {
    fn new(ctx: &GeneratorContext<'_>) -> Self {
        let rules = ctx.domain.text();
        let prefix = rules.prefix.clone().unwrap_or_default();
        let suffix = rules.suffix.clone().unwrap_or_default();
        let affix_len = prefix.chars().count() + suffix.chars().count();
        let length = ctx.domain.length();
        let min = length.exact.unwrap_or(length.min).saturating_sub(affix_len);
        let max = length
            .exact
            .or(length.max)
            .map(|max| max.saturating_sub(affix_len));
        Self {
            prefix,
            suffix,
            min,
            max,
        }
    }

    fn wrap(&self, body: &str) -> String {
        format!("{}{body}{}", self.prefix, self.suffix)
    }

    /// Target body length for a fallback shape needing at least `floor` characters.
    fn target(&self, floor: usize) -> usize {
        let target = self.min.max(floor);
        match self.max {
            Some(max) => target.min(max),
            None => target,
        }
    }

    /// Pad short values with more pool entries, cut long ones at the limit.
    fn fit(&self, mut body: String, kind: SemanticKind, rng: &mut dyn RngCore) -> String {
        while body.chars().count() < self.min {
            body.push(' ');
            body.push_str(&candidate(kind, rng));
        }
        if let Some(max) = self.max
            && body.chars().count() > max
        {
            body = body.chars().take(max).collect();
            body.truncate(body.trim_end().len());
        }
        while body.chars().count() < self.min {
            body.push('a');
        }
        body
    }
}

fn candidate(kind: SemanticKind, rng: &mut dyn RngCore) -> String {
    match kind {
        SemanticKind::FirstName => FirstName().fake_with_rng(rng),
        SemanticKind::LastName => LastName().fake_with_rng(rng),
        SemanticKind::FullName => Name().fake_with_rng(rng),
        SemanticKind::Email => SafeEmail().fake_with_rng(rng),
        SemanticKind::PhoneNumber => {
            let template = PHONE_TEMPLATES[rng.random_range(0..PHONE_TEMPLATES.len())];
            fill_digits(template, rng)
        }
        SemanticKind::CountryCode => {
            COUNTRY_CODES[rng.random_range(0..COUNTRY_CODES.len())].to_string()
        }
        SemanticKind::State => StateName().fake_with_rng(rng),
        SemanticKind::City => CityName().fake_with_rng(rng),
        SemanticKind::ZipCode => {
            let template = if rng.random_bool(0.5) {
                "#####"
            } else {
                "#####-####"
            };
            fill_digits(template, rng)
        }
        SemanticKind::Url => {
            let word: String = Word().fake_with_rng(rng);
            format!("https://www.example.com/{word}")
        }
        SemanticKind::IpAddress => {
            if rng.random_bool(0.5) {
                ipv4(rng)
            } else {
                ipv6(rng)
            }
        }
        SemanticKind::Ipv4Address => ipv4(rng),
        SemanticKind::Ipv6Address => ipv6(rng),
        SemanticKind::Uuid => {
            let mut bytes = [0_u8; 16];
            rng.fill_bytes(&mut bytes);
            bytes[6] = (bytes[6] & 0x0f) | 0x40;
            bytes[8] = (bytes[8] & 0x3f) | 0x80;
            uuid::Uuid::from_bytes(bytes).to_string()
        }
    }
}

/// Shortest valid shape of a formatted kind, stretched to the minimum length.
fn fallback(kind: SemanticKind, window: &BodyWindow, rng: &mut dyn RngCore) -> Option<String> {
    let value = match kind {
        SemanticKind::Email => {
            let target = window.target(6);
            let local = "a".repeat(target.checked_sub(5)?.max(1));
            format!("{local}@b.io")
        }
        SemanticKind::PhoneNumber => {
            let target = window.target(7);
            (0..target)
                .map(|_| char::from(b'0' + rng.random_range(0..=9_u8)))
                .collect()
        }
        SemanticKind::ZipCode => fill_digits("#####", rng),
        SemanticKind::Url => {
            let target = window.target(11);
            let path = "a".repeat(target.saturating_sub(12));
            if path.is_empty() {
                "http://a.io".to_string()
            } else {
                format!("http://a.io/{path}")
            }
        }
        SemanticKind::Ipv4Address => (0..4)
            .map(|_| rng.random_range(1..=9_u8).to_string())
            .collect::<Vec<_>>()
            .join("."),
        SemanticKind::IpAddress | SemanticKind::Ipv6Address => "::1".to_string(),
        _ => return None,
    };
    Some(value)
}

fn fill_digits(template: &str, rng: &mut dyn RngCore) -> String {
    template
        .chars()
        .map(|c| {
            if c == '#' {
                char::from(b'0' + rng.random_range(0..=9_u8))
            } else {
                c
            }
        })
        .collect()
}

fn ipv4(rng: &mut dyn RngCore) -> String {
    let first = rng.random_range(1..=223_u8);
    let rest: Vec<String> = (0..3)
        .map(|_| rng.random_range(0..=255_u8).to_string())
        .collect();
    format!("{first}.{}", rest.join("."))
}

fn ipv6(rng: &mut dyn RngCore) -> String {
    let groups: Vec<String> = (0..8)
        .map(|_| format!("{:x}", rng.random_range(0..=u16::MAX)))
        .collect();
    groups.join(":")
}

const PHONE_TEMPLATES: &[&str] = &["+1-555-###-####", "(555) ###-####", "555-###-####"];

const COUNTRY_CODES: &[&str] = &[
    "AR", "AT", "AU", "BE", "BR", "CA", "CH", "CL", "CN", "CO", "CZ", "DE", "DK", "EG", "ES",
    "FI", "FR", "GB", "GR", "HU", "ID", "IE", "IL", "IN", "IT", "JP", "KE", "KR", "MX", "NG",
    "NL", "NO", "NZ", "PE", "PH", "PL", "PT", "RO", "SE", "SG", "TH", "TR", "UA", "US", "VN",
    "ZA",
];

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use mocksmith_core::{ConstraintSet, TypeDomain, compose};

    use super::*;
    use crate::model::GenerateOptions;

    fn sample(kind: SemanticKind, domain: &mocksmith_core::EffectiveDomain, seed: u64) -> String {
        let options = GenerateOptions::default();
        let ctx = GeneratorContext {
            domain,
            options: &options,
        };
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let value = SemanticGenerator { kind }
            .generate(&ctx, &mut rng)
            .expect("semantic value");
        value.as_str().expect("text").to_string()
    }

    #[test]
    fn every_kind_produces_its_format() {
        for &kind in ALL_KINDS {
            let domain = kind.domain().expect("default domain");
            for seed in 0..20 {
                let value = sample(kind, &domain, seed);
                assert!(kind.check_format(&value), "{}: {value}", kind.name());
            }
        }
    }

    #[test]
    fn names_are_cut_to_short_columns() {
        let domain = compose(
            TypeDomain::varchar(4),
            ConstraintSet::new().semantic(SemanticKind::FullName),
        )
        .unwrap();
        for seed in 0..50 {
            let value = sample(SemanticKind::FullName, &domain, seed);
            assert!((1..=4).contains(&value.chars().count()), "{value}");
        }
    }

    #[test]
    fn tight_email_column_uses_fallback() {
        let domain = compose(
            TypeDomain::varchar(8),
            ConstraintSet::new().semantic(SemanticKind::Email),
        )
        .unwrap();
        let value = sample(SemanticKind::Email, &domain, 5);
        assert!(value.len() <= 8);
        assert!(SemanticKind::Email.check_format(&value));
    }

    #[test]
    fn pattern_and_prefix_override_the_pool() {
        let domain = compose(
            TypeDomain::varchar(10),
            ConstraintSet::new()
                .semantic(SemanticKind::FirstName)
                .prefix("AB")
                .pattern("[A-Z]{6}"),
        )
        .unwrap();
        for seed in 0..30 {
            let value = sample(SemanticKind::FirstName, &domain, seed);
            assert!(value.starts_with("AB") && value.len() == 6, "{value}");
            assert!(value.chars().all(|c| c.is_ascii_uppercase()), "{value}");
        }
    }

    #[test]
    fn formatted_kind_keeps_a_matching_pattern() {
        let domain = compose(
            TypeDomain::varchar(10),
            ConstraintSet::new()
                .semantic(SemanticKind::ZipCode)
                .pattern("9[0-9]{4}"),
        )
        .unwrap();
        for seed in 0..30 {
            let value = sample(SemanticKind::ZipCode, &domain, seed);
            assert!(value.starts_with('9') && value.len() == 5, "{value}");
            assert!(SemanticKind::ZipCode.check_format(&value));
        }
    }

    #[test]
    fn ids_cover_every_kind() {
        let registry = GeneratorRegistry::new();
        for &kind in ALL_KINDS {
            assert!(registry.generator(id_for(kind)).is_some());
        }
    }
}
