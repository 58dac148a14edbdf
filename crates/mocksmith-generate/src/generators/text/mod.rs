use rand::{Rng, RngCore};
use rand_regex::Regex as RandRegex;

use mocksmith_core::{TypeDomain, Value, validate};

use crate::errors::GenerationError;
use crate::generators::{Generator, GeneratorContext, GeneratorRegistry};

pub fn register(registry: &mut GeneratorRegistry) {
    registry.register_generator(Box::new(FillerGenerator));
    registry.register_generator(Box::new(PatternGenerator));
}

/// Lorem words cut to a sampled length, wrapped in the declared affixes.
struct FillerGenerator;

impl Generator for FillerGenerator {
    fn id(&self) -> &'static str {
        "text.filler"
    }

    fn generate(
        &self,
        ctx: &GeneratorContext<'_>,
        rng: &mut dyn RngCore,
    ) -> Result<Value, GenerationError> {
        let rules = ctx.domain.text();
        let prefix = rules.prefix.as_deref().unwrap_or_default();
        let suffix = rules.suffix.as_deref().unwrap_or_default();
        let affix_len = prefix.chars().count() + suffix.chars().count();

        let (min_len, max_len) = text_length_window(ctx, affix_len);
        if min_len > max_len {
            return Err(ctx.unsatisfiable(format!(
                "affixes need {affix_len} characters but at most {max_len} fit"
            )));
        }
        let len = if min_len == max_len {
            min_len
        } else {
            rng.random_range(min_len..=max_len)
        };

        let body = lorem_body(len - affix_len, rng);
        Ok(Value::Text(format!("{prefix}{body}{suffix}")))
    }
}

/// Total length window in characters, affixes included.
fn text_length_window(ctx: &GeneratorContext<'_>, affix_len: usize) -> (usize, usize) {
    let length = ctx.domain.length();
    if let Some(exact) = length.exact {
        return (exact.max(affix_len), exact);
    }
    if let TypeDomain::Char { length: width } = ctx.domain.type_domain() {
        let width = length.max.unwrap_or(*width);
        return (width.max(affix_len), width);
    }
    let min_len = length.min.max(1).max(affix_len);
    let max_len = length
        .max
        .unwrap_or_else(|| ctx.options.text_max.max(min_len));
    (min_len, max_len)
}

/// `len` characters of lorem text with no leading or trailing space.
fn lorem_body(len: usize, rng: &mut dyn RngCore) -> String {
    let mut value = String::with_capacity(len + 12);
    while value.len() < len {
        if !value.is_empty() {
            value.push(' ');
        }
        let word = LOREM_WORDS[rng.random_range(0..LOREM_WORDS.len())];
        value.push_str(word);
    }
    value.truncate(len);
    if value.ends_with(' ') {
        value.pop();
        value.push('a');
    }
    value
}

/// Regex-driven strings, retried until the full rule set accepts one.
struct PatternGenerator;

impl Generator for PatternGenerator {
    fn id(&self) -> &'static str {
        "text.pattern"
    }

    fn generate(
        &self,
        ctx: &GeneratorContext<'_>,
        rng: &mut dyn RngCore,
    ) -> Result<Value, GenerationError> {
        let sampler = PatternSampler::new(ctx)?
            .ok_or_else(|| ctx.unsatisfiable("no pattern declared"))?;
        sampler.generate(ctx, rng)
    }
}

/// Samples the declared pattern and places the prefix and suffix on each
/// draw: written over the ends of the sample, or wrapped around it.
pub(crate) struct PatternSampler<'a> {
    source: &'a str,
    regex: RandRegex,
    prefix: &'a str,
    suffix: &'a str,
}

impl<'a> PatternSampler<'a> {
    /// `None` when the domain declares no pattern.
    pub(crate) fn new(ctx: &GeneratorContext<'a>) -> Result<Option<Self>, GenerationError> {
        let rules = ctx.domain.text();
        let Some(pattern) = rules.pattern.as_ref() else {
            return Ok(None);
        };
        let regex = RandRegex::compile(pattern.source(), ctx.options.max_repeat).map_err(|err| {
            ctx.unsatisfiable(format!(
                "pattern '{}' cannot be sampled: {err}",
                pattern.source()
            ))
        })?;
        Ok(Some(Self {
            source: pattern.source(),
            regex,
            prefix: rules.prefix.as_deref().unwrap_or_default(),
            suffix: rules.suffix.as_deref().unwrap_or_default(),
        }))
    }

    pub(crate) fn generate(
        &self,
        ctx: &GeneratorContext<'_>,
        rng: &mut dyn RngCore,
    ) -> Result<Value, GenerationError> {
        let mut last_error = None;
        for _ in 0..ctx.options.max_attempts {
            let sample: String = rng.sample(&self.regex);
            for candidate in self.candidates(&sample) {
                match validate(&Value::Text(candidate), ctx.domain) {
                    Ok(value) => return Ok(value),
                    Err(err) => last_error = Some(err),
                }
            }
        }
        let reason = match last_error {
            Some(err) => format!(
                "no match for '{}' after {} attempts: {}",
                self.source, ctx.options.max_attempts, err.violation
            ),
            None => format!("no match for '{}'", self.source),
        };
        Err(ctx.unsatisfiable(reason))
    }

    /// Shapes tried for one sample, most likely match first.
    fn candidates(&self, sample: &str) -> Vec<String> {
        if self.prefix.is_empty() && self.suffix.is_empty() {
            return vec![sample.to_string()];
        }
        let mut candidates = Vec::with_capacity(2);
        let chars: Vec<char> = sample.chars().collect();
        let head = self.prefix.chars().count();
        let tail = self.suffix.chars().count();
        if chars.len() >= head + tail {
            let body: String = chars[head..chars.len() - tail].iter().collect();
            candidates.push(format!("{}{body}{}", self.prefix, self.suffix));
        }
        candidates.push(format!("{}{sample}{}", self.prefix, self.suffix));
        candidates
    }
}

const LOREM_WORDS: &[&str] = &[
    "lorem",
    "ipsum",
    "dolor",
    "sit",
    "amet",
    "consectetur",
    "adipiscing",
    "elit",
    "sed",
    "do",
    "eiusmod",
    "tempor",
    "incididunt",
    "ut",
    "labore",
    "et",
    "dolore",
    "magna",
    "aliqua",
];
