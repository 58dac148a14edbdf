use std::collections::BTreeMap;

use serde_json::Value as Json;

use mocksmith_core::{ConstraintSet, Literal, SemanticKind};

use crate::errors::{ModelError, Result};

/// Translates an external constraint syntax into a [`ConstraintSet`].
pub trait ConstraintAdapter {
    fn adapt(&self, field: &str, keywords: &BTreeMap<String, Json>) -> Result<ConstraintSet>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum KeywordKind {
    Literal,
    Length,
    Text,
    Flag,
    Sign,
    Semantic,
}

#[derive(Clone, Copy, Debug)]
struct KeywordSpec {
    key: &'static str,
    aliases: &'static [&'static str],
    kind: KeywordKind,
}

impl KeywordSpec {
    const fn new(key: &'static str, aliases: &'static [&'static str], kind: KeywordKind) -> Self {
        Self { key, aliases, kind }
    }

    fn matches(&self, name: &str) -> bool {
        self.key == name || self.aliases.contains(&name)
    }

    /// Constraint field the keyword writes; sign shortcuts share a bound.
    fn slot(&self) -> &'static str {
        match self.key {
            "positive" => "gt",
            "negative" => "lt",
            "non_negative" => "ge",
            "non_positive" => "le",
            key => key,
        }
    }
}

const KEYWORDS: &[KeywordSpec] = &[
    KeywordSpec::new("gt", &["exclusiveMinimum", "exclusive_minimum"], KeywordKind::Literal),
    KeywordSpec::new("ge", &["minimum", "min_value"], KeywordKind::Literal),
    KeywordSpec::new("lt", &["exclusiveMaximum", "exclusive_maximum"], KeywordKind::Literal),
    KeywordSpec::new("le", &["maximum", "max_value"], KeywordKind::Literal),
    KeywordSpec::new("multiple_of", &["multipleOf"], KeywordKind::Literal),
    KeywordSpec::new("positive", &[], KeywordKind::Sign),
    KeywordSpec::new("negative", &[], KeywordKind::Sign),
    KeywordSpec::new("non_negative", &["nonNegative"], KeywordKind::Sign),
    KeywordSpec::new("non_positive", &["nonPositive"], KeywordKind::Sign),
    KeywordSpec::new("min_length", &["minLength"], KeywordKind::Length),
    KeywordSpec::new("max_length", &["maxLength"], KeywordKind::Length),
    KeywordSpec::new("length", &[], KeywordKind::Length),
    KeywordSpec::new("prefix", &["startswith", "startsWith"], KeywordKind::Text),
    KeywordSpec::new("suffix", &["endswith", "endsWith"], KeywordKind::Text),
    KeywordSpec::new("pattern", &["regex"], KeywordKind::Text),
    KeywordSpec::new("strip_whitespace", &["stripWhitespace"], KeywordKind::Flag),
    KeywordSpec::new("to_lower", &["toLower"], KeywordKind::Flag),
    KeywordSpec::new("to_upper", &["toUpper"], KeywordKind::Flag),
    KeywordSpec::new("past", &[], KeywordKind::Flag),
    KeywordSpec::new("future", &[], KeywordKind::Flag),
    KeywordSpec::new("semantic", &["format"], KeywordKind::Semantic),
    KeywordSpec::new("sensitive", &["writeOnly"], KeywordKind::Flag),
];

/// Keyword names in snake case or JSON Schema spelling.
///
/// `{"minimum": 0, "exclusiveMaximum": 10, "startswith": "A"}` and
/// `{"ge": 0, "lt": 10, "prefix": "A"}` adapt to the same set. Unknown
/// keywords and a keyword given twice under different spellings are errors,
/// as is a sign shortcut such as `positive` next to the bound it sets.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordAdapter;

impl KeywordAdapter {
    /// Canonical names of the accepted keywords.
    pub fn keywords() -> impl Iterator<Item = &'static str> {
        KEYWORDS.iter().map(|spec| spec.key)
    }
}

impl ConstraintAdapter for KeywordAdapter {
    fn adapt(&self, field: &str, keywords: &BTreeMap<String, Json>) -> Result<ConstraintSet> {
        let mut set = ConstraintSet::new();
        let mut seen: BTreeMap<&'static str, &str> = BTreeMap::new();

        for (name, value) in keywords {
            let Some(spec) = KEYWORDS.iter().find(|spec| spec.matches(name)) else {
                return Err(ModelError::UnknownKeyword {
                    field: field.to_string(),
                    keyword: name.clone(),
                });
            };
            if let Some(previous) = seen.insert(spec.slot(), name) {
                return Err(invalid(field, name, format!("repeats '{previous}'")));
            }
            apply(&mut set, field, spec, name, value)?;
        }
        Ok(set)
    }
}

fn apply(
    set: &mut ConstraintSet,
    field: &str,
    spec: &KeywordSpec,
    name: &str,
    value: &Json,
) -> Result<()> {
    match spec.kind {
        KeywordKind::Literal => {
            let literal = literal(value)
                .ok_or_else(|| invalid(field, name, "must be a number, string or boolean"))?;
            let slot = match spec.key {
                "gt" => &mut set.gt,
                "ge" => &mut set.ge,
                "lt" => &mut set.lt,
                "le" => &mut set.le,
                _ => &mut set.multiple_of,
            };
            *slot = Some(literal);
        }
        KeywordKind::Length => {
            let length = value
                .as_u64()
                .and_then(|value| usize::try_from(value).ok())
                .ok_or_else(|| invalid(field, name, "must be a non-negative integer"))?;
            let slot = match spec.key {
                "min_length" => &mut set.min_length,
                "max_length" => &mut set.max_length,
                _ => &mut set.length,
            };
            *slot = Some(length);
        }
        KeywordKind::Text => {
            let text = value
                .as_str()
                .ok_or_else(|| invalid(field, name, "must be a string"))?
                .to_string();
            let slot = match spec.key {
                "prefix" => &mut set.prefix,
                "suffix" => &mut set.suffix,
                _ => &mut set.pattern,
            };
            *slot = Some(text);
        }
        KeywordKind::Flag => {
            let flag = value
                .as_bool()
                .ok_or_else(|| invalid(field, name, "must be a boolean"))?;
            let slot = match spec.key {
                "strip_whitespace" => &mut set.strip_whitespace,
                "to_lower" => &mut set.to_lower,
                "to_upper" => &mut set.to_upper,
                "past" => &mut set.past,
                "future" => &mut set.future,
                _ => &mut set.sensitive,
            };
            *slot = flag;
        }
        KeywordKind::Sign => {
            let flag = value
                .as_bool()
                .ok_or_else(|| invalid(field, name, "must be a boolean"))?;
            if flag {
                let current = std::mem::take(set);
                *set = match spec.key {
                    "positive" => current.positive(),
                    "negative" => current.negative(),
                    "non_negative" => current.non_negative(),
                    _ => current.non_positive(),
                };
            }
        }
        KeywordKind::Semantic => {
            let kind = value
                .as_str()
                .and_then(semantic_kind)
                .ok_or_else(|| invalid(field, name, "is not a known semantic kind"))?;
            set.semantic = Some(kind);
        }
    }
    Ok(())
}

fn literal(value: &Json) -> Option<Literal> {
    match value {
        Json::Bool(value) => Some(Literal::Bool(*value)),
        Json::Number(number) => number
            .as_i64()
            .map(Literal::Int)
            .or_else(|| number.as_u64().map(Literal::UInt))
            .or_else(|| number.as_f64().map(Literal::Float)),
        Json::String(value) => Some(Literal::Text(value.clone())),
        _ => None,
    }
}

/// Semantic kind by snake-case name, or by JSON Schema `format` name.
fn semantic_kind(name: &str) -> Option<SemanticKind> {
    match name {
        "ipv4" => Some(SemanticKind::Ipv4Address),
        "ipv6" => Some(SemanticKind::Ipv6Address),
        "uri" => Some(SemanticKind::Url),
        _ => serde_json::from_value(Json::String(name.to_string())).ok(),
    }
}

fn invalid(field: &str, keyword: &str, reason: impl Into<String>) -> ModelError {
    ModelError::InvalidKeyword {
        field: field.to_string(),
        keyword: keyword.to_string(),
        reason: reason.into(),
    }
}
