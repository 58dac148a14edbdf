use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::semantic::SemanticKind;
use crate::value::Literal;

/// User-declared restrictions layered onto a type domain.
///
/// Bounds are kept as literals and interpreted against the type when the
/// set is composed, so the same set shape serves numbers, decimals and
/// temporal kinds. Builder shortcuts write into the same fields as the
/// explicit forms.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ConstraintSet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gt: Option<Literal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ge: Option<Literal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lt: Option<Literal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub le: Option<Literal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multiple_of: Option<Literal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    /// Exact length.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,
    /// Regular expression the whole value must match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub strip_whitespace: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub to_lower: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub to_upper: bool,
    /// Strictly before the reference instant used at composition.
    #[serde(default, skip_serializing_if = "is_false")]
    pub past: bool,
    /// Strictly after the reference instant used at composition.
    #[serde(default, skip_serializing_if = "is_false")]
    pub future: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub semantic: Option<SemanticKind>,
    /// Report offending values by length only.
    #[serde(default, skip_serializing_if = "is_false")]
    pub sensitive: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl ConstraintSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    pub fn gt(mut self, value: impl Into<Literal>) -> Self {
        self.gt = Some(value.into());
        self
    }

    pub fn ge(mut self, value: impl Into<Literal>) -> Self {
        self.ge = Some(value.into());
        self
    }

    pub fn lt(mut self, value: impl Into<Literal>) -> Self {
        self.lt = Some(value.into());
        self
    }

    pub fn le(mut self, value: impl Into<Literal>) -> Self {
        self.le = Some(value.into());
        self
    }

    /// Inclusive range.
    pub fn between(self, lower: impl Into<Literal>, upper: impl Into<Literal>) -> Self {
        self.ge(lower).le(upper)
    }

    pub fn positive(self) -> Self {
        self.gt(0)
    }

    pub fn negative(self) -> Self {
        self.lt(0)
    }

    pub fn non_negative(self) -> Self {
        self.ge(0)
    }

    pub fn non_positive(self) -> Self {
        self.le(0)
    }

    pub fn multiple_of(mut self, value: impl Into<Literal>) -> Self {
        self.multiple_of = Some(value.into());
        self
    }

    pub fn min_length(mut self, value: usize) -> Self {
        self.min_length = Some(value);
        self
    }

    pub fn max_length(mut self, value: usize) -> Self {
        self.max_length = Some(value);
        self
    }

    pub fn length(mut self, value: usize) -> Self {
        self.length = Some(value);
        self
    }

    pub fn prefix(mut self, value: impl Into<String>) -> Self {
        self.prefix = Some(value.into());
        self
    }

    pub fn suffix(mut self, value: impl Into<String>) -> Self {
        self.suffix = Some(value.into());
        self
    }

    pub fn pattern(mut self, value: impl Into<String>) -> Self {
        self.pattern = Some(value.into());
        self
    }

    pub fn strip_whitespace(mut self) -> Self {
        self.strip_whitespace = true;
        self
    }

    pub fn to_lower(mut self) -> Self {
        self.to_lower = true;
        self
    }

    pub fn to_upper(mut self) -> Self {
        self.to_upper = true;
        self
    }

    pub fn past(mut self) -> Self {
        self.past = true;
        self
    }

    pub fn future(mut self) -> Self {
        self.future = true;
        self
    }

    pub fn semantic(mut self, kind: SemanticKind) -> Self {
        self.semantic = Some(kind);
        self
    }

    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    pub(crate) fn has_bounds(&self) -> bool {
        self.gt.is_some() || self.ge.is_some() || self.lt.is_some() || self.le.is_some()
    }

    pub(crate) fn has_length(&self) -> bool {
        self.min_length.is_some() || self.max_length.is_some() || self.length.is_some()
    }

    /// Name of the first string-shape constraint present, if any.
    pub(crate) fn first_text_rule(&self) -> Option<&'static str> {
        if self.prefix.is_some() {
            Some("prefix")
        } else if self.suffix.is_some() {
            Some("suffix")
        } else if self.pattern.is_some() {
            Some("pattern")
        } else if self.strip_whitespace {
            Some("strip_whitespace")
        } else if self.to_lower {
            Some("to_lower")
        } else if self.to_upper {
            Some("to_upper")
        } else if self.semantic.is_some() {
            Some("semantic")
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shortcuts_write_explicit_bounds() {
        assert_eq!(ConstraintSet::new().positive(), ConstraintSet::new().gt(0));
        assert_eq!(
            ConstraintSet::new().non_negative().non_positive(),
            ConstraintSet::new().ge(0).le(0)
        );
    }

    #[test]
    fn deserializes_sparse_sets() {
        let set: ConstraintSet = serde_json::from_value(serde_json::json!({
            "ge": 0,
            "le": "99.99",
            "max_length": 5
        }))
        .unwrap();
        assert_eq!(set.ge, Some(Literal::Int(0)));
        assert_eq!(set.le, Some(Literal::Text("99.99".to_string())));
        assert_eq!(set.max_length, Some(5));
        assert!(!set.is_empty());

        let unknown = serde_json::from_value::<ConstraintSet>(serde_json::json!({ "min": 1 }));
        assert!(unknown.is_err());
    }
}
