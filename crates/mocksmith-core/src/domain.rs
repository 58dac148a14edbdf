//! Constraint composition: a type domain plus its constraint set, normalized
//! once into the read-only rules both the validator and the generators use.

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use regex::Regex;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use crate::constraints::ConstraintSet;
use crate::error::DefinitionError;
use crate::parse::{ParsedTimestamp, parse_date, parse_decimal, parse_time, parse_timestamp};
use crate::semantic::SemanticKind;
use crate::temporal::{
    MICROS_PER_DAY, ceil_to_unit, floor_to_unit, micros_to_time, micros_to_timestamp,
    time_to_micros, timestamp_to_micros, unit_micros,
};
use crate::types::{FloatWidth, TypeDomain};
use crate::value::Literal;

/// One side of a floating-point interval.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Limit {
    pub value: f64,
    pub inclusive: bool,
}

/// Normalized bounds. Every discrete kind stores inclusive limits on its lattice.
#[derive(Debug, Clone, PartialEq)]
pub enum Bounds {
    Unbounded,
    Integer {
        lower: Option<i128>,
        upper: Option<i128>,
    },
    Decimal {
        lower: Option<Decimal>,
        upper: Option<Decimal>,
    },
    Float {
        lower: Option<Limit>,
        upper: Option<Limit>,
    },
    Date {
        lower: Option<NaiveDate>,
        upper: Option<NaiveDate>,
    },
    Time {
        lower: Option<NaiveTime>,
        upper: Option<NaiveTime>,
    },
    /// Limits in UTC.
    Timestamp {
        lower: Option<NaiveDateTime>,
        upper: Option<NaiveDateTime>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Step {
    Integer(i128),
    Decimal(Decimal),
    Float(f64),
}

/// Character (or byte) length limits, type width included.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LengthRule {
    pub min: usize,
    pub max: Option<usize>,
    pub exact: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Case {
    Lower,
    Upper,
}

impl Case {
    pub fn apply(self, value: &str) -> String {
        match self {
            Case::Lower => value.to_lowercase(),
            Case::Upper => value.to_uppercase(),
        }
    }

    fn name(self) -> &'static str {
        match self {
            Case::Lower => "to_lower",
            Case::Upper => "to_upper",
        }
    }
}

/// Compiled full-match pattern.
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    regex: Regex,
}

impl Pattern {
    fn compile(source: &str) -> Result<Self, DefinitionError> {
        let regex = Regex::new(&format!("^(?:{source})$")).map_err(|err| {
            DefinitionError::InvalidPattern {
                pattern: source.to_string(),
                reason: err.to_string(),
            }
        })?;
        Ok(Self {
            source: source.to_string(),
            regex,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn is_match(&self, value: &str) -> bool {
        self.regex.is_match(value)
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

/// String shape rules.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextRules {
    pub prefix: Option<String>,
    pub suffix: Option<String>,
    pub pattern: Option<Pattern>,
    pub case: Option<Case>,
    pub strip_whitespace: bool,
}

impl TextRules {
    /// Apply whitespace stripping then the case transform.
    pub fn transform(&self, raw: &str) -> String {
        let stripped = if self.strip_whitespace {
            raw.trim()
        } else {
            raw
        };
        match self.case {
            Some(case) => case.apply(stripped),
            None => stripped.to_string(),
        }
    }
}

/// Inclusive integer range walked in steps of `step`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lattice {
    pub lower: i128,
    pub upper: i128,
    pub step: i128,
}

impl Lattice {
    /// Range of `k` such that `k * step` lies in `[lower, upper]`.
    pub fn multiples(&self) -> Option<(i128, i128)> {
        let first = -(-self.lower).div_euclid(self.step);
        let last = self.upper.div_euclid(self.step);
        (first <= last).then_some((first, last))
    }
}

/// A type domain combined with a field's constraint set.
///
/// Built once per field declaration and never mutated; share it behind an
/// `Arc` across threads.
#[derive(Debug, Clone)]
pub struct EffectiveDomain {
    tdd: TypeDomain,
    constraints: ConstraintSet,
    bounds: Bounds,
    step: Option<Step>,
    length: LengthRule,
    text: TextRules,
}

impl EffectiveDomain {
    /// Domain with no extra constraints.
    pub fn new(tdd: TypeDomain) -> Result<Self, DefinitionError> {
        compose(tdd, ConstraintSet::new())
    }

    pub fn type_domain(&self) -> &TypeDomain {
        &self.tdd
    }

    /// Constraint set as declared, before normalization.
    pub fn constraints(&self) -> &ConstraintSet {
        &self.constraints
    }

    pub fn sql_type(&self) -> String {
        self.tdd.sql_type()
    }

    pub fn bounds(&self) -> &Bounds {
        &self.bounds
    }

    pub fn step(&self) -> Option<Step> {
        self.step
    }

    pub fn length(&self) -> &LengthRule {
        &self.length
    }

    pub fn text(&self) -> &TextRules {
        &self.text
    }

    pub fn semantic(&self) -> Option<SemanticKind> {
        self.constraints.semantic
    }

    pub fn is_sensitive(&self) -> bool {
        self.constraints.sensitive
    }

    /// Integer values allowed by the width and the bounds, with the multiple-of step.
    pub fn integer_lattice(&self) -> Option<Lattice> {
        let TypeDomain::Integer { width, signed } = &self.tdd else {
            return None;
        };
        let (type_lower, type_upper) = width.range(*signed);
        let (lower, upper) = match &self.bounds {
            Bounds::Integer { lower, upper } => (*lower, *upper),
            _ => (None, None),
        };
        let step = match self.step {
            Some(Step::Integer(step)) => step,
            _ => 1,
        };
        Some(Lattice {
            lower: lower.map_or(type_lower, |value| value.max(type_lower)),
            upper: upper.map_or(type_upper, |value| value.min(type_upper)),
            step,
        })
    }

    /// Decimal values in units of the declared scale, with the multiple-of step.
    pub fn decimal_lattice(&self) -> Option<(u32, Lattice)> {
        let TypeDomain::Decimal { precision, scale } = &self.tdd else {
            return None;
        };
        let max_units = 10_i128.pow(*precision) - 1;
        let (lower, upper) = match &self.bounds {
            Bounds::Decimal { lower, upper } => (
                lower.and_then(|value| decimal_units_ceil(value, *scale)),
                upper.and_then(|value| decimal_units_floor(value, *scale)),
            ),
            _ => (None, None),
        };
        let step = match self.step {
            Some(Step::Decimal(step)) => decimal_units_floor(step, *scale).unwrap_or(1).max(1),
            _ => 1,
        };
        Some((
            *scale,
            Lattice {
                lower: lower.map_or(-max_units, |value| value.max(-max_units)),
                upper: upper.map_or(max_units, |value| value.min(max_units)),
                step,
            },
        ))
    }

    /// Float limits clipped to the storage width.
    pub fn float_limits(&self) -> Option<(Limit, Limit)> {
        let TypeDomain::Float { width, .. } = &self.tdd else {
            return None;
        };
        let max = match width {
            FloatWidth::Single => f64::from(f32::MAX),
            FloatWidth::Double => f64::MAX,
        };
        let (lower, upper) = match &self.bounds {
            Bounds::Float { lower, upper } => (*lower, *upper),
            _ => (None, None),
        };
        let lower = match lower {
            Some(limit) if limit.value > -max => limit,
            _ => Limit {
                value: -max,
                inclusive: true,
            },
        };
        let upper = match upper {
            Some(limit) if limit.value < max => limit,
            _ => Limit {
                value: max,
                inclusive: true,
            },
        };
        Some((lower, upper))
    }
}

/// Units of `10^-scale` not below `value`.
pub fn decimal_units_ceil(value: Decimal, scale: u32) -> Option<i128> {
    let mantissa = value.mantissa();
    let own = value.scale();
    if own <= scale {
        mantissa.checked_mul(10_i128.checked_pow(scale - own)?)
    } else {
        Some(-(-mantissa).div_euclid(10_i128.pow(own - scale)))
    }
}

/// Units of `10^-scale` not above `value`.
pub fn decimal_units_floor(value: Decimal, scale: u32) -> Option<i128> {
    let mantissa = value.mantissa();
    let own = value.scale();
    if own <= scale {
        mantissa.checked_mul(10_i128.checked_pow(scale - own)?)
    } else {
        Some(mantissa.div_euclid(10_i128.pow(own - scale)))
    }
}

pub fn units_to_decimal(units: i128, scale: u32) -> Option<Decimal> {
    Decimal::try_from_i128_with_scale(units, scale).ok()
}

/// Multiple-of test for floats, tolerant to one rounding step.
pub fn is_float_multiple(value: f64, step: f64) -> bool {
    let quotient = value / step;
    (quotient - quotient.round()).abs() <= 1e-9 * quotient.abs().max(1.0)
}

/// Range of `k` such that `k * step` lies within both limits.
pub fn float_multiples(lower: Limit, upper: Limit, step: f64) -> Option<(f64, f64)> {
    let mut first = (lower.value / step).ceil();
    if !lower.inclusive && first * step <= lower.value {
        first += 1.0;
    }
    let mut last = (upper.value / step).floor();
    if !upper.inclusive && last * step >= upper.value {
        last -= 1.0;
    }
    (first <= last).then_some((first, last))
}

/// Compose against the current UTC clock.
pub fn compose(tdd: TypeDomain, constraints: ConstraintSet) -> Result<EffectiveDomain, DefinitionError> {
    compose_at(tdd, constraints, Utc::now().naive_utc())
}

/// Compose with `past`/`future` resolved against `reference` (UTC).
pub fn compose_at(
    tdd: TypeDomain,
    constraints: ConstraintSet,
    reference: NaiveDateTime,
) -> Result<EffectiveDomain, DefinitionError> {
    tdd.check()?;
    let composer = Composer {
        tdd: &tdd,
        set: &constraints,
        sql_type: tdd.sql_type(),
        reference,
    };
    composer.check_applicability()?;
    let bounds = composer.bounds()?;
    let step = composer.step()?;
    let length = composer.length()?;
    let text = composer.text_rules(&length)?;
    let sql_type = composer.sql_type;

    let domain = EffectiveDomain {
        tdd,
        constraints,
        bounds,
        step,
        length,
        text,
    };
    check_satisfiable(&domain, &sql_type)?;
    Ok(domain)
}

fn check_satisfiable(domain: &EffectiveDomain, sql_type: &str) -> Result<(), DefinitionError> {
    if let Some(lattice) = domain.integer_lattice() {
        return check_lattice(lattice, sql_type, |units| units.to_string());
    }
    if let Some((scale, lattice)) = domain.decimal_lattice() {
        return check_lattice(lattice, sql_type, |units| {
            units_to_decimal(units, scale).map_or_else(|| units.to_string(), |d| d.to_string())
        });
    }
    if let Some((lower, upper)) = domain.float_limits() {
        let empty = lower.value > upper.value
            || (lower.value == upper.value && !(lower.inclusive && upper.inclusive));
        if empty {
            return Err(DefinitionError::EmptyRange {
                sql_type: sql_type.to_string(),
                lower: lower.value.to_string(),
                upper: upper.value.to_string(),
            });
        }
        if let Some(Step::Float(step)) = domain.step
            && float_multiples(lower, upper, step).is_none()
        {
            return Err(DefinitionError::NoMultipleInRange {
                sql_type: sql_type.to_string(),
                divisor: step.to_string(),
                lower: lower.value.to_string(),
                upper: upper.value.to_string(),
            });
        }
    }
    Ok(())
}

fn check_lattice(
    lattice: Lattice,
    sql_type: &str,
    render: impl Fn(i128) -> String,
) -> Result<(), DefinitionError> {
    if lattice.lower > lattice.upper {
        return Err(DefinitionError::EmptyRange {
            sql_type: sql_type.to_string(),
            lower: render(lattice.lower),
            upper: render(lattice.upper),
        });
    }
    if lattice.multiples().is_none() {
        return Err(DefinitionError::NoMultipleInRange {
            sql_type: sql_type.to_string(),
            divisor: render(lattice.step),
            lower: render(lattice.lower),
            upper: render(lattice.upper),
        });
    }
    Ok(())
}

struct Composer<'a> {
    tdd: &'a TypeDomain,
    set: &'a ConstraintSet,
    sql_type: String,
    reference: NaiveDateTime,
}

impl Composer<'_> {
    fn not_applicable(&self, constraint: &'static str) -> DefinitionError {
        DefinitionError::NotApplicable {
            constraint,
            sql_type: self.sql_type.clone(),
        }
    }

    fn invalid(&self, constraint: &'static str, reason: impl Into<String>) -> DefinitionError {
        DefinitionError::InvalidArgument {
            constraint,
            sql_type: self.sql_type.clone(),
            reason: reason.into(),
        }
    }

    fn conflict(&self, reason: impl Into<String>) -> DefinitionError {
        DefinitionError::Conflict {
            sql_type: self.sql_type.clone(),
            reason: reason.into(),
        }
    }

    fn check_applicability(&self) -> Result<(), DefinitionError> {
        let set = self.set;
        let tdd = self.tdd;
        if let Some(name) = self.first_bound() {
            if !(tdd.is_numeric() || tdd.is_temporal()) {
                return Err(self.not_applicable(name));
            }
        }
        if set.multiple_of.is_some() && !tdd.is_numeric() {
            return Err(self.not_applicable("multiple_of"));
        }
        let dated = matches!(tdd, TypeDomain::Date | TypeDomain::Timestamp { .. });
        if set.past && !dated {
            return Err(self.not_applicable("past"));
        }
        if set.future && !dated {
            return Err(self.not_applicable("future"));
        }
        if set.past && set.future {
            return Err(self.conflict("past and future are mutually exclusive"));
        }
        let sized = tdd.is_string()
            || matches!(tdd, TypeDomain::VarBinary { .. } | TypeDomain::Blob { .. });
        if set.has_length() && !sized {
            let name = if set.min_length.is_some() {
                "min_length"
            } else if set.max_length.is_some() {
                "max_length"
            } else {
                "length"
            };
            return Err(self.not_applicable(name));
        }
        if let Some(name) = set.first_text_rule()
            && !tdd.is_string()
        {
            return Err(self.not_applicable(name));
        }
        Ok(())
    }

    fn first_bound(&self) -> Option<&'static str> {
        let set = self.set;
        [
            ("gt", set.gt.is_some()),
            ("ge", set.ge.is_some()),
            ("lt", set.lt.is_some()),
            ("le", set.le.is_some()),
        ]
        .into_iter()
        .find_map(|(name, present)| present.then_some(name))
    }

    fn bounds(&self) -> Result<Bounds, DefinitionError> {
        match self.tdd {
            TypeDomain::Integer { .. } => self.integer_bounds(),
            TypeDomain::Decimal { scale, .. } => self.decimal_bounds(*scale),
            TypeDomain::Float { .. } => self.float_bounds(),
            TypeDomain::Date => self.date_bounds(),
            TypeDomain::Time { precision } => self.time_bounds(*precision),
            TypeDomain::Timestamp { precision, .. } => self.timestamp_bounds(*precision),
            _ => Ok(Bounds::Unbounded),
        }
    }

    fn decimal_arg(&self, constraint: &'static str, literal: &Literal) -> Result<Decimal, DefinitionError> {
        match literal {
            Literal::Int(value) => Ok(Decimal::from(*value)),
            Literal::UInt(value) => Ok(Decimal::from(*value)),
            Literal::Float(value) if value.is_finite() => parse_decimal(&value.to_string())
                .ok_or_else(|| self.invalid(constraint, format!("{value} is not representable"))),
            Literal::Text(value) => parse_decimal(value)
                .ok_or_else(|| self.invalid(constraint, format!("'{value}' is not a number"))),
            other => Err(self.invalid(constraint, format!("{other} is not a finite number"))),
        }
    }

    fn float_arg(&self, constraint: &'static str, literal: &Literal) -> Result<f64, DefinitionError> {
        let value = match literal {
            Literal::Int(value) => *value as f64,
            Literal::UInt(value) => *value as f64,
            Literal::Float(value) => *value,
            Literal::Text(value) => value
                .trim()
                .parse::<f64>()
                .map_err(|_| self.invalid(constraint, format!("'{value}' is not a number")))?,
            Literal::Bool(_) => return Err(self.invalid(constraint, "expected a number")),
        };
        if value.is_finite() {
            Ok(value)
        } else {
            Err(self.invalid(constraint, "bound must be finite"))
        }
    }

    fn integer_bounds(&self) -> Result<Bounds, DefinitionError> {
        let to_int = |constraint: &'static str, value: Decimal| {
            value
                .to_i128()
                .ok_or_else(|| self.invalid(constraint, "bound out of range"))
        };
        let mut lower = None;
        let mut upper = None;
        if let Some(literal) = &self.set.gt {
            let value = to_int("gt", self.decimal_arg("gt", literal)?.floor())?;
            tighten_lower(&mut lower, value + 1);
        }
        if let Some(literal) = &self.set.ge {
            let value = to_int("ge", self.decimal_arg("ge", literal)?.ceil())?;
            tighten_lower(&mut lower, value);
        }
        if let Some(literal) = &self.set.lt {
            let value = to_int("lt", self.decimal_arg("lt", literal)?.ceil())?;
            tighten_upper(&mut upper, value - 1);
        }
        if let Some(literal) = &self.set.le {
            let value = to_int("le", self.decimal_arg("le", literal)?.floor())?;
            tighten_upper(&mut upper, value);
        }
        Ok(Bounds::Integer { lower, upper })
    }

    fn decimal_bounds(&self, scale: u32) -> Result<Bounds, DefinitionError> {
        let units = |constraint: &'static str, value: Option<i128>| {
            value.ok_or_else(|| self.invalid(constraint, "bound out of range"))
        };
        let mut lower = None;
        let mut upper = None;
        if let Some(literal) = &self.set.gt {
            let value = self.decimal_arg("gt", literal)?;
            tighten_lower(&mut lower, units("gt", decimal_units_floor(value, scale))? + 1);
        }
        if let Some(literal) = &self.set.ge {
            let value = self.decimal_arg("ge", literal)?;
            tighten_lower(&mut lower, units("ge", decimal_units_ceil(value, scale))?);
        }
        if let Some(literal) = &self.set.lt {
            let value = self.decimal_arg("lt", literal)?;
            tighten_upper(&mut upper, units("lt", decimal_units_ceil(value, scale))? - 1);
        }
        if let Some(literal) = &self.set.le {
            let value = self.decimal_arg("le", literal)?;
            tighten_upper(&mut upper, units("le", decimal_units_floor(value, scale))?);
        }
        let to_decimal = |constraint: &'static str, value: Option<i128>| {
            value
                .map(|units| {
                    units_to_decimal(units, scale)
                        .ok_or_else(|| self.invalid(constraint, "bound out of range"))
                })
                .transpose()
        };
        Ok(Bounds::Decimal {
            lower: to_decimal("ge", lower)?,
            upper: to_decimal("le", upper)?,
        })
    }

    fn float_bounds(&self) -> Result<Bounds, DefinitionError> {
        let mut lower: Option<Limit> = None;
        let mut upper: Option<Limit> = None;
        let candidates = [
            ("gt", &self.set.gt, false, true),
            ("ge", &self.set.ge, true, true),
            ("lt", &self.set.lt, false, false),
            ("le", &self.set.le, true, false),
        ];
        for (name, literal, inclusive, is_lower) in candidates {
            let Some(literal) = literal else {
                continue;
            };
            let limit = Limit {
                value: self.float_arg(name, literal)?,
                inclusive,
            };
            let slot = if is_lower { &mut lower } else { &mut upper };
            *slot = Some(match *slot {
                None => limit,
                Some(current) => tighter_limit(current, limit, is_lower),
            });
        }
        Ok(Bounds::Float { lower, upper })
    }

    fn date_arg(&self, constraint: &'static str, literal: &Literal) -> Result<NaiveDate, DefinitionError> {
        let Literal::Text(raw) = literal else {
            return Err(self.invalid(constraint, "expected an ISO date string"));
        };
        parse_date(raw)
            .or_else(|| parse_timestamp(raw).map(|parsed| naive_utc(parsed).date()))
            .ok_or_else(|| self.invalid(constraint, format!("'{raw}' is not a date")))
    }

    fn date_bounds(&self) -> Result<Bounds, DefinitionError> {
        let mut lower: Option<i128> = None;
        let mut upper: Option<i128> = None;
        let day = |date: NaiveDate| i128::from(date.num_days_from_ce());
        if let Some(literal) = &self.set.gt {
            tighten_lower(&mut lower, day(self.date_arg("gt", literal)?) + 1);
        }
        if let Some(literal) = &self.set.ge {
            tighten_lower(&mut lower, day(self.date_arg("ge", literal)?));
        }
        if let Some(literal) = &self.set.lt {
            tighten_upper(&mut upper, day(self.date_arg("lt", literal)?) - 1);
        }
        if let Some(literal) = &self.set.le {
            tighten_upper(&mut upper, day(self.date_arg("le", literal)?));
        }
        let today = day(self.reference.date());
        if self.set.past {
            tighten_upper(&mut upper, today - 1);
        }
        if self.set.future {
            tighten_lower(&mut lower, today + 1);
        }
        self.check_order(lower, upper, |days| days.to_string())?;
        let to_date = |days: i128| {
            i32::try_from(days)
                .ok()
                .and_then(NaiveDate::from_num_days_from_ce_opt)
                .ok_or_else(|| self.invalid("ge", "date out of range"))
        };
        Ok(Bounds::Date {
            lower: lower.map(to_date).transpose()?,
            upper: upper.map(to_date).transpose()?,
        })
    }

    fn time_arg(&self, constraint: &'static str, literal: &Literal) -> Result<i64, DefinitionError> {
        let Literal::Text(raw) = literal else {
            return Err(self.invalid(constraint, "expected an ISO time string"));
        };
        parse_time(raw)
            .map(time_to_micros)
            .ok_or_else(|| self.invalid(constraint, format!("'{raw}' is not a time")))
    }

    fn time_bounds(&self, precision: u32) -> Result<Bounds, DefinitionError> {
        let unit = unit_micros(precision);
        let mut lower: Option<i128> = None;
        let mut upper: Option<i128> = None;
        if let Some(literal) = &self.set.gt {
            let micros = floor_to_unit(self.time_arg("gt", literal)?, unit) + unit;
            tighten_lower(&mut lower, i128::from(micros));
        }
        if let Some(literal) = &self.set.ge {
            let micros = ceil_to_unit(self.time_arg("ge", literal)?, unit);
            tighten_lower(&mut lower, i128::from(micros));
        }
        if let Some(literal) = &self.set.lt {
            let micros = ceil_to_unit(self.time_arg("lt", literal)?, unit) - unit;
            tighten_upper(&mut upper, i128::from(micros));
        }
        if let Some(literal) = &self.set.le {
            let micros = floor_to_unit(self.time_arg("le", literal)?, unit);
            tighten_upper(&mut upper, i128::from(micros));
        }
        let last = i128::from(floor_to_unit(MICROS_PER_DAY - 1, unit));
        let effective_lower = lower.map_or(0, |value| value.max(0));
        let effective_upper = upper.map_or(last, |value| value.min(last));
        self.check_order(Some(effective_lower), Some(effective_upper), render_micros_time)?;
        let to_time = |micros: i128| {
            i64::try_from(micros)
                .ok()
                .and_then(micros_to_time)
                .ok_or_else(|| self.invalid("ge", "time out of range"))
        };
        Ok(Bounds::Time {
            lower: lower.map(|_| to_time(effective_lower)).transpose()?,
            upper: upper.map(|_| to_time(effective_upper)).transpose()?,
        })
    }

    fn timestamp_arg(&self, constraint: &'static str, literal: &Literal) -> Result<i64, DefinitionError> {
        let Literal::Text(raw) = literal else {
            return Err(self.invalid(constraint, "expected an ISO timestamp string"));
        };
        parse_timestamp(raw)
            .map(|parsed| timestamp_to_micros(naive_utc(parsed)))
            .ok_or_else(|| self.invalid(constraint, format!("'{raw}' is not a timestamp")))
    }

    fn timestamp_bounds(&self, precision: u32) -> Result<Bounds, DefinitionError> {
        let unit = unit_micros(precision);
        let mut lower: Option<i128> = None;
        let mut upper: Option<i128> = None;
        if let Some(literal) = &self.set.gt {
            let micros = floor_to_unit(self.timestamp_arg("gt", literal)?, unit) + unit;
            tighten_lower(&mut lower, i128::from(micros));
        }
        if let Some(literal) = &self.set.ge {
            let micros = ceil_to_unit(self.timestamp_arg("ge", literal)?, unit);
            tighten_lower(&mut lower, i128::from(micros));
        }
        if let Some(literal) = &self.set.lt {
            let micros = ceil_to_unit(self.timestamp_arg("lt", literal)?, unit) - unit;
            tighten_upper(&mut upper, i128::from(micros));
        }
        if let Some(literal) = &self.set.le {
            let micros = floor_to_unit(self.timestamp_arg("le", literal)?, unit);
            tighten_upper(&mut upper, i128::from(micros));
        }
        let now = timestamp_to_micros(self.reference);
        if self.set.past {
            tighten_upper(&mut upper, i128::from(ceil_to_unit(now, unit) - unit));
        }
        if self.set.future {
            tighten_lower(&mut lower, i128::from(floor_to_unit(now, unit) + unit));
        }
        self.check_order(lower, upper, |micros| {
            i64::try_from(micros)
                .ok()
                .and_then(micros_to_timestamp)
                .map_or_else(|| micros.to_string(), |value| value.to_string())
        })?;
        let to_timestamp = |micros: i128| {
            i64::try_from(micros)
                .ok()
                .and_then(micros_to_timestamp)
                .ok_or_else(|| self.invalid("ge", "timestamp out of range"))
        };
        Ok(Bounds::Timestamp {
            lower: lower.map(to_timestamp).transpose()?,
            upper: upper.map(to_timestamp).transpose()?,
        })
    }

    fn check_order(
        &self,
        lower: Option<i128>,
        upper: Option<i128>,
        render: impl Fn(i128) -> String,
    ) -> Result<(), DefinitionError> {
        if let (Some(lower), Some(upper)) = (lower, upper)
            && lower > upper
        {
            return Err(DefinitionError::EmptyRange {
                sql_type: self.sql_type.clone(),
                lower: render(lower),
                upper: render(upper),
            });
        }
        Ok(())
    }

    fn step(&self) -> Result<Option<Step>, DefinitionError> {
        let Some(literal) = &self.set.multiple_of else {
            return Ok(None);
        };
        match self.tdd {
            TypeDomain::Integer { .. } => {
                let value = self.decimal_arg("multiple_of", literal)?;
                if !value.fract().is_zero() || value <= Decimal::ZERO {
                    return Err(self.invalid("multiple_of", "must be a positive integer"));
                }
                let step = value
                    .to_i128()
                    .ok_or_else(|| self.invalid("multiple_of", "out of range"))?;
                Ok(Some(Step::Integer(step)))
            }
            TypeDomain::Decimal { scale, .. } => {
                let value = self.decimal_arg("multiple_of", literal)?.normalize();
                if value <= Decimal::ZERO {
                    return Err(self.invalid("multiple_of", "must be positive"));
                }
                if value.scale() > *scale {
                    return Err(self.invalid(
                        "multiple_of",
                        format!("{value} has more fractional digits than scale {scale}"),
                    ));
                }
                Ok(Some(Step::Decimal(value)))
            }
            _ => {
                let value = self.float_arg("multiple_of", literal)?;
                if value <= 0.0 {
                    return Err(self.invalid("multiple_of", "must be positive"));
                }
                Ok(Some(Step::Float(value)))
            }
        }
    }

    fn length(&self) -> Result<LengthRule, DefinitionError> {
        let set = self.set;
        let type_max = if self.tdd.is_string() {
            self.tdd.max_chars()
        } else {
            self.tdd.max_bytes()
        };
        if let (Some(max), Some(width)) = (set.max_length, type_max)
            && max > width
        {
            return Err(self.conflict(format!("max_length {max} exceeds declared width {width}")));
        }
        let mut max = match (set.max_length, type_max) {
            (Some(max), Some(width)) => Some(max.min(width)),
            (max, width) => max.or(width),
        };
        let mut min = set.min_length.unwrap_or(0);
        if let Some(exact) = set.length {
            if max.is_some_and(|max| exact > max) {
                return Err(self.conflict(format!("length {exact} exceeds maximum length")));
            }
            if exact < min {
                return Err(self.conflict(format!("length {exact} is below min_length {min}")));
            }
            min = exact;
            max = Some(exact);
        }
        if let Some(max) = max
            && min > max
        {
            return Err(self.conflict(format!("min_length {min} exceeds maximum length {max}")));
        }
        Ok(LengthRule {
            min,
            max,
            exact: set.length,
        })
    }

    fn text_rules(&self, length: &LengthRule) -> Result<TextRules, DefinitionError> {
        if !self.tdd.is_string() {
            return Ok(TextRules::default());
        }
        let set = self.set;
        let case = match (set.to_lower, set.to_upper) {
            (true, true) => return Err(self.conflict("to_lower and to_upper are mutually exclusive")),
            (true, false) => Some(Case::Lower),
            (false, true) => Some(Case::Upper),
            (false, false) => None,
        };
        let fixed_width = matches!(self.tdd, TypeDomain::Char { .. });
        for (name, affix) in [("prefix", &set.prefix), ("suffix", &set.suffix)] {
            let Some(affix) = affix else {
                continue;
            };
            if affix.is_empty() {
                return Err(self.invalid(name, "must not be empty"));
            }
            if let Some(case) = case
                && case.apply(affix) != *affix
            {
                return Err(self.conflict(format!("{name} '{affix}' is changed by {}", case.name())));
            }
            let edge = if name == "prefix" {
                affix.starts_with(char::is_whitespace)
            } else {
                affix.ends_with(char::is_whitespace)
            };
            if edge && set.strip_whitespace {
                return Err(self.conflict(format!("{name} '{affix}' is removed by strip_whitespace")));
            }
            if name == "suffix" && fixed_width && affix.ends_with(' ') {
                return Err(self.conflict("suffix ending in a space is lost to padding"));
            }
        }
        let affix_len = set.prefix.as_deref().map_or(0, |p| p.chars().count())
            + set.suffix.as_deref().map_or(0, |s| s.chars().count());
        if let Some(max) = length.max
            && affix_len > max
        {
            return Err(self.conflict(format!(
                "prefix and suffix need {affix_len} characters, maximum is {max}"
            )));
        }
        if let Some(kind) = set.semantic {
            if let Some(max) = length.max
                && max < kind.min_length()
            {
                return Err(self.conflict(format!(
                    "{} values need at least {} characters, maximum is {max}",
                    kind.name(),
                    kind.min_length()
                )));
            }
            if kind.fixed_upper_case() && case == Some(Case::Lower) {
                return Err(self.conflict(format!("{} values are upper case", kind.name())));
            }
        }
        let pattern = set.pattern.as_deref().map(Pattern::compile).transpose()?;
        Ok(TextRules {
            prefix: set.prefix.clone(),
            suffix: set.suffix.clone(),
            pattern,
            case,
            strip_whitespace: set.strip_whitespace,
        })
    }
}

fn tighten_lower(slot: &mut Option<i128>, value: i128) {
    *slot = Some(slot.map_or(value, |current| current.max(value)));
}

fn tighten_upper(slot: &mut Option<i128>, value: i128) {
    *slot = Some(slot.map_or(value, |current| current.min(value)));
}

fn tighter_limit(current: Limit, candidate: Limit, is_lower: bool) -> Limit {
    let tighter = if is_lower {
        candidate.value > current.value
    } else {
        candidate.value < current.value
    };
    if tighter {
        candidate
    } else if candidate.value == current.value {
        Limit {
            value: current.value,
            inclusive: current.inclusive && candidate.inclusive,
        }
    } else {
        current
    }
}

fn naive_utc(parsed: ParsedTimestamp) -> NaiveDateTime {
    match parsed {
        ParsedTimestamp::Naive(value) => value,
        ParsedTimestamp::Zoned(value) => value.naive_utc(),
    }
}

fn render_micros_time(micros: i128) -> String {
    i64::try_from(micros)
        .ok()
        .and_then(micros_to_time)
        .map_or_else(|| micros.to_string(), |value| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 15)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    #[test]
    fn exclusive_integer_bounds_become_inclusive() {
        let domain = compose(TypeDomain::integer(), ConstraintSet::new().gt(0).lt(10)).unwrap();
        assert_eq!(
            domain.bounds(),
            &Bounds::Integer {
                lower: Some(1),
                upper: Some(9)
            }
        );
        let explicit = compose(TypeDomain::integer(), ConstraintSet::new().ge(1).le(9)).unwrap();
        assert_eq!(domain.integer_lattice(), explicit.integer_lattice());
    }

    #[test]
    fn unsigned_bigint_bounds_stay_exact() {
        let upper: Literal = serde_json::from_str("18446744073709551610").unwrap();
        assert_eq!(upper, Literal::UInt(18_446_744_073_709_551_610));
        let domain = compose(
            TypeDomain::unsigned(crate::types::IntegerWidth::Big),
            ConstraintSet::new().ge(u64::MAX - 10).le(upper),
        )
        .unwrap();
        assert_eq!(
            domain.bounds(),
            &Bounds::Integer {
                lower: Some(i128::from(u64::MAX - 10)),
                upper: Some(18_446_744_073_709_551_610)
            }
        );
    }

    #[test]
    fn fractional_bounds_on_integers_round_inward() {
        let domain =
            compose(TypeDomain::integer(), ConstraintSet::new().ge(0.5).le(9.5)).unwrap();
        let lattice = domain.integer_lattice().unwrap();
        assert_eq!((lattice.lower, lattice.upper), (1, 9));
    }

    #[test]
    fn decimal_bounds_snap_to_scale() {
        let domain = compose(
            TypeDomain::decimal(5, 2),
            ConstraintSet::new().gt("0.001").lt(10),
        )
        .unwrap();
        let (scale, lattice) = domain.decimal_lattice().unwrap();
        assert_eq!(scale, 2);
        assert_eq!((lattice.lower, lattice.upper), (1, 999));
    }

    #[test]
    fn decimal_type_range_follows_precision() {
        let domain = EffectiveDomain::new(TypeDomain::decimal(5, 2)).unwrap();
        let (_, lattice) = domain.decimal_lattice().unwrap();
        assert_eq!((lattice.lower, lattice.upper), (-99_999, 99_999));

        let err = compose(TypeDomain::decimal(5, 2), ConstraintSet::new().ge(1000)).unwrap_err();
        assert!(matches!(err, DefinitionError::EmptyRange { .. }));
    }

    #[test]
    fn contradictory_bounds_fail_eagerly() {
        let err = compose(TypeDomain::integer(), ConstraintSet::new().ge(10).le(5)).unwrap_err();
        assert!(matches!(err, DefinitionError::EmptyRange { .. }));

        let err = compose(TypeDomain::tiny_int(), ConstraintSet::new().ge(200)).unwrap_err();
        assert!(matches!(err, DefinitionError::EmptyRange { .. }));

        let err = compose(TypeDomain::real(), ConstraintSet::new().gt(1.0).lt(1.0)).unwrap_err();
        assert!(matches!(err, DefinitionError::EmptyRange { .. }));
    }

    #[test]
    fn multiple_of_without_multiple_in_range() {
        let err = compose(
            TypeDomain::integer(),
            ConstraintSet::new().ge(11).le(19).multiple_of(10),
        )
        .unwrap_err();
        assert!(matches!(err, DefinitionError::NoMultipleInRange { .. }));

        let err = compose(
            TypeDomain::double(),
            ConstraintSet::new().gt(0.0).lt(0.5).multiple_of(0.5),
        )
        .unwrap_err();
        assert!(matches!(err, DefinitionError::NoMultipleInRange { .. }));

        let err = compose(
            TypeDomain::decimal(6, 2),
            ConstraintSet::new().multiple_of("0.005"),
        )
        .unwrap_err();
        assert!(matches!(err, DefinitionError::InvalidArgument { .. }));
    }

    #[test]
    fn nonsensical_combinations() {
        let err = compose(TypeDomain::integer(), ConstraintSet::new().pattern("[0-9]+")).unwrap_err();
        assert_eq!(
            err,
            DefinitionError::NotApplicable {
                constraint: "pattern",
                sql_type: "INTEGER".to_string()
            }
        );
        assert!(compose(TypeDomain::boolean(), ConstraintSet::new().ge(0)).is_err());
        assert!(compose(TypeDomain::varchar(10), ConstraintSet::new().multiple_of(2)).is_err());
        assert!(compose(TypeDomain::time(), ConstraintSet::new().past()).is_err());
        assert!(compose(TypeDomain::date(), ConstraintSet::new().min_length(1)).is_err());
        assert!(compose(TypeDomain::varchar(10), ConstraintSet::new().to_lower().to_upper()).is_err());
        assert!(compose(TypeDomain::varchar(10), ConstraintSet::new().to_lower().prefix("AB")).is_err());
        assert!(compose(TypeDomain::varchar(4), ConstraintSet::new().prefix("abc").suffix("de")).is_err());
        assert!(compose(TypeDomain::varchar(4), ConstraintSet::new().max_length(5)).is_err());
        assert!(compose(TypeDomain::varchar(10), ConstraintSet::new().min_length(6).max_length(5)).is_err());
        assert!(compose(TypeDomain::char(5), ConstraintSet::new().suffix("x ")).is_err());
    }

    #[test]
    fn invalid_pattern_is_a_definition_error() {
        let err = compose(TypeDomain::text(), ConstraintSet::new().pattern("(")).unwrap_err();
        assert!(matches!(err, DefinitionError::InvalidPattern { .. }));
    }

    #[test]
    fn past_and_future_resolve_against_reference() {
        let domain = compose_at(TypeDomain::date(), ConstraintSet::new().past(), reference()).unwrap();
        assert_eq!(
            domain.bounds(),
            &Bounds::Date {
                lower: None,
                upper: NaiveDate::from_ymd_opt(2024, 6, 14)
            }
        );

        let domain = compose_at(
            TypeDomain::timestamp_with(0, false),
            ConstraintSet::new().future(),
            reference(),
        )
        .unwrap();
        let Bounds::Timestamp { lower, upper } = domain.bounds() else {
            panic!("expected timestamp bounds");
        };
        assert_eq!(*lower, Some(reference() + chrono::Duration::seconds(1)));
        assert_eq!(*upper, None);
    }

    #[test]
    fn time_bounds_snap_to_precision() {
        let domain = compose(
            TypeDomain::time_with_precision(0),
            ConstraintSet::new().gt("09:00:00.5").lt("17:00"),
        )
        .unwrap();
        assert_eq!(
            domain.bounds(),
            &Bounds::Time {
                lower: NaiveTime::from_hms_opt(9, 0, 1),
                upper: NaiveTime::from_hms_opt(16, 59, 59)
            }
        );
    }

    #[test]
    fn exact_length_folds_into_limits() {
        let domain = compose(TypeDomain::varchar(10), ConstraintSet::new().length(4)).unwrap();
        assert_eq!(
            domain.length(),
            &LengthRule {
                min: 4,
                max: Some(4),
                exact: Some(4)
            }
        );
    }

    #[test]
    fn semantic_needs_room() {
        let err = compose(
            TypeDomain::varchar(4),
            ConstraintSet::new().semantic(SemanticKind::Email),
        )
        .unwrap_err();
        assert!(matches!(err, DefinitionError::Conflict { .. }));
    }
}
