use chrono::{Datelike, Duration, NaiveDate};
use rand::{Rng, RngCore};

use mocksmith_core::Bounds;
use mocksmith_core::domain::{Lattice, Limit, Step, float_multiples, units_to_decimal};
use mocksmith_core::temporal::{
    MICROS_PER_DAY, ceil_to_unit, floor_to_unit, micros_to_time, micros_to_timestamp,
    time_to_micros, timestamp_to_micros, unit_micros,
};
use mocksmith_core::{TypeDomain, Value};

use crate::errors::GenerationError;
use crate::generators::{Generator, GeneratorContext, GeneratorRegistry};

/// Floats sampled on a multiple-of lattice cap the index span at 2^53.
const MAX_FLOAT_STEPS: f64 = 9_007_199_254_740_992.0;

pub fn register(registry: &mut GeneratorRegistry) {
    registry.register_generator(Box::new(IntGenerator));
    registry.register_generator(Box::new(DecimalGenerator));
    registry.register_generator(Box::new(FloatGenerator));
    registry.register_generator(Box::new(BoolGenerator));
    registry.register_generator(Box::new(DateGenerator));
    registry.register_generator(Box::new(TimeGenerator));
    registry.register_generator(Box::new(TimestampGenerator));
    registry.register_generator(Box::new(BinaryGenerator));
    registry.register_generator(Box::new(ChoiceGenerator));
}

/// Uniform multiple of the lattice step within its bounds.
fn sample_lattice(
    ctx: &GeneratorContext<'_>,
    lattice: Lattice,
    rng: &mut dyn RngCore,
) -> Result<i128, GenerationError> {
    let (first, last) = lattice.multiples().ok_or_else(|| {
        ctx.unsatisfiable(format!(
            "no multiple of {} in [{}, {}]",
            lattice.step, lattice.lower, lattice.upper
        ))
    })?;
    let k = rng.random_range(first..=last);
    k.checked_mul(lattice.step)
        .ok_or_else(|| ctx.unsatisfiable("lattice value out of range"))
}

struct IntGenerator;

impl Generator for IntGenerator {
    fn id(&self) -> &'static str {
        "primitive.int"
    }

    fn generate(
        &self,
        ctx: &GeneratorContext<'_>,
        rng: &mut dyn RngCore,
    ) -> Result<Value, GenerationError> {
        let lattice = ctx
            .domain
            .integer_lattice()
            .ok_or_else(|| ctx.unsatisfiable("not an integer domain"))?;
        Ok(Value::Int(sample_lattice(ctx, lattice, rng)?))
    }
}

struct DecimalGenerator;

impl Generator for DecimalGenerator {
    fn id(&self) -> &'static str {
        "primitive.decimal"
    }

    /// Samples whole units of the declared scale, so the value already has
    /// the right number of fractional digits.
    fn generate(
        &self,
        ctx: &GeneratorContext<'_>,
        rng: &mut dyn RngCore,
    ) -> Result<Value, GenerationError> {
        let (scale, lattice) = ctx
            .domain
            .decimal_lattice()
            .ok_or_else(|| ctx.unsatisfiable("not a decimal domain"))?;
        let units = sample_lattice(ctx, lattice, rng)?;
        units_to_decimal(units, scale)
            .map(Value::Decimal)
            .ok_or_else(|| ctx.unsatisfiable("decimal out of range"))
    }
}

struct FloatGenerator;

impl Generator for FloatGenerator {
    fn id(&self) -> &'static str {
        "primitive.float"
    }

    fn generate(
        &self,
        ctx: &GeneratorContext<'_>,
        rng: &mut dyn RngCore,
    ) -> Result<Value, GenerationError> {
        let (lower, upper) = ctx
            .domain
            .float_limits()
            .ok_or_else(|| ctx.unsatisfiable("not a float domain"))?;
        let (declared_lower, declared_upper) = match ctx.domain.bounds() {
            Bounds::Float { lower, upper } => (lower.is_some(), upper.is_some()),
            _ => (false, false),
        };
        let options = ctx.options;
        let span = options.float_span();
        let closed = |value: f64| Limit {
            value,
            inclusive: true,
        };

        // Unbounded sides fall back to the default window, or extend from
        // the declared side by the window's span.
        let (lower, upper) = match (declared_lower, declared_upper) {
            (true, true) => (lower, upper),
            (true, false) => (lower, closed(upper.value.min(lower.value + span))),
            (false, true) => (closed(lower.value.max(upper.value - span)), upper),
            (false, false) => (
                closed(options.float_min.max(lower.value)),
                closed(options.float_max.min(upper.value)),
            ),
        };

        if let Some(Step::Float(step)) = ctx.domain.step() {
            let (first, last) = float_multiples(lower, upper, step)
                .ok_or_else(|| ctx.unsatisfiable(format!("no multiple of {step} in range")))?;
            let steps = (last - first).min(MAX_FLOAT_STEPS) as u64;
            let k = first + rng.random_range(0..=steps) as f64;
            return Ok(Value::Float(k * step));
        }

        let low = if lower.inclusive {
            lower.value
        } else {
            lower.value.next_up()
        };
        let high = if upper.inclusive {
            upper.value
        } else {
            upper.value.next_down()
        };
        if low > high {
            return Err(ctx.unsatisfiable(format!("empty interval ({low}, {high})")));
        }
        let u: f64 = rng.random();
        let value = (low * (1.0 - u) + high * u).clamp(low, high);
        Ok(Value::Float(value))
    }
}

struct BoolGenerator;

impl Generator for BoolGenerator {
    fn id(&self) -> &'static str {
        "primitive.bool"
    }

    fn generate(
        &self,
        _ctx: &GeneratorContext<'_>,
        rng: &mut dyn RngCore,
    ) -> Result<Value, GenerationError> {
        Ok(Value::Bool(rng.random_bool(0.5)))
    }
}

/// Inclusive integer window: declared sides as given, missing sides from the
/// default window or extended from the declared side by `span`.
fn window(
    lower: Option<i128>,
    upper: Option<i128>,
    default: (i128, i128),
    span: i128,
) -> (i128, i128) {
    match (lower, upper) {
        (Some(lower), Some(upper)) => (lower, upper),
        (Some(lower), None) => (lower, lower + span),
        (None, Some(upper)) => (upper - span, upper),
        (None, None) => default,
    }
}

struct DateGenerator;

impl Generator for DateGenerator {
    fn id(&self) -> &'static str {
        "primitive.date"
    }

    fn generate(
        &self,
        ctx: &GeneratorContext<'_>,
        rng: &mut dyn RngCore,
    ) -> Result<Value, GenerationError> {
        let day = |date: NaiveDate| i128::from(date.num_days_from_ce());
        let (lower, upper) = match ctx.domain.bounds() {
            Bounds::Date { lower, upper } => (lower.map(day), upper.map(day)),
            _ => (None, None),
        };
        let base = day(ctx.options.base_date);
        let default = (
            base - i128::from(ctx.options.past_days),
            base + i128::from(ctx.options.future_days),
        );
        let (low, high) = window(lower, upper, default, i128::from(ctx.options.window_days()));
        let low = low.max(day(NaiveDate::MIN));
        let high = high.min(day(NaiveDate::MAX));
        if low > high {
            return Err(ctx.unsatisfiable("empty date window"));
        }
        let picked = rng.random_range(low..=high);
        i32::try_from(picked)
            .ok()
            .and_then(NaiveDate::from_num_days_from_ce_opt)
            .map(Value::Date)
            .ok_or_else(|| ctx.unsatisfiable("date out of range"))
    }
}

struct TimeGenerator;

impl Generator for TimeGenerator {
    fn id(&self) -> &'static str {
        "primitive.time"
    }

    fn generate(
        &self,
        ctx: &GeneratorContext<'_>,
        rng: &mut dyn RngCore,
    ) -> Result<Value, GenerationError> {
        let TypeDomain::Time { precision } = ctx.domain.type_domain() else {
            return Err(ctx.unsatisfiable("not a time domain"));
        };
        let unit = unit_micros(*precision);
        let (lower, upper) = match ctx.domain.bounds() {
            Bounds::Time { lower, upper } => (*lower, *upper),
            _ => (None, None),
        };
        let low = lower.map_or(0, time_to_micros);
        let high = upper.map_or(MICROS_PER_DAY - 1, time_to_micros);
        let first = ceil_to_unit(low, unit) / unit;
        let last = floor_to_unit(high, unit) / unit;
        if first > last {
            return Err(ctx.unsatisfiable("empty time window"));
        }
        let micros = rng.random_range(first..=last) * unit;
        micros_to_time(micros)
            .map(Value::Time)
            .ok_or_else(|| ctx.unsatisfiable("time out of range"))
    }
}

struct TimestampGenerator;

impl Generator for TimestampGenerator {
    fn id(&self) -> &'static str {
        "primitive.timestamp"
    }

    fn generate(
        &self,
        ctx: &GeneratorContext<'_>,
        rng: &mut dyn RngCore,
    ) -> Result<Value, GenerationError> {
        let TypeDomain::Timestamp {
            precision,
            with_timezone,
        } = ctx.domain.type_domain()
        else {
            return Err(ctx.unsatisfiable("not a timestamp domain"));
        };
        let unit = i128::from(unit_micros(*precision));
        let micros = |value| i128::from(timestamp_to_micros(value));
        let (lower, upper) = match ctx.domain.bounds() {
            Bounds::Timestamp { lower, upper } => (lower.map(micros), upper.map(micros)),
            _ => (None, None),
        };
        let options = ctx.options;
        let base = options.base_date;
        let window_start = base - Duration::days(i64::from(options.past_days));
        let window_end = base + Duration::days(i64::from(options.future_days));
        let default = (
            micros(window_start.and_time(chrono::NaiveTime::MIN)),
            micros(window_end.and_time(chrono::NaiveTime::MIN)),
        );
        let span = i128::from(options.window_days()) * i128::from(MICROS_PER_DAY);
        let (low, high) = window(lower, upper, default, span);
        let first = -(-low).div_euclid(unit);
        let last = high.div_euclid(unit);
        if first > last {
            return Err(ctx.unsatisfiable("empty timestamp window"));
        }
        let picked = rng.random_range(first..=last) * unit;
        let value = i64::try_from(picked)
            .ok()
            .and_then(micros_to_timestamp)
            .ok_or_else(|| ctx.unsatisfiable("timestamp out of range"))?;
        if *with_timezone {
            Ok(Value::TimestampTz(value.and_utc().fixed_offset()))
        } else {
            Ok(Value::Timestamp(value))
        }
    }
}

struct BinaryGenerator;

impl Generator for BinaryGenerator {
    fn id(&self) -> &'static str {
        "primitive.binary"
    }

    fn generate(
        &self,
        ctx: &GeneratorContext<'_>,
        rng: &mut dyn RngCore,
    ) -> Result<Value, GenerationError> {
        let length = ctx.domain.length();
        let size = match ctx.domain.type_domain() {
            TypeDomain::Binary { length } => *length,
            TypeDomain::Blob { max_length: None } if length.max.is_none() => {
                let low = ctx.options.blob_min.max(length.min);
                let high = ctx.options.blob_max.max(low);
                rng.random_range(low..=high)
            }
            _ => {
                let high = length.max.unwrap_or(ctx.options.blob_max);
                let low = length.min.max(1).min(high);
                rng.random_range(low..=high)
            }
        };
        let mut bytes = vec![0_u8; size];
        rng.fill_bytes(&mut bytes);
        Ok(Value::Bytes(bytes))
    }
}

struct ChoiceGenerator;

impl Generator for ChoiceGenerator {
    fn id(&self) -> &'static str {
        "primitive.choice"
    }

    fn generate(
        &self,
        ctx: &GeneratorContext<'_>,
        rng: &mut dyn RngCore,
    ) -> Result<Value, GenerationError> {
        let TypeDomain::Choice { members } = ctx.domain.type_domain() else {
            return Err(ctx.unsatisfiable("not a choice domain"));
        };
        if members.is_empty() {
            return Err(ctx.unsatisfiable("choice has no members"));
        }
        let idx = rng.random_range(0..members.len());
        Ok(members[idx].to_value())
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use mocksmith_core::{ConstraintSet, EffectiveDomain, compose};

    use super::*;
    use crate::model::GenerateOptions;

    fn sample(generator: &dyn Generator, domain: &EffectiveDomain, seed: u64) -> Value {
        let options = GenerateOptions::default();
        let ctx = GeneratorContext {
            domain,
            options: &options,
        };
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        generator.generate(&ctx, &mut rng).expect("value generated")
    }

    #[test]
    fn unbounded_floats_use_default_window() {
        let domain = EffectiveDomain::new(TypeDomain::double()).unwrap();
        for seed in 0..200 {
            let value = sample(&FloatGenerator, &domain, seed).as_f64().unwrap();
            assert!((0.0..=10000.0).contains(&value));
        }
    }

    #[test]
    fn one_sided_float_bound_extends_by_span() {
        let domain = compose(TypeDomain::double(), ConstraintSet::new().gt(-50.0)).unwrap();
        for seed in 0..200 {
            let value = sample(&FloatGenerator, &domain, seed).as_f64().unwrap();
            assert!(value > -50.0 && value <= 9950.0, "{value}");
        }
    }

    #[test]
    fn unbounded_dates_stay_in_documented_window() {
        let domain = EffectiveDomain::new(TypeDomain::date()).unwrap();
        let low = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() - Duration::days(3650);
        let high = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + Duration::days(365);
        for seed in 0..200 {
            let value = sample(&DateGenerator, &domain, seed).as_date().unwrap();
            assert!(value >= low && value <= high);
        }
    }

    #[test]
    fn varbinary_sizes_within_width() {
        let domain = EffectiveDomain::new(TypeDomain::varbinary(8)).unwrap();
        for seed in 0..100 {
            let len = sample(&BinaryGenerator, &domain, seed).as_bytes().unwrap().len();
            assert!((1..=8).contains(&len));
        }
    }

    #[test]
    fn default_blob_size_window() {
        let domain = EffectiveDomain::new(TypeDomain::blob()).unwrap();
        for seed in 0..50 {
            let len = sample(&BinaryGenerator, &domain, seed).as_bytes().unwrap().len();
            assert!((100..=1000).contains(&len));
        }
    }
}
