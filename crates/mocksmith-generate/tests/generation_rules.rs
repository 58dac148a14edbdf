use chrono::{NaiveDate, NaiveDateTime};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rust_decimal::Decimal;

use mocksmith_core::{
    ConstraintSet, EffectiveDomain, FieldDescriptor, IntegerWidth, SemanticKind, TypeDomain,
    Value, compose, compose_at, validate,
};
use mocksmith_generate::{
    GenerationError, GenerationRequest, MockGenerator, Resolution, generate, resolve,
};

fn reference() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 6, 15)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap()
}

fn domains() -> Vec<EffectiveDomain> {
    vec![
        EffectiveDomain::new(TypeDomain::integer()).unwrap(),
        EffectiveDomain::new(TypeDomain::unsigned(IntegerWidth::Big)).unwrap(),
        compose(TypeDomain::tiny_int(), ConstraintSet::new().ge(-5).lt(7)).unwrap(),
        EffectiveDomain::new(TypeDomain::decimal(10, 2)).unwrap(),
        compose(
            TypeDomain::decimal(6, 3),
            ConstraintSet::new().between("-1.5", "2.25").multiple_of("0.25"),
        )
        .unwrap(),
        EffectiveDomain::new(TypeDomain::money()).unwrap(),
        EffectiveDomain::new(TypeDomain::real()).unwrap(),
        compose(TypeDomain::double(), ConstraintSet::new().gt(0.0).lt(1.0)).unwrap(),
        compose(TypeDomain::double(), ConstraintSet::new().multiple_of(0.5).le(-3.0)).unwrap(),
        EffectiveDomain::new(TypeDomain::boolean()).unwrap(),
        EffectiveDomain::new(TypeDomain::date()).unwrap(),
        compose_at(TypeDomain::date(), ConstraintSet::new().past(), reference()).unwrap(),
        EffectiveDomain::new(TypeDomain::time_with_precision(0)).unwrap(),
        compose(
            TypeDomain::time(),
            ConstraintSet::new().between("08:00:00", "17:30:00"),
        )
        .unwrap(),
        EffectiveDomain::new(TypeDomain::timestamp()).unwrap(),
        EffectiveDomain::new(TypeDomain::timestamp_with(3, false)).unwrap(),
        compose_at(
            TypeDomain::datetime(),
            ConstraintSet::new().future(),
            reference(),
        )
        .unwrap(),
        EffectiveDomain::new(TypeDomain::char(10)).unwrap(),
        EffectiveDomain::new(TypeDomain::varchar(1)).unwrap(),
        EffectiveDomain::new(TypeDomain::text()).unwrap(),
        compose(
            TypeDomain::varchar(30),
            ConstraintSet::new().prefix("ord_").to_lower().min_length(10),
        )
        .unwrap(),
        compose(
            TypeDomain::text_with_max(64),
            ConstraintSet::new().pattern("[a-f0-9]{8}(-[a-f0-9]{4}){2}"),
        )
        .unwrap(),
        EffectiveDomain::new(TypeDomain::binary(4)).unwrap(),
        EffectiveDomain::new(TypeDomain::varbinary(16)).unwrap(),
        EffectiveDomain::new(TypeDomain::blob_with_max(20)).unwrap(),
        EffectiveDomain::new(TypeDomain::choice(["draft", "sent", "paid"])).unwrap(),
        EffectiveDomain::new(TypeDomain::choice([1, 2, 3])).unwrap(),
        SemanticKind::Email.domain().unwrap(),
        SemanticKind::CountryCode.domain().unwrap(),
        compose(
            TypeDomain::varchar(12),
            ConstraintSet::new()
                .semantic(SemanticKind::City)
                .to_upper(),
        )
        .unwrap(),
    ]
}

#[test]
fn generated_values_round_trip_through_validation() {
    for (idx, domain) in domains().iter().enumerate() {
        let mut rng = ChaCha8Rng::seed_from_u64(idx as u64);
        for _ in 0..200 {
            let value = generate(domain, &mut rng, None)
                .unwrap_or_else(|err| panic!("{}: {err}", domain.sql_type()));
            let canonical = validate(&value, domain)
                .unwrap_or_else(|err| panic!("{}: {err}", domain.sql_type()));
            assert_eq!(canonical, value, "{}", domain.sql_type());
        }
    }
}

#[test]
fn intersected_ranges_are_respected() {
    let domain = compose(
        TypeDomain::integer(),
        ConstraintSet::new().ge(0).gt(5).le(100).lt(50),
    )
    .unwrap();
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    for _ in 0..1000 {
        let value = generate(&domain, &mut rng, None).unwrap();
        let n = value.as_i128().unwrap();
        assert!((6..=49).contains(&n), "{n}");
    }
}

#[test]
fn multiples_cover_the_whole_lattice() {
    let domain = compose(
        TypeDomain::integer(),
        ConstraintSet::new().between(0, 100).multiple_of(10),
    )
    .unwrap();
    let mut rng = ChaCha8Rng::seed_from_u64(11);
    let mut seen = std::collections::BTreeSet::new();
    for _ in 0..1000 {
        let n = generate(&domain, &mut rng, None).unwrap().as_i128().unwrap();
        assert_eq!(n % 10, 0);
        seen.insert(n);
    }
    assert_eq!(seen.len(), 11);
}

#[test]
fn decimals_keep_declared_scale() {
    let domain = EffectiveDomain::new(TypeDomain::decimal(5, 2)).unwrap();
    let mut rng = ChaCha8Rng::seed_from_u64(5);
    for _ in 0..200 {
        let value = generate(&domain, &mut rng, None).unwrap();
        let decimal: Decimal = value.as_decimal().unwrap();
        assert_eq!(decimal.scale(), 2);
        assert!(decimal.abs() <= Decimal::new(99_999, 2));
    }
}

#[test]
fn optional_absence_rate_tracks_probability() {
    let generator = MockGenerator::default();
    let field = FieldDescriptor::new("nickname", EffectiveDomain::new(TypeDomain::varchar(20)).unwrap())
        .optional();
    let mut rng = ChaCha8Rng::seed_from_u64(2024);
    let runs = 10_000;
    let mut absent = 0;
    for _ in 0..runs {
        let resolution = resolve(&field, GenerationRequest::default(), &generator, &mut rng).unwrap();
        if resolution.is_absent() {
            absent += 1;
        }
    }
    let rate = f64::from(absent) / f64::from(runs);
    assert!((rate - 0.2).abs() < 0.02, "absence rate {rate}");
}

#[test]
fn override_wins_regardless_of_seed() {
    let generator = MockGenerator::default();
    let field = FieldDescriptor::new("code", EffectiveDomain::new(TypeDomain::char(5)).unwrap());
    let raw = Value::from("ab");
    for seed in 0..20 {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let resolution = resolve(
            &field,
            GenerationRequest::with_override(&raw),
            &generator,
            &mut rng,
        )
        .unwrap();
        assert_eq!(resolution, Resolution::Value(Value::from("ab   ")));
    }
}

#[test]
fn invalid_override_matches_direct_validation() {
    let domain = EffectiveDomain::new(TypeDomain::char(3)).unwrap();
    let raw = Value::from("abcd");
    let mut rng = ChaCha8Rng::seed_from_u64(0);
    let err = generate(&domain, &mut rng, Some(&raw)).unwrap_err();
    let direct = validate(&raw, &domain).unwrap_err();
    match err {
        GenerationError::InvalidOverride(source) => assert_eq!(source, direct),
        other => panic!("unexpected error {other}"),
    }
}

#[test]
fn same_seed_same_values() {
    let domains = domains();
    let run = |seed: u64| -> Vec<Value> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        domains
            .iter()
            .map(|domain| generate(domain, &mut rng, None).unwrap())
            .collect()
    };
    assert_eq!(run(99), run(99));
    assert_ne!(run(99), run(100));
}

#[test]
fn semantic_values_fit_narrow_columns() {
    let domain = compose(
        TypeDomain::varchar(6),
        ConstraintSet::new().semantic(SemanticKind::FirstName),
    )
    .unwrap();
    let mut rng = ChaCha8Rng::seed_from_u64(8);
    for _ in 0..200 {
        let value = generate(&domain, &mut rng, None).unwrap();
        let text = value.as_str().unwrap();
        assert!((1..=6).contains(&text.chars().count()), "{text}");
    }
}

#[test]
fn options_load_from_toml() {
    let options = mocksmith_generate::GenerateOptions::from_toml_str(
        r#"
absent_probability = 1.0
text_max = 5
"#,
    )
    .unwrap();
    let generator = MockGenerator::new(options).unwrap();
    let domain = EffectiveDomain::new(TypeDomain::text()).unwrap();
    let mut rng = ChaCha8Rng::seed_from_u64(1);
    let value = generator.generate(&domain, None, &mut rng).unwrap();
    assert!(value.as_str().unwrap().chars().count() <= 5);

    let field = FieldDescriptor::new("note", domain).optional();
    let resolution = resolve(&field, GenerationRequest::default(), &generator, &mut rng).unwrap();
    assert_eq!(resolution, Resolution::Absent);
}

fn assert_generates(domain: &EffectiveDomain, seed: u64, runs: usize) -> Vec<Value> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..runs)
        .map(|_| {
            let value = generate(domain, &mut rng, None)
                .unwrap_or_else(|err| panic!("{}: {err}", domain.sql_type()));
            let canonical = validate(&value, domain)
                .unwrap_or_else(|err| panic!("{}: {err}", domain.sql_type()));
            assert_eq!(canonical, value, "{}", domain.sql_type());
            value
        })
        .collect()
}

#[test]
fn patterns_combine_with_prefix_and_suffix() {
    let cases = [
        compose(
            TypeDomain::varchar(10),
            ConstraintSet::new().prefix("AB").pattern("[A-Z0-9]{6}"),
        ),
        compose(
            TypeDomain::varchar(12),
            ConstraintSet::new().suffix("-X").pattern("[a-z]{2,5}-X"),
        ),
        compose(
            TypeDomain::char(8),
            ConstraintSet::new()
                .prefix("ID")
                .suffix("9")
                .pattern("[A-Z0-9]{4,8}"),
        ),
        compose(
            TypeDomain::varchar(10),
            ConstraintSet::new()
                .semantic(SemanticKind::FirstName)
                .prefix("AB")
                .pattern("[A-Z]{6}"),
        ),
        compose(
            TypeDomain::varchar(10),
            ConstraintSet::new()
                .semantic(SemanticKind::ZipCode)
                .prefix("Z-")
                .pattern("Z-[0-9]{5}"),
        ),
    ];
    for (idx, domain) in cases.into_iter().enumerate() {
        let domain = domain.unwrap();
        let rules = domain.text();
        for value in assert_generates(&domain, idx as u64, 100) {
            let text = value.as_str().unwrap().trim_end();
            if let Some(prefix) = &rules.prefix {
                assert!(text.starts_with(prefix.as_str()), "{text}");
            }
            if let Some(suffix) = &rules.suffix {
                assert!(text.ends_with(suffix.as_str()), "{text}");
            }
        }
    }
}

#[test]
fn char_affixes_fill_the_whole_width() {
    let exact = compose(TypeDomain::char(3), ConstraintSet::new().prefix("ab ")).unwrap();
    for value in assert_generates(&exact, 1, 20) {
        assert_eq!(value, Value::from("ab "));
    }

    let both = compose(TypeDomain::char(4), ConstraintSet::new().prefix("ab").suffix("cd")).unwrap();
    for value in assert_generates(&both, 2, 20) {
        assert_eq!(value, Value::from("abcd"));
    }

    let spaced = compose(TypeDomain::char(6), ConstraintSet::new().prefix("ab ")).unwrap();
    for value in assert_generates(&spaced, 3, 50) {
        let text = value.as_str().unwrap();
        assert!(text.starts_with("ab ") && text.chars().count() == 6, "{text}");
    }
}
