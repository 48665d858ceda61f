use criterion::{black_box, criterion_group, criterion_main, Criterion};

use qtiforge_core::model::BaseType;
use qtiforge_core::variables::{coerce, ClientValue};

fn bench_coercion(c: &mut Criterion) {
    let mut group = c.benchmark_group("coercion");

    let integer = ClientValue::Scalar("12345".into());
    let float = ClientValue::Scalar("-3.25".into());
    let point = ClientValue::List(vec!["37".into(), "42".into()]);
    let junk = ClientValue::Scalar("not a number at all".into());

    group.bench_function("integer", |b| {
        b.iter(|| coerce(BaseType::Integer, black_box(&integer)))
    });

    group.bench_function("float", |b| {
        b.iter(|| coerce(BaseType::Float, black_box(&float)))
    });

    group.bench_function("point", |b| {
        b.iter(|| coerce(BaseType::Point, black_box(&point)))
    });

    group.bench_function("integer_fallback", |b| {
        b.iter(|| coerce(BaseType::Integer, black_box(&junk)))
    });

    group.finish();
}

fn bench_test_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("test_parsing");

    let small = generate_test_toml(5);
    let medium = generate_test_toml(50);
    let large = generate_test_toml(200);

    group.bench_function("5_items", |b| {
        b.iter(|| {
            qtiforge_core::parser::parse_test_str(
                black_box(&small),
                black_box("bench.toml".as_ref()),
            )
        })
    });

    group.bench_function("50_items", |b| {
        b.iter(|| {
            qtiforge_core::parser::parse_test_str(
                black_box(&medium),
                black_box("bench.toml".as_ref()),
            )
        })
    });

    group.bench_function("200_items", |b| {
        b.iter(|| {
            qtiforge_core::parser::parse_test_str(
                black_box(&large),
                black_box("bench.toml".as_ref()),
            )
        })
    });

    group.finish();
}

fn generate_test_toml(n: usize) -> String {
    let mut s = String::new();
    s.push_str(
        r#"[test]
identifier = "bench"
title = "Benchmark"

[[parts]]
identifier = "p1"
navigation_mode = "linear"

[[parts.sections]]
identifier = "s1"
title = "Section 1"
"#,
    );
    for i in 0..n {
        s.push_str(&format!(
            r#"
[[parts.sections.item_refs]]
identifier = "item_{i}"
href = "items/item_{i}.toml"
"#
        ));
    }
    s
}

criterion_group!(benches, bench_coercion, bench_test_parsing);
criterion_main!(benches);
