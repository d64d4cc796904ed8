//! Filter compilation and evaluation benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use gwstore_bench::{random_tags, TAG_POOL};
use gwstore_filter::compile_filter;

/// A conjunction of `n` membership tests.
fn conjunction(n: usize) -> String {
    (0..n)
        .map(|i| format!("{:?} in tags", TAG_POOL[i % TAG_POOL.len()]))
        .collect::<Vec<_>>()
        .join(" && ")
}

/// Benchmark compiling expressions of growing size.
fn bench_compile(c: &mut Criterion) {
    let mut group = c.benchmark_group("compile");

    group.bench_function("membership", |b| {
        b.iter(|| compile_filter(black_box(r#""prod" in tags"#)).unwrap());
    });

    group.bench_function("exists_macro", |b| {
        let expr = r#"["prod", "eu", "pci"].exists(x, x in tags)"#;
        b.iter(|| compile_filter(black_box(expr)).unwrap());
    });

    for n in [4, 16, 64] {
        let expr = conjunction(n);
        group.throughput(Throughput::Bytes(expr.len() as u64));
        group.bench_with_input(BenchmarkId::new("conjunction", n), &expr, |b, expr| {
            b.iter(|| compile_filter(black_box(expr)).unwrap());
        });
    }

    group.bench_function("rejected_mixed_operators", |b| {
        let expr = r#""a" in tags && "b" in tags || "c" in tags"#;
        b.iter(|| compile_filter(black_box(expr)).unwrap_err());
    });

    group.finish();
}

/// Benchmark evaluating compiled filters against random tag sets.
fn bench_evaluate(c: &mut Criterion) {
    let mut group = c.benchmark_group("evaluate");
    let tag_sets: Vec<Vec<String>> = (0..256).map(|_| random_tags(6)).collect();
    group.throughput(Throughput::Elements(tag_sets.len() as u64));

    for (name, expr) in [
        ("membership", r#""prod" in tags"#.to_string()),
        ("all_macro", r#"["prod", "eu"].all(x, x in tags)"#.to_string()),
        ("disjunction_8", conjunction(8).replace("&&", "||")),
    ] {
        let filter = compile_filter(&expr).unwrap();
        group.bench_function(name, |b| {
            b.iter(|| {
                tag_sets
                    .iter()
                    .filter(|tags| filter.matches(black_box(tags)).unwrap())
                    .count()
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_compile, bench_evaluate);
criterion_main!(benches);
