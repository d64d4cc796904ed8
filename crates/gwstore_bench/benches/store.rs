//! Object store benchmarks over the in-memory backend.

use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use gwstore_bench::generate_services;
use gwstore_core::{
    Context, DeleteOpts, ListOpts, ObjectStore, ObjectType, ReadOpts, Service, StoreConfig,
};
use gwstore_kv::InMemoryKv;
use std::sync::Arc;

fn populated(count: usize) -> (ObjectStore, Vec<Service>) {
    let store = ObjectStore::new(Arc::new(InMemoryKv::new()), StoreConfig::default());
    let ctx = Context::background();
    let mut services = generate_services(count);
    for svc in &mut services {
        store.create(&ctx, svc).unwrap();
    }
    (store, services)
}

/// Benchmark single-object mutations.
fn bench_mutations(c: &mut Criterion) {
    let mut group = c.benchmark_group("mutate");
    let ctx = Context::background();

    group.bench_function("create", |b| {
        b.iter_batched(
            || (populated(0).0, generate_services(1)),
            |(store, mut services)| store.create(&ctx, &mut services[0]).unwrap(),
            BatchSize::SmallInput,
        );
    });

    group.bench_function("upsert_rename", |b| {
        b.iter_batched(
            || populated(1),
            |(store, mut services)| {
                services[0].name = "renamed".to_string();
                store.upsert(&ctx, &mut services[0]).unwrap();
            },
            BatchSize::SmallInput,
        );
    });

    group.bench_function("delete", |b| {
        b.iter_batched(
            || populated(1),
            |(store, services)| {
                let opts = DeleteOpts::new(ObjectType::Service, services[0].meta.id.clone());
                store.delete(&ctx, &opts).unwrap();
            },
            BatchSize::SmallInput,
        );
    });

    group.finish();
}

/// Benchmark reads and listings over populated stores.
fn bench_reads(c: &mut Criterion) {
    let mut group = c.benchmark_group("read");
    let ctx = Context::background();
    let (store, services) = populated(1_000);

    group.bench_function("by_id", |b| {
        let opts = ReadOpts::by_id(services[500].meta.id.clone());
        b.iter(|| {
            let mut svc = Service::default();
            store.read(&ctx, &mut svc, &opts).unwrap();
            svc
        });
    });

    group.bench_function("by_name", |b| {
        let opts = ReadOpts::by_name("svc-500");
        b.iter(|| {
            let mut svc = Service::default();
            store.read(&ctx, &mut svc, &opts).unwrap();
            svc
        });
    });

    for page_size in [10, 100, 1000] {
        let opts = ListOpts::builder().page_size(page_size).build().unwrap();
        group.bench_with_input(BenchmarkId::new("list", page_size), &opts, |b, opts| {
            b.iter(|| store.list(&ctx, ObjectType::Service, opts).unwrap());
        });
    }

    let filtered = ListOpts::builder()
        .with_filter_expr(r#"["prod", "eu"].exists(x, x in tags)"#)
        .build()
        .unwrap();
    group.bench_function("list_filtered", |b| {
        b.iter(|| store.list(&ctx, ObjectType::Service, &filtered).unwrap());
    });

    group.finish();
}

criterion_group!(benches, bench_mutations, bench_reads);
criterion_main!(benches);
