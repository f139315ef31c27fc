//! Throughput Benchmark for ttlkv
//!
//! This benchmark measures the performance of the store under various
//! workloads. Entries are written with a long TTL so the sweep stays idle
//! and the numbers reflect the map + index operations themselves.

use bytes::Bytes;
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use std::sync::Arc;
use std::time::Duration;
use ttlkv::TtlStore;

/// TTL long enough that nothing expires mid-benchmark.
const TTL: Duration = Duration::from_secs(3600);

/// Builds a store on a dedicated runtime; the runtime must outlive the
/// store so the sweep chain has somewhere to run.
fn setup() -> (tokio::runtime::Runtime, Arc<TtlStore<Bytes, Bytes>>) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let store = {
        let _guard = runtime.enter();
        Arc::new(TtlStore::new())
    };
    (runtime, store)
}

/// Benchmark SETEX operations
fn bench_setex(c: &mut Criterion) {
    let (_runtime, store) = setup();

    let mut group = c.benchmark_group("setex");
    group.throughput(Throughput::Elements(1));

    group.bench_function("setex_small", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let key = Bytes::from(format!("key:{}", i));
            let value = Bytes::from("small_value");
            store.setex(key, TTL, value).unwrap();
            i += 1;
        });
    });

    group.bench_function("setex_medium", |b| {
        let mut i = 0u64;
        let value = Bytes::from("x".repeat(1024)); // 1KB value
        b.iter(|| {
            let key = Bytes::from(format!("key:{}", i));
            store.setex(key, TTL, value.clone()).unwrap();
            i += 1;
        });
    });

    group.bench_function("setex_large", |b| {
        let mut i = 0u64;
        let value = Bytes::from("x".repeat(64 * 1024)); // 64KB value
        b.iter(|| {
            let key = Bytes::from(format!("key:{}", i));
            store.setex(key, TTL, value.clone()).unwrap();
            i += 1;
        });
    });

    group.finish();
}

/// Benchmark GET operations
fn bench_get(c: &mut Criterion) {
    let (_runtime, store) = setup();

    // Pre-populate with data
    for i in 0..100_000 {
        let key = Bytes::from(format!("key:{}", i));
        let value = Bytes::from(format!("value:{}", i));
        store.setex(key, TTL, value).unwrap();
    }

    let mut group = c.benchmark_group("get");
    group.throughput(Throughput::Elements(1));

    group.bench_function("get_existing", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let key = Bytes::from(format!("key:{}", i % 100_000));
            black_box(store.get(&key).ok());
            i += 1;
        });
    });

    group.bench_function("get_missing", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let key = Bytes::from(format!("missing:{}", i));
            black_box(store.get(&key).ok());
            i += 1;
        });
    });

    group.finish();
}

/// Benchmark mixed workload (80% reads, 20% writes)
fn bench_mixed(c: &mut Criterion) {
    let (_runtime, store) = setup();

    // Pre-populate
    for i in 0..10_000 {
        let key = Bytes::from(format!("key:{}", i));
        let value = Bytes::from(format!("value:{}", i));
        store.setex(key, TTL, value).unwrap();
    }

    let mut group = c.benchmark_group("mixed");
    group.throughput(Throughput::Elements(1));

    group.bench_function("80_read_20_write", |b| {
        let mut i = 0u64;
        b.iter(|| {
            if i % 5 == 0 {
                // 20% writes
                let key = Bytes::from(format!("new:{}", i));
                let value = Bytes::from("value");
                store.setex(key, TTL, value).unwrap();
            } else {
                // 80% reads
                let key = Bytes::from(format!("key:{}", i % 10_000));
                black_box(store.get(&key).ok());
            }
            i += 1;
        });
    });

    group.finish();
}

criterion_group!(benches, bench_setex, bench_get, bench_mixed);
criterion_main!(benches);
