//! Throughput Benchmark for EmberKV
//!
//! Measures the store on its own and the full
//! parse → dispatch → encode path a connection runs per request.

use bytes::Bytes;
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use emberkv::commands::CommandDispatcher;
use emberkv::protocol::{frame_request, RequestParser};
use emberkv::storage::{Expiry, StorageEngine};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

/// Benchmark SET operations
fn bench_set(c: &mut Criterion) {
    let engine = Arc::new(StorageEngine::new());

    let mut group = c.benchmark_group("set");
    group.throughput(Throughput::Elements(1));

    group.bench_function("set_small", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let key = Bytes::from(format!("key:{}", i));
            engine.set(key, Bytes::from_static(b"small_value"), Expiry::Never);
            i += 1;
        });
    });

    group.bench_function("set_with_ttl", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let key = Bytes::from(format!("key:{}", i));
            let expiry = Expiry::from_ttl_millis(Some(60_000), Instant::now());
            engine.set(key, Bytes::from_static(b"small_value"), expiry);
            i += 1;
        });
    });

    group.bench_function("set_medium", |b| {
        let mut i = 0u64;
        let value = Bytes::from("x".repeat(1024));
        b.iter(|| {
            let key = Bytes::from(format!("key:{}", i));
            engine.set(key, value.clone(), Expiry::Never);
            i += 1;
        });
    });

    group.finish();
}

/// Benchmark GET operations
fn bench_get(c: &mut Criterion) {
    let engine = Arc::new(StorageEngine::new());

    for i in 0..100_000 {
        let key = Bytes::from(format!("key:{}", i));
        let value = Bytes::from(format!("value:{}", i));
        engine.set(key, value, Expiry::Never);
    }

    let mut group = c.benchmark_group("get");
    group.throughput(Throughput::Elements(1));

    group.bench_function("get_existing", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let key = format!("key:{}", i % 100_000);
            black_box(engine.get(key.as_bytes()));
            i += 1;
        });
    });

    group.bench_function("get_missing", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let key = format!("missing:{}", i);
            black_box(engine.get(key.as_bytes()));
            i += 1;
        });
    });

    group.finish();
}

/// Benchmark a full request: parse, dispatch, encode
fn bench_request(c: &mut Criterion) {
    let dispatcher = CommandDispatcher::new(Arc::new(StorageEngine::new()));
    let parser = RequestParser::new();

    let ping = frame_request(&[b"PING"]);
    let set = frame_request(&[b"SET", b"user:101", b"Ariz", b"PX", b"60000"]);
    let get = frame_request(&[b"GET", b"user:101"]);
    let unknown = frame_request(&[b"FLUSHALL"]);

    let mut group = c.benchmark_group("request");
    group.throughput(Throughput::Elements(1));

    for (name, request) in [
        ("ping", &ping),
        ("set_px", &set),
        ("get", &get),
        ("unknown", &unknown),
    ] {
        group.bench_function(name, |b| {
            b.iter(|| {
                let command = parser.parse(black_box(request));
                black_box(dispatcher.execute(command).serialize());
            });
        });
    }

    group.finish();
}

/// Benchmark concurrent access from several threads
fn bench_concurrent(c: &mut Criterion) {
    let mut group = c.benchmark_group("concurrent");

    for num_threads in [2, 4, 8] {
        group.throughput(Throughput::Elements(num_threads as u64 * 1000));
        group.bench_function(format!("mixed_{}_threads", num_threads), |b| {
            b.iter(|| {
                let engine = Arc::new(StorageEngine::new());
                let handles: Vec<_> = (0..num_threads)
                    .map(|t| {
                        let engine = Arc::clone(&engine);
                        thread::spawn(move || {
                            for i in 0..1000 {
                                let key = Bytes::from(format!("t{}:key:{}", t, i));
                                engine.set(key.clone(), Bytes::from_static(b"v"), Expiry::Never);
                                black_box(engine.get(&key));
                            }
                        })
                    })
                    .collect();

                for handle in handles {
                    let _ = handle.join();
                }
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_set, bench_get, bench_request, bench_concurrent);
criterion_main!(benches);
