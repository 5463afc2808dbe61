//! Benchmarks for shelfdb store operations

use criterion::{criterion_group, criterion_main, Criterion};
use serde_json::json;
use shelfdb::{Config, Store};
use tempfile::TempDir;

fn store_benchmarks(c: &mut Criterion) {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder().data_dir(temp_dir.path()).build();
    let store = Store::open(config).unwrap();

    store.set("bench_key", json!({"n": 0})).unwrap();

    c.bench_function("set_object", |b| {
        b.iter(|| store.set("bench_key", json!({"n": 1})).unwrap())
    });

    c.bench_function("set_string", |b| {
        b.iter(|| store.set("bench_str", json!("payload")).unwrap())
    });

    c.bench_function("get", |b| b.iter(|| store.get("bench_key").unwrap()));

    c.bench_function("has", |b| b.iter(|| store.has("bench_key").unwrap()));

    c.bench_function("add", |b| b.iter(|| store.add("bench_counter", 1).unwrap()));
}

criterion_group!(benches, store_benchmarks);
criterion_main!(benches);
