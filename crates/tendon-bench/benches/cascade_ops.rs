//! Criterion micro-benchmarks for scalar cascades.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use tendon_bench::{chain, fan_out};
use tendon_binding::TwoWayBinding;
use tendon_cell::Property;

/// Benchmark: one write cascading through a 64-link chain.
fn bench_chain_64(c: &mut Criterion) {
    let chain = chain(64).unwrap();
    let mut value = 0u64;
    c.bench_function("chain_64", |b| {
        b.iter(|| {
            value += 1;
            chain.head.set(value).unwrap();
            black_box(chain.tail.get());
        });
    });
}

/// Benchmark: one write fanning out to 1K mirrors.
fn bench_fan_out_1k(c: &mut Criterion) {
    let fan = fan_out(1000).unwrap();
    let mut value = 0u64;
    c.bench_function("fan_out_1k", |b| {
        b.iter(|| {
            value += 1;
            fan.source.set(value).unwrap();
            black_box(fan.sinks[999].get());
        });
    });
}

/// Benchmark: equal writes that must be suppressed without notifying.
fn bench_suppressed_write(c: &mut Criterion) {
    let fan = fan_out(1000).unwrap();
    fan.source.set(7).unwrap();
    c.bench_function("suppressed_write", |b| {
        b.iter(|| {
            black_box(fan.source.set(black_box(7)).unwrap());
        });
    });
}

/// Benchmark: alternating writes on both sides of a two-way binding.
fn bench_two_way_round_trip(c: &mut Criterion) {
    let meters = Property::new(0.0_f64);
    let feet = Property::new(0.0_f64);
    let _sync = TwoWayBinding::new(
        &meters,
        |ft: &f64| ft * 0.3048,
        &feet,
        |m: &f64| m / 0.3048,
    )
    .unwrap();
    let mut step = 0.0;
    c.bench_function("two_way_round_trip", |b| {
        b.iter(|| {
            step += 1.0;
            meters.set(step).unwrap();
            feet.set(step * 2.0).unwrap();
            black_box(meters.get());
        });
    });
}

criterion_group!(
    benches,
    bench_chain_64,
    bench_fan_out_1k,
    bench_suppressed_write,
    bench_two_way_round_trip
);
criterion_main!(benches);
