//! Benchmark for noise and height-field performance.
//!
//! TARGET: 1,000,000 samples per second
//!
//! Run with: cargo bench --package voxstream_procedural --bench noise_benchmark

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use voxstream_procedural::{HeightSynthesizer, SimplexNoise, TerrainParams, WorldSeed};

fn benchmark_single_sample(c: &mut Criterion) {
    let noise = SimplexNoise::new(WorldSeed::new(42));

    c.bench_function("single_noise_sample", |b| {
        let mut x = 0.0f64;
        b.iter(|| {
            x += 0.1;
            black_box(noise.sample(black_box(x), black_box(x * 0.7)))
        });
    });
}

fn benchmark_million_samples(c: &mut Criterion) {
    let noise = SimplexNoise::new(WorldSeed::new(42));

    let mut group = c.benchmark_group("million_samples");
    group.throughput(Throughput::Elements(1_000_000));
    group.sample_size(10);

    group.bench_function("1M_noise_samples", |b| {
        b.iter(|| {
            for i in 0..1_000_000 {
                let x = (i % 1000) as f64 * 0.1;
                let y = (i / 1000) as f64 * 0.1;
                black_box(noise.sample(x, y));
            }
        });
    });

    group.finish();
}

fn benchmark_terrain_height(c: &mut Criterion) {
    let synth = HeightSynthesizer::from_seed(TerrainParams::default(), WorldSeed::new(42));

    let mut group = c.benchmark_group("terrain_height");
    group.throughput(Throughput::Elements(101 * 101));

    group.bench_function("radius_50_columns", |b| {
        b.iter(|| {
            for y in -50..=50 {
                for x in -50..=50 {
                    black_box(synth.terrain_height(black_box(x), black_box(y)));
                }
            }
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    benchmark_single_sample,
    benchmark_million_samples,
    benchmark_terrain_height
);
criterion_main!(benches);
