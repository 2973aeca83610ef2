//! Benchmark for chunk solving.
//!
//! TARGET: one seeded 8x8x16 chunk (solve or fallback) well under a frame
//!
//! Run with: cargo bench --package voxstream_procedural --bench solver_benchmark

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use voxstream_procedural::{fallback_cells, ChunkGenerator, SolverConfig, TerrainParams, WorldSeed};
use voxstream_shared::ChunkCoord;

fn benchmark_generate_chunk(c: &mut Criterion) {
    let gen = ChunkGenerator::new(WorldSeed::new(42), TerrainParams::default(), SolverConfig::default());

    c.bench_function("generate_chunk_solver_first", |b| {
        let mut x = 0;
        b.iter(|| {
            x += 1;
            black_box(gen.generate(ChunkCoord::new(x, 0, 0)))
        });
    });
}

fn benchmark_fallback_chunk(c: &mut Criterion) {
    let gen = ChunkGenerator::new(WorldSeed::new(42), TerrainParams::default(), SolverConfig::default());

    c.bench_function("fallback_chunk", |b| {
        let mut x = 0;
        b.iter(|| {
            x += 1;
            black_box(fallback_cells(ChunkCoord::new(x, 0, 0), gen.synthesizer()))
        });
    });
}

criterion_group!(benches, benchmark_generate_chunk, benchmark_fallback_chunk);
criterion_main!(benches);
