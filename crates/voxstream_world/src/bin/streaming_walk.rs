//! # VOXSTREAM Streaming Walk
//!
//! Headless walk through a streamed world. Moves an observer in a straight
//! line, steps the terrain streamer every tick and prints what it did.
//!
//! ```bash
//! # Defaults
//! streaming_walk
//!
//! # Custom config and tick count
//! streaming_walk data/streaming.toml 2000
//! ```

use std::time::Instant;

use voxstream_shared::Vec3;
use voxstream_world::{ChunkStreamer, TerrainStreamer, WorldConfig, WorldResult};

/// Ticks walked when no count is given.
const DEFAULT_TICKS: u64 = 600;

/// Observer speed in blocks per tick.
const WALK_SPEED: f64 = 0.35;

fn main() {
    let _ = tracing_subscriber::fmt().with_target(false).try_init();

    if let Err(error) = run() {
        eprintln!("   ✗ FATAL: {error}");
        std::process::exit(1);
    }
}

fn run() -> WorldResult<()> {
    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => WorldConfig::load(path)?,
        None => WorldConfig::default(),
    };
    let ticks = args.next().and_then(|n| n.parse().ok()).unwrap_or(DEFAULT_TICKS);

    println!("═══════════════════════════════════════════════════════════════════");
    println!("                    VOXSTREAM STREAMING WALK");
    println!("═══════════════════════════════════════════════════════════════════");
    println!("  Seed:        {}", config.seed);
    println!("  Mode:        {:?}", config.streaming.mode);
    println!("  View radius: {}", config.streaming.view_radius);
    println!("  Budget:      {} blocks/step", config.streaming.max_blocks_per_step);
    println!("  Ticks:       {ticks}");
    println!();

    let block = config.block_size;
    let eye_height = f64::from(config.terrain.base_height + 2) * block;
    let position_at = |tick: u64| Vec3::new(tick as f64 * WALK_SPEED * block, 0.5 * block, eye_height);

    // === PER-CELL STREAMING ===
    let mut streamer = TerrainStreamer::with_default_pools(config.clone())?;
    let started = Instant::now();
    let mut passes = 0u64;
    for tick in 0..ticks {
        let report = streamer.step(&position_at(tick));
        if report.pass.is_some() {
            passes += 1;
        }
        if let Some(validation) = report.validation {
            println!("  tick {tick:>6}: validation found {} issue(s)", validation.issue_count());
        }
    }
    let elapsed = started.elapsed();

    let stats = streamer.stats();
    println!("📦 Per-cell streaming");
    println!("   Passes:    {passes} in {:.1} ms", elapsed.as_secs_f64() * 1_000.0);
    println!("   Records:   {}", stats.records);
    println!("   Processed: {}", stats.processed);
    for (block, count) in stats.instances {
        println!("   {block:<9}  {count}");
    }
    println!("   Placed:    {} (evicted {})", stats.blocks_placed, stats.blocks_evicted);
    println!(
        "   Consistent: {}",
        if stats.records_match_instances && stats.records_processed { "✓" } else { "✗" }
    );
    let report = streamer.validate();
    println!("   Validation: {} issue(s)", report.issue_count());
    println!();

    // === CHUNK STREAMING ===
    let mut chunks = ChunkStreamer::with_default_pools(&config)?;
    let started = Instant::now();
    for tick in 0..ticks {
        chunks.step(&position_at(tick));
    }
    println!("🧱 Chunk streaming");
    println!(
        "   Loaded:    {} chunks in {:.1} ms",
        chunks.loaded_count(),
        started.elapsed().as_secs_f64() * 1_000.0
    );
    println!("   Records:   {}", chunks.placer().store().record_count());
    println!("   Backlog:   {}", chunks.backlog());

    streamer.log_stats();
    Ok(())
}
