//! Long walks: state stays bounded and consistent no matter how far the
//! observer goes.

use voxstream_shared::{BlockType, GridPosition, Vec3};
use voxstream_world::{FnObserver, GenerationMode, StreamingConfig, TerrainStreamer, WorldConfig};

fn walking_config(mode: GenerationMode, budget: usize) -> WorldConfig {
    WorldConfig {
        seed: 77,
        streaming: StreamingConfig {
            mode,
            view_radius: 5,
            eviction_margin: 2,
            max_blocks_per_step: budget,
            validation_interval_steps: 50,
            ..StreamingConfig::default()
        },
        ..WorldConfig::default()
    }
}

fn ball_size(radius: i32) -> usize {
    let mut count = 0;
    for x in -radius..=radius {
        for y in -radius..=radius {
            for z in -radius..=radius {
                if GridPosition::new(x, y, z).within_radius(GridPosition::ORIGIN, radius) {
                    count += 1;
                }
            }
        }
    }
    count
}

fn records_match_pools(streamer: &TerrainStreamer) -> bool {
    let placer = streamer.placer();
    BlockType::SOLID
        .iter()
        .all(|&block| placer.store().count_of(block) == placer.pools().instance_count(block))
}

#[test]
fn test_long_walk_stays_bounded() {
    let mut streamer = TerrainStreamer::with_default_pools(walking_config(GenerationMode::Simple, 150)).unwrap();
    let bound = ball_size(streamer.config().streaming.eviction_radius());

    for step in 0..1_500u32 {
        let observer = Vec3::new(f64::from(step) * 45.0, f64::from(step) * 12.0, 700.0);
        let report = streamer.step(&observer);
        if let Some(validation) = report.validation {
            assert!(validation.is_clean(), "step {step}: {validation:?}");
        }
        assert!(streamer.placer().store().processed_count() <= bound);
        if step % 100 == 0 {
            assert!(records_match_pools(&streamer), "step {step}");
        }
    }

    // The start of the walk is long gone.
    assert!(!streamer.placer().store().is_processed(GridPosition::new(0, 0, 7)));
    let stats = streamer.stats();
    assert!(stats.blocks_evicted > 0);
    assert!(stats.records_match_instances);
    assert!(stats.records_processed);
}

#[test]
fn test_walk_back_regenerates_same_terrain() {
    let mut streamer = TerrainStreamer::with_default_pools(walking_config(GenerationMode::Simple, 10_000)).unwrap();
    let home = Vec3::new(50.0, 50.0, 650.0);
    streamer.step(&home);
    let mut before: Vec<(GridPosition, BlockType)> = streamer
        .placer()
        .store()
        .records()
        .map(|(pos, record)| (pos, record.block))
        .collect();
    before.sort_unstable_by_key(|(pos, _)| *pos);

    streamer.step(&Vec3::new(5_000.0, 50.0, 650.0));
    assert!(streamer.placer().store().records().all(|(pos, _)| pos.x > 20));

    streamer.step(&home);
    let mut after: Vec<(GridPosition, BlockType)> = streamer
        .placer()
        .store()
        .records()
        .map(|(pos, record)| (pos, record.block))
        .collect();
    after.sort_unstable_by_key(|(pos, _)| *pos);
    assert_eq!(before, after);
}

#[test]
fn test_hybrid_walk_with_closure_observer() {
    let position = std::cell::Cell::new(Vec3::new(0.0, 0.0, 700.0));
    let observer = FnObserver(|| position.get());
    let mut streamer = TerrainStreamer::with_default_pools(walking_config(GenerationMode::Hybrid, 200)).unwrap();

    for _ in 0..300 {
        streamer.step(&observer);
        let p = position.get();
        position.set(Vec3::new(p.x + 30.0, p.y - 20.0, p.z));
    }

    assert!(streamer.decider().stats().solved + streamer.decider().stats().fallback > 0);
    assert!(records_match_pools(&streamer));
    assert!(streamer.validate().is_clean());
}
