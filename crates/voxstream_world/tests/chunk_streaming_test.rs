//! Whole-chunk streaming.

use voxstream_shared::{BlockType, ChunkCoord, Vec3, CHUNK_SIZE};
use voxstream_world::{
    ChunkStreamer, ChunkStreamingConfig, GenerationMode, InstancePool, InstanceTransform, PassTrigger, RenderError,
    RenderPools, RenderResult, StreamingConfig, VecInstancePool, WorldConfig,
};

fn config(mode: GenerationMode) -> WorldConfig {
    WorldConfig {
        seed: 2024,
        streaming: StreamingConfig {
            mode,
            ..StreamingConfig::default()
        },
        chunks: ChunkStreamingConfig {
            render_distance: 1,
            max_chunks_per_step: 2,
        },
        ..WorldConfig::default()
    }
}

fn drain(streamer: &mut ChunkStreamer, observer: Vec3) -> usize {
    let mut steps = 1;
    streamer.step(&observer);
    while streamer.backlog() > 0 || streamer.unplaced() > 0 {
        streamer.step(&observer);
        steps += 1;
        assert!(steps < 100, "backlog never drained");
    }
    steps
}

fn assert_consistent(streamer: &ChunkStreamer) {
    let solid: usize = streamer
        .loaded_chunks()
        .into_iter()
        .filter_map(|coord| streamer.chunk(coord))
        .map(|chunk| chunk.solid_count())
        .sum();
    let store = streamer.placer().store();
    assert_eq!(store.record_count(), solid);
    assert_eq!(store.processed_count(), solid);
    assert_eq!(streamer.placer().pools().total_instances(), solid);
}

/// World-space centre of chunk column (x, y).
fn chunk_center(x: i32, y: i32) -> Vec3 {
    let span = CHUNK_SIZE as f64 * 100.0;
    Vec3::new(f64::from(x) * span + span / 2.0, f64::from(y) * span + span / 2.0, 600.0)
}

#[test]
fn test_initial_load_is_budgeted_and_nearest_first() {
    let mut streamer = ChunkStreamer::with_default_pools(&config(GenerationMode::Simple)).unwrap();
    let first = streamer.step(&chunk_center(0, 0));
    assert_eq!(first.trigger, Some(PassTrigger::FirstStep));
    assert_eq!(first.generated.len(), 2);
    for (coord, _) in &first.generated {
        assert_eq!((coord.x, coord.y), (0, 0));
    }
    assert_eq!(first.backlog, 27 - 2);

    let steps = drain(&mut streamer, chunk_center(0, 0));
    assert_eq!(steps, 13);
    assert_eq!(streamer.loaded_count(), 27);
    for coord in streamer.loaded_chunks() {
        assert!(coord.chebyshev_xy(ChunkCoord::new(0, 0, 0)) <= 1);
    }
    assert_consistent(&streamer);
}

#[test]
fn test_small_move_does_not_restream() {
    let mut streamer = ChunkStreamer::with_default_pools(&config(GenerationMode::Simple)).unwrap();
    drain(&mut streamer, chunk_center(0, 0));
    let nudged = chunk_center(0, 0) + Vec3::new(150.0, -100.0, 2_000.0);
    let report = streamer.step(&nudged);
    assert_eq!(report.trigger, None);
    assert!(report.generated.is_empty());
}

#[test]
fn test_far_chunks_are_evicted() {
    let mut streamer = ChunkStreamer::with_default_pools(&config(GenerationMode::Simple)).unwrap();
    drain(&mut streamer, chunk_center(0, 0));

    let report = streamer.step(&chunk_center(5, 0));
    assert_eq!(report.trigger, Some(PassTrigger::CellChanged));
    assert_eq!(report.evicted.len(), 27);
    drain(&mut streamer, chunk_center(5, 0));

    for coord in streamer.loaded_chunks() {
        assert!(coord.chebyshev_xy(ChunkCoord::new(5, 0, 0)) <= 1);
    }
    assert_eq!(streamer.loaded_count(), 27);
    assert_consistent(&streamer);
}

#[test]
fn test_neighbour_chunks_survive_one_step_over() {
    let mut streamer = ChunkStreamer::with_default_pools(&config(GenerationMode::Simple)).unwrap();
    drain(&mut streamer, chunk_center(0, 0));
    let report = streamer.step(&chunk_center(1, 0));
    assert!(report.evicted.is_empty());
    drain(&mut streamer, chunk_center(1, 0));
    assert_eq!(streamer.loaded_count(), 36);
    assert_consistent(&streamer);
}

#[test]
fn test_hybrid_chunks_are_consistent() {
    let mut streamer = ChunkStreamer::with_default_pools(&config(GenerationMode::Hybrid)).unwrap();
    drain(&mut streamer, chunk_center(-2, 3));
    assert_eq!(streamer.loaded_count(), 27);
    assert_consistent(&streamer);
}

/// Pool that refuses its first few instances, like a host still allocating.
struct FlakyPool {
    inner: VecInstancePool,
    refusals: usize,
}

impl InstancePool for FlakyPool {
    fn add_instance(&mut self, transform: InstanceTransform) -> RenderResult<usize> {
        if self.refusals > 0 {
            self.refusals -= 1;
            return Err(RenderError::PoolExhausted {
                capacity: self.inner.capacity(),
            });
        }
        self.inner.add_instance(transform)
    }

    fn remove_instance(&mut self, index: usize) -> RenderResult<InstanceTransform> {
        self.inner.remove_instance(index)
    }

    fn instance_count(&self) -> usize {
        self.inner.instance_count()
    }

    fn transform(&self, index: usize) -> Option<InstanceTransform> {
        self.inner.transform(index)
    }

    fn clear_instances(&mut self) {
        self.inner.clear_instances();
    }
}

#[test]
fn test_refused_cells_are_retried() {
    let mut config = config(GenerationMode::Simple);
    config.chunks.render_distance = 0;
    let capacity = config.pool_capacity;
    let pools = RenderPools::from_pools(
        Box::new(VecInstancePool::new(capacity)),
        Box::new(VecInstancePool::new(capacity)),
        Box::new(FlakyPool {
            inner: VecInstancePool::new(capacity),
            refusals: 5,
        }),
        Box::new(VecInstancePool::new(capacity)),
    );
    let mut streamer = ChunkStreamer::new(&config, pools).unwrap();

    let first = streamer.step(&chunk_center(0, 0));
    assert_eq!(first.failed, 5);
    assert_eq!(streamer.unplaced(), 5);
    assert!(streamer.placer().pools().instance_count(BlockType::Stone) > 0);

    let second = streamer.step(&chunk_center(0, 0));
    assert_eq!(second.trigger, Some(PassTrigger::Backlog));
    assert_eq!(second.retried, 5);
    assert_eq!(second.failed, 0);
    assert_eq!(streamer.unplaced(), 0);

    drain(&mut streamer, chunk_center(0, 0));
    assert_eq!(streamer.loaded_count(), 3);
    assert_consistent(&streamer);

    // Nothing pending: a still observer runs no step.
    assert_eq!(streamer.step(&chunk_center(0, 0)).trigger, None);
}
