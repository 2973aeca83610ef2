//! # Chunk Streaming
//!
//! Whole-chunk variant of the streamer. Chunks within `render_distance`
//! (Chebyshev, in the XY plane) of the observer chunk are generated nearest
//! first, a few per step, and rendered through placement. Each column of
//! chunks spans the full generated height window.
//!
//! ```text
//! ┌───┬───┬───┬───┬───┐
//! │ x │   │   │   │ x │   x: evicted (distance > render_distance + 1)
//! ├───┼───┼───┼───┼───┤
//! │   │ ▪ │ ▪ │ ▪ │   │   ▪: kept loaded (distance <= render_distance)
//! ├───┼───┼───┼───┼───┤
//! │   │ ▪ │ O │ ▪ │   │   O: observer chunk
//! └───┴───┴───┴───┴───┘
//! ```

use std::collections::HashMap;

use voxstream_procedural::{Chunk, ChunkError, ChunkGenerator, ChunkState, GenerationMethod, WorldSeed};
use voxstream_shared::{BlockType, ChunkCoord, CoordinateMapper, GridPosition, Vec3};

use crate::config::{ChunkStreamingConfig, WorldConfig};
use crate::decider::GenerationMode;
use crate::error::{WorldError, WorldResult};
use crate::observer::{MotionTracker, ObserverSource, PassTrigger};
use crate::placement::BlockPlacer;
use crate::render::RenderPools;

/// Result of rendering one chunk.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ChunkRenderReport {
    /// Blocks placed.
    pub placed: usize,
    /// Solid cells skipped because the position was already occupied.
    pub skipped: usize,
    /// Solid cells whose handle could not be acquired.
    pub failed: usize,
}

impl ChunkRenderReport {
    fn absorb(&mut self, other: Self) {
        self.placed += other.placed;
        self.skipped += other.skipped;
        self.failed += other.failed;
    }
}

/// Result of one [`ChunkStreamer::step`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChunkStepReport {
    /// Observer chunk (z = 0).
    pub center: Option<ChunkCoord>,
    /// Why the chunks were re-streamed, if they were.
    pub trigger: Option<PassTrigger>,
    /// Chunks unloaded.
    pub evicted: Vec<ChunkCoord>,
    /// Chunks generated and rendered, with the method used.
    pub generated: Vec<(ChunkCoord, GenerationMethod)>,
    /// Blocks placed.
    pub placed: usize,
    /// Occupied positions skipped.
    pub skipped: usize,
    /// Cells whose handle could not be acquired, kept for a later step.
    pub failed: usize,
    /// Previously failed cells placed this step.
    pub retried: usize,
    /// Missing chunks left for later steps.
    pub backlog: usize,
}

/// A rendered chunk, the positions it owns and the solid cells still
/// waiting for a render handle.
#[derive(Debug)]
struct LoadedChunk {
    chunk: Chunk,
    positions: Vec<GridPosition>,
    unplaced: Vec<(GridPosition, BlockType)>,
}

/// Chunk-granular streamer.
#[derive(Debug)]
pub struct ChunkStreamer {
    config: ChunkStreamingConfig,
    mode: GenerationMode,
    layers: (i32, i32),
    restream_distance: f64,
    generator: ChunkGenerator,
    placer: BlockPlacer,
    loaded: HashMap<ChunkCoord, LoadedChunk>,
    tracker: MotionTracker<ChunkCoord>,
    backlog: usize,
}

impl ChunkStreamer {
    /// Creates a chunk streamer over injected render pools.
    ///
    /// # Errors
    ///
    /// [`WorldError::InvalidConfig`] if `config` does not validate.
    pub fn new(config: &WorldConfig, pools: RenderPools) -> WorldResult<Self> {
        config.validate()?;
        let mapper =
            CoordinateMapper::new(config.block_size).map_err(|error| WorldError::InvalidConfig(error.to_string()))?;
        let terrain = config.terrain;
        let low = ChunkCoord::from_grid(GridPosition::new(0, 0, terrain.min_height)).z;
        let high = ChunkCoord::from_grid(GridPosition::new(0, 0, terrain.max_height)).z;

        Ok(Self {
            config: config.chunks,
            mode: config.streaming.mode,
            layers: (low, high),
            restream_distance: config.streaming.restream_fraction * mapper.chunk_world_size(),
            generator: ChunkGenerator::new(WorldSeed::new(config.seed), terrain, config.solver),
            placer: BlockPlacer::new(pools, mapper),
            loaded: HashMap::new(),
            tracker: MotionTracker::horizontal(),
            backlog: 0,
        })
    }

    /// Creates a chunk streamer over in-memory pools sized by the config.
    ///
    /// # Errors
    ///
    /// [`WorldError::InvalidConfig`] if `config` does not validate.
    pub fn with_default_pools(config: &WorldConfig) -> WorldResult<Self> {
        Self::new(config, RenderPools::with_capacity(config.pool_capacity))
    }

    /// Placement state.
    #[inline]
    #[must_use]
    pub const fn placer(&self) -> &BlockPlacer {
        &self.placer
    }

    /// Number of loaded chunks.
    #[inline]
    #[must_use]
    pub fn loaded_count(&self) -> usize {
        self.loaded.len()
    }

    /// Returns true if `coord` is loaded.
    #[must_use]
    pub fn is_loaded(&self, coord: ChunkCoord) -> bool {
        self.loaded.contains_key(&coord)
    }

    /// Loaded chunk at `coord`.
    #[must_use]
    pub fn chunk(&self, coord: ChunkCoord) -> Option<&Chunk> {
        self.loaded.get(&coord).map(|loaded| &loaded.chunk)
    }

    /// Loaded chunk coordinates, sorted.
    #[must_use]
    pub fn loaded_chunks(&self) -> Vec<ChunkCoord> {
        let mut coords: Vec<ChunkCoord> = self.loaded.keys().copied().collect();
        coords.sort_unstable();
        coords
    }

    /// Chunks still to generate.
    #[inline]
    #[must_use]
    pub const fn backlog(&self) -> usize {
        self.backlog
    }

    /// Solid cells of loaded chunks still waiting for a render handle.
    #[must_use]
    pub fn unplaced(&self) -> usize {
        self.loaded.values().map(|loaded| loaded.unplaced.len()).sum()
    }

    /// Type at the cell containing `world_pos`, air if none.
    #[must_use]
    pub fn block_at(&self, world_pos: Vec3) -> BlockType {
        self.placer.block_at(self.placer.mapper().world_to_grid(world_pos))
    }

    /// Observer chunk in the XY plane.
    fn observer_chunk(&self, position: Vec3) -> ChunkCoord {
        let coord = self.placer.mapper().world_to_chunk(position);
        ChunkCoord::new(coord.x, coord.y, 0)
    }

    /// Advances one step.
    pub fn step(&mut self, observer: &impl ObserverSource) -> ChunkStepReport {
        let position = observer.current_position();
        if !position.is_finite() {
            tracing::warn!(?position, "observer position is not finite, skipping step");
            return ChunkStepReport::default();
        }

        let center = self.observer_chunk(position);
        let mut report = ChunkStepReport {
            center: Some(center),
            ..ChunkStepReport::default()
        };

        let trigger = self
            .tracker
            .trigger(position, center, self.restream_distance)
            .or_else(|| (self.backlog > 0 || self.unplaced() > 0).then_some(PassTrigger::Backlog));
        let Some(trigger) = trigger else {
            return report;
        };
        report.trigger = Some(trigger);

        report.evicted = self.evict(center);

        let retried = self.retry_unplaced();
        report.retried = retried.placed;
        report.placed += retried.placed;
        report.skipped += retried.skipped;
        report.failed += retried.failed;

        let missing = self.missing_around(center);
        let budget = self.config.max_chunks_per_step;
        for &coord in missing.iter().take(budget) {
            match self.load(coord) {
                Ok((method, rendered)) => {
                    report.generated.push((coord, method));
                    report.placed += rendered.placed;
                    report.skipped += rendered.skipped;
                    report.failed += rendered.failed;
                }
                Err(error) => tracing::warn!(%coord, %error, "chunk load failed"),
            }
        }
        self.backlog = missing.len().saturating_sub(budget);
        report.backlog = self.backlog;
        self.tracker.record(position, center);

        tracing::debug!(
            %center,
            trigger = ?trigger,
            evicted = report.evicted.len(),
            generated = report.generated.len(),
            placed = report.placed,
            failed = report.failed,
            backlog = report.backlog,
            "chunk stream step"
        );
        report
    }

    /// Unloads chunks beyond `render_distance + 1`.
    fn evict(&mut self, center: ChunkCoord) -> Vec<ChunkCoord> {
        let limit = self.config.render_distance + 1;
        let mut far: Vec<ChunkCoord> = self
            .loaded
            .keys()
            .copied()
            .filter(|coord| coord.chebyshev_xy(center) > limit)
            .collect();
        far.sort_unstable();

        let mut positions = Vec::new();
        for coord in &far {
            if let Some(loaded) = self.loaded.remove(coord) {
                positions.extend(loaded.positions);
            }
        }
        if !positions.is_empty() {
            let removed = self.placer.evict_batch(&positions);
            tracing::debug!(chunks = far.len(), removed, "chunks evicted");
        }
        far
    }

    /// Unloaded chunks within `render_distance`, nearest first.
    fn missing_around(&self, center: ChunkCoord) -> Vec<ChunkCoord> {
        let distance = self.config.render_distance;
        let (low, high) = self.layers;
        let mut missing: Vec<(i32, ChunkCoord)> = Vec::new();
        for dy in -distance..=distance {
            for dx in -distance..=distance {
                for z in low..=high {
                    let coord = ChunkCoord::new(center.x + dx, center.y + dy, z);
                    if !self.loaded.contains_key(&coord) {
                        missing.push((dx * dx + dy * dy, coord));
                    }
                }
            }
        }
        missing.sort_unstable();
        missing.into_iter().map(|(_, coord)| coord).collect()
    }

    fn load(&mut self, coord: ChunkCoord) -> WorldResult<(GenerationMethod, ChunkRenderReport)> {
        let (mut chunk, report) = match self.mode {
            GenerationMode::Simple => self.generator.generate_fallback(coord)?,
            GenerationMode::Hybrid => self.generator.generate(coord)?,
        };
        let mut positions = Vec::new();
        let mut unplaced = Vec::new();
        let rendered = self.render(&mut chunk, &mut positions, &mut unplaced)?;
        self.loaded.insert(
            coord,
            LoadedChunk {
                chunk,
                positions,
                unplaced,
            },
        );
        Ok((report.method, rendered))
    }

    /// Retries every cell whose handle acquisition failed earlier. Cells that
    /// fail again stay queued; cells found occupied are dropped.
    fn retry_unplaced(&mut self) -> ChunkRenderReport {
        let mut report = ChunkRenderReport::default();
        for loaded in self.loaded.values_mut() {
            let LoadedChunk {
                positions, unplaced, ..
            } = loaded;
            for (pos, block) in std::mem::take(&mut *unplaced) {
                report.absorb(Self::commit_cell(&mut self.placer, positions, unplaced, pos, block));
            }
        }
        if report.placed + report.failed > 0 {
            tracing::debug!(placed = report.placed, failed = report.failed, "retried unplaced chunk cells");
        }
        report
    }

    /// Places every solid cell of a resolved chunk and marks it rendered.
    /// The chunk is not tracked by this streamer: it will not be evicted and
    /// cells that fail to place are not retried.
    ///
    /// # Errors
    ///
    /// - [`ChunkError::AlreadyRendered`] if `chunk` was rendered before
    /// - [`ChunkError::NotResolved`] if `chunk` has no resolved cells
    pub fn render_chunk(&mut self, chunk: &mut Chunk) -> WorldResult<ChunkRenderReport> {
        self.render(chunk, &mut Vec::new(), &mut Vec::new())
    }

    fn render(
        &mut self,
        chunk: &mut Chunk,
        positions: &mut Vec<GridPosition>,
        unplaced: &mut Vec<(GridPosition, BlockType)>,
    ) -> WorldResult<ChunkRenderReport> {
        let coord = chunk.coord();
        if chunk.state() == ChunkState::Rendered {
            return Err(ChunkError::AlreadyRendered { coord }.into());
        }

        let mut report = ChunkRenderReport::default();
        for (pos, block) in chunk.iter_cells()? {
            if !block.is_air() {
                report.absorb(Self::commit_cell(&mut self.placer, positions, unplaced, pos, block));
            }
        }

        chunk.mark_rendered()?;
        Ok(report)
    }

    /// Commits one solid cell, recording it as owned or as still unplaced.
    fn commit_cell(
        placer: &mut BlockPlacer,
        positions: &mut Vec<GridPosition>,
        unplaced: &mut Vec<(GridPosition, BlockType)>,
        pos: GridPosition,
        block: BlockType,
    ) -> ChunkRenderReport {
        let mut report = ChunkRenderReport::default();
        match placer.commit_generated(pos, block) {
            Ok(_) => {
                report.placed = 1;
                positions.push(pos);
            }
            Err(WorldError::RaceAtCommit { existing, .. }) => {
                tracing::debug!(%pos, %existing, "cell already occupied, skipping");
                report.skipped = 1;
            }
            Err(error) => {
                tracing::warn!(%pos, %error, "could not place chunk cell, will retry");
                report.failed = 1;
                unplaced.push((pos, block));
            }
        }
        report
    }

    /// Unloads every chunk and drops all placement state.
    pub fn clear_all(&mut self) {
        self.loaded.clear();
        self.placer.clear();
        self.tracker.reset();
        self.backlog = 0;
    }
}
