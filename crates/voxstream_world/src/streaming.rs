//! # Terrain Streaming
//!
//! Keeps the world generated inside a sphere around the observer, one cell at
//! a time, under a per-step budget.
//!
//! ## Step
//!
//! ```text
//! observer ──► center cell ──► trigger? ──► evict ──► enumerate ──► decide ──► place / mark air
//!                                 │                                   │
//!                                 └─ no: step is a no-op              └─ budget hit: backlog
//! ```
//!
//! A pass runs on the first step, when the center cell changes, when the
//! observer moved more than `restream_fraction` of a block since the last pass,
//! or while a backlog remains. Candidates are sorted nearest first and cached
//! while the center stays put, so a backlog drains without re-enumerating.

use std::time::{Duration, Instant};

use voxstream_procedural::{ChunkGenerator, WorldSeed};
use voxstream_shared::{BlockType, CoordinateMapper, GridPosition, Vec3};

use crate::config::WorldConfig;
use crate::decider::{BlockDecider, DeciderStats, GenerationMode};
use crate::error::{WorldError, WorldResult};
use crate::observer::{MotionTracker, ObserverSource, PassTrigger};
use crate::placement::BlockPlacer;
use crate::render::RenderPools;
use crate::validation::{repair, validate, RepairSummary, ValidationReport};

/// Passes slower than this are logged at warn level.
pub const SLOW_PASS: Duration = Duration::from_millis(16);

/// One streaming pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PassReport {
    /// Observer cell.
    pub center: GridPosition,
    /// Why the pass ran.
    pub trigger: PassTrigger,
    /// Records evicted.
    pub evicted: usize,
    /// Undecided candidates at the start of the pass.
    pub candidates: usize,
    /// Positions newly decided.
    pub decided: usize,
    /// Blocks placed.
    pub placed: usize,
    /// Positions decided as air.
    pub air: usize,
    /// Commits rejected because the position became occupied.
    pub raced: usize,
    /// Commits rejected because no handle could be acquired.
    pub failed: usize,
    /// Candidates left for later passes.
    pub backlog: usize,
    /// Wall time.
    pub duration: Duration,
}

impl PassReport {
    /// Returns true if every candidate was visited.
    #[inline]
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.backlog == 0
    }
}

/// Result of one [`TerrainStreamer::step`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StepReport {
    /// Step number, starting at 1.
    pub step: u64,
    /// Pass that ran, if any.
    pub pass: Option<PassReport>,
    /// Periodic validation, if it ran this step.
    pub validation: Option<ValidationReport>,
}

/// Snapshot of streamer state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WorldStats {
    /// Steps taken.
    pub steps: u64,
    /// Passes run.
    pub passes: u64,
    /// Records.
    pub records: usize,
    /// Processed positions.
    pub processed: usize,
    /// Live instances per solid type.
    pub instances: [(BlockType, usize); 4],
    /// Total blocks placed by passes.
    pub blocks_placed: u64,
    /// Total records evicted by passes.
    pub blocks_evicted: u64,
    /// Last pass.
    pub last_pass: Option<PassReport>,
    /// Candidates still pending.
    pub backlog: usize,
    /// Record count equals the live instance count.
    pub records_match_instances: bool,
    /// Every record is in the processed set.
    pub records_processed: bool,
    /// Active mode.
    pub mode: GenerationMode,
    /// Hybrid chunk counters.
    pub decider: DeciderStats,
}

/// Sorted candidates for one center and how far the budget got.
#[derive(Debug)]
struct PendingCandidates {
    center: GridPosition,
    positions: Vec<GridPosition>,
    cursor: usize,
}

impl PendingCandidates {
    fn remaining(&self) -> usize {
        self.positions.len().saturating_sub(self.cursor)
    }
}

/// Per-cell terrain streamer.
#[derive(Debug)]
pub struct TerrainStreamer {
    config: WorldConfig,
    placer: BlockPlacer,
    decider: BlockDecider,
    tracker: MotionTracker<GridPosition>,
    pending: Option<PendingCandidates>,
    last_evicted_center: Option<GridPosition>,
    force_pass: bool,
    steps: u64,
    passes: u64,
    blocks_placed: u64,
    blocks_evicted: u64,
    last_pass: Option<PassReport>,
}

impl TerrainStreamer {
    /// Creates a streamer over injected render pools.
    ///
    /// # Errors
    ///
    /// [`WorldError::InvalidConfig`] if `config` does not validate.
    pub fn new(config: WorldConfig, pools: RenderPools) -> WorldResult<Self> {
        config.validate()?;
        let mapper =
            CoordinateMapper::new(config.block_size).map_err(|error| WorldError::InvalidConfig(error.to_string()))?;
        let generator = ChunkGenerator::new(WorldSeed::new(config.seed), config.terrain, config.solver);
        let decider = BlockDecider::new(config.streaming.mode, generator, config.streaming.solved_chunk_cache);

        tracing::info!(
            seed = config.seed,
            mode = ?config.streaming.mode,
            view_radius = config.streaming.view_radius,
            budget = config.streaming.max_blocks_per_step,
            "terrain streamer ready"
        );

        Ok(Self {
            config,
            placer: BlockPlacer::new(pools, mapper),
            decider,
            tracker: MotionTracker::new(),
            pending: None,
            last_evicted_center: None,
            force_pass: false,
            steps: 0,
            passes: 0,
            blocks_placed: 0,
            blocks_evicted: 0,
            last_pass: None,
        })
    }

    /// Creates a streamer over in-memory pools sized by the config.
    ///
    /// # Errors
    ///
    /// [`WorldError::InvalidConfig`] if `config` does not validate.
    pub fn with_default_pools(config: WorldConfig) -> WorldResult<Self> {
        let pools = RenderPools::with_capacity(config.pool_capacity);
        Self::new(config, pools)
    }

    /// Active configuration.
    #[inline]
    #[must_use]
    pub const fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// Placement state (records, processed set, pools).
    #[inline]
    #[must_use]
    pub const fn placer(&self) -> &BlockPlacer {
        &self.placer
    }

    /// Block decider.
    #[inline]
    #[must_use]
    pub const fn decider(&self) -> &BlockDecider {
        &self.decider
    }

    /// Mutable placement state, for explicit edits outside the stream.
    #[inline]
    pub fn placer_mut(&mut self) -> &mut BlockPlacer {
        &mut self.placer
    }

    /// Advances one step: polls the observer and runs a pass if triggered.
    pub fn step(&mut self, observer: &impl ObserverSource) -> StepReport {
        self.steps += 1;
        let mut report = StepReport {
            step: self.steps,
            ..StepReport::default()
        };

        let position = observer.current_position();
        if position.is_finite() {
            let center = self.placer.mapper().world_to_grid(position);
            if let Some(trigger) = self.trigger(position, center) {
                report.pass = Some(self.run_pass(position, center, trigger));
            }
        } else {
            tracing::warn!(?position, "observer position is not finite, skipping step");
        }

        let interval = self.config.streaming.validation_interval_steps;
        if interval > 0 && self.steps % interval == 0 {
            let validation = self.validate();
            if !validation.is_clean() {
                if let Err(error) = self.repair(&validation) {
                    tracing::warn!(%error, "periodic repair failed");
                }
            }
            report.validation = Some(validation);
        }

        report
    }

    fn trigger(&mut self, position: Vec3, center: GridPosition) -> Option<PassTrigger> {
        if std::mem::take(&mut self.force_pass) {
            return Some(PassTrigger::Forced);
        }
        let threshold = self.config.streaming.restream_fraction * self.config.block_size;
        self.tracker
            .trigger(position, center, threshold)
            .or_else(|| (self.backlog() > 0).then_some(PassTrigger::Backlog))
    }

    fn run_pass(&mut self, position: Vec3, center: GridPosition, trigger: PassTrigger) -> PassReport {
        let start = Instant::now();
        let streaming = self.config.streaming;

        let evicted = if self.last_evicted_center == Some(center) {
            0
        } else {
            let far = self.placer.store().positions_beyond(center, streaming.eviction_radius());
            self.last_evicted_center = Some(center);
            self.placer.evict_batch(&far)
        };

        let mut pending = match self.pending.take() {
            Some(pending) if pending.center == center => pending,
            _ => PendingCandidates {
                center,
                positions: self.enumerate(center),
                cursor: 0,
            },
        };

        let mut report = PassReport {
            center,
            trigger,
            evicted,
            candidates: pending.remaining(),
            decided: 0,
            placed: 0,
            air: 0,
            raced: 0,
            failed: 0,
            backlog: 0,
            duration: Duration::ZERO,
        };

        while report.decided < streaming.max_blocks_per_step {
            let Some(&pos) = pending.positions.get(pending.cursor) else {
                break;
            };
            pending.cursor += 1;
            if self.placer.store().is_processed(pos) {
                continue;
            }

            let block = self.decider.decide(pos);
            let committed = if block.is_air() {
                self.placer.mark_air(pos)
            } else {
                self.placer.commit_generated(pos, block).map(|_| ())
            };

            match committed {
                Ok(()) => {
                    report.decided += 1;
                    if block.is_air() {
                        report.air += 1;
                    } else {
                        report.placed += 1;
                    }
                }
                Err(error @ WorldError::RaceAtCommit { .. }) => {
                    tracing::warn!(%pos, %error, "commit rejected, position left for a later pass");
                    report.raced += 1;
                }
                Err(error) => {
                    tracing::warn!(%pos, %error, "placement failed, position left for a later pass");
                    report.failed += 1;
                }
            }
        }

        report.backlog = pending.remaining();
        // Rejected positions sit behind the cursor; the next enumeration retries them.
        if report.backlog > 0 {
            self.pending = Some(pending);
        }

        self.tracker.record(position, center);
        self.passes += 1;
        self.blocks_placed += report.placed as u64;
        self.blocks_evicted += report.evicted as u64;
        report.duration = start.elapsed();

        if report.duration > SLOW_PASS {
            tracing::warn!(
                %center,
                duration_ms = report.duration.as_millis() as u64,
                decided = report.decided,
                evicted = report.evicted,
                "slow streaming pass"
            );
        }
        tracing::debug!(
            %center,
            trigger = ?report.trigger,
            evicted = report.evicted,
            placed = report.placed,
            air = report.air,
            raced = report.raced,
            failed = report.failed,
            backlog = report.backlog,
            "streaming pass"
        );

        self.last_pass = Some(report);
        report
    }

    /// Undecided positions within the view radius and the height window,
    /// nearest first.
    fn enumerate(&self, center: GridPosition) -> Vec<GridPosition> {
        let radius = self.config.streaming.view_radius;
        let terrain = &self.config.terrain;
        let z_min = (center.z - radius).max(terrain.min_height);
        let z_max = (center.z + radius).min(terrain.max_height);
        let store = self.placer.store();

        let mut candidates: Vec<(i64, GridPosition)> = Vec::new();
        for z in z_min..=z_max {
            for y in center.y - radius..=center.y + radius {
                for x in center.x - radius..=center.x + radius {
                    let pos = GridPosition::new(x, y, z);
                    if pos.within_radius(center, radius) && !store.is_processed(pos) {
                        candidates.push((pos.distance_squared(center), pos));
                    }
                }
            }
        }
        candidates.sort_unstable();
        candidates.into_iter().map(|(_, pos)| pos).collect()
    }

    /// Candidates left by a budget-truncated pass.
    #[must_use]
    pub fn backlog(&self) -> usize {
        self.pending.as_ref().map_or(0, PendingCandidates::remaining)
    }

    /// Drops everything and regenerates around the observer at once.
    pub fn regenerate_around_observer(&mut self, observer: &impl ObserverSource) -> StepReport {
        self.clear_all();
        self.force_pass = true;
        self.step(observer)
    }

    /// Drops every record, processed entry and pool instance.
    pub fn clear_all(&mut self) {
        let records = self.placer.store().record_count();
        self.placer.clear();
        self.pending = None;
        self.last_evicted_center = None;
        self.tracker.reset();
        tracing::info!(records, "world cleared");
    }

    /// Type at the cell containing `world_pos`, air if none.
    #[must_use]
    pub fn block_at(&self, world_pos: Vec3) -> BlockType {
        let pos = self.placer.mapper().world_to_grid(world_pos);
        self.placer.block_at(pos)
    }

    /// Overwrites the cell containing `world_pos`. Air clears it and keeps it
    /// decided so the stream does not refill it.
    ///
    /// # Errors
    ///
    /// [`WorldError::HandleAcquisition`] if the new type's pool is full; the
    /// cell keeps whatever it held before.
    pub fn set_block_at(&mut self, world_pos: Vec3, block: BlockType) -> WorldResult<GridPosition> {
        let pos = self.placer.mapper().world_to_grid(world_pos);
        if block.is_air() {
            self.placer.force_clean(pos);
            self.placer.mark_air(pos)?;
        } else {
            self.placer.place(pos, block)?;
        }
        tracing::debug!(%pos, %block, "block set");
        Ok(pos)
    }

    /// Switches Simple/Hybrid and regenerates around the observer.
    pub fn switch_generation_mode(&mut self, mode: GenerationMode, observer: &impl ObserverSource) -> StepReport {
        tracing::info!(from = ?self.decider.mode(), to = ?mode, "switching generation mode");
        self.decider.set_mode(mode);
        self.config.streaming.mode = mode;
        self.regenerate_around_observer(observer)
    }

    /// Validates world structure against the active decider.
    pub fn validate(&mut self) -> ValidationReport {
        let decider = &mut self.decider;
        validate(&self.placer, |pos| decider.decide(pos))
    }

    /// Repairs what `report` found and forces a pass on the next step.
    ///
    /// # Errors
    ///
    /// Only if a pool cannot be addressed during rebuild.
    pub fn repair(&mut self, report: &ValidationReport) -> WorldResult<RepairSummary> {
        let summary = repair(&mut self.placer, report)?;
        self.pending = None;
        self.last_evicted_center = None;
        self.force_pass = true;
        Ok(summary)
    }

    /// Current counters.
    #[must_use]
    pub fn stats(&self) -> WorldStats {
        let store = self.placer.store();
        let pools = self.placer.pools();
        WorldStats {
            steps: self.steps,
            passes: self.passes,
            records: store.record_count(),
            processed: store.processed_count(),
            instances: pools.counts(),
            blocks_placed: self.blocks_placed,
            blocks_evicted: self.blocks_evicted,
            last_pass: self.last_pass,
            backlog: self.backlog(),
            records_match_instances: store.record_count() == pools.total_instances(),
            records_processed: store.records().all(|(pos, _)| store.is_processed(pos)),
            mode: self.decider.mode(),
            decider: self.decider.stats(),
        }
    }

    /// Logs [`Self::stats`] at info level.
    pub fn log_stats(&self) {
        let stats = self.stats();
        let [grass, dirt, stone, water] = stats.instances.map(|(_, count)| count);
        tracing::info!(
            steps = stats.steps,
            passes = stats.passes,
            records = stats.records,
            processed = stats.processed,
            grass,
            dirt,
            stone,
            water,
            backlog = stats.backlog,
            last_pass_us = stats.last_pass.map_or(0, |pass| pass.duration.as_micros() as u64),
            consistent = stats.records_match_instances && stats.records_processed,
            "world stats"
        );
    }
}
