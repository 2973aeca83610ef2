//! # World Configuration
//!
//! Every field has a default, so an empty TOML document is a valid config.
//!
//! ```toml
//! seed = 42
//! block_size = 100.0
//!
//! [terrain]
//! sea_level = 4
//!
//! [streaming]
//! mode = "hybrid"
//! view_radius = 24
//!
//! [chunks]
//! render_distance = 2
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use voxstream_procedural::{SolverConfig, TerrainParams};
use voxstream_shared::constants::{
    DEFAULT_BLOCK_SIZE, DEFAULT_EVICTION_MARGIN, DEFAULT_MAX_BLOCKS_PER_STEP, DEFAULT_MAX_CHUNKS_PER_STEP,
    DEFAULT_POOL_CAPACITY, DEFAULT_RENDER_DISTANCE, DEFAULT_RESTREAM_FRACTION, DEFAULT_VIEW_RADIUS,
};

use crate::decider::GenerationMode;
use crate::error::{WorldError, WorldResult};

/// Default number of solved chunks kept by the hybrid decider.
pub const DEFAULT_SOLVED_CHUNK_CACHE: usize = 64;

/// Default steps between periodic validations.
pub const DEFAULT_VALIDATION_INTERVAL: u64 = 600;

/// Per-block streaming around the observer.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamingConfig {
    /// How block types are decided.
    pub mode: GenerationMode,
    /// Euclidean radius (cells) kept generated around the observer.
    pub view_radius: i32,
    /// Extra cells beyond the view radius before eviction.
    pub eviction_margin: i32,
    /// Positions decided per pass at most.
    pub max_blocks_per_step: usize,
    /// Fraction of a block the observer must move to force a pass.
    pub restream_fraction: f64,
    /// Steps between validations. 0 disables.
    pub validation_interval_steps: u64,
    /// Solved chunks cached in hybrid mode.
    pub solved_chunk_cache: usize,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            mode: GenerationMode::default(),
            view_radius: DEFAULT_VIEW_RADIUS,
            eviction_margin: DEFAULT_EVICTION_MARGIN,
            max_blocks_per_step: DEFAULT_MAX_BLOCKS_PER_STEP,
            restream_fraction: DEFAULT_RESTREAM_FRACTION,
            validation_interval_steps: DEFAULT_VALIDATION_INTERVAL,
            solved_chunk_cache: DEFAULT_SOLVED_CHUNK_CACHE,
        }
    }
}

impl StreamingConfig {
    /// Radius beyond which records are evicted.
    #[inline]
    #[must_use]
    pub const fn eviction_radius(&self) -> i32 {
        self.view_radius + self.eviction_margin
    }
}

/// Whole-chunk streaming around the observer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkStreamingConfig {
    /// Chebyshev radius (chunks) kept loaded.
    pub render_distance: i32,
    /// Chunks generated per step at most.
    pub max_chunks_per_step: usize,
}

impl Default for ChunkStreamingConfig {
    fn default() -> Self {
        Self {
            render_distance: DEFAULT_RENDER_DISTANCE,
            max_chunks_per_step: DEFAULT_MAX_CHUNKS_PER_STEP,
        }
    }
}

/// Complete world configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// World seed.
    pub seed: u64,
    /// Edge length of one cell in world units.
    pub block_size: f64,
    /// Instances each render pool accepts.
    pub pool_capacity: usize,
    /// Height field shape.
    pub terrain: TerrainParams,
    /// Per-block streaming.
    pub streaming: StreamingConfig,
    /// Whole-chunk streaming.
    pub chunks: ChunkStreamingConfig,
    /// Constraint solver limits.
    pub solver: SolverConfig,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            block_size: DEFAULT_BLOCK_SIZE,
            pool_capacity: DEFAULT_POOL_CAPACITY,
            terrain: TerrainParams::default(),
            streaming: StreamingConfig::default(),
            chunks: ChunkStreamingConfig::default(),
            solver: SolverConfig::default(),
        }
    }
}

impl WorldConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// [`WorldError::ConfigParse`] or [`WorldError::InvalidConfig`].
    pub fn from_toml_str(text: &str) -> WorldResult<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// [`WorldError::ConfigIo`], [`WorldError::ConfigParse`] or
    /// [`WorldError::InvalidConfig`].
    pub fn load(path: impl AsRef<Path>) -> WorldResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| WorldError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        tracing::info!(path = %path.display(), seed = config.seed, "loaded world config");
        Ok(config)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// [`WorldError::InvalidConfig`] naming the first bad field.
    pub fn validate(&self) -> WorldResult<()> {
        fn invalid(message: String) -> WorldResult<()> {
            Err(WorldError::InvalidConfig(message))
        }

        if !self.block_size.is_finite() || self.block_size <= 0.0 {
            return invalid(format!("block_size must be positive, got {}", self.block_size));
        }
        if self.pool_capacity == 0 {
            return invalid("pool_capacity must be at least 1".into());
        }

        let terrain = &self.terrain;
        if terrain.min_height > terrain.max_height - 4 {
            return invalid(format!(
                "terrain height window {}..{} is too small",
                terrain.min_height, terrain.max_height
            ));
        }
        if !terrain.noise_scale.is_finite() || terrain.noise_scale <= 0.0 {
            return invalid(format!("terrain.noise_scale must be positive, got {}", terrain.noise_scale));
        }
        if terrain.height_variation < 0 || terrain.dirt_depth < 0 {
            return invalid("terrain.height_variation and terrain.dirt_depth must not be negative".into());
        }

        let streaming = &self.streaming;
        if streaming.view_radius < 0 || streaming.eviction_margin < 0 {
            return invalid("streaming.view_radius and streaming.eviction_margin must not be negative".into());
        }
        if streaming.max_blocks_per_step == 0 {
            return invalid("streaming.max_blocks_per_step must be at least 1".into());
        }
        if !streaming.restream_fraction.is_finite() || streaming.restream_fraction <= 0.0 {
            return invalid(format!(
                "streaming.restream_fraction must be positive, got {}",
                streaming.restream_fraction
            ));
        }
        if streaming.solved_chunk_cache == 0 {
            return invalid("streaming.solved_chunk_cache must be at least 1".into());
        }

        if self.chunks.render_distance < 0 {
            return invalid("chunks.render_distance must not be negative".into());
        }
        if self.chunks.max_chunks_per_step == 0 {
            return invalid("chunks.max_chunks_per_step must be at least 1".into());
        }
        if self.solver.max_attempts == 0 {
            return invalid("solver.max_attempts must be at least 1".into());
        }

        Ok(())
    }
}
