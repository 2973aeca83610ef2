//! # Height Synthesizer
//!
//! Turns a 2D noise field into a surface height per column and classifies every
//! cell of that column.
//!
//! ## Height
//!
//! ```text
//! h(x, y) = clamp(base + round(fbm(x, y) * variation), min + 2, max - 2)
//! ```
//!
//! `fbm` sums four octaves (amplitude halving, frequency doubling) normalized by
//! the amplitude sum, so it stays in `[-1, 1]`.
//!
//! ## Classification
//!
//! [`classify_cell`] is the single source of truth for "what belongs here".
//! The fallback generator, the simple streaming decider and validation all call
//! it; a second copy of these rules would be a correctness bug.

use serde::{Deserialize, Serialize};
use voxstream_shared::constants::{
    DEFAULT_BASE_HEIGHT, DEFAULT_DIRT_DEPTH, DEFAULT_HEIGHT_VARIATION, DEFAULT_MAX_HEIGHT,
    DEFAULT_MIN_HEIGHT, DEFAULT_NOISE_SCALE, DEFAULT_SEA_LEVEL,
};
use voxstream_shared::{BlockType, GridPosition};

use crate::noise::{NoiseSource, SimplexNoise, WorldSeed};

/// Octaves summed by the height field.
pub const HEIGHT_OCTAVES: u32 = 4;

/// Seed purpose for the height noise stream.
const HEIGHT_NOISE_PURPOSE: u64 = 0x4845_4947_4854;

/// Terrain shape parameters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainParams {
    /// Base frequency of the height noise (per cell).
    pub noise_scale: f64,
    /// Mean surface height.
    pub base_height: i32,
    /// Surface swing around the mean.
    pub height_variation: i32,
    /// Dirt layers between the surface and stone.
    pub dirt_depth: i32,
    /// Water fills low columns up to this height.
    pub sea_level: i32,
    /// Lowest generated cell.
    pub min_height: i32,
    /// Highest generated cell.
    pub max_height: i32,
}

impl Default for TerrainParams {
    fn default() -> Self {
        Self {
            noise_scale: DEFAULT_NOISE_SCALE,
            base_height: DEFAULT_BASE_HEIGHT,
            height_variation: DEFAULT_HEIGHT_VARIATION,
            dirt_depth: DEFAULT_DIRT_DEPTH,
            sea_level: DEFAULT_SEA_LEVEL,
            min_height: DEFAULT_MIN_HEIGHT,
            max_height: DEFAULT_MAX_HEIGHT,
        }
    }
}

impl TerrainParams {
    /// Lowest surface height the synthesizer can produce.
    #[inline]
    #[must_use]
    pub const fn min_surface(&self) -> i32 {
        self.min_height + 2
    }

    /// Highest surface height the synthesizer can produce.
    #[inline]
    #[must_use]
    pub const fn max_surface(&self) -> i32 {
        self.max_height - 2
    }

    /// Returns true if `z` lies inside the generated height window.
    #[inline]
    #[must_use]
    pub const fn contains_height(&self, z: i32) -> bool {
        z >= self.min_height && z <= self.max_height
    }
}

/// Vertical zone of a cell relative to its column's surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ColumnZone {
    /// Above the surface, dry.
    Air,
    /// Above a low surface, at or below sea level.
    Water,
    /// The surface cell itself.
    Surface,
    /// Within `dirt_depth` below the surface.
    Subsurface,
    /// Everything deeper.
    Deep,
}

impl ColumnZone {
    /// Classifies height `z` in a column whose surface is at `surface`.
    #[must_use]
    pub const fn of(z: i32, surface: i32, params: &TerrainParams) -> Self {
        if z > surface {
            if z <= params.sea_level && surface <= params.sea_level {
                Self::Water
            } else {
                Self::Air
            }
        } else if z == surface {
            Self::Surface
        } else if z > surface - params.dirt_depth {
            Self::Subsurface
        } else {
            Self::Deep
        }
    }

    /// Block type for this zone. Submerged surfaces are dirt, dry ones grass.
    #[must_use]
    pub const fn block_type(self, surface: i32, params: &TerrainParams) -> BlockType {
        match self {
            Self::Air => BlockType::Air,
            Self::Water => BlockType::Water,
            Self::Surface => {
                if surface > params.sea_level {
                    BlockType::Grass
                } else {
                    BlockType::Dirt
                }
            }
            Self::Subsurface => BlockType::Dirt,
            Self::Deep => BlockType::Stone,
        }
    }
}

/// Pure cell classification for height `z` over a surface at `surface`.
#[inline]
#[must_use]
pub const fn classify_cell(z: i32, surface: i32, params: &TerrainParams) -> BlockType {
    ColumnZone::of(z, surface, params).block_type(surface, params)
}

/// Sums `octaves` layers of `noise`, normalized to `[-1, 1]`.
#[must_use]
pub fn multi_octave(noise: &dyn NoiseSource, x: f64, y: f64, octaves: u32) -> f64 {
    let mut total = 0.0;
    let mut amplitude = 1.0;
    let mut frequency = 1.0;
    let mut max_amplitude = 0.0;

    for _ in 0..octaves {
        total += noise.noise_2d(x * frequency, y * frequency) * amplitude;
        max_amplitude += amplitude;
        amplitude *= 0.5;
        frequency *= 2.0;
    }

    if max_amplitude > 0.0 {
        total / max_amplitude
    } else {
        0.0
    }
}

/// Deterministic surface height field.
pub struct HeightSynthesizer {
    params: TerrainParams,
    noise: Box<dyn NoiseSource>,
}

impl std::fmt::Debug for HeightSynthesizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeightSynthesizer")
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

impl HeightSynthesizer {
    /// Creates a synthesizer over an injected noise source.
    #[must_use]
    pub fn new(params: TerrainParams, noise: impl NoiseSource + 'static) -> Self {
        Self {
            params,
            noise: Box::new(noise),
        }
    }

    /// Creates a synthesizer over seeded simplex noise.
    #[must_use]
    pub fn from_seed(params: TerrainParams, seed: WorldSeed) -> Self {
        Self::new(params, SimplexNoise::new(seed.derive(HEIGHT_NOISE_PURPOSE)))
    }

    /// Terrain parameters.
    #[inline]
    #[must_use]
    pub const fn params(&self) -> &TerrainParams {
        &self.params
    }

    /// Surface height of column `(x, y)`.
    #[must_use]
    pub fn terrain_height(&self, x: i32, y: i32) -> i32 {
        let scale = self.params.noise_scale;
        let n = multi_octave(
            self.noise.as_ref(),
            f64::from(x) * scale,
            f64::from(y) * scale,
            HEIGHT_OCTAVES,
        );
        let raw = self.params.base_height + (n * f64::from(self.params.height_variation)).round() as i32;
        raw.clamp(self.params.min_surface(), self.params.max_surface())
    }

    /// Zone of the cell at `pos`.
    #[must_use]
    pub fn zone(&self, pos: GridPosition) -> ColumnZone {
        ColumnZone::of(pos.z, self.terrain_height(pos.x, pos.y), &self.params)
    }

    /// Block type the height field puts at `pos`.
    #[must_use]
    pub fn classify(&self, pos: GridPosition) -> BlockType {
        classify_cell(pos.z, self.terrain_height(pos.x, pos.y), &self.params)
    }
}
