//! # Generation & Streaming Constants
//!
//! Chunk dimensions are compile-time constants. Everything else here is only a
//! default; the live values come from the world configuration.

// =============================================================================
// CHUNK GEOMETRY
// =============================================================================

/// Chunk width/depth in cells.
pub const CHUNK_SIZE: usize = 8;

/// Chunk height in cells.
pub const CHUNK_HEIGHT: usize = 16;

/// Total cells per chunk.
pub const CELLS_PER_CHUNK: usize = CHUNK_SIZE * CHUNK_SIZE * CHUNK_HEIGHT;

// =============================================================================
// WORLD DEFAULTS
// =============================================================================

/// Edge length of one block in world units.
pub const DEFAULT_BLOCK_SIZE: f64 = 100.0;

/// Fraction of a block added (negatively) before rounding world space to grid.
///
/// Pushes exact half-cell values down so a cell centre maps back to its cell.
pub const GRID_ROUNDING_BIAS: f64 = 0.01;

/// Lattice used to snap grid-to-world products (1 / `WORLD_SNAP` units).
pub const WORLD_SNAP: f64 = 1_000_000.0;

/// Lowest terrain cell considered by the generator.
pub const DEFAULT_MIN_HEIGHT: i32 = -8;

/// Highest terrain cell considered by the generator.
pub const DEFAULT_MAX_HEIGHT: i32 = 24;

/// Mean surface height.
pub const DEFAULT_BASE_HEIGHT: i32 = 6;

/// Surface height swing around the mean.
pub const DEFAULT_HEIGHT_VARIATION: i32 = 12;

/// Dirt layers beneath the surface.
pub const DEFAULT_DIRT_DEPTH: i32 = 4;

/// Water fills low columns up to this height.
pub const DEFAULT_SEA_LEVEL: i32 = 4;

/// Base frequency of the height noise.
pub const DEFAULT_NOISE_SCALE: f64 = 0.015;

// =============================================================================
// STREAMING DEFAULTS
// =============================================================================

/// Radius (in cells) of the working set around the observer.
pub const DEFAULT_VIEW_RADIUS: i32 = 50;

/// Extra cells kept beyond the view radius before eviction.
pub const DEFAULT_EVICTION_MARGIN: i32 = 3;

/// Positions decided per streaming pass.
pub const DEFAULT_MAX_BLOCKS_PER_STEP: usize = 100;

/// Movement (in blocks) that triggers a new pass without a grid change.
pub const DEFAULT_RESTREAM_FRACTION: f64 = 0.8;

/// Chunk render distance for the chunked streamer.
pub const DEFAULT_RENDER_DISTANCE: i32 = 1;

/// Chunks generated per step by the chunked streamer.
pub const DEFAULT_MAX_CHUNKS_PER_STEP: usize = 2;

/// Instances each render pool accepts.
pub const DEFAULT_POOL_CAPACITY: usize = 1_000_000;
