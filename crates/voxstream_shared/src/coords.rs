//! # Coordinate Mapper
//!
//! Converts between continuous world space and the integer block grid.
//!
//! ## Mapping
//!
//! - World to grid rounds (not floors) each axis after a small downward bias,
//!   so an observer standing exactly on a cell edge lands on a stable cell.
//! - Grid to world returns the cell centre `g * size + size / 2`. The product is
//!   snapped to a fixed lattice so repeated conversions never drift.
//!
//! The bias and the half-cell offset are chosen together: every cell centre maps
//! back to its own cell.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::{CHUNK_HEIGHT, CHUNK_SIZE, DEFAULT_BLOCK_SIZE, GRID_ROUNDING_BIAS, WORLD_SNAP};
use crate::grid::GridPosition;
use crate::math::Vec3;

/// Chunk coordinate (identifies a chunk in the world grid).
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct ChunkCoord {
    /// X coordinate (in chunks, not blocks).
    pub x: i32,
    /// Y coordinate (in chunks, not blocks).
    pub y: i32,
    /// Vertical layer (in chunks of `CHUNK_HEIGHT` cells).
    pub z: i32,
}

impl ChunkCoord {
    /// Creates a new chunk coordinate.
    #[inline]
    #[must_use]
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Returns the chunk containing a grid position.
    #[inline]
    #[must_use]
    pub const fn from_grid(pos: GridPosition) -> Self {
        Self {
            x: pos.x.div_euclid(CHUNK_SIZE as i32),
            y: pos.y.div_euclid(CHUNK_SIZE as i32),
            z: pos.z.div_euclid(CHUNK_HEIGHT as i32),
        }
    }

    /// Grid position of the chunk's lowest corner.
    #[inline]
    #[must_use]
    pub const fn origin(self) -> GridPosition {
        GridPosition::new(
            self.x * CHUNK_SIZE as i32,
            self.y * CHUNK_SIZE as i32,
            self.z * CHUNK_HEIGHT as i32,
        )
    }

    /// Returns true if `pos` lies inside this chunk.
    #[inline]
    #[must_use]
    pub const fn contains(self, pos: GridPosition) -> bool {
        let c = Self::from_grid(pos);
        c.x == self.x && c.y == self.y && c.z == self.z
    }

    /// Horizontal Chebyshev distance, ignoring the vertical layer.
    #[inline]
    #[must_use]
    pub const fn chebyshev_xy(self, other: Self) -> i32 {
        let dx = (self.x - other.x).abs();
        let dy = (self.y - other.y).abs();
        if dx > dy {
            dx
        } else {
            dy
        }
    }
}

impl fmt::Display for ChunkCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "chunk({}, {}, {})", self.x, self.y, self.z)
    }
}

/// Rejected block size (zero, negative or not finite).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InvalidBlockSize(pub f64);

impl fmt::Display for InvalidBlockSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "block size must be positive and finite, got {}", self.0)
    }
}

impl std::error::Error for InvalidBlockSize {}

/// World-space to grid-space converter for one block size.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CoordinateMapper {
    block_size: f64,
}

impl Default for CoordinateMapper {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
        }
    }
}

impl CoordinateMapper {
    /// Creates a mapper for the given block edge length.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidBlockSize`] if `block_size` is not a positive finite number.
    pub fn new(block_size: f64) -> Result<Self, InvalidBlockSize> {
        if !block_size.is_finite() || block_size <= 0.0 {
            return Err(InvalidBlockSize(block_size));
        }
        Ok(Self { block_size })
    }

    /// Block edge length in world units.
    #[inline]
    #[must_use]
    pub const fn block_size(&self) -> f64 {
        self.block_size
    }

    #[inline]
    fn axis_to_grid(&self, value: f64) -> i32 {
        (value / self.block_size - GRID_ROUNDING_BIAS).round() as i32
    }

    #[inline]
    fn axis_to_world(&self, cell: i32) -> f64 {
        let base = (f64::from(cell) * self.block_size * WORLD_SNAP).round() / WORLD_SNAP;
        base + self.block_size * 0.5
    }

    /// Maps a world position to the grid cell that contains it.
    #[must_use]
    pub fn world_to_grid(&self, pos: Vec3) -> GridPosition {
        GridPosition::new(
            self.axis_to_grid(pos.x),
            self.axis_to_grid(pos.y),
            self.axis_to_grid(pos.z),
        )
    }

    /// Returns the world-space centre of a grid cell.
    #[must_use]
    pub fn grid_to_world(&self, pos: GridPosition) -> Vec3 {
        Vec3::new(
            self.axis_to_world(pos.x),
            self.axis_to_world(pos.y),
            self.axis_to_world(pos.z),
        )
    }

    /// Maps a world position to the chunk that contains it.
    #[must_use]
    pub fn world_to_chunk(&self, pos: Vec3) -> ChunkCoord {
        ChunkCoord::from_grid(self.world_to_grid(pos))
    }

    /// Returns the chunk containing a grid cell.
    #[inline]
    #[must_use]
    pub const fn grid_to_chunk(&self, pos: GridPosition) -> ChunkCoord {
        ChunkCoord::from_grid(pos)
    }

    /// Horizontal edge length of one chunk in world units.
    #[inline]
    #[must_use]
    pub fn chunk_world_size(&self) -> f64 {
        CHUNK_SIZE as f64 * self.block_size
    }
}
