//! # Grid Keys & Block Types
//!
//! `GridPosition` is the only key for a logical block. `BlockType` is a closed
//! alphabet of five values; `Air` is a legal value that is tracked but never
//! placed.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Integer cell coordinate. `z` is the vertical axis.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct GridPosition {
    /// X coordinate (in cells).
    pub x: i32,
    /// Y coordinate (in cells).
    pub y: i32,
    /// Z coordinate (in cells, up).
    pub z: i32,
}

impl GridPosition {
    /// The grid origin.
    pub const ORIGIN: Self = Self::new(0, 0, 0);

    /// Creates a new grid position.
    #[inline]
    #[must_use]
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Returns this position shifted by the given deltas.
    #[inline]
    #[must_use]
    pub const fn offset(self, dx: i32, dy: i32, dz: i32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.z + dz)
    }

    /// Returns the 6-connected neighbour in `direction`.
    #[inline]
    #[must_use]
    pub const fn neighbor(self, direction: Direction) -> Self {
        let (dx, dy, dz) = direction.delta();
        self.offset(dx, dy, dz)
    }

    /// Squared Euclidean distance in cells.
    ///
    /// Computed in `i64` so far-apart positions cannot overflow.
    #[inline]
    #[must_use]
    pub const fn distance_squared(self, other: Self) -> i64 {
        let dx = self.x as i64 - other.x as i64;
        let dy = self.y as i64 - other.y as i64;
        let dz = self.z as i64 - other.z as i64;
        dx * dx + dy * dy + dz * dz
    }

    /// Euclidean distance in cells.
    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        (self.distance_squared(other) as f64).sqrt()
    }

    /// Returns true if this position lies within `radius` cells of `center`.
    #[inline]
    #[must_use]
    pub const fn within_radius(self, center: Self, radius: i32) -> bool {
        let r = radius as i64;
        self.distance_squared(center) <= r * r
    }
}

impl fmt::Display for GridPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// Block types in the world.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum BlockType {
    /// Empty space. Recorded as processed, never placed.
    #[default]
    Air = 0,
    /// Land surface
    Grass = 1,
    /// Subsurface and underwater surface
    Dirt = 2,
    /// Deep ground
    Stone = 3,
    /// Water above low terrain
    Water = 4,
}

impl BlockType {
    /// Number of block types.
    pub const COUNT: usize = 5;

    /// Every block type, in index order.
    pub const ALL: [Self; Self::COUNT] =
        [Self::Air, Self::Grass, Self::Dirt, Self::Stone, Self::Water];

    /// Types that own render geometry.
    pub const SOLID: [Self; 4] = [Self::Grass, Self::Dirt, Self::Stone, Self::Water];

    /// Returns the dense index of this type (0..5).
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Converts from a dense index.
    #[inline]
    #[must_use]
    pub const fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Self::Air),
            1 => Some(Self::Grass),
            2 => Some(Self::Dirt),
            3 => Some(Self::Stone),
            4 => Some(Self::Water),
            _ => None,
        }
    }

    /// Returns true if this is air.
    #[inline]
    #[must_use]
    pub const fn is_air(self) -> bool {
        matches!(self, Self::Air)
    }

    /// Human readable name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Air => "Air",
            Self::Grass => "Grass",
            Self::Dirt => "Dirt",
            Self::Stone => "Stone",
            Self::Water => "Water",
        }
    }
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One of the six axis-aligned neighbour directions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Direction {
    /// +X
    PosX = 0,
    /// -X
    NegX = 1,
    /// +Y
    PosY = 2,
    /// -Y
    NegY = 3,
    /// +Z (above)
    PosZ = 4,
    /// -Z (below)
    NegZ = 5,
}

impl Direction {
    /// All directions, in index order.
    pub const ALL: [Self; 6] = [
        Self::PosX,
        Self::NegX,
        Self::PosY,
        Self::NegY,
        Self::PosZ,
        Self::NegZ,
    ];

    /// The four horizontal directions.
    pub const HORIZONTAL: [Self; 4] = [Self::PosX, Self::NegX, Self::PosY, Self::NegY];

    /// Dense index (0..6).
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Unit step along this direction.
    #[inline]
    #[must_use]
    pub const fn delta(self) -> (i32, i32, i32) {
        match self {
            Self::PosX => (1, 0, 0),
            Self::NegX => (-1, 0, 0),
            Self::PosY => (0, 1, 0),
            Self::NegY => (0, -1, 0),
            Self::PosZ => (0, 0, 1),
            Self::NegZ => (0, 0, -1),
        }
    }

    /// The direction pointing the other way.
    #[inline]
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::PosX => Self::NegX,
            Self::NegX => Self::PosX,
            Self::PosY => Self::NegY,
            Self::NegY => Self::PosY,
            Self::PosZ => Self::NegZ,
            Self::NegZ => Self::PosZ,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_type_index_roundtrip() {
        for block in BlockType::ALL {
            assert_eq!(BlockType::from_index(block.index()), Some(block));
        }
        assert_eq!(BlockType::from_index(5), None);
    }

    #[test]
    fn test_solid_excludes_air() {
        assert!(BlockType::SOLID.iter().all(|b| !b.is_air()));
        assert_eq!(BlockType::SOLID.len() + 1, BlockType::COUNT);
    }

    #[test]
    fn test_direction_opposites() {
        for dir in Direction::ALL {
            assert_eq!(dir.opposite().opposite(), dir);
            let p = GridPosition::ORIGIN.neighbor(dir).neighbor(dir.opposite());
            assert_eq!(p, GridPosition::ORIGIN);
        }
    }

    #[test]
    fn test_within_radius_is_euclidean() {
        let c = GridPosition::ORIGIN;
        assert!(GridPosition::new(2, 0, 0).within_radius(c, 2));
        assert!(GridPosition::new(1, 1, 1).within_radius(c, 2));
        assert!(!GridPosition::new(2, 1, 0).within_radius(c, 2));
        assert!(!GridPosition::new(2, 2, 0).within_radius(c, 2));
    }

    #[test]
    fn test_distance_no_overflow() {
        let a = GridPosition::new(i32::MAX, 0, 0);
        let b = GridPosition::new(i32::MIN, 0, 0);
        assert!(a.distance_squared(b) > 0);
    }
}
