//! # VOXSTREAM Shared
//!
//! Common types used by the procedural generator and the streaming world.
//!
//! ## CRITICAL RULE
//!
//! Every crate keys blocks by [`GridPosition`] and converts world space through
//! [`CoordinateMapper`]. Never roll a private conversion: two mappings that
//! disagree by one cell are exactly how duplicate placements are born.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]

pub mod constants;
pub mod coords;
pub mod grid;
pub mod math;

pub use constants::{CHUNK_HEIGHT, CHUNK_SIZE, CELLS_PER_CHUNK};
pub use coords::{ChunkCoord, CoordinateMapper, InvalidBlockSize};
pub use grid::{BlockType, Direction, GridPosition};
pub use math::Vec3;
