//! # VOXSTREAM Procedural Generation
//!
//! Deterministic terrain and chunk solving for a streamed voxel world.
//!
//! ## Design Principles
//!
//! 1. **Deterministic**: same seed and chunk coordinate, same cells
//! 2. **Chunked**: cells are solved in fixed 8 x 8 x 16 chunks
//! 3. **Total**: every chunk resolves; the solver falls back to the height field
//!
//! ## Core Components
//!
//! - `SimplexNoise` / `NoiseSource`: the 2D noise contract and its shipped implementation
//! - `HeightSynthesizer`: surface height and column classification
//! - `fallback`: height-field chunk fill
//! - `wfc`: wave, adjacency rules, seeding and the constraint solver
//! - `ChunkGenerator`: solver first, fallback on failure
//!
//! ## Example
//!
//! ```rust,ignore
//! use voxstream_procedural::{ChunkGenerator, SolverConfig, TerrainParams, WorldSeed};
//! use voxstream_shared::ChunkCoord;
//!
//! let generator = ChunkGenerator::new(WorldSeed::new(42), TerrainParams::default(), SolverConfig::default());
//! let (chunk, report) = generator.generate(ChunkCoord::new(0, 0, 0))?;
//! println!("{:?}: {} solid cells", report.method, chunk.solid_count());
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod chunk;
pub mod error;
pub mod fallback;
pub mod generator;
pub mod noise;
pub mod terrain;
pub mod wfc;

pub use chunk::{Chunk, ChunkState, LocalCoord};
pub use error::{ChunkError, ChunkResult};
pub use fallback::{fallback_cells, fill_chunk};
pub use generator::{ChunkGenerator, GenerationMethod, GenerationReport};
pub use noise::{NoiseSource, SimplexNoise, WorldSeed};
pub use terrain::{classify_cell, ColumnZone, HeightSynthesizer, TerrainParams};
pub use wfc::{
    seed_wave, AdjacencyRules, ConstraintSolver, SolveFailure, SolveOutcome, SolverConfig, TypeSet,
    Wave,
};
