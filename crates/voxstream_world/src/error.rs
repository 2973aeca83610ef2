//! # World Error Types
//!
//! Nothing here is fatal. Handle failures and commit races leave the position
//! undecided for a later pass; structural problems are reported by validation,
//! not raised as errors.

use std::path::PathBuf;

use thiserror::Error;
use voxstream_procedural::ChunkError;
use voxstream_shared::{BlockType, GridPosition};

/// Render instance pool errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// The pool cannot accept another instance.
    #[error("instance pool exhausted: capacity {capacity}")]
    PoolExhausted {
        /// Pool capacity.
        capacity: usize,
    },

    /// Index does not name a live instance.
    #[error("instance index {index} out of range (pool holds {count})")]
    InvalidIndex {
        /// Requested index.
        index: usize,
        /// Live instances.
        count: usize,
    },

    /// No pool renders this block type.
    #[error("no render pool for {0}")]
    NoPool(BlockType),
}

/// Streaming world errors.
#[derive(Error, Debug)]
pub enum WorldError {
    /// Render handle could not be acquired; nothing was written.
    #[error("could not acquire a {block} handle at {pos}: {source}")]
    HandleAcquisition {
        /// Position being placed.
        pos: GridPosition,
        /// Type being placed.
        block: BlockType,
        /// Pool failure.
        #[source]
        source: RenderError,
    },

    /// Position became occupied between enumeration and commit.
    #[error("{pos} already holds {existing}")]
    RaceAtCommit {
        /// Contested position.
        pos: GridPosition,
        /// Type already recorded there.
        existing: BlockType,
    },

    /// Air cannot be placed, only recorded as processed.
    #[error("cannot place {block} at {pos}")]
    NotPlaceable {
        /// Target position.
        pos: GridPosition,
        /// Rejected type.
        block: BlockType,
    },

    /// Chunk lifecycle violation.
    #[error(transparent)]
    Chunk(#[from] ChunkError),

    /// Render pool failure outside placement (pool rebuild).
    #[error(transparent)]
    Render(#[from] RenderError),

    /// Configuration values are out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration file could not be read.
    #[error("failed to read {path}: {source}")]
    ConfigIo {
        /// File path.
        path: PathBuf,
        /// I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// Configuration file is not valid TOML for [`crate::WorldConfig`].
    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

/// Result type for world operations.
pub type WorldResult<T> = Result<T, WorldError>;

/// Result type for render pool operations.
pub type RenderResult<T> = Result<T, RenderError>;
