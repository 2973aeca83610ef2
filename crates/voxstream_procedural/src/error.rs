//! Chunk lifecycle errors.

use thiserror::Error;
use voxstream_shared::ChunkCoord;

use crate::chunk::ChunkState;

/// Chunk lifecycle errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChunkError {
    /// Chunk was already rendered once.
    #[error("{coord} is already rendered")]
    AlreadyRendered {
        /// Offending chunk.
        coord: ChunkCoord,
    },

    /// Lifecycle step not allowed from the current state.
    #[error("{coord}: cannot move from {from:?} to {to:?}")]
    InvalidTransition {
        /// Offending chunk.
        coord: ChunkCoord,
        /// Current state.
        from: ChunkState,
        /// Requested state.
        to: ChunkState,
    },

    /// Resolved cells requested before the chunk was collapsed or filled.
    #[error("{coord} has no resolved cells (state {state:?})")]
    NotResolved {
        /// Offending chunk.
        coord: ChunkCoord,
        /// Current state.
        state: ChunkState,
    },
}

/// Result type for chunk operations.
pub type ChunkResult<T> = Result<T, ChunkError>;
