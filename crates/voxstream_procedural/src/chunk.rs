//! # Chunk System
//!
//! World cells are solved and rendered in fixed-size chunks of
//! `CHUNK_SIZE x CHUNK_SIZE x CHUNK_HEIGHT` (8 x 8 x 16) cells.
//!
//! ## Cell Order
//!
//! `index = z * S * S + y * S + x` with `S = CHUNK_SIZE`, so a horizontal layer
//! is contiguous.
//!
//! ## Lifecycle
//!
//! ```text
//! Uninitialized -> Constrained -> { Collapsed | FallbackResolved } -> Rendered
//! ```
//!
//! A chunk renders at most once; a second `mark_rendered` is an error.

use voxstream_shared::{BlockType, ChunkCoord, Direction, GridPosition, CELLS_PER_CHUNK, CHUNK_HEIGHT, CHUNK_SIZE};

use crate::error::{ChunkError, ChunkResult};
use crate::wfc::wave::Wave;

/// Cell coordinate inside a chunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LocalCoord {
    /// 0..CHUNK_SIZE
    pub x: usize,
    /// 0..CHUNK_SIZE
    pub y: usize,
    /// 0..CHUNK_HEIGHT
    pub z: usize,
}

impl LocalCoord {
    /// Creates a local coordinate. Returns `None` outside the chunk.
    #[inline]
    #[must_use]
    pub const fn new(x: usize, y: usize, z: usize) -> Option<Self> {
        if x < CHUNK_SIZE && y < CHUNK_SIZE && z < CHUNK_HEIGHT {
            Some(Self { x, y, z })
        } else {
            None
        }
    }

    /// Linear cell index.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.z * CHUNK_SIZE * CHUNK_SIZE + self.y * CHUNK_SIZE + self.x
    }

    /// Inverse of [`LocalCoord::index`].
    #[inline]
    #[must_use]
    pub const fn from_index(index: usize) -> Option<Self> {
        if index >= CELLS_PER_CHUNK {
            return None;
        }
        let layer = CHUNK_SIZE * CHUNK_SIZE;
        let rem = index % layer;
        Some(Self {
            x: rem % CHUNK_SIZE,
            y: rem / CHUNK_SIZE,
            z: index / layer,
        })
    }

    /// Local coordinate of a global position, if it lies in `coord`.
    #[must_use]
    pub fn from_grid(coord: ChunkCoord, pos: GridPosition) -> Option<Self> {
        if !coord.contains(pos) {
            return None;
        }
        let origin = coord.origin();
        Some(Self {
            x: (pos.x - origin.x) as usize,
            y: (pos.y - origin.y) as usize,
            z: (pos.z - origin.z) as usize,
        })
    }

    /// Neighbour inside the same chunk, if any.
    #[must_use]
    pub fn neighbor(self, direction: Direction) -> Option<Self> {
        let (dx, dy, dz) = direction.delta();
        let x = self.x.checked_add_signed(dx as isize)?;
        let y = self.y.checked_add_signed(dy as isize)?;
        let z = self.z.checked_add_signed(dz as isize)?;
        Self::new(x, y, z)
    }

    /// Global grid position of this cell in `coord`.
    #[inline]
    #[must_use]
    pub const fn to_grid(self, coord: ChunkCoord) -> GridPosition {
        coord.origin().offset(self.x as i32, self.y as i32, self.z as i32)
    }
}

/// Chunk lifecycle state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChunkState {
    /// All-true wave, no constraints applied.
    Uninitialized,
    /// Seed constraints applied, solving may start.
    Constrained,
    /// Solved by constraint propagation.
    Collapsed,
    /// Filled by the deterministic fallback.
    FallbackResolved,
    /// Committed to the world.
    Rendered,
}

impl ChunkState {
    /// Returns true once every cell has exactly one type.
    #[inline]
    #[must_use]
    pub const fn is_resolved(self) -> bool {
        matches!(self, Self::Collapsed | Self::FallbackResolved | Self::Rendered)
    }
}

#[derive(Clone, Debug)]
enum Cells {
    Wave(Wave),
    Resolved(Box<[BlockType]>),
}

/// A chunk of world cells.
#[derive(Clone, Debug)]
pub struct Chunk {
    coord: ChunkCoord,
    state: ChunkState,
    cells: Cells,
}

impl Chunk {
    /// Creates an uninitialized chunk with an all-true wave.
    #[must_use]
    pub fn new(coord: ChunkCoord) -> Self {
        Self {
            coord,
            state: ChunkState::Uninitialized,
            cells: Cells::Wave(Wave::new()),
        }
    }

    /// Chunk position in the world.
    #[inline]
    #[must_use]
    pub const fn coord(&self) -> ChunkCoord {
        self.coord
    }

    /// Current lifecycle state.
    #[inline]
    #[must_use]
    pub const fn state(&self) -> ChunkState {
        self.state
    }

    fn transition_error(&self, to: ChunkState) -> ChunkError {
        ChunkError::InvalidTransition {
            coord: self.coord,
            from: self.state,
            to,
        }
    }

    /// The wave while the chunk is being solved.
    #[must_use]
    pub fn wave(&self) -> Option<&Wave> {
        match &self.cells {
            Cells::Wave(wave) => Some(wave),
            Cells::Resolved(_) => None,
        }
    }

    /// Mutable wave while the chunk is being solved.
    pub fn wave_mut(&mut self) -> Option<&mut Wave> {
        match &mut self.cells {
            Cells::Wave(wave) => Some(wave),
            Cells::Resolved(_) => None,
        }
    }

    /// Uninitialized -> Constrained.
    ///
    /// # Errors
    ///
    /// [`ChunkError::InvalidTransition`] from any other state.
    pub fn mark_constrained(&mut self) -> ChunkResult<()> {
        if self.state != ChunkState::Uninitialized {
            return Err(self.transition_error(ChunkState::Constrained));
        }
        self.state = ChunkState::Constrained;
        Ok(())
    }

    /// Constrained -> Collapsed, adopting the solver's cells.
    ///
    /// # Errors
    ///
    /// [`ChunkError::InvalidTransition`] unless the chunk is Constrained.
    pub fn resolve_collapsed(&mut self, cells: Box<[BlockType]>) -> ChunkResult<()> {
        if self.state != ChunkState::Constrained || cells.len() != CELLS_PER_CHUNK {
            return Err(self.transition_error(ChunkState::Collapsed));
        }
        self.cells = Cells::Resolved(cells);
        self.state = ChunkState::Collapsed;
        Ok(())
    }

    /// {Uninitialized, Constrained} -> FallbackResolved.
    ///
    /// # Errors
    ///
    /// [`ChunkError::InvalidTransition`] once the chunk is resolved.
    pub fn resolve_fallback(&mut self, cells: Box<[BlockType]>) -> ChunkResult<()> {
        if self.state.is_resolved() || cells.len() != CELLS_PER_CHUNK {
            return Err(self.transition_error(ChunkState::FallbackResolved));
        }
        self.cells = Cells::Resolved(cells);
        self.state = ChunkState::FallbackResolved;
        Ok(())
    }

    /// {Collapsed, FallbackResolved} -> Rendered.
    ///
    /// # Errors
    ///
    /// [`ChunkError::AlreadyRendered`] on a second call,
    /// [`ChunkError::NotResolved`] before the cells are resolved.
    pub fn mark_rendered(&mut self) -> ChunkResult<()> {
        match self.state {
            ChunkState::Rendered => Err(ChunkError::AlreadyRendered { coord: self.coord }),
            ChunkState::Collapsed | ChunkState::FallbackResolved => {
                self.state = ChunkState::Rendered;
                Ok(())
            }
            state => Err(ChunkError::NotResolved {
                coord: self.coord,
                state,
            }),
        }
    }

    /// Resolved cells in index order.
    ///
    /// # Errors
    ///
    /// [`ChunkError::NotResolved`] while the chunk still holds a wave.
    pub fn blocks(&self) -> ChunkResult<&[BlockType]> {
        match &self.cells {
            Cells::Resolved(cells) => Ok(cells),
            Cells::Wave(_) => Err(ChunkError::NotResolved {
                coord: self.coord,
                state: self.state,
            }),
        }
    }

    /// Resolved type at a local coordinate.
    #[must_use]
    pub fn block_at(&self, local: LocalCoord) -> Option<BlockType> {
        match &self.cells {
            Cells::Resolved(cells) => cells.get(local.index()).copied(),
            Cells::Wave(_) => None,
        }
    }

    /// Resolved type at a global grid position inside this chunk.
    #[must_use]
    pub fn block_at_grid(&self, pos: GridPosition) -> Option<BlockType> {
        LocalCoord::from_grid(self.coord, pos).and_then(|local| self.block_at(local))
    }

    /// Iterates `(position, type)` for every resolved cell.
    ///
    /// # Errors
    ///
    /// [`ChunkError::NotResolved`] while the chunk still holds a wave.
    pub fn iter_cells(&self) -> ChunkResult<impl Iterator<Item = (GridPosition, BlockType)> + '_> {
        let coord = self.coord;
        let cells = self.blocks()?;
        Ok(cells.iter().enumerate().filter_map(move |(index, block)| {
            LocalCoord::from_index(index).map(|local| (local.to_grid(coord), *block))
        }))
    }

    /// Number of non-air resolved cells.
    #[must_use]
    pub fn solid_count(&self) -> usize {
        self.blocks()
            .map(|cells| cells.iter().filter(|b| !b.is_air()).count())
            .unwrap_or(0)
    }
}
