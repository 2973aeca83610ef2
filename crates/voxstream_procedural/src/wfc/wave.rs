//! Per-cell admissible-type sets.

use std::fmt;

use voxstream_shared::{BlockType, CELLS_PER_CHUNK};

/// Bitset over the five block types.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct TypeSet(u8);

impl TypeSet {
    /// No type admitted.
    pub const EMPTY: Self = Self(0);
    /// Every type admitted.
    pub const ALL: Self = Self((1 << BlockType::COUNT) - 1);

    /// Set containing exactly `block`.
    #[inline]
    #[must_use]
    pub const fn only(block: BlockType) -> Self {
        Self(1 << block.index())
    }

    /// Set containing every listed type.
    #[must_use]
    pub const fn of(blocks: &[BlockType]) -> Self {
        let mut bits = 0u8;
        let mut i = 0;
        while i < blocks.len() {
            bits |= 1 << blocks[i].index();
            i += 1;
        }
        Self(bits)
    }

    /// Raw bits.
    #[inline]
    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Returns true if `block` is admitted.
    #[inline]
    #[must_use]
    pub const fn contains(self, block: BlockType) -> bool {
        self.0 & (1 << block.index()) != 0
    }

    /// Number of admitted types.
    #[inline]
    #[must_use]
    pub const fn len(self) -> u32 {
        self.0.count_ones()
    }

    /// Returns true if nothing is admitted (a contradiction).
    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// The single admitted type, if exactly one remains.
    #[inline]
    #[must_use]
    pub const fn single(self) -> Option<BlockType> {
        if self.0.count_ones() == 1 {
            BlockType::from_index(self.0.trailing_zeros() as usize)
        } else {
            None
        }
    }

    /// Intersection.
    #[inline]
    #[must_use]
    pub const fn intersect(self, other: Self) -> Self {
        Self(self.0 & other.0)
    }

    /// Union.
    #[inline]
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// This set without `block`.
    #[inline]
    #[must_use]
    pub const fn without(self, block: BlockType) -> Self {
        Self(self.0 & !(1 << block.index()))
    }

    /// Iterates admitted types in index order.
    pub fn iter(self) -> impl Iterator<Item = BlockType> {
        BlockType::ALL.into_iter().filter(move |b| self.contains(*b))
    }
}

impl fmt::Debug for TypeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// Admissible-type sets for every cell of one chunk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Wave {
    cells: Box<[TypeSet]>,
}

impl Default for Wave {
    fn default() -> Self {
        Self::new()
    }
}

impl Wave {
    /// All-true wave.
    #[must_use]
    pub fn new() -> Self {
        Self {
            cells: vec![TypeSet::ALL; CELLS_PER_CHUNK].into_boxed_slice(),
        }
    }

    /// Number of cells.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Always false; a wave covers a whole chunk.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Options of one cell.
    #[inline]
    #[must_use]
    pub fn get(&self, index: usize) -> TypeSet {
        self.cells[index]
    }

    /// Overwrites the options of one cell.
    #[inline]
    pub fn set(&mut self, index: usize, options: TypeSet) {
        self.cells[index] = options;
    }

    /// Removes `block` from a cell unless that would leave it empty.
    ///
    /// Returns true if the cell changed.
    pub fn forbid_soft(&mut self, index: usize, block: BlockType) -> bool {
        let current = self.cells[index];
        let next = current.without(block);
        if next == current || next.is_empty() {
            return false;
        }
        self.cells[index] = next;
        true
    }

    /// Restores every cell to all-true.
    pub fn reset(&mut self) {
        self.cells.fill(TypeSet::ALL);
    }

    /// All cell sets in index order.
    #[inline]
    #[must_use]
    pub fn cells(&self) -> &[TypeSet] {
        &self.cells
    }

    /// One type per cell if every cell is collapsed.
    #[must_use]
    pub fn resolved(&self) -> Option<Box<[BlockType]>> {
        self.cells.iter().map(|set| set.single()).collect()
    }
}
