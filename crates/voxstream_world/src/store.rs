//! # World Store
//!
//! The authoritative sparse map from grid position to block record, plus the
//! processed set (every decided position, air included).
//!
//! ## Invariants
//!
//! - Every recorded position is processed.
//! - A processed position without a record resolved to air.
//!
//! Only placement mutates records; everything else reads.

use std::collections::{HashMap, HashSet};

use voxstream_shared::{BlockType, GridPosition};

/// One placed block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockRecord {
    /// Block type. Never air.
    pub block: BlockType,
    /// Index into the type's render pool.
    pub instance: Option<usize>,
    /// Placed by the generator rather than an explicit edit.
    pub generated: bool,
}

/// Sparse block map and processed set.
#[derive(Clone, Debug, Default)]
pub struct WorldStore {
    records: HashMap<GridPosition, BlockRecord>,
    processed: HashSet<GridPosition>,
}

impl WorldStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record at `pos`.
    #[inline]
    #[must_use]
    pub fn record(&self, pos: GridPosition) -> Option<&BlockRecord> {
        self.records.get(&pos)
    }

    /// Type at `pos`, air if nothing is recorded.
    #[inline]
    #[must_use]
    pub fn block_at(&self, pos: GridPosition) -> BlockType {
        self.records.get(&pos).map_or(BlockType::Air, |r| r.block)
    }

    /// Returns true if a record exists at `pos`.
    #[inline]
    #[must_use]
    pub fn is_occupied(&self, pos: GridPosition) -> bool {
        self.records.contains_key(&pos)
    }

    /// Returns true if `pos` has been decided.
    #[inline]
    #[must_use]
    pub fn is_processed(&self, pos: GridPosition) -> bool {
        self.processed.contains(&pos)
    }

    /// Number of records.
    #[inline]
    #[must_use]
    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    /// Number of processed positions.
    #[inline]
    #[must_use]
    pub fn processed_count(&self) -> usize {
        self.processed.len()
    }

    /// Records of one type.
    #[must_use]
    pub fn count_of(&self, block: BlockType) -> usize {
        self.records.values().filter(|r| r.block == block).count()
    }

    /// Iterates all records.
    pub fn records(&self) -> impl Iterator<Item = (GridPosition, &BlockRecord)> + '_ {
        self.records.iter().map(|(pos, record)| (*pos, record))
    }

    /// Iterates all processed positions.
    pub fn processed(&self) -> impl Iterator<Item = GridPosition> + '_ {
        self.processed.iter().copied()
    }

    /// Recorded or processed positions farther than `radius` from `center`.
    #[must_use]
    pub fn positions_beyond(&self, center: GridPosition, radius: i32) -> Vec<GridPosition> {
        let mut far: Vec<GridPosition> = self
            .processed
            .iter()
            .copied()
            .filter(|pos| !pos.within_radius(center, radius))
            .collect();
        far.extend(
            self.records
                .keys()
                .copied()
                .filter(|pos| !pos.within_radius(center, radius) && !self.processed.contains(pos)),
        );
        far
    }

    /// Marks `pos` decided.
    pub fn mark_processed(&mut self, pos: GridPosition) -> bool {
        self.processed.insert(pos)
    }

    /// Forgets that `pos` was decided.
    pub fn unmark_processed(&mut self, pos: GridPosition) -> bool {
        self.processed.remove(&pos)
    }

    pub(crate) fn insert_record(&mut self, pos: GridPosition, record: BlockRecord) -> Option<BlockRecord> {
        self.records.insert(pos, record)
    }

    pub(crate) fn remove_record(&mut self, pos: GridPosition) -> Option<BlockRecord> {
        self.records.remove(&pos)
    }

    pub(crate) fn records_mut(&mut self) -> impl Iterator<Item = (&GridPosition, &mut BlockRecord)> + '_ {
        self.records.iter_mut()
    }

    pub(crate) fn record_mut(&mut self, pos: GridPosition) -> Option<&mut BlockRecord> {
        self.records.get_mut(&pos)
    }

    /// Drops every record and processed entry.
    pub(crate) fn clear(&mut self) {
        self.records.clear();
        self.processed.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(block: BlockType, index: usize) -> BlockRecord {
        BlockRecord {
            block,
            instance: Some(index),
            generated: true,
        }
    }

    #[test]
    fn test_block_at_defaults_to_air() {
        let mut store = WorldStore::new();
        let pos = GridPosition::new(1, 2, 3);
        assert_eq!(store.block_at(pos), BlockType::Air);
        store.insert_record(pos, record(BlockType::Stone, 0));
        assert_eq!(store.block_at(pos), BlockType::Stone);
        assert!(store.is_occupied(pos));
        assert!(!store.is_processed(pos));
    }

    #[test]
    fn test_positions_beyond_covers_records_and_air() {
        let mut store = WorldStore::new();
        let near = GridPosition::new(1, 0, 0);
        let far_air = GridPosition::new(10, 0, 0);
        let far_block = GridPosition::new(0, -10, 0);
        let untracked = GridPosition::new(0, 0, 10);

        store.mark_processed(near);
        store.mark_processed(far_air);
        store.mark_processed(far_block);
        store.insert_record(far_block, record(BlockType::Dirt, 0));
        store.insert_record(untracked, record(BlockType::Dirt, 1));

        let mut far = store.positions_beyond(GridPosition::ORIGIN, 5);
        far.sort();
        assert_eq!(far, vec![far_block, untracked, far_air]);
    }
}
