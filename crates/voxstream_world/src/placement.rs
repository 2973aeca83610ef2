//! # Block Placement
//!
//! The only writer of world records and render pools. Every operation keeps
//! the bijection between records and live pool instances:
//!
//! - a record is written only after its render handle was acquired;
//! - removing instance `k` from a pool decrements every recorded index of that
//!   type above `k`, mirroring the pool's own shift.

use voxstream_shared::{BlockType, CoordinateMapper, GridPosition};

use crate::error::{RenderError, WorldError, WorldResult};
use crate::render::{render_offset, InstanceTransform, RenderPools};
use crate::store::{BlockRecord, WorldStore};

/// Result of a successful [`BlockPlacer::place`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaceOutcome {
    /// New record.
    Placed {
        /// Acquired instance index.
        index: usize,
    },
    /// A record of another type was replaced; its handle was released.
    Replaced {
        /// Type that was there before.
        previous: BlockType,
        /// Acquired instance index.
        index: usize,
    },
    /// Same type already recorded.
    Unchanged,
}

/// Owns the world store and the render pools.
#[derive(Debug)]
pub struct BlockPlacer {
    store: WorldStore,
    pools: RenderPools,
    mapper: CoordinateMapper,
}

impl BlockPlacer {
    /// Creates a placer over empty state.
    #[must_use]
    pub fn new(pools: RenderPools, mapper: CoordinateMapper) -> Self {
        Self {
            store: WorldStore::new(),
            pools,
            mapper,
        }
    }

    /// World records and processed set.
    #[inline]
    #[must_use]
    pub const fn store(&self) -> &WorldStore {
        &self.store
    }

    /// Render pools.
    #[inline]
    #[must_use]
    pub const fn pools(&self) -> &RenderPools {
        &self.pools
    }

    /// Coordinate mapper used for render transforms.
    #[inline]
    #[must_use]
    pub const fn mapper(&self) -> &CoordinateMapper {
        &self.mapper
    }

    /// Type recorded at `pos`, air if none.
    #[inline]
    #[must_use]
    pub fn block_at(&self, pos: GridPosition) -> BlockType {
        self.store.block_at(pos)
    }

    /// Render transform for `block` at `pos`: cell centre plus the type offset.
    #[must_use]
    pub fn render_transform(&self, pos: GridPosition, block: BlockType) -> InstanceTransform {
        let size = self.mapper.block_size();
        InstanceTransform::new(self.mapper.grid_to_world(pos) + render_offset(block, size), size)
    }

    /// Places `block` at `pos` as an explicit edit.
    ///
    /// # Errors
    ///
    /// - [`WorldError::NotPlaceable`] for air
    /// - [`WorldError::HandleAcquisition`] if the pool refused; nothing changed
    pub fn place(&mut self, pos: GridPosition, block: BlockType) -> WorldResult<PlaceOutcome> {
        if block.is_air() {
            return Err(WorldError::NotPlaceable { pos, block });
        }

        let previous = self.store.record(pos).map(|record| record.block);
        if previous == Some(block) {
            self.store.mark_processed(pos);
            return Ok(PlaceOutcome::Unchanged);
        }

        // Different pool from any previous type, so acquiring first leaves the
        // old record untouched on failure.
        let index = self.acquire(pos, block)?;
        if previous.is_some() {
            self.release(pos);
        }
        self.write(pos, block, index, false);

        Ok(match previous {
            Some(previous) => PlaceOutcome::Replaced { previous, index },
            None => PlaceOutcome::Placed { index },
        })
    }

    /// Commits a generated decision. The position must still be free.
    ///
    /// # Errors
    ///
    /// - [`WorldError::RaceAtCommit`] if a record appeared since enumeration
    /// - [`WorldError::NotPlaceable`] for air
    /// - [`WorldError::HandleAcquisition`] if the pool refused
    pub(crate) fn commit_generated(&mut self, pos: GridPosition, block: BlockType) -> WorldResult<usize> {
        if let Some(existing) = self.store.record(pos) {
            return Err(WorldError::RaceAtCommit {
                pos,
                existing: existing.block,
            });
        }
        if block.is_air() {
            return Err(WorldError::NotPlaceable { pos, block });
        }
        let index = self.acquire(pos, block)?;
        self.write(pos, block, index, true);
        Ok(index)
    }

    /// Records `pos` as decided air.
    ///
    /// # Errors
    ///
    /// [`WorldError::RaceAtCommit`] if a record exists there.
    pub fn mark_air(&mut self, pos: GridPosition) -> WorldResult<()> {
        if let Some(existing) = self.store.record(pos) {
            return Err(WorldError::RaceAtCommit {
                pos,
                existing: existing.block,
            });
        }
        self.store.mark_processed(pos);
        Ok(())
    }

    /// Removes the record at `pos` and its processed entry.
    pub fn remove(&mut self, pos: GridPosition) -> Option<BlockRecord> {
        self.store.unmark_processed(pos);
        self.release(pos)
    }

    /// Leaves `pos` with no record and no processed entry. Returns true if
    /// anything was there.
    pub fn force_clean(&mut self, pos: GridPosition) -> bool {
        let was_processed = self.store.unmark_processed(pos);
        self.release(pos).is_some() || was_processed
    }

    /// Removes many positions at once: one batched pool removal per type, then
    /// one index shift per type. Returns the number of records removed.
    pub fn evict_batch(&mut self, positions: &[GridPosition]) -> usize {
        let mut doomed: [Vec<usize>; BlockType::COUNT] = Default::default();
        let mut removed = 0;

        for &pos in positions {
            self.store.unmark_processed(pos);
            if let Some(record) = self.store.remove_record(pos) {
                removed += 1;
                if let Some(index) = record.instance {
                    doomed[record.block.index()].push(index);
                }
            }
        }

        for block in BlockType::SOLID {
            let indices = &mut doomed[block.index()];
            if indices.is_empty() {
                continue;
            }
            indices.sort_unstable();
            indices.dedup();

            let count = self.pools.instance_count(block);
            let live = indices.partition_point(|&index| index < count);
            if live < indices.len() {
                tracing::warn!(
                    %block,
                    stale = indices.len() - live,
                    count,
                    "evicted records held out-of-range instance indices"
                );
                indices.truncate(live);
            }

            if let Ok(pool) = self.pools.pool_mut(block) {
                pool.remove_instances(indices);
            }

            for (_, record) in self.store.records_mut() {
                if record.block != block {
                    continue;
                }
                if let Some(index) = record.instance.as_mut() {
                    let shift = indices.partition_point(|&gone| gone < *index);
                    *index -= shift;
                }
            }
        }

        removed
    }

    /// Re-adds every record of `block` to a freshly cleared pool, in position
    /// order, with contiguous indices. Records the pool refuses are dropped
    /// along with their processed entry. Returns the rebuilt instance count.
    ///
    /// # Errors
    ///
    /// [`WorldError::Render`] for air.
    pub fn rebuild_pool(&mut self, block: BlockType) -> WorldResult<usize> {
        self.pools.pool_mut(block)?.clear_instances();

        let mut positions: Vec<GridPosition> = self
            .store
            .records()
            .filter(|(_, record)| record.block == block)
            .map(|(pos, _)| pos)
            .collect();
        positions.sort_unstable();

        let mut rebuilt = 0;
        for pos in positions {
            let transform = self.render_transform(pos, block);
            match self.pools.pool_mut(block)?.add_instance(transform) {
                Ok(index) => {
                    if let Some(record) = self.store.record_mut(pos) {
                        record.instance = Some(index);
                    }
                    rebuilt += 1;
                }
                Err(error) => {
                    tracing::warn!(%pos, %block, %error, "dropping record during pool rebuild");
                    self.store.remove_record(pos);
                    self.store.unmark_processed(pos);
                }
            }
        }

        tracing::debug!(%block, rebuilt, "rebuilt render pool");
        Ok(rebuilt)
    }

    /// Drops every record, processed entry and pool instance.
    pub fn clear(&mut self) {
        self.store.clear();
        self.pools.clear();
    }

    /// Drops the record and processed entry without touching pools. The
    /// caller must rebuild the record's pool afterwards.
    pub(crate) fn discard(&mut self, pos: GridPosition) -> Option<BlockRecord> {
        self.store.unmark_processed(pos);
        self.store.remove_record(pos)
    }

    /// Forgets that `pos` was decided, keeping any record.
    pub(crate) fn unmark_processed(&mut self, pos: GridPosition) -> bool {
        self.store.unmark_processed(pos)
    }

    fn acquire(&mut self, pos: GridPosition, block: BlockType) -> WorldResult<usize> {
        let transform = self.render_transform(pos, block);
        self.pools
            .pool_mut(block)
            .and_then(|pool| pool.add_instance(transform))
            .map_err(|source| WorldError::HandleAcquisition { pos, block, source })
    }

    fn write(&mut self, pos: GridPosition, block: BlockType, index: usize, generated: bool) {
        self.store.insert_record(
            pos,
            BlockRecord {
                block,
                instance: Some(index),
                generated,
            },
        );
        self.store.mark_processed(pos);
    }

    /// Drops the record at `pos`, releases its handle and shifts the indices
    /// above it. Leaves the processed set alone.
    fn release(&mut self, pos: GridPosition) -> Option<BlockRecord> {
        let record = self.store.remove_record(pos)?;
        let Some(index) = record.instance else {
            return Some(record);
        };

        let released = self
            .pools
            .pool_mut(record.block)
            .and_then(|pool| pool.remove_instance(index));
        match released {
            Ok(_) => {
                for (_, other) in self.store.records_mut() {
                    if other.block != record.block {
                        continue;
                    }
                    if let Some(other_index) = other.instance.as_mut() {
                        if *other_index > index {
                            *other_index -= 1;
                        }
                    }
                }
            }
            Err(RenderError::InvalidIndex { count, .. }) => {
                tracing::warn!(%pos, block = %record.block, index, count, "stale instance index on removal");
            }
            Err(error) => {
                tracing::warn!(%pos, block = %record.block, %error, "could not release instance");
            }
        }

        Some(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn placer(capacity: usize) -> BlockPlacer {
        BlockPlacer::new(RenderPools::with_capacity(capacity), CoordinateMapper::default())
    }

    fn assert_bijection(placer: &BlockPlacer) {
        for block in BlockType::SOLID {
            let mut indices: Vec<usize> = placer
                .store()
                .records()
                .filter(|(_, record)| record.block == block)
                .map(|(_, record)| record.instance.unwrap())
                .collect();
            indices.sort_unstable();
            let expected: Vec<usize> = (0..placer.pools().instance_count(block)).collect();
            assert_eq!(indices, expected, "{block} pool out of sync");
        }
    }

    #[test]
    fn test_place_rejects_air() {
        let mut placer = placer(4);
        let pos = GridPosition::ORIGIN;
        assert!(matches!(
            placer.place(pos, BlockType::Air),
            Err(WorldError::NotPlaceable { .. })
        ));
        assert!(!placer.store().is_processed(pos));
    }

    #[test]
    fn test_place_replace_and_unchanged() {
        let mut placer = placer(4);
        let pos = GridPosition::new(2, 3, 4);
        assert_eq!(placer.place(pos, BlockType::Stone).unwrap(), PlaceOutcome::Placed { index: 0 });
        assert_eq!(placer.place(pos, BlockType::Stone).unwrap(), PlaceOutcome::Unchanged);
        assert_eq!(
            placer.place(pos, BlockType::Dirt).unwrap(),
            PlaceOutcome::Replaced {
                previous: BlockType::Stone,
                index: 0
            }
        );
        assert_eq!(placer.pools().instance_count(BlockType::Stone), 0);
        assert_eq!(placer.pools().instance_count(BlockType::Dirt), 1);
        assert_eq!(placer.block_at(pos), BlockType::Dirt);
        assert_bijection(&placer);
    }

    #[test]
    fn test_failed_acquisition_writes_nothing() {
        let mut placer = placer(1);
        placer.place(GridPosition::new(0, 0, 0), BlockType::Grass).unwrap();
        let pos = GridPosition::new(1, 0, 0);
        assert!(matches!(
            placer.place(pos, BlockType::Grass),
            Err(WorldError::HandleAcquisition { .. })
        ));
        assert!(!placer.store().is_occupied(pos));
        assert!(!placer.store().is_processed(pos));
    }

    #[test]
    fn test_remove_shifts_higher_indices() {
        let mut placer = placer(16);
        let positions: Vec<GridPosition> = (0..5).map(|x| GridPosition::new(x, 0, 0)).collect();
        for &pos in &positions {
            placer.place(pos, BlockType::Stone).unwrap();
        }
        placer.place(GridPosition::new(0, 1, 0), BlockType::Dirt).unwrap();

        let removed = placer.remove(positions[1]).unwrap();
        assert_eq!(removed.instance, Some(1));
        assert_eq!(placer.store().record(positions[0]).unwrap().instance, Some(0));
        assert_eq!(placer.store().record(positions[2]).unwrap().instance, Some(1));
        assert_eq!(placer.store().record(positions[4]).unwrap().instance, Some(3));
        assert_eq!(
            placer.store().record(GridPosition::new(0, 1, 0)).unwrap().instance,
            Some(0)
        );
        let moved = placer.pools().pool(BlockType::Stone).unwrap().transform(1).unwrap();
        assert_eq!(placer.mapper().world_to_grid(moved.translation), positions[2]);
        assert_bijection(&placer);
    }

    #[test]
    fn test_evict_batch_matches_bijection() {
        let mut placer = placer(64);
        for x in 0..10 {
            let block = if x % 3 == 0 { BlockType::Dirt } else { BlockType::Stone };
            placer.place(GridPosition::new(x, 0, 0), block).unwrap();
        }
        let doomed: Vec<GridPosition> = [0, 2, 3, 7].iter().map(|&x| GridPosition::new(x, 0, 0)).collect();
        assert_eq!(placer.evict_batch(&doomed), 4);
        assert_eq!(placer.store().record_count(), 6);
        for pos in &doomed {
            assert!(!placer.store().is_processed(*pos));
        }
        assert_bijection(&placer);

        for (pos, record) in placer.store().records() {
            let transform = placer
                .pools()
                .pool(record.block)
                .unwrap()
                .transform(record.instance.unwrap())
                .unwrap();
            assert_eq!(placer.mapper().world_to_grid(transform.translation), pos);
        }
    }

    #[test]
    fn test_commit_generated_detects_race() {
        let mut placer = placer(4);
        let pos = GridPosition::new(5, 5, 5);
        placer.place(pos, BlockType::Water).unwrap();
        assert!(matches!(
            placer.commit_generated(pos, BlockType::Stone),
            Err(WorldError::RaceAtCommit {
                existing: BlockType::Water,
                ..
            })
        ));
        assert!(matches!(placer.mark_air(pos), Err(WorldError::RaceAtCommit { .. })));
    }

    #[test]
    fn test_rebuild_pool_compacts_indices() {
        let mut placer = placer(8);
        for x in 0..4 {
            placer.place(GridPosition::new(x, 0, 0), BlockType::Grass).unwrap();
        }
        placer.discard(GridPosition::new(1, 0, 0));
        assert_eq!(placer.pools().instance_count(BlockType::Grass), 4);
        assert_eq!(placer.rebuild_pool(BlockType::Grass).unwrap(), 3);
        assert_bijection(&placer);
        assert!(placer.rebuild_pool(BlockType::Air).is_err());
    }

    #[test]
    fn test_force_clean() {
        let mut placer = placer(4);
        let pos = GridPosition::new(0, 0, 1);
        assert!(!placer.force_clean(pos));
        placer.mark_air(pos).unwrap();
        assert!(placer.force_clean(pos));
        placer.place(pos, BlockType::Stone).unwrap();
        assert!(placer.force_clean(pos));
        assert_eq!(placer.pools().total_instances(), 0);
        assert_eq!(placer.store().processed_count(), 0);
    }
}
