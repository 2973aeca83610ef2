//! # Structural Validation
//!
//! Cross-checks records, the processed set and the render pools. Findings are
//! reported, logged at error level and fixed by [`repair`]; they are never
//! raised as errors.
//!
//! ## Checks
//!
//! | Issue | Meaning |
//! |-------|---------|
//! | duplicate handle | two records share one (type, index) handle |
//! | pool mismatch | a pool holds more or fewer instances than records |
//! | orphan | processed position with no record whose expected type is solid |
//! | untracked | record missing from the processed set |
//! | stale index | record without a live instance sitting in its own cell |

use std::collections::{BTreeMap, BTreeSet};

use voxstream_shared::{BlockType, GridPosition};

use crate::error::WorldResult;
use crate::placement::BlockPlacer;

/// Two or more records sharing one render handle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DuplicateHandle {
    /// Pool type.
    pub block: BlockType,
    /// Shared index.
    pub index: usize,
    /// Records claiming it, sorted.
    pub positions: Vec<GridPosition>,
}

/// Pool whose instance count differs from its record count.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PoolMismatch {
    /// Pool type.
    pub block: BlockType,
    /// Records of this type holding an index.
    pub records: usize,
    /// Live instances in the pool.
    pub instances: usize,
}

/// What is wrong with a record's index.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StaleReason {
    /// Record holds no index.
    Missing,
    /// Index past the end of the pool.
    OutOfRange {
        /// Recorded index.
        index: usize,
        /// Live instances.
        count: usize,
    },
    /// Instance transform lies in another cell.
    Misplaced {
        /// Recorded index.
        index: usize,
        /// Cell the transform maps to.
        found: GridPosition,
    },
}

/// Record with an unusable index.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StaleIndex {
    /// Record position.
    pub pos: GridPosition,
    /// Record type.
    pub block: BlockType,
    /// Problem found.
    pub reason: StaleReason,
}

/// Result of [`validate`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValidationReport {
    /// Shared handles.
    pub duplicates: Vec<DuplicateHandle>,
    /// Pools out of step with their records.
    pub pool_mismatches: Vec<PoolMismatch>,
    /// Processed positions missing an expected record.
    pub orphans: Vec<GridPosition>,
    /// Records missing from the processed set.
    pub untracked: Vec<GridPosition>,
    /// Records with unusable indices.
    pub stale: Vec<StaleIndex>,
}

impl ValidationReport {
    /// Returns true if nothing was found.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.issue_count() == 0
    }

    /// Total findings.
    #[must_use]
    pub fn issue_count(&self) -> usize {
        self.duplicates.len()
            + self.pool_mismatches.len()
            + self.orphans.len()
            + self.untracked.len()
            + self.stale.len()
    }

    /// Every position named by a finding, sorted and unique.
    #[must_use]
    pub fn flagged_positions(&self) -> Vec<GridPosition> {
        let mut flagged: BTreeSet<GridPosition> = BTreeSet::new();
        for duplicate in &self.duplicates {
            flagged.extend(duplicate.positions.iter().copied());
        }
        flagged.extend(self.orphans.iter().copied());
        flagged.extend(self.untracked.iter().copied());
        flagged.extend(self.stale.iter().map(|stale| stale.pos));
        flagged.into_iter().collect()
    }

    /// Pools that need a rebuild.
    #[must_use]
    pub fn affected_pools(&self) -> Vec<BlockType> {
        let mut pools: BTreeSet<u8> = BTreeSet::new();
        pools.extend(self.duplicates.iter().map(|d| d.block as u8));
        pools.extend(self.pool_mismatches.iter().map(|m| m.block as u8));
        pools.extend(self.stale.iter().map(|s| s.block as u8));
        pools
            .into_iter()
            .filter_map(|index| BlockType::from_index(usize::from(index)))
            .collect()
    }
}

/// Result of [`repair`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RepairSummary {
    /// Records dropped.
    pub records_removed: usize,
    /// Positions returned to undecided.
    pub positions_reset: usize,
    /// Pools rebuilt.
    pub pools_rebuilt: usize,
}

/// Checks `placer` for structural problems. `expected` gives the type the
/// active decider assigns to a position.
pub fn validate(placer: &BlockPlacer, mut expected: impl FnMut(GridPosition) -> BlockType) -> ValidationReport {
    let store = placer.store();
    let pools = placer.pools();
    let mapper = placer.mapper();
    let mut report = ValidationReport::default();

    let mut handles: BTreeMap<(u8, usize), Vec<GridPosition>> = BTreeMap::new();
    let mut indexed = [0usize; BlockType::COUNT];

    for (pos, record) in store.records() {
        if !store.is_processed(pos) {
            report.untracked.push(pos);
        }

        let Some(index) = record.instance else {
            report.stale.push(StaleIndex {
                pos,
                block: record.block,
                reason: StaleReason::Missing,
            });
            continue;
        };
        indexed[record.block.index()] += 1;
        handles.entry((record.block as u8, index)).or_default().push(pos);

        let count = pools.instance_count(record.block);
        let transform = pools.pool(record.block).ok().and_then(|pool| pool.transform(index));
        let reason = match transform {
            None => Some(StaleReason::OutOfRange { index, count }),
            Some(transform) => {
                let found = mapper.world_to_grid(transform.translation);
                (found != pos).then_some(StaleReason::Misplaced { index, found })
            }
        };
        if let Some(reason) = reason {
            report.stale.push(StaleIndex {
                pos,
                block: record.block,
                reason,
            });
        }
    }

    for ((block, index), mut positions) in handles {
        if positions.len() > 1 {
            positions.sort_unstable();
            report.duplicates.push(DuplicateHandle {
                block: BlockType::from_index(usize::from(block)).unwrap_or(BlockType::Air),
                index,
                positions,
            });
        }
    }

    for block in BlockType::SOLID {
        let records = indexed[block.index()];
        let instances = pools.instance_count(block);
        if records != instances {
            report.pool_mismatches.push(PoolMismatch {
                block,
                records,
                instances,
            });
        }
    }

    let mut unrecorded: Vec<GridPosition> = store.processed().filter(|pos| !store.is_occupied(*pos)).collect();
    unrecorded.sort_unstable();
    report.orphans = unrecorded.into_iter().filter(|pos| !expected(*pos).is_air()).collect();

    report.untracked.sort_unstable();
    report.stale.sort_unstable_by_key(|stale| stale.pos);

    log_findings(&report);
    report
}

fn log_findings(report: &ValidationReport) {
    if report.is_clean() {
        tracing::debug!("world validation clean");
        return;
    }
    for duplicate in &report.duplicates {
        tracing::error!(
            block = %duplicate.block,
            index = duplicate.index,
            occupants = duplicate.positions.len(),
            "render handle shared by several records"
        );
    }
    for mismatch in &report.pool_mismatches {
        tracing::error!(
            block = %mismatch.block,
            records = mismatch.records,
            instances = mismatch.instances,
            "render pool out of step with records"
        );
    }
    if !report.orphans.is_empty() {
        tracing::error!(count = report.orphans.len(), first = %report.orphans[0], "processed positions missing their block");
    }
    if !report.untracked.is_empty() {
        tracing::error!(count = report.untracked.len(), first = %report.untracked[0], "records missing from the processed set");
    }
    for stale in &report.stale {
        tracing::error!(pos = %stale.pos, block = %stale.block, reason = ?stale.reason, "stale instance index");
    }
}

/// Fixes everything `report` found: flagged positions lose their record and
/// processed entry so the next pass regenerates them, then affected pools are
/// rebuilt from the surviving records.
///
/// # Errors
///
/// Only if a pool cannot be addressed during rebuild.
pub fn repair(placer: &mut BlockPlacer, report: &ValidationReport) -> WorldResult<RepairSummary> {
    let mut summary = RepairSummary::default();
    let mut pools = report.affected_pools();

    for pos in report.flagged_positions() {
        if let Some(record) = placer.discard(pos) {
            summary.records_removed += 1;
            if !pools.contains(&record.block) {
                pools.push(record.block);
            }
        } else {
            placer.unmark_processed(pos);
        }
        summary.positions_reset += 1;
    }

    for block in pools {
        placer.rebuild_pool(block)?;
        summary.pools_rebuilt += 1;
    }

    tracing::info!(
        records_removed = summary.records_removed,
        positions_reset = summary.positions_reset,
        pools_rebuilt = summary.pools_rebuilt,
        "world repaired"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RenderResult;
    use crate::render::{InstancePool, InstanceTransform, RenderPools, VecInstancePool};
    use voxstream_shared::CoordinateMapper;

    fn placer() -> BlockPlacer {
        BlockPlacer::new(RenderPools::with_capacity(64), CoordinateMapper::default())
    }

    #[test]
    fn test_clean_world() {
        let mut placer = placer();
        for x in 0..4 {
            placer.place(GridPosition::new(x, 0, 0), BlockType::Stone).unwrap();
        }
        placer.mark_air(GridPosition::new(0, 0, 5)).unwrap();
        let report = validate(&placer, |_| BlockType::Air);
        assert!(report.is_clean(), "{report:?}");
    }

    #[test]
    fn test_orphans_follow_expected_type() {
        let mut placer = placer();
        let solid = GridPosition::new(0, 0, -3);
        let air = GridPosition::new(0, 0, 20);
        placer.mark_air(solid).unwrap();
        placer.mark_air(air).unwrap();
        let report = validate(&placer, |pos| if pos.z < 0 { BlockType::Stone } else { BlockType::Air });
        assert_eq!(report.orphans, vec![solid]);

        let summary = repair(&mut placer, &report).unwrap();
        assert_eq!(summary.positions_reset, 1);
        assert!(!placer.store().is_processed(solid));
        assert!(placer.store().is_processed(air));
    }

    #[test]
    fn test_untracked_record() {
        let mut placer = placer();
        let pos = GridPosition::new(3, 3, 3);
        placer.place(pos, BlockType::Water).unwrap();
        placer.unmark_processed(pos);
        let report = validate(&placer, |_| BlockType::Air);
        assert_eq!(report.untracked, vec![pos]);

        repair(&mut placer, &report).unwrap();
        assert!(!placer.store().is_occupied(pos));
        assert_eq!(placer.pools().total_instances(), 0);
        assert!(validate(&placer, |_| BlockType::Air).is_clean());
    }

    #[test]
    fn test_surplus_instances_and_stale_index() {
        let mut placer = placer();
        let kept = GridPosition::new(0, 0, 0);
        let lost = GridPosition::new(1, 0, 0);
        placer.place(kept, BlockType::Dirt).unwrap();
        placer.place(lost, BlockType::Dirt).unwrap();
        placer.discard(lost);
        placer.place(GridPosition::new(9, 9, 9), BlockType::Grass).unwrap();

        let report = validate(&placer, |_| BlockType::Air);
        assert_eq!(
            report.pool_mismatches,
            vec![PoolMismatch {
                block: BlockType::Dirt,
                records: 1,
                instances: 2
            }]
        );
        assert!(report.stale.is_empty());

        let summary = repair(&mut placer, &report).unwrap();
        assert_eq!(summary.pools_rebuilt, 1);
        assert_eq!(placer.pools().instance_count(BlockType::Dirt), 1);
        assert!(validate(&placer, |_| BlockType::Air).is_clean());
    }

    /// Hands out index 0 for every instance.
    struct ZeroIndexPool(VecInstancePool);

    impl InstancePool for ZeroIndexPool {
        fn add_instance(&mut self, transform: InstanceTransform) -> RenderResult<usize> {
            self.0.add_instance(transform).map(|_| 0)
        }
        fn remove_instance(&mut self, index: usize) -> RenderResult<InstanceTransform> {
            self.0.remove_instance(index)
        }
        fn instance_count(&self) -> usize {
            self.0.instance_count()
        }
        fn transform(&self, index: usize) -> Option<InstanceTransform> {
            self.0.transform(index)
        }
        fn clear_instances(&mut self) {
            self.0.clear_instances();
        }
    }

    #[test]
    fn test_shared_handle_and_misplaced_transform() {
        let pools = RenderPools::from_pools(
            Box::new(VecInstancePool::new(8)),
            Box::new(VecInstancePool::new(8)),
            Box::new(ZeroIndexPool(VecInstancePool::new(8))),
            Box::new(VecInstancePool::new(8)),
        );
        let mut placer = BlockPlacer::new(pools, CoordinateMapper::default());
        let first = GridPosition::new(0, 0, 0);
        let second = GridPosition::new(1, 0, 0);
        placer.place(first, BlockType::Stone).unwrap();
        placer.place(second, BlockType::Stone).unwrap();

        let report = validate(&placer, |_| BlockType::Air);
        assert_eq!(
            report.duplicates,
            vec![DuplicateHandle {
                block: BlockType::Stone,
                index: 0,
                positions: vec![first, second],
            }]
        );
        assert_eq!(report.stale.len(), 1);
        assert_eq!(report.stale[0].pos, second);
        assert_eq!(
            report.stale[0].reason,
            StaleReason::Misplaced { index: 0, found: first }
        );
        assert!(report.pool_mismatches.is_empty());

        let summary = repair(&mut placer, &report).unwrap();
        assert_eq!(summary.records_removed, 2);
        assert_eq!(placer.pools().instance_count(BlockType::Stone), 0);
        assert!(validate(&placer, |_| BlockType::Air).is_clean());
    }
}
