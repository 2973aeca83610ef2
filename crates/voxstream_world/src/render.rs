//! # Render Instance Pools
//!
//! One instance pool per solid block type. A pool hands out contiguous
//! indices: adding appends, removing index `k` shifts every higher index down
//! by one. Whoever tracks indices must mirror that shift exactly.
//!
//! [`VecInstancePool`] is the in-memory host. Its transforms are `Pod`, so the
//! whole pool can be uploaded as one byte slice.

use bytemuck::{Pod, Zeroable};
use voxstream_shared::{BlockType, Vec3};

use crate::error::{RenderError, RenderResult};

/// Per-instance transform.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct InstanceTransform {
    /// World-space centre of the instance.
    pub translation: Vec3,
    /// Uniform edge length.
    pub scale: f64,
}

impl InstanceTransform {
    /// Creates a transform.
    #[inline]
    #[must_use]
    pub const fn new(translation: Vec3, scale: f64) -> Self {
        Self { translation, scale }
    }
}

/// Fraction of a block each type is nudged by, so faces of different types
/// never share coordinates.
#[must_use]
pub const fn offset_fraction(block: BlockType) -> f64 {
    match block {
        BlockType::Air | BlockType::Grass => 0.0,
        BlockType::Dirt => 0.002,
        BlockType::Stone => 0.004,
        BlockType::Water => 0.006,
    }
}

/// Sub-cell render offset for `block`. Stays well inside the cell.
#[must_use]
pub fn render_offset(block: BlockType, block_size: f64) -> Vec3 {
    let f = offset_fraction(block) * block_size;
    Vec3::new(f * 0.2, f * 0.2, f)
}

/// Host of render instances for one block type.
pub trait InstancePool {
    /// Appends an instance and returns its index.
    ///
    /// # Errors
    ///
    /// [`RenderError::PoolExhausted`] when the pool is full.
    fn add_instance(&mut self, transform: InstanceTransform) -> RenderResult<usize>;

    /// Removes instance `index`; every higher index shifts down by one.
    ///
    /// # Errors
    ///
    /// [`RenderError::InvalidIndex`] if `index` is not live.
    fn remove_instance(&mut self, index: usize) -> RenderResult<InstanceTransform>;

    /// Removes several instances at once. `indices` must be sorted ascending
    /// and unique; every survivor shifts down by the number of removed indices
    /// below it. Returns how many were removed; out-of-range indices are skipped.
    fn remove_instances(&mut self, indices: &[usize]) -> usize {
        let mut removed = 0;
        for &index in indices.iter().rev() {
            if self.remove_instance(index).is_ok() {
                removed += 1;
            }
        }
        removed
    }

    /// Live instances.
    fn instance_count(&self) -> usize;

    /// Transform of a live instance.
    fn transform(&self, index: usize) -> Option<InstanceTransform>;

    /// Drops every instance.
    fn clear_instances(&mut self);
}

/// In-memory instance pool.
#[derive(Clone, Debug)]
pub struct VecInstancePool {
    transforms: Vec<InstanceTransform>,
    capacity: usize,
}

impl VecInstancePool {
    /// Creates an empty pool accepting up to `capacity` instances.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            transforms: Vec::new(),
            capacity,
        }
    }

    /// Maximum number of instances.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Live transforms in index order.
    #[must_use]
    pub fn transforms(&self) -> &[InstanceTransform] {
        &self.transforms
    }

    /// Live transforms as bytes for upload.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.transforms)
    }
}

impl InstancePool for VecInstancePool {
    fn add_instance(&mut self, transform: InstanceTransform) -> RenderResult<usize> {
        if self.transforms.len() >= self.capacity {
            return Err(RenderError::PoolExhausted {
                capacity: self.capacity,
            });
        }
        self.transforms.push(transform);
        Ok(self.transforms.len() - 1)
    }

    fn remove_instance(&mut self, index: usize) -> RenderResult<InstanceTransform> {
        if index >= self.transforms.len() {
            return Err(RenderError::InvalidIndex {
                index,
                count: self.transforms.len(),
            });
        }
        Ok(self.transforms.remove(index))
    }

    fn remove_instances(&mut self, indices: &[usize]) -> usize {
        let before = self.transforms.len();
        let mut doomed = indices.iter().copied().peekable();
        let mut position = 0;
        self.transforms.retain(|_| {
            while doomed.peek().is_some_and(|&i| i < position) {
                doomed.next();
            }
            let keep = doomed.peek() != Some(&position);
            position += 1;
            keep
        });
        before - self.transforms.len()
    }

    fn instance_count(&self) -> usize {
        self.transforms.len()
    }

    fn transform(&self, index: usize) -> Option<InstanceTransform> {
        self.transforms.get(index).copied()
    }

    fn clear_instances(&mut self) {
        self.transforms.clear();
    }
}

/// One instance pool per solid block type.
pub struct RenderPools {
    pools: [Box<dyn InstancePool>; 4],
}

impl std::fmt::Debug for RenderPools {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderPools")
            .field("counts", &self.counts())
            .finish()
    }
}

impl RenderPools {
    /// In-memory pools of the given capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self::from_pools(
            Box::new(VecInstancePool::new(capacity)),
            Box::new(VecInstancePool::new(capacity)),
            Box::new(VecInstancePool::new(capacity)),
            Box::new(VecInstancePool::new(capacity)),
        )
    }

    /// Injected pools, one per solid type.
    #[must_use]
    pub fn from_pools(
        grass: Box<dyn InstancePool>,
        dirt: Box<dyn InstancePool>,
        stone: Box<dyn InstancePool>,
        water: Box<dyn InstancePool>,
    ) -> Self {
        Self {
            pools: [grass, dirt, stone, water],
        }
    }

    const fn slot(block: BlockType) -> Option<usize> {
        match block {
            BlockType::Air => None,
            BlockType::Grass => Some(0),
            BlockType::Dirt => Some(1),
            BlockType::Stone => Some(2),
            BlockType::Water => Some(3),
        }
    }

    /// Pool rendering `block`.
    ///
    /// # Errors
    ///
    /// [`RenderError::NoPool`] for air.
    pub fn pool(&self, block: BlockType) -> RenderResult<&dyn InstancePool> {
        Self::slot(block)
            .map(|slot| self.pools[slot].as_ref())
            .ok_or(RenderError::NoPool(block))
    }

    /// Mutable pool rendering `block`.
    ///
    /// # Errors
    ///
    /// [`RenderError::NoPool`] for air.
    pub fn pool_mut(&mut self, block: BlockType) -> RenderResult<&mut (dyn InstancePool + 'static)> {
        match Self::slot(block) {
            Some(slot) => Ok(self.pools[slot].as_mut()),
            None => Err(RenderError::NoPool(block)),
        }
    }

    /// Instance count of the pool rendering `block` (0 for air).
    #[must_use]
    pub fn instance_count(&self, block: BlockType) -> usize {
        self.pool(block).map_or(0, |pool| pool.instance_count())
    }

    /// Instance counts per solid type.
    #[must_use]
    pub fn counts(&self) -> [(BlockType, usize); 4] {
        BlockType::SOLID.map(|block| (block, self.instance_count(block)))
    }

    /// Instances across all pools.
    #[must_use]
    pub fn total_instances(&self) -> usize {
        self.pools.iter().map(|pool| pool.instance_count()).sum()
    }

    /// Drops every instance in every pool.
    pub fn clear(&mut self) {
        for pool in &mut self.pools {
            pool.clear_instances();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(x: f64) -> InstanceTransform {
        InstanceTransform::new(Vec3::new(x, 0.0, 0.0), 1.0)
    }

    #[test]
    fn test_remove_shifts_indices() {
        let mut pool = VecInstancePool::new(8);
        for i in 0..5 {
            assert_eq!(pool.add_instance(t(f64::from(i))).unwrap(), i as usize);
        }
        pool.remove_instance(1).unwrap();
        assert_eq!(pool.instance_count(), 4);
        assert_eq!(pool.transform(1), Some(t(2.0)));
        assert_eq!(pool.transform(3), Some(t(4.0)));
        assert_eq!(
            pool.remove_instance(4),
            Err(RenderError::InvalidIndex { index: 4, count: 4 })
        );
    }

    #[test]
    fn test_batch_remove_matches_single_removes() {
        let mut batch = VecInstancePool::new(16);
        let mut single = VecInstancePool::new(16);
        for i in 0..10 {
            batch.add_instance(t(f64::from(i))).unwrap();
            single.add_instance(t(f64::from(i))).unwrap();
        }
        let doomed = [0, 3, 4, 9, 12];
        assert_eq!(batch.remove_instances(&doomed), 4);
        for &i in doomed.iter().rev().filter(|&&i| i < 10) {
            single.remove_instance(i).unwrap();
        }
        assert_eq!(batch.transforms(), single.transforms());
    }

    #[test]
    fn test_pool_exhaustion() {
        let mut pool = VecInstancePool::new(1);
        pool.add_instance(t(0.0)).unwrap();
        assert_eq!(
            pool.add_instance(t(1.0)),
            Err(RenderError::PoolExhausted { capacity: 1 })
        );
    }

    #[test]
    fn test_pools_per_type() {
        let mut pools = RenderPools::with_capacity(4);
        assert_eq!(pools.pool(BlockType::Air).err(), Some(RenderError::NoPool(BlockType::Air)));
        pools.pool_mut(BlockType::Stone).unwrap().add_instance(t(0.0)).unwrap();
        assert_eq!(pools.instance_count(BlockType::Stone), 1);
        assert_eq!(pools.instance_count(BlockType::Grass), 0);
        assert_eq!(pools.total_instances(), 1);
        pools.clear();
        assert_eq!(pools.total_instances(), 0);
    }

    #[test]
    fn test_offsets_stay_inside_cell() {
        for block in BlockType::ALL {
            let offset = render_offset(block, 100.0);
            assert!(offset.z.abs() < 1.0);
        }
        assert_ne!(render_offset(BlockType::Dirt, 100.0), render_offset(BlockType::Stone, 100.0));
    }

    #[test]
    fn test_transform_bytes() {
        let mut pool = VecInstancePool::new(2);
        pool.add_instance(t(1.0)).unwrap();
        assert_eq!(pool.as_bytes().len(), std::mem::size_of::<InstanceTransform>());
        assert_eq!(std::mem::size_of::<InstanceTransform>(), 32);
    }
}
