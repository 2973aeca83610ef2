//! Per-position block decisions.
//!
//! Simple mode asks the height field directly. Hybrid mode solves the chunk
//! containing the position (seeding, constraint solver, fallback) and reads the
//! cell out of it; solved chunks are kept in a small FIFO cache because a pass
//! decides many neighbouring positions from the same chunk.

use std::collections::{HashMap, VecDeque};

use serde::{Deserialize, Serialize};
use voxstream_procedural::{ChunkGenerator, GenerationMethod, LocalCoord};
use voxstream_shared::{BlockType, ChunkCoord, GridPosition};

/// How block types are decided.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationMode {
    /// Height-field classification.
    #[default]
    Simple,
    /// Constraint solver seeded by the height field, with fallback.
    Hybrid,
}

/// Counters over hybrid chunk generation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DeciderStats {
    /// Chunks the solver collapsed.
    pub solved: u64,
    /// Chunks resolved by the fallback fill.
    pub fallback: u64,
    /// Cache hits.
    pub cache_hits: u64,
}

/// Decides block types for single positions.
#[derive(Debug)]
pub struct BlockDecider {
    mode: GenerationMode,
    generator: ChunkGenerator,
    cache: HashMap<ChunkCoord, Box<[BlockType]>>,
    order: VecDeque<ChunkCoord>,
    capacity: usize,
    stats: DeciderStats,
}

impl BlockDecider {
    /// Creates a decider keeping up to `cache_capacity` solved chunks.
    #[must_use]
    pub fn new(mode: GenerationMode, generator: ChunkGenerator, cache_capacity: usize) -> Self {
        Self {
            mode,
            generator,
            cache: HashMap::new(),
            order: VecDeque::new(),
            capacity: cache_capacity.max(1),
            stats: DeciderStats::default(),
        }
    }

    /// Active mode.
    #[inline]
    #[must_use]
    pub const fn mode(&self) -> GenerationMode {
        self.mode
    }

    /// Switches mode and drops cached chunks.
    pub fn set_mode(&mut self, mode: GenerationMode) {
        self.mode = mode;
        self.cache.clear();
        self.order.clear();
    }

    /// Chunk generator behind hybrid decisions.
    #[inline]
    #[must_use]
    pub const fn generator(&self) -> &ChunkGenerator {
        &self.generator
    }

    /// Hybrid generation counters.
    #[inline]
    #[must_use]
    pub const fn stats(&self) -> DeciderStats {
        self.stats
    }

    /// Decides the type at `pos` under the active mode.
    pub fn decide(&mut self, pos: GridPosition) -> BlockType {
        match self.mode {
            GenerationMode::Simple => self.generator.synthesizer().classify(pos),
            GenerationMode::Hybrid => self.decide_hybrid(pos),
        }
    }

    fn decide_hybrid(&mut self, pos: GridPosition) -> BlockType {
        let coord = ChunkCoord::from_grid(pos);
        let Some(index) = LocalCoord::from_grid(coord, pos).map(LocalCoord::index) else {
            return self.generator.synthesizer().classify(pos);
        };

        if let Some(cells) = self.cache.get(&coord) {
            self.stats.cache_hits += 1;
            return cells.get(index).copied().unwrap_or(BlockType::Air);
        }

        let cells: Box<[BlockType]> = match self.generator.generate(coord) {
            Ok((chunk, report)) => {
                match report.method {
                    GenerationMethod::Solver => self.stats.solved += 1,
                    GenerationMethod::Fallback => self.stats.fallback += 1,
                }
                match chunk.blocks() {
                    Ok(blocks) => blocks.into(),
                    Err(error) => {
                        tracing::warn!(%coord, %error, "generated chunk has no cells");
                        return self.generator.synthesizer().classify(pos);
                    }
                }
            }
            Err(error) => {
                tracing::warn!(%coord, %error, "chunk generation failed, classifying directly");
                return self.generator.synthesizer().classify(pos);
            }
        };

        let block = cells.get(index).copied().unwrap_or(BlockType::Air);
        if self.order.len() >= self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.cache.remove(&oldest);
            }
        }
        self.order.push_back(coord);
        self.cache.insert(coord, cells);
        block
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use voxstream_procedural::{SolverConfig, TerrainParams, WorldSeed};

    fn generator() -> ChunkGenerator {
        ChunkGenerator::new(WorldSeed::new(11), TerrainParams::default(), SolverConfig::default())
    }

    #[test]
    fn test_simple_mode_matches_classifier() {
        let mut decider = BlockDecider::new(GenerationMode::Simple, generator(), 4);
        for x in -5..5 {
            for z in -8..=24 {
                let pos = GridPosition::new(x, 3, z);
                assert_eq!(decider.decide(pos), decider.generator().synthesizer().classify(pos));
            }
        }
    }

    #[test]
    fn test_hybrid_mode_reads_generated_chunk() {
        let mut decider = BlockDecider::new(GenerationMode::Hybrid, generator(), 2);
        let coord = ChunkCoord::new(1, -1, 0);
        let (chunk, _) = decider.generator().generate(coord).unwrap();
        for (pos, block) in chunk.iter_cells().unwrap() {
            assert_eq!(decider.decide(pos), block);
        }
        assert!(decider.stats().cache_hits > 0);
        assert_eq!(decider.stats().solved + decider.stats().fallback, 1);
    }

    #[test]
    fn test_cache_is_bounded() {
        let mut decider = BlockDecider::new(GenerationMode::Hybrid, generator(), 2);
        for x in 0..4 {
            decider.decide(GridPosition::new(x * 8, 0, 0));
        }
        assert_eq!(decider.cache.len(), 2);
        decider.set_mode(GenerationMode::Simple);
        assert!(decider.cache.is_empty());
    }
}
