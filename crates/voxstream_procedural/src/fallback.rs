//! Deterministic fallback fill.
//!
//! Column by column, one height evaluation per column, every cell classified by
//! [`classify_cell`]. Total and side-effect free: it cannot fail and it never
//! creates world records (placement does that).

use voxstream_shared::{BlockType, ChunkCoord, CELLS_PER_CHUNK, CHUNK_HEIGHT, CHUNK_SIZE};

use crate::chunk::{Chunk, LocalCoord};
use crate::error::ChunkResult;
use crate::terrain::{classify_cell, HeightSynthesizer};

/// Classifies every cell of chunk `coord`, in chunk index order.
#[must_use]
pub fn fallback_cells(coord: ChunkCoord, synth: &HeightSynthesizer) -> Box<[BlockType]> {
    let params = synth.params();
    let origin = coord.origin();
    let mut cells = vec![BlockType::Air; CELLS_PER_CHUNK].into_boxed_slice();

    for y in 0..CHUNK_SIZE {
        for x in 0..CHUNK_SIZE {
            let surface = synth.terrain_height(origin.x + x as i32, origin.y + y as i32);
            for z in 0..CHUNK_HEIGHT {
                if let Some(local) = LocalCoord::new(x, y, z) {
                    cells[local.index()] = classify_cell(origin.z + z as i32, surface, params);
                }
            }
        }
    }

    cells
}

/// Resolves `chunk` from the height field.
///
/// # Errors
///
/// [`crate::ChunkError::InvalidTransition`] if the chunk is already resolved.
pub fn fill_chunk(chunk: &mut Chunk, synth: &HeightSynthesizer) -> ChunkResult<()> {
    let cells = fallback_cells(chunk.coord(), synth);
    chunk.resolve_fallback(cells)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::ChunkState;
    use crate::noise::WorldSeed;
    use crate::terrain::TerrainParams;

    #[test]
    fn test_fallback_matches_classifier() {
        let synth = HeightSynthesizer::from_seed(TerrainParams::default(), WorldSeed::new(3));
        let coord = ChunkCoord::new(-2, 5, 0);
        let mut chunk = Chunk::new(coord);
        fill_chunk(&mut chunk, &synth).unwrap();
        assert_eq!(chunk.state(), ChunkState::FallbackResolved);

        for (pos, block) in chunk.iter_cells().unwrap() {
            assert_eq!(block, synth.classify(pos));
        }
    }

    #[test]
    fn test_fallback_after_constrained() {
        let synth = HeightSynthesizer::from_seed(TerrainParams::default(), WorldSeed::new(3));
        let mut chunk = Chunk::new(ChunkCoord::new(0, 0, 1));
        chunk.mark_constrained().unwrap();
        fill_chunk(&mut chunk, &synth).unwrap();
        assert!(fill_chunk(&mut chunk, &synth).is_err());
    }
}
