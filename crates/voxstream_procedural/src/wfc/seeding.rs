//! Soft seed constraints derived from the height field.
//!
//! Seeding narrows the wave before solving but never empties a cell.

use voxstream_shared::{BlockType, ChunkCoord, CHUNK_HEIGHT, CHUNK_SIZE};

use crate::chunk::LocalCoord;
use crate::terrain::HeightSynthesizer;

use super::wave::Wave;

/// Local layers at the bottom of a chunk that must be ground.
pub const GROUND_LAYERS: usize = 2;

/// Local layers at the top of a chunk that must not be ground.
pub const SKY_LAYERS: usize = 3;

const GROUND_FORBIDS: [BlockType; 3] = [BlockType::Air, BlockType::Grass, BlockType::Water];
const SKY_FORBIDS: [BlockType; 2] = [BlockType::Stone, BlockType::Dirt];

/// Applies the seed rules to every cell of `wave`.
///
/// Returns the number of types removed.
pub fn seed_wave(wave: &mut Wave, coord: ChunkCoord, synth: &HeightSynthesizer) -> usize {
    let params = synth.params();
    let origin = coord.origin();
    let mut removed = 0;

    for y in 0..CHUNK_SIZE {
        for x in 0..CHUNK_SIZE {
            let surface = synth.terrain_height(origin.x + x as i32, origin.y + y as i32);
            let low_column = surface <= params.sea_level;

            for z in 0..CHUNK_HEIGHT {
                let Some(local) = LocalCoord::new(x, y, z) else {
                    continue;
                };
                let index = local.index();
                let world_z = origin.z + z as i32;

                let forbidden: &[BlockType] = if z < GROUND_LAYERS {
                    &GROUND_FORBIDS
                } else if z >= CHUNK_HEIGHT - SKY_LAYERS {
                    &SKY_FORBIDS
                } else if low_column && world_z <= params.sea_level {
                    &[BlockType::Grass]
                } else {
                    &[]
                };

                for block in forbidden {
                    if wave.forbid_soft(index, *block) {
                        removed += 1;
                    }
                }
            }
        }
    }

    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terrain::TerrainParams;

    #[test]
    fn test_seeding_layers() {
        let synth = HeightSynthesizer::new(TerrainParams::default(), |_x: f64, _y: f64| -1.0);
        let mut wave = Wave::new();
        let removed = seed_wave(&mut wave, ChunkCoord::new(0, 0, 0), &synth);
        assert!(removed > 0);

        let bottom = wave.get(LocalCoord::new(3, 3, 0).unwrap().index());
        assert!(!bottom.contains(BlockType::Air));
        assert!(bottom.contains(BlockType::Stone));

        let top = wave.get(LocalCoord::new(3, 3, 15).unwrap().index());
        assert!(!top.contains(BlockType::Stone));
        assert!(top.contains(BlockType::Air));

        // Surface at min_height + 2 is below sea level, so grass is out.
        let low = wave.get(LocalCoord::new(3, 3, 2).unwrap().index());
        assert!(!low.contains(BlockType::Grass));
    }

    #[test]
    fn test_seeding_never_empties() {
        let synth = HeightSynthesizer::new(TerrainParams::default(), |x: f64, y: f64| (x - y).sin());
        for cz in -1..=1 {
            let mut wave = Wave::new();
            seed_wave(&mut wave, ChunkCoord::new(cz, -cz, cz), &synth);
            assert!(wave.cells().iter().all(|set| set.len() >= 2));
        }
    }
}
