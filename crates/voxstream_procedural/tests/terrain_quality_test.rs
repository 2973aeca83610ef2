//! # Terrain Quality Tests
//!
//! The height field must look like terrain: mostly gentle slopes, some water,
//! some high ground, and a column layout that never breaks its own rules.

use voxstream_procedural::{classify_cell, ColumnZone, HeightSynthesizer, TerrainParams, WorldSeed};
use voxstream_shared::{BlockType, GridPosition};

fn synth() -> HeightSynthesizer {
    HeightSynthesizer::from_seed(TerrainParams::default(), WorldSeed::new(42))
}

/// Test: neighbouring columns rarely jump more than a couple of cells.
#[test]
fn test_terrain_is_mostly_walkable() {
    let synth = synth();
    let mut gentle = 0;
    let mut total = 0;

    for y in (-400..400).step_by(8) {
        for x in (-400..400).step_by(8) {
            let h = synth.terrain_height(x, y);
            let dx = (h - synth.terrain_height(x + 1, y)).abs();
            let dy = (h - synth.terrain_height(x, y + 1)).abs();
            if dx.max(dy) <= 2 {
                gentle += 1;
            }
            total += 1;
        }
    }

    let pct = gentle as f64 / total as f64 * 100.0;
    println!("Gentle slopes: {pct:.1}% ({gentle}/{total})");
    assert!(pct > 90.0, "terrain too jagged: {pct:.1}%");
}

/// Test: a large area has both dry land and water.
#[test]
fn test_terrain_has_land_and_water() {
    let synth = synth();
    let params = *synth.params();
    let mut dry = 0;
    let mut wet = 0;

    for y in (-1000..1000).step_by(20) {
        for x in (-1000..1000).step_by(20) {
            if synth.terrain_height(x, y) > params.sea_level {
                dry += 1;
            } else {
                wet += 1;
            }
        }
    }

    println!("Dry columns: {dry}, wet columns: {wet}");
    assert!(dry > 0, "no land at all");
    assert!(wet > 0, "no water at all");
}

/// Test: every column reads Stone, Dirt, surface, then Water or Air going up.
#[test]
fn test_column_layering() {
    let synth = synth();
    let params = *synth.params();

    for (x, y) in [(0, 0), (37, -12), (-250, 91), (600, 600)] {
        let h = synth.terrain_height(x, y);
        let mut seen_surface = false;
        let mut previous = ColumnZone::Deep;

        for z in params.min_height..=params.max_height {
            let zone = ColumnZone::of(z, h, &params);
            let block = synth.classify(GridPosition::new(x, y, z));
            assert_eq!(block, classify_cell(z, h, &params));

            if zone == ColumnZone::Surface {
                seen_surface = true;
            }
            if seen_surface && z > h {
                assert!(matches!(block, BlockType::Air | BlockType::Water));
            }
            if previous == ColumnZone::Air {
                assert_eq!(zone, ColumnZone::Air, "air must stay air going up");
            }
            previous = zone;
        }
        assert!(seen_surface, "column ({x}, {y}) has no surface");
    }
}

/// Test: the same seed always builds the same world.
#[test]
fn test_seed_determinism() {
    let a = synth();
    let b = synth();
    let c = HeightSynthesizer::from_seed(TerrainParams::default(), WorldSeed::new(43));

    let mut differs = false;
    for i in 0..500 {
        let (x, y) = (i * 13 - 3000, i * 7 - 1500);
        assert_eq!(a.terrain_height(x, y), b.terrain_height(x, y));
        differs |= a.terrain_height(x, y) != c.terrain_height(x, y);
    }
    assert!(differs, "different seeds produced the same heights");
}
