//! # Adjacency Rules
//!
//! For each `(type, direction)` the set of types allowed on the neighbouring
//! cell in that direction. The table is built once per process and shared
//! read-only by every solver.

use std::sync::{Arc, OnceLock};

use voxstream_shared::{BlockType, Direction};

use super::wave::TypeSet;

/// Immutable adjacency table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AdjacencyRules {
    allowed: [[TypeSet; 6]; BlockType::COUNT],
}

static SHARED_RULES: OnceLock<Arc<AdjacencyRules>> = OnceLock::new();

impl AdjacencyRules {
    /// The terrain rule table.
    #[must_use]
    pub fn terrain() -> Self {
        use BlockType::{Air, Dirt, Grass, Stone, Water};

        fn rule(
            allowed: &mut [[TypeSet; 6]; BlockType::COUNT],
            block: BlockType,
            above: &[BlockType],
            below: &[BlockType],
            sides: &[BlockType],
        ) {
            let row = &mut allowed[block.index()];
            row[Direction::PosZ.index()] = TypeSet::of(above);
            row[Direction::NegZ.index()] = TypeSet::of(below);
            for dir in Direction::HORIZONTAL {
                row[dir.index()] = TypeSet::of(sides);
            }
        }

        let mut allowed = [[TypeSet::EMPTY; 6]; BlockType::COUNT];
        rule(&mut allowed, Grass, &[Air], &[Dirt, Stone], &[Grass, Dirt, Water]);
        rule(&mut allowed, Dirt, &[Grass, Dirt, Air], &[Dirt, Stone], &[Dirt, Grass, Stone]);
        rule(&mut allowed, Stone, &[Stone, Dirt, Air], &[Stone], &[Stone, Dirt]);
        rule(&mut allowed, Water, &[Water, Air], &[Water, Stone, Dirt], &[Water, Dirt, Stone]);
        rule(&mut allowed, Air, &BlockType::ALL, &BlockType::ALL, &BlockType::ALL);

        Self { allowed }
    }

    /// A custom table, indexed by `BlockType::index()` then `Direction::index()`.
    #[must_use]
    pub const fn from_rows(allowed: [[TypeSet; 6]; BlockType::COUNT]) -> Self {
        Self { allowed }
    }

    /// Process-wide shared copy of [`AdjacencyRules::terrain`].
    #[must_use]
    pub fn shared() -> Arc<Self> {
        Arc::clone(SHARED_RULES.get_or_init(|| Arc::new(Self::terrain())))
    }

    /// Types allowed next to `block` in `direction`.
    #[inline]
    #[must_use]
    pub fn allowed(&self, block: BlockType, direction: Direction) -> TypeSet {
        self.allowed[block.index()][direction.index()]
    }

    /// Union of what any type in `options` allows in `direction`.
    #[must_use]
    pub fn supported(&self, options: TypeSet, direction: Direction) -> TypeSet {
        options
            .iter()
            .fold(TypeSet::EMPTY, |acc, block| acc.union(self.allowed(block, direction)))
    }
}
