//! # Constraint Solver
//!
//! Local wave function collapse over one chunk.
//!
//! ## Loop
//!
//! 1. Observe: find an empty cell (contradiction) or the cell with the fewest
//!    (>1) options, first one on ties.
//! 2. Done when every cell has exactly one option.
//! 3. Collapse the chosen cell by a height-weighted random pick.
//! 4. Propagate bans through a work queue until it drains.
//!
//! Contradictions reset the wave to all-true and restart, up to `max_attempts`.
//! The whole loop is capped at `2 * cell_count` iterations across attempts. The
//! solver never panics on failure; the caller falls back to the height field.

use std::collections::VecDeque;
use std::sync::Arc;

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use voxstream_shared::{BlockType, Direction, CELLS_PER_CHUNK, CHUNK_HEIGHT};

use crate::chunk::LocalCoord;

use super::adjacency::AdjacencyRules;
use super::wave::{TypeSet, Wave};

/// Default number of full restarts after a contradiction.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Solver limits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Contradictions tolerated before giving up.
    pub max_attempts: u32,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

/// A successful solve.
#[derive(Clone, Debug)]
pub struct SolveOutcome {
    /// One type per cell, in chunk index order.
    pub cells: Box<[BlockType]>,
    /// Attempts used (1 if no contradiction occurred).
    pub attempts: u32,
    /// Loop iterations used across attempts.
    pub iterations: usize,
}

/// Why a solve gave up.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum SolveFailure {
    /// Every attempt ended in a contradiction.
    #[error("contradiction in all {attempts} attempts after {iterations} iterations")]
    Contradiction {
        /// Attempts made.
        attempts: u32,
        /// Iterations used.
        iterations: usize,
    },

    /// The iteration cap was hit.
    #[error("iteration limit {limit} reached on attempt {attempts}")]
    IterationLimit {
        /// Attempts made.
        attempts: u32,
        /// The cap.
        limit: usize,
    },
}

impl SolveFailure {
    /// Attempts made before giving up.
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        match self {
            Self::Contradiction { attempts, .. } | Self::IterationLimit { attempts, .. } => *attempts,
        }
    }

    /// Iterations used before giving up.
    #[must_use]
    pub const fn iterations(&self) -> usize {
        match self {
            Self::Contradiction { iterations, .. } => *iterations,
            Self::IterationLimit { limit, .. } => *limit,
        }
    }
}

enum Observation {
    Contradiction,
    Collapsed,
    Pick(usize),
}

/// Per-chunk constraint solver.
#[derive(Clone, Debug)]
pub struct ConstraintSolver {
    rules: Arc<AdjacencyRules>,
    config: SolverConfig,
}

impl ConstraintSolver {
    /// Creates a solver over the shared terrain rules.
    #[must_use]
    pub fn new(config: SolverConfig) -> Self {
        Self::with_rules(AdjacencyRules::shared(), config)
    }

    /// Creates a solver over a given rule table.
    #[must_use]
    pub fn with_rules(rules: Arc<AdjacencyRules>, config: SolverConfig) -> Self {
        Self { rules, config }
    }

    /// Solver limits.
    #[must_use]
    pub const fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Iteration cap across all attempts.
    #[inline]
    #[must_use]
    pub const fn max_iterations(&self) -> usize {
        2 * CELLS_PER_CHUNK
    }

    /// Solves `wave` in place.
    ///
    /// Constraints already present in the wave (from seeding) are propagated
    /// before the first observation.
    ///
    /// # Errors
    ///
    /// Returns [`SolveFailure`] when contradictions exhaust the attempt limit
    /// or the iteration cap is reached. The wave is left in its last state.
    pub fn solve<R: Rng + ?Sized>(&self, wave: &mut Wave, rng: &mut R) -> Result<SolveOutcome, SolveFailure> {
        let max_attempts = self.config.max_attempts.max(1);
        let limit = self.max_iterations();
        let mut attempts = 1;
        let mut iterations = 0;

        let mut queue = VecDeque::with_capacity(64);
        let mut queued = vec![false; wave.len()];

        for index in 0..wave.len() {
            if wave.get(index) != TypeSet::ALL {
                queued[index] = true;
                queue.push_back(index);
            }
        }
        self.propagate(wave, &mut queue, &mut queued);

        loop {
            if iterations >= limit {
                return Err(SolveFailure::IterationLimit { attempts, limit });
            }
            iterations += 1;

            match Self::observe(wave) {
                Observation::Contradiction => {
                    if attempts >= max_attempts {
                        return Err(SolveFailure::Contradiction { attempts, iterations });
                    }
                    attempts += 1;
                    wave.reset();
                }
                Observation::Collapsed => {
                    if let Some(cells) = wave.resolved() {
                        return Ok(SolveOutcome {
                            cells,
                            attempts,
                            iterations,
                        });
                    }
                }
                Observation::Pick(index) => {
                    let choice = Self::weighted_pick(wave.get(index), index, rng);
                    wave.set(index, TypeSet::only(choice));
                    queued[index] = true;
                    queue.push_back(index);
                    self.propagate(wave, &mut queue, &mut queued);
                }
            }
        }
    }

    fn observe(wave: &Wave) -> Observation {
        let mut best: Option<(usize, u32)> = None;
        for (index, options) in wave.cells().iter().enumerate() {
            let count = options.len();
            if count == 0 {
                return Observation::Contradiction;
            }
            if count > 1 && best.map_or(true, |(_, c)| count < c) {
                best = Some((index, count));
            }
        }
        match best {
            Some((index, _)) => Observation::Pick(index),
            None => Observation::Collapsed,
        }
    }

    /// Relative weight of `block` at local height `z`.
    ///
    /// Stone dominates the lower third, air the upper tier, water sits low.
    #[must_use]
    pub fn weight(block: BlockType, z: usize) -> u32 {
        let third = CHUNK_HEIGHT / 3;
        let tier = if z < third {
            0
        } else if z < CHUNK_HEIGHT - third {
            1
        } else {
            2
        };
        let table: [u32; 3] = match block {
            BlockType::Air => [1, 10, 60],
            BlockType::Grass => [5, 30, 15],
            BlockType::Dirt => [20, 30, 5],
            BlockType::Stone => [60, 15, 2],
            BlockType::Water => [25, 10, 3],
        };
        table[tier]
    }

    fn weighted_pick<R: Rng + ?Sized>(options: TypeSet, index: usize, rng: &mut R) -> BlockType {
        let z = LocalCoord::from_index(index).map_or(0, |local| local.z);
        let total: u32 = options.iter().map(|b| Self::weight(b, z)).sum();
        if total > 0 {
            let roll = rng.gen_range(0..total);
            let mut cumulative = 0;
            for block in options.iter() {
                cumulative += Self::weight(block, z);
                if roll < cumulative {
                    return block;
                }
            }
        }
        options.iter().next().unwrap_or(BlockType::Air)
    }

    /// Drains the queue, banning unsupported neighbour types.
    ///
    /// Stops early when a cell empties; the next observation reports it.
    fn propagate(&self, wave: &mut Wave, queue: &mut VecDeque<usize>, queued: &mut [bool]) {
        while let Some(index) = queue.pop_front() {
            queued[index] = false;
            let options = wave.get(index);
            let Some(local) = LocalCoord::from_index(index) else {
                continue;
            };

            for direction in Direction::ALL {
                let Some(neighbor) = local.neighbor(direction) else {
                    continue;
                };
                let n = neighbor.index();
                let current = wave.get(n);
                let next = current.intersect(self.rules.supported(options, direction));
                if next == current {
                    continue;
                }
                wave.set(n, next);
                if next.is_empty() {
                    for stale in queue.drain(..) {
                        queued[stale] = false;
                    }
                    return;
                }
                if !queued[n] {
                    queued[n] = true;
                    queue.push_back(n);
                }
            }
        }
    }
}

impl Default for ConstraintSolver {
    fn default() -> Self {
        Self::new(SolverConfig::default())
    }
}
