//! # Chunk Generator
//!
//! Seeds a chunk from the height field, runs the constraint solver, and falls
//! back to the deterministic fill when the solver gives up. The solver RNG is
//! seeded from the world seed and the chunk coordinate, so a chunk comes out
//! identical every time it is regenerated.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use voxstream_shared::ChunkCoord;

use crate::chunk::Chunk;
use crate::error::ChunkResult;
use crate::fallback::{fallback_cells, fill_chunk};
use crate::noise::WorldSeed;
use crate::terrain::{HeightSynthesizer, TerrainParams};
use crate::wfc::{seed_wave, ConstraintSolver, SolveFailure, SolverConfig};

/// How a chunk's cells were decided.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GenerationMethod {
    /// Constraint solver collapsed the wave.
    Solver,
    /// Deterministic height-field fill.
    Fallback,
}

/// Outcome of generating one chunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GenerationReport {
    /// Generated chunk.
    pub coord: ChunkCoord,
    /// Method that produced the cells.
    pub method: GenerationMethod,
    /// Solver attempts (0 when the solver was skipped).
    pub attempts: u32,
    /// Solver iterations (0 when the solver was skipped).
    pub iterations: usize,
    /// Why the solver gave up, if it did.
    pub failure: Option<SolveFailure>,
}

/// Solver-first chunk generator.
#[derive(Debug)]
pub struct ChunkGenerator {
    synth: HeightSynthesizer,
    solver: ConstraintSolver,
    seed: WorldSeed,
}

impl ChunkGenerator {
    /// Creates a generator over seeded simplex terrain.
    #[must_use]
    pub fn new(seed: WorldSeed, params: TerrainParams, solver: SolverConfig) -> Self {
        Self::with_synthesizer(HeightSynthesizer::from_seed(params, seed), seed, solver)
    }

    /// Creates a generator over an existing height field.
    #[must_use]
    pub fn with_synthesizer(synth: HeightSynthesizer, seed: WorldSeed, solver: SolverConfig) -> Self {
        Self::with_solver(synth, seed, ConstraintSolver::new(solver))
    }

    /// Creates a generator around a configured solver.
    #[must_use]
    pub fn with_solver(synth: HeightSynthesizer, seed: WorldSeed, solver: ConstraintSolver) -> Self {
        Self { synth, solver, seed }
    }

    /// The constraint solver.
    #[inline]
    #[must_use]
    pub const fn solver(&self) -> &ConstraintSolver {
        &self.solver
    }

    /// The height field used for seeding and fallback.
    #[inline]
    #[must_use]
    pub const fn synthesizer(&self) -> &HeightSynthesizer {
        &self.synth
    }

    /// The world seed.
    #[inline]
    #[must_use]
    pub const fn seed(&self) -> WorldSeed {
        self.seed
    }

    /// Generates `coord`: seed, solve, fall back on failure.
    ///
    /// # Errors
    ///
    /// Only on an internal lifecycle violation; a solver failure is not an error.
    pub fn generate(&self, coord: ChunkCoord) -> ChunkResult<(Chunk, GenerationReport)> {
        let mut chunk = Chunk::new(coord);
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed.for_chunk(coord).value());

        let solved = match chunk.wave_mut() {
            Some(wave) => {
                seed_wave(wave, coord, &self.synth);
                Some(self.solver.solve(wave, &mut rng))
            }
            None => None,
        };
        chunk.mark_constrained()?;

        let report = match solved {
            Some(Ok(outcome)) => {
                let report = GenerationReport {
                    coord,
                    method: GenerationMethod::Solver,
                    attempts: outcome.attempts,
                    iterations: outcome.iterations,
                    failure: None,
                };
                chunk.resolve_collapsed(outcome.cells)?;
                report
            }
            Some(Err(failure)) => {
                tracing::debug!(%coord, %failure, "solver gave up, using fallback");
                chunk.resolve_fallback(fallback_cells(coord, &self.synth))?;
                GenerationReport {
                    coord,
                    method: GenerationMethod::Fallback,
                    attempts: failure.attempts(),
                    iterations: failure.iterations(),
                    failure: Some(failure),
                }
            }
            None => {
                chunk.resolve_fallback(fallback_cells(coord, &self.synth))?;
                Self::fallback_report(coord)
            }
        };

        Ok((chunk, report))
    }

    /// Generates `coord` from the height field alone.
    ///
    /// # Errors
    ///
    /// Only on an internal lifecycle violation.
    pub fn generate_fallback(&self, coord: ChunkCoord) -> ChunkResult<(Chunk, GenerationReport)> {
        let mut chunk = Chunk::new(coord);
        fill_chunk(&mut chunk, &self.synth)?;
        Ok((chunk, Self::fallback_report(coord)))
    }

    const fn fallback_report(coord: ChunkCoord) -> GenerationReport {
        GenerationReport {
            coord,
            method: GenerationMethod::Fallback,
            attempts: 0,
            iterations: 0,
            failure: None,
        }
    }
}
