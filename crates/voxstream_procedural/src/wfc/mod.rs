//! # Local Wave Function Collapse
//!
//! Assigns a block type to every cell of one chunk under 6-connected adjacency
//! rules. Seams between chunks are not reconciled.
//!
//! - [`wave`]: per-cell admissible-type bitsets
//! - [`adjacency`]: the shared rule table
//! - [`seeding`]: soft constraints from the height field
//! - [`solver`]: observe / collapse / propagate loop

pub mod adjacency;
pub mod seeding;
pub mod solver;
pub mod wave;

pub use adjacency::AdjacencyRules;
pub use seeding::seed_wave;
pub use solver::{ConstraintSolver, SolveFailure, SolveOutcome, SolverConfig};
pub use wave::{TypeSet, Wave};
