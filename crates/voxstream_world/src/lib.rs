//! # VOXSTREAM World
//!
//! Streams a voxel world around a moving observer and keeps it consistent
//! with the render instance pools.
//!
//! ## Design Principles
//!
//! 1. **Budgeted**: a step decides at most `max_blocks_per_step` positions
//! 2. **Bijective**: every record owns exactly one live render instance
//! 3. **Self-healing**: validation finds structural drift, repair regenerates it
//!
//! ## Core Components
//!
//! - `TerrainStreamer`: per-cell streaming inside a sphere around the observer
//! - `ChunkStreamer`: whole-chunk streaming in the XY plane
//! - `BlockPlacer`: the only writer of records and pools
//! - `RenderPools` / `InstancePool`: per-type render instance hosts
//! - `validate` / `repair`: structural checks
//!
//! ## Example
//!
//! ```rust,ignore
//! use voxstream_world::{TerrainStreamer, WorldConfig};
//! use voxstream_shared::Vec3;
//!
//! let mut streamer = TerrainStreamer::with_default_pools(WorldConfig::default())?;
//! let report = streamer.step(&Vec3::new(50.0, 50.0, 650.0));
//! streamer.log_stats();
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod chunked;
pub mod config;
pub mod decider;
pub mod error;
pub mod observer;
pub mod placement;
pub mod render;
pub mod store;
pub mod streaming;
pub mod validation;

pub use chunked::{ChunkRenderReport, ChunkStepReport, ChunkStreamer};
pub use config::{ChunkStreamingConfig, StreamingConfig, WorldConfig};
pub use decider::{BlockDecider, DeciderStats, GenerationMode};
pub use error::{RenderError, RenderResult, WorldError, WorldResult};
pub use observer::{FnObserver, MotionTracker, ObserverSource, PassTrigger};
pub use placement::{BlockPlacer, PlaceOutcome};
pub use render::{render_offset, InstancePool, InstanceTransform, RenderPools, VecInstancePool};
pub use store::{BlockRecord, WorldStore};
pub use streaming::{PassReport, StepReport, TerrainStreamer, WorldStats};
pub use validation::{repair, validate, RepairSummary, ValidationReport};
