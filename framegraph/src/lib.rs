//! # RedLilium Frame Graph
//!
//! Per-frame render graph compiler and scheduler for RedLilium.
//!
//! ## Overview
//!
//! This crate provides:
//! - [`FrameGraph`] - Declarative description of one frame's passes and resources
//! - [`CompiledGraph`] - Ordered, leveled, culled and synchronized execution plan
//! - [`FramePipeline`] - Resource pool and queue timelines shared across frames
//! - [`GpuBackend`] - Trait the graph records through, with a recording [`DummyBackend`]
//!
//! A frame goes through three stages: declare (resources and passes), compile
//! (adjacency, topological sort, leveling, culling, cross-queue resolution,
//! lifetimes) and execute (per level: barriers, passes, releases).
//!
//! ## Example
//!
//! ```ignore
//! use redlilium_framegraph::*;
//!
//! let backend = DummyBackend::new();
//! let mut pipeline = FramePipeline::default();
//!
//! let mut graph = FrameGraph::new();
//! graph.add_pass(
//!     "blur",
//!     PassType::Compute,
//!     PassFlags::FORCE_NO_CULL,
//!     |builder| {
//!         builder.declare_texture("blurred", blurred_desc);
//!         builder.write_texture("blurred")
//!     },
//!     |_, ctx| ctx.dispatch(120, 68, 1),
//! );
//! graph.compile();
//! let stats = graph.execute(&backend, &mut pipeline)?;
//! pipeline.end_frame(&backend);
//! ```

pub mod backend;
pub mod compiler;
pub mod config;
pub mod error;
pub mod executor;
pub mod graph;
pub mod pipeline;
pub mod resources;
pub mod scheduler;
pub mod types;

// Re-export main types for convenience
pub use backend::{BackendError, BarrierMode, DummyBackend, GpuBackend, RecordedCommand};
pub use compiler::{CompiledGraph, DependencyLevel, Lifetime, PassSync};
pub use config::{FrameGraphConfig, PoolConfig};
pub use error::FrameGraphError;
pub use executor::{ExecutionStats, PassContext};
pub use graph::{
    FrameGraph, LoadOp, PassBuilder, PassFlags, PassId, PassType, ReadAccess, ResourceId,
    StoreOp, ViewId,
};
pub use pipeline::FramePipeline;
pub use scheduler::{QueueType, RetirePoint};
pub use types::{
    BufferDescriptor, BufferUsage, ClearValue, Extent3d, ResourceState, TextureDescriptor,
    TextureFormat, TextureUsage,
};

/// Frame graph library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the frame graph subsystem.
pub fn init() {
    log::info!("RedLilium Frame Graph v{} initialized", VERSION);
}
