//! Cross-frame state of the frame graph.
//!
//! A [`FrameGraph`](crate::graph::FrameGraph) lives for one frame. Everything
//! that has to survive from one frame to the next is owned by
//! [`FramePipeline`]:
//!
//! | State | Purpose |
//! |-------|---------|
//! | [`ResourcePool`] | Backing objects of transient resources, reused across frames |
//! | [`QueueTimelines`] | Last timeline value submitted on each queue |
//! | Deferred views | Views of imported resources, destroyed once the GPU is done with them |
//! | Frame index | Drives pool eviction |
//!
//! # Example
//!
//! ```ignore
//! let mut pipeline = FramePipeline::new(PoolConfig::default());
//!
//! loop {
//!     let mut graph = FrameGraph::new();
//!     // ... declare resources and passes ...
//!     graph.compile();
//!     graph.execute(&backend, &mut pipeline)?;
//!     pipeline.end_frame(&backend);
//! }
//!
//! // After the device is idle:
//! pipeline.shutdown(&backend);
//! ```
//!
//! Frame indices must increase strictly and only one graph may execute
//! against a pipeline at a time; `execute` borrowing the pipeline mutably
//! enforces the latter.

use crate::backend::{GpuBackend, ViewHandle};
use crate::config::PoolConfig;
use crate::resources::ResourcePool;
use crate::scheduler::{QueueTimelines, QueueType, RetirePoint};

/// Owner of all state shared between frames.
#[derive(Debug)]
pub struct FramePipeline {
    pool: ResourcePool,
    timelines: QueueTimelines,
    frame_index: u64,
    deferred_views: Vec<(RetirePoint, ViewHandle)>,
}

impl FramePipeline {
    /// Create a pipeline with an empty pool.
    pub fn new(config: PoolConfig) -> Self {
        Self {
            pool: ResourcePool::new(config),
            timelines: QueueTimelines::new(),
            frame_index: 0,
            deferred_views: Vec::new(),
        }
    }

    /// Index of the frame currently being recorded.
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// The transient resource pool.
    pub fn pool(&self) -> &ResourcePool {
        &self.pool
    }

    pub(crate) fn pool_mut(&mut self) -> &mut ResourcePool {
        &mut self.pool
    }

    /// Per-queue timeline values handed out so far.
    pub fn timelines(&self) -> &QueueTimelines {
        &self.timelines
    }

    pub(crate) fn timelines_mut(&mut self) -> &mut QueueTimelines {
        &mut self.timelines
    }

    /// Retire point covering every submission made so far.
    pub fn retire_point(&self) -> RetirePoint {
        RetirePoint::new(
            self.timelines.last_submitted(QueueType::Graphics),
            self.timelines.last_submitted(QueueType::Compute),
        )
    }

    /// Returns true once the GPU has completed everything submitted so far.
    pub fn is_idle(&self, backend: &dyn GpuBackend) -> bool {
        self.retire_point().is_retired(backend)
    }

    /// Number of views waiting for their last use to retire.
    pub fn deferred_view_count(&self) -> usize {
        self.deferred_views.len()
    }

    pub(crate) fn defer_view_destruction(&mut self, retire: RetirePoint, view: ViewHandle) {
        self.deferred_views.push((retire, view));
    }

    /// Close the current frame.
    ///
    /// Destroys deferred views whose submissions have retired, evicts pool
    /// entries that stayed unused for too long, and advances the frame index.
    pub fn end_frame(&mut self, backend: &dyn GpuBackend) {
        self.collect_deferred(backend);
        self.pool.evict_unused(backend, self.frame_index);
        log::trace!("End frame {}", self.frame_index);
        self.frame_index += 1;
    }

    /// Destroy every GPU object the pipeline owns.
    ///
    /// The caller must make sure the device is idle.
    pub fn shutdown(&mut self, backend: &dyn GpuBackend) {
        for (_, view) in self.deferred_views.drain(..) {
            backend.destroy_view(view);
        }
        self.pool.clear(backend);
        log::debug!("Frame pipeline shut down after {} frames", self.frame_index);
    }

    fn collect_deferred(&mut self, backend: &dyn GpuBackend) {
        self.deferred_views.retain(|&(retire, view)| {
            if retire.is_retired(backend) {
                backend.destroy_view(view);
                false
            } else {
                true
            }
        });
    }
}

impl Default for FramePipeline {
    fn default() -> Self {
        Self::new(PoolConfig::default())
    }
}

static_assertions::assert_impl_all!(FramePipeline: Send, Sync);
