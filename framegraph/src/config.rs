//! Frame graph configuration.

/// Configuration for compiling a [`FrameGraph`](crate::FrameGraph).
///
/// Use [`Default::default()`] for the production setup: culling, async
/// compute and level parallelism all enabled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameGraphConfig {
    /// Remove passes whose outputs are never consumed. Default: `true`.
    pub culling: bool,
    /// Run `AsyncCompute` passes on the compute queue. When disabled every
    /// pass runs on the graphics queue. Default: `true`.
    pub async_compute: bool,
    /// Group independent passes into shared dependency levels. When disabled
    /// every level holds exactly one pass. Default: `true`.
    pub parallel_levels: bool,
}

impl Default for FrameGraphConfig {
    fn default() -> Self {
        Self {
            culling: true,
            async_compute: true,
            parallel_levels: true,
        }
    }
}

impl FrameGraphConfig {
    /// Enable or disable pass culling.
    pub fn with_culling(mut self, enabled: bool) -> Self {
        self.culling = enabled;
        self
    }

    /// Enable or disable the async compute queue.
    pub fn with_async_compute(mut self, enabled: bool) -> Self {
        self.async_compute = enabled;
        self
    }

    /// Enable or disable grouping of independent passes into one level.
    pub fn with_parallel_levels(mut self, enabled: bool) -> Self {
        self.parallel_levels = enabled;
        self
    }
}

/// Configuration for the transient [`ResourcePool`](crate::resources::ResourcePool).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    /// Free entries unused for more than this many frames are destroyed.
    /// Default: 4.
    pub max_unused_frames: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_unused_frames: 4,
        }
    }
}

impl PoolConfig {
    /// Set the eviction threshold.
    pub fn with_max_unused_frames(mut self, frames: u64) -> Self {
        self.max_unused_frames = frames;
        self
    }
}
