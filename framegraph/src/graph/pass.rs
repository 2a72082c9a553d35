//! Pass registry types.

use std::collections::BTreeMap;

use bitflags::bitflags;

use crate::executor::PassContext;
use crate::scheduler::QueueType;
use crate::types::{ResourceState, Viewport};

use super::{ColorTarget, DepthStencilTarget, PassId, ResourceId};

/// Kind of work a pass records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassType {
    /// Rasterization work; requires a viewport.
    Graphics,
    /// Compute work on the graphics queue.
    Compute,
    /// Compute work on the asynchronous compute queue.
    AsyncCompute,
    /// Copy work on the graphics queue.
    Copy,
}

impl PassType {
    /// Queue the pass runs on when async compute is enabled.
    pub fn queue(self, async_compute: bool) -> QueueType {
        match self {
            Self::AsyncCompute if async_compute => QueueType::Compute,
            _ => QueueType::Graphics,
        }
    }
}

bitflags! {
    /// Per-pass behavior flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PassFlags: u32 {
        /// Never cull the pass, even if nothing consumes its outputs.
        const FORCE_NO_CULL = 1 << 0;
        /// Bind targets with `set_render_targets` and explicit clears
        /// instead of a render pass.
        const LEGACY_RENDER_PASS = 1 << 1;
    }
}

impl Default for PassFlags {
    fn default() -> Self {
        Self::empty()
    }
}

pub(crate) type ExecuteFn<'a> = Box<dyn FnMut(&mut PassContext<'_>) + 'a>;

/// One unit of GPU work with declared resource accesses.
///
/// Created by [`FrameGraph::add_pass`](super::FrameGraph::add_pass); the setup
/// callback fills in the access sets through a
/// [`PassBuilder`](super::PassBuilder).
pub struct Pass<'a> {
    id: PassId,
    name: String,
    pass_type: PassType,
    flags: PassFlags,
    pub(crate) creates: Vec<ResourceId>,
    pub(crate) reads: Vec<ResourceId>,
    pub(crate) writes: Vec<ResourceId>,
    pub(crate) states: BTreeMap<ResourceId, ResourceState>,
    pub(crate) color_targets: Vec<ColorTarget>,
    pub(crate) depth_stencil: Option<DepthStencilTarget>,
    pub(crate) viewport: Option<Viewport>,
    pub(crate) execute: Option<ExecuteFn<'a>>,
}

impl<'a> Pass<'a> {
    pub(crate) fn new(id: PassId, name: String, pass_type: PassType, flags: PassFlags) -> Self {
        Self {
            id,
            name,
            pass_type,
            flags,
            creates: Vec::new(),
            reads: Vec::new(),
            writes: Vec::new(),
            states: BTreeMap::new(),
            color_targets: Vec::new(),
            depth_stencil: None,
            viewport: None,
            execute: None,
        }
    }

    /// Get the pass id. Ids follow declaration order.
    pub fn id(&self) -> PassId {
        self.id
    }

    /// Get the pass name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the pass type.
    pub fn pass_type(&self) -> PassType {
        self.pass_type
    }

    /// Get the pass flags.
    pub fn flags(&self) -> PassFlags {
        self.flags
    }

    /// Check if the pass can be culled.
    pub fn is_cullable(&self) -> bool {
        !self.flags.contains(PassFlags::FORCE_NO_CULL)
    }

    /// Resources declared by this pass.
    pub fn creates(&self) -> &[ResourceId] {
        &self.creates
    }

    /// Resources read by this pass.
    pub fn reads(&self) -> &[ResourceId] {
        &self.reads
    }

    /// Resources written by this pass.
    pub fn writes(&self) -> &[ResourceId] {
        &self.writes
    }

    /// State each accessed resource must be in while the pass runs.
    pub fn states(&self) -> &BTreeMap<ResourceId, ResourceState> {
        &self.states
    }

    /// Required state of `resource`, if the pass accesses it.
    pub fn state_of(&self, resource: ResourceId) -> Option<ResourceState> {
        self.states.get(&resource).copied()
    }

    /// Color targets in binding order.
    pub fn color_targets(&self) -> &[ColorTarget] {
        &self.color_targets
    }

    /// Depth/stencil target, if any.
    pub fn depth_stencil(&self) -> Option<&DepthStencilTarget> {
        self.depth_stencil.as_ref()
    }

    /// Check if the pass binds any render target.
    pub fn has_render_targets(&self) -> bool {
        !self.color_targets.is_empty() || self.depth_stencil.is_some()
    }

    /// Viewport set during setup.
    pub fn viewport(&self) -> Option<Viewport> {
        self.viewport
    }
}

impl std::fmt::Debug for Pass<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pass")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("pass_type", &self.pass_type)
            .field("flags", &self.flags)
            .field("reads", &self.reads)
            .field("writes", &self.writes)
            .finish_non_exhaustive()
    }
}
