//! The single barrier entry point used by the executor.
//!
//! The barrier model is resolved once from [`GpuBackend::barrier_mode`]; the
//! scheduling logic never branches on it.

use crate::backend::{BarrierMode, GpuBackend, ResourceHandle};
use crate::scheduler::QueueType;
use crate::types::ResourceState;

/// Memory layout class of a texture state in the enhanced barrier model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layout {
    Common,
    ColorAttachment,
    DepthStencilWrite,
    DepthStencilRead,
    General,
    ShaderReadOnly,
    TransferSrc,
    TransferDst,
    Present,
}

impl Layout {
    fn of(state: ResourceState) -> Self {
        if state.contains(ResourceState::RENDER_TARGET) {
            Self::ColorAttachment
        } else if state.contains(ResourceState::DEPTH_WRITE) {
            Self::DepthStencilWrite
        } else if state.contains(ResourceState::DEPTH_READ) {
            Self::DepthStencilRead
        } else if state.contains(ResourceState::UNORDERED_ACCESS) {
            Self::General
        } else if state.contains(ResourceState::COPY_DEST) {
            Self::TransferDst
        } else if state.contains(ResourceState::COPY_SOURCE) {
            Self::TransferSrc
        } else if state.contains(ResourceState::PRESENT) {
            Self::Present
        } else if state.is_empty() {
            Self::Common
        } else {
            Self::ShaderReadOnly
        }
    }
}

/// Whether the enhanced model needs a barrier between two different states.
fn needs_enhanced_barrier(
    resource: ResourceHandle,
    before: ResourceState,
    after: ResourceState,
) -> bool {
    let hazard = before.is_write() || after.is_write();
    match resource {
        ResourceHandle::Texture(_) => hazard || Layout::of(before) != Layout::of(after),
        ResourceHandle::Buffer(_) => hazard,
    }
}

/// Whether moving `resource` from `before` to `after` needs any barrier.
///
/// Unordered access in both states needs a global barrier so consecutive
/// storage writes are ordered.
pub(crate) fn is_required(
    mode: BarrierMode,
    resource: ResourceHandle,
    before: ResourceState,
    after: ResourceState,
) -> bool {
    if before == after {
        return after.contains(ResourceState::UNORDERED_ACCESS);
    }
    match mode {
        BarrierMode::Legacy => true,
        BarrierMode::Enhanced => needs_enhanced_barrier(resource, before, after),
    }
}

/// Queue whatever barrier moving `resource` from `before` to `after` needs.
///
/// Returns true if a barrier was queued.
pub(crate) fn emit_barrier(
    backend: &dyn GpuBackend,
    mode: BarrierMode,
    queue: QueueType,
    resource: ResourceHandle,
    before: ResourceState,
    after: ResourceState,
) -> bool {
    if !is_required(mode, resource, before, after) {
        log::trace!("Skipping barrier {:?}: {:?} -> {:?}", resource, before, after);
        return false;
    }
    if before == after {
        backend.global_barrier(queue);
        return true;
    }

    log::trace!("Barrier {:?} on {:?}: {:?} -> {:?}", resource, queue, before, after);
    match resource {
        ResourceHandle::Texture(texture) => backend.texture_barrier(queue, texture, before, after),
        ResourceHandle::Buffer(buffer) => backend.buffer_barrier(queue, buffer, before, after),
    }
    true
}
