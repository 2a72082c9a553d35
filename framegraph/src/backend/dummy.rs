//! Dummy GPU backend for testing and development.
//!
//! This backend doesn't perform actual GPU operations. It hands out unique
//! handles, records every call as a [`RecordedCommand`] and simulates queue
//! timelines, so tests can assert the exact order of barriers, submissions,
//! waits and signals the executor produces.
//!
//! By default every submission completes immediately. Tests that exercise
//! pool retirement turn that off with [`DummyBackend::set_auto_complete`] and
//! advance the timelines by hand.

use std::collections::HashSet;

use parking_lot::Mutex;

use crate::scheduler::QueueType;
use crate::types::{
    BufferDescriptor, BufferViewDesc, ResourceState, TextureDescriptor, TextureViewDesc, ViewKind,
    Viewport,
};

use super::{
    BackendError, BackendResult, BarrierMode, BufferHandle, GpuBackend, RenderPassDesc,
    TextureHandle, ViewHandle,
};

/// A backend call captured by [`DummyBackend`].
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCommand {
    CreateTexture {
        texture: TextureHandle,
        label: Option<String>,
    },
    CreateBuffer {
        buffer: BufferHandle,
        label: Option<String>,
    },
    DestroyTexture(TextureHandle),
    DestroyBuffer(BufferHandle),
    CreateTextureView {
        view: ViewHandle,
        texture: TextureHandle,
        kind: ViewKind,
    },
    CreateBufferView {
        view: ViewHandle,
        buffer: BufferHandle,
        kind: ViewKind,
    },
    DestroyView(ViewHandle),
    TextureBarrier {
        queue: QueueType,
        texture: TextureHandle,
        before: ResourceState,
        after: ResourceState,
    },
    BufferBarrier {
        queue: QueueType,
        buffer: BufferHandle,
        before: ResourceState,
        after: ResourceState,
    },
    GlobalBarrier {
        queue: QueueType,
    },
    FlushBarriers {
        queue: QueueType,
    },
    Begin {
        queue: QueueType,
    },
    End {
        queue: QueueType,
    },
    Submit {
        queue: QueueType,
        signal: u64,
    },
    Wait {
        queue: QueueType,
        on: QueueType,
        value: u64,
    },
    BeginRenderPass {
        queue: QueueType,
        label: String,
        color_attachments: usize,
        has_depth_stencil: bool,
    },
    EndRenderPass {
        queue: QueueType,
    },
    SetRenderTargets {
        queue: QueueType,
        color_targets: usize,
        has_depth_stencil: bool,
    },
    ClearRenderTarget {
        queue: QueueType,
        view: ViewHandle,
    },
    ClearDepthStencil {
        queue: QueueType,
        view: ViewHandle,
    },
    SetViewport {
        queue: QueueType,
        viewport: Viewport,
    },
    CopyTexture {
        queue: QueueType,
        src: TextureHandle,
        dst: TextureHandle,
    },
    CopyBuffer {
        queue: QueueType,
        src: BufferHandle,
        dst: BufferHandle,
    },
    Dispatch {
        queue: QueueType,
        x: u32,
        y: u32,
        z: u32,
    },
    Draw {
        queue: QueueType,
        vertex_count: u32,
        instance_count: u32,
    },
}

impl RecordedCommand {
    /// Returns the queue the command was recorded on, if any.
    pub fn queue(&self) -> Option<QueueType> {
        match self {
            Self::TextureBarrier { queue, .. }
            | Self::BufferBarrier { queue, .. }
            | Self::GlobalBarrier { queue }
            | Self::FlushBarriers { queue }
            | Self::Begin { queue }
            | Self::End { queue }
            | Self::Submit { queue, .. }
            | Self::Wait { queue, .. }
            | Self::BeginRenderPass { queue, .. }
            | Self::EndRenderPass { queue }
            | Self::SetRenderTargets { queue, .. }
            | Self::ClearRenderTarget { queue, .. }
            | Self::ClearDepthStencil { queue, .. }
            | Self::SetViewport { queue, .. }
            | Self::CopyTexture { queue, .. }
            | Self::CopyBuffer { queue, .. }
            | Self::Dispatch { queue, .. }
            | Self::Draw { queue, .. } => Some(*queue),
            _ => None,
        }
    }

    /// Returns true for texture, buffer and global barriers.
    pub fn is_barrier(&self) -> bool {
        matches!(
            self,
            Self::TextureBarrier { .. } | Self::BufferBarrier { .. } | Self::GlobalBarrier { .. }
        )
    }
}

#[derive(Debug)]
struct DummyState {
    commands: Vec<RecordedCommand>,
    next_handle: u64,
    live_textures: HashSet<TextureHandle>,
    live_buffers: HashSet<BufferHandle>,
    live_views: HashSet<ViewHandle>,
    submitted: [u64; QueueType::COUNT],
    completed: [u64; QueueType::COUNT],
    auto_complete: bool,
    fail_allocations: bool,
    device_lost: bool,
}

impl DummyState {
    fn allocate_handle(&mut self) -> u64 {
        self.next_handle += 1;
        self.next_handle
    }

    fn check_allocation(&self) -> BackendResult<()> {
        if self.device_lost {
            Err(BackendError::DeviceLost)
        } else if self.fail_allocations {
            Err(BackendError::OutOfMemory)
        } else {
            Ok(())
        }
    }
}

/// Dummy GPU backend.
#[derive(Debug)]
pub struct DummyBackend {
    barrier_mode: BarrierMode,
    state: Mutex<DummyState>,
}

impl DummyBackend {
    /// Create a new dummy backend using legacy barriers.
    pub fn new() -> Self {
        Self::with_barrier_mode(BarrierMode::Legacy)
    }

    /// Create a new dummy backend reporting the given barrier model.
    pub fn with_barrier_mode(barrier_mode: BarrierMode) -> Self {
        Self {
            barrier_mode,
            state: Mutex::new(DummyState {
                commands: Vec::new(),
                next_handle: 0,
                live_textures: HashSet::new(),
                live_buffers: HashSet::new(),
                live_views: HashSet::new(),
                submitted: [0; QueueType::COUNT],
                completed: [0; QueueType::COUNT],
                auto_complete: true,
                fail_allocations: false,
                device_lost: false,
            }),
        }
    }

    /// Create a texture handle for use as an imported resource.
    ///
    /// The handle is not tracked as live and is never reported as created.
    pub fn external_texture(&self) -> TextureHandle {
        TextureHandle(self.state.lock().allocate_handle())
    }

    /// Create a buffer handle for use as an imported resource.
    pub fn external_buffer(&self) -> BufferHandle {
        BufferHandle(self.state.lock().allocate_handle())
    }

    /// Get a copy of every command recorded so far.
    pub fn commands(&self) -> Vec<RecordedCommand> {
        self.state.lock().commands.clone()
    }

    /// Take every command recorded so far, leaving the log empty.
    pub fn take_commands(&self) -> Vec<RecordedCommand> {
        std::mem::take(&mut self.state.lock().commands)
    }

    /// Number of textures currently alive.
    pub fn live_texture_count(&self) -> usize {
        self.state.lock().live_textures.len()
    }

    /// Number of buffers currently alive.
    pub fn live_buffer_count(&self) -> usize {
        self.state.lock().live_buffers.len()
    }

    /// Number of views currently alive.
    pub fn live_view_count(&self) -> usize {
        self.state.lock().live_views.len()
    }

    /// Control whether submissions complete immediately.
    pub fn set_auto_complete(&self, enabled: bool) {
        self.state.lock().auto_complete = enabled;
    }

    /// Mark everything submitted on `queue` up to `value` as completed.
    pub fn complete_up_to(&self, queue: QueueType, value: u64) {
        let mut state = self.state.lock();
        let index = queue.index();
        let value = value.min(state.submitted[index]);
        state.completed[index] = state.completed[index].max(value);
    }

    /// Mark every submission on every queue as completed.
    pub fn complete_all(&self) {
        let mut state = self.state.lock();
        state.completed = state.submitted;
    }

    /// Make every following resource creation fail with [`BackendError::OutOfMemory`].
    pub fn set_fail_allocations(&self, fail: bool) {
        self.state.lock().fail_allocations = fail;
    }

    /// Simulate device loss. Submissions and creations fail from now on.
    pub fn lose_device(&self) {
        log::trace!("DummyBackend: device lost");
        self.state.lock().device_lost = true;
    }

    fn record(&self, command: RecordedCommand) {
        log::trace!("DummyBackend: {:?}", command);
        self.state.lock().commands.push(command);
    }
}

impl Default for DummyBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl GpuBackend for DummyBackend {
    fn name(&self) -> &'static str {
        "Dummy Backend"
    }

    fn barrier_mode(&self) -> BarrierMode {
        self.barrier_mode
    }

    fn create_texture(&self, descriptor: &TextureDescriptor) -> BackendResult<TextureHandle> {
        let texture = {
            let mut state = self.state.lock();
            state.check_allocation()?;
            let texture = TextureHandle(state.allocate_handle());
            state.live_textures.insert(texture);
            texture
        };
        log::trace!(
            "DummyBackend: creating texture {:?} ({}x{}x{})",
            descriptor.label,
            descriptor.size.width,
            descriptor.size.height,
            descriptor.size.depth
        );
        self.record(RecordedCommand::CreateTexture {
            texture,
            label: descriptor.label.clone(),
        });
        Ok(texture)
    }

    fn create_buffer(&self, descriptor: &BufferDescriptor) -> BackendResult<BufferHandle> {
        let buffer = {
            let mut state = self.state.lock();
            state.check_allocation()?;
            let buffer = BufferHandle(state.allocate_handle());
            state.live_buffers.insert(buffer);
            buffer
        };
        log::trace!(
            "DummyBackend: creating buffer {:?} (size: {})",
            descriptor.label,
            descriptor.size
        );
        self.record(RecordedCommand::CreateBuffer {
            buffer,
            label: descriptor.label.clone(),
        });
        Ok(buffer)
    }

    fn destroy_texture(&self, texture: TextureHandle) {
        self.state.lock().live_textures.remove(&texture);
        self.record(RecordedCommand::DestroyTexture(texture));
    }

    fn destroy_buffer(&self, buffer: BufferHandle) {
        self.state.lock().live_buffers.remove(&buffer);
        self.record(RecordedCommand::DestroyBuffer(buffer));
    }

    fn create_texture_view(
        &self,
        texture: TextureHandle,
        descriptor: &TextureViewDesc,
    ) -> BackendResult<ViewHandle> {
        let view = {
            let mut state = self.state.lock();
            if state.device_lost {
                return Err(BackendError::DeviceLost);
            }
            let view = ViewHandle(state.allocate_handle());
            state.live_views.insert(view);
            view
        };
        self.record(RecordedCommand::CreateTextureView {
            view,
            texture,
            kind: descriptor.kind,
        });
        Ok(view)
    }

    fn create_buffer_view(
        &self,
        buffer: BufferHandle,
        descriptor: &BufferViewDesc,
    ) -> BackendResult<ViewHandle> {
        if !descriptor.kind.is_buffer_compatible() {
            return Err(BackendError::ResourceCreationFailed(format!(
                "{:?} view on a buffer",
                descriptor.kind
            )));
        }
        let view = {
            let mut state = self.state.lock();
            if state.device_lost {
                return Err(BackendError::DeviceLost);
            }
            let view = ViewHandle(state.allocate_handle());
            state.live_views.insert(view);
            view
        };
        self.record(RecordedCommand::CreateBufferView {
            view,
            buffer,
            kind: descriptor.kind,
        });
        Ok(view)
    }

    fn destroy_view(&self, view: ViewHandle) {
        self.state.lock().live_views.remove(&view);
        self.record(RecordedCommand::DestroyView(view));
    }

    fn texture_barrier(
        &self,
        queue: QueueType,
        texture: TextureHandle,
        before: ResourceState,
        after: ResourceState,
    ) {
        self.record(RecordedCommand::TextureBarrier {
            queue,
            texture,
            before,
            after,
        });
    }

    fn buffer_barrier(
        &self,
        queue: QueueType,
        buffer: BufferHandle,
        before: ResourceState,
        after: ResourceState,
    ) {
        self.record(RecordedCommand::BufferBarrier {
            queue,
            buffer,
            before,
            after,
        });
    }

    fn global_barrier(&self, queue: QueueType) {
        self.record(RecordedCommand::GlobalBarrier { queue });
    }

    fn flush_barriers(&self, queue: QueueType) {
        self.record(RecordedCommand::FlushBarriers { queue });
    }

    fn begin(&self, queue: QueueType) {
        self.record(RecordedCommand::Begin { queue });
    }

    fn end(&self, queue: QueueType) {
        self.record(RecordedCommand::End { queue });
    }

    fn submit(&self, queue: QueueType, signal: u64) -> BackendResult<()> {
        {
            let mut state = self.state.lock();
            if state.device_lost {
                return Err(BackendError::DeviceLost);
            }
            let index = queue.index();
            state.submitted[index] = signal;
            if state.auto_complete {
                state.completed[index] = signal;
            }
        }
        self.record(RecordedCommand::Submit { queue, signal });
        Ok(())
    }

    fn wait(&self, queue: QueueType, on: QueueType, value: u64) {
        self.record(RecordedCommand::Wait { queue, on, value });
    }

    fn completed_value(&self, queue: QueueType) -> u64 {
        self.state.lock().completed[queue.index()]
    }

    fn begin_render_pass(&self, queue: QueueType, descriptor: &RenderPassDesc) {
        self.record(RecordedCommand::BeginRenderPass {
            queue,
            label: descriptor.label.clone(),
            color_attachments: descriptor.color_attachments.len(),
            has_depth_stencil: descriptor.depth_stencil.is_some(),
        });
    }

    fn end_render_pass(&self, queue: QueueType) {
        self.record(RecordedCommand::EndRenderPass { queue });
    }

    fn set_render_targets(
        &self,
        queue: QueueType,
        colors: &[ViewHandle],
        depth_stencil: Option<ViewHandle>,
    ) {
        self.record(RecordedCommand::SetRenderTargets {
            queue,
            color_targets: colors.len(),
            has_depth_stencil: depth_stencil.is_some(),
        });
    }

    fn clear_render_target(&self, queue: QueueType, view: ViewHandle, _color: [f32; 4]) {
        self.record(RecordedCommand::ClearRenderTarget { queue, view });
    }

    fn clear_depth_stencil(&self, queue: QueueType, view: ViewHandle, _depth: f32, _stencil: u32) {
        self.record(RecordedCommand::ClearDepthStencil { queue, view });
    }

    fn set_viewport(&self, queue: QueueType, viewport: Viewport) {
        self.record(RecordedCommand::SetViewport { queue, viewport });
    }

    fn copy_texture(&self, queue: QueueType, src: TextureHandle, dst: TextureHandle) {
        self.record(RecordedCommand::CopyTexture { queue, src, dst });
    }

    fn copy_buffer(&self, queue: QueueType, src: BufferHandle, dst: BufferHandle) {
        self.record(RecordedCommand::CopyBuffer { queue, src, dst });
    }

    fn dispatch(&self, queue: QueueType, x: u32, y: u32, z: u32) {
        self.record(RecordedCommand::Dispatch { queue, x, y, z });
    }

    fn draw(&self, queue: QueueType, vertex_count: u32, instance_count: u32) {
        self.record(RecordedCommand::Draw {
            queue,
            vertex_count,
            instance_count,
        });
    }
}

static_assertions::assert_impl_all!(DummyBackend: Send, Sync);
