//! GPU backend abstraction layer.
//!
//! The frame graph never talks to a graphics API directly. Everything it needs
//! from the device (resource creation, views, barriers, command streams and
//! cross-queue fences) goes through the [`GpuBackend`] trait.
//!
//! # Available Backends
//!
//! - [`DummyBackend`]: records every call instead of talking to a GPU. Used by
//!   tests and benchmarks.
//!
//! # Command streams
//!
//! Each [`QueueType`] owns one command stream. The executor calls
//! [`GpuBackend::begin`] before recording, [`GpuBackend::end`] and
//! [`GpuBackend::submit`] when it closes the stream. Every submission signals
//! the queue's timeline fence with the value passed to `submit`, and
//! [`GpuBackend::completed_value`] reports how far the GPU has progressed.

pub mod dummy;
mod error;

pub use dummy::{DummyBackend, RecordedCommand};
pub use error::{BackendError, BackendResult};

use crate::graph::{LoadOp, StoreOp};
use crate::scheduler::QueueType;
use crate::types::{
    BufferDescriptor, BufferViewDesc, ResourceState, TextureDescriptor, TextureViewDesc, Viewport,
};

/// Handle to a GPU texture owned by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub u64);

/// Handle to a GPU buffer owned by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferHandle(pub u64);

/// Handle to a resource view (SRV, UAV, RTV, DSV or CBV descriptor).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ViewHandle(pub u64);

/// Handle to either kind of GPU resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceHandle {
    /// A texture.
    Texture(TextureHandle),
    /// A buffer.
    Buffer(BufferHandle),
}

/// Barrier model supported by the device, resolved once at device creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BarrierMode {
    /// Every state change is a resource transition.
    #[default]
    Legacy,
    /// Textures transition layouts; buffers only synchronize around writes.
    Enhanced,
}

/// A color attachment of a render pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorAttachment {
    /// Render target view.
    pub view: ViewHandle,
    /// Load operation.
    pub load: LoadOp,
    /// Store operation.
    pub store: StoreOp,
}

/// The depth/stencil attachment of a render pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthStencilAttachment {
    /// Depth/stencil view.
    pub view: ViewHandle,
    /// Load operation.
    pub load: LoadOp,
    /// Store operation.
    pub store: StoreOp,
    /// The attachment is not written.
    pub read_only: bool,
}

/// Descriptor for beginning a render pass.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderPassDesc {
    /// Debug label (the pass name).
    pub label: String,
    /// Color attachments in binding order.
    pub color_attachments: Vec<ColorAttachment>,
    /// Optional depth/stencil attachment.
    pub depth_stencil: Option<DepthStencilAttachment>,
    /// Viewport set for the pass.
    pub viewport: Viewport,
}

/// Contract between the frame graph and a graphics API.
///
/// All methods take `&self`; implementations use interior mutability so one
/// backend can be shared by the executor and the pass callbacks it invokes.
pub trait GpuBackend: Send + Sync {
    /// Get the backend name.
    fn name(&self) -> &'static str;

    /// Barrier model the device supports.
    fn barrier_mode(&self) -> BarrierMode;

    // --- Resource lifecycle -------------------------------------------------

    /// Create a texture.
    fn create_texture(&self, descriptor: &TextureDescriptor) -> BackendResult<TextureHandle>;

    /// Create a buffer.
    fn create_buffer(&self, descriptor: &BufferDescriptor) -> BackendResult<BufferHandle>;

    /// Destroy a texture created by [`GpuBackend::create_texture`].
    fn destroy_texture(&self, texture: TextureHandle);

    /// Destroy a buffer created by [`GpuBackend::create_buffer`].
    fn destroy_buffer(&self, buffer: BufferHandle);

    /// Create a texture view (SRV, UAV, RTV or DSV).
    fn create_texture_view(
        &self,
        texture: TextureHandle,
        descriptor: &TextureViewDesc,
    ) -> BackendResult<ViewHandle>;

    /// Create a buffer view (SRV, UAV or CBV).
    fn create_buffer_view(
        &self,
        buffer: BufferHandle,
        descriptor: &BufferViewDesc,
    ) -> BackendResult<ViewHandle>;

    /// Destroy a view.
    fn destroy_view(&self, view: ViewHandle);

    // --- Barriers -----------------------------------------------------------

    /// Queue a texture state transition.
    fn texture_barrier(
        &self,
        queue: QueueType,
        texture: TextureHandle,
        before: ResourceState,
        after: ResourceState,
    );

    /// Queue a buffer state transition.
    fn buffer_barrier(
        &self,
        queue: QueueType,
        buffer: BufferHandle,
        before: ResourceState,
        after: ResourceState,
    );

    /// Queue a global memory barrier ordering unordered-access writes.
    fn global_barrier(&self, queue: QueueType);

    /// Record every queued barrier into the command stream.
    fn flush_barriers(&self, queue: QueueType);

    // --- Command recording --------------------------------------------------

    /// Open the queue's command stream.
    fn begin(&self, queue: QueueType);

    /// Close the queue's command stream.
    fn end(&self, queue: QueueType);

    /// Submit the closed stream and signal the queue's timeline with `signal`.
    fn submit(&self, queue: QueueType, signal: u64) -> BackendResult<()>;

    /// Make `queue` wait on the GPU until `on` has reached `value`.
    fn wait(&self, queue: QueueType, on: QueueType, value: u64);

    /// Latest timeline value the GPU has completed on `queue`.
    fn completed_value(&self, queue: QueueType) -> u64;

    /// Begin a render pass.
    fn begin_render_pass(&self, queue: QueueType, descriptor: &RenderPassDesc);

    /// End the current render pass.
    fn end_render_pass(&self, queue: QueueType);

    /// Bind render targets without a render pass.
    fn set_render_targets(
        &self,
        queue: QueueType,
        colors: &[ViewHandle],
        depth_stencil: Option<ViewHandle>,
    );

    /// Clear a color target to the given RGBA value.
    fn clear_render_target(&self, queue: QueueType, view: ViewHandle, color: [f32; 4]);

    /// Clear a depth/stencil target.
    fn clear_depth_stencil(&self, queue: QueueType, view: ViewHandle, depth: f32, stencil: u32);

    /// Set the viewport.
    fn set_viewport(&self, queue: QueueType, viewport: Viewport);

    // --- Work (invoked from pass callbacks) ---------------------------------

    /// Copy a whole texture.
    fn copy_texture(&self, queue: QueueType, src: TextureHandle, dst: TextureHandle);

    /// Copy a whole buffer.
    fn copy_buffer(&self, queue: QueueType, src: BufferHandle, dst: BufferHandle);

    /// Dispatch compute work.
    fn dispatch(&self, queue: QueueType, x: u32, y: u32, z: u32);

    /// Draw non-indexed primitives.
    fn draw(&self, queue: QueueType, vertex_count: u32, instance_count: u32);
}
