//! Execution context handed to pass callbacks.

use crate::backend::{BufferHandle, GpuBackend, ResourceHandle, TextureHandle, ViewHandle};
use crate::graph::{ResourceRegistry, ViewId};
use crate::scheduler::QueueType;

use super::Binding;

/// What a pass callback sees while it records work.
///
/// Resolves the [`ViewId`]s returned by the pass's setup callback into
/// backend handles and records work on the pass's queue.
pub struct PassContext<'c> {
    pub(super) backend: &'c dyn GpuBackend,
    pub(super) queue: QueueType,
    pub(super) pass_name: &'c str,
    pub(super) registry: &'c ResourceRegistry,
    pub(super) bindings: &'c [Option<Binding>],
    pub(super) views: &'c [Option<ViewHandle>],
}

impl<'c> PassContext<'c> {
    /// The backend, for work the context has no shortcut for.
    pub fn backend(&self) -> &'c dyn GpuBackend {
        self.backend
    }

    /// Queue the pass records on.
    pub fn queue(&self) -> QueueType {
        self.queue
    }

    /// Name of the executing pass.
    pub fn pass_name(&self) -> &str {
        self.pass_name
    }

    fn resolve(&self, view: ViewId) -> ResourceHandle {
        let resource = self.registry.view_entry(view).resource;
        match self.bindings.get(resource.index()).copied().flatten() {
            Some(binding) => binding.handle,
            None => panic!(
                "Pass '{}' uses resource '{}' outside its lifetime",
                self.pass_name,
                self.registry.get(resource).name()
            ),
        }
    }

    /// Backing texture of a view.
    ///
    /// # Panics
    ///
    /// Panics if the view refers to a buffer.
    pub fn texture(&self, view: ViewId) -> TextureHandle {
        match self.resolve(view) {
            ResourceHandle::Texture(texture) => texture,
            ResourceHandle::Buffer(_) => {
                panic!("Pass '{}' resolves a buffer view as a texture", self.pass_name)
            }
        }
    }

    /// Backing buffer of a view.
    ///
    /// # Panics
    ///
    /// Panics if the view refers to a texture.
    pub fn buffer(&self, view: ViewId) -> BufferHandle {
        match self.resolve(view) {
            ResourceHandle::Buffer(buffer) => buffer,
            ResourceHandle::Texture(_) => {
                panic!("Pass '{}' resolves a texture view as a buffer", self.pass_name)
            }
        }
    }

    /// Backend descriptor of a view.
    ///
    /// # Panics
    ///
    /// Panics for copy, vertex, index and indirect accesses, which bind the
    /// resource itself rather than a descriptor.
    pub fn view(&self, view: ViewId) -> ViewHandle {
        match self.views.get(view.index()).copied().flatten() {
            Some(handle) => handle,
            None => panic!(
                "Pass '{}' requested a descriptor for a view that has none",
                self.pass_name
            ),
        }
    }

    /// Copy a whole texture on the pass's queue.
    pub fn copy_texture(&self, src: TextureHandle, dst: TextureHandle) {
        self.backend.copy_texture(self.queue, src, dst);
    }

    /// Copy a whole buffer on the pass's queue.
    pub fn copy_buffer(&self, src: BufferHandle, dst: BufferHandle) {
        self.backend.copy_buffer(self.queue, src, dst);
    }

    /// Dispatch compute work on the pass's queue.
    pub fn dispatch(&self, x: u32, y: u32, z: u32) {
        self.backend.dispatch(self.queue, x, y, z);
    }

    /// Draw on the pass's queue.
    pub fn draw(&self, vertex_count: u32, instance_count: u32) {
        self.backend.draw(self.queue, vertex_count, instance_count);
    }
}
