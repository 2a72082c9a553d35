//! The setup-time API passes use to declare their resource accesses.

use crate::types::{BufferDescriptor, ResourceState, TextureDescriptor, Viewport};

use super::access::{BufferAccess, ReadAccess, TextureAccess};
use super::resource::{Ownership, ResourceDesc, ResourceRegistry};
use super::{ColorTarget, DepthStencilTarget, LoadOp, Pass, ResourceId, StoreOp, ViewId};

/// Declares what a pass creates, reads and writes.
///
/// Handed to the setup callback of [`FrameGraph::add_pass`](super::FrameGraph::add_pass).
/// Every access call resolves the resource by name, accumulates the bind
/// flags and GPU state the access needs, records the pass/resource edge and
/// returns a [`ViewId`] the execute callback resolves through its
/// [`PassContext`](crate::executor::PassContext).
///
/// All methods panic on contract violations: unknown names, texture calls on
/// buffers (and vice versa), reading a transient resource nothing has written
/// yet, or combining a write state with any other state in one pass.
///
/// # Example
///
/// ```ignore
/// graph.add_pass("lighting", PassType::Graphics, PassFlags::empty(),
///     |builder| {
///         builder.declare_texture("hdr", hdr_desc);
///         builder.set_viewport(1920, 1080);
///         LightingData {
///             albedo: builder.read_texture("gbuffer.albedo", ReadAccess::PixelShader),
///             output: builder.write_render_target("hdr", LoadOp::DontCare, StoreOp::Store),
///         }
///     },
///     |data, ctx| ctx.draw(3, 1),
/// );
/// ```
pub struct PassBuilder<'g, 'a> {
    registry: &'g mut ResourceRegistry,
    pass: &'g mut Pass<'a>,
}

impl<'g, 'a> PassBuilder<'g, 'a> {
    pub(crate) fn new(registry: &'g mut ResourceRegistry, pass: &'g mut Pass<'a>) -> Self {
        Self { registry, pass }
    }

    /// Name of the pass being set up.
    pub fn pass_name(&self) -> &str {
        self.pass.name()
    }

    // ========================================================================
    // Declarations
    // ========================================================================

    /// Declare a transient texture created by this pass.
    ///
    /// # Panics
    ///
    /// Panics if `name` is already declared.
    pub fn declare_texture(&mut self, name: &str, descriptor: TextureDescriptor) -> ResourceId {
        self.declare(name, ResourceDesc::Texture(descriptor))
    }

    /// Declare a transient buffer created by this pass.
    ///
    /// # Panics
    ///
    /// Panics if `name` is already declared.
    pub fn declare_buffer(&mut self, name: &str, descriptor: BufferDescriptor) -> ResourceId {
        self.declare(name, ResourceDesc::Buffer(descriptor))
    }

    fn declare(&mut self, name: &str, desc: ResourceDesc) -> ResourceId {
        let id = self.registry.insert(
            name.to_string(),
            desc,
            Ownership::Transient,
            ResourceState::COMMON,
            Some(self.pass.id()),
        );
        self.pass.creates.push(id);
        id
    }

    pub(crate) fn register_export_target(
        &mut self,
        name: String,
        desc: ResourceDesc,
        ownership: Ownership,
        state: ResourceState,
    ) -> ResourceId {
        self.registry.insert(name, desc, ownership, state, None)
    }

    // ========================================================================
    // Texture accesses
    // ========================================================================

    /// Read a texture as a shader resource.
    pub fn read_texture(&mut self, name: &str, access: ReadAccess) -> ViewId {
        self.access_texture(name, TextureAccess::ShaderRead(access))
    }

    /// Read and write a texture through an unordered access view.
    pub fn write_texture(&mut self, name: &str) -> ViewId {
        self.access_texture(name, TextureAccess::StorageWrite)
    }

    /// Bind a texture as the next color render target.
    pub fn write_render_target(&mut self, name: &str, load: LoadOp, store: StoreOp) -> ViewId {
        let view = self.access_texture(name, TextureAccess::RenderTarget);
        let resource = self.registry.view_entry(view).resource;
        self.pass.color_targets.push(ColorTarget {
            resource,
            view,
            load,
            store,
        });
        view
    }

    /// Bind a texture as the writable depth/stencil target.
    pub fn write_depth_stencil(&mut self, name: &str, load: LoadOp, store: StoreOp) -> ViewId {
        let view = self.access_texture(name, TextureAccess::DepthStencilWrite);
        self.set_depth_stencil(view, load, store, false);
        view
    }

    /// Bind a texture as a read-only depth/stencil target.
    pub fn read_depth_stencil(&mut self, name: &str, load: LoadOp) -> ViewId {
        let view = self.access_texture(name, TextureAccess::DepthStencilRead);
        self.set_depth_stencil(view, load, StoreOp::Store, true);
        view
    }

    /// Read a texture as a copy source.
    pub fn read_copy_src_texture(&mut self, name: &str) -> ViewId {
        self.access_texture(name, TextureAccess::CopySource)
    }

    /// Write a texture as a copy destination.
    pub fn write_copy_dst_texture(&mut self, name: &str) -> ViewId {
        self.access_texture(name, TextureAccess::CopyDest)
    }

    // ========================================================================
    // Buffer accesses
    // ========================================================================

    /// Read a buffer as a shader resource.
    pub fn read_buffer(&mut self, name: &str, access: ReadAccess) -> ViewId {
        self.access_buffer(name, BufferAccess::ShaderRead(access))
    }

    /// Read and write a buffer through an unordered access view.
    pub fn write_buffer(&mut self, name: &str) -> ViewId {
        self.access_buffer(name, BufferAccess::StorageWrite)
    }

    /// Read a buffer as a copy source.
    pub fn read_copy_src_buffer(&mut self, name: &str) -> ViewId {
        self.access_buffer(name, BufferAccess::CopySource)
    }

    /// Write a buffer as a copy destination.
    pub fn write_copy_dst_buffer(&mut self, name: &str) -> ViewId {
        self.access_buffer(name, BufferAccess::CopyDest)
    }

    /// Read a buffer as indirect draw/dispatch arguments.
    pub fn read_indirect_args_buffer(&mut self, name: &str) -> ViewId {
        self.access_buffer(name, BufferAccess::IndirectArgs)
    }

    /// Read a buffer as vertex input.
    pub fn read_vertex_buffer(&mut self, name: &str) -> ViewId {
        self.access_buffer(name, BufferAccess::Vertex)
    }

    /// Read a buffer as index input.
    pub fn read_index_buffer(&mut self, name: &str) -> ViewId {
        self.access_buffer(name, BufferAccess::Index)
    }

    /// Read a buffer as a constant buffer.
    pub fn read_constant_buffer(&mut self, name: &str) -> ViewId {
        self.access_buffer(name, BufferAccess::Constant)
    }

    // ========================================================================
    // Pass state
    // ========================================================================

    /// Set the viewport. Mandatory for `Graphics` passes.
    pub fn set_viewport(&mut self, width: u32, height: u32) {
        self.pass.viewport = Some(Viewport::new(width, height));
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn resolve(&self, name: &str) -> ResourceId {
        self.registry.lookup(name).unwrap_or_else(|| {
            panic!(
                "Pass '{}' accesses undeclared resource '{}'",
                self.pass.name(),
                name
            )
        })
    }

    fn access_texture(&mut self, name: &str, access: TextureAccess) -> ViewId {
        let id = self.resolve(name);
        let resource = self.registry.get_mut(id);
        let transient = !resource.ownership().is_external();
        match resource.desc_mut() {
            ResourceDesc::Texture(desc) => {
                if transient {
                    desc.usage |= access.usage();
                }
            }
            ResourceDesc::Buffer(_) => panic!(
                "Pass '{}' requests an unsupported {:?} view of buffer '{}'",
                self.pass.name(),
                access.view_kind(),
                name
            ),
        }
        self.record(id, access.state(), access.is_write());
        self.registry.view(id, access.view_kind())
    }

    fn access_buffer(&mut self, name: &str, access: BufferAccess) -> ViewId {
        let id = self.resolve(name);
        let resource = self.registry.get_mut(id);
        let transient = !resource.ownership().is_external();
        match resource.desc_mut() {
            ResourceDesc::Buffer(desc) => {
                if transient {
                    desc.usage |= access.usage();
                }
            }
            ResourceDesc::Texture(_) => panic!(
                "Pass '{}' uses texture '{}' as a buffer",
                self.pass.name(),
                name
            ),
        }
        self.record(id, access.state(), access.is_write());
        self.registry.view(id, access.view_kind())
    }

    fn record(&mut self, id: ResourceId, state: ResourceState, is_write: bool) {
        let pass_id = self.pass.id();
        let resource = self.registry.get_mut(id);

        if !is_write && resource.ownership() == Ownership::Transient {
            assert!(
                !resource.writers().is_empty(),
                "Pass '{}' reads '{}' before any pass writes it",
                self.pass.name(),
                resource.name()
            );
        }

        let combined = self.pass.state_of(id).unwrap_or(ResourceState::COMMON) | state;
        assert!(
            combined.is_valid_combination(),
            "Pass '{}' combines write state {:?} on '{}'",
            self.pass.name(),
            combined,
            resource.name()
        );
        self.pass.states.insert(id, combined);

        if is_write {
            resource.add_writer(pass_id);
            if !self.pass.writes.contains(&id) {
                self.pass.writes.push(id);
            }
        } else {
            resource.add_reader(pass_id);
            if !self.pass.reads.contains(&id) {
                self.pass.reads.push(id);
            }
        }
    }

    fn set_depth_stencil(&mut self, view: ViewId, load: LoadOp, store: StoreOp, read_only: bool) {
        assert!(
            self.pass.depth_stencil.is_none(),
            "Pass '{}' binds more than one depth/stencil target",
            self.pass.name()
        );
        let resource = self.registry.view_entry(view).resource;
        self.pass.depth_stencil = Some(DepthStencilTarget {
            resource,
            view,
            load,
            store,
            read_only,
        });
    }
}
