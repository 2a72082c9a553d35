//! Frame graph construction.
//!
//! A [`FrameGraph`] is a declarative description of one frame's GPU work:
//! named textures and buffers, and passes that read and write them. Passes
//! are added with a setup callback, which runs immediately and declares the
//! pass's accesses through a [`PassBuilder`], and an execute callback, which
//! is deferred until the compiled graph is executed.
//!
//! # Architecture
//!
//! | Stage | Type | Purpose |
//! |-------|------|---------|
//! | Declare | [`FrameGraph`], [`PassBuilder`] | Register resources and passes |
//! | Compile | [`CompiledGraph`](crate::compiler::CompiledGraph) | Order, level, cull, schedule |
//! | Execute | [`PassContext`](crate::executor::PassContext) | Barriers, allocation, dispatch |
//! | Frame | [`FramePipeline`](crate::pipeline::FramePipeline) | Pool and timelines across frames |
//!
//! # Example
//!
//! ```ignore
//! use redlilium_framegraph::*;
//!
//! let mut graph = FrameGraph::new();
//! graph.import_texture("backbuffer", swapchain_image, backbuffer_desc, ResourceState::PRESENT);
//!
//! graph.add_pass("scene", PassType::Graphics, PassFlags::empty(),
//!     |builder| {
//!         builder.declare_texture("color", color_desc);
//!         builder.set_viewport(1920, 1080);
//!         builder.write_render_target("color", LoadOp::clear_color(0.0, 0.0, 0.0, 1.0), StoreOp::Store)
//!     },
//!     |_target, ctx| ctx.draw(3, 1),
//! );
//! graph.add_pass("present", PassType::Copy, PassFlags::empty(),
//!     |builder| {
//!         (builder.read_copy_src_texture("color"), builder.write_copy_dst_texture("backbuffer"))
//!     },
//!     |&(src, dst), ctx| ctx.copy_texture(ctx.texture(src), ctx.texture(dst)),
//! );
//!
//! graph.compile();
//! let stats = graph.execute(&backend, &mut pipeline)?;
//! pipeline.end_frame(&backend);
//! ```

mod access;
mod builder;
mod dump;
mod pass;
mod resource;
mod target;

pub use access::{BufferAccess, ReadAccess, TextureAccess};
pub use builder::PassBuilder;
pub use pass::{Pass, PassFlags, PassType};
pub use resource::{Ownership, Resource, ResourceDesc};
pub use target::{ColorTarget, DepthStencilTarget, LoadOp, StoreOp};

pub(crate) use resource::ResourceRegistry;

use crate::backend::{BufferHandle, GpuBackend, ResourceHandle, TextureHandle};
use crate::compiler::{self, CompiledGraph};
use crate::config::FrameGraphConfig;
use crate::error::FrameGraphError;
use crate::executor::{ExecutionStats, Executor, PassContext};
use crate::pipeline::FramePipeline;
use crate::types::{BufferDescriptor, ResourceState, TextureDescriptor};

/// Handle to a pass in a frame graph.
///
/// `PassId` is `Copy` and cheap to pass around. It is only valid within the
/// `FrameGraph` that created it, until the graph is cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PassId(u32);

impl PassId {
    pub(crate) fn new(index: u32) -> Self {
        Self(index)
    }

    /// Get the dense index of the pass (its declaration order).
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Handle to a resource in a frame graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(u32);

impl ResourceId {
    pub(crate) fn new(index: u32) -> Self {
        Self(index)
    }

    /// Get the dense index of the resource.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Handle to a view requested by a pass during setup.
///
/// Identical `(resource, view kind)` requests share one id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ViewId(u32);

impl ViewId {
    pub(crate) fn new(index: u32) -> Self {
        Self(index)
    }

    /// Get the dense index of the view.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Per-frame description of GPU work.
///
/// Build the graph, [`compile`](Self::compile) it once, then
/// [`execute`](Self::execute) it. Call [`clear`](Self::clear) to reuse the
/// instance for the next frame.
pub struct FrameGraph<'a> {
    config: FrameGraphConfig,
    registry: ResourceRegistry,
    passes: Vec<Pass<'a>>,
    compiled: Option<CompiledGraph>,
}

impl<'a> FrameGraph<'a> {
    /// Create an empty graph with the default configuration.
    pub fn new() -> Self {
        Self::with_config(FrameGraphConfig::default())
    }

    /// Create an empty graph with the given configuration.
    pub fn with_config(config: FrameGraphConfig) -> Self {
        Self {
            config,
            registry: ResourceRegistry::default(),
            passes: Vec::new(),
            compiled: None,
        }
    }

    /// Get the configuration.
    pub fn config(&self) -> &FrameGraphConfig {
        &self.config
    }

    /// Add a pass.
    ///
    /// `setup` runs immediately and declares the pass's accesses; whatever it
    /// returns is handed to `execute` when the compiled graph runs.
    ///
    /// # Panics
    ///
    /// Panics if the graph is already compiled, or on any contract violation
    /// raised by the [`PassBuilder`].
    pub fn add_pass<D, S, E>(
        &mut self,
        name: impl Into<String>,
        pass_type: PassType,
        flags: PassFlags,
        setup: S,
        mut execute: E,
    ) -> PassId
    where
        D: 'a,
        S: FnOnce(&mut PassBuilder<'_, 'a>) -> D,
        E: FnMut(&D, &mut PassContext<'_>) + 'a,
    {
        let name = name.into();
        assert!(
            self.compiled.is_none(),
            "Cannot add pass '{}' to a compiled graph; call clear() first",
            name
        );

        let id = PassId::new(self.passes.len() as u32);
        let mut pass = Pass::new(id, name, pass_type, flags);
        let data = {
            let mut builder = PassBuilder::new(&mut self.registry, &mut pass);
            setup(&mut builder)
        };
        if !pass.is_cullable() && pass.reads.is_empty() && pass.writes.is_empty() {
            log::warn!(
                "Pass '{}' is marked FORCE_NO_CULL but accesses no resources",
                pass.name()
            );
        }
        pass.execute = Some(Box::new(move |ctx: &mut PassContext<'_>| {
            execute(&data, ctx)
        }));
        self.passes.push(pass);
        id
    }

    /// Import an externally owned texture.
    ///
    /// The texture is assumed to be in `initial_state` when the frame starts
    /// and is transitioned back to it after its last use. It is never pooled
    /// or destroyed by the graph.
    pub fn import_texture(
        &mut self,
        name: &str,
        texture: TextureHandle,
        descriptor: TextureDescriptor,
        initial_state: ResourceState,
    ) -> ResourceId {
        self.registry.insert(
            name.to_string(),
            ResourceDesc::Texture(descriptor),
            Ownership::Imported(ResourceHandle::Texture(texture)),
            initial_state,
            None,
        )
    }

    /// Import an externally owned buffer.
    pub fn import_buffer(
        &mut self,
        name: &str,
        buffer: BufferHandle,
        descriptor: BufferDescriptor,
        initial_state: ResourceState,
    ) -> ResourceId {
        self.registry.insert(
            name.to_string(),
            ResourceDesc::Buffer(descriptor),
            Ownership::Imported(ResourceHandle::Buffer(buffer)),
            initial_state,
            None,
        )
    }

    /// Copy the current contents of texture `name` into an external texture.
    ///
    /// Appends a non-cullable copy pass named `Export {name}` writing a
    /// `{name}.export` target. The target is left in `final_state`.
    pub fn export_texture(
        &mut self,
        name: &str,
        target: TextureHandle,
        final_state: ResourceState,
    ) -> PassId {
        let desc = self.export_source(name);
        assert!(desc.is_texture(), "Cannot export buffer '{}' as a texture", name);
        self.add_export_pass(name, desc, ResourceHandle::Texture(target), final_state)
    }

    /// Copy the current contents of buffer `name` into an external buffer.
    pub fn export_buffer(
        &mut self,
        name: &str,
        target: BufferHandle,
        final_state: ResourceState,
    ) -> PassId {
        let desc = self.export_source(name);
        assert!(desc.is_buffer(), "Cannot export texture '{}' as a buffer", name);
        self.add_export_pass(name, desc, ResourceHandle::Buffer(target), final_state)
    }

    fn export_source(&self, name: &str) -> ResourceDesc {
        let id = self
            .registry
            .lookup(name)
            .unwrap_or_else(|| panic!("Cannot export undeclared resource '{}'", name));
        self.registry.get(id).descriptor().clone()
    }

    fn add_export_pass(
        &mut self,
        name: &str,
        desc: ResourceDesc,
        target: ResourceHandle,
        final_state: ResourceState,
    ) -> PassId {
        let target_name = format!("{name}.export");
        let is_texture = desc.is_texture();
        self.add_pass(
            format!("Export {name}"),
            PassType::Copy,
            PassFlags::FORCE_NO_CULL,
            |builder| {
                builder.register_export_target(
                    target_name.clone(),
                    desc,
                    Ownership::ExportTarget(target),
                    final_state,
                );
                if is_texture {
                    (
                        builder.read_copy_src_texture(name),
                        builder.write_copy_dst_texture(&target_name),
                    )
                } else {
                    (
                        builder.read_copy_src_buffer(name),
                        builder.write_copy_dst_buffer(&target_name),
                    )
                }
            },
            move |&(src, dst), ctx| {
                if is_texture {
                    ctx.copy_texture(ctx.texture(src), ctx.texture(dst));
                } else {
                    ctx.copy_buffer(ctx.buffer(src), ctx.buffer(dst));
                }
            },
        )
    }

    /// Compile the graph into an execution plan.
    ///
    /// Compiling twice returns the existing plan.
    pub fn compile(&mut self) -> &CompiledGraph {
        self.compiled
            .get_or_insert_with(|| compiler::compile(&self.passes, &self.registry, &self.config))
    }

    /// Get the compiled plan, if [`compile`](Self::compile) has run.
    pub fn compiled(&self) -> Option<&CompiledGraph> {
        self.compiled.as_ref()
    }

    /// Execute the compiled graph.
    ///
    /// Records every live pass level by level, allocating transient resources
    /// from `pipeline`'s pool and inserting barriers and cross-queue
    /// synchronization. On error the in-flight frame is abandoned.
    ///
    /// # Panics
    ///
    /// Panics if the graph has not been compiled, or if a `Graphics` pass has
    /// no viewport.
    pub fn execute(
        &mut self,
        backend: &dyn GpuBackend,
        pipeline: &mut FramePipeline,
    ) -> Result<ExecutionStats, FrameGraphError> {
        let compiled = self
            .compiled
            .as_ref()
            .unwrap_or_else(|| panic!("FrameGraph::execute called before compile"));
        Executor::new(backend, pipeline, &self.registry, compiled).run(&mut self.passes)
    }

    /// Get all passes in declaration order.
    pub fn passes(&self) -> &[Pass<'a>] {
        &self.passes
    }

    /// Get a pass by id.
    pub fn pass(&self, id: PassId) -> &Pass<'a> {
        &self.passes[id.index()]
    }

    /// Get the number of passes.
    pub fn pass_count(&self) -> usize {
        self.passes.len()
    }

    /// Get all resources in declaration order.
    pub fn resources(&self) -> &[Resource] {
        self.registry.resources()
    }

    /// Get a resource by id.
    pub fn resource(&self, id: ResourceId) -> &Resource {
        self.registry.get(id)
    }

    /// Find a resource by name.
    pub fn find_resource(&self, name: &str) -> Option<ResourceId> {
        self.registry.lookup(name)
    }

    /// Render the graph as Graphviz DOT for offline inspection.
    ///
    /// Includes levels and culling decisions once the graph is compiled.
    pub fn dump_dot(&self) -> String {
        dump::dump_dot(&self.passes, &self.registry, self.compiled.as_ref())
    }

    /// Remove all passes and resources so the graph can be rebuilt.
    pub fn clear(&mut self) {
        self.passes.clear();
        self.registry.clear();
        self.compiled = None;
    }
}

impl Default for FrameGraph<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for FrameGraph<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameGraph")
            .field("config", &self.config)
            .field("passes", &self.passes.len())
            .field("resources", &self.registry.len())
            .field("compiled", &self.compiled.is_some())
            .finish()
    }
}
