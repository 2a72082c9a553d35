//! Level executor.
//!
//! Walks the levels of a [`CompiledGraph`] and records them through a
//! [`GpuBackend`]. Every level goes through the same three phases:
//!
//! | Phase | Work |
//! |-------|------|
//! | PreExecute | Cross-queue waits, resource binding and views, transitions into the level's states |
//! | Execute | Render pass setup, the pass callback, cross-queue signals |
//! | PostExecute | Transitions back to initial states, release to the pool |
//!
//! Command streams are only closed and submitted at cross-queue boundaries
//! and at the end of the frame. Each submission signals the next value of
//! its queue's timeline; released pool entries remember those values so they
//! are not reused before the GPU is done with them.
//!
//! Besides the compiled waits, the executor tracks which submission last
//! touched every resource on each queue. A barrier or pass touching a
//! resource that the other queue used in a conflicting way first waits for
//! that submission, so resources shared by both queues within one level are
//! ordered as well.
//!
//! A backend error abandons the frame: open streams are closed without being
//! submitted and bound pool entries are released.

mod barrier;
mod context;

pub use context::PassContext;

use crate::backend::{
    BackendError, BarrierMode, ColorAttachment, DepthStencilAttachment, GpuBackend, RenderPassDesc,
    ResourceHandle, ViewHandle,
};
use crate::compiler::{CompiledGraph, DependencyLevel};
use crate::error::FrameGraphError;
use crate::graph::{
    LoadOp, Pass, PassFlags, PassType, Resource, ResourceDesc, ResourceId, ResourceRegistry,
    ViewId,
};
use crate::pipeline::FramePipeline;
use crate::resources::PoolId;
use crate::scheduler::{QueueType, RetirePoint};
use crate::types::{BufferViewDesc, ClearValue, ResourceState, TextureViewDesc, ViewDesc};

/// Counters collected while executing one frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecutionStats {
    /// Dependency levels executed.
    pub levels: usize,
    /// Passes whose callbacks ran.
    pub passes_executed: usize,
    /// Passes skipped by culling.
    pub passes_culled: usize,
    /// Barriers queued, global barriers included.
    pub barriers: usize,
    /// Command stream submissions.
    pub submissions: usize,
    /// Cross-queue waits.
    pub waits: usize,
    /// Cross-queue signals.
    pub signals: usize,
    /// Transient resources created by the backend.
    pub allocations: usize,
    /// Transient resources served from the pool.
    pub pool_reuses: usize,
}

/// Backing object bound to a graph resource for the current frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Binding {
    pub(crate) handle: ResourceHandle,
    pool_id: Option<PoolId>,
}

pub(crate) struct Executor<'e> {
    backend: &'e dyn GpuBackend,
    pipeline: &'e mut FramePipeline,
    registry: &'e ResourceRegistry,
    compiled: &'e CompiledGraph,
    barrier_mode: BarrierMode,
    bindings: Vec<Option<Binding>>,
    views: Vec<Option<ViewHandle>>,
    external_views: Vec<ViewHandle>,
    states: Vec<ResourceState>,
    open: [bool; QueueType::COUNT],
    /// Absolute timeline value of every cross-queue signal, in signal order.
    signals: [Vec<u64>; QueueType::COUNT],
    /// `waited[queue][on]`: highest value of `on` that `queue` waits for.
    waited: [[u64; QueueType::COUNT]; QueueType::COUNT],
    /// Per resource and queue, the submission holding its latest access.
    accessed: Vec<[u64; QueueType::COUNT]>,
    /// Per resource and queue, the submission holding its latest write or barrier.
    written: Vec<[u64; QueueType::COUNT]>,
    stats: ExecutionStats,
}

impl<'e> Executor<'e> {
    pub(crate) fn new(
        backend: &'e dyn GpuBackend,
        pipeline: &'e mut FramePipeline,
        registry: &'e ResourceRegistry,
        compiled: &'e CompiledGraph,
    ) -> Self {
        Self {
            backend,
            pipeline,
            registry,
            compiled,
            barrier_mode: backend.barrier_mode(),
            bindings: vec![None; registry.len()],
            views: vec![None; registry.view_count()],
            external_views: Vec::new(),
            states: registry
                .resources()
                .iter()
                .map(Resource::initial_state)
                .collect(),
            open: [false; QueueType::COUNT],
            signals: Default::default(),
            waited: [[0; QueueType::COUNT]; QueueType::COUNT],
            accessed: vec![[0; QueueType::COUNT]; registry.len()],
            written: vec![[0; QueueType::COUNT]; registry.len()],
            stats: ExecutionStats {
                passes_culled: compiled.culled_count(),
                ..ExecutionStats::default()
            },
        }
    }

    /// Record and submit every level.
    pub(crate) fn run(mut self, passes: &mut [Pass<'_>]) -> Result<ExecutionStats, FrameGraphError> {
        let result = self.record(passes).and_then(|()| self.finish());
        match result {
            Ok(()) => {
                log::debug!(
                    "Executed frame {} on {}: {:?}",
                    self.pipeline.frame_index(),
                    self.backend.name(),
                    self.stats
                );
                Ok(self.stats)
            }
            Err(error) => {
                log::error!(
                    "Abandoning frame {}: {}",
                    self.pipeline.frame_index(),
                    error
                );
                self.abandon();
                Err(error)
            }
        }
    }

    fn record(&mut self, passes: &mut [Pass<'_>]) -> Result<(), FrameGraphError> {
        let compiled = self.compiled;
        for level in compiled.levels() {
            log::trace!(
                "Level {}: passes {:?}, creates {:?}, destroys {:?}",
                level.index(),
                level.passes(),
                level.creates(),
                level.destroys()
            );
            self.pre_execute(level, passes)?;
            for &pass in level.passes() {
                self.execute_pass(&mut passes[pass.index()])?;
            }
            self.post_execute(level)?;
            self.stats.levels += 1;
        }
        Ok(())
    }

    // --- PreExecute ---------------------------------------------------------

    fn pre_execute(
        &mut self,
        level: &DependencyLevel,
        passes: &[Pass<'_>],
    ) -> Result<(), FrameGraphError> {
        let compiled = self.compiled;

        // Waits go first so the level's barriers are ordered after them.
        for &pass in level.passes() {
            if let Some(relative) = compiled.sync(pass).wait_value {
                self.wait(compiled.queue_of(pass), relative)?;
            }
        }

        for &resource in level.creates() {
            self.bind(resource)?;
        }

        let mut flush = [false; QueueType::COUNT];
        for (&resource, &state) in level.states() {
            // Resources shared across queues within one level transition on
            // the queue of the first pass using them.
            let queue = level
                .passes()
                .iter()
                .find(|pass| passes[pass.index()].states().contains_key(&resource))
                .map_or(QueueType::Graphics, |&pass| compiled.queue_of(pass));
            if self.transition(queue, resource, state)? {
                flush[queue.index()] = true;
            }
        }
        self.flush_barriers(flush);
        Ok(())
    }

    fn wait(&mut self, queue: QueueType, relative: u64) -> Result<(), FrameGraphError> {
        let on = queue.other();
        let value = (relative as usize)
            .checked_sub(1)
            .and_then(|index| self.signals[on.index()].get(index))
            .copied()
            .ok_or_else(|| {
                BackendError::Internal(format!(
                    "wait on {:?} value {} precedes its signal",
                    on, relative
                ))
            })?;
        self.wait_for(queue, on, value)
    }

    /// Make `queue` wait until `on` reaches `value`, submitting `on` first if
    /// that value is still being recorded.
    fn wait_for(
        &mut self,
        queue: QueueType,
        on: QueueType,
        value: u64,
    ) -> Result<(), FrameGraphError> {
        if self.waited[queue.index()][on.index()] >= value {
            return Ok(());
        }
        if self.pipeline.timelines().last_submitted(on) < value {
            self.flush_with_barriers(on)?;
        }
        if self.pipeline.timelines().last_submitted(on) < value {
            return Err(BackendError::Internal(format!(
                "{:?} value {} was never submitted",
                on, value
            ))
            .into());
        }

        self.flush_with_barriers(queue)?;
        log::trace!("{:?} waits for {:?} to reach {}", queue, on, value);
        self.backend.wait(queue, on, value);
        self.waited[queue.index()][on.index()] = value;
        self.stats.waits += 1;
        Ok(())
    }

    /// Order an access on `queue` after conflicting accesses on the other queue.
    ///
    /// Reads wait for the other queue's writes and barriers; writes and
    /// barriers wait for every access.
    fn order_access(
        &mut self,
        queue: QueueType,
        resource: ResourceId,
        write: bool,
    ) -> Result<(), FrameGraphError> {
        let other = queue.other();
        let value = if write {
            self.accessed[resource.index()][other.index()]
        } else {
            self.written[resource.index()][other.index()]
        };
        if value > 0 {
            self.wait_for(queue, other, value)?;
        }
        Ok(())
    }

    /// Record an access on the open stream of `queue`.
    fn note_access(&mut self, queue: QueueType, resource: ResourceId, write: bool) {
        let value = self.pipeline.timelines().pending(queue);
        self.accessed[resource.index()][queue.index()] = value;
        if write {
            self.written[resource.index()][queue.index()] = value;
        }
    }

    fn bind(&mut self, id: ResourceId) -> Result<(), FrameGraphError> {
        let registry = self.registry;
        let resource = registry.get(id);
        let binding = match resource.ownership().external_handle() {
            Some(handle) => Binding {
                handle,
                pool_id: None,
            },
            None => {
                let frame = self.pipeline.frame_index();
                let pool = self.pipeline.pool_mut();
                let acquired = match resource.descriptor() {
                    ResourceDesc::Texture(desc) => pool
                        .acquire_texture(self.backend, desc, frame)
                        .map(|a| (a.id, ResourceHandle::Texture(a.handle), a.reused)),
                    ResourceDesc::Buffer(desc) => pool
                        .acquire_buffer(self.backend, desc, frame)
                        .map(|a| (a.id, ResourceHandle::Buffer(a.handle), a.reused)),
                };
                let (pool_id, handle, reused) =
                    acquired.map_err(|source| FrameGraphError::Allocation {
                        resource: resource.name().to_string(),
                        source,
                    })?;
                if reused {
                    self.stats.pool_reuses += 1;
                } else {
                    self.stats.allocations += 1;
                }
                Binding {
                    handle,
                    pool_id: Some(pool_id),
                }
            }
        };
        log::trace!("Bound '{}' to {:?}", resource.name(), binding.handle);

        self.bindings[id.index()] = Some(binding);
        self.states[id.index()] = resource.initial_state();
        self.create_views(resource, binding)
    }

    fn create_views(&mut self, resource: &Resource, binding: Binding) -> Result<(), FrameGraphError> {
        for &view in resource.views() {
            let kind = self.registry.view_entry(view).kind;
            if !kind.needs_descriptor() {
                continue;
            }
            let descriptor = match resource.descriptor() {
                ResourceDesc::Texture(desc) => ViewDesc::Texture(TextureViewDesc::new(
                    kind,
                    desc.format,
                    desc.mip_level_count,
                )),
                ResourceDesc::Buffer(desc) => {
                    ViewDesc::Buffer(BufferViewDesc::new(kind, desc.size, desc.stride))
                }
            };

            let handle = match binding.pool_id {
                Some(pool_id) => self
                    .pipeline
                    .pool_mut()
                    .view(self.backend, pool_id, descriptor)?,
                None => {
                    let handle = match (binding.handle, descriptor) {
                        (ResourceHandle::Texture(texture), ViewDesc::Texture(desc)) => {
                            self.backend.create_texture_view(texture, &desc)?
                        }
                        (ResourceHandle::Buffer(buffer), ViewDesc::Buffer(desc)) => {
                            self.backend.create_buffer_view(buffer, &desc)?
                        }
                        _ => {
                            return Err(BackendError::Internal(format!(
                                "'{}' is bound to {:?}, which does not match its descriptor",
                                resource.name(),
                                binding.handle
                            ))
                            .into())
                        }
                    };
                    self.external_views.push(handle);
                    handle
                }
            };
            self.views[view.index()] = Some(handle);
        }
        Ok(())
    }

    // --- Execute ------------------------------------------------------------

    fn execute_pass(&mut self, pass: &mut Pass<'_>) -> Result<(), FrameGraphError> {
        let id = pass.id();
        let queue = self.compiled.queue_of(id);
        for (&resource, &state) in pass.states() {
            self.order_access(queue, resource, state.is_write())?;
        }
        self.ensure_open(queue);
        for (&resource, &state) in pass.states() {
            self.note_access(queue, resource, state.is_write());
        }

        let render_pass = self.bind_targets(pass, queue);
        if let Some(mut execute) = pass.execute.take() {
            let mut ctx = PassContext {
                backend: self.backend,
                queue,
                pass_name: pass.name(),
                registry: self.registry,
                bindings: &self.bindings,
                views: &self.views,
            };
            execute(&mut ctx);
            pass.execute = Some(execute);
        }
        if render_pass {
            self.backend.end_render_pass(queue);
        }
        self.stats.passes_executed += 1;

        if let Some(relative) = self.compiled.sync(id).signal_value {
            let value = self.submit(queue)?;
            let signals = &mut self.signals[queue.index()];
            signals.push(value);
            debug_assert_eq!(signals.len() as u64, relative);
            log::trace!(
                "Pass '{}' signals {:?} at {} (relative {})",
                pass.name(),
                queue,
                value,
                relative
            );
            self.stats.signals += 1;
        }
        Ok(())
    }

    /// Bind render targets and the viewport of a graphics pass.
    ///
    /// Returns true if a render pass was begun.
    fn bind_targets(&self, pass: &Pass<'_>, queue: QueueType) -> bool {
        if pass.pass_type() != PassType::Graphics {
            return false;
        }
        let viewport = pass.viewport().unwrap_or_else(|| {
            panic!(
                "Graphics pass '{}' has no viewport; call set_viewport during setup",
                pass.name()
            )
        });
        if !pass.has_render_targets() {
            self.backend.set_viewport(queue, viewport);
            return false;
        }

        let color_attachments: Vec<ColorAttachment> = pass
            .color_targets()
            .iter()
            .map(|target| ColorAttachment {
                view: self.target_view(pass, target.view),
                load: target.load,
                store: target.store,
            })
            .collect();
        let depth_stencil = pass.depth_stencil().map(|target| DepthStencilAttachment {
            view: self.target_view(pass, target.view),
            load: target.load,
            store: target.store,
            read_only: target.read_only,
        });

        if !pass.flags().contains(PassFlags::LEGACY_RENDER_PASS) {
            self.backend.begin_render_pass(
                queue,
                &RenderPassDesc {
                    label: pass.name().to_string(),
                    color_attachments,
                    depth_stencil,
                    viewport,
                },
            );
            return true;
        }

        let colors: Vec<ViewHandle> = color_attachments.iter().map(|c| c.view).collect();
        self.backend
            .set_render_targets(queue, &colors, depth_stencil.map(|ds| ds.view));
        for attachment in &color_attachments {
            if let LoadOp::Clear(ClearValue::Color { r, g, b, a }) = attachment.load {
                self.backend
                    .clear_render_target(queue, attachment.view, [r, g, b, a]);
            }
        }
        if let Some(attachment) = depth_stencil {
            if let LoadOp::Clear(ClearValue::DepthStencil { depth, stencil }) = attachment.load {
                self.backend
                    .clear_depth_stencil(queue, attachment.view, depth, stencil);
            }
        }
        self.backend.set_viewport(queue, viewport);
        false
    }

    fn target_view(&self, pass: &Pass<'_>, view: ViewId) -> ViewHandle {
        self.views[view.index()].unwrap_or_else(|| {
            panic!(
                "Pass '{}' binds a render target with no descriptor",
                pass.name()
            )
        })
    }

    // --- PostExecute --------------------------------------------------------

    fn post_execute(&mut self, level: &DependencyLevel) -> Result<(), FrameGraphError> {
        let compiled = self.compiled;
        let registry = self.registry;

        let mut flush = [false; QueueType::COUNT];
        for &resource in level.last_uses() {
            let initial = registry.get(resource).initial_state();
            if self.states[resource.index()] == initial {
                continue;
            }
            let queue = compiled
                .lifetime(resource)
                .map_or(QueueType::Graphics, |lifetime| {
                    compiled.queue_of(lifetime.last_use)
                });
            if self.transition(queue, resource, initial)? {
                flush[queue.index()] = true;
            }
        }
        self.flush_barriers(flush);

        for &resource in level.destroys() {
            self.release(resource);
        }
        Ok(())
    }

    fn release(&mut self, resource: ResourceId) {
        let Some(binding) = self.bindings[resource.index()].take() else {
            return;
        };
        if let Some(pool_id) = binding.pool_id {
            let retire = self.retire_point();
            let frame = self.pipeline.frame_index();
            self.pipeline.pool_mut().release(pool_id, retire, frame);
            log::trace!(
                "Released '{}' to the pool (retires at {:?})",
                self.registry.get(resource).name(),
                retire
            );
        }
    }

    // --- Barriers and command streams ---------------------------------------

    /// Move a bound resource into `after`, queueing a barrier if needed.
    fn transition(
        &mut self,
        queue: QueueType,
        resource: ResourceId,
        after: ResourceState,
    ) -> Result<bool, FrameGraphError> {
        let before = self.states[resource.index()];
        if before == after && !after.contains(ResourceState::UNORDERED_ACCESS) {
            return Ok(false);
        }
        let binding = self.bindings[resource.index()].ok_or_else(|| {
            BackendError::Internal(format!(
                "'{}' is accessed outside its lifetime",
                self.registry.get(resource).name()
            ))
        })?;
        self.states[resource.index()] = after;
        if !barrier::is_required(self.barrier_mode, binding.handle, before, after) {
            return Ok(false);
        }

        self.order_access(queue, resource, true)?;
        self.ensure_open(queue);
        barrier::emit_barrier(
            self.backend,
            self.barrier_mode,
            queue,
            binding.handle,
            before,
            after,
        );
        self.note_access(queue, resource, true);
        self.stats.barriers += 1;
        Ok(true)
    }

    fn flush_barriers(&self, flush: [bool; QueueType::COUNT]) {
        for queue in QueueType::ALL {
            if flush[queue.index()] {
                self.backend.flush_barriers(queue);
            }
        }
    }

    fn ensure_open(&mut self, queue: QueueType) {
        let open = &mut self.open[queue.index()];
        if !*open {
            self.backend.begin(queue);
            *open = true;
        }
    }

    /// Close and submit the open stream of `queue`, returning the signalled value.
    fn submit(&mut self, queue: QueueType) -> Result<u64, FrameGraphError> {
        self.ensure_open(queue);
        self.backend.end(queue);
        self.open[queue.index()] = false;
        let value = self.pipeline.timelines_mut().advance(queue);
        self.backend.submit(queue, value)?;
        self.stats.submissions += 1;
        Ok(value)
    }

    fn flush(&mut self, queue: QueueType) -> Result<(), FrameGraphError> {
        if self.open[queue.index()] {
            self.submit(queue)?;
        }
        Ok(())
    }

    /// Like [`flush`](Self::flush), but records barriers still queued on the
    /// stream first. Waits can land in the middle of a barrier batch.
    fn flush_with_barriers(&mut self, queue: QueueType) -> Result<(), FrameGraphError> {
        if self.open[queue.index()] {
            self.backend.flush_barriers(queue);
        }
        self.flush(queue)
    }

    /// Timeline values covering everything recorded so far.
    fn retire_point(&self) -> RetirePoint {
        let timelines = self.pipeline.timelines();
        let value = |queue: QueueType| {
            if self.open[queue.index()] {
                timelines.pending(queue)
            } else {
                timelines.last_submitted(queue)
            }
        };
        RetirePoint::new(value(QueueType::Graphics), value(QueueType::Compute))
    }

    fn finish(&mut self) -> Result<(), FrameGraphError> {
        for queue in QueueType::ALL {
            self.flush(queue)?;
        }
        self.defer_external_views();
        Ok(())
    }

    fn abandon(&mut self) {
        for queue in QueueType::ALL {
            if self.open[queue.index()] {
                self.backend.end(queue);
                self.open[queue.index()] = false;
            }
        }
        for resource in 0..self.bindings.len() {
            self.release(ResourceId::new(resource as u32));
        }
        self.defer_external_views();
    }

    fn defer_external_views(&mut self) {
        let retire = self.retire_point();
        for view in self.external_views.drain(..) {
            self.pipeline.defer_view_destruction(retire, view);
        }
    }
}
