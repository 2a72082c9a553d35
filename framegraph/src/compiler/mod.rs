//! Frame graph compilation.
//!
//! This module turns the passes and resources of a
//! [`FrameGraph`](crate::graph::FrameGraph) into an execution plan
//! ([`CompiledGraph`]).
//!
//! # Pipeline
//!
//! 1. **Adjacency** - edges from every writer to later readers and writers,
//!    and from every reader to later writers
//! 2. **Topological sort** - depth-first post-order, reversed
//! 3. **Leveling** - longest-path distance; passes at the same distance
//!    share a [`DependencyLevel`]
//! 4. **Culling** - reference counting removes passes whose outputs are
//!    never consumed
//! 5. **Cross-queue resolution** - fence wait/signal pairs on dependency
//!    edges between the graphics and async compute queues
//! 6. **Lifetimes** - first and last use of every resource, turned into
//!    create and destroy events on levels
//!
//! Compilation is single-threaded and only touches data owned by the graph.
//!
//! # Example
//!
//! ```ignore
//! let compiled = graph.compile();
//! for level in compiled.levels() {
//!     println!("level {}: {:?}", level.index(), level.passes());
//! }
//! ```

mod async_compute;
mod cull;
mod dependency;
mod level;
mod lifetime;

pub use async_compute::PassSync;
pub use level::DependencyLevel;
pub use lifetime::Lifetime;

use crate::config::FrameGraphConfig;
use crate::graph::{Pass, PassId, ResourceId, ResourceRegistry};
use crate::scheduler::QueueType;

/// A compiled frame graph ready for execution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompiledGraph {
    adjacency: Vec<Vec<PassId>>,
    topological_order: Vec<PassId>,
    levels: Vec<DependencyLevel>,
    pass_levels: Vec<Option<usize>>,
    culled: Vec<bool>,
    queues: Vec<QueueType>,
    sync: Vec<PassSync>,
    lifetimes: Vec<Option<Lifetime>>,
}

impl CompiledGraph {
    /// Passes depending directly on `pass`, ordered by id.
    pub fn successors(&self, pass: PassId) -> &[PassId] {
        &self.adjacency[pass.index()]
    }

    /// Every declared pass in topological order, culled ones included.
    pub fn topological_order(&self) -> &[PassId] {
        &self.topological_order
    }

    /// Dependency levels in execution order.
    pub fn levels(&self) -> &[DependencyLevel] {
        &self.levels
    }

    /// Live passes in execution order (levels flattened).
    pub fn execution_order(&self) -> impl Iterator<Item = PassId> + '_ {
        self.levels
            .iter()
            .flat_map(|level| level.passes().iter().copied())
    }

    /// Level a live pass executes in, or `None` if it was culled.
    pub fn level_of(&self, pass: PassId) -> Option<usize> {
        self.pass_levels[pass.index()]
    }

    /// Check if a pass was culled.
    pub fn is_culled(&self, pass: PassId) -> bool {
        self.culled[pass.index()]
    }

    /// Number of culled passes.
    pub fn culled_count(&self) -> usize {
        self.culled.iter().filter(|&&culled| culled).count()
    }

    /// Number of passes that will execute.
    pub fn live_pass_count(&self) -> usize {
        self.culled.len() - self.culled_count()
    }

    /// Queue a pass runs on.
    pub fn queue_of(&self, pass: PassId) -> QueueType {
        self.queues[pass.index()]
    }

    /// Cross-queue synchronization of a pass.
    pub fn sync(&self, pass: PassId) -> PassSync {
        self.sync[pass.index()]
    }

    /// Number of cross-queue waits in the plan.
    pub fn sync_point_count(&self) -> usize {
        self.sync
            .iter()
            .filter(|sync| sync.wait_value.is_some())
            .count()
    }

    /// Live range of a resource, or `None` if no live pass uses it.
    pub fn lifetime(&self, resource: ResourceId) -> Option<Lifetime> {
        self.lifetimes[resource.index()]
    }
}

/// Compile passes and resources into an execution plan.
pub(crate) fn compile(
    passes: &[Pass<'_>],
    registry: &ResourceRegistry,
    config: &FrameGraphConfig,
) -> CompiledGraph {
    let adjacency = dependency::build_adjacency(passes, registry);
    let topological_order = dependency::topological_sort(&adjacency);
    let distance = level::longest_path_distances(&topological_order, &adjacency);

    let culled = if config.culling {
        cull::cull_passes(passes, registry)
    } else {
        vec![false; passes.len()]
    };

    let mut levels: Vec<DependencyLevel> = level::group_levels(
        &topological_order,
        &distance,
        &culled,
        config.parallel_levels,
    )
    .into_iter()
    .enumerate()
    .map(|(index, passes)| DependencyLevel::new(index, passes))
    .collect();

    let mut pass_levels = vec![None; passes.len()];
    for level in &mut levels {
        level.aggregate(passes);
        for &pass in level.passes() {
            pass_levels[pass.index()] = Some(level.index());
        }
    }

    let queues: Vec<QueueType> = passes
        .iter()
        .map(|pass| pass.pass_type().queue(config.async_compute))
        .collect();
    let execution_order: Vec<PassId> = levels
        .iter()
        .flat_map(|level| level.passes().iter().copied())
        .collect();
    let sync = async_compute::resolve_cross_queue(&execution_order, &adjacency, passes, &queues);

    let lifetimes = lifetime::compute_lifetimes(&levels, passes, registry.len());
    lifetime::assign_events(&mut levels, &lifetimes, registry);

    let compiled = CompiledGraph {
        adjacency,
        topological_order,
        levels,
        pass_levels,
        culled,
        queues,
        sync,
        lifetimes,
    };

    log::debug!(
        "Compiled frame graph: {} passes ({} culled), {} resources, {} levels, {} sync points",
        passes.len(),
        compiled.culled_count(),
        registry.len(),
        compiled.levels.len(),
        compiled.sync_point_count()
    );
    compiled
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{FrameGraph, LoadOp, PassFlags, PassType, ReadAccess, StoreOp};
    use crate::types::{
        BufferDescriptor, BufferUsage, ResourceState, TextureDescriptor, TextureFormat,
        TextureUsage,
    };

    fn texture() -> TextureDescriptor {
        TextureDescriptor::new_2d(128, 128, TextureFormat::Rgba8Unorm, TextureUsage::empty())
    }

    fn writer(graph: &mut FrameGraph<'_>, name: &str, output: &str, flags: PassFlags) -> PassId {
        let output = output.to_string();
        graph.add_pass(
            name,
            PassType::Compute,
            flags,
            move |builder| {
                builder.declare_texture(&output, texture());
                builder.write_texture(&output);
            },
            |_, _| {},
        )
    }

    fn transform(
        graph: &mut FrameGraph<'_>,
        name: &str,
        input: &str,
        output: &str,
        pass_type: PassType,
        flags: PassFlags,
    ) -> PassId {
        let (input, output) = (input.to_string(), output.to_string());
        graph.add_pass(
            name,
            pass_type,
            flags,
            move |builder| {
                builder.read_texture(&input, ReadAccess::AllShader);
                builder.declare_texture(&output, texture());
                builder.write_texture(&output);
            },
            |_, _| {},
        )
    }

    #[test]
    fn test_chain_levels() {
        let mut graph = FrameGraph::new();
        let a = writer(&mut graph, "a", "x", PassFlags::empty());
        let b = transform(&mut graph, "b", "x", "y", PassType::Compute, PassFlags::empty());
        let c = transform(&mut graph, "c", "y", "z", PassType::Compute, PassFlags::FORCE_NO_CULL);

        let compiled = graph.compile();
        assert_eq!(compiled.levels().len(), 3);
        assert_eq!(compiled.level_of(a), Some(0));
        assert_eq!(compiled.level_of(b), Some(1));
        assert_eq!(compiled.level_of(c), Some(2));
        assert_eq!(compiled.successors(a), &[b]);
        assert_eq!(compiled.culled_count(), 0);
    }

    #[test]
    fn test_independent_passes_share_level() {
        let mut graph = FrameGraph::new();
        let a = writer(&mut graph, "a", "x", PassFlags::FORCE_NO_CULL);
        let b = writer(&mut graph, "b", "y", PassFlags::FORCE_NO_CULL);

        let compiled = graph.compile();
        assert_eq!(compiled.levels().len(), 1);
        assert_eq!(compiled.levels()[0].passes(), &[a, b]);
    }

    #[test]
    fn test_serial_levels_when_parallelism_disabled() {
        let mut graph =
            FrameGraph::with_config(FrameGraphConfig::default().with_parallel_levels(false));
        writer(&mut graph, "a", "x", PassFlags::FORCE_NO_CULL);
        writer(&mut graph, "b", "y", PassFlags::FORCE_NO_CULL);

        let compiled = graph.compile();
        assert_eq!(compiled.levels().len(), 2);
        assert!(compiled.levels().iter().all(|level| level.passes().len() == 1));
    }

    #[test]
    fn test_write_after_write_and_write_after_read_edges() {
        let mut graph = FrameGraph::new();
        let init = writer(&mut graph, "init", "history", PassFlags::empty());
        let reader = graph.add_pass(
            "reader",
            PassType::Compute,
            PassFlags::FORCE_NO_CULL,
            |builder| {
                builder.read_texture("history", ReadAccess::AllShader);
            },
            |_, _| {},
        );
        let overwrite = graph.add_pass(
            "overwrite",
            PassType::Compute,
            PassFlags::FORCE_NO_CULL,
            |builder| {
                builder.write_texture("history");
            },
            |_, _| {},
        );

        let compiled = graph.compile();
        assert_eq!(compiled.successors(init), &[reader, overwrite]);
        assert_eq!(compiled.successors(reader), &[overwrite]);
        assert!(compiled.level_of(reader) < compiled.level_of(overwrite));
    }

    #[test]
    fn test_unconsumed_pass_is_culled_transitively() {
        let mut graph = FrameGraph::new();
        let a = writer(&mut graph, "a", "x", PassFlags::empty());
        let b = transform(&mut graph, "b", "x", "y", PassType::Compute, PassFlags::empty());

        let compiled = graph.compile();
        assert!(compiled.is_culled(a));
        assert!(compiled.is_culled(b));
        assert!(compiled.levels().is_empty());
        for resource in graph.resources() {
            assert!(graph.compiled().unwrap().lifetime(resource.id()).is_none());
        }
    }

    #[test]
    fn test_pass_without_writes_does_not_keep_producers_alive() {
        let mut graph = FrameGraph::new();
        let a = writer(&mut graph, "a", "x", PassFlags::empty());
        let sink = graph.add_pass(
            "sink",
            PassType::Compute,
            PassFlags::empty(),
            |builder| {
                builder.read_texture("x", ReadAccess::AllShader);
            },
            |_, _| {},
        );

        let compiled = graph.compile();
        assert!(compiled.is_culled(sink));
        assert!(compiled.is_culled(a));
    }

    #[test]
    fn test_culling_disabled_keeps_everything() {
        let mut graph = FrameGraph::with_config(FrameGraphConfig::default().with_culling(false));
        let a = writer(&mut graph, "a", "x", PassFlags::empty());

        let compiled = graph.compile();
        assert!(!compiled.is_culled(a));
        assert_eq!(compiled.live_pass_count(), 1);
    }

    #[test]
    fn test_imported_write_keeps_pass_alive() {
        let mut graph = FrameGraph::new();
        graph.import_buffer(
            "readback",
            crate::backend::BufferHandle(7),
            BufferDescriptor::new(64, BufferUsage::COPY_DST),
            ResourceState::COMMON,
        );
        let copy = graph.add_pass(
            "copy",
            PassType::Copy,
            PassFlags::empty(),
            |builder| {
                builder.write_copy_dst_buffer("readback");
            },
            |_, _| {},
        );

        assert!(!graph.compile().is_culled(copy));
    }

    #[test]
    fn test_shared_reads_combine_states_in_level() {
        let mut graph = FrameGraph::new();
        writer(&mut graph, "a", "x", PassFlags::empty());
        for (name, access) in [("p", ReadAccess::PixelShader), ("q", ReadAccess::NonPixelShader)] {
            graph.add_pass(
                name,
                PassType::Graphics,
                PassFlags::FORCE_NO_CULL,
                move |builder| {
                    builder.read_texture("x", access);
                    builder.set_viewport(128, 128);
                },
                |_, _| {},
            );
        }

        let x = graph.find_resource("x").unwrap();
        let compiled = graph.compile();
        assert_eq!(compiled.levels().len(), 2);
        assert_eq!(
            compiled.levels()[1].states().get(&x),
            Some(&ResourceState::ALL_SHADER_RESOURCE)
        );
        assert_eq!(compiled.levels()[1].reads(), &[x]);
    }

    #[test]
    fn test_lifetime_events() {
        let mut graph = FrameGraph::new();
        writer(&mut graph, "a", "x", PassFlags::empty());
        transform(&mut graph, "b", "x", "y", PassType::Compute, PassFlags::empty());
        graph.add_pass(
            "c",
            PassType::Graphics,
            PassFlags::FORCE_NO_CULL,
            |builder| {
                builder.read_texture("y", ReadAccess::PixelShader);
                builder.declare_texture("out", texture());
                builder.set_viewport(128, 128);
                builder.write_render_target("out", LoadOp::DontCare, StoreOp::Store);
            },
            |_, _| {},
        );

        let x = graph.find_resource("x").unwrap();
        let y = graph.find_resource("y").unwrap();
        let out = graph.find_resource("out").unwrap();
        let compiled = graph.compile();

        let levels = compiled.levels();
        assert_eq!(levels[0].creates(), &[x]);
        assert_eq!(levels[1].creates(), &[y]);
        assert_eq!(levels[1].destroys(), &[x]);
        assert_eq!(levels[2].creates(), &[out]);
        assert_eq!(levels[2].destroys(), &[y, out]);

        let lifetime = compiled.lifetime(y).unwrap();
        assert_eq!((lifetime.create_level, lifetime.destroy_level), (1, 2));
    }

    #[test]
    fn test_async_compute_sync_points() {
        let mut graph = FrameGraph::new();
        let a = writer(&mut graph, "a", "x", PassFlags::empty());
        let b = transform(&mut graph, "b", "x", "y", PassType::AsyncCompute, PassFlags::empty());
        let c = transform(&mut graph, "c", "y", "z", PassType::Graphics, PassFlags::FORCE_NO_CULL);

        let compiled = graph.compile();
        assert_eq!(compiled.queue_of(b), QueueType::Compute);
        assert_eq!(compiled.sync(a).signal_value, Some(1));
        assert_eq!(compiled.sync(b).wait_value, Some(1));
        assert_eq!(compiled.sync(b).signal_value, Some(1));
        assert_eq!(compiled.sync(c).wait_value, Some(1));
        assert_eq!(compiled.sync_point_count(), 2);
    }

    #[test]
    fn test_async_compute_disabled_runs_on_graphics() {
        let mut graph =
            FrameGraph::with_config(FrameGraphConfig::default().with_async_compute(false));
        writer(&mut graph, "a", "x", PassFlags::empty());
        let b = transform(&mut graph, "b", "x", "y", PassType::AsyncCompute, PassFlags::FORCE_NO_CULL);

        let compiled = graph.compile();
        assert_eq!(compiled.queue_of(b), QueueType::Graphics);
        assert_eq!(compiled.sync_point_count(), 0);
    }

    #[test]
    fn test_contiguous_async_run_uses_one_fence_pair() {
        let mut graph = FrameGraph::new();
        writer(&mut graph, "a", "x", PassFlags::empty());
        let b1 = transform(&mut graph, "b1", "x", "y1", PassType::AsyncCompute, PassFlags::empty());
        let b2 = transform(&mut graph, "b2", "y1", "y2", PassType::AsyncCompute, PassFlags::empty());
        let c = transform(&mut graph, "c", "y2", "z", PassType::Graphics, PassFlags::FORCE_NO_CULL);

        let compiled = graph.compile();
        assert_eq!(compiled.sync(b1).wait_value, Some(1));
        assert_eq!(compiled.sync(b1).signal_value, None);
        assert_eq!(compiled.sync(b2).wait_value, None);
        assert_eq!(compiled.sync(b2).signal_value, Some(1));
        assert_eq!(compiled.sync(c).wait_value, Some(1));
    }

    fn node(
        graph: &mut FrameGraph<'_>,
        name: &str,
        pass_type: PassType,
        reads: &[&str],
        writes: &[&str],
        flags: PassFlags,
    ) -> PassId {
        let reads: Vec<String> = reads.iter().map(|name| name.to_string()).collect();
        let writes: Vec<String> = writes.iter().map(|name| name.to_string()).collect();
        graph.add_pass(
            name,
            pass_type,
            flags,
            move |builder| {
                for input in &reads {
                    builder.read_texture(input, ReadAccess::AllShader);
                }
                for output in &writes {
                    builder.declare_texture(output, texture());
                    builder.write_texture(output);
                }
            },
            |_, _| {},
        )
    }

    #[test]
    fn test_wait_on_producer_outside_the_async_run() {
        // `a1` starts the async run in the producer's level; `a2` still
        // depends on the graphics producer.
        let mut graph = FrameGraph::new();
        let g = node(&mut graph, "g", PassType::Graphics, &[], &["r"], PassFlags::empty());
        let a1 = node(&mut graph, "a1", PassType::AsyncCompute, &[], &["y"], PassFlags::empty());
        let a2 = node(
            &mut graph,
            "a2",
            PassType::AsyncCompute,
            &["r", "y"],
            &["z"],
            PassFlags::empty(),
        );
        let c = node(&mut graph, "c", PassType::Graphics, &["z"], &[], PassFlags::FORCE_NO_CULL);

        let compiled = graph.compile();
        assert_eq!(compiled.level_of(g), compiled.level_of(a1));
        assert!(compiled.level_of(g) < compiled.level_of(a2));
        assert_eq!(compiled.sync(g).signal_value, Some(1));
        assert_eq!(compiled.sync(a1).wait_value, None);
        assert_eq!(compiled.sync(a2).wait_value, Some(1));
        assert_eq!(compiled.sync(a2).signal_value, Some(1));
        assert_eq!(compiled.sync(c).wait_value, Some(1));
        assert_eq!(compiled.sync_point_count(), 2);
    }

    #[test]
    fn test_wait_on_async_pass_sharing_the_consumer_level() {
        let mut graph = FrameGraph::new();
        let a1 = node(&mut graph, "a1", PassType::AsyncCompute, &[], &["y"], PassFlags::empty());
        let a0 = node(&mut graph, "a0", PassType::AsyncCompute, &[], &["q"], PassFlags::empty());
        let a2 = node(
            &mut graph,
            "a2",
            PassType::AsyncCompute,
            &["q"],
            &["w"],
            PassFlags::FORCE_NO_CULL,
        );
        let g = node(&mut graph, "g", PassType::Graphics, &["y"], &[], PassFlags::FORCE_NO_CULL);

        let compiled = graph.compile();
        assert_eq!(compiled.level_of(a2), compiled.level_of(g));
        assert!(compiled.level_of(a1) < compiled.level_of(g));
        assert_eq!(compiled.sync(a1).signal_value, Some(1));
        assert_eq!(compiled.sync(g).wait_value, Some(1));
        assert_eq!(compiled.sync(a0).signal_value, None);
        assert_eq!(compiled.sync(a2).wait_value, None);
        assert_eq!(compiled.sync(a2).signal_value, None);
        assert_eq!(compiled.sync_point_count(), 1);
    }

    #[test]
    fn test_fan_out_waits_once_and_signals_from_last_pass() {
        let mut graph = FrameGraph::new();
        let p = node(&mut graph, "p", PassType::Graphics, &[], &["x"], PassFlags::empty());
        let lights: Vec<PassId> = ["l0", "l1", "l2"]
            .iter()
            .map(|name| {
                let output = format!("{name}_out");
                node(
                    &mut graph,
                    name,
                    PassType::AsyncCompute,
                    &["x"],
                    &[output.as_str()],
                    PassFlags::empty(),
                )
            })
            .collect();
        let gather = node(
            &mut graph,
            "gather",
            PassType::Graphics,
            &["l0_out", "l1_out", "l2_out"],
            &[],
            PassFlags::FORCE_NO_CULL,
        );

        let compiled = graph.compile();
        assert_eq!(compiled.sync(p).signal_value, Some(1));
        assert_eq!(compiled.sync(lights[0]).wait_value, Some(1));
        assert_eq!(compiled.sync(lights[1]).wait_value, None);
        assert_eq!(compiled.sync(lights[2]).wait_value, None);
        assert_eq!(compiled.sync(lights[2]).signal_value, Some(1));
        assert_eq!(compiled.sync(gather).wait_value, Some(1));
    }
}
