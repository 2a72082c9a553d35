//! Executor behavior: render passes, barriers, command streams and failures.

mod common;

use std::sync::Arc;

use parking_lot::Mutex;
use rstest::rstest;

use common::{
    add_producer, color_texture, count, depth_texture, init_logging, new_graph, position,
    run_frame, storage_buffer, submissions,
};
use redlilium_framegraph::backend::{BufferHandle, TextureHandle};
use redlilium_framegraph::{
    BackendError, BarrierMode, DummyBackend, FrameGraph, FrameGraphConfig, FrameGraphError,
    FramePipeline, LoadOp, PassFlags, PassType, PoolConfig, QueueType, ReadAccess,
    RecordedCommand, ResourceState, StoreOp,
};

fn add_scene_pass(graph: &mut FrameGraph<'_>, flags: PassFlags) {
    graph.add_pass(
        "scene",
        PassType::Graphics,
        flags | PassFlags::FORCE_NO_CULL,
        |builder| {
            builder.declare_texture("color", color_texture());
            builder.declare_texture("depth", depth_texture());
            builder.set_viewport(256, 256);
            builder.write_render_target("color", LoadOp::clear_color(0.0, 0.0, 0.0, 1.0), StoreOp::Store);
            builder.write_depth_stencil("depth", LoadOp::clear_depth(1.0), StoreOp::DontCare);
        },
        |_, ctx| ctx.draw(3, 1),
    );
}

// ============================================================================
// Render passes
// ============================================================================

#[test]
fn test_render_pass_wraps_pass_callback() {
    init_logging();
    let backend = DummyBackend::new();
    let mut pipeline = FramePipeline::default();

    let mut graph = new_graph();
    add_scene_pass(&mut graph, PassFlags::empty());
    run_frame(&mut graph, &backend, &mut pipeline);

    let commands = backend.commands();
    let begin = position(&commands, |c| {
        matches!(
            c,
            RecordedCommand::BeginRenderPass {
                color_attachments: 1,
                has_depth_stencil: true,
                ..
            }
        )
    })
    .unwrap();
    let draw = position(&commands, |c| matches!(c, RecordedCommand::Draw { .. })).unwrap();
    let end = position(&commands, |c| matches!(c, RecordedCommand::EndRenderPass { .. })).unwrap();
    assert!(begin < draw && draw < end);
    assert_eq!(count(&commands, |c| matches!(c, RecordedCommand::SetRenderTargets { .. })), 0);
}

#[test]
fn test_legacy_render_pass_clears_explicitly() {
    let backend = DummyBackend::new();
    let mut pipeline = FramePipeline::default();

    let mut graph = new_graph();
    add_scene_pass(&mut graph, PassFlags::LEGACY_RENDER_PASS);
    run_frame(&mut graph, &backend, &mut pipeline);

    let commands = backend.commands();
    let bind = position(&commands, |c| {
        matches!(
            c,
            RecordedCommand::SetRenderTargets {
                color_targets: 1,
                has_depth_stencil: true,
                ..
            }
        )
    })
    .unwrap();
    let clear_color =
        position(&commands, |c| matches!(c, RecordedCommand::ClearRenderTarget { .. })).unwrap();
    let clear_depth =
        position(&commands, |c| matches!(c, RecordedCommand::ClearDepthStencil { .. })).unwrap();
    let viewport = position(&commands, |c| matches!(c, RecordedCommand::SetViewport { .. })).unwrap();
    let draw = position(&commands, |c| matches!(c, RecordedCommand::Draw { .. })).unwrap();
    assert!(bind < clear_color && clear_color < clear_depth);
    assert!(viewport < draw);
    assert_eq!(count(&commands, |c| matches!(c, RecordedCommand::BeginRenderPass { .. })), 0);
    assert_eq!(count(&commands, |c| matches!(c, RecordedCommand::EndRenderPass { .. })), 0);
}

#[test]
fn test_graphics_pass_without_targets_sets_viewport() {
    let backend = DummyBackend::new();
    let mut pipeline = FramePipeline::default();

    let mut graph = new_graph();
    graph.add_pass(
        "splat",
        PassType::Graphics,
        PassFlags::FORCE_NO_CULL,
        |builder| {
            builder.declare_buffer("particles", storage_buffer());
            builder.set_viewport(1280, 720);
            builder.write_buffer("particles")
        },
        |_, ctx| ctx.draw(6, 1024),
    );
    run_frame(&mut graph, &backend, &mut pipeline);

    let commands = backend.commands();
    assert!(commands.iter().any(|c| matches!(
        c,
        RecordedCommand::SetViewport { viewport, .. } if viewport.width == 1280.0
    )));
    assert_eq!(count(&commands, |c| matches!(c, RecordedCommand::BeginRenderPass { .. })), 0);
}

// ============================================================================
// Pass context
// ============================================================================

#[test]
fn test_pass_context_resolves_bound_handles() {
    let backend = DummyBackend::new();
    let mut pipeline = FramePipeline::default();
    let readback = backend.external_buffer();
    let seen: Arc<Mutex<Option<(BufferHandle, BufferHandle)>>> = Arc::default();

    let mut graph = new_graph();
    graph.import_buffer(
        "readback",
        readback,
        storage_buffer(),
        ResourceState::COPY_DEST,
    );
    graph.add_pass(
        "simulate",
        PassType::Compute,
        PassFlags::empty(),
        |builder| {
            builder.declare_buffer("particles", storage_buffer());
            builder.write_buffer("particles")
        },
        |&particles, ctx| {
            // Storage views carry a descriptor.
            let _ = ctx.view(particles);
            ctx.dispatch(64, 1, 1);
        },
    );
    let recorder = Arc::clone(&seen);
    graph.add_pass(
        "download",
        PassType::Copy,
        PassFlags::empty(),
        |builder| {
            (
                builder.read_copy_src_buffer("particles"),
                builder.write_copy_dst_buffer("readback"),
            )
        },
        move |&(src, dst), ctx| {
            let (src, dst) = (ctx.buffer(src), ctx.buffer(dst));
            *recorder.lock() = Some((src, dst));
            ctx.copy_buffer(src, dst);
        },
    );
    run_frame(&mut graph, &backend, &mut pipeline);

    let recorded = *seen.lock();
    let (src, dst) = recorded.expect("download pass did not run");
    assert_eq!(dst, readback);
    assert_ne!(src, readback);
    assert!(backend.commands().iter().any(|c| matches!(
        c,
        RecordedCommand::CreateBuffer { buffer, .. } if *buffer == src
    )));
}

#[test]
fn test_imported_views_are_destroyed_after_retirement() {
    let backend = DummyBackend::new();
    backend.set_auto_complete(false);
    let mut pipeline = FramePipeline::default();
    let history: TextureHandle = backend.external_texture();

    let mut graph = new_graph();
    graph.import_texture("history", history, color_texture(), ResourceState::PIXEL_SHADER_RESOURCE);
    graph.add_pass(
        "taa",
        PassType::Compute,
        PassFlags::empty(),
        |builder| builder.write_texture("history"),
        |_, ctx| ctx.dispatch(32, 32, 1),
    );
    run_frame(&mut graph, &backend, &mut pipeline);

    assert_eq!(backend.live_view_count(), 1);
    assert_eq!(pipeline.deferred_view_count(), 1);

    backend.complete_all();
    pipeline.end_frame(&backend);
    assert_eq!(backend.live_view_count(), 0);
    assert_eq!(pipeline.deferred_view_count(), 0);
}

// ============================================================================
// Barriers
// ============================================================================

/// fill -> (copy, indirect) serialized, so each read gets its own level.
fn build_args_graph<'a>() -> FrameGraph<'a> {
    let mut graph =
        FrameGraph::with_config(FrameGraphConfig::default().with_parallel_levels(false));
    graph.add_pass(
        "fill",
        PassType::Compute,
        PassFlags::empty(),
        |builder| {
            builder.declare_buffer("args", storage_buffer());
            builder.write_buffer("args")
        },
        |_, ctx| ctx.dispatch(1, 1, 1),
    );
    graph.add_pass(
        "draw_indirect",
        PassType::Compute,
        PassFlags::FORCE_NO_CULL,
        |builder| builder.read_indirect_args_buffer("args"),
        |_, ctx| ctx.dispatch(1, 1, 1),
    );
    graph.add_pass(
        "stash",
        PassType::Copy,
        PassFlags::FORCE_NO_CULL,
        |builder| builder.read_copy_src_buffer("args"),
        |_, _| {},
    );
    graph
}

#[rstest]
#[case::legacy(BarrierMode::Legacy, 4)]
#[case::enhanced(BarrierMode::Enhanced, 2)]
fn test_barrier_mode(#[case] mode: BarrierMode, #[case] expected: usize) {
    init_logging();
    let backend = DummyBackend::with_barrier_mode(mode);
    let mut pipeline = FramePipeline::default();

    let mut graph = build_args_graph();
    let stats = run_frame(&mut graph, &backend, &mut pipeline);

    assert_eq!(stats.levels, 3);
    assert_eq!(stats.barriers, expected);
    assert_eq!(count(&backend.commands(), RecordedCommand::is_barrier), expected);
}

#[test]
fn test_combined_read_state_in_one_level() {
    let backend = DummyBackend::new();
    let mut pipeline = FramePipeline::default();

    let mut graph = new_graph();
    add_producer(&mut graph, "bake", "lut", PassType::Compute, PassFlags::empty());
    for (name, access) in [("vs", ReadAccess::NonPixelShader), ("ps", ReadAccess::PixelShader)] {
        graph.add_pass(
            name,
            PassType::Compute,
            PassFlags::FORCE_NO_CULL,
            move |builder| builder.read_texture("lut", access),
            |_, _| {},
        );
    }
    run_frame(&mut graph, &backend, &mut pipeline);

    let afters: Vec<ResourceState> = backend
        .commands()
        .iter()
        .filter_map(|c| match c {
            RecordedCommand::TextureBarrier { after, .. } => Some(*after),
            _ => None,
        })
        .collect();
    assert_eq!(
        afters,
        vec![
            ResourceState::UNORDERED_ACCESS,
            ResourceState::ALL_SHADER_RESOURCE,
            ResourceState::COMMON,
        ]
    );
}

#[test]
fn test_consecutive_storage_writes_get_global_barrier() {
    let backend = DummyBackend::new();
    let mut pipeline = FramePipeline::default();

    let mut graph = new_graph();
    add_producer(&mut graph, "clear", "volume", PassType::Compute, PassFlags::empty());
    graph.add_pass(
        "inject",
        PassType::Compute,
        PassFlags::empty(),
        |builder| builder.write_texture("volume"),
        |_, ctx| ctx.dispatch(4, 4, 4),
    );
    graph.add_pass(
        "integrate",
        PassType::Compute,
        PassFlags::FORCE_NO_CULL,
        |builder| builder.read_texture("volume", ReadAccess::NonPixelShader),
        |_, ctx| ctx.dispatch(4, 4, 1),
    );
    let stats = run_frame(&mut graph, &backend, &mut pipeline);

    let commands = backend.commands();
    assert_eq!(stats.levels, 3);
    assert_eq!(count(&commands, |c| matches!(c, RecordedCommand::GlobalBarrier { .. })), 1);
    // COMMON -> UAV, UAV -> UAV, UAV -> SRV, SRV -> COMMON.
    assert_eq!(stats.barriers, 4);
}

// ============================================================================
// Command streams
// ============================================================================

#[test]
fn test_single_queue_frame_submits_once() {
    let backend = DummyBackend::new();
    let mut pipeline = FramePipeline::default();

    let mut graph = new_graph();
    add_scene_pass(&mut graph, PassFlags::empty());
    let stats = run_frame(&mut graph, &backend, &mut pipeline);

    let commands = backend.commands();
    assert_eq!(submissions(&commands), vec![(QueueType::Graphics, 1)]);
    assert_eq!(count(&commands, |c| matches!(c, RecordedCommand::Begin { .. })), 1);
    assert_eq!(count(&commands, |c| matches!(c, RecordedCommand::End { .. })), 1);
    assert_eq!(stats.submissions, 1);
}

// ============================================================================
// Pool eviction
// ============================================================================

#[test]
fn test_unused_pool_entries_are_evicted() {
    let backend = DummyBackend::new();
    let mut pipeline = FramePipeline::new(PoolConfig::default().with_max_unused_frames(1));

    let mut graph = new_graph();
    add_scene_pass(&mut graph, PassFlags::empty());
    run_frame(&mut graph, &backend, &mut pipeline);
    assert_eq!(pipeline.pool().len(), 2);

    // Frame 1 is still within the threshold; frame 2 is not.
    pipeline.end_frame(&backend);
    assert_eq!(pipeline.pool().len(), 2);
    pipeline.end_frame(&backend);
    assert!(pipeline.pool().is_empty());
    assert_eq!(backend.live_texture_count(), 0);
    assert_eq!(backend.live_view_count(), 0);
}

#[test]
fn test_shutdown_releases_everything() {
    let backend = DummyBackend::new();
    let mut pipeline = FramePipeline::default();

    let mut graph = new_graph();
    add_scene_pass(&mut graph, PassFlags::empty());
    run_frame(&mut graph, &backend, &mut pipeline);
    assert!(pipeline.is_idle(&backend));

    pipeline.shutdown(&backend);
    assert!(pipeline.pool().is_empty());
    assert_eq!(backend.live_texture_count(), 0);
}

// ============================================================================
// Failures
// ============================================================================

#[test]
fn test_allocation_failure_names_resource() {
    init_logging();
    let backend = DummyBackend::new();
    backend.set_fail_allocations(true);
    let mut pipeline = FramePipeline::default();

    let mut graph = new_graph();
    add_scene_pass(&mut graph, PassFlags::empty());
    graph.compile();
    let error = graph.execute(&backend, &mut pipeline).unwrap_err();

    assert_eq!(
        error,
        FrameGraphError::Allocation {
            resource: "color".to_string(),
            source: BackendError::OutOfMemory,
        }
    );
    assert!(!error.is_device_lost());
    assert_eq!(pipeline.pool().in_use_count(), 0);
}

#[test]
fn test_device_loss_abandons_frame() {
    let backend = DummyBackend::new();
    let mut pipeline = FramePipeline::default();

    let mut graph = new_graph();
    add_scene_pass(&mut graph, PassFlags::empty());
    run_frame(&mut graph, &backend, &mut pipeline);

    backend.lose_device();
    backend.take_commands();
    let mut graph = new_graph();
    add_scene_pass(&mut graph, PassFlags::empty());
    graph.compile();
    let error = graph.execute(&backend, &mut pipeline).unwrap_err();

    assert!(error.is_device_lost());
    let commands = backend.commands();
    // Pooled targets were reused, so the frame fails at submission.
    assert!(submissions(&commands).is_empty());
    assert_eq!(count(&commands, |c| matches!(c, RecordedCommand::End { .. })), 1);
    assert_eq!(pipeline.pool().in_use_count(), 0);
}
