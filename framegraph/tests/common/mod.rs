//! Common utilities for frame graph integration tests.
//!
//! Every test runs against [`DummyBackend`], which records backend calls so
//! the order of barriers, submissions, waits and signals can be asserted.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use redlilium_framegraph::{
    BufferDescriptor, BufferUsage, DummyBackend, FrameGraph, FrameGraphConfig, FramePipeline,
    PassFlags, PassId, PassType, QueueType, ReadAccess, RecordedCommand, TextureDescriptor,
    TextureFormat, TextureUsage,
};
use redlilium_framegraph::backend::TextureHandle;

/// Route `log` output through the test harness.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

// ============================================================================
// Descriptors
// ============================================================================

/// A 256x256 RGBA8 texture with no bind flags; the builder adds them.
pub fn color_texture() -> TextureDescriptor {
    TextureDescriptor::new_2d(256, 256, TextureFormat::Rgba8Unorm, TextureUsage::empty())
        .with_label("color")
}

/// A 256x256 depth texture.
pub fn depth_texture() -> TextureDescriptor {
    TextureDescriptor::new_2d(256, 256, TextureFormat::Depth32Float, TextureUsage::empty())
        .with_label("depth")
}

/// A 4 KiB structured buffer.
pub fn storage_buffer() -> BufferDescriptor {
    BufferDescriptor::new(4096, BufferUsage::empty())
        .with_stride(16)
        .with_label("storage")
}

// ============================================================================
// Pass helpers
// ============================================================================

/// Add a compute-style pass that declares and writes `output`.
pub fn add_producer(
    graph: &mut FrameGraph<'_>,
    name: &str,
    output: &str,
    pass_type: PassType,
    flags: PassFlags,
) -> PassId {
    let output = output.to_string();
    graph.add_pass(
        name,
        pass_type,
        flags,
        move |builder| {
            builder.declare_texture(&output, color_texture());
            builder.write_texture(&output)
        },
        |_, ctx| ctx.dispatch(8, 8, 1),
    )
}

/// Add a pass reading `input` and declaring and writing `output`.
pub fn add_transform(
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
            builder.set_viewport(256, 256);
            let src = builder.read_texture(&input, ReadAccess::AllShader);
            builder.declare_texture(&output, color_texture());
            (src, builder.write_texture(&output))
        },
        |_, ctx| ctx.dispatch(8, 8, 1),
    )
}

/// Build the A -> B (async) -> C chain: A writes `x`, B reads `x` and writes
/// `y` on the async queue, C reads `y` and writes the imported backbuffer.
pub fn build_async_chain(graph: &mut FrameGraph<'_>, backend: &DummyBackend) -> [PassId; 3] {
    graph.import_texture(
        "backbuffer",
        backend.external_texture(),
        color_texture(),
        redlilium_framegraph::ResourceState::PRESENT,
    );
    let a = add_producer(graph, "A", "x", PassType::Compute, PassFlags::empty());
    let b = add_transform(graph, "B", "x", "y", PassType::AsyncCompute, PassFlags::empty());
    let c = graph.add_pass(
        "C",
        PassType::Graphics,
        PassFlags::empty(),
        |builder| {
            builder.set_viewport(256, 256);
            builder.read_texture("y", ReadAccess::PixelShader);
            builder.write_render_target(
                "backbuffer",
                redlilium_framegraph::LoadOp::DontCare,
                redlilium_framegraph::StoreOp::Store,
            )
        },
        |_, ctx| ctx.draw(3, 1),
    );
    [a, b, c]
}

/// Textures touched by tracked passes: `(tag, texture, written)`.
pub type AccessLog = Arc<Mutex<Vec<(u32, TextureHandle, bool)>>>;

/// Add a pass reading `reads` and declaring and writing `writes`.
///
/// The pass dispatches `(tag, 1, 1)`, where the tag is its id plus one, and
/// logs the textures it touches so [`assert_cross_queue_order`] can place
/// them in the command stream.
pub fn add_tracked(
    graph: &mut FrameGraph<'_>,
    log: &AccessLog,
    name: &str,
    pass_type: PassType,
    reads: &[&str],
    writes: &[&str],
    flags: PassFlags,
) -> PassId {
    let tag = graph.pass_count() as u32 + 1;
    let (reads, writes): (Vec<String>, Vec<String>) = (
        reads.iter().map(|name| name.to_string()).collect(),
        writes.iter().map(|name| name.to_string()).collect(),
    );
    let log = Arc::clone(log);
    graph.add_pass(
        name,
        pass_type,
        flags,
        move |builder| {
            if pass_type == PassType::Graphics {
                builder.set_viewport(256, 256);
            }
            let mut views = Vec::new();
            for input in &reads {
                views.push((builder.read_texture(input, ReadAccess::AllShader), false));
            }
            for output in &writes {
                builder.declare_texture(output, color_texture());
                views.push((builder.write_texture(output), true));
            }
            views
        },
        move |views, ctx| {
            let mut log = log.lock();
            for &(view, written) in views {
                log.push((tag, ctx.texture(view), written));
            }
            ctx.dispatch(tag, 1, 1);
        },
    )
}

/// Check that work on one queue never races conflicting work on the other.
///
/// Walks a single frame recorded on a fresh pipeline. Every wait must follow
/// the submission it waits for. Every pair of texture accesses on different
/// queues where at least one side writes or transitions must be ordered by a
/// wait: the later queue waits for a value at or past the submission holding
/// the earlier access.
pub fn assert_cross_queue_order(commands: &[RecordedCommand], log: &AccessLog) {
    let mut by_tag: HashMap<u32, Vec<(TextureHandle, bool)>> = HashMap::new();
    for &(tag, texture, written) in log.lock().iter() {
        by_tag.entry(tag).or_default().push((texture, written));
    }

    let mut segment = [1u64; QueueType::COUNT];
    let mut submitted = [0u64; QueueType::COUNT];
    let mut waited = [0u64; QueueType::COUNT];
    // (queue, submission, texture, written)
    let mut accesses: Vec<(QueueType, u64, TextureHandle, bool)> = Vec::new();

    for (index, command) in commands.iter().enumerate() {
        let touched: Vec<(QueueType, TextureHandle, bool)> = match command {
            RecordedCommand::Submit { queue, signal } => {
                assert_eq!(*signal, segment[queue.index()], "submission {} out of order", index);
                submitted[queue.index()] = *signal;
                segment[queue.index()] = signal + 1;
                continue;
            }
            RecordedCommand::Wait { queue, on, value } => {
                assert!(
                    submitted[on.index()] >= *value,
                    "{:?} waits on {:?} value {} before it is submitted",
                    queue,
                    on,
                    value
                );
                let clock = &mut waited[queue.index()];
                *clock = (*clock).max(*value);
                continue;
            }
            RecordedCommand::TextureBarrier { queue, texture, .. } => {
                vec![(*queue, *texture, true)]
            }
            RecordedCommand::Dispatch { queue, x, .. } => by_tag
                .get(x)
                .map(|touched| {
                    touched
                        .iter()
                        .map(|&(texture, written)| (*queue, texture, written))
                        .collect()
                })
                .unwrap_or_default(),
            _ => continue,
        };

        for (queue, texture, written) in touched {
            for &(earlier_queue, earlier_segment, earlier_texture, earlier_written) in &accesses {
                if earlier_queue == queue
                    || earlier_texture != texture
                    || !(written || earlier_written)
                {
                    continue;
                }
                assert!(
                    waited[queue.index()] >= earlier_segment,
                    "{:?} touches {:?} at command {} without waiting for {:?} value {}",
                    queue,
                    texture,
                    index,
                    earlier_queue,
                    earlier_segment
                );
            }
            accesses.push((queue, segment[queue.index()], texture, written));
        }
    }
}

/// Compile and execute a graph, panicking on backend errors.
pub fn run_frame(
    graph: &mut FrameGraph<'_>,
    backend: &DummyBackend,
    pipeline: &mut FramePipeline,
) -> redlilium_framegraph::ExecutionStats {
    graph.compile();
    let stats = graph
        .execute(backend, pipeline)
        .expect("frame execution failed");
    pipeline.end_frame(backend);
    stats
}

/// A graph with the default configuration.
pub fn new_graph<'a>() -> FrameGraph<'a> {
    FrameGraph::with_config(FrameGraphConfig::default())
}

// ============================================================================
// Command inspection
// ============================================================================

/// Position of the first command matching `predicate`.
pub fn position(
    commands: &[RecordedCommand],
    predicate: impl Fn(&RecordedCommand) -> bool,
) -> Option<usize> {
    commands.iter().position(predicate)
}

/// Number of commands matching `predicate`.
pub fn count(commands: &[RecordedCommand], predicate: impl Fn(&RecordedCommand) -> bool) -> usize {
    commands.iter().filter(|command| predicate(command)).count()
}

/// Every `(queue, signal)` submission, in order.
pub fn submissions(commands: &[RecordedCommand]) -> Vec<(QueueType, u64)> {
    commands
        .iter()
        .filter_map(|command| match command {
            RecordedCommand::Submit { queue, signal } => Some((*queue, *signal)),
            _ => None,
        })
        .collect()
}

/// Every `(queue, on, value)` wait, in order.
pub fn waits(commands: &[RecordedCommand]) -> Vec<(QueueType, QueueType, u64)> {
    commands
        .iter()
        .filter_map(|command| match command {
            RecordedCommand::Wait { queue, on, value } => Some((*queue, *on, *value)),
            _ => None,
        })
        .collect()
}
