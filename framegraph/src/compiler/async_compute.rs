//! Cross-queue synchronization for async compute.
//!
//! Works on the dependency edges between live passes. A pass with
//! predecessors on the other queue waits on the latest of them, which then
//! signals. Because every edge crosses at least one level, a signalling pass
//! always runs in an earlier level than the pass waiting on it.
//!
//! Waits already covered by an earlier wait on the same queue are dropped,
//! so a contiguous async run fed by one producer and drained by one
//! consumer needs a single fence value pair. Signal values are assigned per
//! queue in execution order, starting at 1, so they increase along each
//! queue's timeline.

use crate::graph::{Pass, PassId};
use crate::scheduler::QueueType;

/// Cross-queue synchronization attached to a pass.
///
/// Values are relative to the compile: the n-th signal on a queue carries
/// value n. The executor maps them onto the queue's device timeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct PassSync {
    /// Wait for the other queue to reach this value before the pass runs.
    pub wait_value: Option<u64>,
    /// Signal this value on the pass's own queue after it runs.
    pub signal_value: Option<u64>,
}

/// Resolve fence wait/signal pairs between queues.
///
/// `order` is the flattened execution order of live passes; `adjacency` and
/// `queues` are indexed by pass id.
pub(crate) fn resolve_cross_queue(
    order: &[PassId],
    adjacency: &[Vec<PassId>],
    passes: &[Pass<'_>],
    queues: &[QueueType],
) -> Vec<PassSync> {
    let queue_of = |pass: PassId| queues[pass.index()];
    let mut position = vec![None; passes.len()];
    for (index, &pass) in order.iter().enumerate() {
        position[pass.index()] = Some(index);
    }

    // Latest predecessor of every live pass on the other queue.
    let mut producer: Vec<Option<PassId>> = vec![None; passes.len()];
    for &pass in order {
        for &successor in &adjacency[pass.index()] {
            if position[successor.index()].is_none() || queue_of(successor) == queue_of(pass) {
                continue;
            }
            let latest = &mut producer[successor.index()];
            if latest.map_or(true, |current| position[current.index()] < position[pass.index()]) {
                *latest = Some(pass);
            }
        }
    }

    // Position of the latest producer each queue already waits on.
    let mut covered: [Option<usize>; QueueType::COUNT] = [None; QueueType::COUNT];
    let mut waits: Vec<Option<PassId>> = vec![None; passes.len()];
    let mut signals = vec![false; passes.len()];
    for &pass in order {
        let Some(source) = producer[pass.index()] else {
            continue;
        };
        let covered = &mut covered[queue_of(pass).index()];
        if *covered >= position[source.index()] {
            continue;
        }
        *covered = position[source.index()];
        waits[pass.index()] = Some(source);
        signals[source.index()] = true;
    }

    let mut counters = [0u64; QueueType::COUNT];
    let mut sync = vec![PassSync::default(); passes.len()];
    for &pass in order {
        if signals[pass.index()] {
            let counter = &mut counters[queue_of(pass).index()];
            *counter += 1;
            sync[pass.index()].signal_value = Some(*counter);
        }
    }
    for &pass in order {
        if let Some(source) = waits[pass.index()] {
            sync[pass.index()].wait_value = sync[source.index()].signal_value;
            log::trace!(
                "Pass '{}' waits on '{}' ({:?} value {:?})",
                passes[pass.index()].name(),
                passes[source.index()].name(),
                queue_of(source),
                sync[source.index()].signal_value
            );
        }
    }
    sync
}
