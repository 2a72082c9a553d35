//! Dependency levels.
//!
//! A level is a bucket of passes with no edges between them. Levels execute
//! in index order; passes inside one level may run in any order or in
//! parallel.

use std::collections::BTreeMap;

use crate::graph::{Pass, PassId, ResourceId};
use crate::types::ResourceState;

/// An ordered bucket of mutually independent passes.
///
/// Carries the union of its passes' access sets and the combined state each
/// accessed resource must be in while the level runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyLevel {
    pub(crate) index: usize,
    pub(crate) passes: Vec<PassId>,
    pub(crate) creates: Vec<ResourceId>,
    pub(crate) destroys: Vec<ResourceId>,
    pub(crate) last_uses: Vec<ResourceId>,
    pub(crate) reads: Vec<ResourceId>,
    pub(crate) writes: Vec<ResourceId>,
    pub(crate) states: BTreeMap<ResourceId, ResourceState>,
}

impl DependencyLevel {
    pub(crate) fn new(index: usize, passes: Vec<PassId>) -> Self {
        Self {
            index,
            passes,
            ..Self::default()
        }
    }

    /// Union the access sets and required states of the level's passes.
    ///
    /// Reads of one resource with different states combine into one state.
    pub(crate) fn aggregate(&mut self, passes: &[Pass<'_>]) {
        for &pass in &self.passes {
            let pass = &passes[pass.index()];
            self.reads.extend_from_slice(pass.reads());
            self.writes.extend_from_slice(pass.writes());
            for (&resource, &state) in pass.states() {
                *self.states.entry(resource).or_insert(ResourceState::COMMON) |= state;
            }
        }
        self.reads.sort_unstable();
        self.reads.dedup();
        self.writes.sort_unstable();
        self.writes.dedup();
    }

    /// Position of the level in execution order.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Passes in the level, ordered by id.
    pub fn passes(&self) -> &[PassId] {
        &self.passes
    }

    /// Resources whose lifetime starts in this level.
    ///
    /// Transient resources are acquired from the pool here; imported ones
    /// bind their external handle.
    pub fn creates(&self) -> &[ResourceId] {
        &self.creates
    }

    /// Transient resources returned to the pool after this level.
    pub fn destroys(&self) -> &[ResourceId] {
        &self.destroys
    }

    /// Every resource whose last use is in this level, external ones included.
    pub fn last_uses(&self) -> &[ResourceId] {
        &self.last_uses
    }

    /// Resources read by any pass of the level.
    pub fn reads(&self) -> &[ResourceId] {
        &self.reads
    }

    /// Resources written by any pass of the level.
    pub fn writes(&self) -> &[ResourceId] {
        &self.writes
    }

    /// Combined state each accessed resource must be in.
    pub fn states(&self) -> &BTreeMap<ResourceId, ResourceState> {
        &self.states
    }
}

/// Longest incoming path length of every pass.
pub(crate) fn longest_path_distances(order: &[PassId], adjacency: &[Vec<PassId>]) -> Vec<usize> {
    let mut distance = vec![0; adjacency.len()];
    for &pass in order {
        let from = distance[pass.index()];
        for &next in &adjacency[pass.index()] {
            let slot = &mut distance[next.index()];
            *slot = (*slot).max(from + 1);
        }
    }
    distance
}

/// Group live passes into levels.
///
/// With `parallel` set, passes sharing a distance share a level and empty
/// levels left behind by culling are dropped. Otherwise every live pass gets
/// its own level, in topological order.
pub(crate) fn group_levels(
    order: &[PassId],
    distance: &[usize],
    culled: &[bool],
    parallel: bool,
) -> Vec<Vec<PassId>> {
    let live = order.iter().copied().filter(|pass| !culled[pass.index()]);
    if !parallel {
        return live.map(|pass| vec![pass]).collect();
    }

    let depth = distance.iter().copied().max().map_or(0, |max| max + 1);
    let mut buckets: Vec<Vec<PassId>> = vec![Vec::new(); depth];
    for pass in live {
        buckets[distance[pass.index()]].push(pass);
    }
    buckets
        .into_iter()
        .filter(|bucket| !bucket.is_empty())
        .map(|mut bucket| {
            bucket.sort_unstable();
            bucket
        })
        .collect()
}
