//! Resource lifetimes.
//!
//! Walks live passes in level order. A resource's lifetime starts at the
//! first pass requiring a state for it and ends at the last one; the
//! corresponding levels receive its create and destroy events.

use crate::graph::{Pass, PassId, ResourceRegistry};

use super::DependencyLevel;

/// Live range of a resource within one compiled frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Lifetime {
    /// First live pass using the resource.
    pub first_use: PassId,
    /// Last live pass using the resource.
    pub last_use: PassId,
    /// Level the resource is created (or bound) in.
    pub create_level: usize,
    /// Level after which the resource is released.
    pub destroy_level: usize,
}

/// Compute lifetimes of every resource used by a live pass. Indexed by resource id.
pub(crate) fn compute_lifetimes(
    levels: &[DependencyLevel],
    passes: &[Pass<'_>],
    resource_count: usize,
) -> Vec<Option<Lifetime>> {
    let mut lifetimes: Vec<Option<Lifetime>> = vec![None; resource_count];
    for level in levels {
        for &pass in level.passes() {
            for &resource in passes[pass.index()].states().keys() {
                let lifetime = lifetimes[resource.index()].get_or_insert(Lifetime {
                    first_use: pass,
                    last_use: pass,
                    create_level: level.index(),
                    destroy_level: level.index(),
                });
                lifetime.last_use = pass;
                lifetime.destroy_level = level.index();
            }
        }
    }
    lifetimes
}

/// Attach create, destroy and last-use events to their levels.
///
/// External resources get create and last-use events but are never destroyed.
pub(crate) fn assign_events(
    levels: &mut [DependencyLevel],
    lifetimes: &[Option<Lifetime>],
    registry: &ResourceRegistry,
) {
    for resource in registry.resources() {
        let Some(lifetime) = lifetimes[resource.id().index()] else {
            continue;
        };
        levels[lifetime.create_level].creates.push(resource.id());
        levels[lifetime.destroy_level].last_uses.push(resource.id());
        if !resource.ownership().is_external() {
            levels[lifetime.destroy_level].destroys.push(resource.id());
        }
    }
}
