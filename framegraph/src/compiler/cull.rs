//! Reference-counted culling of passes whose outputs are never consumed.
//!
//! Every pass starts with one reference per resource it writes; every
//! resource starts with one reference per pass that reads it. Resources that
//! drop to zero references release one reference from each cullable writer,
//! and a writer that drops to zero releases the resources it reads. Imported
//! and export-target resources are consumed outside the graph and never
//! release their writers.

use crate::graph::{Pass, ResourceId, ResourceRegistry};

/// Compute which passes are culled. Indexed by pass id.
pub(crate) fn cull_passes(passes: &[Pass<'_>], registry: &ResourceRegistry) -> Vec<bool> {
    let mut pass_refs: Vec<usize> = passes.iter().map(|pass| pass.writes().len()).collect();
    let mut resource_refs: Vec<usize> = registry
        .resources()
        .iter()
        .map(|resource| {
            resource
                .readers()
                .iter()
                .filter(|reader| !passes[reader.index()].writes().contains(&resource.id()))
                .count()
        })
        .collect();

    let mut worklist: Vec<ResourceId> = registry
        .resources()
        .iter()
        .filter(|resource| {
            !resource.ownership().is_external() && resource_refs[resource.id().index()] == 0
        })
        .map(|resource| resource.id())
        .collect();

    // Passes writing nothing are dead from the start.
    for pass in passes {
        if pass.is_cullable() && pass_refs[pass.id().index()] == 0 {
            release_reads(pass, registry, &mut resource_refs, &mut worklist);
        }
    }

    while let Some(resource) = worklist.pop() {
        for &writer in registry.get(resource).writers() {
            let pass = &passes[writer.index()];
            let refs = &mut pass_refs[writer.index()];
            if !pass.is_cullable() || *refs == 0 {
                continue;
            }
            *refs -= 1;
            if *refs == 0 {
                log::trace!("Culling pass '{}'", pass.name());
                release_reads(pass, registry, &mut resource_refs, &mut worklist);
            }
        }
    }

    passes
        .iter()
        .map(|pass| pass.is_cullable() && pass_refs[pass.id().index()] == 0)
        .collect()
}

fn release_reads(
    pass: &Pass<'_>,
    registry: &ResourceRegistry,
    resource_refs: &mut [usize],
    worklist: &mut Vec<ResourceId>,
) {
    for &resource in pass.reads() {
        if pass.writes().contains(&resource) {
            continue;
        }
        let refs = &mut resource_refs[resource.index()];
        if *refs == 0 {
            continue;
        }
        *refs -= 1;
        if *refs == 0 && !registry.get(resource).ownership().is_external() {
            worklist.push(resource);
        }
    }
}
