//! Pass dependency graph: adjacency construction and topological sort.

use crate::graph::{Pass, PassId, ResourceRegistry};

/// Build the adjacency list of the pass dependency graph.
///
/// Adds one edge `i → j` for every pair of passes `i < j` where `j` reads a
/// resource `i` writes, writes a resource `i` writes, or writes a resource
/// `i` reads. Edges only point from earlier- to later-declared passes, so the
/// result is acyclic. Successor lists are sorted by pass id.
pub(crate) fn build_adjacency(passes: &[Pass<'_>], registry: &ResourceRegistry) -> Vec<Vec<PassId>> {
    let mut adjacency: Vec<Vec<PassId>> = vec![Vec::new(); passes.len()];
    // linked[i] == j once the edge i → j exists.
    let mut linked = vec![usize::MAX; passes.len()];

    for consumer in passes {
        let j = consumer.id().index();
        let mut link = |producer: PassId| {
            let i = producer.index();
            if i < j && linked[i] != j {
                linked[i] = j;
                adjacency[i].push(consumer.id());
            }
        };

        for &resource in consumer.reads() {
            registry.get(resource).writers().iter().copied().for_each(&mut link);
        }
        for &resource in consumer.writes() {
            let resource = registry.get(resource);
            resource.writers().iter().copied().for_each(&mut link);
            resource.readers().iter().copied().for_each(&mut link);
        }
    }

    for successors in &mut adjacency {
        successors.sort_unstable();
    }
    adjacency
}

/// Depth-first topological sort.
///
/// Visits unvisited passes in declaration order and returns the reversed
/// post-order, so every edge `i → j` has `i` before `j`.
pub(crate) fn topological_sort(adjacency: &[Vec<PassId>]) -> Vec<PassId> {
    let mut visited = vec![false; adjacency.len()];
    let mut post_order = Vec::with_capacity(adjacency.len());

    for root in 0..adjacency.len() {
        if visited[root] {
            continue;
        }
        visited[root] = true;
        let mut stack = vec![(root, adjacency[root].iter())];
        while let Some((node, successors)) = stack.last_mut() {
            match successors.next() {
                Some(next) => {
                    let next = next.index();
                    if !visited[next] {
                        visited[next] = true;
                        stack.push((next, adjacency[next].iter()));
                    }
                }
                None => {
                    post_order.push(PassId::new(*node as u32));
                    stack.pop();
                }
            }
        }
    }

    post_order.reverse();
    post_order
}
