//! Entity movement: commit-counter mass and a nudged continuous heading.
//!
//! Each tick the counter advances. When it reaches `mass` the entity commits:
//! 1. Reset the counter
//! 2. Re-anchor to its own peak if the anchor node holds none of its quanta
//! 3. Read the external gradient at the anchor (local or potential signal)
//! 4. Nudge `direction` by `normalize(gradient) / mass`, renormalize
//! 5. Hop to the neighbor best aligned with `direction`
//!
//! The heading is never snapped to a lattice axis. Small nudges accumulate
//! across commits until the discrete choice flips, which is what lets a
//! six-heading lattice produce curved trajectories.

use crate::components::{Entity, Hop, NodeId, TaggedQuantumField, Vec3};
use crate::config::SignalKind;
use crate::generation::GraphSubstrate;

use super::signal::steering_gradient;

/// Fold a gradient into a heading. A zero gradient leaves the heading as is.
pub fn nudge_direction(direction: Vec3, gradient: Vec3, weight: f64) -> Vec3 {
    if gradient.is_zero() {
        return direction;
    }
    let pull = gradient.normalize();
    let nudged = (direction + pull * weight).normalize();
    if nudged.is_zero() {
        // Heading exactly cancelled: turn fully toward the pull.
        pull
    } else {
        nudged
    }
}

/// Neighbor whose unit displacement has the largest dot product with
/// `direction`. First in neighbor order wins ties; `None` at rest.
pub fn choose_neighbor<G: GraphSubstrate + ?Sized>(
    graph: &G,
    node: NodeId,
    direction: Vec3,
) -> Option<NodeId> {
    if direction.is_zero() {
        return None;
    }
    let mut best: Option<(NodeId, f64)> = None;
    for &nb in graph.neighbors(node) {
        let heading = graph.displacement(node, nb).normalize();
        let score = heading.dot(&direction);
        if best.map_or(true, |(_, s)| score > s) {
            best = Some((nb, score));
        }
    }
    best.map(|(nb, _)| nb)
}

/// Advance one entity by one tick against the post-spread field.
///
/// Returns the updated entity and, on a committing tick with a non-zero
/// heading, the hop the engine must apply to the field. The returned
/// entity's `position` is already the hop destination.
pub fn entity_tick<G: GraphSubstrate + ?Sized>(
    entity: &Entity,
    field: &TaggedQuantumField,
    graph: &G,
    signal: SignalKind,
) -> (Entity, Option<Hop>) {
    let mut next = entity.clone();
    next.commit_counter += 1;
    if next.commit_counter < next.mass {
        return (next, None);
    }
    next.commit_counter = 0;

    if field.occupancy(next.position, next.tag) == 0 {
        if let Some(peak) = field.peak_node(next.tag) {
            log::debug!(
                "tag {} re-anchored from node {} to peak {}",
                next.tag.0,
                next.position,
                peak
            );
            next.position = peak;
        }
    }

    let gradient = steering_gradient(field, graph, next.tag, next.position, signal);
    let pull = gradient.vector(graph);
    next.direction = nudge_direction(next.direction, pull, next.nudge_weight());

    let hop = choose_neighbor(graph, next.position, next.direction).map(|to| Hop {
        tag: next.tag,
        from: next.position,
        to,
    });
    if let Some(h) = hop {
        next.position = h.to;
    }
    (next, hop)
}
