//! Self-subtraction: what an entity sees of everyone else.
//!
//! An entity's own occupancy dwarfs anything that leaks over from a distant
//! entity, so the signal it steers by is `total - own`. Two readings of that
//! signal are available:
//! - local: the external occupancy of the anchor's neighbors
//! - potential: every node's external occupancy, weighted by
//!   `(1 + hops)^-falloff` and summed, evaluated at the anchor's neighbors
//!
//! The local reading only sees quanta that have already drifted next to the
//! anchor. The potential also sees the other entities' bound cores.

use serde::{Deserialize, Serialize};

use crate::components::{NodeId, Tag, TaggedQuantumField, Vec3};
use crate::config::SignalKind;
use crate::generation::GraphSubstrate;

/// Occupancy at `node` that does not belong to `tag`.
pub fn external_occupancy(field: &TaggedQuantumField, node: NodeId, tag: Tag) -> u64 {
    field.total(node) - field.occupancy(node, tag) as u64
}

/// Same quantity summed directly over every other tag. Used to cross-check
/// the subtraction.
pub fn other_tags_occupancy(field: &TaggedQuantumField, node: NodeId, tag: Tag) -> u64 {
    field
        .tags()
        .filter(|&t| t != tag)
        .map(|t| field.occupancy(node, t) as u64)
        .sum()
}

/// External signal at one neighbor, relative to the center node
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NeighborSignal {
    pub node: NodeId,
    pub external: f64,
    /// `external[node] - external[center]`
    pub delta: f64,
}

/// External signal around one node, as seen by one tag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalGradient {
    pub tag: Tag,
    pub center: NodeId,
    pub external_at_center: f64,
    pub neighbors: Vec<NeighborSignal>,
}

impl ExternalGradient {
    /// Every neighbor sees the same external signal as the center.
    pub fn is_flat(&self) -> bool {
        self.neighbors.iter().all(|n| n.delta == 0.0)
    }

    /// `Σ delta_j * unit(displacement(center, j))`; exactly zero when flat.
    pub fn vector<G: GraphSubstrate + ?Sized>(&self, graph: &G) -> Vec3 {
        let mut v = Vec3::ZERO;
        for n in &self.neighbors {
            if n.delta != 0.0 {
                v += graph.displacement(self.center, n.node).normalize() * n.delta;
            }
        }
        v
    }
}

fn gradient_with<G, F>(graph: &G, tag: Tag, node: NodeId, signal: F) -> ExternalGradient
where
    G: GraphSubstrate + ?Sized,
    F: Fn(NodeId) -> f64,
{
    let center = signal(node);
    let neighbors = graph
        .neighbors(node)
        .iter()
        .map(|&nb| {
            let value = signal(nb);
            NeighborSignal {
                node: nb,
                external: value,
                delta: value - center,
            }
        })
        .collect();
    ExternalGradient {
        tag,
        center: node,
        external_at_center: center,
        neighbors,
    }
}

/// External gradient around `node` for `tag`, via `total - own`.
pub fn external_gradient<G: GraphSubstrate + ?Sized>(
    field: &TaggedQuantumField,
    graph: &G,
    tag: Tag,
    node: NodeId,
) -> ExternalGradient {
    gradient_with(graph, tag, node, |n| external_occupancy(field, n, tag) as f64)
}

/// External gradient computed by summing the other tags directly.
pub fn external_gradient_direct<G: GraphSubstrate + ?Sized>(
    field: &TaggedQuantumField,
    graph: &G,
    tag: Tag,
    node: NodeId,
) -> ExternalGradient {
    gradient_with(graph, tag, node, |n| other_tags_occupancy(field, n, tag) as f64)
}

/// Weight of a quantum `hops` away: `(1 + hops)^-falloff`.
pub fn potential_weight(hops: u32, falloff: f64) -> f64 {
    (1.0 + hops as f64).powf(-falloff)
}

/// Potential at `target` of the occupied `(node, quanta)` pairs in `sources`.
///
/// Occupancy is binned by hop distance before it is weighted, so two nodes
/// with the same distance profile get bit-identical potentials.
pub fn potential_at<G: GraphSubstrate + ?Sized>(
    graph: &G,
    target: NodeId,
    sources: &[(NodeId, u64)],
    falloff: f64,
) -> f64 {
    let distances = graph.distances_from(target);
    let mut shells: Vec<u64> = Vec::new();
    for &(node, quanta) in sources {
        let hops = match distances.get(node as usize) {
            Some(&h) if h != u32::MAX => h as usize,
            _ => continue,
        };
        if shells.len() <= hops {
            shells.resize(hops + 1, 0);
        }
        shells[hops] += quanta;
    }
    shells
        .iter()
        .enumerate()
        .map(|(hops, &quanta)| quanta as f64 * potential_weight(hops as u32, falloff))
        .sum()
}

fn potential_gradient_with<G, F>(
    graph: &G,
    tag: Tag,
    node: NodeId,
    falloff: f64,
    external: F,
) -> ExternalGradient
where
    G: GraphSubstrate + ?Sized,
    F: Fn(NodeId) -> u64,
{
    let sources: Vec<(NodeId, u64)> = (0..graph.node_count() as NodeId)
        .map(|n| (n, external(n)))
        .filter(|&(_, q)| q > 0)
        .collect();
    if sources.is_empty() {
        return gradient_with(graph, tag, node, |_| 0.0);
    }
    gradient_with(graph, tag, node, |target| {
        potential_at(graph, target, &sources, falloff)
    })
}

/// Gradient of the external potential around `node`, via `total - own`.
pub fn potential_gradient<G: GraphSubstrate + ?Sized>(
    field: &TaggedQuantumField,
    graph: &G,
    tag: Tag,
    node: NodeId,
    falloff: f64,
) -> ExternalGradient {
    potential_gradient_with(graph, tag, node, falloff, |n| {
        external_occupancy(field, n, tag)
    })
}

/// Gradient of the external potential built from the other tags directly.
pub fn potential_gradient_direct<G: GraphSubstrate + ?Sized>(
    field: &TaggedQuantumField,
    graph: &G,
    tag: Tag,
    node: NodeId,
    falloff: f64,
) -> ExternalGradient {
    potential_gradient_with(graph, tag, node, falloff, |n| {
        other_tags_occupancy(field, n, tag)
    })
}

/// The gradient an entity steers by under `signal`.
pub fn steering_gradient<G: GraphSubstrate + ?Sized>(
    field: &TaggedQuantumField,
    graph: &G,
    tag: Tag,
    node: NodeId,
    signal: SignalKind,
) -> ExternalGradient {
    match signal {
        SignalKind::Local => external_gradient(field, graph, tag, node),
        SignalKind::Potential { falloff } => potential_gradient(field, graph, tag, node, falloff),
    }
}
