//! Per-tick measurements: positions, separations, binding, angular momentum.

use serde::{Deserialize, Serialize};

use crate::components::{Entity, NodeId, Tag, TaggedQuantumField, Vec3};
use crate::generation::GraphSubstrate;

use super::conservation::audit;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityDiagnostics {
    pub tag: Tag,
    pub position: NodeId,
    /// Node holding most of this entity's quanta (derived, not stored).
    pub peak: Option<NodeId>,
    pub quanta_at_position: u32,
    pub commit_counter: u32,
    pub direction: [f64; 3],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairSeparation {
    pub a: Tag,
    pub b: Tag,
    /// Hop distance between anchors; `None` if the graph is disconnected.
    pub hops: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickDiagnostics {
    pub tick: u64,
    pub entities: Vec<EntityDiagnostics>,
    pub separations: Vec<PairSeparation>,
    pub tag_totals: Vec<u64>,
    pub conserved: bool,
    pub hops_applied: usize,
    pub coincident_pairs: usize,
    pub angular_momentum: [f64; 3],
}

impl TickDiagnostics {
    pub fn angular_momentum_magnitude(&self) -> f64 {
        Vec3::from_array(self.angular_momentum).length()
    }
}

/// Hop distance between every pair of entity anchors.
pub fn pairwise_separations<G: GraphSubstrate + ?Sized>(
    entities: &[Entity],
    graph: &G,
) -> Vec<PairSeparation> {
    let mut out = Vec::new();
    for (i, a) in entities.iter().enumerate() {
        for b in &entities[i + 1..] {
            out.push(PairSeparation {
                a: a.tag,
                b: b.tag,
                hops: graph.hop_distance(a.position, b.position),
            });
        }
    }
    out
}

/// Number of entity pairs sharing an anchor node.
pub fn coincident_pairs(entities: &[Entity]) -> usize {
    let mut count = 0;
    for (i, a) in entities.iter().enumerate() {
        count += entities[i + 1..]
            .iter()
            .filter(|b| b.position == a.position)
            .count();
    }
    count
}

/// Fraction of `tag`'s initial mass within `radius` hops of `center`.
pub fn retained_fraction<G: GraphSubstrate + ?Sized>(
    field: &TaggedQuantumField,
    graph: &G,
    tag: Tag,
    center: NodeId,
    radius: u32,
) -> f64 {
    let mass = field.initial_mass(tag).unwrap_or(0);
    if mass == 0 {
        return 0.0;
    }
    let inside: u64 = graph
        .ball(center, radius)
        .into_iter()
        .map(|n| field.occupancy(n, tag) as u64)
        .sum();
    inside as f64 / mass as f64
}

/// `Σ (r_e - r_cm) × direction_e / mass_e`, with positions taken as
/// minimum-image offsets from the first entity. Lattice hops quantize the
/// motion, so this drifts; it is measured, never corrected.
pub fn angular_momentum<G: GraphSubstrate + ?Sized>(entities: &[Entity], graph: &G) -> Vec3 {
    let Some(origin) = entities.first().map(|e| e.position) else {
        return Vec3::ZERO;
    };
    let offsets: Vec<Vec3> = entities
        .iter()
        .map(|e| graph.displacement(origin, e.position))
        .collect();
    let cm = offsets.iter().fold(Vec3::ZERO, |acc, &r| acc + r) * (1.0 / entities.len() as f64);
    entities
        .iter()
        .zip(offsets)
        .fold(Vec3::ZERO, |acc, (e, r)| {
            let velocity = e.direction * e.nudge_weight();
            acc + (r - cm).cross(&velocity)
        })
}

/// Snapshot every diagnostic for the current state.
pub fn collect_diagnostics<G: GraphSubstrate + ?Sized>(
    tick: u64,
    field: &TaggedQuantumField,
    entities: &[Entity],
    graph: &G,
    hops_applied: usize,
) -> TickDiagnostics {
    let report = audit(field, tick);
    TickDiagnostics {
        tick,
        entities: entities
            .iter()
            .map(|e| EntityDiagnostics {
                tag: e.tag,
                position: e.position,
                peak: field.peak_node(e.tag),
                quanta_at_position: field.occupancy(e.position, e.tag),
                commit_counter: e.commit_counter,
                direction: e.direction.to_array(),
            })
            .collect(),
        separations: pairwise_separations(entities, graph),
        tag_totals: report.balances.iter().map(|b| b.found).collect(),
        conserved: report.is_conserved(),
        hops_applied,
        coincident_pairs: coincident_pairs(entities),
        angular_momentum: angular_momentum(entities, graph).to_array(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::PeriodicLattice;

    fn entity(tag: u16, position: NodeId, dir: Vec3, mass: i64) -> Entity {
        Entity::new(Tag(tag), mass, position, dir).unwrap()
    }

    #[test]
    fn separations_cover_every_pair() {
        let lattice = PeriodicLattice::new(10).unwrap();
        let es = vec![
            entity(0, lattice.node_at(0, 0, 0), Vec3::ZERO, 1),
            entity(1, lattice.node_at(3, 0, 0), Vec3::ZERO, 1),
            entity(2, lattice.node_at(0, 9, 0), Vec3::ZERO, 1),
        ];
        let seps = pairwise_separations(&es, &lattice);
        assert_eq!(seps.len(), 3);
        assert_eq!(seps[0].hops, Some(3));
        assert_eq!(seps[1].hops, Some(1));
        assert_eq!(seps[2].hops, Some(4));
    }

    #[test]
    fn coincident_pairs_counted() {
        let es = vec![
            entity(0, 5, Vec3::ZERO, 1),
            entity(1, 5, Vec3::ZERO, 1),
            entity(2, 6, Vec3::ZERO, 1),
        ];
        assert_eq!(coincident_pairs(&es), 1);
    }

    #[test]
    fn orbiting_pair_has_angular_momentum() {
        let lattice = PeriodicLattice::new(20).unwrap();
        let es = vec![
            entity(0, lattice.node_at(5, 10, 10), Vec3::new(0.0, 1.0, 0.0), 1),
            entity(1, lattice.node_at(15, 10, 10), Vec3::new(0.0, -1.0, 0.0), 1),
        ];
        let l = angular_momentum(&es, &lattice);
        // r = -5 x and +5 x from the midpoint, velocities +y and -y
        assert_eq!(l, Vec3::new(0.0, 0.0, -10.0));
    }

    #[test]
    fn head_on_pair_has_none() {
        let lattice = PeriodicLattice::new(20).unwrap();
        let es = vec![
            entity(0, lattice.node_at(5, 10, 10), Vec3::new(1.0, 0.0, 0.0), 3),
            entity(1, lattice.node_at(15, 10, 10), Vec3::new(-1.0, 0.0, 0.0), 3),
        ];
        assert!(angular_momentum(&es, &lattice).is_zero());
    }

    #[test]
    fn retained_fraction_of_untouched_spike_is_one() {
        let lattice = PeriodicLattice::new(6).unwrap();
        let mut field = TaggedQuantumField::new(lattice.node_count());
        let tag = field.add_spike(7, 40).unwrap();
        assert_eq!(retained_fraction(&field, &lattice, tag, 7, 0), 1.0);
    }
}
