//! Contact between entities.
//!
//! Under the inelastic policy every pair whose anchors end a tick within
//! `radius` hops leaves it sharing one heading, the normalized sum of their
//! momenta. Equal and opposite momenta cancel and both entities come to
//! rest. Quanta are never exchanged; each tag keeps its own layer.

use crate::components::{Entity, NodeId, Vec3};
use crate::config::CollisionPolicy;
use crate::generation::GraphSubstrate;

/// Heading shared by two entities after an inelastic contact.
pub fn merged_heading(a: &Entity, b: &Entity) -> Vec3 {
    (a.momentum() + b.momentum()).normalize()
}

fn in_contact<G: GraphSubstrate + ?Sized>(graph: &G, a: NodeId, b: NodeId, radius: u32) -> bool {
    if a == b {
        return true;
    }
    match radius {
        0 => false,
        1 => graph.neighbors(a).contains(&b),
        _ => graph.hop_distance(a, b).map_or(false, |d| d <= radius),
    }
}

/// Apply `policy` to every pair of `entities`, in index order.
///
/// Returns the number of pairs found in contact.
pub fn resolve_contacts<G: GraphSubstrate + ?Sized>(
    entities: &mut [Entity],
    graph: &G,
    policy: CollisionPolicy,
) -> usize {
    let radius = match policy {
        CollisionPolicy::Coexist => return 0,
        CollisionPolicy::Inelastic { radius } => radius,
    };

    let mut contacts = 0;
    for i in 0..entities.len() {
        for j in (i + 1)..entities.len() {
            if !in_contact(graph, entities[i].position, entities[j].position, radius) {
                continue;
            }
            let heading = merged_heading(&entities[i], &entities[j]);
            entities[i].direction = heading;
            entities[j].direction = heading;
            contacts += 1;
        }
    }
    contacts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::Tag;
    use crate::generation::PeriodicLattice;

    fn entity(tag: u16, mass: i64, position: NodeId, direction: Vec3) -> Entity {
        Entity::new(Tag(tag), mass, position, direction).unwrap()
    }

    #[test]
    fn head_on_equal_masses_come_to_rest() {
        let lattice = PeriodicLattice::new(8).unwrap();
        let node = lattice.node_at(4, 4, 4);
        let mut es = vec![
            entity(0, 5, node, Vec3::new(1.0, 0.0, 0.0)),
            entity(1, 5, node, Vec3::new(-1.0, 0.0, 0.0)),
        ];
        let policy = CollisionPolicy::Inelastic { radius: 1 };
        assert_eq!(resolve_contacts(&mut es, &lattice, policy), 1);
        assert!(es[0].is_at_rest());
        assert!(es[1].is_at_rest());
    }

    #[test]
    fn heavier_entity_dominates_the_shared_heading() {
        let lattice = PeriodicLattice::new(8).unwrap();
        let mut es = vec![
            entity(0, 3, lattice.node_at(2, 2, 2), Vec3::new(1.0, 0.0, 0.0)),
            entity(1, 1, lattice.node_at(3, 2, 2), Vec3::new(0.0, 1.0, 0.0)),
        ];
        let policy = CollisionPolicy::Inelastic { radius: 1 };
        assert_eq!(resolve_contacts(&mut es, &lattice, policy), 1);
        assert_eq!(es[0].direction, es[1].direction);
        assert!(es[0].direction.x > es[0].direction.y);
        assert!((es[0].direction.length() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn distant_or_coexisting_pairs_keep_their_headings() {
        let lattice = PeriodicLattice::new(8).unwrap();
        let a = Vec3::new(1.0, 0.0, 0.0);
        let b = Vec3::new(0.0, 0.0, -1.0);
        let mut far = vec![
            entity(0, 2, lattice.node_at(0, 0, 0), a),
            entity(1, 2, lattice.node_at(2, 0, 0), b),
        ];
        let inelastic = CollisionPolicy::Inelastic { radius: 1 };
        assert_eq!(resolve_contacts(&mut far, &lattice, inelastic), 0);
        let wide = CollisionPolicy::Inelastic { radius: 2 };
        assert_eq!(resolve_contacts(&mut far, &lattice, wide), 1);

        let node = lattice.node_at(5, 5, 5);
        let mut together = vec![entity(0, 2, node, a), entity(1, 2, node, b)];
        assert_eq!(resolve_contacts(&mut together, &lattice, CollisionPolicy::Coexist), 0);
        assert_eq!(together[0].direction, a);
        assert_eq!(together[1].direction, b);
    }

    #[test]
    fn radius_zero_needs_a_shared_anchor() {
        let lattice = PeriodicLattice::new(8).unwrap();
        let policy = CollisionPolicy::Inelastic { radius: 0 };
        let mut adjacent = vec![
            entity(0, 2, lattice.node_at(1, 1, 1), Vec3::new(1.0, 0.0, 0.0)),
            entity(1, 2, lattice.node_at(1, 1, 2), Vec3::ZERO),
        ];
        assert_eq!(resolve_contacts(&mut adjacent, &lattice, policy), 0);
        adjacent[1].position = adjacent[0].position;
        assert_eq!(resolve_contacts(&mut adjacent, &lattice, policy), 1);
        assert_eq!(adjacent[1].direction, Vec3::new(1.0, 0.0, 0.0));
    }
}
