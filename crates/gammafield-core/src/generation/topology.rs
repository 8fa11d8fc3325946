//! Concrete graph selected by a [`TopologyConfig`].

use super::lattice::PeriodicLattice;
use super::rewire::RewiredLattice;
use super::substrate::GraphSubstrate;
use crate::components::{NodeId, Vec3};
use crate::config::TopologyConfig;
use crate::error::SimError;

/// The graph a run lives on
#[derive(Debug, Clone)]
pub enum Topology {
    Lattice(PeriodicLattice),
    Rewired(RewiredLattice),
}

impl Topology {
    /// Build the graph. `seed` only matters for rewiring.
    pub fn build(config: &TopologyConfig, seed: u64) -> Result<Self, SimError> {
        match *config {
            TopologyConfig::Lattice { side } => Ok(Topology::Lattice(PeriodicLattice::new(side)?)),
            TopologyConfig::Rewired { side, fraction } => {
                // Decorrelate the wiring stream from the transport stream.
                let wiring_seed = seed ^ 0x9e37_79b9_7f4a_7c15;
                Ok(Topology::Rewired(RewiredLattice::new(
                    side,
                    fraction,
                    wiring_seed,
                )?))
            }
        }
    }

    /// The underlying lattice embedding.
    pub fn lattice(&self) -> &PeriodicLattice {
        match self {
            Topology::Lattice(l) => l,
            Topology::Rewired(r) => r.lattice(),
        }
    }

    pub fn node_at(&self, coords: [u32; 3]) -> Result<NodeId, SimError> {
        let lattice = self.lattice();
        let side = lattice.side();
        if coords.iter().any(|&c| c >= side) {
            return Err(SimError::InvalidConfig(format!(
                "coords {:?} outside a lattice of side {}",
                coords, side
            )));
        }
        Ok(lattice.node_at(coords[0], coords[1], coords[2]))
    }
}

impl GraphSubstrate for Topology {
    fn node_count(&self) -> usize {
        match self {
            Topology::Lattice(l) => l.node_count(),
            Topology::Rewired(r) => r.node_count(),
        }
    }

    fn neighbors(&self, node: NodeId) -> &[NodeId] {
        match self {
            Topology::Lattice(l) => l.neighbors(node),
            Topology::Rewired(r) => r.neighbors(node),
        }
    }

    fn degree(&self, node: NodeId) -> usize {
        match self {
            Topology::Lattice(l) => l.degree(node),
            Topology::Rewired(r) => r.degree(node),
        }
    }

    fn displacement(&self, from: NodeId, to: NodeId) -> Vec3 {
        match self {
            Topology::Lattice(l) => l.displacement(from, to),
            Topology::Rewired(r) => r.displacement(from, to),
        }
    }

    fn hop_distance(&self, a: NodeId, b: NodeId) -> Option<u32> {
        match self {
            Topology::Lattice(l) => l.hop_distance(a, b),
            Topology::Rewired(r) => r.hop_distance(a, b),
        }
    }

    fn distances_from(&self, source: NodeId) -> Vec<u32> {
        match self {
            Topology::Lattice(l) => l.distances_from(source),
            Topology::Rewired(r) => r.distances_from(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lattice_topology_from_config() {
        let topo = Topology::build(&TopologyConfig::Lattice { side: 5 }, 0).unwrap();
        assert_eq!(topo.node_count(), 125);
        assert_eq!(topo.node_at([1, 2, 3]).unwrap(), 1 + 5 * (2 + 5 * 3));
        assert!(topo.node_at([5, 0, 0]).is_err());
    }

    #[test]
    fn rewired_topology_uses_bfs_distance() {
        let topo = Topology::build(
            &TopologyConfig::Rewired {
                side: 5,
                fraction: 0.2,
            },
            3,
        )
        .unwrap();
        let a = topo.node_at([0, 0, 0]).unwrap();
        for &nb in topo.neighbors(a) {
            assert_eq!(topo.hop_distance(a, nb), Some(1));
        }
        let map = topo.distances_from(a);
        for node in (0..topo.node_count() as NodeId).step_by(7) {
            assert_eq!(Some(map[node as usize]), topo.hop_distance(a, node));
        }
    }
}
