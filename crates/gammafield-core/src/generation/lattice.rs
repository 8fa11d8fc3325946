//! Periodic cubic lattice (3-torus), k = 6.

use serde::{Deserialize, Serialize};

use super::substrate::GraphSubstrate;
use crate::components::{NodeId, Vec3};
use crate::error::SimError;

/// Neighbors per node on the cubic lattice
pub const LATTICE_DEGREE: usize = 6;

/// Neighbor slot order: +x, -x, +y, -y, +z, -z
const OFFSETS: [(i64, i64, i64); LATTICE_DEGREE] = [
    (1, 0, 0),
    (-1, 0, 0),
    (0, 1, 0),
    (0, -1, 0),
    (0, 0, 1),
    (0, 0, -1),
];

/// `side`³ nodes with periodic boundaries
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeriodicLattice {
    side: u32,
    /// Flat adjacency, `LATTICE_DEGREE` entries per node.
    adjacency: Vec<NodeId>,
}

impl PeriodicLattice {
    pub fn new(side: u32) -> Result<Self, SimError> {
        // Below 3 the +/- neighbors coincide and headings become ambiguous.
        if side < 3 {
            return Err(SimError::InvalidConfig(format!(
                "lattice side must be at least 3, got {}",
                side
            )));
        }
        let count = (side as u64).pow(3);
        if count > NodeId::MAX as u64 {
            return Err(SimError::InvalidConfig(format!(
                "lattice side {} exceeds node id range",
                side
            )));
        }

        let s = side as i64;
        let mut adjacency = Vec::with_capacity(count as usize * LATTICE_DEGREE);
        for node in 0..count as NodeId {
            let [x, y, z] = coords(side, node);
            for (dx, dy, dz) in OFFSETS {
                let nx = (x as i64 + dx).rem_euclid(s) as u32;
                let ny = (y as i64 + dy).rem_euclid(s) as u32;
                let nz = (z as i64 + dz).rem_euclid(s) as u32;
                adjacency.push(index(side, nx, ny, nz));
            }
        }
        Ok(Self { side, adjacency })
    }

    pub fn side(&self) -> u32 {
        self.side
    }

    pub fn coords(&self, node: NodeId) -> [u32; 3] {
        coords(self.side, node)
    }

    pub fn node_at(&self, x: u32, y: u32, z: u32) -> NodeId {
        index(self.side, x % self.side, y % self.side, z % self.side)
    }

    /// Signed per-axis offset under the minimum-image convention.
    fn axis_offset(&self, from: u32, to: u32) -> i64 {
        let s = self.side as i64;
        let mut d = (to as i64 - from as i64).rem_euclid(s);
        if d > s / 2 {
            d -= s;
        }
        d
    }
}

fn coords(side: u32, node: NodeId) -> [u32; 3] {
    [node % side, (node / side) % side, node / (side * side)]
}

fn index(side: u32, x: u32, y: u32, z: u32) -> NodeId {
    x + side * (y + side * z)
}

impl GraphSubstrate for PeriodicLattice {
    fn node_count(&self) -> usize {
        self.adjacency.len() / LATTICE_DEGREE
    }

    fn neighbors(&self, node: NodeId) -> &[NodeId] {
        let start = node as usize * LATTICE_DEGREE;
        self.adjacency
            .get(start..start + LATTICE_DEGREE)
            .unwrap_or(&[])
    }

    fn degree(&self, _node: NodeId) -> usize {
        LATTICE_DEGREE
    }

    fn displacement(&self, from: NodeId, to: NodeId) -> Vec3 {
        let a = self.coords(from);
        let b = self.coords(to);
        Vec3::new(
            self.axis_offset(a[0], b[0]) as f64,
            self.axis_offset(a[1], b[1]) as f64,
            self.axis_offset(a[2], b[2]) as f64,
        )
    }

    fn hop_distance(&self, a: NodeId, b: NodeId) -> Option<u32> {
        let n = self.node_count();
        if a as usize >= n || b as usize >= n {
            return None;
        }
        let ca = self.coords(a);
        let cb = self.coords(b);
        let d: u32 = (0..3)
            .map(|i| self.axis_offset(ca[i], cb[i]).unsigned_abs() as u32)
            .sum();
        Some(d)
    }

    fn distances_from(&self, source: NodeId) -> Vec<u32> {
        if source as usize >= self.node_count() {
            return vec![u32::MAX; self.node_count()];
        }
        let c = self.coords(source);
        // Per-axis ring distances, combined in node index order
        let axis: Vec<Vec<u32>> = (0..3)
            .map(|i| {
                (0..self.side)
                    .map(|v| self.axis_offset(c[i], v).unsigned_abs() as u32)
                    .collect()
            })
            .collect();
        let mut out = Vec::with_capacity(self.node_count());
        for dz in &axis[2] {
            for dy in &axis[1] {
                for dx in &axis[0] {
                    out.push(dx + dy + dz);
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_node_has_six_distinct_neighbors() {
        let lattice = PeriodicLattice::new(4).unwrap();
        assert_eq!(lattice.node_count(), 64);
        for node in 0..64 {
            let mut n = lattice.neighbors(node).to_vec();
            n.sort_unstable();
            n.dedup();
            assert_eq!(n.len(), 6, "node {node}");
            assert!(!n.contains(&node));
        }
    }

    #[test]
    fn adjacency_is_symmetric() {
        let lattice = PeriodicLattice::new(5).unwrap();
        for node in 0..lattice.node_count() as NodeId {
            for &nb in lattice.neighbors(node) {
                assert!(lattice.neighbors(nb).contains(&node));
            }
        }
    }

    #[test]
    fn neighbor_displacements_are_unit_axes() {
        let lattice = PeriodicLattice::new(6).unwrap();
        // Corner node exercises the wrap-around
        let node = lattice.node_at(0, 0, 0);
        let dirs: Vec<Vec3> = lattice
            .neighbors(node)
            .iter()
            .map(|&nb| lattice.displacement(node, nb))
            .collect();
        assert_eq!(dirs[0], Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(dirs[1], Vec3::new(-1.0, 0.0, 0.0));
        assert_eq!(dirs[5], Vec3::new(0.0, 0.0, -1.0));
    }

    #[test]
    fn hop_distance_wraps() {
        let lattice = PeriodicLattice::new(20).unwrap();
        let a = lattice.node_at(0, 0, 0);
        let b = lattice.node_at(19, 0, 0);
        let c = lattice.node_at(10, 0, 0);
        assert_eq!(lattice.hop_distance(a, b), Some(1));
        assert_eq!(lattice.hop_distance(a, c), Some(10));
    }

    #[test]
    fn closed_form_distance_matches_bfs_ball() {
        let lattice = PeriodicLattice::new(7).unwrap();
        let center = lattice.node_at(3, 3, 3);
        let ball = lattice.ball(center, 2);
        // 1 + 6 + 18 nodes within two hops on the cubic lattice
        assert_eq!(ball.len(), 25);
        for node in ball {
            assert!(lattice.hop_distance(center, node).unwrap() <= 2);
        }
    }

    #[test]
    fn distance_map_matches_pairwise_distance() {
        let lattice = PeriodicLattice::new(6).unwrap();
        let source = lattice.node_at(1, 4, 5);
        let map = lattice.distances_from(source);
        assert_eq!(map.len(), lattice.node_count());
        for node in 0..lattice.node_count() as NodeId {
            assert_eq!(Some(map[node as usize]), lattice.hop_distance(source, node));
        }
        assert_eq!(map[source as usize], 0);
        assert_eq!(*map.iter().max().unwrap(), 9);
    }

    #[test]
    fn tiny_side_rejected() {
        assert!(PeriodicLattice::new(2).is_err());
    }
}
