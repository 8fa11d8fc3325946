//! Degree-preserving rewiring of a periodic lattice.
//!
//! Random double-edge swaps: (a,b),(c,d) -> (a,d),(c,b). Every node keeps
//! degree k, so the `alpha = 1/k` speed of light stays uniform. Swaps that
//! would create a self-loop or a parallel edge are rejected.

use std::collections::HashSet;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use super::lattice::{PeriodicLattice, LATTICE_DEGREE};
use super::substrate::GraphSubstrate;
use crate::components::{NodeId, Vec3};
use crate::error::SimError;

/// A lattice with a fraction of its edges randomly rewired
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewiredLattice {
    base: PeriodicLattice,
    adjacency: Vec<NodeId>,
    swaps_applied: usize,
}

impl RewiredLattice {
    /// Rewire `fraction` (0..=1) of the lattice's edges.
    pub fn new(side: u32, fraction: f64, seed: u64) -> Result<Self, SimError> {
        if !(0.0..=1.0).contains(&fraction) {
            return Err(SimError::InvalidConfig(format!(
                "rewire fraction must be in [0, 1], got {}",
                fraction
            )));
        }
        let base = PeriodicLattice::new(side)?;
        let n = base.node_count();

        // Each undirected edge once: the +x, +y, +z slots of every node.
        let mut edges: Vec<(NodeId, NodeId)> = Vec::with_capacity(n * LATTICE_DEGREE / 2);
        for node in 0..n as NodeId {
            let nb = base.neighbors(node);
            for slot in [0, 2, 4] {
                edges.push((node, nb[slot]));
            }
        }
        let mut present: HashSet<(NodeId, NodeId)> =
            edges.iter().map(|&(a, b)| edge_key(a, b)).collect();

        let target = (edges.len() as f64 * fraction).round() as usize;
        let max_attempts = target.saturating_mul(20).max(100);
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut swaps_applied = 0;
        let mut attempts = 0;

        while swaps_applied < target && attempts < max_attempts {
            attempts += 1;
            let i = rng.gen_range(0..edges.len());
            let j = rng.gen_range(0..edges.len());
            if i == j {
                continue;
            }
            let (a, b) = edges[i];
            let (c, d) = if rng.gen_bool(0.5) {
                edges[j]
            } else {
                (edges[j].1, edges[j].0)
            };
            if a == d || c == b {
                continue;
            }
            let new_ad = edge_key(a, d);
            let new_cb = edge_key(c, b);
            if new_ad == new_cb || present.contains(&new_ad) || present.contains(&new_cb) {
                continue;
            }
            present.remove(&edge_key(a, b));
            present.remove(&edge_key(c, d));
            present.insert(new_ad);
            present.insert(new_cb);
            edges[i] = (a, d);
            edges[j] = (c, b);
            swaps_applied += 1;
        }

        if swaps_applied < target {
            log::warn!(
                "rewiring stopped after {} attempts: {}/{} swaps applied",
                attempts,
                swaps_applied,
                target
            );
        }

        let mut lists: Vec<Vec<NodeId>> = vec![Vec::with_capacity(LATTICE_DEGREE); n];
        for &(a, b) in &edges {
            lists[a as usize].push(b);
            lists[b as usize].push(a);
        }
        let mut adjacency = Vec::with_capacity(n * LATTICE_DEGREE);
        for mut list in lists {
            list.sort_unstable();
            adjacency.extend(list);
        }

        Ok(Self {
            base,
            adjacency,
            swaps_applied,
        })
    }

    pub fn side(&self) -> u32 {
        self.base.side()
    }

    pub fn swaps_applied(&self) -> usize {
        self.swaps_applied
    }

    pub fn lattice(&self) -> &PeriodicLattice {
        &self.base
    }
}

fn edge_key(a: NodeId, b: NodeId) -> (NodeId, NodeId) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

impl GraphSubstrate for RewiredLattice {
    fn node_count(&self) -> usize {
        self.base.node_count()
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

    /// Rewired shortcuts keep the lattice embedding, so a long edge points
    /// along its minimum-image offset.
    fn displacement(&self, from: NodeId, to: NodeId) -> Vec3 {
        self.base.displacement(from, to)
    }
}
