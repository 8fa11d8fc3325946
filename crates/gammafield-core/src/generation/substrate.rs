//! Read-only graph interface consumed by the field and entities.

use std::collections::VecDeque;

use crate::components::{NodeId, Vec3};

/// Immutable adjacency structure over `node_count()` nodes.
///
/// The dynamics only need `neighbors`, `degree` and `node_count`.
/// `displacement` supplies the embedding offset that turns a neighbor into a
/// heading for the entity movement model. `distances_from` feeds the
/// potential signal; `hop_distance` is for diagnostics and contacts.
pub trait GraphSubstrate {
    fn node_count(&self) -> usize;

    fn neighbors(&self, node: NodeId) -> &[NodeId];

    fn degree(&self, node: NodeId) -> usize {
        self.neighbors(node).len()
    }

    /// Offset from `from` to `to` in the graph's embedding.
    fn displacement(&self, from: NodeId, to: NodeId) -> Vec3;

    /// Shortest path length in hops, or `None` if unreachable.
    fn hop_distance(&self, a: NodeId, b: NodeId) -> Option<u32> {
        if a == b {
            return Some(0);
        }
        let n = self.node_count();
        if a as usize >= n || b as usize >= n {
            return None;
        }
        let mut dist = vec![u32::MAX; n];
        let mut queue = VecDeque::new();
        dist[a as usize] = 0;
        queue.push_back(a);
        while let Some(node) = queue.pop_front() {
            let d = dist[node as usize];
            for &next in self.neighbors(node) {
                if dist[next as usize] == u32::MAX {
                    if next == b {
                        return Some(d + 1);
                    }
                    dist[next as usize] = d + 1;
                    queue.push_back(next);
                }
            }
        }
        None
    }

    /// Hop distance from `source` to every node; `u32::MAX` where unreachable.
    fn distances_from(&self, source: NodeId) -> Vec<u32> {
        let n = self.node_count();
        let mut dist = vec![u32::MAX; n];
        if source as usize >= n {
            return dist;
        }
        let mut queue = VecDeque::new();
        dist[source as usize] = 0;
        queue.push_back(source);
        while let Some(node) = queue.pop_front() {
            let d = dist[node as usize];
            for &next in self.neighbors(node) {
                if dist[next as usize] == u32::MAX {
                    dist[next as usize] = d + 1;
                    queue.push_back(next);
                }
            }
        }
        dist
    }

    /// Every node at most `radius` hops from `center`, center included.
    fn ball(&self, center: NodeId, radius: u32) -> Vec<NodeId> {
        let n = self.node_count();
        if center as usize >= n {
            return Vec::new();
        }
        let mut dist = vec![u32::MAX; n];
        let mut queue = VecDeque::new();
        let mut out = vec![center];
        dist[center as usize] = 0;
        queue.push_back(center);
        while let Some(node) = queue.pop_front() {
            let d = dist[node as usize];
            if d == radius {
                continue;
            }
            for &next in self.neighbors(node) {
                if dist[next as usize] == u32::MAX {
                    dist[next as usize] = d + 1;
                    out.push(next);
                    queue.push_back(next);
                }
            }
        }
        out
    }
}
