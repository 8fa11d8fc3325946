//! Tagged occupancy store: per-node, per-entity integer quanta.
//!
//! Layout is one dense layer per tag (`layers[tag][node]`). Entities never
//! own occupancy privately; they hold a [`Tag`] into this store.

use serde::{Deserialize, Serialize};

use super::common::NodeId;
use crate::error::SimError;

/// Identifier attached to every quantum, one per entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Tag(pub u16);

impl Tag {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Integer-valued, tagged occupancy over the nodes of a graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaggedQuantumField {
    node_count: usize,
    layers: Vec<Vec<u32>>,
    /// Quanta each tag was created with; fixed for the life of the field.
    initial_mass: Vec<u64>,
}

impl TaggedQuantumField {
    pub fn new(node_count: usize) -> Self {
        Self {
            node_count,
            layers: Vec::new(),
            initial_mass: Vec::new(),
        }
    }

    /// Empty field with the same tags and recorded masses, used as the
    /// write target of a spread step.
    pub fn empty_like(&self) -> Self {
        Self {
            node_count: self.node_count,
            layers: vec![vec![0; self.node_count]; self.layers.len()],
            initial_mass: self.initial_mass.clone(),
        }
    }

    /// Register a new tag with all of its quanta on one node (a delta spike).
    pub fn add_spike(&mut self, node: NodeId, quanta: u32) -> Result<Tag, SimError> {
        self.check_node(node)?;
        let tag = self.next_tag()?;
        let mut layer = vec![0; self.node_count];
        layer[node as usize] = quanta;
        self.layers.push(layer);
        self.initial_mass.push(quanta as u64);
        Ok(tag)
    }

    /// Register a tag with an arbitrary starting distribution.
    pub fn add_layer(&mut self, layer: Vec<u32>) -> Result<Tag, SimError> {
        if layer.len() != self.node_count {
            return Err(SimError::InvalidConfig(format!(
                "layer has {} nodes, field has {}",
                layer.len(),
                self.node_count
            )));
        }
        let tag = self.next_tag()?;
        let mass = layer.iter().map(|&q| q as u64).sum();
        self.layers.push(layer);
        self.initial_mass.push(mass);
        Ok(tag)
    }

    fn next_tag(&self) -> Result<Tag, SimError> {
        if self.layers.len() >= u16::MAX as usize {
            return Err(SimError::InvalidConfig("too many tags".into()));
        }
        Ok(Tag(self.layers.len() as u16))
    }

    pub fn node_count(&self) -> usize {
        self.node_count
    }

    pub fn tag_count(&self) -> usize {
        self.layers.len()
    }

    pub fn tags(&self) -> impl Iterator<Item = Tag> + '_ {
        (0..self.layers.len()).map(|i| Tag(i as u16))
    }

    pub fn has_tag(&self, tag: Tag) -> bool {
        tag.index() < self.layers.len()
    }

    pub fn occupancy(&self, node: NodeId, tag: Tag) -> u32 {
        self.layers
            .get(tag.index())
            .and_then(|layer| layer.get(node as usize))
            .copied()
            .unwrap_or(0)
    }

    /// Sum over all tags at one node.
    pub fn total(&self, node: NodeId) -> u64 {
        self.layers
            .iter()
            .map(|layer| layer.get(node as usize).copied().unwrap_or(0) as u64)
            .sum()
    }

    /// Total occupancy of every node, computed in one pass.
    pub fn totals(&self) -> Vec<u64> {
        let mut totals = vec![0u64; self.node_count];
        for layer in &self.layers {
            for (t, &q) in totals.iter_mut().zip(layer.iter()) {
                *t += q as u64;
            }
        }
        totals
    }

    pub fn layer(&self, tag: Tag) -> Option<&[u32]> {
        self.layers.get(tag.index()).map(|l| l.as_slice())
    }

    /// Current sum of a tag's quanta over all nodes.
    pub fn tag_total(&self, tag: Tag) -> u64 {
        self.layers
            .get(tag.index())
            .map(|layer| layer.iter().map(|&q| q as u64).sum())
            .unwrap_or(0)
    }

    pub fn initial_mass(&self, tag: Tag) -> Option<u64> {
        self.initial_mass.get(tag.index()).copied()
    }

    /// Node holding the most of this tag's quanta; lowest id wins ties.
    pub fn peak_node(&self, tag: Tag) -> Option<NodeId> {
        let layer = self.layers.get(tag.index())?;
        let mut best: Option<(NodeId, u32)> = None;
        for (node, &q) in layer.iter().enumerate() {
            if q > 0 && best.map_or(true, |(_, b)| q > b) {
                best = Some((node as NodeId, q));
            }
        }
        best.map(|(node, _)| node)
    }

    /// Add quanta to a node. Only used while building a field and by the
    /// spread kernel writing into a fresh state.
    pub(crate) fn deposit(&mut self, node: NodeId, tag: Tag, quanta: u32) {
        if let Some(cell) = self
            .layers
            .get_mut(tag.index())
            .and_then(|layer| layer.get_mut(node as usize))
        {
            *cell += quanta;
        }
    }

    /// Move `quanta` of `tag` from `src` to `dst`.
    pub fn transfer(
        &mut self,
        tag: Tag,
        src: NodeId,
        dst: NodeId,
        quanta: u32,
    ) -> Result<(), SimError> {
        self.check_node(src)?;
        self.check_node(dst)?;
        let layer = self
            .layers
            .get_mut(tag.index())
            .ok_or(SimError::UnknownTag(tag))?;
        let available = layer[src as usize];
        let remaining = available
            .checked_sub(quanta)
            .ok_or(SimError::NegativeOccupancy {
                tag,
                node: src,
                requested: quanta as u64,
                available: available as u64,
            })?;
        layer[src as usize] = remaining;
        layer[dst as usize] += quanta;
        Ok(())
    }

    /// Move every quantum of `tag` sitting on `src` to `dst`; returns the count.
    pub fn transfer_all(&mut self, tag: Tag, src: NodeId, dst: NodeId) -> Result<u32, SimError> {
        let quanta = self.occupancy(src, tag);
        self.transfer(tag, src, dst, quanta)?;
        Ok(quanta)
    }

    fn check_node(&self, node: NodeId) -> Result<(), SimError> {
        if (node as usize) < self.node_count {
            Ok(())
        } else {
            Err(SimError::NodeOutOfRange {
                node,
                node_count: self.node_count,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spike_records_initial_mass() {
        let mut field = TaggedQuantumField::new(10);
        let a = field.add_spike(3, 100).unwrap();
        let b = field.add_spike(7, 40).unwrap();
        assert_eq!(a, Tag(0));
        assert_eq!(b, Tag(1));
        assert_eq!(field.initial_mass(a), Some(100));
        assert_eq!(field.tag_total(b), 40);
        assert_eq!(field.total(3), 100);
        assert_eq!(field.totals()[7], 40);
    }

    #[test]
    fn spike_out_of_range_is_rejected() {
        let mut field = TaggedQuantumField::new(4);
        assert!(matches!(
            field.add_spike(4, 1),
            Err(SimError::NodeOutOfRange { node: 4, .. })
        ));
    }

    #[test]
    fn layers_stop_at_the_tag_limit() {
        let mut field = TaggedQuantumField::new(0);
        for _ in 0..u16::MAX {
            field.add_layer(Vec::new()).unwrap();
        }
        assert_eq!(field.tag_count(), u16::MAX as usize);
        assert!(matches!(
            field.add_layer(Vec::new()),
            Err(SimError::InvalidConfig(_))
        ));
        assert_eq!(field.tag_count(), u16::MAX as usize);
    }

    #[test]
    fn transfer_underflow_is_negative_occupancy() {
        let mut field = TaggedQuantumField::new(4);
        let tag = field.add_spike(0, 5).unwrap();
        let err = field.transfer(tag, 0, 1, 6).unwrap_err();
        assert_eq!(
            err,
            SimError::NegativeOccupancy {
                tag,
                node: 0,
                requested: 6,
                available: 5
            }
        );
        // Failed transfer leaves the field untouched
        assert_eq!(field.occupancy(0, tag), 5);
        assert_eq!(field.occupancy(1, tag), 0);
    }

    #[test]
    fn transfer_all_moves_whole_node() {
        let mut field = TaggedQuantumField::new(4);
        let tag = field.add_spike(2, 9).unwrap();
        assert_eq!(field.transfer_all(tag, 2, 3).unwrap(), 9);
        assert_eq!(field.occupancy(3, tag), 9);
        assert_eq!(field.tag_total(tag), 9);
    }

    #[test]
    fn peak_prefers_lowest_node_on_tie() {
        let mut field = TaggedQuantumField::new(5);
        let tag = field.add_layer(vec![0, 4, 1, 4, 0]).unwrap();
        assert_eq!(field.peak_node(tag), Some(1));
        assert_eq!(field.initial_mass(tag), Some(9));
    }
}
