//! Entity spawning: each spec becomes a delta spike in the field.

use super::topology::Topology;
use crate::components::{Entity, NodeId, Tag, TaggedQuantumField, Vec3};
use crate::config::EntitySpec;
use crate::error::SimError;
use crate::generation::GraphSubstrate;

/// Resolve where a spec starts.
pub fn resolve_node(topology: &Topology, spec: &EntitySpec) -> Result<NodeId, SimError> {
    match (spec.node, spec.coords) {
        (Some(node), _) => {
            if (node as usize) < topology.node_count() {
                Ok(node)
            } else {
                Err(SimError::NodeOutOfRange {
                    node,
                    node_count: topology.node_count(),
                })
            }
        }
        (None, Some(coords)) => topology.node_at(coords),
        (None, None) => Err(SimError::InvalidConfig(
            "entity needs a node or coords".into(),
        )),
    }
}

/// Add one tag per spec to `field` and build the matching entities.
///
/// Tags are assigned in spec order, so entity `i` owns `Tag(i)` on a field
/// that had no tags before.
pub fn spawn_entities(
    field: &mut TaggedQuantumField,
    topology: &Topology,
    specs: &[EntitySpec],
) -> Result<Vec<Entity>, SimError> {
    let mut entities = Vec::with_capacity(specs.len());
    for spec in specs {
        let node = resolve_node(topology, spec)?;
        // Validate mass before touching the field so a bad spec adds no tag.
        let checked = Entity::new(Tag(0), spec.mass, node, Vec3::from_array(spec.direction))?;
        let tag = field.add_spike(node, spec.quanta)?;
        entities.push(Entity { tag, ..checked });
    }
    Ok(entities)
}
