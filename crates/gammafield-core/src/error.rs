//! Simulation errors.
//!
//! Conservation and negativity failures are logic defects, not physical
//! outcomes: a run that reports one must be discarded.

use crate::components::{NodeId, Tag};

/// Errors raised by the field, entities and engine
#[derive(Debug, Clone, PartialEq)]
pub enum SimError {
    /// A tag's total occupancy drifted from its initial mass.
    ConservationViolation {
        tag: Tag,
        expected: u64,
        found: u64,
        tick: u64,
    },
    /// A transfer tried to remove more quanta than a node holds.
    NegativeOccupancy {
        tag: Tag,
        node: NodeId,
        requested: u64,
        available: u64,
    },
    /// Commit-counter mass must be a strictly positive integer.
    InvalidMass { mass: i64 },
    InvalidConfig(String),
    UnknownTag(Tag),
    NodeOutOfRange { node: NodeId, node_count: usize },
}

impl SimError {
    /// Fatal errors invalidate the whole run.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SimError::ConservationViolation { .. } | SimError::NegativeOccupancy { .. }
        )
    }
}

impl std::fmt::Display for SimError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SimError::ConservationViolation {
                tag,
                expected,
                found,
                tick,
            } => write!(
                f,
                "Conservation violated for tag {} at tick {}: expected {} quanta, found {}",
                tag.0, tick, expected, found
            ),
            SimError::NegativeOccupancy {
                tag,
                node,
                requested,
                available,
            } => write!(
                f,
                "Negative occupancy for tag {} at node {}: requested {}, available {}",
                tag.0, node, requested, available
            ),
            SimError::InvalidMass { mass } => {
                write!(f, "Invalid mass {}: must be a positive integer", mass)
            }
            SimError::InvalidConfig(msg) => write!(f, "Invalid configuration: {}", msg),
            SimError::UnknownTag(tag) => write!(f, "Unknown tag {}", tag.0),
            SimError::NodeOutOfRange { node, node_count } => {
                write!(f, "Node {} out of range (graph has {} nodes)", node, node_count)
            }
        }
    }
}

impl std::error::Error for SimError {}
