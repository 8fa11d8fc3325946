//! Entity state: commit-counter mass and a continuous internal heading.

use serde::{Deserialize, Serialize};

use super::common::{NodeId, Vec3};
use super::field::Tag;
use crate::error::SimError;

/// Where an entity is in its commit cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MovePhase {
    /// Counting ticks; the entity does not move.
    Accumulating,
    /// The next tick reaches `mass` and the entity commits a move.
    Committing,
}

/// A self-gravitating lump of tagged quanta that moves through the field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub tag: Tag,
    /// Ticks required per committed move. Always >= 1.
    pub mass: u32,
    /// 0 <= commit_counter < mass between ticks.
    pub commit_counter: u32,
    /// Anchor node; hops move the quanta sitting here.
    pub position: NodeId,
    /// Unit vector, or zero for "no momentum". Never snapped to lattice axes.
    pub direction: Vec3,
}

impl Entity {
    pub fn new(tag: Tag, mass: i64, position: NodeId, direction: Vec3) -> Result<Self, SimError> {
        if mass <= 0 || mass > u32::MAX as i64 {
            return Err(SimError::InvalidMass { mass });
        }
        Ok(Self {
            tag,
            mass: mass as u32,
            commit_counter: 0,
            position,
            direction: direction.normalize(),
        })
    }

    pub fn phase(&self) -> MovePhase {
        if self.commit_counter + 1 >= self.mass {
            MovePhase::Committing
        } else {
            MovePhase::Accumulating
        }
    }

    /// Fraction of the gradient folded into `direction` per commit.
    pub fn nudge_weight(&self) -> f64 {
        1.0 / self.mass as f64
    }

    /// `mass * direction`, the weight an entity brings to a collision.
    pub fn momentum(&self) -> Vec3 {
        self.direction * self.mass as f64
    }

    pub fn is_at_rest(&self) -> bool {
        self.direction.is_zero()
    }
}

/// Hop instruction produced by an entity commit, applied by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hop {
    pub tag: Tag,
    pub from: NodeId,
    pub to: NodeId,
}
