//! Data types for the simulation.
//!
//! Components are plain data: the tagged field, entities and vectors.
//! Behavior that reads or transforms them lives in systems.

mod common;
mod entity;
mod field;

pub use common::*;
pub use entity::*;
pub use field::*;
