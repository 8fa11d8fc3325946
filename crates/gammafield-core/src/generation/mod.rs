//! Generation - graph topologies and initial entity placement.

mod entities;
mod lattice;
mod rewire;
mod substrate;
mod topology;

pub use entities::*;
pub use lattice::*;
pub use rewire::*;
pub use substrate::*;
pub use topology::*;
