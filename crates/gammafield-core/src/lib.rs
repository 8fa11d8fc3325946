//! GammaField Core - self-gravitating quantum field on a discrete graph
//!
//! Every entity is a tagged population of indivisible quanta living in one
//! shared field. Each tick the field spreads by random integer transport
//! whose outflow shrinks with local density, so a concentrated population
//! stays bound. Entities steer by the field the *other* tags produce at
//! their anchor node and hop once every `mass` ticks.
//!
//! # Architecture
//!
//! - **Components**: pure data (the field, entities, vectors)
//! - **Generation**: graph substrates and initial placement
//! - **Systems**: logic that reads and transforms the field and entities
//! - **Engine**: phase-ordered tick loop, diagnostics and save/load
//!
//! # Example
//!
//! ```rust,no_run
//! use gammafield_core::prelude::*;
//!
//! let mut engine = SimulationEngine::new(RunConfig::default()).unwrap();
//! let summary = engine.run().unwrap();
//! println!("separation change: {:?}", summary.separation_change());
//! ```

pub mod components;
pub mod config;
pub mod engine;
pub mod error;
pub mod generation;
pub mod persistence;
pub mod systems;

/// Commonly used types for convenient importing
pub mod prelude {
    pub use crate::components::*;
    pub use crate::config::{
        CollisionPolicy, EntitySpec, RunConfig, SignalKind, SpreadRuleKind, TopologyConfig,
    };
    pub use crate::engine::{RunSummary, SimulationEngine, TickReport};
    pub use crate::error::SimError;
    pub use crate::generation::{GraphSubstrate, PeriodicLattice, Topology};
}
