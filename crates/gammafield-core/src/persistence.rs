//! Save/Load functionality for persisting simulation state
//!
//! Uses bincode for efficient binary serialization of the entire simulation.
//! The graph is not stored: it is rebuilt from the config and seed, which
//! reproduces the same adjacency. The RNG state is stored so a resumed run
//! continues the exact random stream.

use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

use crate::components::*;
use crate::config::RunConfig;
use crate::engine::{RunProgress, SimulationEngine};
use crate::error::SimError;
use crate::generation::Topology;

/// Version number for save file format (increment when format changes)
const SAVE_VERSION: u32 = 1;

/// Serializable snapshot of the simulation state
#[derive(Serialize, Deserialize)]
pub struct SaveData {
    /// Save format version
    pub version: u32,
    pub config: RunConfig,
    pub field: TaggedQuantumField,
    pub entities: Vec<Entity>,
    /// Position in the random stream
    pub rng: ChaCha8Rng,
    pub progress: RunProgress,
}

/// Save the complete simulation to a writer
pub fn save_simulation<W: Write>(writer: W, engine: &SimulationEngine) -> Result<(), SaveError> {
    let save_data = SaveData {
        version: SAVE_VERSION,
        config: engine.config().clone(),
        field: engine.field().clone(),
        entities: engine.entities().to_vec(),
        rng: engine.rng().clone(),
        progress: engine.progress(),
    };

    bincode::serialize_into(writer, &save_data)?;
    log::debug!(
        "saved run '{}' at tick {}",
        save_data.config.name,
        save_data.progress.tick
    );
    Ok(())
}

/// Load a simulation from a reader
pub fn load_simulation<R: Read>(reader: R) -> Result<SimulationEngine, SaveError> {
    let save_data: SaveData = bincode::deserialize_from(reader)?;

    if save_data.version != SAVE_VERSION {
        return Err(SaveError::VersionMismatch {
            expected: SAVE_VERSION,
            found: save_data.version,
        });
    }

    save_data.config.validate()?;
    let topology = Topology::build(&save_data.config.topology, save_data.config.seed)?;
    let engine = SimulationEngine::assemble(
        save_data.config,
        topology,
        save_data.field,
        save_data.entities,
        save_data.rng,
        save_data.progress,
    )?;
    log::debug!("loaded run '{}' at tick {}", engine.config().name, engine.tick());
    Ok(engine)
}

/// Errors that can occur during save/load
#[derive(Debug)]
pub enum SaveError {
    Io(std::io::Error),
    Bincode(Box<bincode::ErrorKind>),
    VersionMismatch { expected: u32, found: u32 },
    /// The snapshot decoded but does not describe a valid run
    Invalid(SimError),
}

impl From<std::io::Error> for SaveError {
    fn from(e: std::io::Error) -> Self {
        SaveError::Io(e)
    }
}

impl From<Box<bincode::ErrorKind>> for SaveError {
    fn from(e: Box<bincode::ErrorKind>) -> Self {
        SaveError::Bincode(e)
    }
}

impl From<SimError> for SaveError {
    fn from(e: SimError) -> Self {
        SaveError::Invalid(e)
    }
}

impl std::fmt::Display for SaveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SaveError::Io(e) => write!(f, "IO error: {}", e),
            SaveError::Bincode(e) => write!(f, "Serialization error: {}", e),
            SaveError::VersionMismatch { expected, found } => {
                write!(
                    f,
                    "Save version mismatch: expected {}, found {}",
                    expected, found
                )
            }
            SaveError::Invalid(e) => write!(f, "Invalid snapshot: {}", e),
        }
    }
}

impl std::error::Error for SaveError {}
