//! Systems - logic that reads and transforms the field and entities

mod collision;
mod conservation;
mod diagnostics;
mod movement;
mod sampling;
mod signal;
mod spread;

pub use collision::*;
pub use conservation::*;
pub use diagnostics::*;
pub use movement::*;
pub use sampling::*;
pub use signal::*;
pub use spread::*;
