//! Scripted train movement along line sequences.
//!
//! Trains don't follow the fare graph. Each one walks the ordered stop list
//! of its own line, turning around at the ends, and looks up how long each
//! hop takes in a separate time matrix.

mod engine;
mod error;
mod state;
mod topology;
mod travel;

pub use engine::{MovementEngine, MovementResult};
pub use error::MovementError;
pub use state::{Step, TrainState};
pub use topology::Topology;
pub use travel::{TravelTimes, apply_jitter};
