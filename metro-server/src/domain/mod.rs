//! Domain types for the metro tracker.
//!
//! Stations, fares, lines and trains as the rest of the crate sees them.
//! Types with invariants (such as [`LineSequence`]) enforce them at
//! construction time.

mod direction;
mod error;
mod fare;
mod line;
mod station;
mod train;

pub use direction::Direction;
pub use error::{DomainError, ErrorKind};
pub use fare::{FareEdge, TravelTime};
pub use line::{LineId, LineSequence};
pub use station::{Coordinates, Station, StationId};
pub use train::{DEFAULT_CAPACITY, TrainId, TrainRecord};
