//! Movement engine errors.

use crate::domain::{ErrorKind, StationId, TrainId};
use crate::lines::LineError;
use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum MovementError {
    /// Never initialized and the store has no row for it
    #[error("train {0} not found")]
    TrainNotFound(TrainId),

    #[error("station {0} not found")]
    UnknownStation(StationId),

    /// Unknown line, or a station missing from its line
    #[error(transparent)]
    Line(#[from] LineError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl MovementError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MovementError::TrainNotFound(_) => ErrorKind::TrainNotFound,
            MovementError::UnknownStation(_) => ErrorKind::UnknownStation,
            MovementError::Line(e) => e.kind(),
            MovementError::Store(e) => e.kind(),
        }
    }

    /// Whether retrying on a later tick can succeed.
    ///
    /// Storage failures are transient; everything else means the train's
    /// seed data disagrees with the topology.
    pub fn is_transient(&self) -> bool {
        matches!(self, MovementError::Store(_))
    }
}
