//! Errors from route and fare queries.

use crate::domain::{ErrorKind, StationId};
use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum RouteError {
    /// The station is not a node of the fare graph
    #[error("station {0} not found in network")]
    UnknownStation(StationId),

    #[error("no route from station {origin} to station {destination}")]
    NoRouteFound {
        origin: StationId,
        destination: StationId,
    },

    #[error("no fare found from station {origin} to station {destination}")]
    NoFareFound {
        origin: StationId,
        destination: StationId,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl RouteError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RouteError::UnknownStation(_) => ErrorKind::UnknownStation,
            RouteError::NoRouteFound { .. } => ErrorKind::NoRouteFound,
            RouteError::NoFareFound { .. } => ErrorKind::NoFareFound,
            RouteError::Store(e) => e.kind(),
        }
    }
}
