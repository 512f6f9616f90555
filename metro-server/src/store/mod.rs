//! Topology store: the persistence boundary.
//!
//! Routing and movement read stations, fares and the time matrix through
//! [`TopologyStore`], and write train positions back through it. Two
//! implementations are provided: an in-memory store (tests, JSON-seeded
//! demo runs) and a SQLite store.

mod memory;
mod seed;
mod sqlite;

use std::future::Future;
use std::time::Duration;

pub use memory::MemoryStore;
pub use seed::{LineDefinition, NetworkFile};
pub use sqlite::SqliteStore;

use crate::domain::{
    Coordinates, Direction, DomainError, ErrorKind, FareEdge, Station, StationId, TrainId,
    TrainRecord, TravelTime,
};

/// Errors from the topology store.
///
/// All of these surface to API callers as `TopologyIOError`.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("I/O error: {message}")]
    Io { message: String },

    #[error("invalid network data: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid stored value: {0}")]
    Invalid(#[from] DomainError),

    #[error("train {0} not found in store")]
    MissingTrain(TrainId),

    #[error("storage unavailable")]
    Unavailable,

    #[error("storage call timed out after {0:?}")]
    TimedOut(Duration),
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::TopologyIo
    }
}

/// Read/write interface to stations, fares, the time matrix and trains.
///
/// Methods return `Send` futures so callers can drive them from spawned
/// tasks. Implementations may block internally but must not hold locks
/// across calls.
pub trait TopologyStore: Send + Sync {
    /// Marker that changes whenever stations or fares change.
    ///
    /// Used to decide when a cached fare graph is stale.
    fn topology_version(&self) -> u64;

    /// All stations, ordered by id.
    fn list_stations(&self) -> impl Future<Output = Result<Vec<Station>, StoreError>> + Send;

    fn get_station(
        &self,
        id: StationId,
    ) -> impl Future<Output = Result<Option<Station>, StoreError>> + Send;

    /// All fare rows.
    fn list_fare_edges(&self) -> impl Future<Output = Result<Vec<FareEdge>, StoreError>> + Send;

    /// The explicit fare row for `(origin, destination)`, if any.
    fn get_fare(
        &self,
        origin: StationId,
        destination: StationId,
    ) -> impl Future<Output = Result<Option<FareEdge>, StoreError>> + Send;

    /// The whole time matrix.
    fn list_travel_times(
        &self,
    ) -> impl Future<Output = Result<Vec<TravelTime>, StoreError>> + Send;

    /// Minutes between two named stops, if the matrix has the pair.
    fn get_travel_time(
        &self,
        origin_name: &str,
        destination_name: &str,
    ) -> impl Future<Output = Result<Option<u32>, StoreError>> + Send;

    fn list_trains(&self) -> impl Future<Output = Result<Vec<TrainRecord>, StoreError>> + Send;

    fn get_train(
        &self,
        train_id: TrainId,
    ) -> impl Future<Output = Result<Option<TrainRecord>, StoreError>> + Send;

    /// Record a new direction after a reversal.
    fn persist_train_direction(
        &self,
        train_id: TrainId,
        direction: Direction,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Move a train to a station and adjust its passenger load.
    ///
    /// The load is clamped to `0..=capacity`.
    fn persist_train_position(
        &self,
        train_id: TrainId,
        station_id: StationId,
        coordinates: Coordinates,
        load_delta: i32,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Delete a train row. Returns whether it existed.
    fn retire_train(&self, train_id: TrainId)
    -> impl Future<Output = Result<bool, StoreError>> + Send;
}

/// Either store implementation, chosen at startup.
#[derive(Clone)]
pub enum AnyStore {
    Memory(MemoryStore),
    Sqlite(SqliteStore),
}

impl TopologyStore for AnyStore {
    fn topology_version(&self) -> u64 {
        match self {
            AnyStore::Memory(s) => s.topology_version(),
            AnyStore::Sqlite(s) => s.topology_version(),
        }
    }

    async fn list_stations(&self) -> Result<Vec<Station>, StoreError> {
        match self {
            AnyStore::Memory(s) => s.list_stations().await,
            AnyStore::Sqlite(s) => s.list_stations().await,
        }
    }

    async fn get_station(&self, id: StationId) -> Result<Option<Station>, StoreError> {
        match self {
            AnyStore::Memory(s) => s.get_station(id).await,
            AnyStore::Sqlite(s) => s.get_station(id).await,
        }
    }

    async fn list_fare_edges(&self) -> Result<Vec<FareEdge>, StoreError> {
        match self {
            AnyStore::Memory(s) => s.list_fare_edges().await,
            AnyStore::Sqlite(s) => s.list_fare_edges().await,
        }
    }

    async fn get_fare(
        &self,
        origin: StationId,
        destination: StationId,
    ) -> Result<Option<FareEdge>, StoreError> {
        match self {
            AnyStore::Memory(s) => s.get_fare(origin, destination).await,
            AnyStore::Sqlite(s) => s.get_fare(origin, destination).await,
        }
    }

    async fn list_travel_times(&self) -> Result<Vec<TravelTime>, StoreError> {
        match self {
            AnyStore::Memory(s) => s.list_travel_times().await,
            AnyStore::Sqlite(s) => s.list_travel_times().await,
        }
    }

    async fn get_travel_time(
        &self,
        origin_name: &str,
        destination_name: &str,
    ) -> Result<Option<u32>, StoreError> {
        match self {
            AnyStore::Memory(s) => s.get_travel_time(origin_name, destination_name).await,
            AnyStore::Sqlite(s) => s.get_travel_time(origin_name, destination_name).await,
        }
    }

    async fn list_trains(&self) -> Result<Vec<TrainRecord>, StoreError> {
        match self {
            AnyStore::Memory(s) => s.list_trains().await,
            AnyStore::Sqlite(s) => s.list_trains().await,
        }
    }

    async fn get_train(&self, train_id: TrainId) -> Result<Option<TrainRecord>, StoreError> {
        match self {
            AnyStore::Memory(s) => s.get_train(train_id).await,
            AnyStore::Sqlite(s) => s.get_train(train_id).await,
        }
    }

    async fn persist_train_direction(
        &self,
        train_id: TrainId,
        direction: Direction,
    ) -> Result<(), StoreError> {
        match self {
            AnyStore::Memory(s) => s.persist_train_direction(train_id, direction).await,
            AnyStore::Sqlite(s) => s.persist_train_direction(train_id, direction).await,
        }
    }

    async fn persist_train_position(
        &self,
        train_id: TrainId,
        station_id: StationId,
        coordinates: Coordinates,
        load_delta: i32,
    ) -> Result<(), StoreError> {
        match self {
            AnyStore::Memory(s) => {
                s.persist_train_position(train_id, station_id, coordinates, load_delta)
                    .await
            }
            AnyStore::Sqlite(s) => {
                s.persist_train_position(train_id, station_id, coordinates, load_delta)
                    .await
            }
        }
    }

    async fn retire_train(&self, train_id: TrainId) -> Result<bool, StoreError> {
        match self {
            AnyStore::Memory(s) => s.retire_train(train_id).await,
            AnyStore::Sqlite(s) => s.retire_train(train_id).await,
        }
    }
}
