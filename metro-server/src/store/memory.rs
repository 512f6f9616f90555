//! In-memory topology store.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tokio::sync::RwLock;

use crate::domain::{
    Coordinates, Direction, FareEdge, Station, StationId, TrainId, TrainRecord, TravelTime,
};

use super::seed::NetworkFile;
use super::{StoreError, TopologyStore};

#[derive(Debug, Default)]
struct Tables {
    stations: BTreeMap<StationId, Station>,
    fares: BTreeMap<(StationId, StationId), FareEdge>,
    travel_times: HashMap<(String, String), u32>,
    trains: BTreeMap<TrainId, TrainRecord>,
}

/// Thread-safe in-memory store.
///
/// Cloning shares the underlying tables. Station and fare inserts bump the
/// topology version; train writes do not.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
    version: Arc<AtomicU64>,
    unavailable: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding everything in a network file.
    pub fn from_network(network: &NetworkFile) -> Self {
        let tables = Tables {
            stations: network
                .stations
                .iter()
                .map(|s| (s.id, s.clone()))
                .collect(),
            fares: network
                .fares
                .iter()
                .map(|f| ((f.origin, f.destination), f.clone()))
                .collect(),
            travel_times: network
                .travel_times
                .iter()
                .map(|t| ((t.origin.clone(), t.destination.clone()), t.minutes))
                .collect(),
            trains: network
                .trains
                .iter()
                .map(|t| (t.train_id, t.clone()))
                .collect(),
        };

        Self {
            tables: Arc::new(RwLock::new(tables)),
            version: Arc::new(AtomicU64::new(1)),
            unavailable: Arc::new(AtomicBool::new(false)),
        }
    }

    pub async fn insert_station(&self, station: Station) {
        self.tables.write().await.stations.insert(station.id, station);
        self.version.fetch_add(1, Ordering::SeqCst);
    }

    /// Insert or replace the fare row for `(origin, destination)`.
    pub async fn insert_fare(&self, fare: FareEdge) {
        self.tables
            .write()
            .await
            .fares
            .insert((fare.origin, fare.destination), fare);
        self.version.fetch_add(1, Ordering::SeqCst);
    }

    pub async fn insert_travel_time(&self, row: TravelTime) {
        self.tables
            .write()
            .await
            .travel_times
            .insert((row.origin, row.destination), row.minutes);
    }

    pub async fn insert_train(&self, train: TrainRecord) {
        self.tables.write().await.trains.insert(train.train_id, train);
    }

    /// Simulate a storage outage: while set, every call fails with
    /// [`StoreError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable)
        } else {
            Ok(())
        }
    }
}

impl TopologyStore for MemoryStore {
    fn topology_version(&self) -> u64 {
        self.version.load(Ordering::SeqCst)
    }

    async fn list_stations(&self) -> Result<Vec<Station>, StoreError> {
        self.check_available()?;
        Ok(self.tables.read().await.stations.values().cloned().collect())
    }

    async fn get_station(&self, id: StationId) -> Result<Option<Station>, StoreError> {
        self.check_available()?;
        Ok(self.tables.read().await.stations.get(&id).cloned())
    }

    async fn list_fare_edges(&self) -> Result<Vec<FareEdge>, StoreError> {
        self.check_available()?;
        Ok(self.tables.read().await.fares.values().cloned().collect())
    }

    async fn get_fare(
        &self,
        origin: StationId,
        destination: StationId,
    ) -> Result<Option<FareEdge>, StoreError> {
        self.check_available()?;
        Ok(self
            .tables
            .read()
            .await
            .fares
            .get(&(origin, destination))
            .cloned())
    }

    async fn list_travel_times(&self) -> Result<Vec<TravelTime>, StoreError> {
        self.check_available()?;
        let tables = self.tables.read().await;
        let mut rows: Vec<TravelTime> = tables
            .travel_times
            .iter()
            .map(|((o, d), m)| TravelTime::new(o.clone(), d.clone(), *m))
            .collect();
        rows.sort_by(|a, b| (&a.origin, &a.destination).cmp(&(&b.origin, &b.destination)));
        Ok(rows)
    }

    async fn get_travel_time(
        &self,
        origin_name: &str,
        destination_name: &str,
    ) -> Result<Option<u32>, StoreError> {
        self.check_available()?;
        let key = (origin_name.to_string(), destination_name.to_string());
        Ok(self.tables.read().await.travel_times.get(&key).copied())
    }

    async fn list_trains(&self) -> Result<Vec<TrainRecord>, StoreError> {
        self.check_available()?;
        Ok(self.tables.read().await.trains.values().cloned().collect())
    }

    async fn get_train(&self, train_id: TrainId) -> Result<Option<TrainRecord>, StoreError> {
        self.check_available()?;
        Ok(self.tables.read().await.trains.get(&train_id).cloned())
    }

    async fn persist_train_direction(
        &self,
        train_id: TrainId,
        direction: Direction,
    ) -> Result<(), StoreError> {
        self.check_available()?;
        let mut tables = self.tables.write().await;
        let train = tables
            .trains
            .get_mut(&train_id)
            .ok_or(StoreError::MissingTrain(train_id))?;
        train.direction = direction;
        Ok(())
    }

    async fn persist_train_position(
        &self,
        train_id: TrainId,
        station_id: StationId,
        coordinates: Coordinates,
        load_delta: i32,
    ) -> Result<(), StoreError> {
        self.check_available()?;
        let mut tables = self.tables.write().await;
        let train = tables
            .trains
            .get_mut(&train_id)
            .ok_or(StoreError::MissingTrain(train_id))?;
        train.current_station_id = station_id;
        train.latitude = coordinates.latitude;
        train.longitude = coordinates.longitude;
        train.apply_load_delta(load_delta);
        Ok(())
    }

    async fn retire_train(&self, train_id: TrainId) -> Result<bool, StoreError> {
        self.check_available()?;
        Ok(self.tables.write().await.trains.remove(&train_id).is_some())
    }
}
