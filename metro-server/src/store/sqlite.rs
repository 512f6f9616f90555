//! SQLite-backed topology store.
//!
//! rusqlite is blocking, so every call runs on tokio's blocking pool with
//! the connection behind a mutex.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::domain::{
    Coordinates, Direction, FareEdge, LineId, Station, StationId, TrainId, TrainRecord,
    TravelTime,
};

use super::seed::NetworkFile;
use super::{StoreError, TopologyStore};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS stations (
    station_id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    latitude REAL NOT NULL,
    longitude REAL NOT NULL,
    line TEXT NOT NULL DEFAULT 'Unknown',
    zone TEXT NOT NULL DEFAULT 'Central',
    operational INTEGER NOT NULL DEFAULT 1
);
CREATE TABLE IF NOT EXISTS fares (
    origin_id INTEGER NOT NULL,
    destination_id INTEGER NOT NULL,
    price REAL NOT NULL,
    distance_km REAL NOT NULL DEFAULT 0,
    travel_time_min INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (origin_id, destination_id),
    FOREIGN KEY (origin_id) REFERENCES stations (station_id),
    FOREIGN KEY (destination_id) REFERENCES stations (station_id)
);
CREATE TABLE IF NOT EXISTS travel_times (
    origin TEXT NOT NULL,
    destination TEXT NOT NULL,
    minutes INTEGER NOT NULL,
    PRIMARY KEY (origin, destination)
);
CREATE TABLE IF NOT EXISTS trains (
    train_id INTEGER PRIMARY KEY,
    current_station_id INTEGER NOT NULL,
    latitude REAL NOT NULL,
    longitude REAL NOT NULL,
    line TEXT NOT NULL,
    direction TEXT NOT NULL DEFAULT 'forward',
    capacity INTEGER NOT NULL DEFAULT 300,
    current_load INTEGER NOT NULL DEFAULT 0,
    status TEXT NOT NULL DEFAULT 'active',
    last_updated TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
    FOREIGN KEY (current_station_id) REFERENCES stations (station_id)
);
CREATE TABLE IF NOT EXISTS train_movements (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    train_id INTEGER NOT NULL,
    from_station_id INTEGER NOT NULL,
    to_station_id INTEGER NOT NULL,
    passenger_count INTEGER NOT NULL DEFAULT 0,
    recorded_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
    FOREIGN KEY (train_id) REFERENCES trains (train_id)
);
CREATE INDEX IF NOT EXISTS idx_trains_station ON trains (current_station_id);
CREATE INDEX IF NOT EXISTS idx_movements_train ON train_movements (train_id);
";

const TRAIN_COLUMNS: &str = "train_id, current_station_id, latitude, longitude, line, \
                             direction, capacity, current_load, status";

/// SQLite topology store.
///
/// The schema mirrors the `stations`, `fares` and `trains` tables of the
/// tracker database, plus a flattened `travel_times` matrix and a
/// `train_movements` history written on every position change.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
    version: Arc<AtomicU64>,
}

impl SqliteStore {
    /// Open (or create) a database file and ensure the schema exists.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        Self::with_connection(Connection::open(path)?)
    }

    /// A private in-memory database, mostly for tests.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            version: Arc::new(AtomicU64::new(1)),
        })
    }

    /// Import a network file if the database has no stations yet.
    ///
    /// Returns `false` (and changes nothing) when data already exists.
    pub async fn seed_from(&self, network: &NetworkFile) -> Result<bool, StoreError> {
        let network = network.clone();
        let seeded = self
            .call(move |conn| {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM stations", [], |r| r.get(0))?;
                if count > 0 {
                    return Ok(false);
                }

                let tx = conn.transaction()?;
                for s in &network.stations {
                    tx.execute(
                        "INSERT INTO stations (station_id, name, latitude, longitude, line, zone, operational)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                        params![s.id.0, s.name, s.latitude, s.longitude, s.line, s.zone, s.operational],
                    )?;
                }
                for f in &network.fares {
                    tx.execute(
                        "INSERT OR REPLACE INTO fares (origin_id, destination_id, price, distance_km, travel_time_min)
                         VALUES (?1, ?2, ?3, ?4, ?5)",
                        params![f.origin.0, f.destination.0, f.price, f.distance_km, f.travel_time_min],
                    )?;
                }
                for t in &network.travel_times {
                    tx.execute(
                        "INSERT OR REPLACE INTO travel_times (origin, destination, minutes) VALUES (?1, ?2, ?3)",
                        params![t.origin, t.destination, t.minutes],
                    )?;
                }
                for t in &network.trains {
                    tx.execute(
                        "INSERT OR REPLACE INTO trains (train_id, current_station_id, latitude, longitude,
                             line, direction, capacity, current_load, status)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                        params![
                            t.train_id.0,
                            t.current_station_id.0,
                            t.latitude,
                            t.longitude,
                            t.line.as_str(),
                            t.direction.as_str(),
                            t.capacity,
                            t.current_load,
                            t.status
                        ],
                    )?;
                }
                tx.commit()?;
                Ok(true)
            })
            .await?;

        if seeded {
            self.version.fetch_add(1, Ordering::SeqCst);
        }
        Ok(seeded)
    }

    /// Number of recorded station-to-station movements for a train.
    pub async fn movement_count(&self, train_id: TrainId) -> Result<u64, StoreError> {
        self.call(move |conn| {
            let n: i64 = conn.query_row(
                "SELECT COUNT(*) FROM train_movements WHERE train_id = ?1",
                params![train_id.0],
                |r| r.get(0),
            )?;
            Ok(n as u64)
        })
        .await
    }

    /// Run a closure against the connection on the blocking pool.
    async fn call<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut Connection) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn.lock().map_err(|_| StoreError::Unavailable)?;
            f(&mut guard)
        })
        .await
        .map_err(|e| StoreError::Io {
            message: format!("blocking task failed: {e}"),
        })?
    }
}

fn station_from_row(row: &Row<'_>) -> rusqlite::Result<Station> {
    Ok(Station {
        id: StationId(row.get(0)?),
        name: row.get(1)?,
        latitude: row.get(2)?,
        longitude: row.get(3)?,
        line: row.get(4)?,
        zone: row.get(5)?,
        operational: row.get(6)?,
    })
}

fn fare_from_row(row: &Row<'_>) -> rusqlite::Result<FareEdge> {
    Ok(FareEdge {
        origin: StationId(row.get(0)?),
        destination: StationId(row.get(1)?),
        price: row.get(2)?,
        distance_km: row.get(3)?,
        travel_time_min: row.get(4)?,
    })
}

fn train_from_row(row: &Row<'_>) -> rusqlite::Result<TrainRecord> {
    let direction: String = row.get(5)?;
    let direction: Direction = direction
        .parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(5, Type::Text, Box::new(e)))?;
    let line: String = row.get(4)?;

    Ok(TrainRecord {
        train_id: TrainId(row.get(0)?),
        current_station_id: StationId(row.get(1)?),
        latitude: row.get(2)?,
        longitude: row.get(3)?,
        line: LineId::new(line),
        direction,
        capacity: row.get(6)?,
        current_load: row.get(7)?,
        status: row.get(8)?,
    })
}

impl TopologyStore for SqliteStore {
    fn topology_version(&self) -> u64 {
        self.version.load(Ordering::SeqCst)
    }

    async fn list_stations(&self) -> Result<Vec<Station>, StoreError> {
        self.call(|conn| {
            let mut stmt = conn.prepare(
                "SELECT station_id, name, latitude, longitude, line, zone, operational
                 FROM stations ORDER BY station_id",
            )?;
            let stations = stmt
                .query_map([], station_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(stations)
        })
        .await
    }

    async fn get_station(&self, id: StationId) -> Result<Option<Station>, StoreError> {
        self.call(move |conn| {
            let station = conn
                .query_row(
                    "SELECT station_id, name, latitude, longitude, line, zone, operational
                     FROM stations WHERE station_id = ?1",
                    params![id.0],
                    station_from_row,
                )
                .optional()?;
            Ok(station)
        })
        .await
    }

    async fn list_fare_edges(&self) -> Result<Vec<FareEdge>, StoreError> {
        self.call(|conn| {
            let mut stmt = conn.prepare(
                "SELECT origin_id, destination_id, price, distance_km, travel_time_min
                 FROM fares ORDER BY origin_id, destination_id",
            )?;
            let fares = stmt
                .query_map([], fare_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(fares)
        })
        .await
    }

    async fn get_fare(
        &self,
        origin: StationId,
        destination: StationId,
    ) -> Result<Option<FareEdge>, StoreError> {
        self.call(move |conn| {
            let fare = conn
                .query_row(
                    "SELECT origin_id, destination_id, price, distance_km, travel_time_min
                     FROM fares WHERE origin_id = ?1 AND destination_id = ?2",
                    params![origin.0, destination.0],
                    fare_from_row,
                )
                .optional()?;
            Ok(fare)
        })
        .await
    }

    async fn list_travel_times(&self) -> Result<Vec<TravelTime>, StoreError> {
        self.call(|conn| {
            let mut stmt = conn.prepare(
                "SELECT origin, destination, minutes FROM travel_times ORDER BY origin, destination",
            )?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(TravelTime {
                        origin: row.get(0)?,
                        destination: row.get(1)?,
                        minutes: row.get(2)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .await
    }

    async fn get_travel_time(
        &self,
        origin_name: &str,
        destination_name: &str,
    ) -> Result<Option<u32>, StoreError> {
        let origin = origin_name.to_string();
        let destination = destination_name.to_string();
        self.call(move |conn| {
            let minutes = conn
                .query_row(
                    "SELECT minutes FROM travel_times WHERE origin = ?1 AND destination = ?2",
                    params![origin, destination],
                    |r| r.get(0),
                )
                .optional()?;
            Ok(minutes)
        })
        .await
    }

    async fn list_trains(&self) -> Result<Vec<TrainRecord>, StoreError> {
        self.call(|conn| {
            let sql = format!("SELECT {TRAIN_COLUMNS} FROM trains ORDER BY train_id");
            let mut stmt = conn.prepare(&sql)?;
            let trains = stmt
                .query_map([], train_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(trains)
        })
        .await
    }

    async fn get_train(&self, train_id: TrainId) -> Result<Option<TrainRecord>, StoreError> {
        self.call(move |conn| {
            let sql = format!("SELECT {TRAIN_COLUMNS} FROM trains WHERE train_id = ?1");
            let train = conn
                .query_row(&sql, params![train_id.0], train_from_row)
                .optional()?;
            Ok(train)
        })
        .await
    }

    async fn persist_train_direction(
        &self,
        train_id: TrainId,
        direction: Direction,
    ) -> Result<(), StoreError> {
        self.call(move |conn| {
            let changed = conn.execute(
                "UPDATE trains SET direction = ?1, last_updated = CURRENT_TIMESTAMP
                 WHERE train_id = ?2",
                params![direction.as_str(), train_id.0],
            )?;
            if changed == 0 {
                return Err(StoreError::MissingTrain(train_id));
            }
            Ok(())
        })
        .await
    }

    async fn persist_train_position(
        &self,
        train_id: TrainId,
        station_id: StationId,
        coordinates: Coordinates,
        load_delta: i32,
    ) -> Result<(), StoreError> {
        self.call(move |conn| {
            let tx = conn.transaction()?;
            let current: Option<(i64, i64, i64)> = tx
                .query_row(
                    "SELECT current_station_id, current_load, capacity FROM trains WHERE train_id = ?1",
                    params![train_id.0],
                    |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
                )
                .optional()?;
            let (from_station, load, capacity) =
                current.ok_or(StoreError::MissingTrain(train_id))?;

            let new_load = (load + i64::from(load_delta)).clamp(0, capacity.max(0));
            tx.execute(
                "UPDATE trains
                 SET current_station_id = ?1, latitude = ?2, longitude = ?3,
                     current_load = ?4, last_updated = CURRENT_TIMESTAMP
                 WHERE train_id = ?5",
                params![
                    station_id.0,
                    coordinates.latitude,
                    coordinates.longitude,
                    new_load,
                    train_id.0
                ],
            )?;

            if from_station != station_id.0 {
                tx.execute(
                    "INSERT INTO train_movements (train_id, from_station_id, to_station_id, passenger_count)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![train_id.0, from_station, station_id.0, new_load],
                )?;
            }
            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn retire_train(&self, train_id: TrainId) -> Result<bool, StoreError> {
        self.call(move |conn| {
            let removed = conn.execute("DELETE FROM trains WHERE train_id = ?1", params![train_id.0])?;
            Ok(removed > 0)
        })
        .await
    }
}
