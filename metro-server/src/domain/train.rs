//! Train identity and persisted train rows.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{Coordinates, Direction, LineId, StationId};

/// Default seating plus standing capacity of a train set.
pub const DEFAULT_CAPACITY: u32 = 300;

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrainId(pub i64);

impl fmt::Debug for TrainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TrainId({})", self.0)
    }
}

impl fmt::Display for TrainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn default_capacity() -> u32 {
    DEFAULT_CAPACITY
}

fn default_status() -> String {
    "active".to_string()
}

/// A train row as persisted by the topology store.
///
/// This is the boundary view of a train. The in-memory movement state
/// lives in [`crate::movement::TrainState`] and is seeded from this row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainRecord {
    pub train_id: TrainId,
    pub current_station_id: StationId,
    pub latitude: f64,
    pub longitude: f64,
    pub line: LineId,
    #[serde(default)]
    pub direction: Direction,
    #[serde(default = "default_capacity")]
    pub capacity: u32,
    #[serde(default)]
    pub current_load: u32,
    #[serde(default = "default_status")]
    pub status: String,
}

impl TrainRecord {
    /// An empty, active train parked at a station.
    pub fn new(
        train_id: TrainId,
        station: StationId,
        coordinates: Coordinates,
        line: LineId,
        direction: Direction,
    ) -> Self {
        Self {
            train_id,
            current_station_id: station,
            latitude: coordinates.latitude,
            longitude: coordinates.longitude,
            line,
            direction,
            capacity: DEFAULT_CAPACITY,
            current_load: 0,
            status: default_status(),
        }
    }

    /// Apply a passenger change, clamping to `0..=capacity`.
    pub fn apply_load_delta(&mut self, delta: i32) {
        let load = i64::from(self.current_load) + i64::from(delta);
        self.current_load = load.clamp(0, i64::from(self.capacity)) as u32;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> TrainRecord {
        TrainRecord::new(
            TrainId(1),
            StationId(1),
            Coordinates::new(3.0, 101.0),
            LineId::from("L"),
            Direction::Forward,
        )
    }

    #[test]
    fn load_never_negative() {
        let mut r = record();
        r.apply_load_delta(-5);
        assert_eq!(r.current_load, 0);
    }

    #[test]
    fn load_capped_at_capacity() {
        let mut r = record();
        r.current_load = 295;
        r.apply_load_delta(15);
        assert_eq!(r.current_load, DEFAULT_CAPACITY);
    }

    #[test]
    fn load_accumulates() {
        let mut r = record();
        r.apply_load_delta(10);
        r.apply_load_delta(-3);
        assert_eq!(r.current_load, 7);
    }

    #[test]
    fn deserialize_defaults() {
        let json = r#"{"train_id": 4, "current_station_id": 15, "latitude": 3.1,
                       "longitude": 101.6, "line": "LRT Ampang"}"#;
        let r: TrainRecord = serde_json::from_str(json).unwrap();
        assert_eq!(r.direction, Direction::Forward);
        assert_eq!(r.capacity, 300);
        assert_eq!(r.status, "active");
    }
}
