//! The train position event sent to clients.

use serde::{Deserialize, Serialize};

use crate::domain::{Direction, StationId, TrainId};
use crate::movement::MovementResult;

/// One train arriving at a station.
///
/// This is the wire record for every transport. `timestamp` is seconds since
/// the Unix epoch with sub-second precision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainEvent {
    pub train_id: TrainId,
    pub station_id: StationId,
    pub station_name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub line: String,
    pub direction: Direction,
    pub timestamp: f64,
}

impl From<&MovementResult> for TrainEvent {
    fn from(result: &MovementResult) -> Self {
        Self {
            train_id: result.train_id,
            station_id: result.station_id,
            station_name: result.station_name.clone(),
            latitude: result.coordinates.latitude,
            longitude: result.coordinates.longitude,
            line: result.line_id.as_str().to_string(),
            direction: result.direction,
            timestamp: result.timestamp.timestamp_micros() as f64 / 1_000_000.0,
        }
    }
}
