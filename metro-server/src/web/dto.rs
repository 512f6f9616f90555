//! Data transfer objects for web requests and responses.

use serde::{Deserialize, Serialize};

use crate::domain::{Direction, ErrorKind, Station, StationId, TrainId, TrainRecord};
use crate::network::{Route, RouteMode};

/// Round a money amount to cents for display.
pub fn round_fare(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Query string for `/api/fare`.
///
/// Parameters stay as text so malformed values get a specific message.
#[derive(Debug, Default, Deserialize)]
pub struct FareQuery {
    pub from: Option<String>,
    pub to: Option<String>,
}

/// Query string for `/api/route`.
#[derive(Debug, Default, Deserialize)]
pub struct RouteQuery {
    pub from: Option<String>,
    pub to: Option<String>,

    /// `hops` (default) or `cost`
    pub mode: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct FareResponse {
    pub fare: f64,
    pub distance_km: f64,
    pub travel_time_min: u32,
}

#[derive(Debug, Serialize)]
pub struct RouteResponse {
    /// Station ids from origin to destination
    pub path: Vec<StationId>,

    pub total_fare: f64,
    pub total_hops: usize,

    /// At least one segment had no fare row and was priced at the fallback
    pub estimated: bool,

    pub mode: RouteMode,

    /// Scheduled minutes between the two stations, if the time matrix
    /// has the pair
    pub travel_time_min: Option<u32>,
}

impl RouteResponse {
    pub fn from_route(route: &Route, mode: RouteMode, travel_time_min: Option<u32>) -> Self {
        Self {
            path: route.path.clone(),
            total_fare: round_fare(route.total_fare),
            total_hops: route.hops(),
            estimated: route.estimated,
            mode,
            travel_time_min,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StationResult {
    pub station_id: StationId,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub line: String,
    pub zone: String,
}

impl From<&Station> for StationResult {
    fn from(s: &Station) -> Self {
        Self {
            station_id: s.id,
            name: s.name.clone(),
            latitude: s.latitude,
            longitude: s.longitude,
            line: s.line.clone(),
            zone: s.zone.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TrainResult {
    pub train_id: TrainId,
    pub current_station_id: StationId,
    pub station_name: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub line: String,
    pub direction: Direction,
    pub current_load: u32,
    pub capacity: u32,
    pub status: String,
}

impl TrainResult {
    pub fn from_record(record: &TrainRecord, station_name: Option<String>) -> Self {
        Self {
            train_id: record.train_id,
            current_station_id: record.current_station_id,
            station_name,
            latitude: record.latitude,
            longitude: record.longitude,
            line: record.line.as_str().to_string(),
            direction: record.direction,
            current_load: record.current_load,
            capacity: record.capacity,
            status: record.status.clone(),
        }
    }
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,

    /// Absent for malformed requests
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<ErrorKind>,
}
