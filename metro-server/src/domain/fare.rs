//! Fare rows and travel-time rows.

use serde::{Deserialize, Serialize};

use super::StationId;

/// A directed fare between two stations.
///
/// Unique per `(origin, destination)` in the store. The reverse direction
/// is only implied when no explicit reverse row exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FareEdge {
    pub origin: StationId,
    pub destination: StationId,
    pub price: f64,
    #[serde(default)]
    pub distance_km: f64,
    #[serde(default)]
    pub travel_time_min: u32,
}

impl FareEdge {
    /// Create a fare row with no distance or time data.
    pub fn new(origin: StationId, destination: StationId, price: f64) -> Self {
        Self {
            origin,
            destination,
            price,
            distance_km: 0.0,
            travel_time_min: 0,
        }
    }
}

/// Scheduled minutes between two named stops (one cell of the time matrix).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TravelTime {
    pub origin: String,
    pub destination: String,
    pub minutes: u32,
}

impl TravelTime {
    pub fn new(origin: impl Into<String>, destination: impl Into<String>, minutes: u32) -> Self {
        Self {
            origin: origin.into(),
            destination: destination.into(),
            minutes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn optional_columns_default_to_zero() {
        let json = r#"{"origin": 1, "destination": 2, "price": 2.5}"#;
        let edge: FareEdge = serde_json::from_str(json).unwrap();
        assert_eq!(edge, FareEdge::new(StationId(1), StationId(2), 2.5));
    }
}
