//! Station identity and records.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Numeric station identifier, as stored in the `stations` table.
///
/// # Examples
///
/// ```
/// use metro_server::domain::StationId;
///
/// let klcc = StationId(10);
/// assert_eq!(klcc.to_string(), "10");
/// assert!(StationId(1) < klcc);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StationId(pub i64);

impl fmt::Debug for StationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StationId({})", self.0)
    }
}

impl fmt::Display for StationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A WGS84 position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

fn default_line() -> String {
    "Unknown".to_string()
}

fn default_zone() -> String {
    "Central".to_string()
}

fn default_operational() -> bool {
    true
}

/// A station as loaded from the topology store.
///
/// Stations are immutable for the lifetime of the process. The `line`
/// field is descriptive only: movement uses line sequences and routing
/// uses fare rows, neither of which reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Station {
    pub id: StationId,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,

    /// Display line name (e.g. "LRT Kelana Jaya")
    #[serde(default = "default_line")]
    pub line: String,

    #[serde(default = "default_zone")]
    pub zone: String,

    /// Closed stations are hidden from listings but still routable
    #[serde(default = "default_operational")]
    pub operational: bool,
}

impl Station {
    /// Create an operational station with default line and zone.
    pub fn new(id: StationId, name: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            id,
            name: name.into(),
            latitude,
            longitude,
            line: default_line(),
            zone: default_zone(),
            operational: true,
        }
    }

    /// Set the display line.
    pub fn on_line(mut self, line: impl Into<String>) -> Self {
        self.line = line.into();
        self
    }

    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.latitude, self.longitude)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_and_debug() {
        assert_eq!(StationId(42).to_string(), "42");
        assert_eq!(format!("{:?}", StationId(42)), "StationId(42)");
    }

    #[test]
    fn ordering_follows_raw_id() {
        let mut ids = vec![StationId(3), StationId(1), StationId(2)];
        ids.sort();
        assert_eq!(ids, vec![StationId(1), StationId(2), StationId(3)]);
    }

    #[test]
    fn deserialize_applies_defaults() {
        let json = r#"{"id": 7, "name": "KLCC", "latitude": 3.1578, "longitude": 101.7122}"#;
        let station: Station = serde_json::from_str(json).unwrap();

        assert_eq!(station.id, StationId(7));
        assert_eq!(station.line, "Unknown");
        assert_eq!(station.zone, "Central");
        assert!(station.operational);
    }

    #[test]
    fn id_serializes_as_plain_integer() {
        let json = serde_json::to_string(&StationId(15)).unwrap();
        assert_eq!(json, "15");
    }

    #[test]
    fn coordinates_copy_position() {
        let station = Station::new(StationId(1), "Gombak", 3.2647, 101.6527);
        let coords = station.coordinates();
        assert_eq!(coords.latitude, 3.2647);
        assert_eq!(coords.longitude, 101.6527);
    }
}
