//! JSON network description used to seed a store.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::{FareEdge, LineId, Station, TrainRecord, TravelTime};
use crate::lines::{LineError, LineTable};

use super::StoreError;

/// One line's stop sequence as written in the network file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineDefinition {
    pub id: LineId,
    pub stations: Vec<String>,
}

/// Everything needed to stand up a network: the store's tables plus the
/// line sequences, which live in configuration rather than the store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkFile {
    pub stations: Vec<Station>,
    pub fares: Vec<FareEdge>,
    #[serde(default)]
    pub travel_times: Vec<TravelTime>,
    pub lines: Vec<LineDefinition>,
    #[serde(default)]
    pub trains: Vec<TrainRecord>,
}

impl NetworkFile {
    /// Read and parse a network file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| StoreError::Io {
            message: format!("failed to read {}: {}", path.display(), e),
        })?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Write the network file as pretty JSON.
    ///
    /// Creates parent directories if they don't exist.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::Io {
                message: format!("failed to create directory: {}", e),
            })?;
        }

        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(|e| StoreError::Io {
            message: format!("failed to write {}: {}", path.display(), e),
        })
    }

    /// Validate the line definitions into a lookup table.
    pub fn line_table(&self) -> Result<LineTable, LineError> {
        LineTable::from_definitions(
            self.lines
                .iter()
                .map(|l| (l.id.clone(), l.stations.clone())),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::StationId;
    use tempfile::tempdir;

    fn sample() -> NetworkFile {
        NetworkFile {
            stations: vec![
                Station::new(StationId(1), "A", 3.0, 101.0),
                Station::new(StationId(2), "B", 3.1, 101.1),
            ],
            fares: vec![FareEdge::new(StationId(1), StationId(2), 1.2)],
            travel_times: vec![TravelTime::new("A", "B", 2)],
            lines: vec![LineDefinition {
                id: LineId::from("L"),
                stations: vec!["A".into(), "B".into()],
            }],
            trains: vec![],
        }
    }

    #[test]
    fn save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("network.json");

        sample().save(&path).unwrap();
        let loaded = NetworkFile::load(&path).unwrap();
        assert_eq!(loaded, sample());
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = NetworkFile::load("/nonexistent/network.json").unwrap_err();
        assert!(matches!(err, StoreError::Io { .. }));
    }

    #[test]
    fn malformed_file_is_json_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("network.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = NetworkFile::load(&path).unwrap_err();
        assert!(matches!(err, StoreError::Json(_)));
    }

    #[test]
    fn line_table_validates_sequences() {
        let mut network = sample();
        assert_eq!(network.line_table().unwrap().len(), 1);

        network.lines[0].stations.push("A".into());
        assert!(network.line_table().is_err());
    }

    #[test]
    fn bundled_network_parses() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/data/network.json");
        let network = NetworkFile::load(path).unwrap();
        let lines = network.line_table().unwrap();

        assert_eq!(lines.len(), 3);
        assert_eq!(network.stations.len(), 68);
        // Every sequence stop must be a real station
        for line in lines.lines() {
            for name in line.stations() {
                assert!(
                    network.stations.iter().any(|s| &s.name == name),
                    "{name} has no station row"
                );
            }
        }
    }
}
