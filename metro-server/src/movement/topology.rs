//! Read-only view of stations, lines and travel times used by movement.

use std::collections::HashMap;

use tracing::warn;

use super::travel::TravelTimes;
use crate::domain::{LineId, Station, StationId};
use crate::lines::LineTable;
use crate::store::{StoreError, TopologyStore};

/// Stations by id and by name, the line table and the time matrix.
///
/// Loaded once at startup. Line sequences refer to stations by name, so
/// every stop must resolve to exactly one station row; stops that don't are
/// reported by [`Topology::unresolved_stops`] and fail at movement time.
#[derive(Debug, Clone, Default)]
pub struct Topology {
    stations: HashMap<StationId, Station>,
    by_name: HashMap<String, StationId>,
    lines: LineTable,
    travel_times: TravelTimes,
}

impl Topology {
    pub fn new(stations: Vec<Station>, lines: LineTable, travel_times: TravelTimes) -> Self {
        let mut by_name: HashMap<String, StationId> = HashMap::with_capacity(stations.len());
        for s in &stations {
            if let Some(existing) = by_name.get(&s.name) {
                warn!(
                    name = %s.name,
                    kept = %existing,
                    ignored = %s.id,
                    "Duplicate station name"
                );
                continue;
            }
            by_name.insert(s.name.clone(), s.id);
        }

        Self {
            stations: stations.into_iter().map(|s| (s.id, s)).collect(),
            by_name,
            lines,
            travel_times,
        }
    }

    /// Read stations and the time matrix from a store.
    pub async fn load<S: TopologyStore>(store: &S, lines: LineTable) -> Result<Self, StoreError> {
        let stations = store.list_stations().await?;
        let travel_times = TravelTimes::from_rows(store.list_travel_times().await?);
        Ok(Self::new(stations, lines, travel_times))
    }

    pub fn station(&self, id: StationId) -> Option<&Station> {
        self.stations.get(&id)
    }

    pub fn station_named(&self, name: &str) -> Option<&Station> {
        self.by_name.get(name).and_then(|id| self.stations.get(id))
    }

    pub fn lines(&self) -> &LineTable {
        &self.lines
    }

    pub fn travel_times(&self) -> &TravelTimes {
        &self.travel_times
    }

    pub fn station_count(&self) -> usize {
        self.stations.len()
    }

    /// Sequence stops with no matching station row.
    pub fn unresolved_stops(&self) -> Vec<(LineId, String)> {
        self.lines
            .lines()
            .flat_map(|line| {
                line.stations()
                    .iter()
                    .filter(|name| !self.by_name.contains_key(name.as_str()))
                    .map(|name| (line.line_id().clone(), name.clone()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TravelTime;
    use crate::store::MemoryStore;

    fn lines() -> LineTable {
        LineTable::from_definitions([(
            LineId::from("L"),
            vec!["A".to_string(), "B".to_string(), "Z".to_string()],
        )])
        .unwrap()
    }

    #[test]
    fn lookups_by_id_and_name() {
        let topo = Topology::new(
            vec![
                Station::new(StationId(1), "A", 3.0, 101.0),
                Station::new(StationId(2), "B", 3.1, 101.1),
            ],
            lines(),
            TravelTimes::default(),
        );

        assert_eq!(topo.station(StationId(2)).unwrap().name, "B");
        assert_eq!(topo.station_named("A").unwrap().id, StationId(1));
        assert!(topo.station_named("Q").is_none());
        assert_eq!(
            topo.unresolved_stops(),
            vec![(LineId::from("L"), "Z".to_string())]
        );
    }

    #[test]
    fn duplicate_name_keeps_first_row() {
        let topo = Topology::new(
            vec![
                Station::new(StationId(1), "A", 3.0, 101.0),
                Station::new(StationId(5), "A", 4.0, 102.0),
            ],
            lines(),
            TravelTimes::default(),
        );
        assert_eq!(topo.station_named("A").unwrap().id, StationId(1));
        assert_eq!(topo.station_count(), 2);
    }

    #[tokio::test]
    async fn load_from_store() {
        let store = MemoryStore::new();
        store
            .insert_station(Station::new(StationId(1), "A", 3.0, 101.0))
            .await;
        store.insert_travel_time(TravelTime::new("A", "B", 2)).await;

        let topo = Topology::load(&store, lines()).await.unwrap();
        assert_eq!(topo.station_count(), 1);
        assert_eq!(topo.travel_times().minutes("A", "B"), Some(2));
    }
}
