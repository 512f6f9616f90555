//! Fare graph construction.
//!
//! Fare rows are directed. Metro fares are assumed symmetric, so every row
//! `o -> d` also implies `d -> o` at the same price unless the store has an
//! explicit `d -> o` row, which always wins.

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, warn};

use crate::domain::{FareEdge, StationId};

/// Whether an edge came from a fare row or was implied by its reverse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeSource {
    Explicit,
    Synthesized,
}

/// One outgoing edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge {
    pub to: StationId,
    pub price: f64,
    pub source: EdgeSource,
}

/// Immutable adjacency view of the fare table.
///
/// Every station passed to [`FareGraph::build`] is a node, even with no
/// edges. Neighbor lists are sorted by station id so searches are
/// deterministic.
#[derive(Debug, Clone, Default)]
pub struct FareGraph {
    adjacency: HashMap<StationId, Vec<Edge>>,
    version: u64,
    edge_count: usize,
}

fn usable_price(edge: &FareEdge) -> bool {
    edge.price.is_finite() && edge.price >= 0.0
}

impl FareGraph {
    /// Build a graph from the known stations and all fare rows.
    ///
    /// Self-loops and rows with a negative or non-finite price are skipped.
    /// `version` records the store version the inputs were read at.
    pub fn build<I>(stations: I, fares: &[FareEdge], version: u64) -> Self
    where
        I: IntoIterator<Item = StationId>,
    {
        let mut explicit: BTreeMap<(StationId, StationId), f64> = BTreeMap::new();
        for edge in fares {
            if edge.origin == edge.destination {
                debug!(station = %edge.origin, "Skipping self-loop fare row");
                continue;
            }
            if !usable_price(edge) {
                warn!(
                    origin = %edge.origin,
                    destination = %edge.destination,
                    price = edge.price,
                    "Skipping fare row with unusable price"
                );
                continue;
            }
            if explicit
                .insert((edge.origin, edge.destination), edge.price)
                .is_some()
            {
                warn!(
                    origin = %edge.origin,
                    destination = %edge.destination,
                    "Duplicate fare row, keeping the last one"
                );
            }
        }

        let mut adjacency: HashMap<StationId, Vec<Edge>> = HashMap::new();
        for id in stations {
            adjacency.entry(id).or_default();
        }

        for (&(origin, destination), &price) in &explicit {
            adjacency.entry(origin).or_default().push(Edge {
                to: destination,
                price,
                source: EdgeSource::Explicit,
            });
            adjacency.entry(destination).or_default();

            if !explicit.contains_key(&(destination, origin)) {
                adjacency.entry(destination).or_default().push(Edge {
                    to: origin,
                    price,
                    source: EdgeSource::Synthesized,
                });
            }
        }

        let mut edge_count = 0;
        for edges in adjacency.values_mut() {
            edges.sort_by_key(|e| e.to);
            edge_count += edges.len();
        }

        debug!(
            nodes = adjacency.len(),
            edges = edge_count,
            version,
            "Built fare graph"
        );

        Self {
            adjacency,
            version,
            edge_count,
        }
    }

    pub fn contains(&self, station: StationId) -> bool {
        self.adjacency.contains_key(&station)
    }

    /// Outgoing edges in ascending neighbor order. Empty for unknown stations.
    pub fn neighbors(&self, station: StationId) -> &[Edge] {
        self.adjacency
            .get(&station)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// The edge `origin -> destination`, if the graph has one.
    pub fn edge(&self, origin: StationId, destination: StationId) -> Option<&Edge> {
        let edges = self.adjacency.get(&origin)?;
        edges
            .binary_search_by_key(&destination, |e| e.to)
            .ok()
            .map(|idx| &edges[idx])
    }

    pub fn price(&self, origin: StationId, destination: StationId) -> Option<f64> {
        self.edge(origin, destination).map(|e| e.price)
    }

    pub fn stations(&self) -> impl Iterator<Item = StationId> + '_ {
        self.adjacency.keys().copied()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn node_count(&self) -> usize {
        self.adjacency.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NO_STATIONS: [StationId; 0] = [];

    fn id(n: i64) -> StationId {
        StationId(n)
    }

    fn fare(o: i64, d: i64, price: f64) -> FareEdge {
        FareEdge::new(id(o), id(d), price)
    }

    #[test]
    fn reverse_edge_synthesized() {
        let g = FareGraph::build([id(1), id(2)], &[fare(1, 2, 1.5)], 1);

        let fwd = g.edge(id(1), id(2)).unwrap();
        assert_eq!(fwd.price, 1.5);
        assert_eq!(fwd.source, EdgeSource::Explicit);

        let back = g.edge(id(2), id(1)).unwrap();
        assert_eq!(back.price, 1.5);
        assert_eq!(back.source, EdgeSource::Synthesized);
        assert_eq!(g.edge_count(), 2);
    }

    #[test]
    fn explicit_reverse_wins_and_is_not_duplicated() {
        let g = FareGraph::build(NO_STATIONS, &[fare(1, 2, 1.5), fare(2, 1, 2.5)], 1);

        assert_eq!(g.price(id(1), id(2)), Some(1.5));
        assert_eq!(g.price(id(2), id(1)), Some(2.5));
        assert_eq!(g.neighbors(id(2)).len(), 1);
        assert_eq!(g.edge(id(2), id(1)).unwrap().source, EdgeSource::Explicit);
    }

    #[test]
    fn isolated_station_is_a_node() {
        let g = FareGraph::build([id(1), id(2), id(9)], &[fare(1, 2, 1.0)], 1);
        assert!(g.contains(id(9)));
        assert!(g.neighbors(id(9)).is_empty());
        assert!(!g.contains(id(10)));
        assert_eq!(g.node_count(), 3);
    }

    #[test]
    fn stations_only_in_fares_become_nodes() {
        let g = FareGraph::build(NO_STATIONS, &[fare(4, 7, 1.0)], 1);
        assert!(g.contains(id(4)));
        assert!(g.contains(id(7)));
    }

    #[test]
    fn unusable_rows_skipped() {
        let g = FareGraph::build(
            [id(1), id(2), id(3)],
            &[
                fare(1, 1, 1.0),
                fare(1, 2, -1.0),
                fare(2, 3, f64::NAN),
                fare(1, 3, 0.0),
            ],
            1,
        );
        assert!(g.edge(id(1), id(1)).is_none());
        assert!(g.edge(id(1), id(2)).is_none());
        assert!(g.edge(id(2), id(3)).is_none());
        assert_eq!(g.price(id(3), id(1)), Some(0.0));
    }

    #[test]
    fn neighbors_sorted_by_id() {
        let g = FareGraph::build(
            NO_STATIONS,
            &[fare(5, 9, 1.0), fare(5, 2, 1.0), fare(7, 5, 1.0)],
            3,
        );
        let ids: Vec<i64> = g.neighbors(id(5)).iter().map(|e| e.to.0).collect();
        assert_eq!(ids, vec![2, 7, 9]);
        assert_eq!(g.version(), 3);
    }
}
