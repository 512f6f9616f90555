//! Route search over a fare graph.
//!
//! Two strategies share the same contract:
//!
//! - [`shortest_hops`]: breadth-first search for the fewest stations,
//!   priced afterwards by re-walking the path.
//! - [`cheapest_cost`]: Dijkstra on fare price.
//!
//! Both are pure reads of an immutable graph. Ties are broken towards the
//! lowest station id, which follows from the graph's sorted neighbor lists.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet, VecDeque};

use serde::{Deserialize, Serialize};
use tracing::trace;

use super::error::RouteError;
use super::graph::FareGraph;
use crate::domain::StationId;

/// Price charged for a path segment with no fare row in either direction.
pub const FALLBACK_SEGMENT_FARE: f64 = 2.0;

/// A route between two stations.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    /// Station ids from origin to destination, inclusive.
    pub path: Vec<StationId>,

    /// Sum of segment prices along `path`.
    pub total_fare: f64,

    /// Set when at least one segment was priced with
    /// [`FALLBACK_SEGMENT_FARE`].
    pub estimated: bool,
}

impl Route {
    fn single(station: StationId) -> Self {
        Self {
            path: vec![station],
            total_fare: 0.0,
            estimated: false,
        }
    }

    pub fn hops(&self) -> usize {
        self.path.len().saturating_sub(1)
    }

    pub fn origin(&self) -> Option<StationId> {
        self.path.first().copied()
    }

    pub fn destination(&self) -> Option<StationId> {
        self.path.last().copied()
    }
}

/// Which search answers a route query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteMode {
    /// Fewest stations
    #[default]
    Hops,
    /// Lowest total fare
    Cost,
}

impl RouteMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteMode::Hops => "hops",
            RouteMode::Cost => "cost",
        }
    }
}

/// Price a path segment by segment.
///
/// Uses the graph's edge (explicit or synthesized) and falls back to
/// [`FALLBACK_SEGMENT_FARE`] when there is none. Returns the total and
/// whether the fallback was used.
pub fn path_fare(graph: &FareGraph, path: &[StationId]) -> (f64, bool) {
    let mut total = 0.0;
    let mut estimated = false;
    for pair in path.windows(2) {
        match graph.price(pair[0], pair[1]) {
            Some(price) => total += price,
            None => {
                total += FALLBACK_SEGMENT_FARE;
                estimated = true;
            }
        }
    }
    (total, estimated)
}

fn check_endpoints(
    graph: &FareGraph,
    origin: StationId,
    destination: StationId,
) -> Result<(), RouteError> {
    if !graph.contains(origin) {
        return Err(RouteError::UnknownStation(origin));
    }
    if !graph.contains(destination) {
        return Err(RouteError::UnknownStation(destination));
    }
    Ok(())
}

fn walk_back(
    parent: &HashMap<StationId, StationId>,
    origin: StationId,
    destination: StationId,
) -> Vec<StationId> {
    let mut path = vec![destination];
    let mut current = destination;
    while current != origin {
        match parent.get(&current) {
            Some(&prev) => {
                path.push(prev);
                current = prev;
            }
            None => break,
        }
    }
    path.reverse();
    path
}

fn priced(graph: &FareGraph, path: Vec<StationId>) -> Route {
    let (total_fare, estimated) = path_fare(graph, &path);
    Route {
        path,
        total_fare,
        estimated,
    }
}

/// Route with the fewest stations.
///
/// `origin == destination` is answered without consulting the graph.
pub fn shortest_hops(
    graph: &FareGraph,
    origin: StationId,
    destination: StationId,
) -> Result<Route, RouteError> {
    if origin == destination {
        return Ok(Route::single(origin));
    }
    check_endpoints(graph, origin, destination)?;

    let mut visited: HashSet<StationId> = HashSet::from([origin]);
    let mut parent: HashMap<StationId, StationId> = HashMap::new();
    let mut queue = VecDeque::from([origin]);

    while let Some(station) = queue.pop_front() {
        for edge in graph.neighbors(station) {
            if !visited.insert(edge.to) {
                continue;
            }
            parent.insert(edge.to, station);
            if edge.to == destination {
                let path = walk_back(&parent, origin, destination);
                trace!(%origin, %destination, hops = path.len() - 1, "BFS found route");
                return Ok(priced(graph, path));
            }
            queue.push_back(edge.to);
        }
    }

    Err(RouteError::NoRouteFound {
        origin,
        destination,
    })
}

/// Heap entry for Dijkstra: lowest cost first, then lowest station id.
#[derive(Clone, Copy)]
struct State {
    cost: f64,
    station: StationId,
}

impl Ord for State {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed for a min-heap
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.station.cmp(&self.station))
    }
}

impl PartialOrd for State {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for State {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for State {}

/// Route with the lowest total fare.
///
/// The total is the exact sum of edge prices along the returned path.
pub fn cheapest_cost(
    graph: &FareGraph,
    origin: StationId,
    destination: StationId,
) -> Result<Route, RouteError> {
    if origin == destination {
        return Ok(Route::single(origin));
    }
    check_endpoints(graph, origin, destination)?;

    let mut dist: HashMap<StationId, f64> = HashMap::from([(origin, 0.0)]);
    let mut parent: HashMap<StationId, StationId> = HashMap::new();
    let mut heap = BinaryHeap::from([State {
        cost: 0.0,
        station: origin,
    }]);

    while let Some(State { cost, station }) = heap.pop() {
        if station == destination {
            break;
        }
        if dist.get(&station).is_some_and(|&best| cost > best) {
            continue;
        }

        for edge in graph.neighbors(station) {
            let next = cost + edge.price;
            if dist.get(&edge.to).is_none_or(|&best| next < best) {
                dist.insert(edge.to, next);
                parent.insert(edge.to, station);
                heap.push(State {
                    cost: next,
                    station: edge.to,
                });
            }
        }
    }

    if !dist.contains_key(&destination) {
        return Err(RouteError::NoRouteFound {
            origin,
            destination,
        });
    }

    let path = walk_back(&parent, origin, destination);
    trace!(%origin, %destination, hops = path.len() - 1, "Dijkstra found route");
    Ok(priced(graph, path))
}

/// Dispatch to the search for `mode`.
pub fn find_route(
    graph: &FareGraph,
    mode: RouteMode,
    origin: StationId,
    destination: StationId,
) -> Result<Route, RouteError> {
    match mode {
        RouteMode::Hops => shortest_hops(graph, origin, destination),
        RouteMode::Cost => cheapest_cost(graph, origin, destination),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ErrorKind, FareEdge};

    fn id(n: i64) -> StationId {
        StationId(n)
    }

    fn ids(path: &[StationId]) -> Vec<i64> {
        path.iter().map(|s| s.0).collect()
    }

    fn graph(stations: &[i64], fares: &[(i64, i64, f64)]) -> FareGraph {
        let fares: Vec<FareEdge> = fares
            .iter()
            .map(|&(o, d, p)| FareEdge::new(id(o), id(d), p))
            .collect();
        FareGraph::build(stations.iter().map(|&n| id(n)), &fares, 1)
    }

    /// 1 - 2 - 3 - 4 in a line, plus an expensive shortcut 1 - 4.
    fn ladder() -> FareGraph {
        graph(
            &[1, 2, 3, 4],
            &[(1, 2, 1.0), (2, 3, 1.0), (3, 4, 1.0), (1, 4, 10.0)],
        )
    }

    #[test]
    fn same_station_is_a_no_op() {
        let g = ladder();
        for route in [
            shortest_hops(&g, id(3), id(3)).unwrap(),
            cheapest_cost(&g, id(3), id(3)).unwrap(),
        ] {
            assert_eq!(ids(&route.path), vec![3]);
            assert_eq!(route.total_fare, 0.0);
            assert_eq!(route.hops(), 0);
            assert!(!route.estimated);
        }
    }

    #[test]
    fn same_station_answered_even_if_unknown() {
        let g = ladder();
        let route = shortest_hops(&g, id(42), id(42)).unwrap();
        assert_eq!(ids(&route.path), vec![42]);
    }

    #[test]
    fn hops_prefers_fewer_stations() {
        let route = shortest_hops(&ladder(), id(1), id(4)).unwrap();
        assert_eq!(ids(&route.path), vec![1, 4]);
        assert_eq!(route.total_fare, 10.0);
        assert_eq!(route.hops(), 1);
    }

    #[test]
    fn cost_prefers_cheaper_fare() {
        let route = cheapest_cost(&ladder(), id(1), id(4)).unwrap();
        assert_eq!(ids(&route.path), vec![1, 2, 3, 4]);
        assert_eq!(route.total_fare, 3.0);
    }

    #[test]
    fn reverse_direction_uses_synthesized_edges() {
        let route = cheapest_cost(&ladder(), id(4), id(1)).unwrap();
        assert_eq!(ids(&route.path), vec![4, 3, 2, 1]);
        assert_eq!(route.total_fare, 3.0);
    }

    #[test]
    fn unknown_station() {
        let g = ladder();
        let err = shortest_hops(&g, id(1), id(99)).unwrap_err();
        assert!(matches!(err, RouteError::UnknownStation(StationId(99))));
        assert_eq!(err.kind(), ErrorKind::UnknownStation);

        let err = cheapest_cost(&g, id(99), id(1)).unwrap_err();
        assert!(matches!(err, RouteError::UnknownStation(StationId(99))));
    }

    #[test]
    fn isolated_station_has_no_route() {
        let g = graph(&[1, 2, 5], &[(1, 2, 1.0)]);
        for mode in [RouteMode::Hops, RouteMode::Cost] {
            let err = find_route(&g, mode, id(1), id(5)).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::NoRouteFound);
            let err = find_route(&g, mode, id(5), id(1)).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::NoRouteFound);
        }
    }

    #[test]
    fn disconnected_components() {
        let g = graph(&[], &[(1, 2, 1.0), (3, 4, 1.0)]);
        let err = shortest_hops(&g, id(1), id(4)).unwrap_err();
        assert!(matches!(
            err,
            RouteError::NoRouteFound {
                origin: StationId(1),
                destination: StationId(4)
            }
        ));
    }

    #[test]
    fn hop_ties_go_to_lowest_id() {
        // Diamond: 1 -> {3, 2} -> 4
        let g = graph(&[], &[(1, 3, 1.0), (1, 2, 1.0), (3, 4, 1.0), (2, 4, 1.0)]);
        let route = shortest_hops(&g, id(1), id(4)).unwrap();
        assert_eq!(ids(&route.path), vec![1, 2, 4]);
    }

    #[test]
    fn cost_ties_keep_first_settled_path() {
        // Both 1-2-4 and 1-3-4 cost 2.0; 3 is settled first (cheaper prefix)
        // and an equal-cost relaxation never replaces a parent.
        let g = graph(&[], &[(1, 3, 0.5), (1, 2, 1.0), (3, 4, 1.5), (2, 4, 1.0)]);
        let route = cheapest_cost(&g, id(1), id(4)).unwrap();
        assert_eq!(route.total_fare, 2.0);
        assert_eq!(ids(&route.path), vec![1, 3, 4]);
    }

    #[test]
    fn cost_ties_on_equal_prefix_go_to_lowest_id() {
        let g = graph(&[], &[(1, 3, 1.0), (1, 2, 1.0), (3, 4, 1.0), (2, 4, 1.0)]);
        let route = cheapest_cost(&g, id(1), id(4)).unwrap();
        assert_eq!(ids(&route.path), vec![1, 2, 4]);
    }

    #[test]
    fn explicit_reverse_fare_is_used() {
        let g = graph(&[], &[(1, 2, 1.0), (2, 1, 4.0)]);
        assert_eq!(shortest_hops(&g, id(1), id(2)).unwrap().total_fare, 1.0);
        assert_eq!(shortest_hops(&g, id(2), id(1)).unwrap().total_fare, 4.0);
    }

    #[test]
    fn path_fare_falls_back_and_flags() {
        let g = ladder();
        let (total, estimated) = path_fare(&g, &[id(1), id(2), id(3)]);
        assert_eq!(total, 2.0);
        assert!(!estimated);

        // 2 -> 4 has no row in either direction
        let (total, estimated) = path_fare(&g, &[id(1), id(2), id(4)]);
        assert_eq!(total, 1.0 + FALLBACK_SEGMENT_FARE);
        assert!(estimated);
    }

    #[test]
    fn mode_parses_lowercase() {
        let mode: RouteMode = serde_json::from_str("\"cost\"").unwrap();
        assert_eq!(mode, RouteMode::Cost);
        assert_eq!(RouteMode::default(), RouteMode::Hops);
        assert_eq!(RouteMode::Hops.as_str(), "hops");
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use crate::domain::FareEdge;
    use proptest::prelude::*;

    const NODES: i64 = 8;

    /// Random fare tables over at most `NODES` stations, prices in cents.
    fn fares_strategy() -> impl Strategy<Value = Vec<FareEdge>> {
        prop::collection::vec((0..NODES, 0..NODES, 0u32..1000), 0..20).prop_map(|rows| {
            rows.into_iter()
                .map(|(o, d, cents)| {
                    FareEdge::new(StationId(o), StationId(d), cents as f64 / 100.0)
                })
                .collect()
        })
    }

    fn build(fares: &[FareEdge]) -> FareGraph {
        FareGraph::build((0..NODES).map(StationId), fares, 1)
    }

    /// Every simple path from `from` to `to`, by exhaustive DFS.
    fn simple_paths(g: &FareGraph, from: StationId, to: StationId) -> Vec<Vec<StationId>> {
        fn dfs(
            g: &FareGraph,
            at: StationId,
            to: StationId,
            path: &mut Vec<StationId>,
            out: &mut Vec<Vec<StationId>>,
        ) {
            if at == to {
                out.push(path.clone());
                return;
            }
            for edge in g.neighbors(at) {
                if path.contains(&edge.to) {
                    continue;
                }
                path.push(edge.to);
                dfs(g, edge.to, to, path, out);
                path.pop();
            }
        }

        let mut out = Vec::new();
        dfs(g, from, to, &mut vec![from], &mut out);
        out
    }

    fn is_walk(g: &FareGraph, path: &[StationId]) -> bool {
        path.windows(2).all(|w| g.edge(w[0], w[1]).is_some())
    }

    proptest! {
        #[test]
        fn bfs_is_minimal(fares in fares_strategy(), o in 0..NODES, d in 0..NODES) {
            prop_assume!(o != d);
            let g = build(&fares);
            let (o, d) = (StationId(o), StationId(d));
            let brute = simple_paths(&g, o, d).iter().map(Vec::len).min();

            match shortest_hops(&g, o, d) {
                Ok(route) => {
                    prop_assert!(is_walk(&g, &route.path));
                    prop_assert_eq!(route.origin(), Some(o));
                    prop_assert_eq!(route.destination(), Some(d));
                    prop_assert_eq!(Some(route.path.len()), brute);
                    prop_assert!(!route.estimated);
                }
                Err(RouteError::NoRouteFound { .. }) => prop_assert!(brute.is_none()),
                Err(e) => prop_assert!(false, "unexpected error {e}"),
            }
        }

        #[test]
        fn dijkstra_is_optimal(fares in fares_strategy(), o in 0..NODES, d in 0..NODES) {
            prop_assume!(o != d);
            let g = build(&fares);
            let (o, d) = (StationId(o), StationId(d));
            let best = simple_paths(&g, o, d)
                .iter()
                .map(|p| path_fare(&g, p).0)
                .min_by(f64::total_cmp);

            match cheapest_cost(&g, o, d) {
                Ok(route) => {
                    prop_assert!(is_walk(&g, &route.path));
                    let best = best.unwrap();
                    prop_assert!(route.total_fare <= best + 1e-9,
                        "dijkstra {} > exhaustive {}", route.total_fare, best);
                    prop_assert!((route.total_fare - path_fare(&g, &route.path).0).abs() < 1e-9);
                }
                Err(RouteError::NoRouteFound { .. }) => prop_assert!(best.is_none()),
                Err(e) => prop_assert!(false, "unexpected error {e}"),
            }
        }

        #[test]
        fn searches_agree_on_reachability(fares in fares_strategy(), o in 0..NODES, d in 0..NODES) {
            let g = build(&fares);
            let (o, d) = (StationId(o), StationId(d));
            prop_assert_eq!(
                shortest_hops(&g, o, d).is_ok(),
                cheapest_cost(&g, o, d).is_ok()
            );
        }
    }
}
