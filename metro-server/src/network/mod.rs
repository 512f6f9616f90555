//! Fare-graph routing.
//!
//! The fare table is turned into an adjacency graph ([`FareGraph`]) which is
//! searched either for the fewest stations or for the lowest fare.

mod error;
mod graph;
mod search;
mod snapshot;

pub use error::RouteError;
pub use graph::{Edge, EdgeSource, FareGraph};
pub use search::{
    FALLBACK_SEGMENT_FARE, Route, RouteMode, cheapest_cost, find_route, path_fare, shortest_hops,
};
pub use snapshot::GraphSnapshot;
