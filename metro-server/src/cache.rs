//! Caching layer for route answers.
//!
//! Keys include the topology version the answer was computed against, so a
//! fare or station change makes every older entry unreachable without an
//! explicit flush. Stale entries age out through the TTL.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache as MokaCache;

use crate::domain::StationId;
use crate::network::{Route, RouteMode};

/// Cache key: (topology version, mode, origin, destination).
type RouteKey = (u64, RouteMode, StationId, StationId);

/// Configuration for the route cache.
#[derive(Debug, Clone)]
pub struct RouteCacheConfig {
    /// TTL for cached entries.
    pub ttl: Duration,

    /// Maximum number of cached entries.
    pub max_capacity: u64,
}

impl Default for RouteCacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(300),
            max_capacity: 10_000,
        }
    }
}

/// Cache of successful route searches.
///
/// Errors are not cached; an unreachable pair is recomputed each time.
#[derive(Clone)]
pub struct RouteCache {
    routes: MokaCache<RouteKey, Arc<Route>>,
}

impl RouteCache {
    /// Create a new cache with the given configuration.
    pub fn new(config: &RouteCacheConfig) -> Self {
        let routes = MokaCache::builder()
            .time_to_live(config.ttl)
            .max_capacity(config.max_capacity)
            .build();

        Self { routes }
    }

    pub async fn get(
        &self,
        version: u64,
        mode: RouteMode,
        origin: StationId,
        destination: StationId,
    ) -> Option<Arc<Route>> {
        self.routes.get(&(version, mode, origin, destination)).await
    }

    pub async fn insert(
        &self,
        version: u64,
        mode: RouteMode,
        origin: StationId,
        destination: StationId,
        route: Arc<Route>,
    ) {
        self.routes
            .insert((version, mode, origin, destination), route)
            .await;
    }
}
