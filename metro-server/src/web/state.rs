//! Application state for the web layer.

use std::sync::Arc;

use tokio::sync::watch;

use crate::broadcast::Broadcaster;
use crate::cache::{RouteCache, RouteCacheConfig};
use crate::movement::{MovementEngine, Topology};
use crate::network::GraphSnapshot;
use crate::store::{AnyStore, StoreError, TopologyStore};

use super::dto::TrainResult;

/// Shared application state.
///
/// Contains all the services needed to handle requests.
#[derive(Clone)]
pub struct AppState {
    /// Topology store
    pub store: AnyStore,

    /// Current fare graph
    pub graph: Arc<GraphSnapshot>,

    /// Cached route answers
    pub routes: RouteCache,

    /// Train movement, for station names and live state
    pub engine: Arc<MovementEngine<AnyStore>>,

    /// Source of train events for websocket clients
    pub broadcaster: Broadcaster,

    /// Flips to `true` when the server is shutting down
    pub shutdown: watch::Receiver<bool>,
}

impl AppState {
    /// Create a new app state.
    pub fn new(
        engine: Arc<MovementEngine<AnyStore>>,
        cache_config: &RouteCacheConfig,
        broadcaster: Broadcaster,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            store: engine.store().clone(),
            graph: Arc::new(GraphSnapshot::new()),
            routes: RouteCache::new(cache_config),
            engine,
            broadcaster,
            shutdown,
        }
    }

    pub fn topology(&self) -> &Topology {
        self.engine.topology()
    }

    /// Every persisted train, with its current station's name.
    pub async fn fleet(&self) -> Result<Vec<TrainResult>, StoreError> {
        let trains = self.store.list_trains().await?;
        let topology = self.topology();
        Ok(trains
            .iter()
            .map(|t| {
                let name = topology
                    .station(t.current_station_id)
                    .map(|s| s.name.clone());
                TrainResult::from_record(t, name)
            })
            .collect())
    }
}
