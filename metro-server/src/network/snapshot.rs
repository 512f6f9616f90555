//! Shared fare graph snapshot, rebuilt when the store changes.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::info;

use super::graph::FareGraph;
use crate::store::{StoreError, TopologyStore};

/// Holds the current fare graph behind an `Arc`.
///
/// Readers clone the `Arc` and search without holding any lock. When the
/// store's topology version moves on, the next reader builds a fresh graph
/// and swaps the pointer; searches already running keep the old one.
#[derive(Default)]
pub struct GraphSnapshot {
    current: RwLock<Option<Arc<FareGraph>>>,
}

impl GraphSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// The graph for the store's current version, building it if needed.
    pub async fn get<S: TopologyStore>(&self, store: &S) -> Result<Arc<FareGraph>, StoreError> {
        let version = store.topology_version();
        if let Some(graph) = self.current.read().await.as_ref()
            && graph.version() == version
        {
            return Ok(Arc::clone(graph));
        }

        // Version is read before the tables so a concurrent change forces
        // another rebuild rather than being masked.
        let stations = store.list_stations().await?;
        let fares = store.list_fare_edges().await?;
        let graph = Arc::new(FareGraph::build(
            stations.iter().map(|s| s.id),
            &fares,
            version,
        ));

        info!(
            version,
            stations = graph.node_count(),
            edges = graph.edge_count(),
            "Fare graph rebuilt"
        );

        let mut current = self.current.write().await;
        // Keep whichever graph is newer if two rebuilds raced
        if current.as_ref().is_none_or(|g| g.version() <= version) {
            *current = Some(Arc::clone(&graph));
        }
        Ok(graph)
    }
}
