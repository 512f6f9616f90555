use std::sync::Arc;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use metro_server::broadcast::{Broadcaster, DEFAULT_CAPACITY, MulticastSink};
use metro_server::config::AppConfig;
use metro_server::movement::{MovementEngine, Topology};
use metro_server::scheduler::{self, TickRange};
use metro_server::store::{AnyStore, MemoryStore, NetworkFile, SqliteStore};
use metro_server::web::{AppState, create_router};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("metro_server=info,tower_http=info")),
        )
        .init();

    let config = AppConfig::from_env().expect("Invalid configuration");

    // Seed data (fail fast if unavailable)
    let network = NetworkFile::load(&config.data_path).expect("Failed to load network file");
    let lines = network.line_table().expect("Invalid line definitions");
    info!(
        path = %config.data_path.display(),
        stations = network.stations.len(),
        lines = lines.len(),
        "Loaded network"
    );

    let store = match &config.db_path {
        Some(path) => {
            let sqlite = SqliteStore::open(path).expect("Failed to open database");
            let seeded = sqlite
                .seed_from(&network)
                .await
                .expect("Failed to seed database");
            info!(path = %path.display(), seeded, "Using SQLite store");
            AnyStore::Sqlite(sqlite)
        }
        None => {
            info!("Using in-memory store");
            AnyStore::Memory(MemoryStore::from_network(&network))
        }
    };

    let topology = Topology::load(&store, lines)
        .await
        .expect("Failed to load topology");
    for (line, stop) in topology.unresolved_stops() {
        warn!(%line, %stop, "Line stop has no matching station");
    }

    let engine = Arc::new(MovementEngine::new(
        store,
        Arc::new(topology),
        config.simulation.clone(),
    ));
    let trains = engine
        .initialize_all()
        .await
        .expect("Failed to read trains");
    info!(trains = trains.len(), "Trains initialized");

    let broadcaster = Broadcaster::new(DEFAULT_CAPACITY);
    let handle = scheduler::start(
        Arc::clone(&engine),
        broadcaster.clone(),
        trains,
        TickRange::from_config(&config.simulation),
    );

    let multicast = match config.multicast {
        Some(target) => match MulticastSink::bind(target).await {
            Ok(sink) => Some(tokio::spawn(
                sink.run(broadcaster.subscribe(), handle.shutdown_signal()),
            )),
            Err(e) => {
                error!(%target, error = %e, "Failed to bind multicast socket");
                None
            }
        },
        None => None,
    };

    let state = AppState::new(
        engine,
        &config.route_cache,
        broadcaster,
        handle.shutdown_signal(),
    );
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .expect("Failed to bind");
    info!(addr = %config.bind_addr, "Metro tracker listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "Failed to listen for Ctrl-C");
            }
            info!("Shutting down");
            handle.shutdown().await;
        })
        .await
        .expect("Server error");

    if let Some(task) = multicast {
        let _ = task.await;
    }
}
