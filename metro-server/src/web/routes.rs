//! HTTP route handlers.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use tower_http::trace::TraceLayer;
use tracing::{debug, error};

use crate::domain::{ErrorKind, StationId, TrainId};
use crate::movement::{MovementError, TrainState};
use crate::network::{RouteError, RouteMode, find_route};
use crate::store::{StoreError, TopologyStore};

use super::dto::*;
use super::state::AppState;
use super::ws::train_feed;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/stations", get(list_stations))
        .route("/api/trains", get(list_trains))
        .route("/api/trains/:id", get(train_state))
        .route("/api/fare", get(fare))
        .route("/api/route", get(route))
        .route("/ws", get(train_feed))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health() -> &'static str {
    "ok"
}

/// Operational stations, grouped by line.
async fn list_stations(State(state): State<AppState>) -> Result<Json<Vec<StationResult>>, AppError> {
    let mut stations = state.store.list_stations().await?;
    stations.retain(|s| s.operational);
    stations.sort_by(|a, b| a.line.cmp(&b.line).then(a.id.cmp(&b.id)));

    Ok(Json(stations.iter().map(StationResult::from).collect()))
}

/// Persisted train rows.
async fn list_trains(State(state): State<AppState>) -> Result<Json<Vec<TrainResult>>, AppError> {
    Ok(Json(state.fleet().await?))
}

/// Live movement state for one train.
async fn train_state(
    State(state): State<AppState>,
    Path(train_id): Path<i64>,
) -> Result<Json<TrainState>, AppError> {
    let train_id = TrainId(train_id);
    let train = state
        .engine
        .state(train_id)
        .await
        .ok_or(MovementError::TrainNotFound(train_id))?;
    Ok(Json(train))
}

/// Parse the `from`/`to` pair shared by the fare and route endpoints.
fn station_pair(
    from: Option<&str>,
    to: Option<&str>,
) -> Result<(StationId, StationId), AppError> {
    let (Some(from), Some(to)) = (
        from.map(str::trim).filter(|s| !s.is_empty()),
        to.map(str::trim).filter(|s| !s.is_empty()),
    ) else {
        return Err(AppError::BadRequest {
            message: "Missing required parameters: from and to".to_string(),
        });
    };

    match (from.parse::<i64>(), to.parse::<i64>()) {
        (Ok(from), Ok(to)) => Ok((StationId(from), StationId(to))),
        _ => Err(AppError::BadRequest {
            message: "Invalid station IDs. Must be integers.".to_string(),
        }),
    }
}

fn route_mode(mode: Option<&str>) -> Result<RouteMode, AppError> {
    match mode.map(str::trim).filter(|m| !m.is_empty()) {
        None => Ok(RouteMode::default()),
        Some(m) if m.eq_ignore_ascii_case("hops") => Ok(RouteMode::Hops),
        Some(m) if m.eq_ignore_ascii_case("cost") => Ok(RouteMode::Cost),
        Some(m) => Err(AppError::BadRequest {
            message: format!("Invalid mode: {m}. Must be hops or cost."),
        }),
    }
}

/// Direct fare between two stations.
///
/// Only an explicit fare row answers; the reverse row is not consulted.
async fn fare(
    State(state): State<AppState>,
    Query(req): Query<FareQuery>,
) -> Result<Json<FareResponse>, AppError> {
    let (origin, destination) = station_pair(req.from.as_deref(), req.to.as_deref())?;

    if origin == destination {
        return Ok(Json(FareResponse {
            fare: 0.0,
            distance_km: 0.0,
            travel_time_min: 0,
        }));
    }

    let edge = state
        .store
        .get_fare(origin, destination)
        .await?
        .ok_or(RouteError::NoFareFound {
            origin,
            destination,
        })?;

    Ok(Json(FareResponse {
        fare: round_fare(edge.price),
        distance_km: edge.distance_km,
        travel_time_min: edge.travel_time_min,
    }))
}

/// Route between two stations by fewest hops or lowest fare.
async fn route(
    State(state): State<AppState>,
    Query(req): Query<RouteQuery>,
) -> Result<Json<RouteResponse>, AppError> {
    let (origin, destination) = station_pair(req.from.as_deref(), req.to.as_deref())?;
    let mode = route_mode(req.mode.as_deref())?;

    if origin == destination {
        return Ok(Json(RouteResponse {
            path: vec![origin],
            total_fare: 0.0,
            total_hops: 0,
            estimated: false,
            mode,
            travel_time_min: Some(0),
        }));
    }

    let graph = state.graph.get(&state.store).await?;
    let version = graph.version();

    let route = match state.routes.get(version, mode, origin, destination).await {
        Some(route) => {
            debug!(%origin, %destination, mode = mode.as_str(), "Route cache hit");
            route
        }
        None => {
            let route = Arc::new(find_route(&graph, mode, origin, destination)?);
            state
                .routes
                .insert(version, mode, origin, destination, Arc::clone(&route))
                .await;
            route
        }
    };

    let topology = state.topology();
    let travel_time_min = match (topology.station(origin), topology.station(destination)) {
        (Some(o), Some(d)) => state.store.get_travel_time(&o.name, &d.name).await?,
        _ => None,
    };

    Ok(Json(RouteResponse::from_route(&route, mode, travel_time_min)))
}

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    BadRequest { message: String },
    NotFound { kind: ErrorKind, message: String },
    Internal { kind: ErrorKind, message: String },
}

impl AppError {
    fn classify(kind: ErrorKind, message: String) -> Self {
        match kind {
            ErrorKind::TopologyIo => AppError::Internal { kind, message },
            _ => AppError::NotFound { kind, message },
        }
    }
}

impl From<RouteError> for AppError {
    fn from(e: RouteError) -> Self {
        AppError::classify(e.kind(), e.to_string())
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        AppError::classify(e.kind(), e.to_string())
    }
}

impl From<MovementError> for AppError {
    fn from(e: MovementError) -> Self {
        AppError::classify(e.kind(), e.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::BadRequest { message } => {
                debug!(%message, "Bad request");
                (
                    StatusCode::BAD_REQUEST,
                    ErrorResponse {
                        error: message,
                        kind: None,
                    },
                )
            }
            AppError::NotFound { kind, message } => {
                debug!(?kind, %message, "Not found");
                (
                    StatusCode::NOT_FOUND,
                    ErrorResponse {
                        error: message,
                        kind: Some(kind),
                    },
                )
            }
            AppError::Internal { kind, message } => {
                // Details stay in the log
                error!(?kind, %message, "Request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse {
                        error: "Topology store unavailable".to_string(),
                        kind: Some(kind),
                    },
                )
            }
        };

        (status, Json(body)).into_response()
    }
}
