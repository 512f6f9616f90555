//! Websocket stream of train movement events.
//!
//! Every frame is a JSON object tagged by `type`. A new client first gets
//! `initial_trains`, then one `train_update` per movement. Clients may send
//! `request_trains`, `subscribe_zone` or `ping`.

use axum::{
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, watch};
use tracing::{debug, warn};

use super::dto::TrainResult;
use super::state::AppState;
use crate::broadcast::TrainEvent;
use crate::store::StoreError;

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ServerFrame<'a> {
    InitialTrains { trains: Vec<TrainResult> },
    TrainsData { trains: Vec<TrainResult> },
    ZoneTrains { zone: &'a str, trains: Vec<TrainResult> },
    TrainUpdate(&'a TrainEvent),
    Pong,
    Error { error: String },
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClientCommand {
    RequestTrains,
    SubscribeZone {
        #[serde(default)]
        zone: Option<String>,
    },
    Ping,
}

/// Which lines a client wants updates for.
///
/// A zone matches any line whose name contains it, ignoring case. `all`
/// or an empty zone matches everything.
#[derive(Debug, Default, Clone, PartialEq)]
struct Zone(Option<String>);

impl Zone {
    fn parse(zone: Option<&str>) -> Self {
        match zone.map(str::trim) {
            None | Some("") => Self(None),
            Some(z) if z.eq_ignore_ascii_case("all") => Self(None),
            Some(z) => Self(Some(z.to_lowercase())),
        }
    }

    fn admits(&self, line: &str) -> bool {
        self.0
            .as_deref()
            .is_none_or(|needle| line.to_lowercase().contains(needle))
    }

    fn label(&self) -> &str {
        self.0.as_deref().unwrap_or("all")
    }
}

/// Upgrade to a websocket that receives the fleet, then every movement.
pub async fn train_feed(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    // Subscribe before the snapshot is read so no move falls in between
    let events = state.broadcaster.subscribe();
    let shutdown = state.shutdown.clone();
    ws.on_upgrade(move |socket| pump(socket, state, events, shutdown))
}

fn encode(frame: &ServerFrame<'_>) -> Option<Message> {
    match serde_json::to_string(frame) {
        Ok(text) => Some(Message::Text(text)),
        Err(e) => {
            warn!(error = %e, "Failed to encode websocket frame");
            None
        }
    }
}

fn fleet_error(e: StoreError) -> ServerFrame<'static> {
    warn!(error = %e, "Failed to load trains for websocket client");
    ServerFrame::Error {
        error: "Failed to fetch train data".to_string(),
    }
}

async fn initial_frame(state: &AppState) -> ServerFrame<'static> {
    match state.fleet().await {
        Ok(trains) => ServerFrame::InitialTrains { trains },
        Err(e) => fleet_error(e),
    }
}

/// Answer one text message from the client.
async fn handle_command(state: &AppState, zone: &mut Zone, text: &str) -> Option<Message> {
    let command = match serde_json::from_str::<ClientCommand>(text) {
        Ok(command) => command,
        Err(e) => {
            debug!(error = %e, "Unrecognised websocket command");
            return encode(&ServerFrame::Error {
                error: format!("Unrecognised command: {e}"),
            });
        }
    };

    match command {
        ClientCommand::Ping => encode(&ServerFrame::Pong),
        ClientCommand::RequestTrains => match state.fleet().await {
            Ok(trains) => encode(&ServerFrame::TrainsData { trains }),
            Err(e) => encode(&fleet_error(e)),
        },
        ClientCommand::SubscribeZone { zone: requested } => {
            *zone = Zone::parse(requested.as_deref());
            debug!(zone = zone.label(), "Websocket client subscribed");
            match state.fleet().await {
                Ok(mut trains) => {
                    trains.retain(|t| zone.admits(&t.line));
                    encode(&ServerFrame::ZoneTrains {
                        zone: zone.label(),
                        trains,
                    })
                }
                Err(e) => encode(&fleet_error(e)),
            }
        }
    }
}

async fn pump(
    socket: WebSocket,
    state: AppState,
    mut events: broadcast::Receiver<TrainEvent>,
    mut shutdown: watch::Receiver<bool>,
) {
    if *shutdown.borrow() {
        return;
    }
    let (mut sender, mut receiver) = socket.split();
    debug!("Websocket client connected");

    let mut zone = Zone::default();
    if let Some(message) = encode(&initial_frame(&state).await)
        && sender.send(message).await.is_err()
    {
        return;
    }

    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    if let Some(reply) = handle_command(&state, &mut zone, &text).await
                        && sender.send(reply).await.is_err()
                    {
                        break;
                    }
                }
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
            received = events.recv() => match received {
                Ok(event) => {
                    if !zone.admits(&event.line) {
                        continue;
                    }
                    let Some(message) = encode(&ServerFrame::TrainUpdate(&event)) else {
                        continue;
                    };
                    if sender.send(message).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Websocket client lagging, events dropped");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }
    }

    let _ = sender.send(Message::Close(None)).await;
    debug!("Websocket client disconnected");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Direction, StationId, TrainId};
    use crate::web::state::fixtures::app;

    fn json(message: Option<Message>) -> serde_json::Value {
        let Some(Message::Text(text)) = &message else {
            panic!("expected a text frame, got {message:?}");
        };
        serde_json::from_str(text).unwrap()
    }

    #[test]
    fn train_update_frames_are_tagged_events() {
        let event = TrainEvent {
            train_id: TrainId(3),
            station_id: StationId(12),
            station_name: "Masjid Jamek".to_string(),
            latitude: 3.1494,
            longitude: 101.6964,
            line: "LRT Ampang".to_string(),
            direction: Direction::Backward,
            timestamp: 1_700_000_000.0,
        };

        let frame = json(encode(&ServerFrame::TrainUpdate(&event)));
        assert_eq!(frame["type"], "train_update");
        assert_eq!(frame["train_id"], 3);
        assert_eq!(frame["station_name"], "Masjid Jamek");
        assert_eq!(frame["direction"], "backward");
    }

    #[tokio::test]
    async fn connect_sends_fleet_snapshot() {
        let (state, _) = app().await;
        let frame = json(encode(&initial_frame(&state).await));

        assert_eq!(frame["type"], "initial_trains");
        let trains = frame["trains"].as_array().unwrap();
        assert_eq!(trains.len(), 1);
        assert_eq!(trains[0]["train_id"], 1);
        assert_eq!(trains[0]["station_name"], "A");
        assert_eq!(trains[0]["line"], "L");
    }

    #[tokio::test]
    async fn snapshot_during_outage_is_an_error_frame() {
        let (state, store) = app().await;
        store.set_unavailable(true);

        let frame = json(encode(&initial_frame(&state).await));
        assert_eq!(frame["type"], "error");
        assert_eq!(frame["error"], "Failed to fetch train data");
    }

    #[tokio::test]
    async fn request_trains_returns_whole_fleet() {
        let (state, _) = app().await;
        let mut zone = Zone::parse(Some("K"));

        let frame = json(handle_command(&state, &mut zone, r#"{"type":"request_trains"}"#).await);
        assert_eq!(frame["type"], "trains_data");
        assert_eq!(frame["trains"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn subscribe_zone_narrows_snapshot_and_updates() {
        let (state, _) = app().await;
        let mut zone = Zone::default();

        let frame = json(
            handle_command(&state, &mut zone, r#"{"type":"subscribe_zone","zone":"k"}"#).await,
        );
        assert_eq!(frame["type"], "zone_trains");
        assert_eq!(frame["zone"], "k");
        assert!(frame["trains"].as_array().unwrap().is_empty());
        assert!(zone.admits("K"));
        assert!(!zone.admits("L"));

        let frame = json(handle_command(&state, &mut zone, r#"{"type":"subscribe_zone"}"#).await);
        assert_eq!(frame["zone"], "all");
        assert_eq!(frame["trains"].as_array().unwrap().len(), 1);
        assert!(zone.admits("L"));
    }

    #[tokio::test]
    async fn ping_and_unknown_commands() {
        let (state, _) = app().await;
        let mut zone = Zone::default();

        let frame = json(handle_command(&state, &mut zone, r#"{"type":"ping"}"#).await);
        assert_eq!(frame["type"], "pong");

        let frame = json(handle_command(&state, &mut zone, r#"{"type":"teleport"}"#).await);
        assert_eq!(frame["type"], "error");

        let frame = json(handle_command(&state, &mut zone, "not json").await);
        assert_eq!(frame["type"], "error");
        assert_eq!(zone, Zone::default());
    }

    #[test]
    fn zone_matching() {
        assert_eq!(Zone::parse(None), Zone::default());
        assert_eq!(Zone::parse(Some("  ")), Zone::default());
        assert_eq!(Zone::parse(Some("ALL")), Zone::default());

        let zone = Zone::parse(Some(" Kelana "));
        assert_eq!(zone.label(), "kelana");
        assert!(zone.admits("LRT Kelana Jaya"));
        assert!(!zone.admits("MRT Kajang"));
    }
}
