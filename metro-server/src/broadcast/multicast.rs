//! UDP multicast transport for train events.

use std::net::{Ipv4Addr, SocketAddr};

use serde::Serialize;
use tokio::net::UdpSocket;
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};

use super::event::TrainEvent;

/// Group and port listened on by the monitoring clients.
pub const DEFAULT_GROUP: SocketAddr =
    SocketAddr::new(std::net::IpAddr::V4(Ipv4Addr::new(224, 1, 1, 1)), 9001);

/// Datagram body: the event plus a message type tag.
#[derive(Debug, Serialize)]
struct Datagram<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    #[serde(flatten)]
    event: &'a TrainEvent,
    zone: &'static str,
}

/// Encode an event as a JSON datagram.
pub fn encode(event: &TrainEvent) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(&Datagram {
        kind: "TRAIN_UPDATE",
        event,
        zone: "metro_kl",
    })
}

/// Sends every event as one datagram to a multicast group.
pub struct MulticastSink {
    socket: UdpSocket,
    target: SocketAddr,
}

impl MulticastSink {
    /// Bind an ephemeral local socket for sending to `target`.
    ///
    /// Multicast TTL is 1 so datagrams stay on the local network.
    pub async fn bind(target: SocketAddr) -> std::io::Result<Self> {
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).await?;
        if target.ip().is_multicast() {
            socket.set_multicast_ttl_v4(1)?;
        }
        Ok(Self { socket, target })
    }

    pub async fn send(&self, event: &TrainEvent) -> std::io::Result<()> {
        let bytes = encode(event).map_err(std::io::Error::other)?;
        self.socket.send_to(&bytes, self.target).await?;
        Ok(())
    }

    /// Forward events until shutdown or until the channel closes.
    ///
    /// Send failures are logged and the event dropped.
    pub async fn run(
        self,
        mut events: broadcast::Receiver<TrainEvent>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        info!(target = %self.target, "Multicast sink started");
        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                received = events.recv() => match received {
                    Ok(event) => {
                        if let Err(e) = self.send(&event).await {
                            warn!(train_id = %event.train_id, error = %e, "Multicast send failed");
                        } else {
                            debug!(train_id = %event.train_id, "Multicast sent");
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Multicast sink lagging, events dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
            }
        }
        info!("Multicast sink stopped");
    }
}
