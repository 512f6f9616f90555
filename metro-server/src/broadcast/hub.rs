//! In-process fan-out of train events.

use tokio::sync::broadcast;
use tracing::trace;

use super::event::TrainEvent;
use crate::movement::MovementResult;

/// Default number of events a slow subscriber may fall behind by.
pub const DEFAULT_CAPACITY: usize = 256;

/// Best-effort fan-out to every connected transport.
///
/// Publishing never blocks and never fails: with no subscribers the event
/// is dropped, and a subscriber that falls too far behind skips the oldest
/// events.
#[derive(Clone)]
pub struct Broadcaster {
    tx: broadcast::Sender<TrainEvent>,
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl Broadcaster {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TrainEvent> {
        self.tx.subscribe()
    }

    /// Convert a movement into an event and send it.
    ///
    /// Returns the number of subscribers that received it.
    pub fn publish(&self, result: &MovementResult) -> usize {
        self.send(TrainEvent::from(result))
    }

    pub fn send(&self, event: TrainEvent) -> usize {
        let train_id = event.train_id;
        let delivered = self.tx.send(event).unwrap_or(0);
        trace!(train_id = %train_id, delivered, "Event published");
        delivered
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Direction, StationId, TrainId};

    fn event(train: i64) -> TrainEvent {
        TrainEvent {
            train_id: TrainId(train),
            station_id: StationId(1),
            station_name: "Gombak".to_string(),
            latitude: 3.2313,
            longitude: 101.7244,
            line: "LRT Kelana Jaya".to_string(),
            direction: Direction::Forward,
            timestamp: 1.0,
        }
    }

    #[test]
    fn send_without_subscribers_is_dropped() {
        let hub = Broadcaster::default();
        assert_eq!(hub.send(event(1)), 0);
    }

    #[tokio::test]
    async fn every_subscriber_receives() {
        let hub = Broadcaster::new(8);
        let mut a = hub.subscribe();
        let mut b = hub.subscribe();
        assert_eq!(hub.subscriber_count(), 2);

        assert_eq!(hub.send(event(7)), 2);
        assert_eq!(a.recv().await.unwrap().train_id, TrainId(7));
        assert_eq!(b.recv().await.unwrap().train_id, TrainId(7));
    }

    #[tokio::test]
    async fn slow_subscriber_lags() {
        let hub = Broadcaster::new(2);
        let mut rx = hub.subscribe();
        for i in 0..5 {
            hub.send(event(i));
        }

        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Lagged(3))
        ));
        assert_eq!(rx.recv().await.unwrap().train_id, TrainId(3));
    }
}
