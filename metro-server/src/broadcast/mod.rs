//! Movement-to-broadcast adapter and transports.
//!
//! Every successful advance becomes a [`TrainEvent`] pushed through the
//! [`Broadcaster`]. Transports (the websocket endpoint, the multicast sink)
//! subscribe independently and all carry the same record.

mod event;
mod hub;
mod multicast;

pub use event::TrainEvent;
pub use hub::{Broadcaster, DEFAULT_CAPACITY};
pub use multicast::{DEFAULT_GROUP, MulticastSink, encode};
