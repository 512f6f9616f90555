//! Web layer for the metro tracker.
//!
//! JSON endpoints for stations, trains, fares and routes, plus a websocket
//! feed of train movements.

mod dto;
mod routes;
mod state;
mod ws;

pub use dto::*;
pub use routes::{AppError, create_router};
pub use state::AppState;
