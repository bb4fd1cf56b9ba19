//! WebSocket push for chat.
//!
//! Clients connect to `GET /api/v1/ws?token=<jwt>`; every connection is
//! bound to the authenticated user so new messages can be pushed to all of
//! the receiver's open tabs.

mod handler;
mod heartbeat;
pub mod manager;

pub use handler::ws_handler;
pub use heartbeat::start_heartbeat;
pub use manager::{ChatEvent, WsManager};
