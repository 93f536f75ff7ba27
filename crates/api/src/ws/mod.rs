//! WebSocket infrastructure for real-time session events.
//!
//! Provides the per-session connection registry, heartbeat monitoring, and
//! the HTTP upgrade handlers for the instructor and participant channels.

mod handler;
mod heartbeat;
pub mod manager;

pub use handler::{instructor_ws_handler, participant_ws_handler};
pub use heartbeat::{start_heartbeat, HEARTBEAT_INTERVAL};
pub use manager::{Role, WsManager};
