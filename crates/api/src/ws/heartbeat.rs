use std::sync::Arc;
use std::time::Duration;

use crate::ws::manager::WsManager;

/// Interval between heartbeat pings.
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Spawn a background task that sends periodic Ping frames to every
/// connected client.
///
/// The task runs until the returned `JoinHandle` is aborted during shutdown.
pub fn start_heartbeat(
    ws_manager: Arc<WsManager>,
    period: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);

        loop {
            interval.tick().await;
            let count = ws_manager.connection_count().await;
            let sessions = ws_manager.session_count().await;
            tracing::debug!(count, sessions, "WebSocket heartbeat ping");
            ws_manager.ping_all().await;
        }
    })
}
