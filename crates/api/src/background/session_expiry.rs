//! Ends running sessions whose configured duration has elapsed.
//!
//! Expired sessions are ended with `ended_by = system` through the lifecycle
//! engine, so subscribers receive the usual `session_ended` event.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use crate::engine::LifecycleEngine;

/// Run the expiry sweep loop until `cancel` is triggered.
pub async fn run(engine: Arc<LifecycleEngine>, period: Duration, cancel: CancellationToken) {
    tracing::info!(interval_secs = period.as_secs(), "Session expiry job started");

    let mut interval = tokio::time::interval(period);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Session expiry job stopping");
                break;
            }
            _ = interval.tick() => {
                match engine.expire_due_sessions(Utc::now()).await {
                    Ok(0) => tracing::debug!("Session expiry: nothing due"),
                    Ok(ended) => tracing::info!(ended, "Session expiry: ended overdue sessions"),
                    Err(e) => tracing::error!(error = %e, "Session expiry: sweep failed"),
                }
            }
        }
    }
}
