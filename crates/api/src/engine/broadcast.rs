use async_trait::async_trait;
use cyberxercise_core::types::DbId;

use super::events::SessionEvent;

/// Fan-out of session events to realtime subscribers.
///
/// Delivery is best-effort and must never fail the calling operation, so the
/// method has no error channel. Implementations must not block on socket I/O.
#[async_trait]
pub trait Broadcaster: Send + Sync {
    async fn broadcast(&self, session_id: DbId, event: SessionEvent);
}
