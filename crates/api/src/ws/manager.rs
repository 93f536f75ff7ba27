use std::collections::HashMap;

use async_trait::async_trait;
use axum::body::Bytes;
use axum::extract::ws::Message;
use cyberxercise_core::types::DbId;
use tokio::sync::{mpsc, RwLock};

use crate::engine::{Broadcaster, SessionEvent};

/// Channel sender half for pushing messages to a WebSocket connection.
pub type WsSender = mpsc::UnboundedSender<Message>;

/// Which side of a session a connection watches from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Instructor,
    Participant,
}

/// A single registered WebSocket connection.
pub struct WsConnection {
    /// Channel sender for outbound messages to this connection.
    pub sender: WsSender,
}

#[derive(Default)]
struct SessionConnections {
    instructors: HashMap<String, WsConnection>,
    participants: HashMap<String, WsConnection>,
}

impl SessionConnections {
    fn all(&self) -> impl Iterator<Item = &WsConnection> {
        self.instructors.values().chain(self.participants.values())
    }

    fn len(&self) -> usize {
        self.instructors.len() + self.participants.len()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Registry of live WebSocket connections, grouped by session and role.
///
/// Thread-safe via interior `RwLock`; designed to be wrapped in `Arc` and
/// shared across the application. Only one process holds the registry, so
/// events never reach subscribers connected to another server instance.
pub struct WsManager {
    sessions: RwLock<HashMap<DbId, SessionConnections>>,
}

impl WsManager {
    /// Create a new, empty connection manager.
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Register a connection under `session_id`.
    ///
    /// Returns the receiver half of the message channel so the caller can
    /// forward messages to the WebSocket sink.
    pub async fn add(
        &self,
        session_id: DbId,
        conn_id: String,
        role: Role,
    ) -> mpsc::UnboundedReceiver<Message> {
        let (tx, rx) = mpsc::unbounded_channel();
        let conn = WsConnection { sender: tx };

        let mut sessions = self.sessions.write().await;
        let entry = sessions.entry(session_id).or_default();
        match role {
            Role::Instructor => entry.instructors.insert(conn_id, conn),
            Role::Participant => entry.participants.insert(conn_id, conn),
        };
        rx
    }

    /// Remove a connection. Unknown ids are ignored; a session with no
    /// connections left is dropped from the registry.
    pub async fn remove(&self, session_id: DbId, conn_id: &str) {
        let mut sessions = self.sessions.write().await;
        if let Some(entry) = sessions.get_mut(&session_id) {
            entry.instructors.remove(conn_id);
            entry.participants.remove(conn_id);
            if entry.is_empty() {
                sessions.remove(&session_id);
            }
        }
    }

    /// Deliver a message to every connection watching `session_id`.
    ///
    /// Senders are cloned under the read lock and fed after it is released.
    /// Closed channels are skipped; their connections are removed when the
    /// receive loop notices the disconnect. Returns the number delivered.
    pub async fn send_to_session(&self, session_id: DbId, message: Message) -> usize {
        let targets: Vec<WsSender> = {
            let sessions = self.sessions.read().await;
            match sessions.get(&session_id) {
                Some(entry) => entry.all().map(|c| c.sender.clone()).collect(),
                None => return 0,
            }
        };

        let mut delivered = 0;
        for sender in targets {
            if sender.send(message.clone()).is_ok() {
                delivered += 1;
            } else {
                tracing::debug!(session_id, "Skipping closed WebSocket channel");
            }
        }
        delivered
    }

    /// Number of live connections for one session, optionally by role.
    pub async fn session_connection_count(&self, session_id: DbId, role: Option<Role>) -> usize {
        let sessions = self.sessions.read().await;
        sessions.get(&session_id).map_or(0, |entry| match role {
            Some(Role::Instructor) => entry.instructors.len(),
            Some(Role::Participant) => entry.participants.len(),
            None => entry.len(),
        })
    }

    /// Number of sessions with at least one live connection.
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Return the current number of active connections across all sessions.
    pub async fn connection_count(&self) -> usize {
        self.sessions
            .read()
            .await
            .values()
            .map(SessionConnections::len)
            .sum()
    }

    /// Send a Close frame to every connection, then clear the registry.
    ///
    /// Used during graceful shutdown to notify all clients before the
    /// server stops.
    pub async fn shutdown_all(&self) {
        let mut sessions = self.sessions.write().await;
        let mut count = 0;
        for conn in sessions.values().flat_map(SessionConnections::all) {
            let _ = conn.sender.send(Message::Close(None));
            count += 1;
        }
        sessions.clear();
        tracing::info!(count, "Closed all WebSocket connections");
    }

    /// Send a Ping frame to every connected client.
    pub async fn ping_all(&self) {
        let sessions = self.sessions.read().await;
        for conn in sessions.values().flat_map(SessionConnections::all) {
            let _ = conn.sender.send(Message::Ping(Bytes::new()));
        }
    }
}

impl Default for WsManager {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Broadcaster for WsManager {
    async fn broadcast(&self, session_id: DbId, event: SessionEvent) {
        let text = match serde_json::to_string(&event) {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(error = %e, event = event.event_type(), "Failed to encode event");
                return;
            }
        };
        let delivered = self
            .send_to_session(session_id, Message::Text(text.into()))
            .await;
        tracing::debug!(session_id, event = event.event_type(), delivered, "Broadcast event");
    }
}
