use std::sync::Arc;

use cyberxercise_db::store::SessionStore;

use crate::config::ServerConfig;
use crate::engine::{EngineConfig, LifecycleEngine};
use crate::ws::WsManager;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Session storage (PostgreSQL or in-memory).
    pub store: Arc<dyn SessionStore>,
    pub config: Arc<ServerConfig>,
    /// Per-session WebSocket connection registry; also the engine's broadcaster.
    pub ws_manager: Arc<WsManager>,
    pub engine: Arc<LifecycleEngine>,
}

impl AppState {
    /// Wire the engine to the store and a fresh connection registry.
    pub fn new(store: Arc<dyn SessionStore>, config: ServerConfig) -> Self {
        let ws_manager = Arc::new(WsManager::new());
        let engine = LifecycleEngine::new(
            Arc::clone(&store),
            ws_manager.clone(),
            EngineConfig {
                participant_token_pepper: config.participant_token_pepper.clone(),
                team_code_max_attempts: config.team_code_max_attempts,
            },
        );

        Self {
            store,
            config: Arc::new(config),
            ws_manager,
            engine: Arc::new(engine),
        }
    }
}
