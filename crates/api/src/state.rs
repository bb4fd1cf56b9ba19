use std::sync::Arc;

use gradhub_core::storage::FileStorage;
use gradhub_db::lifecycle::PreProjectLifecycle;

use crate::config::ServerConfig;
use crate::similarity::SimilarityChecker;
use crate::ws::WsManager;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable: inner data is behind `Arc` or is already `Clone`.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: gradhub_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// WebSocket connection manager (chat push).
    pub ws_manager: Arc<WsManager>,
    /// Pre-project lifecycle controller.
    pub lifecycle: PreProjectLifecycle,
    /// Upload storage backend.
    pub storage: Arc<dyn FileStorage>,
    /// Similarity gate client. `None` when no service is configured.
    pub similarity: Option<Arc<dyn SimilarityChecker>>,
}
