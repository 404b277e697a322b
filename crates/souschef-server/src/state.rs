//! Shared application state.

use std::sync::Arc;
use std::time::Instant;

use souschef_bot::SessionStore;
use souschef_graph::GraphClient;

/// State accessible from all route handlers.
pub struct AppState {
    pub sessions: Arc<SessionStore>,
    pub graph: Arc<dyn GraphClient>,
    pub backend: &'static str,
    pub started_at: Instant,
}
