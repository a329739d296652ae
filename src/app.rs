use std::sync::Arc;

use crate::config::Config;
use crate::registry::NetworkRegistry;
use crate::session::SessionManager;

/// Shared state handed to every HTTP handler.
#[derive(Clone)]
pub struct AppState {
    pub cfg: Config,
    pub sessions: Arc<SessionManager>,
}

impl AppState {
    pub fn new(cfg: Config, registry: NetworkRegistry) -> Self {
        let sessions = Arc::new(SessionManager::new(registry, cfg.explorer.view_settings()));
        Self { cfg, sessions }
    }
}
