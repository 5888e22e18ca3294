// =============================================================================
// Application State — shared by every request handler
// =============================================================================
//
// Immutable after startup: configuration plus the provider handle. Handlers
// never write here, so no locking is needed at this level.
// =============================================================================

use std::sync::Arc;

use crate::config::ServerConfig;
use crate::provider::MarketDataProvider;

pub struct AppState {
    pub config: ServerConfig,
    pub provider: Arc<dyn MarketDataProvider>,
}

impl AppState {
    pub fn new(config: ServerConfig, provider: Arc<dyn MarketDataProvider>) -> Self {
        Self { config, provider }
    }
}
