use std::sync::Arc;

use lemmasearch_backend::config::AppConfig;
use lemmasearch_backend::crawler::CrawlOrchestrator;
use lemmasearch_backend::search::SearchEngine;
use lemmasearch_backend::store::IndexStore;

/// Shared application state / 应用共享状态
pub struct AppState {
    pub config: AppConfig,
    pub store: IndexStore,
    pub orchestrator: Arc<CrawlOrchestrator>,
    pub search: SearchEngine,
}
