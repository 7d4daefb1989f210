use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod state;

use lemmasearch_backend::config;
use lemmasearch_backend::crawler::{CrawlOrchestrator, HttpFetcher};
use lemmasearch_backend::db;
use lemmasearch_backend::search::{SearchEngine, TextAnalyzer};
use lemmasearch_backend::store::IndexStore;
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lemmasearch_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration / 加载配置
    let app_config = config::load_config().map_err(anyhow::Error::msg)?;
    tracing::info!("Server will listen on {}:{}", app_config.server.host, app_config.server.port);
    tracing::info!("{} sites configured", app_config.sites.len());

    let data_dir = app_config.get_data_dir();
    if !data_dir.exists() {
        std::fs::create_dir_all(&data_dir)?;
        tracing::info!("Created data directory: {:?}", data_dir);
    }

    let database_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| app_config.get_database_url());
    let pool = db::connect(&database_url).await?;
    db::run_migrations(&pool).await?;

    let store = IndexStore::new(pool);
    let analyzer = TextAnalyzer::from_config(&app_config.search);
    let fetcher = Arc::new(HttpFetcher::new(&app_config.crawler)?);
    let orchestrator = CrawlOrchestrator::new(
        store.clone(),
        analyzer.clone(),
        fetcher,
        app_config.sites.clone(),
        app_config.crawler.clone(),
    );

    // 上次进程退出时仍在索引的站点
    orchestrator.fail_interrupted().await?;

    let search = SearchEngine::new(
        store.clone(),
        analyzer,
        app_config.search.effective_frequency_limit(),
    );

    let bind_addr = app_config.get_bind_address();
    let state = Arc::new(AppState {
        config: app_config,
        store,
        orchestrator,
        search,
    });

    let app = Router::new()
        .route("/api/statistics", get(api::statistics::get_statistics))
        .route("/api/startIndexing", get(api::indexing::start_indexing))
        .route("/api/stopIndexing", get(api::indexing::stop_indexing))
        .route("/api/indexPage", post(api::indexing::index_page))
        .route("/api/search", get(api::search::search))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("Server running at http://{}", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
