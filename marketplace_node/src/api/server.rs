//! Router assembly and server startup.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::{
    http::Method,
    routing::{get, post},
    Json, Router,
};
use log::info;
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};

use crate::agent::{AgentOrchestrator, DocumentRanker, GeminiRanker};
use crate::api::handlers;
use crate::config::Config;
use crate::ledger::PurchaseLedger;
use crate::storage::{seed::seed_demo_data, MarketStore, MemoryStore};

/// Shared application state injected into every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn MarketStore>,
    pub ledger: Arc<PurchaseLedger>,
    pub agent: Arc<AgentOrchestrator>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn MarketStore>,
        ranker: Arc<dyn DocumentRanker>,
        ranker_timeout: Duration,
    ) -> Self {
        let ledger = Arc::new(PurchaseLedger::new(store.clone()));
        let agent = Arc::new(AgentOrchestrator::new(
            store.clone(),
            ledger.clone(),
            ranker,
            ranker_timeout,
        ));
        Self {
            store,
            ledger,
            agent,
        }
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        // Users
        .route("/api/users/wallet", post(handlers::users::connect_wallet))
        // Documents
        .route(
            "/api/documents",
            get(handlers::documents::list_documents).post(handlers::documents::create_document),
        )
        .route("/api/documents/search", get(handlers::documents::search_documents))
        .route("/api/documents/my/:seller_id", get(handlers::documents::list_my_documents))
        .route(
            "/api/documents/:id",
            get(handlers::documents::get_document)
                .patch(handlers::documents::update_document)
                .delete(handlers::documents::delete_document),
        )
        // Purchases
        .route(
            "/api/purchases",
            get(handlers::purchases::list_purchases).post(handlers::purchases::create_purchase),
        )
        .route("/api/purchases/buyer/:buyer_id", get(handlers::purchases::list_buyer_purchases))
        // Stats
        .route("/api/seller/stats", get(handlers::stats::seller_stats))
        .route("/api/marketplace/stats", get(handlers::stats::marketplace_stats))
        // AI agent
        .route("/api/agent/query", post(handlers::agent::agent_query))
        .route("/api/agent/purchase", post(handlers::agent::agent_purchase))
        .route("/api/agent/sessions", post(handlers::agent::create_session))
        .route("/api/agent/sessions/:user_id", get(handlers::agent::list_sessions))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PATCH,
                    Method::DELETE,
                ])
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Builds the state from config and serves the API until shutdown.
pub async fn start(config: Config) -> Result<()> {
    let store: Arc<dyn MarketStore> = Arc::new(MemoryStore::new());
    if config.seed_demo_data {
        seed_demo_data(store.as_ref()).await;
    }

    let ranker = Arc::new(GeminiRanker::new(&config.ranker)?);
    let state = AppState::new(store, ranker, config.ranker.timeout);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?;
    info!("marketplace node listening on http://0.0.0.0:{}", config.port);
    axum::serve(listener, app).await?;
    Ok(())
}
