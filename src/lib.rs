use std::sync::Arc;

use axum::{extract::DefaultBodyLimit, routing::get, Router};
use sqlx::SqlitePool;

pub mod activity;
pub mod auth;
pub mod config;
pub mod constants;
pub mod error;
pub mod export;
pub mod handlers;
pub mod models;
pub mod repositories;
pub mod service;

use config::Config;
use handlers::mindmap_handlers::{mindmaps_delete, mindmaps_get, mindmaps_post, mindmaps_put};
use handlers::user_handlers::{auth_get, auth_post};
use service::MindMapService;

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub db_pool: SqlitePool,
    pub config: Arc<Config>,
    pub service: Arc<MindMapService>,
}

/// Builds the application router over an already-connected pool. Both API
/// routes dispatch on the `action` query parameter; unsupported methods get
/// the enveloped 405 instead of axum's bare one.
pub fn create_router(db_pool: SqlitePool, config: Config) -> Router {
    let config = Arc::new(config);
    let service = Arc::new(MindMapService::new(db_pool.clone(), config.clone()));
    let app_state = AppState {
        db_pool,
        config,
        service,
    };

    // API bodies are small JSON documents.
    const MAX_BODY_SIZE: usize = 1024 * 1024;

    Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/api/mindmaps",
            get(mindmaps_get)
                .post(mindmaps_post)
                .put(mindmaps_put)
                .delete(mindmaps_delete)
                .fallback(handlers::method_not_allowed),
        )
        .route(
            "/api/auth",
            get(auth_get)
                .post(auth_post)
                .fallback(handlers::method_not_allowed),
        )
        .with_state(app_state)
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE))
}
