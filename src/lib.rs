pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;
pub mod services;
pub mod static_files;
pub mod storage;
pub mod validation;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::services::AssistantService;
use crate::storage::ImageStore;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ImageStore>,
    pub config: Arc<Config>,
    pub assistant: AssistantService,
}

impl AppState {
    pub fn new(store: Arc<dyn ImageStore>, config: Arc<Config>) -> Self {
        let assistant = AssistantService::new(config.assistant.clone());
        Self {
            store,
            config,
            assistant,
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let image_routes = Router::new()
        .route("/api/images", get(handlers::image::list_images))
        .route("/api/images/upload", post(handlers::image::upload_images))
        .route(
            "/api/images/:id",
            get(handlers::image::get_image).delete(handlers::image::delete_image),
        )
        .route("/images/:id", get(handlers::image::serve_image))
        .layer(DefaultBodyLimit::max(state.config.upload.body_limit()));

    let assistant_routes = Router::new()
        .route("/api/ai/query", post(handlers::assistant::query))
        .route("/api/ai/welcome", get(handlers::assistant::welcome));

    let mut router = image_routes.merge(assistant_routes);

    if let Some(dir) = &state.config.server.static_dir {
        tracing::info!("Serving static files from {}", dir);
        router = router.fallback_service(static_files::spa_service(dir));
    }

    router
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
