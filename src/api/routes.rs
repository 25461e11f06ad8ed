//! Router setup and shared application state.
use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::api::handlers;
use crate::orchestrator::Orchestrator;

pub struct AppState {
    pub orchestrator: Orchestrator,
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/resolve", post(handlers::resolve_context))
        .route("/generate/text", post(handlers::generate_text))
        .route(
            "/generate/image/background",
            post(handlers::generate_image_background),
        )
        .route(
            "/generate/image/compose",
            post(handlers::generate_image_compose),
        )
        .route(
            "/generate/image/from-image",
            post(handlers::generate_image_from_image),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}
