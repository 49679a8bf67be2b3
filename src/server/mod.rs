pub mod routes;
pub mod state;
pub mod transcribe;

use axum::http::Method;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};

use crate::server::state::AppState;

/// Routes the browser extension calls. CORS is wide open; the extension
/// runs from arbitrary page origins.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route("/parse", post(routes::parse))
        .route("/select-element", post(routes::select_element))
        .route("/select-all-elements", post(routes::select_all_elements))
        .route("/selected-elements-history", get(routes::history))
        .route("/transcribe", post(transcribe::transcribe))
        .layer(cors_layer())
        .with_state(state)
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
}
