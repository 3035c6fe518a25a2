// src/web/mod.rs
// HTTP layer

pub mod api;
pub mod error;
pub mod state;
pub mod types;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use error::{ApiError, ApiResult};
pub use state::AppState;
pub use types::{ChatResponse, InferResponse, MessageRequest};

/// Create the router. Any origin, method and header is allowed.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(api::health))
        .route("/infer", post(api::infer))
        .route("/chat", post(api::chat))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
