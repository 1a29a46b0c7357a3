//! muster-server library
//!
//! Receives whole-data snapshots from scanning clients, keeps the push
//! subscriber list, and pushes the in/out report on a fixed schedule.

use axum::http::{header, HeaderValue, Method};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod config;
pub mod error;
pub mod push;
pub mod scheduler;
pub mod store;

pub use error::{ApiError, ApiResult};
pub use store::BackendStore;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<BackendStore>,
    /// Browser origin allowed by CORS; `None` sends no CORS headers
    pub allowed_origin: Option<HeaderValue>,
}

impl AppState {
    pub fn new(store: Arc<BackendStore>) -> Self {
        Self {
            store,
            allowed_origin: None,
        }
    }

    pub fn with_allowed_origin(mut self, origin: HeaderValue) -> Self {
        self.allowed_origin = Some(origin);
        self
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{get, post};

    let cors = state.allowed_origin.clone().map(|origin| {
        CorsLayer::new()
            .allow_origin(origin)
            .allow_methods([Method::GET, Method::POST])
            .allow_headers([header::CONTENT_TYPE])
    });

    let router = Router::new()
        .route("/api/update-data", post(api::update_data))
        .route("/api/subscribe-push", post(api::subscribe_push))
        .route("/api/report", get(api::get_report))
        .merge(api::health_routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    match cors {
        Some(cors) => router.layer(cors),
        None => router,
    }
}
