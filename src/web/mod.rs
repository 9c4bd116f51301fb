//! Browser front end: a single page with the two upload pickers and a
//! results area filled in by `POST /audit`.
//!
//! | Route         | Handler                      |
//! |---------------|------------------------------|
//! | `GET /`       | [`handlers::serve_index`]    |
//! | `POST /audit` | [`handlers::run_audit`]      |
//! | `GET /health` | [`handlers::health_check`]   |

pub mod handlers;
pub mod render;

use crate::audit::Auditor;
use crate::client::resolve_api_key;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;

/// Application state shared across HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub auditor: Arc<Auditor>,
    /// Held for the whole of a run; audits execute one at a time.
    pub gate: Arc<Mutex<()>>,
    /// Shown in the sidebar.
    pub credential_loaded: bool,
}

impl AppState {
    pub fn new(auditor: Arc<Auditor>) -> Self {
        Self {
            auditor,
            gate: Arc::new(Mutex::new(())),
            credential_loaded: resolve_api_key().is_some(),
        }
    }
}

/// Build the application router.
pub fn build_router(state: AppState) -> Router {
    let body_limit = state.auditor.config().max_upload_bytes;

    Router::new()
        .route("/", get(handlers::serve_index))
        .route("/audit", post(handlers::run_audit))
        .route("/health", get(handlers::health_check))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
