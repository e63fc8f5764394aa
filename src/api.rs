//! HTTP API router for Core Dispatch
//!
//! ## Endpoint Map
//!
//! | Path      | Description                         |
//! |-----------|-------------------------------------|
//! | `/`       | Static status message               |
//! | `/health` | Version and database reachability   |

use crate::db::Database;
use axum::{
    extract::State,
    http::{header, Method},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Status line returned by the root endpoint
pub const ROOT_MESSAGE: &str = "Core Dispatch 2.0 API is running.";

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub database: Database,
}

/// Build the complete Core Dispatch HTTP application
pub fn build_app(state: AppState, cors_origins: &[String]) -> Router {
    Router::new()
        .route("/", get(read_root))
        .route("/health", get(health_check))
        .with_state(state)
        .layer(build_cors(cors_origins))
        .layer(TraceLayer::new_for_http())
}

// =============================================================================
// Handlers
// =============================================================================

#[derive(Serialize)]
struct RootResponse {
    message: &'static str,
}

async fn read_root() -> impl IntoResponse {
    Json(RootResponse {
        message: ROOT_MESSAGE,
    })
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    database: &'static str,
}

async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    // Pool checkout and SQLite calls block
    let database = state.database.clone();
    let database = match tokio::task::spawn_blocking(move || database.ping()).await {
        Ok(Ok(())) => "ok",
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "Database ping failed");
            "unavailable"
        }
        Err(e) => {
            tracing::warn!(error = %e, "Database ping task failed");
            "unavailable"
        }
    };

    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        database,
    })
}

// =============================================================================
// CORS
// =============================================================================

fn build_cors(origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT]);

    if origins.is_empty() {
        cors.allow_origin(Any)
    } else {
        let parsed: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
        cors.allow_origin(parsed)
    }
}
