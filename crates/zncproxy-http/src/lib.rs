//! External Interfaces (C14): wires the management API and the proxied
//! surface onto one axum `Router`, per spec.md §6.
//!
//! Grounded on `chronx-rpc/src/server.rs`'s permissive-CORS server
//! bootstrap, narrowed to an explicit origin allow-list for the
//! management endpoints (spec.md §4.12's CORS origin list); the proxied
//! surface keeps the upstream's own permissive headers, added by
//! `zncproxy_forwarder::HttpForwarder` itself.

mod error;
mod extract;
mod routes;
pub mod state;

use axum::extract::State;
use axum::http::{HeaderValue, Method, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

pub use state::{AppState, HealthFlags, SharedState};

/// Builds the full router: token/bundle/currency management endpoints
/// (JWT-authenticated), the proxied surface (token-authenticated,
/// admission-gated), and the two interface-level-only endpoints
/// (spec.md §1 Non-goals, specified at interface level only).
pub fn build_router(state: SharedState, cors_origins: &[String]) -> Router {
    let cors = build_cors(cors_origins);

    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .merge(routes::tokens::router())
        .merge(routes::bundles::router())
        .merge(routes::currency::router())
        .merge(routes::proxy::router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn build_cors(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.is_empty() {
        AllowOrigin::any()
    } else {
        let parsed: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|o| HeaderValue::from_str(o).ok())
            .collect();
        AllowOrigin::list(parsed)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::PATCH,
            Method::OPTIONS,
        ])
        .allow_headers(tower_http::cors::Any)
}

/// Returns 200 `{"status":"ok"}` once storage and cache have each been
/// probed successfully at least once since startup, 503 `{"status":
/// "degraded"}` otherwise (spec.md §4.13).
async fn health(State(state): State<SharedState>) -> impl IntoResponse {
    if state.health.is_ready() {
        (StatusCode::OK, Json(serde_json::json!({"status": "ok"})))
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({"status": "degraded"})),
        )
    }
}

async fn metrics() -> impl IntoResponse {
    (StatusCode::OK, "# zncproxy metrics placeholder\n")
}
