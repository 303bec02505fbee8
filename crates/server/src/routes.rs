//! Application router and the service-level endpoints.

use axum::extract::State;
use axum::http::{header, Method, StatusCode};
use axum::response::{IntoResponse, Json};
use axum::routing::get;
use axum::Router;
use serde_json::json;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::events::route::events_handler;
use crate::instances::route::{current_handler, drilldown_handler, graph_handler};
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let cors = if state.config.server.enable_cors {
        let origins = state
            .config
            .server
            .cors_origins
            .iter()
            .filter_map(|s| s.parse::<axum::http::HeaderValue>().ok())
            .collect::<Vec<_>>();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
    } else {
        // Restrictive layer (same-origin only) when CORS is disabled.
        CorsLayer::new()
    };

    let request_timeout = Duration::from_secs(state.config.server.request_timeout_secs);

    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/ready", get(readiness_handler))
        .route("/events", get(events_handler))
        .route("/instances/graph", get(graph_handler))
        .route("/instances/drilldown", get(drilldown_handler))
        .route("/instances/current", get(current_handler))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(TimeoutLayer::with_status_code(
                    StatusCode::REQUEST_TIMEOUT,
                    request_timeout,
                ))
                .layer(cors),
        )
        .with_state(state)
}

/// Root handler — API info plus the poll policy the dashboard should obey.
async fn root_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "name": "Platform Pulse API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "events": "/events",
            "instances_graph": "/instances/graph",
            "instances_drilldown": "/instances/drilldown",
            "instances_current": "/instances/current",
            "health": "/health",
            "ready": "/ready"
        },
        "poll": {
            "events_interval_secs": state.config.poll.events_interval_secs,
            "graph_interval_secs": state.config.poll.graph_interval_secs
        }
    }))
}

async fn health_handler() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

/// Readiness check — probes the metric store with a constant query. An
/// empty result means the backend is unreachable (degrade-to-empty hides
/// the transport error, so emptiness is the signal here).
async fn readiness_handler(State(state): State<AppState>) -> impl IntoResponse {
    let probe = state.metrics.query_instant("vector(1)").await;
    let ready = !probe.is_empty();

    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(json!({ "ready": ready })))
}
