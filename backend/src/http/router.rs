//! Router configuration for the HTTP API.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers;
use super::state::AppState;

/// Create the main application router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_v1 = Router::new()
        .route("/state/current", get(handlers::current_state))
        .route("/state/summary", get(handlers::state_summary))
        .route(
            "/snapshots",
            get(handlers::snapshot_history).post(handlers::ingest_snapshot),
        )
        .route("/forecast", post(handlers::run_forecast))
        .route("/forecast/latest", get(handlers::latest_forecast))
        .route("/forecast/runs", get(handlers::list_forecast_runs))
        .route("/forecast/stream", get(handlers::stream_forecasts))
        .route("/events", get(handlers::recent_events))
        .route("/limits", get(handlers::list_limits));

    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/v1", api_v1)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
