//! HTTP handlers for the REST API.
//!
//! Each handler corresponds to an API endpoint and delegates to the forecast
//! engine or to `db::services`.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures::stream::Stream;
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;

use super::dto::{
    EventsResponse, ForecastQuery, ForecastResponse, ForecastRunsResponse, HealthResponse,
    HistoryQuery, HistoryResponse, IngestResponse, LimitsResponse, ListQuery,
};
use super::error::AppError;
use super::state::AppState;
use crate::db::services as db_services;
use crate::db::{EventRepository, ForecastRepository, LimitsRepository, TimeSeriesRepository};
use crate::models::{ForecastRun, OperationalSnapshot};
use crate::services::{operational_summary, OperationalSummary};

/// Result type for handlers.
pub type HandlerResult<T> = Result<Json<T>, AppError>;

// =============================================================================
// Health Check
// =============================================================================

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> HandlerResult<HealthResponse> {
    let db_status = match db_services::health_check(state.repository.as_ref()).await {
        Ok(true) => "connected".to_string(),
        Ok(false) => "disconnected".to_string(),
        Err(e) => format!("error: {}", e),
    };

    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        version: "v1".to_string(),
        database: db_status,
    }))
}

// =============================================================================
// Live state
// =============================================================================

/// GET /v1/state/current
pub async fn current_state(State(state): State<AppState>) -> HandlerResult<OperationalSnapshot> {
    Ok(Json(state.engine.current_state().await?))
}

/// GET /v1/state/summary
pub async fn state_summary(State(state): State<AppState>) -> HandlerResult<OperationalSummary> {
    let summary = operational_summary(
        state.repository.as_ref(),
        state.engine.now(),
        state.engine.offset(),
    )
    .await?;
    summary
        .map(Json)
        .ok_or_else(|| AppError::NotReady("No operational snapshot has been received yet".into()))
}

/// GET /v1/snapshots?hours=N
///
/// Samples of the last `hours` hours (default 24, at most a week), oldest first.
pub async fn snapshot_history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> HandlerResult<HistoryResponse> {
    let hours = query.hours();
    if !HistoryQuery::HOURS_RANGE.contains(&hours) {
        return Err(AppError::BadRequest(format!(
            "hours must be between {} and {}, got {}",
            HistoryQuery::HOURS_RANGE.start(),
            HistoryQuery::HOURS_RANGE.end(),
            hours
        )));
    }

    let since = state.engine.now() - chrono::Duration::hours(hours as i64);
    let snapshots = state.repository.snapshots_since(since).await?;
    let total = snapshots.len();
    Ok(Json(HistoryResponse {
        hours,
        since,
        snapshots,
        total,
    }))
}

/// POST /v1/snapshots
///
/// Append one sample from the data producer.
pub async fn ingest_snapshot(
    State(state): State<AppState>,
    Json(snapshot): Json<OperationalSnapshot>,
) -> Result<(StatusCode, Json<IngestResponse>), AppError> {
    db_services::ingest_snapshot(state.repository.as_ref(), &snapshot).await?;
    Ok((
        StatusCode::CREATED,
        Json(IngestResponse {
            accepted: true,
            timestamp: snapshot.timestamp,
        }),
    ))
}

// =============================================================================
// Forecast
// =============================================================================

/// GET /v1/forecast/latest
pub async fn latest_forecast(State(state): State<AppState>) -> HandlerResult<ForecastRun> {
    state
        .engine
        .latest_forecast()
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("No forecast run has been stored yet".into()))
}

/// POST /v1/forecast?horizon=N
///
/// Generate a forecast now. A run that could not be stored is still
/// returned with `persisted: false`.
pub async fn run_forecast(
    State(state): State<AppState>,
    Query(query): Query<ForecastQuery>,
) -> HandlerResult<ForecastResponse> {
    let horizon = query.horizon.unwrap_or_else(|| state.engine.default_horizon());
    let outcome = state.engine.run_forecast(horizon).await?;

    if outcome.is_persisted() && state.runs.send(outcome.run.clone()).is_err() {
        log::debug!("No stream subscribers for run {}", outcome.run.generated_at);
    }

    Ok(Json(ForecastResponse::from(outcome)))
}

/// GET /v1/forecast/runs?limit=N
///
/// Generation timestamps of stored runs, newest first.
pub async fn list_forecast_runs(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> HandlerResult<ForecastRunsResponse> {
    let generations = state
        .repository
        .list_forecast_generations(query.limit())
        .await?;
    let total = generations.len();
    Ok(Json(ForecastRunsResponse { generations, total }))
}

/// GET /v1/forecast/stream
///
/// Push each new forecast run via Server-Sent Events. The latest stored run,
/// if any, is sent first.
pub async fn stream_forecasts(
    State(state): State<AppState>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let mut rx = state.runs.subscribe();
    let latest = state.engine.latest_forecast().await?;

    let stream = async_stream::stream! {
        if let Some(run) = latest {
            yield Ok(run_event(&run));
        }
        loop {
            match rx.recv().await {
                Ok(run) => yield Ok(run_event(&run)),
                Err(RecvError::Lagged(skipped)) => {
                    yield Ok(Event::default().event("lagged").data(skipped.to_string()));
                }
                Err(RecvError::Closed) => break,
            }
        }
    };

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    ))
}

fn run_event(run: &ForecastRun) -> Event {
    Event::default()
        .event("forecast")
        .id(run.generated_at.to_rfc3339())
        .data(serde_json::to_string(run).unwrap_or_default())
}

// =============================================================================
// Events and limits
// =============================================================================

/// GET /v1/events?limit=N
pub async fn recent_events(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> HandlerResult<EventsResponse> {
    let events = state.repository.recent_events(query.limit()).await?;
    let total = events.len();
    Ok(Json(EventsResponse { events, total }))
}

/// GET /v1/limits
pub async fn list_limits(State(state): State<AppState>) -> HandlerResult<LimitsResponse> {
    let limits = state.repository.list_limits().await?;
    Ok(Json(LimitsResponse { limits }))
}
