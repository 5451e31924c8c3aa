//! Application state for the HTTP server.

use std::sync::Arc;

use tokio::sync::broadcast;

use crate::db::FullRepository;
use crate::models::ForecastRun;
use crate::services::ForecastEngine;

/// Runs buffered per SSE subscriber before it starts lagging.
pub const RUN_CHANNEL_CAPACITY: usize = 16;

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub repository: Arc<dyn FullRepository>,
    pub engine: ForecastEngine,
    /// Completed runs, from the scheduler and from on-demand requests
    pub runs: broadcast::Sender<ForecastRun>,
}

impl AppState {
    pub fn new(engine: ForecastEngine, runs: broadcast::Sender<ForecastRun>) -> Self {
        Self {
            repository: engine.repository().clone(),
            engine,
            runs,
        }
    }
}
