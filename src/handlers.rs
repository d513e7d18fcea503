use crate::config::Config;
use crate::coordinator::{Command, CommandOutcome, Coordinator};
use crate::errors::AppError;
use crate::statistics::StatisticsReport;
use crate::visualization::MarkerSet;
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;

/// Shared application state injected into handlers.
pub struct AppState {
    pub coordinator: Coordinator,
    pub config: Config,
}

/// Routes of the command API, without middleware.
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/v1/commands", post(post_command))
        .route("/api/v1/markers", get(get_markers))
        .route("/api/v1/statistics", get(get_statistics))
}

/// Health check endpoint.
pub async fn health(State(state): State<Arc<AppState>>) -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "predial-registry",
            "version": env!("CARGO_PKG_VERSION"),
            "registry": state.config.registry_base_url,
        })),
    )
}

/// POST /api/v1/commands
///
/// Runs one user command. Failures come back as `{"error": ...}` with a
/// 4xx/5xx status and leave the registry state as it was.
pub async fn post_command(
    State(state): State<Arc<AppState>>,
    Json(command): Json<Command>,
) -> Result<Json<CommandOutcome>, AppError> {
    tracing::info!("POST /api/v1/commands - {:?}", command);
    match state.coordinator.dispatch(command).await {
        Ok(outcome) => Ok(Json(outcome)),
        Err(e) => {
            tracing::warn!("Command failed: {}", e);
            Err(e)
        }
    }
}

/// GET /api/v1/markers
pub async fn get_markers(State(state): State<Arc<AppState>>) -> Json<MarkerSet> {
    Json(state.coordinator.current_markers().await)
}

/// GET /api/v1/statistics
pub async fn get_statistics(State(state): State<Arc<AppState>>) -> Json<StatisticsReport> {
    Json(state.coordinator.statistics().await)
}
