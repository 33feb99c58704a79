use axum::extract::{Query, State};
use axum::{Json, Router};
use axum::routing::get;
use serde::Deserialize;
use tracing::{error, info, warn};

use crate::errors::AppError;
use crate::models::PerformanceReport;
use crate::services;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_performance))
}

#[derive(Debug, Deserialize)]
pub struct PerformanceQuery {
    start: Option<String>,
}

pub async fn get_performance(
    Query(params): Query<PerformanceQuery>,
    State(state): State<AppState>,
) -> Result<Json<PerformanceReport>, AppError> {
    let start_date = match params.start.as_deref() {
        Some(raw) => services::pipeline_service::parse_start_date(raw)?,
        None => state.config.default_start_date,
    };
    info!("GET /performance?start={} - Running pipeline", start_date);

    services::pipeline_service::run_pipeline(
        &state.fetcher,
        state.config.credential.as_ref(),
        &state.config.portfolios,
        start_date,
    )
    .await
    .map(Json)
    .map_err(|e| {
        match &e {
            AppError::Validation(_) | AppError::InsufficientData(_) => {
                warn!("Performance request for {} rejected: {}", start_date, e)
            }
            _ => error!("Performance request for {} failed: {}", start_date, e),
        }
        e
    })
}
