use axum::extract::State;
use axum::{Json, Router};
use axum::routing::get;
use serde::Serialize;
use tracing::info;

use crate::config::PortfolioDefinition;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_portfolios))
}

#[derive(Debug, Serialize)]
pub struct PortfolioView {
    pub name: String,
    pub tickers: Vec<String>,
    pub benchmark: bool,
    pub color: Option<String>,
}

fn view(state: &AppState, definition: &PortfolioDefinition) -> PortfolioView {
    // tickers as the pipeline sees them: normalized and deduplicated
    let tickers = state
        .config
        .portfolios
        .iter()
        .find(|p| p.name == definition.name.trim())
        .map(|p| p.tickers.iter().cloned().collect())
        .unwrap_or_default();

    PortfolioView {
        name: definition.name.trim().to_string(),
        tickers,
        benchmark: definition.benchmark,
        color: definition.color.clone(),
    }
}

pub async fn list_portfolios(State(state): State<AppState>) -> Json<Vec<PortfolioView>> {
    info!("GET /portfolios - Listing configured portfolios");
    let views = state
        .config
        .definitions
        .iter()
        .map(|d| view(&state, d))
        .collect();
    Json(views)
}
