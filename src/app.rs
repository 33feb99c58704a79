use axum::Router;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

use crate::routes::{health, performance, portfolios};
use crate::state::AppState;

pub fn create_app(state: AppState) -> Router {
    Router::<AppState>::new()
        .nest("/health", health::router())
        .nest("/api/portfolios", portfolios::router())
        .nest("/api/performance", performance::router())
        // the dashboard is served from its own origin
        .layer(ServiceBuilder::new().layer(CorsLayer::permissive()))
        .with_state(state)
}
