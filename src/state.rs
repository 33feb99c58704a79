use std::sync::Arc;
use crate::config::AppConfig;
use crate::services::fetch_service::PriceFetcher;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub fetcher: PriceFetcher,
}
