use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::time::{interval, Duration};

use portfolio_battle_backend::app;
use portfolio_battle_backend::config::{AppConfig, ProviderKind};
use portfolio_battle_backend::external::alphavantage::AlphaVantageProvider;
use portfolio_battle_backend::external::fmp::FmpProvider;
use portfolio_battle_backend::external::price_provider::PriceProvider;
use portfolio_battle_backend::logging::{init_logging, LoggingConfig};
use portfolio_battle_backend::services::failure_cache::FailureCache;
use portfolio_battle_backend::services::fetch_service::PriceFetcher;
use portfolio_battle_backend::services::price_cache::PriceCache;
use portfolio_battle_backend::services::rate_limiter::RateLimiter;
use portfolio_battle_backend::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging FIRST
    let logging = LoggingConfig::from_env().context("invalid logging configuration")?;
    init_logging(&logging).context("failed to initialize logging")?;

    let config = AppConfig::from_env().context("invalid configuration")?;

    if config.credential.is_none() {
        tracing::error!(
            "{} is not set; performance requests will fail until it is configured",
            config.provider.credential_var()
        );
    }

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.fetch_timeout_secs))
        .build()
        .context("failed to build HTTP client")?;

    let provider: Arc<dyn PriceProvider> = match config.provider {
        ProviderKind::Fmp => {
            tracing::info!("📊 Using price provider: Financial Modeling Prep");
            Arc::new(FmpProvider::new(client, config.provider_base_url.clone()))
        }
        ProviderKind::AlphaVantage => {
            tracing::info!("📊 Using price provider: Alpha Vantage");
            Arc::new(AlphaVantageProvider::new(client, config.provider_base_url.clone()))
        }
    };

    let price_cache = PriceCache::new(chrono::Duration::hours(config.cache_ttl_hours));
    let failure_cache = FailureCache::new();
    let fetcher = PriceFetcher::new(
        provider,
        price_cache.clone(),
        failure_cache.clone(),
        Arc::new(RateLimiter::new(config.max_concurrent_fetches, config.requests_per_minute)),
        Duration::from_secs(config.fetch_timeout_secs),
    );

    // Expired entries are also dropped on read; this just bounds memory.
    tokio::spawn(async move {
        let mut ticker = interval(Duration::from_secs(3600));
        loop {
            ticker.tick().await;
            price_cache.cleanup_expired();
            failure_cache.cleanup_expired();
            tracing::debug!(
                "Cache sweep: {} series, {} failed tickers",
                price_cache.len(),
                failure_cache.len()
            );
        }
    });

    let addr = config.bind_addr;
    let state = AppState {
        config: Arc::new(config),
        fetcher,
    };
    let app = app::create_app(state);

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    tracing::info!("🚀 Portfolio battle backend running at http://{}/", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
