use std::sync::Arc;

use chrono::NaiveDate;
use tokio::time::{timeout, Duration};
use tracing::{debug, info, warn};

use crate::external::price_provider::{ApiCredential, PriceProvider, PriceProviderError};
use crate::models::{PricePoint, PriceSeries};
use crate::services::failure_cache::{FailureCache, FailureType};
use crate::services::price_cache::{FetchKey, PriceCache};
use crate::services::rate_limiter::RateLimiter;

/// Result of fetching one ticker. A failure carries an empty series plus
/// the reason, so the caller can drop the ticker and keep going.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub series: Arc<PriceSeries>,
    pub failure: Option<String>,
    pub from_cache: bool,
}

impl FetchOutcome {
    fn failed(ticker: &str, reason: String) -> Self {
        Self {
            series: Arc::new(PriceSeries::empty(ticker)),
            failure: Some(reason),
            from_cache: false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

/// Provider access for pipeline runs: TTL cache in front, failure cache and
/// rate limiter around each network call.
#[derive(Clone)]
pub struct PriceFetcher {
    provider: Arc<dyn PriceProvider>,
    price_cache: PriceCache,
    failure_cache: FailureCache,
    rate_limiter: Arc<RateLimiter>,
    request_timeout: Duration,
}

impl PriceFetcher {
    pub fn new(
        provider: Arc<dyn PriceProvider>,
        price_cache: PriceCache,
        failure_cache: FailureCache,
        rate_limiter: Arc<RateLimiter>,
        request_timeout: Duration,
    ) -> Self {
        Self {
            provider,
            price_cache,
            failure_cache,
            rate_limiter,
            request_timeout,
        }
    }

    pub fn price_cache(&self) -> &PriceCache {
        &self.price_cache
    }

    pub fn failure_cache(&self) -> &FailureCache {
        &self.failure_cache
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    /// Fetches one ticker's adjusted closes from `start_date`.
    ///
    /// Never fails: any provider error, timeout or known-bad ticker turns
    /// into an empty outcome with a logged warning. No retries.
    pub async fn fetch(
        &self,
        ticker: &str,
        credential: &ApiCredential,
        start_date: NaiveDate,
    ) -> FetchOutcome {
        let key = FetchKey::new(ticker, credential, start_date);

        if let Some(series) = self.price_cache.get(&key) {
            debug!("Cache hit for {} since {}", ticker, start_date);
            return FetchOutcome {
                series,
                failure: None,
                from_cache: true,
            };
        }

        if let Some(failure) = self.failure_cache.is_failed(&key) {
            info!(
                "⚠️ Skipping API call for {} since {} - request is in failure cache ({:?}). Will retry after {}",
                ticker,
                start_date,
                failure.error_type,
                failure.retry_after()
            );
            return FetchOutcome::failed(ticker, failure.reason);
        }

        match self.fetch_from_provider(ticker, credential, start_date).await {
            Ok(series) => {
                self.failure_cache.clear(&key);
                info!("✓ Fetched {} points for {} from {}", series.len(), ticker, self.provider.name());
                FetchOutcome {
                    series: self.price_cache.insert(key, series),
                    failure: None,
                    from_cache: false,
                }
            }
            Err(e) => {
                warn!("✗ Failed to fetch price data for {}: {}", ticker, e);
                self.failure_cache
                    .record_failure(&key, FailureType::from(&e), e.to_string());
                FetchOutcome::failed(ticker, e.to_string())
            }
        }
    }

    async fn fetch_from_provider(
        &self,
        ticker: &str,
        credential: &ApiCredential,
        start_date: NaiveDate,
    ) -> Result<PriceSeries, PriceProviderError> {
        let _guard = self
            .rate_limiter
            .acquire()
            .await
            .map_err(|e| PriceProviderError::Network(format!("rate limiter closed: {}", e)))?;

        let points = timeout(
            self.request_timeout,
            self.provider.fetch_daily_history(ticker, credential, start_date),
        )
        .await
        .map_err(|_| PriceProviderError::Timeout(self.request_timeout.as_millis() as u64))??;

        if points.is_empty() {
            return Err(PriceProviderError::BadResponse("no historical data".into()));
        }

        Ok(PriceSeries::from_points(
            ticker,
            points
                .into_iter()
                .map(|p| PricePoint::new(p.date, p.adj_close)),
        ))
    }
}
