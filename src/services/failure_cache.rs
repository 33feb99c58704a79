use std::sync::Arc;
use chrono::{DateTime, Utc, Duration};
use dashmap::DashMap;

use crate::external::price_provider::PriceProviderError;
use crate::services::price_cache::FetchKey;

/// Information about a failed fetch for a ticker
#[derive(Debug, Clone)]
pub struct FailureInfo {
    pub failed_at: DateTime<Utc>,
    pub error_type: FailureType,
    pub reason: String,
    pub ttl: Duration,
}

impl FailureInfo {
    pub fn retry_after(&self) -> DateTime<Utc> {
        self.failed_at + self.ttl
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FailureType {
    NotFound,       // Symbol unknown to the provider
    RateLimited,    // Provider quota exhausted
    Transient,      // Network failure or timeout
    ApiError,       // Malformed or empty payloads, rejected credentials
}

impl FailureType {
    pub fn ttl(self) -> Duration {
        match self {
            FailureType::NotFound => Duration::hours(24),
            FailureType::RateLimited => Duration::hours(1),
            FailureType::Transient => Duration::minutes(15),
            FailureType::ApiError => Duration::hours(6),
        }
    }
}

impl From<&PriceProviderError> for FailureType {
    fn from(e: &PriceProviderError) -> Self {
        match e {
            PriceProviderError::NotFound => FailureType::NotFound,
            PriceProviderError::RateLimited => FailureType::RateLimited,
            PriceProviderError::Network(_) | PriceProviderError::Timeout(_) => FailureType::Transient,
            PriceProviderError::BadResponse(_) | PriceProviderError::Parse(_) => FailureType::ApiError,
        }
    }
}

/// Thread-safe record of fetches whose last attempt failed, keyed by the
/// same request signature as the price cache. A failure for one start date
/// never hides data for another.
#[derive(Clone, Default)]
pub struct FailureCache {
    cache: Arc<DashMap<FetchKey, FailureInfo>>,
}

impl FailureCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the recorded failure while it is still inside its window
    pub fn is_failed(&self, key: &FetchKey) -> Option<FailureInfo> {
        if let Some(entry) = self.cache.get(key) {
            let info = entry.value().clone();

            if Utc::now() < info.retry_after() {
                return Some(info);
            }

            drop(entry); // Release the read lock
            self.cache.remove(key);
        }
        None
    }

    pub fn record_failure(&self, key: &FetchKey, error_type: FailureType, reason: impl Into<String>) {
        self.record_with_ttl(key, error_type, reason, error_type.ttl());
    }

    pub(crate) fn record_with_ttl(
        &self,
        key: &FetchKey,
        error_type: FailureType,
        reason: impl Into<String>,
        ttl: Duration,
    ) {
        let info = FailureInfo {
            failed_at: Utc::now(),
            error_type,
            reason: reason.into(),
            ttl,
        };

        self.cache.insert(key.clone(), info);
    }

    /// Forget a failure after a successful fetch
    pub fn clear(&self, key: &FetchKey) {
        self.cache.remove(key);
    }

    pub fn cleanup_expired(&self) {
        let now = Utc::now();
        self.cache.retain(|_, info| now < info.retry_after());
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::price_provider::ApiCredential;
    use chrono::NaiveDate;

    fn key(ticker: &str, start: &str) -> FetchKey {
        FetchKey::new(
            ticker,
            &ApiCredential::new("test-key").unwrap(),
            NaiveDate::parse_from_str(start, "%Y-%m-%d").unwrap(),
        )
    }

    #[test]
    fn test_cache_records_and_retrieves_failures() {
        let cache = FailureCache::new();

        cache.record_failure(
            &key("INVALID", "2024-01-01"),
            FailureType::NotFound,
            "ticker not found",
        );

        let result = cache.is_failed(&key("INVALID", "2024-01-01"));
        assert!(result.is_some());
        let info = result.unwrap();
        assert_eq!(info.error_type, FailureType::NotFound);
        assert_eq!(info.reason, "ticker not found");
    }

    #[test]
    fn test_cache_clears_ticker() {
        let cache = FailureCache::new();

        cache.record_failure(&key("TEST", "2024-01-01"), FailureType::NotFound, "ticker not found");
        assert!(cache.is_failed(&key("TEST", "2024-01-01")).is_some());

        cache.clear(&key("TEST", "2024-01-01"));
        assert!(cache.is_failed(&key("TEST", "2024-01-01")).is_none());
    }

    #[test]
    fn test_different_ttls_for_error_types() {
        let cache = FailureCache::new();

        cache.record_failure(&key("NOT_FOUND", "2024-01-01"), FailureType::NotFound, "");
        cache.record_failure(&key("RATE_LIMITED", "2024-01-01"), FailureType::RateLimited, "");

        let not_found = cache.is_failed(&key("NOT_FOUND", "2024-01-01")).unwrap();
        let rate_limited = cache.is_failed(&key("RATE_LIMITED", "2024-01-01")).unwrap();

        assert_eq!(not_found.ttl, Duration::hours(24));
        assert_eq!(rate_limited.ttl, Duration::hours(1));
    }

    #[test]
    fn test_expired_failure_is_evicted_on_read() {
        let cache = FailureCache::new();

        let gtm = key("GTM", "2024-01-01");
        cache.record_with_ttl(&gtm, FailureType::ApiError, "no historical data", Duration::zero());

        assert!(cache.is_failed(&gtm).is_none());
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_failure_is_scoped_to_start_date() {
        let cache = FailureCache::new();

        cache.record_failure(&key("HIMS", "2024-06-01"), FailureType::ApiError, "no historical data");

        assert!(cache.is_failed(&key("HIMS", "2024-06-01")).is_some());
        assert!(cache.is_failed(&key("HIMS", "2024-01-01")).is_none());
    }

    #[test]
    fn test_provider_errors_map_to_failure_types() {
        assert_eq!(FailureType::from(&PriceProviderError::NotFound), FailureType::NotFound);
        assert_eq!(FailureType::from(&PriceProviderError::Timeout(15)), FailureType::Transient);
        assert_eq!(
            FailureType::from(&PriceProviderError::BadResponse("x".into())),
            FailureType::ApiError
        );
    }
}
