use std::fmt;

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct ExternalPricePoint {
    pub date: NaiveDate,
    pub adj_close: f64,
}

/// Opaque API key for a price provider. Never printed.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ApiCredential(String);

impl ApiCredential {
    pub fn new(key: impl Into<String>) -> Option<Self> {
        let key = key.into();
        let trimmed = key.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    /// Reads the key from `var`. Unset or blank both count as absent.
    pub fn from_env(var: &str) -> Option<Self> {
        std::env::var(var).ok().and_then(Self::new)
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiCredential(***)")
    }
}

#[derive(Debug, Error)]
pub enum PriceProviderError {
    #[error("network error: {0}")]
    Network(String),

    #[error("bad response: {0}")]
    BadResponse(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("rate limited")]
    RateLimited,

    #[error("ticker not found")]
    NotFound,

    #[error("timed out after {0}ms")]
    Timeout(u64),
}

#[async_trait]
pub trait PriceProvider: Send + Sync {
    /// Daily adjusted closes for `ticker` from `from` onward, oldest first.
    async fn fetch_daily_history(
        &self,
        ticker: &str,
        credential: &ApiCredential,
        from: NaiveDate,
    ) -> Result<Vec<ExternalPricePoint>, PriceProviderError>;

    fn name(&self) -> &'static str;
}

/// Drops unusable closes and dates before `from`, then sorts ascending with
/// one point per date.
pub(crate) fn tidy_points(
    mut points: Vec<ExternalPricePoint>,
    from: NaiveDate,
) -> Vec<ExternalPricePoint> {
    points.retain(|p| p.date >= from && p.adj_close.is_finite() && p.adj_close > 0.0);
    points.sort_by_key(|p| p.date);
    // keep the last occurrence of a repeated date
    let mut out: Vec<ExternalPricePoint> = Vec::with_capacity(points.len());
    for p in points {
        match out.last_mut() {
            Some(prev) if prev.date == p.date => *prev = p,
            _ => out.push(p),
        }
    }
    out
}
