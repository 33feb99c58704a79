use std::sync::Arc;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use dashmap::DashMap;

use crate::external::price_provider::ApiCredential;
use crate::models::PriceSeries;

/// Request signature a cached series was fetched under.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FetchKey {
    pub ticker: String,
    pub credential: ApiCredential,
    pub start_date: NaiveDate,
}

impl FetchKey {
    pub fn new(ticker: &str, credential: &ApiCredential, start_date: NaiveDate) -> Self {
        Self {
            ticker: ticker.to_string(),
            credential: credential.clone(),
            start_date,
        }
    }
}

#[derive(Debug, Clone)]
struct CachedSeries {
    series: Arc<PriceSeries>,
    inserted_at: DateTime<Utc>,
}

/// TTL cache of fetched price series, shared by all pipeline runs.
///
/// Entries are whole series inserted in one step, so readers never see a
/// partial value. Eviction only happens by age.
#[derive(Clone)]
pub struct PriceCache {
    entries: Arc<DashMap<FetchKey, CachedSeries>>,
    ttl: Duration,
}

impl PriceCache {
    pub const DEFAULT_TTL_HOURS: i64 = 24;

    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the cached series if it is younger than the TTL. Stale
    /// entries are dropped on the way out.
    pub fn get(&self, key: &FetchKey) -> Option<Arc<PriceSeries>> {
        if let Some(entry) = self.entries.get(key) {
            if Utc::now() < entry.inserted_at + self.ttl {
                return Some(entry.series.clone());
            }

            drop(entry); // Release the read lock
            self.entries.remove(key);
        }
        None
    }

    pub fn insert(&self, key: FetchKey, series: PriceSeries) -> Arc<PriceSeries> {
        let series = Arc::new(series);
        self.entries.insert(
            key,
            CachedSeries {
                series: series.clone(),
                inserted_at: Utc::now(),
            },
        );
        series
    }

    pub fn cleanup_expired(&self) {
        let now = Utc::now();
        let ttl = self.ttl;
        self.entries.retain(|_, entry| now < entry.inserted_at + ttl);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for PriceCache {
    fn default() -> Self {
        Self::new(Duration::hours(Self::DEFAULT_TTL_HOURS))
    }
}
