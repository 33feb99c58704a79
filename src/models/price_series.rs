use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::models::PricePoint;

/// Adjusted closes for a single ticker, unique dates in ascending order.
///
/// An empty series is how a failed fetch shows up downstream; the
/// aggregator skips it rather than adding an empty column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceSeries {
    ticker: String,
    points: BTreeMap<NaiveDate, f64>,
}

impl PriceSeries {
    pub fn empty(ticker: impl Into<String>) -> Self {
        Self {
            ticker: ticker.into(),
            points: BTreeMap::new(),
        }
    }

    /// Builds a series from points in any order. A repeated date keeps the
    /// last value seen.
    pub fn from_points<I>(ticker: impl Into<String>, points: I) -> Self
    where
        I: IntoIterator<Item = PricePoint>,
    {
        Self {
            ticker: ticker.into(),
            points: points.into_iter().map(|p| (p.date, p.adj_close)).collect(),
        }
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn first(&self) -> Option<PricePoint> {
        self.points
            .first_key_value()
            .map(|(d, v)| PricePoint::new(*d, *v))
    }

    pub fn last(&self) -> Option<PricePoint> {
        self.points
            .last_key_value()
            .map(|(d, v)| PricePoint::new(*d, *v))
    }

    pub fn iter(&self) -> impl Iterator<Item = PricePoint> + '_ {
        self.points.iter().map(|(d, v)| PricePoint::new(*d, *v))
    }
}
