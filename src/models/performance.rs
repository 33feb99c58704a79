use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

/// Equal-weighted portfolio index values per date.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PerformanceTable {
    portfolios: Vec<String>,
    rows: BTreeMap<NaiveDate, BTreeMap<String, f64>>,
}

impl PerformanceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one portfolio's series. Insertion order is kept for display.
    pub fn insert_series<I>(&mut self, portfolio: &str, values: I)
    where
        I: IntoIterator<Item = (NaiveDate, f64)>,
    {
        if !self.portfolios.iter().any(|p| p == portfolio) {
            self.portfolios.push(portfolio.to_string());
        }
        for (date, value) in values {
            self.rows
                .entry(date)
                .or_default()
                .insert(portfolio.to_string(), value);
        }
    }

    pub fn portfolios(&self) -> &[String] {
        &self.portfolios
    }

    pub fn contains(&self, portfolio: &str) -> bool {
        self.portfolios.iter().any(|p| p == portfolio)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn get(&self, date: NaiveDate, portfolio: &str) -> Option<f64> {
        self.rows.get(&date).and_then(|r| r.get(portfolio)).copied()
    }

    pub fn series(&self, portfolio: &str) -> Vec<(NaiveDate, f64)> {
        self.rows
            .iter()
            .filter_map(|(d, r)| r.get(portfolio).map(|v| (*d, *v)))
            .collect()
    }

    pub fn to_points(&self) -> Vec<PerformancePoint> {
        self.rows
            .iter()
            .map(|(date, values)| PerformancePoint {
                date: *date,
                values: values.clone(),
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformancePoint {
    pub date: NaiveDate,
    pub values: BTreeMap<String, f64>,
}

/// Total return of one ticker over the observed window, in percent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReturnRecord {
    pub ticker: String,
    pub return_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioReturn {
    pub portfolio: String,
    pub total_return_pct: f64,
    pub benchmark: bool,
}

/// Conditions surfaced to the caller without failing the run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PipelineNotice {
    TickerDropped { ticker: String, reason: String },
    PortfolioOmitted { portfolio: String, missing_tickers: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportMeta {
    pub tickers_requested: usize,
    pub tickers_fetched: usize,
    pub points: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
}

/// Everything one pipeline run hands to the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceReport {
    pub start_date: NaiveDate,
    pub latest_date: Option<NaiveDate>,
    pub series: Vec<PerformancePoint>,
    pub stock_returns: BTreeMap<String, Vec<ReturnRecord>>,
    pub leaderboard: Vec<PortfolioReturn>,
    pub notices: Vec<PipelineNotice>,
    pub meta: ReportMeta,
}
