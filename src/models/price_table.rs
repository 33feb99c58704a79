use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;

use crate::models::PriceSeries;

pub type PriceRow = BTreeMap<String, f64>;

/// Date-indexed table of prices, one column per ticker.
///
/// A missing ticker/date pair is simply an absent key in that date's row.
/// Until the table has been cleaned, rows may be partial.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceTable {
    tickers: BTreeSet<String>,
    rows: BTreeMap<NaiveDate, PriceRow>,
}

impl PriceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Outer join of the given series on date. Empty series add no column.
    ///
    /// The result does not depend on the order the series arrive in.
    pub fn outer_join<I>(series: I) -> Self
    where
        I: IntoIterator<Item = PriceSeries>,
    {
        let mut table = Self::new();
        for s in series {
            table.join_series(&s);
        }
        table
    }

    pub fn join_series(&mut self, series: &PriceSeries) {
        if series.is_empty() {
            return;
        }
        for point in series.iter() {
            self.insert(point.date, series.ticker(), point.adj_close);
        }
    }

    pub fn insert(&mut self, date: NaiveDate, ticker: &str, price: f64) {
        if !self.tickers.contains(ticker) {
            self.tickers.insert(ticker.to_string());
        }
        self.rows
            .entry(date)
            .or_default()
            .insert(ticker.to_string(), price);
    }

    /// Declares a column without values. Used when rebuilding a table whose
    /// rows have all been dropped, so the column set survives.
    pub(crate) fn with_columns<I>(tickers: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        Self {
            tickers: tickers.into_iter().collect(),
            rows: BTreeMap::new(),
        }
    }

    pub(crate) fn push_row(&mut self, date: NaiveDate, row: PriceRow) {
        self.rows.insert(date, row);
    }

    pub fn tickers(&self) -> impl Iterator<Item = &str> {
        self.tickers.iter().map(String::as_str)
    }

    pub fn ticker_count(&self) -> usize {
        self.tickers.len()
    }

    pub fn has_ticker(&self, ticker: &str) -> bool {
        self.tickers.contains(ticker)
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.rows.keys().copied()
    }

    pub fn rows(&self) -> impl Iterator<Item = (NaiveDate, &PriceRow)> {
        self.rows.iter().map(|(d, r)| (*d, r))
    }

    pub fn get(&self, date: NaiveDate, ticker: &str) -> Option<f64> {
        self.rows.get(&date).and_then(|r| r.get(ticker)).copied()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.rows.keys().next().copied()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.rows.keys().next_back().copied()
    }

    pub fn first_row(&self) -> Option<&PriceRow> {
        self.rows.values().next()
    }

    pub fn last_row(&self) -> Option<&PriceRow> {
        self.rows.values().next_back()
    }

    /// True when every row holds a value for every column.
    pub fn is_complete(&self) -> bool {
        self.rows
            .values()
            .all(|row| self.tickers.iter().all(|t| row.contains_key(t)))
    }

    /// The known values of one column, ascending by date.
    pub fn column(&self, ticker: &str) -> Vec<(NaiveDate, f64)> {
        self.rows
            .iter()
            .filter_map(|(d, row)| row.get(ticker).map(|v| (*d, *v)))
            .collect()
    }
}

/// A cleaned table rebased so every column starts at the same baseline.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedTable {
    baseline: f64,
    table: PriceTable,
}

impl NormalizedTable {
    pub(crate) fn new(baseline: f64, table: PriceTable) -> Self {
        Self { baseline, table }
    }

    pub fn baseline(&self) -> f64 {
        self.baseline
    }

    pub fn table(&self) -> &PriceTable {
        &self.table
    }
}
