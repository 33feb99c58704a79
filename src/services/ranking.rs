use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::models::{PerformanceTable, Portfolio, PortfolioReturn, PriceTable, ReturnRecord};

/// `(last - first) / first * 100`, or `None` without a usable first value.
pub fn total_return_pct(first: f64, last: f64) -> Option<f64> {
    if first == 0.0 || !first.is_finite() || !last.is_finite() {
        return None;
    }
    Some((last - first) / first * 100.0)
}

/// Total return of one ticker between the table's first and last rows.
pub fn ticker_return(table: &PriceTable, ticker: &str) -> Option<f64> {
    let first = table.first_row()?.get(ticker)?;
    let last = table.last_row()?.get(ticker)?;
    total_return_pct(*first, *last)
}

/// Descending by value, ties by name so output is reproducible.
fn by_return_desc(a: (f64, &str), b: (f64, &str)) -> Ordering {
    b.0.partial_cmp(&a.0)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.1.cmp(b.1))
}

/// Per-portfolio ticker returns from the cleaned table, best first.
///
/// Benchmarks are skipped. Tickers missing from the table are skipped; a
/// portfolio with none left maps to an empty list.
pub fn rank_returns(
    table: &PriceTable,
    portfolios: &[Portfolio],
) -> BTreeMap<String, Vec<ReturnRecord>> {
    portfolios
        .iter()
        .filter(|p| !p.is_benchmark())
        .map(|p| {
            let mut records: Vec<ReturnRecord> = p
                .tickers
                .iter()
                .filter_map(|t| {
                    ticker_return(table, t).map(|r| ReturnRecord {
                        ticker: t.clone(),
                        return_pct: r,
                    })
                })
                .collect();
            records.sort_by(|a, b| {
                by_return_desc(
                    (a.return_pct, a.ticker.as_str()),
                    (b.return_pct, b.ticker.as_str()),
                )
            });
            (p.name.clone(), records)
        })
        .collect()
}

/// Leaderboard of portfolio total returns, benchmarks included.
pub fn rank_portfolios(
    performance: &PerformanceTable,
    portfolios: &[Portfolio],
) -> Vec<PortfolioReturn> {
    let mut ranked: Vec<PortfolioReturn> = performance
        .portfolios()
        .iter()
        .filter_map(|name| {
            let series = performance.series(name);
            let (_, first) = series.first()?;
            let (_, last) = series.last()?;
            let total = total_return_pct(*first, *last)?;
            let benchmark = portfolios
                .iter()
                .any(|p| &p.name == name && p.is_benchmark());
            Some(PortfolioReturn {
                portfolio: name.clone(),
                total_return_pct: total,
                benchmark,
            })
        })
        .collect();

    ranked.sort_by(|a, b| {
        by_return_desc(
            (a.total_return_pct, a.portfolio.as_str()),
            (b.total_return_pct, b.portfolio.as_str()),
        )
    });
    ranked
}
