use chrono::NaiveDate;
use futures::future::join_all;
use tracing::info;

use crate::external::price_provider::ApiCredential;
use crate::models::portfolio::unique_tickers;
use crate::models::{PipelineNotice, Portfolio, PriceTable};
use crate::services::fetch_service::PriceFetcher;

#[derive(Debug, Clone, PartialEq)]
pub struct Aggregation {
    pub table: PriceTable,
    pub tickers_requested: usize,
    pub dropped: Vec<PipelineNotice>,
}

/// Fetches every distinct ticker across `portfolios` concurrently and
/// outer-joins the non-empty series on date.
///
/// A failed ticker is absent from the table and listed in `dropped`; it
/// never aborts the others. Concurrency is bounded by the fetcher's rate
/// limiter.
pub async fn aggregate(
    fetcher: &PriceFetcher,
    credential: &ApiCredential,
    portfolios: &[Portfolio],
    start_date: NaiveDate,
) -> Aggregation {
    let tickers = unique_tickers(portfolios);
    info!("Fetching {} tickers since {} via {}", tickers.len(), start_date, fetcher.provider_name());

    let fetches = tickers
        .iter()
        .map(|ticker| async move { (ticker, fetcher.fetch(ticker, credential, start_date).await) });
    let outcomes = join_all(fetches).await;

    let mut table = PriceTable::new();
    let mut dropped = Vec::new();
    for (ticker, outcome) in outcomes {
        if outcome.is_empty() {
            dropped.push(PipelineNotice::TickerDropped {
                ticker: ticker.clone(),
                reason: outcome.failure.unwrap_or_else(|| "no data".to_string()),
            });
        } else {
            table.join_series(&outcome.series);
        }
    }

    info!(
        "Aggregated {}/{} tickers over {} dates",
        table.ticker_count(),
        tickers.len(),
        table.len()
    );

    Aggregation {
        table,
        tickers_requested: tickers.len(),
        dropped,
    }
}
