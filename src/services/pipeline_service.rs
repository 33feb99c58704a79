use chrono::{NaiveDate, Utc};
use tracing::{error, info};

use crate::errors::AppError;
use crate::external::price_provider::ApiCredential;
use crate::models::{PerformanceReport, Portfolio, ReportMeta};
use crate::services::aggregation_service::aggregate;
use crate::services::cleaning::clean;
use crate::services::fetch_service::PriceFetcher;
use crate::services::normalization::normalize;
use crate::services::ranking::{rank_portfolios, rank_returns};
use crate::services::rollup::roll_up;

/// One full refresh: fetch, align, clean, rebase, roll up and rank.
///
/// Holds no state of its own; the only thing shared between runs is the
/// fetcher's cache.
pub async fn run_pipeline(
    fetcher: &PriceFetcher,
    credential: Option<&ApiCredential>,
    portfolios: &[Portfolio],
    start_date: NaiveDate,
) -> Result<PerformanceReport, AppError> {
    let credential = credential.ok_or_else(|| {
        error!("Pipeline run refused: no API credential configured");
        AppError::Config(format!(
            "no API key configured for price provider {}",
            fetcher.provider_name()
        ))
    })?;

    validate_start_date(start_date, Utc::now().date_naive())?;

    if portfolios.is_empty() {
        return Err(AppError::Config("no portfolios configured".into()));
    }

    info!("🚀 Pipeline run for {} portfolios since {}", portfolios.len(), start_date);

    let aggregation = aggregate(fetcher, credential, portfolios, start_date).await;
    let raw = aggregation.table;
    if raw.is_empty() {
        error!("No ticker returned data since {}", start_date);
        return Err(AppError::NoData(format!(
            "the price API returned no data for any ticker since {}",
            start_date
        )));
    }

    // The joined table only holds columns with data, so forward-fill always
    // completes its last row. This stays as a guard for tables from elsewhere.
    let cleaned = clean(&raw);
    if cleaned.is_empty() {
        error!("No overlapping trading dates since {}", start_date);
        return Err(AppError::InsufficientData(format!(
            "not enough overlapping data since {}; try an earlier start date",
            start_date
        )));
    }

    let normalized = normalize(&cleaned)?;
    let rolled = roll_up(&normalized, portfolios);
    let stock_returns = rank_returns(&cleaned, portfolios);
    let leaderboard = rank_portfolios(&rolled.performance, portfolios);

    let mut notices = aggregation.dropped;
    notices.extend(rolled.omitted);

    let meta = ReportMeta {
        tickers_requested: aggregation.tickers_requested,
        tickers_fetched: raw.ticker_count(),
        points: rolled.performance.len(),
        first_date: cleaned.first_date(),
        last_date: cleaned.last_date(),
    };

    info!(
        "✅ Pipeline run done: {}/{} tickers, {} points, {} notices",
        meta.tickers_fetched,
        meta.tickers_requested,
        meta.points,
        notices.len()
    );

    Ok(PerformanceReport {
        start_date,
        latest_date: raw.last_date(),
        series: rolled.performance.to_points(),
        stock_returns,
        leaderboard,
        notices,
        meta,
    })
}

/// The start date must lie strictly before `today`.
pub fn validate_start_date(start_date: NaiveDate, today: NaiveDate) -> Result<(), AppError> {
    if start_date >= today {
        return Err(AppError::Validation(format!(
            "start date {} must be before today ({})",
            start_date, today
        )));
    }
    Ok(())
}

pub fn parse_start_date(raw: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| AppError::Validation(format!("invalid start date {:?}, expected YYYY-MM-DD", raw)))
}
