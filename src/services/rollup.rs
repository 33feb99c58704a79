use tracing::warn;

use crate::models::{NormalizedTable, PerformanceTable, PipelineNotice, Portfolio, Weighting};

#[derive(Debug, Clone, PartialEq)]
pub struct RollUp {
    pub performance: PerformanceTable,
    /// Portfolios left out because none of their tickers has data.
    pub omitted: Vec<PipelineNotice>,
}

/// Equal-weighted index per portfolio: for each date, the mean of the
/// normalized prices of the portfolio's tickers that made it into the table.
///
/// Missing tickers shrink the portfolio. A portfolio with no surviving
/// tickers is left out of the table and reported in `omitted`.
pub fn roll_up(normalized: &NormalizedTable, portfolios: &[Portfolio]) -> RollUp {
    let table = normalized.table();
    let mut performance = PerformanceTable::new();
    let mut omitted = Vec::new();

    for portfolio in portfolios {
        let valid: Vec<&str> = portfolio
            .tickers
            .iter()
            .map(String::as_str)
            .filter(|t| table.has_ticker(t))
            .collect();

        if valid.is_empty() {
            warn!("Portfolio {} has no tickers with data, omitting it", portfolio.name);
            omitted.push(PipelineNotice::PortfolioOmitted {
                portfolio: portfolio.name.clone(),
                missing_tickers: portfolio.tickers.iter().cloned().collect(),
            });
            continue;
        }

        if valid.len() < portfolio.tickers.len() {
            warn!(
                "Portfolio {} rolled up from {}/{} tickers",
                portfolio.name,
                valid.len(),
                portfolio.tickers.len()
            );
        }

        let series = table.rows().filter_map(|(date, row)| {
            let values: Vec<f64> = valid.iter().filter_map(|t| row.get(*t).copied()).collect();
            weighted_value(portfolio.weighting, &values).map(|v| (date, v))
        });
        performance.insert_series(&portfolio.name, series);
    }

    RollUp { performance, omitted }
}

fn weighted_value(weighting: Weighting, values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    match weighting {
        Weighting::Equal => Some(values.iter().sum::<f64>() / values.len() as f64),
    }
}
