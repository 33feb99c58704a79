use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::errors::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Weighting {
    #[default]
    Equal,
}

/// A named set of tickers. Duplicates and order carry no meaning.
///
/// A benchmark portfolio holds exactly one ticker; it shows up on the
/// leaderboard but not in the per-stock breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Portfolio {
    pub name: String,
    pub tickers: BTreeSet<String>,
    pub weighting: Weighting,
    pub benchmark: bool,
}

impl Portfolio {
    pub fn new<I, S>(name: &str, tickers: I) -> Result<Self, AppError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::build(name, tickers, false)
    }

    pub fn benchmark(name: &str, ticker: &str) -> Result<Self, AppError> {
        Self::build(name, [ticker], true)
    }

    pub fn build<I, S>(name: &str, tickers: I, benchmark: bool) -> Result<Self, AppError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::Validation("portfolio name must not be empty".into()));
        }

        let mut set = BTreeSet::new();
        for raw in tickers {
            let ticker = normalize_ticker(raw.as_ref()).ok_or_else(|| {
                AppError::Validation(format!("portfolio {} contains an empty ticker", name))
            })?;
            set.insert(ticker);
        }

        if set.is_empty() {
            return Err(AppError::Validation(format!("portfolio {} has no tickers", name)));
        }
        if benchmark && set.len() != 1 {
            return Err(AppError::Validation(format!(
                "benchmark portfolio {} must hold exactly one ticker, found {}",
                name,
                set.len()
            )));
        }

        Ok(Self {
            name: name.to_string(),
            tickers: set,
            weighting: Weighting::Equal,
            benchmark,
        })
    }

    pub fn is_benchmark(&self) -> bool {
        self.benchmark
    }
}

/// Trims and upper-cases a symbol. Returns `None` for blank input.
pub fn normalize_ticker(raw: &str) -> Option<String> {
    let t = raw.trim();
    if t.is_empty() {
        None
    } else {
        Some(t.to_uppercase())
    }
}

/// Every ticker referenced by any portfolio, each once.
pub fn unique_tickers(portfolios: &[Portfolio]) -> BTreeSet<String> {
    portfolios
        .iter()
        .flat_map(|p| p.tickers.iter().cloned())
        .collect()
}
