use std::collections::HashSet;
use std::net::SocketAddr;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::external::alphavantage::ALPHAVANTAGE_BASE_URL;
use crate::external::fmp::FMP_BASE_URL;
use crate::external::price_provider::ApiCredential;
use crate::models::Portfolio;
use crate::services::pipeline_service::parse_start_date;

pub const DEFAULT_START_DATE: &str = "2024-01-01";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Fmp,
    AlphaVantage,
}

impl ProviderKind {
    pub fn credential_var(self) -> &'static str {
        match self {
            ProviderKind::Fmp => "FMP_API_KEY",
            ProviderKind::AlphaVantage => "ALPHAVANTAGE_API_KEY",
        }
    }

    pub fn default_base_url(self) -> &'static str {
        match self {
            ProviderKind::Fmp => FMP_BASE_URL,
            ProviderKind::AlphaVantage => ALPHAVANTAGE_BASE_URL,
        }
    }
}

impl FromStr for ProviderKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fmp" | "financialmodelingprep" => Ok(ProviderKind::Fmp),
            "alphavantage" => Ok(ProviderKind::AlphaVantage),
            other => Err(AppError::Config(format!(
                "invalid PRICE_PROVIDER: {}. Must be 'fmp' or 'alphavantage'",
                other
            ))),
        }
    }
}

/// One portfolio as written in the definitions file. `color` is only for
/// the UI and never reaches the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioDefinition {
    pub name: String,
    pub tickers: Vec<String>,
    #[serde(default)]
    pub benchmark: bool,
    #[serde(default)]
    pub color: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PortfolioFile {
    portfolios: Vec<PortfolioDefinition>,
}

fn def(name: &str, tickers: &[&str], benchmark: bool, color: &str) -> PortfolioDefinition {
    PortfolioDefinition {
        name: name.to_string(),
        tickers: tickers.iter().map(|t| t.to_string()).collect(),
        benchmark,
        color: Some(color.to_string()),
    }
}

pub fn default_definitions() -> Vec<PortfolioDefinition> {
    vec![
        def(
            "ChatGPT",
            &["MSFT", "NVDA", "GOOGL", "AMZN", "META", "AAPL", "TSLA", "INTC", "PYPL", "EXC"],
            false,
            "mediumseagreen",
        ),
        def(
            "Gemini",
            &["VRT", "FIX", "CIEN", "APP", "PLTR", "CRWD", "SHOP", "DASH", "UBER", "HIMS"],
            false,
            "#00CCFF",
        ),
        def(
            "Fenrir",
            &["DBX", "MTCH", "GFS", "MRNA", "PEGA", "AMKR", "GTM", "BBWI", "SMCI", "ALGM"],
            false,
            "#EC5C73",
        ),
        def("Benchmark", &["SPY"], true, "gray"),
    ]
}

/// Validates definitions and turns them into pipeline portfolios.
pub fn build_portfolios(definitions: &[PortfolioDefinition]) -> Result<Vec<Portfolio>, AppError> {
    let mut seen = HashSet::new();
    definitions
        .iter()
        .map(|d| {
            let portfolio = Portfolio::build(&d.name, &d.tickers, d.benchmark)?;
            if !seen.insert(portfolio.name.clone()) {
                return Err(AppError::Config(format!("duplicate portfolio name {}", portfolio.name)));
            }
            Ok(portfolio)
        })
        .collect()
}

pub fn parse_definitions(json: &str) -> Result<Vec<PortfolioDefinition>, AppError> {
    serde_json::from_str::<PortfolioFile>(json)
        .map(|f| f.portfolios)
        .map_err(|e| AppError::Config(format!("invalid portfolio definitions: {}", e)))
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub provider: ProviderKind,
    pub provider_base_url: String,
    pub credential: Option<ApiCredential>,
    pub default_start_date: NaiveDate,
    pub definitions: Vec<PortfolioDefinition>,
    pub portfolios: Vec<Portfolio>,
    pub cache_ttl_hours: i64,
    pub fetch_timeout_secs: u64,
    pub max_concurrent_fetches: usize,
    pub requests_per_minute: u32,
    pub bind_addr: SocketAddr,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup. A missing API key is not an
    /// error here; runs report it instead.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let provider = match lookup("PRICE_PROVIDER") {
            Some(v) => v.parse::<ProviderKind>()?,
            None => ProviderKind::Fmp,
        };

        let provider_base_url = lookup("PRICE_PROVIDER_BASE_URL")
            .unwrap_or_else(|| provider.default_base_url().to_string());

        let credential = lookup(provider.credential_var()).and_then(ApiCredential::new);

        let default_start_date = parse_start_date(
            &lookup("START_DATE").unwrap_or_else(|| DEFAULT_START_DATE.to_string()),
        )
        .map_err(|e| AppError::Config(format!("START_DATE: {}", e)))?;

        let definitions = match lookup("PORTFOLIOS_PATH") {
            Some(path) => {
                let raw = std::fs::read_to_string(&path)
                    .map_err(|e| AppError::Config(format!("cannot read {}: {}", path, e)))?;
                parse_definitions(&raw)?
            }
            None => default_definitions(),
        };
        let portfolios = build_portfolios(&definitions).map_err(|e| match e {
            AppError::Validation(msg) => AppError::Config(msg),
            other => other,
        })?;

        Ok(Self {
            provider,
            provider_base_url,
            credential,
            default_start_date,
            definitions,
            portfolios,
            cache_ttl_hours: parse_or(&lookup, "CACHE_TTL_HOURS", 24)?,
            fetch_timeout_secs: parse_or(&lookup, "FETCH_TIMEOUT_SECS", 15)?,
            max_concurrent_fetches: parse_or(&lookup, "MAX_CONCURRENT_FETCHES", 4)?,
            requests_per_minute: parse_or(&lookup, "REQUESTS_PER_MINUTE", 300)?,
            bind_addr: parse_or(&lookup, "BIND_ADDR", SocketAddr::from(([0, 0, 0, 0], 3000)))?,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, AppError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| AppError::Config(format!("{}={:?}: {}", key, raw, e))),
        None => Ok(default),
    }
}
