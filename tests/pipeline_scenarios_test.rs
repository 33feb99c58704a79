/// Pipeline scenarios
///
/// End-to-end runs of fetch → aggregate → clean → normalize → roll up → rank
/// against an in-memory price provider, plus the HTTP boundary that hands
/// the report to the dashboard.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use chrono::NaiveDate;
use tokio::time::Duration;
use tower::ServiceExt;

use portfolio_battle_backend::app::create_app;
use portfolio_battle_backend::config::AppConfig;
use portfolio_battle_backend::errors::AppError;
use portfolio_battle_backend::external::price_provider::{
    ApiCredential, ExternalPricePoint, PriceProvider, PriceProviderError,
};
use portfolio_battle_backend::models::{PipelineNotice, Portfolio, PriceTable};
use portfolio_battle_backend::services::cleaning::clean;
use portfolio_battle_backend::services::failure_cache::FailureCache;
use portfolio_battle_backend::services::fetch_service::PriceFetcher;
use portfolio_battle_backend::services::normalization::normalize;
use portfolio_battle_backend::services::pipeline_service::run_pipeline;
use portfolio_battle_backend::services::price_cache::PriceCache;
use portfolio_battle_backend::services::ranking::ticker_return;
use portfolio_battle_backend::services::rate_limiter::RateLimiter;
use portfolio_battle_backend::services::rollup::roll_up;
use portfolio_battle_backend::state::AppState;

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

fn d(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

#[derive(Default)]
struct StaticProvider {
    data: HashMap<String, Vec<(NaiveDate, f64)>>,
    calls: AtomicUsize,
}

impl StaticProvider {
    fn with(mut self, ticker: &str, points: &[(&str, f64)]) -> Self {
        self.data.insert(
            ticker.to_string(),
            points.iter().map(|(date, v)| (d(date), *v)).collect(),
        );
        self
    }
}

#[async_trait]
impl PriceProvider for StaticProvider {
    async fn fetch_daily_history(
        &self,
        ticker: &str,
        _credential: &ApiCredential,
        from: NaiveDate,
    ) -> Result<Vec<ExternalPricePoint>, PriceProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.data.get(ticker) {
            Some(points) => Ok(points
                .iter()
                .filter(|(date, _)| *date >= from)
                .map(|(date, adj_close)| ExternalPricePoint { date: *date, adj_close: *adj_close })
                .collect()),
            None => Err(PriceProviderError::BadResponse("no historical data".into())),
        }
    }

    fn name(&self) -> &'static str {
        "static"
    }
}

fn fetcher(provider: Arc<StaticProvider>) -> PriceFetcher {
    PriceFetcher::new(
        provider,
        PriceCache::default(),
        FailureCache::new(),
        Arc::new(RateLimiter::new(4, 60_000)),
        Duration::from_secs(5),
    )
}

fn key() -> ApiCredential {
    ApiCredential::new("integration-key").unwrap()
}

fn abc_provider() -> StaticProvider {
    StaticProvider::default()
        .with("A", &[("2024-01-02", 100.0), ("2024-01-03", 110.0)])
        .with("B", &[("2024-01-02", 50.0), ("2024-01-03", 45.0)])
        .with("C", &[("2024-01-02", 200.0), ("2024-01-03", 220.0)])
        .with("SPY", &[("2024-01-02", 470.0), ("2024-01-03", 472.0)])
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_three_ticker_equal_weight_scenario() {
    let portfolios = vec![
        Portfolio::new("P", ["A", "B", "C"]).unwrap(),
        Portfolio::benchmark("Benchmark", "SPY").unwrap(),
    ];

    let report = run_pipeline(
        &fetcher(Arc::new(abc_provider())),
        Some(&key()),
        &portfolios,
        d("2024-01-01"),
    )
    .await
    .unwrap();

    let first = &report.series[0];
    let last = &report.series[1];
    assert_eq!(first.date, d("2024-01-02"));
    assert_eq!(first.values["P"], 100.0);
    assert!((last.values["P"] - 103.333_333).abs() < 1e-4);

    let p = report.leaderboard.iter().find(|r| r.portfolio == "P").unwrap();
    assert!((p.total_return_pct - 3.333_333).abs() < 1e-4);

    let returns: Vec<(&str, f64)> = report.stock_returns["P"]
        .iter()
        .map(|r| (r.ticker.as_str(), r.return_pct))
        .collect();
    assert_eq!(returns[0].0, "A");
    assert_eq!(returns[1].0, "C");
    assert_eq!(returns[2].0, "B");
    assert!((returns[2].1 + 10.0).abs() < 1e-9);
    assert!(report.notices.is_empty());
}

#[tokio::test]
async fn test_failed_ticker_shrinks_portfolio() {
    let provider = StaticProvider::default()
        .with("E", &[("2024-01-02", 10.0), ("2024-01-03", 12.0)])
        .with("F", &[("2024-01-02", 30.0), ("2024-01-03", 33.0)]);
    let portfolios = vec![
        Portfolio::new("DE", ["D", "E"]).unwrap(),
        Portfolio::new("F only", ["F"]).unwrap(),
    ];

    let report = run_pipeline(&fetcher(Arc::new(provider)), Some(&key()), &portfolios, d("2024-01-01"))
        .await
        .unwrap();

    assert_eq!(report.meta.tickers_requested, 3);
    assert_eq!(report.meta.tickers_fetched, 2);
    assert!((report.series[1].values["DE"] - 120.0).abs() < 1e-9);
    assert_eq!(
        report.stock_returns["DE"].iter().map(|r| r.ticker.as_str()).collect::<Vec<_>>(),
        vec!["E"]
    );
    assert_eq!(
        report.notices,
        vec![PipelineNotice::TickerDropped {
            ticker: "D".into(),
            reason: "bad response: no historical data".into(),
        }]
    );
}

#[tokio::test]
async fn test_portfolio_with_no_surviving_tickers_is_reported() {
    let portfolios = vec![
        Portfolio::new("P", ["A", "B"]).unwrap(),
        Portfolio::new("Delisted", ["XX1", "XX2"]).unwrap(),
    ];

    let report = run_pipeline(
        &fetcher(Arc::new(abc_provider())),
        Some(&key()),
        &portfolios,
        d("2024-01-01"),
    )
    .await
    .unwrap();

    assert!(report.series.iter().all(|p| !p.values.contains_key("Delisted")));
    assert!(report.leaderboard.iter().all(|r| r.portfolio != "Delisted"));
    assert!(report.notices.contains(&PipelineNotice::PortfolioOmitted {
        portfolio: "Delisted".into(),
        missing_tickers: vec!["XX1".into(), "XX2".into()],
    }));
}

#[tokio::test]
async fn test_repeat_run_is_served_from_cache() {
    let provider = Arc::new(abc_provider());
    let fetcher = fetcher(provider.clone());
    let portfolios = vec![Portfolio::new("P", ["A", "B", "C"]).unwrap()];

    let first = run_pipeline(&fetcher, Some(&key()), &portfolios, d("2024-01-01")).await.unwrap();
    let second = run_pipeline(&fetcher, Some(&key()), &portfolios, d("2024-01-01")).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_missing_credential_halts_run() {
    let portfolios = vec![Portfolio::new("P", ["A"]).unwrap()];
    let provider = Arc::new(abc_provider());

    let err = run_pipeline(&fetcher(provider.clone()), None, &portfolios, d("2024-01-01"))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Config(_)));
    assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
}

// ---------------------------------------------------------------------------
// Table properties
// ---------------------------------------------------------------------------

#[test]
fn test_late_starter_drops_leading_rows() {
    let mut t = PriceTable::new();
    for (date, y) in [("2024-01-01", 10.0), ("2024-01-02", 11.0), ("2024-01-03", 12.0), ("2024-01-04", 13.0)] {
        t.insert(d(date), "Y", y);
    }
    t.insert(d("2024-01-03"), "X", 5.0);
    t.insert(d("2024-01-04"), "X", 5.5);

    let cleaned = clean(&t);

    assert_eq!(cleaned.dates().collect::<Vec<_>>(), vec![d("2024-01-03"), d("2024-01-04")]);
    assert_eq!(cleaned.get(d("2024-01-03"), "X"), Some(5.0));
    assert_eq!(clean(&cleaned), cleaned);
}

#[test]
fn test_returns_match_on_cleaned_and_normalized_tables() {
    let mut t = PriceTable::new();
    let prices = [("MSFT", [370.0, 375.5, 368.1]), ("HIMS", [9.1, 9.7, 10.4]), ("SPY", [472.6, 468.8, 467.3])];
    for (ticker, series) in prices {
        for (i, p) in series.iter().enumerate() {
            t.insert(d("2024-01-02") + chrono::Duration::days(i as i64), ticker, *p);
        }
    }

    let cleaned = clean(&t);
    let normalized = normalize(&cleaned).unwrap();

    for ticker in ["MSFT", "HIMS", "SPY"] {
        assert_eq!(normalized.table().get(d("2024-01-02"), ticker), Some(100.0));
        let a = ticker_return(&cleaned, ticker).unwrap();
        let b = ticker_return(normalized.table(), ticker).unwrap();
        assert!((a - b).abs() < 1e-9, "{}: {} vs {}", ticker, a, b);
    }

    let portfolios = vec![Portfolio::new("All", ["MSFT", "HIMS", "SPY"]).unwrap()];
    let rolled = roll_up(&normalized, &portfolios);
    assert!(rolled.performance.series("All").iter().all(|(_, v)| v.is_finite()));
}

// ---------------------------------------------------------------------------
// HTTP boundary
// ---------------------------------------------------------------------------

fn app_state(provider: Arc<StaticProvider>, with_key: bool) -> AppState {
    let vars: HashMap<&str, &str> = if with_key {
        HashMap::from([("FMP_API_KEY", "integration-key")])
    } else {
        HashMap::new()
    };
    let mut config = AppConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap();
    config.portfolios = vec![
        Portfolio::new("P", ["A", "B", "C"]).unwrap(),
        Portfolio::benchmark("Benchmark", "SPY").unwrap(),
    ];

    AppState {
        config: Arc::new(config),
        fetcher: fetcher(provider),
    }
}

#[tokio::test]
async fn test_performance_endpoint_returns_report() {
    let app = create_app(app_state(Arc::new(abc_provider()), true));

    let resp = app
        .oneshot(
            Request::builder()
                .uri("/api/performance?start=2024-01-01")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["start_date"], "2024-01-01");
    assert_eq!(json["leaderboard"][0]["portfolio"], "P");
    assert_eq!(json["series"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_performance_endpoint_error_states() {
    let cases = [
        (true, "/api/performance?start=not-a-date", StatusCode::BAD_REQUEST),
        (false, "/api/performance?start=2024-01-01", StatusCode::SERVICE_UNAVAILABLE),
    ];

    for (with_key, uri, status) in cases {
        let app = create_app(app_state(Arc::new(abc_provider()), with_key));
        let resp = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), status, "{}", uri);
    }
}

#[tokio::test]
async fn test_health() {
    let app = create_app(app_state(Arc::new(StaticProvider::default()), false));
    let resp = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}
