use crate::external::price_provider::{
    tidy_points, ApiCredential, ExternalPricePoint, PriceProvider, PriceProviderError,
};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::BTreeMap;

pub const ALPHAVANTAGE_BASE_URL: &str = "https://www.alphavantage.co";

pub struct AlphaVantageProvider {
    client: reqwest::Client,
    base_url: String,
}

impl AlphaVantageProvider {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct AvDailyAdjustedResponse {
    #[serde(rename = "Time Series (Daily)")]
    time_series: Option<BTreeMap<String, AvDailyBar>>,

    // When rate-limited Alpha Vantage returns:
    // { "Note": "Thank you for using Alpha Vantage! ... 5 calls per minute ..." }
    #[serde(rename = "Note")]
    note: Option<String>,

    // Newer throttle / premium responses use "Information"
    #[serde(rename = "Information")]
    information: Option<String>,

    // When invalid:
    // { "Error Message": "Invalid API call. ..." }
    #[serde(rename = "Error Message")]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AvDailyBar {
    #[serde(rename = "5. adjusted close")]
    adjusted_close: String,
}

fn parse_daily_adjusted(
    body: AvDailyAdjustedResponse,
    from: NaiveDate,
) -> Result<Vec<ExternalPricePoint>, PriceProviderError> {
    if body.note.is_some() || body.information.is_some() {
        return Err(PriceProviderError::RateLimited);
    }

    if let Some(msg) = body.error_message {
        return Err(PriceProviderError::BadResponse(msg));
    }

    let series = body
        .time_series
        .ok_or_else(|| PriceProviderError::BadResponse("missing time series".into()))?;

    let mut out: Vec<ExternalPricePoint> = Vec::with_capacity(series.len());
    for (date_str, bar) in series {
        let date = NaiveDate::parse_from_str(&date_str, "%Y-%m-%d")
            .map_err(|e| PriceProviderError::Parse(e.to_string()))?;

        let adj_close = bar
            .adjusted_close
            .parse::<f64>()
            .map_err(|e| PriceProviderError::Parse(e.to_string()))?;

        out.push(ExternalPricePoint { date, adj_close });
    }

    let out = tidy_points(out, from);
    if out.is_empty() {
        return Err(PriceProviderError::BadResponse("no data since start date".into()));
    }
    Ok(out)
}

#[async_trait]
impl PriceProvider for AlphaVantageProvider {
    async fn fetch_daily_history(
        &self,
        ticker: &str,
        credential: &ApiCredential,
        from: NaiveDate,
    ) -> Result<Vec<ExternalPricePoint>, PriceProviderError> {
        // compact only covers ~100 sessions
        let days_back = (chrono::Utc::now().date_naive() - from).num_days();
        let outputsize = if days_back <= 100 { "compact" } else { "full" };

        let url = format!("{}/query", self.base_url);

        let resp = self
            .client
            .get(url)
            .query(&[
                ("function", "TIME_SERIES_DAILY_ADJUSTED"),
                ("symbol", ticker),
                ("outputsize", outputsize),
                ("apikey", credential.expose()),
            ])
            .send()
            .await
            .map_err(|e| PriceProviderError::Network(e.to_string()))?;

        if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(PriceProviderError::RateLimited);
        }

        let body = resp
            .json::<AvDailyAdjustedResponse>()
            .await
            .map_err(|e| PriceProviderError::Parse(e.to_string()))?;

        parse_daily_adjusted(body, from)
    }

    fn name(&self) -> &'static str {
        "alphavantage"
    }
}
