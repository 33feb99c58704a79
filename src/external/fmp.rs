use crate::external::price_provider::{
    tidy_points, ApiCredential, ExternalPricePoint, PriceProvider, PriceProviderError,
};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;

pub const FMP_BASE_URL: &str = "https://financialmodelingprep.com";

/// Financial Modeling Prep historical adjusted closes.
pub struct FmpProvider {
    client: reqwest::Client,
    base_url: String,
}

impl FmpProvider {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct FmpHistoryResponse {
    symbol: Option<String>,
    historical: Option<Vec<FmpHistoricalBar>>,

    // { "Error Message": "Invalid API KEY. ..." }
    #[serde(rename = "Error Message")]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FmpHistoricalBar {
    date: String,
    #[serde(rename = "adjClose")]
    adj_close: Option<f64>,
}

fn parse_history(
    body: FmpHistoryResponse,
    from: NaiveDate,
) -> Result<Vec<ExternalPricePoint>, PriceProviderError> {
    if let Some(msg) = body.error_message {
        if msg.contains("Limit Reach") {
            return Err(PriceProviderError::RateLimited);
        }
        return Err(PriceProviderError::BadResponse(msg));
    }

    // Unknown symbols come back as an empty object
    let bars = match (body.symbol, body.historical) {
        (_, Some(bars)) => bars,
        (None, None) => return Err(PriceProviderError::NotFound),
        (Some(_), None) => {
            return Err(PriceProviderError::BadResponse("missing historical field".into()))
        }
    };

    let mut points = Vec::with_capacity(bars.len());
    for bar in bars {
        let Some(adj_close) = bar.adj_close else {
            continue;
        };
        // FMP sometimes appends a time component
        let date_part = bar.date.split(' ').next().unwrap_or(&bar.date);
        let date = NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
            .map_err(|e| PriceProviderError::Parse(format!("{}: {}", bar.date, e)))?;
        points.push(ExternalPricePoint { date, adj_close });
    }

    let points = tidy_points(points, from);
    if points.is_empty() {
        return Err(PriceProviderError::BadResponse("no historical data".into()));
    }
    Ok(points)
}

#[async_trait]
impl PriceProvider for FmpProvider {
    async fn fetch_daily_history(
        &self,
        ticker: &str,
        credential: &ApiCredential,
        from: NaiveDate,
    ) -> Result<Vec<ExternalPricePoint>, PriceProviderError> {
        let url = format!("{}/api/v3/historical-price-full/{}", self.base_url, ticker);
        let from_str = from.format("%Y-%m-%d").to_string();

        let resp = self
            .client
            .get(url)
            .query(&[("apikey", credential.expose()), ("from", from_str.as_str())])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    PriceProviderError::Network(format!("request timed out: {}", e))
                } else {
                    PriceProviderError::Network(e.to_string())
                }
            })?;

        match resp.status() {
            reqwest::StatusCode::TOO_MANY_REQUESTS => return Err(PriceProviderError::RateLimited),
            reqwest::StatusCode::NOT_FOUND => return Err(PriceProviderError::NotFound),
            s if s == reqwest::StatusCode::UNAUTHORIZED || s == reqwest::StatusCode::FORBIDDEN => {
                return Err(PriceProviderError::BadResponse(format!("HTTP {}: credential rejected", s)))
            }
            s if !s.is_success() => {
                return Err(PriceProviderError::BadResponse(format!("HTTP {}", s)))
            }
            _ => {}
        }

        let body = resp
            .json::<FmpHistoryResponse>()
            .await
            .map_err(|e| PriceProviderError::Parse(e.to_string()))?;

        parse_history(body, from)
    }

    fn name(&self) -> &'static str {
        "fmp"
    }
}
