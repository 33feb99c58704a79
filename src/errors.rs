use axum::http::{HeaderMap, HeaderValue};
use axum::response::IntoResponse;
use reqwest::StatusCode;
use thiserror::Error;

/// Run-level failures. Per-ticker fetch problems never end up here; they are
/// absorbed by the fetcher and reported as notices on the report.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("No data: {0}")]
    NoData(String),
    #[error("Insufficient data: {0}")]
    InsufficientData(String),
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        match self {
            AppError::Config(msg) => {
                let mut headers = HeaderMap::new();
                headers.insert("Retry-After", HeaderValue::from_static("3600"));
                (StatusCode::SERVICE_UNAVAILABLE, headers, msg).into_response()
            }
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg).into_response(),
            AppError::NoData(msg) => (StatusCode::BAD_GATEWAY, msg).into_response(),
            AppError::InsufficientData(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg).into_response(),
            AppError::InvalidData(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let cases = [
            (AppError::Config("missing key".into()), StatusCode::SERVICE_UNAVAILABLE),
            (AppError::Validation("bad date".into()), StatusCode::BAD_REQUEST),
            (AppError::NoData("nothing".into()), StatusCode::BAD_GATEWAY),
            (AppError::InsufficientData("no overlap".into()), StatusCode::UNPROCESSABLE_ENTITY),
            (AppError::InvalidData("zero".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }

    #[test]
    fn test_config_error_sets_retry_after() {
        let resp = AppError::Config("FMP_API_KEY not set".into()).into_response();
        assert_eq!(resp.headers().get("Retry-After").unwrap(), "3600");
    }
}
