pub mod aggregation_service;
pub mod cleaning;
pub mod failure_cache;
pub mod fetch_service;
pub mod normalization;
pub mod pipeline_service;
pub mod price_cache;
pub mod ranking;
pub mod rate_limiter;
pub mod rollup;
