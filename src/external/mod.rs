pub mod alphavantage;
pub mod fmp;
pub mod price_provider;
