pub(crate) mod health;
pub(crate) mod performance;
pub(crate) mod portfolios;
