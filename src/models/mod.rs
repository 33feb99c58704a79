mod price_point;
mod price_series;
mod price_table;
mod performance;
pub mod portfolio;

pub use price_point::PricePoint;
pub use price_series::PriceSeries;
pub use price_table::{NormalizedTable, PriceRow, PriceTable};
pub use portfolio::{Portfolio, Weighting};
pub use performance::{
    PerformancePoint, PerformanceReport, PerformanceTable, PipelineNotice, PortfolioReturn,
    ReportMeta, ReturnRecord,
};
