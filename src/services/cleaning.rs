use crate::models::{PriceRow, PriceTable};

/// Forward-fills each column from its last known value, then drops every row
/// that is still incomplete.
///
/// Incomplete rows left after the fill are the leading dates before some
/// ticker's first print. The result is rectangular. It is empty only when
/// some column holds no value at all; callers treat that as insufficient
/// overlap.
/// Idempotent.
pub fn clean(table: &PriceTable) -> PriceTable {
    let mut out = PriceTable::with_columns(table.tickers().map(str::to_string));
    let mut last_known = PriceRow::new();

    for (date, row) in table.rows() {
        for (ticker, price) in row {
            last_known.insert(ticker.clone(), *price);
        }

        if table.tickers().all(|t| last_known.contains_key(t)) {
            out.push_row(date, last_known.clone());
        }
    }

    out
}
