use crate::errors::AppError;
use crate::models::{NormalizedTable, PriceRow, PriceTable};

/// Every column starts at this value after rebasing.
pub const BASELINE: f64 = 100.0;

/// Rebases each column of a cleaned table so its first row equals
/// [`BASELINE`].
///
/// Needs a non-empty, complete table whose first row is strictly positive.
pub fn normalize(table: &PriceTable) -> Result<NormalizedTable, AppError> {
    let first = table
        .first_row()
        .ok_or_else(|| AppError::InsufficientData("cannot normalize an empty table".into()))?;

    if !table.is_complete() {
        return Err(AppError::InvalidData(
            "table must be cleaned before normalizing".into(),
        ));
    }

    if let Some((ticker, price)) = first.iter().find(|(_, p)| !(p.is_finite() && **p > 0.0)) {
        return Err(AppError::InvalidData(format!(
            "first price of {} is {}, cannot rebase",
            ticker, price
        )));
    }

    let mut out = PriceTable::with_columns(table.tickers().map(str::to_string));
    for (date, row) in table.rows() {
        let rebased: PriceRow = row
            .iter()
            .map(|(ticker, price)| (ticker.clone(), price / first[ticker] * BASELINE))
            .collect();
        out.push_row(date, rebased);
    }

    Ok(NormalizedTable::new(BASELINE, out))
}
