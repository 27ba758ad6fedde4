//! Dense, per-calendar-day carry-forward resolution over sparse
//! (weekday-only) stored rates.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::model::{DenseRate, ExchangeRate};

/// Expand `rates` into one [`DenseRate`] per calendar day in `[start, end]`.
///
/// `rates` must be sorted ascending by `date` and may (should) include one
/// row dated before `start` so the first requested day can carry forward
/// from it. Days that precede every row in `rates` are omitted from the
/// result rather than erroring: callers are expected to have already
/// rejected out-of-range starts via `FxError::start_date_out_of_range`.
#[must_use]
pub fn build_dense_range(
    target_currency: &str,
    rates: &[ExchangeRate],
    start: NaiveDate,
    end: NaiveDate,
) -> Vec<DenseRate> {
    if start > end || rates.is_empty() {
        return Vec::new();
    }

    let mut out = Vec::new();
    let mut cursor = 0usize;
    let mut carry: Option<(NaiveDate, Decimal)> = None;
    let mut day = start;

    while day <= end {
        while cursor < rates.len() && rates[cursor].date <= day {
            carry = Some((rates[cursor].date, rates[cursor].rate));
            cursor += 1;
        }
        if let Some((published_date, rate)) = carry {
            out.push(DenseRate {
                base_currency: "USD".to_string(),
                target_currency: target_currency.to_string(),
                requested_date: day,
                rate,
                published_date,
            });
        }
        day = day.succ_opt().expect("NaiveDate::succ_opt overflow at chrono::NaiveDate::MAX");
    }

    out
}
