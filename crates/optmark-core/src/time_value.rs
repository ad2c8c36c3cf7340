use chrono::NaiveDate;

use crate::error::OptmarkError;
use crate::types::{Rate, Years};
use crate::OptmarkResult;

/// ACT/365 fixed day basis.
pub const DAYS_PER_YEAR: f64 = 365.0;

/// Shortest horizon any quote is priced over: one day.
pub const MIN_YEAR_FRACTION: Years = 1.0 / DAYS_PER_YEAR;

/// Whole calendar days from `observation` to `expiry`. Negative when the
/// observation date is after expiry.
pub fn days_between(observation: NaiveDate, expiry: NaiveDate) -> i64 {
    (expiry - observation).num_days()
}

/// Year fraction for a day count, floored at one day.
///
/// Expiry-day quotes (0 days) and malformed rows (negative days) are priced
/// as if one day remained instead of collapsing the horizon to zero.
pub fn year_fraction(days_to_expiry: i64) -> Years {
    (days_to_expiry as f64 / DAYS_PER_YEAR).max(MIN_YEAR_FRACTION)
}

/// Continuous discount factor `exp(-r * t)`.
pub fn discount_factor(rate: Rate, t: Years) -> OptmarkResult<f64> {
    if !rate.is_finite() {
        return Err(OptmarkError::InvalidInput {
            field: "risk_free_rate".into(),
            reason: "must be finite".into(),
        });
    }
    if !t.is_finite() || t < 0.0 {
        return Err(OptmarkError::InvalidInput {
            field: "time_to_expiry".into(),
            reason: "must be a finite, non-negative year fraction".into(),
        });
    }
    Ok((-rate * t).exp())
}
