use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::time_value::{days_between, year_fraction};
use crate::types::{Money, OptionKind, Years};

// ---------------------------------------------------------------------------
// Quote
// ---------------------------------------------------------------------------

/// One observed option quote, as loaded from a bhavcopy-style row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub underlying_symbol: String,
    pub strike: Money,
    pub expiry_date: NaiveDate,
    pub observation_date: NaiveDate,
    pub option_kind: OptionKind,
    pub close_price: Money,
    pub settlement_price: Money,
    /// Whole days from observation to expiry. Zero on expiry day, negative
    /// for rows observed after expiry.
    pub days_to_expiry: i64,
}

impl Quote {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        underlying_symbol: impl Into<String>,
        strike: Money,
        expiry_date: NaiveDate,
        observation_date: NaiveDate,
        option_kind: OptionKind,
        close_price: Money,
        settlement_price: Money,
    ) -> Self {
        Quote {
            underlying_symbol: underlying_symbol.into(),
            strike,
            expiry_date,
            observation_date,
            option_kind,
            close_price,
            settlement_price,
            days_to_expiry: days_between(observation_date, expiry_date),
        }
    }

    /// The call/put pairing key this quote belongs to.
    pub fn key(&self) -> CalibrationKey {
        CalibrationKey {
            underlying_symbol: self.underlying_symbol.clone(),
            expiry_date: self.expiry_date,
            observation_date: self.observation_date,
            strike: self.strike.normalize(),
        }
    }

    /// Floored ACT/365 time to expiry.
    pub fn time_to_expiry(&self) -> Years {
        year_fraction(self.days_to_expiry)
    }

    pub fn strike_f64(&self) -> f64 {
        to_f64(self.strike)
    }

    pub fn close_f64(&self) -> f64 {
        to_f64(self.close_price)
    }
}

fn to_f64(value: Money) -> f64 {
    value.to_f64().unwrap_or(f64::NAN)
}

// ---------------------------------------------------------------------------
// CalibrationKey
// ---------------------------------------------------------------------------

/// Identifies a call/put pair: same underlying, expiry, observation date and
/// strike. The strike is normalized so `100` and `100.00` collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CalibrationKey {
    pub underlying_symbol: String,
    pub expiry_date: NaiveDate,
    pub observation_date: NaiveDate,
    pub strike: Money,
}

impl fmt::Display for CalibrationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}|{}|{}|{}",
            self.underlying_symbol,
            self.expiry_date.format("%Y-%m-%d"),
            self.observation_date.format("%Y-%m-%d"),
            self.strike
        )
    }
}

// ---------------------------------------------------------------------------
// PricedQuote
// ---------------------------------------------------------------------------

/// A quote marked to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricedQuote {
    #[serde(flatten)]
    pub quote: Quote,
    pub implied_spot: f64,
    pub model_price: f64,
    /// `model_price - close_price`; positive when the model is above the market.
    pub price_difference: f64,
}

impl PricedQuote {
    pub fn new(quote: Quote, implied_spot: f64, model_price: f64) -> Self {
        let price_difference = model_price - quote.close_f64();
        PricedQuote {
            quote,
            implied_spot,
            model_price,
            price_difference,
        }
    }
}
