use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::OptmarkError;
use crate::market_data::loader::parse_date;
use crate::market_data::quote::{PricedQuote, Quote};
use crate::types::{Money, OptionKind};
use crate::OptmarkResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One listed contract followed across observation dates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractFilter {
    pub underlying_symbol: String,
    pub expiry_date: NaiveDate,
    pub option_kind: OptionKind,
    pub strike: Money,
}

/// Market and model price of the contract on one observation date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub observation_date: NaiveDate,
    pub settlement_price: Money,
    pub close_price: Money,
    pub model_price: f64,
    pub price_difference: f64,
}

impl ContractFilter {
    pub fn new(
        underlying_symbol: impl Into<String>,
        expiry_date: NaiveDate,
        option_kind: OptionKind,
        strike: Money,
    ) -> Self {
        ContractFilter {
            underlying_symbol: underlying_symbol.into(),
            expiry_date,
            option_kind,
            strike,
        }
    }

    /// Build a filter from command-line text: expiry in any loader date
    /// layout, option type as `CE`/`PE`.
    pub fn parse(symbol: &str, expiry: &str, option_type: &str, strike: &str) -> OptmarkResult<Self> {
        let symbol = symbol.trim();
        if symbol.is_empty() {
            return Err(OptmarkError::InvalidInput {
                field: "symbol".into(),
                reason: "must not be empty".into(),
            });
        }
        let expiry_date = parse_date(expiry).ok_or_else(|| OptmarkError::InvalidInput {
            field: "expiry".into(),
            reason: format!("'{expiry}' is not a YYYY-MM-DD or DD-MON-YYYY date"),
        })?;
        let option_kind =
            OptionKind::from_exchange_code(option_type).ok_or_else(|| OptmarkError::InvalidInput {
                field: "option_type".into(),
                reason: format!("'{option_type}' is not CE or PE"),
            })?;
        let strike = Decimal::from_str(strike.trim()).map_err(|e| OptmarkError::InvalidInput {
            field: "strike".into(),
            reason: format!("'{strike}': {e}"),
        })?;
        Ok(ContractFilter::new(symbol, expiry_date, option_kind, strike))
    }

    pub fn matches(&self, quote: &Quote) -> bool {
        quote.underlying_symbol == self.underlying_symbol
            && quote.expiry_date == self.expiry_date
            && quote.option_kind == self.option_kind
            && quote.strike == self.strike
    }
}

impl fmt::Display for ContractFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            self.underlying_symbol,
            self.expiry_date.format("%Y-%m-%d"),
            self.option_kind.exchange_code(),
            self.strike.normalize()
        )
    }
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

/// Market-versus-model history of one contract, oldest observation first.
///
/// Rows sharing an observation date keep their input order.
pub fn contract_series(rows: &[PricedQuote], filter: &ContractFilter) -> Vec<SeriesPoint> {
    let mut points: Vec<SeriesPoint> = rows
        .iter()
        .filter(|row| filter.matches(&row.quote))
        .map(|row| SeriesPoint {
            observation_date: row.quote.observation_date,
            settlement_price: row.quote.settlement_price,
            close_price: row.quote.close_price,
            model_price: row.model_price,
            price_difference: row.price_difference,
        })
        .collect();
    points.sort_by_key(|p| p.observation_date);
    points
}
