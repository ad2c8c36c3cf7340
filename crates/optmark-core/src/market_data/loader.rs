use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info, warn};

use crate::error::OptmarkError;
use crate::market_data::quote::Quote;
use crate::types::{Money, OptionKind};
use crate::OptmarkResult;

// ---------------------------------------------------------------------------
// Column contract
// ---------------------------------------------------------------------------

pub const COL_SYMBOL: &str = "SYMBOL";
pub const COL_STRIKE: &str = "STRIKE_PR";
pub const COL_EXPIRY: &str = "EXPIRY_DT";
pub const COL_TIMESTAMP: &str = "TIMESTAMP";
pub const COL_OPTION_TYPE: &str = "OPTION_TYP";
pub const COL_CLOSE: &str = "CLOSE";
pub const COL_SETTLE: &str = "SETTLE_PR";

/// Accepted date layouts: ISO first, then the exchange bhavcopy form (03-OCT-2019).
const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%d-%b-%Y"];

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoadOptions {
    /// Drop rows whose OPTION_TYP is not CE/PE (futures rows in exchange
    /// dumps) instead of failing the batch.
    #[serde(default)]
    pub skip_non_option_rows: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoadedQuotes {
    pub quotes: Vec<Quote>,
    /// 1-based data row numbers of rows dropped by `skip_non_option_rows`.
    pub skipped_rows: Vec<usize>,
}

/// Resolved positions of the required columns within the header.
struct ColumnIndex {
    symbol: usize,
    strike: usize,
    expiry: usize,
    timestamp: usize,
    option_type: usize,
    close: usize,
    settle: usize,
}

impl ColumnIndex {
    fn from_headers(headers: &csv::StringRecord) -> OptmarkResult<Self> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim() == name)
                .ok_or_else(|| OptmarkError::InvalidInput {
                    field: name.to_string(),
                    reason: "required column missing from header".into(),
                })
        };
        Ok(ColumnIndex {
            symbol: find(COL_SYMBOL)?,
            strike: find(COL_STRIKE)?,
            expiry: find(COL_EXPIRY)?,
            timestamp: find(COL_TIMESTAMP)?,
            option_type: find(COL_OPTION_TYPE)?,
            close: find(COL_CLOSE)?,
            settle: find(COL_SETTLE)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Field parsing
// ---------------------------------------------------------------------------

/// Parse a calendar date in any of the accepted layouts.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
}

fn field<'r>(record: &'r csv::StringRecord, idx: usize, row: usize, name: &str) -> OptmarkResult<&'r str> {
    match record.get(idx).map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(OptmarkError::MalformedRow {
            row,
            field: name.to_string(),
            reason: "missing value".into(),
        }),
    }
}

fn date_field(record: &csv::StringRecord, idx: usize, row: usize, name: &str) -> OptmarkResult<NaiveDate> {
    let raw = field(record, idx, row, name)?;
    parse_date(raw).ok_or_else(|| OptmarkError::MalformedRow {
        row,
        field: name.to_string(),
        reason: format!("unparseable date '{raw}' (expected YYYY-MM-DD or DD-MON-YYYY)"),
    })
}

fn decimal_field(record: &csv::StringRecord, idx: usize, row: usize, name: &str) -> OptmarkResult<Money> {
    let raw = field(record, idx, row, name)?;
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .map_err(|_| OptmarkError::MalformedRow {
            row,
            field: name.to_string(),
            reason: format!("not a decimal number: '{raw}'"),
        })
}

fn parse_row(record: &csv::StringRecord, cols: &ColumnIndex, row: usize, kind: OptionKind) -> OptmarkResult<Quote> {
    let symbol = field(record, cols.symbol, row, COL_SYMBOL)?;
    let strike = decimal_field(record, cols.strike, row, COL_STRIKE)?;
    let expiry = date_field(record, cols.expiry, row, COL_EXPIRY)?;
    let observed = date_field(record, cols.timestamp, row, COL_TIMESTAMP)?;
    let close = decimal_field(record, cols.close, row, COL_CLOSE)?;
    let settle = decimal_field(record, cols.settle, row, COL_SETTLE)?;

    if strike <= Decimal::ZERO {
        return Err(OptmarkError::MalformedRow {
            row,
            field: COL_STRIKE.into(),
            reason: "strike must be positive".into(),
        });
    }
    for (name, value) in [(COL_CLOSE, close), (COL_SETTLE, settle)] {
        if value < Decimal::ZERO {
            return Err(OptmarkError::MalformedRow {
                row,
                field: name.into(),
                reason: "price must be non-negative".into(),
            });
        }
    }

    Ok(Quote::new(symbol, strike, expiry, observed, kind, close, settle))
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Load quotes from CSV text with a header row.
///
/// Columns are located by name, so order is free and extra columns are
/// ignored. Any malformed row fails the whole load with the 1-based data row
/// number and the offending column.
pub fn load_quotes<R: Read>(reader: R, options: &LoadOptions) -> OptmarkResult<LoadedQuotes> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let cols = ColumnIndex::from_headers(rdr.headers()?)?;

    let mut loaded = LoadedQuotes::default();
    for (i, record) in rdr.records().enumerate() {
        let row = i + 1;
        let record = record?;

        let token = field(&record, cols.option_type, row, COL_OPTION_TYPE)?;
        let kind = match OptionKind::from_exchange_code(token) {
            Some(kind) => kind,
            None if options.skip_non_option_rows => {
                debug!(row, token, "skipping non-option row");
                loaded.skipped_rows.push(row);
                continue;
            }
            None => {
                return Err(OptmarkError::UnknownOptionKind {
                    row,
                    token: token.to_string(),
                })
            }
        };

        loaded.quotes.push(parse_row(&record, &cols, row, kind)?);
    }

    if !loaded.skipped_rows.is_empty() {
        warn!(
            skipped = loaded.skipped_rows.len(),
            "dropped rows with non-option OPTION_TYP"
        );
    }
    info!(quotes = loaded.quotes.len(), "loaded option quotes");
    Ok(loaded)
}

/// Load quotes from a CSV file on disk.
pub fn load_quotes_from_path(path: impl AsRef<Path>, options: &LoadOptions) -> OptmarkResult<LoadedQuotes> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| {
        OptmarkError::Io(std::io::Error::new(
            e.kind(),
            format!("failed to open '{}': {e}", path.display()),
        ))
    })?;
    load_quotes(file, options)
}
