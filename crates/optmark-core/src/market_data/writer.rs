use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::error::OptmarkError;
use crate::market_data::quote::{CalibrationKey, PricedQuote};
use crate::market_data::series::SeriesPoint;
use crate::OptmarkResult;

pub const PRICED_HEADER: [&str; 10] = [
    "SYMBOL",
    "STRIKE_PR",
    "EXPIRY_DT",
    "TIMESTAMP",
    "OPTION_TYP",
    "CLOSE",
    "SETTLE_PR",
    "EXPIRY_DAYS",
    "Model_Price",
    "Price_Difference",
];

pub const SPOT_HEADER: [&str; 5] = [
    "SYMBOL",
    "STRIKE_PR",
    "EXPIRY_DT",
    "TIMESTAMP",
    "Approx_Spot_Price",
];

pub const SERIES_HEADER: [&str; 3] = ["TIMESTAMP", "SETTLE_PR", "Model_Price"];

const DATE_FMT: &str = "%Y-%m-%d";

/// Write priced quotes as CSV, one row per quote in the given order.
pub fn write_priced_quotes<W: Write>(writer: W, rows: &[PricedQuote]) -> OptmarkResult<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(PRICED_HEADER)?;
    for row in rows {
        let q = &row.quote;
        wtr.write_record([
            q.underlying_symbol.clone(),
            q.strike.to_string(),
            q.expiry_date.format(DATE_FMT).to_string(),
            q.observation_date.format(DATE_FMT).to_string(),
            q.option_kind.exchange_code().to_string(),
            q.close_price.to_string(),
            q.settlement_price.to_string(),
            q.days_to_expiry.to_string(),
            row.model_price.to_string(),
            row.price_difference.to_string(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write calibrated implied spots, one row per call/put pair.
pub fn write_implied_spots<'a, W, I>(writer: W, spots: I) -> OptmarkResult<()>
where
    W: Write,
    I: IntoIterator<Item = (&'a CalibrationKey, f64)>,
{
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(SPOT_HEADER)?;
    for (key, spot) in spots {
        wtr.write_record([
            key.underlying_symbol.clone(),
            key.strike.to_string(),
            key.expiry_date.format(DATE_FMT).to_string(),
            key.observation_date.format(DATE_FMT).to_string(),
            spot.to_string(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write one contract's settlement and model prices by observation date.
pub fn write_series<W: Write>(writer: W, points: &[SeriesPoint]) -> OptmarkResult<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(SERIES_HEADER)?;
    for p in points {
        wtr.write_record([
            p.observation_date.format(DATE_FMT).to_string(),
            p.settlement_price.to_string(),
            p.model_price.to_string(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Create (or truncate) `path` for writing.
pub fn create_output(path: impl AsRef<Path>) -> OptmarkResult<File> {
    let path = path.as_ref();
    File::create(path).map_err(|e| {
        OptmarkError::Io(std::io::Error::new(
            e.kind(),
            format!("failed to create '{}': {e}", path.display()),
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market_data::quote::Quote;
    use crate::types::OptionKind;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn quote(kind: OptionKind, close: rust_decimal::Decimal) -> Quote {
        Quote::new(
            "ACC",
            dec!(1400),
            NaiveDate::from_ymd_opt(2019, 10, 31).unwrap(),
            NaiveDate::from_ymd_opt(2019, 10, 1).unwrap(),
            kind,
            close,
            dec!(44.90),
        )
    }

    #[test]
    fn test_priced_output_layout() {
        let rows = vec![
            PricedQuote::new(quote(OptionKind::Call, dec!(45.5)), 1425.0, 47.0),
            PricedQuote::new(quote(OptionKind::Put, dec!(20)), 1425.0, 18.5),
        ];
        let mut buf = Vec::new();
        write_priced_quotes(&mut buf, &rows).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "SYMBOL,STRIKE_PR,EXPIRY_DT,TIMESTAMP,OPTION_TYP,CLOSE,SETTLE_PR,EXPIRY_DAYS,Model_Price,Price_Difference",
                "ACC,1400,2019-10-31,2019-10-01,CE,45.5,44.90,30,47,1.5",
                "ACC,1400,2019-10-31,2019-10-01,PE,20,44.90,30,18.5,-1.5",
            ]
        );
    }

    #[test]
    fn test_header_written_for_empty_book() {
        let mut buf = Vec::new();
        write_priced_quotes(&mut buf, &[]).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap().lines().count(), 1);
    }

    #[test]
    fn test_spot_output_layout() {
        let key = quote(OptionKind::Call, dec!(45.5)).key();
        let mut buf = Vec::new();
        write_implied_spots(&mut buf, [(&key, 1425.25)]).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(
            text,
            "SYMBOL,STRIKE_PR,EXPIRY_DT,TIMESTAMP,Approx_Spot_Price\nACC,1400,2019-10-31,2019-10-01,1425.25\n"
        );
    }

    #[test]
    fn test_series_output_layout() {
        let points = vec![
            SeriesPoint {
                observation_date: NaiveDate::from_ymd_opt(2019, 10, 1).unwrap(),
                settlement_price: dec!(44.90),
                close_price: dec!(45.5),
                model_price: 47.25,
                price_difference: 1.75,
            },
            SeriesPoint {
                observation_date: NaiveDate::from_ymd_opt(2019, 10, 3).unwrap(),
                settlement_price: dec!(41),
                close_price: dec!(40),
                model_price: 43.0,
                price_difference: 3.0,
            },
        ];
        let mut buf = Vec::new();
        write_series(&mut buf, &points).unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "TIMESTAMP,SETTLE_PR,Model_Price\n2019-10-01,44.90,47.25\n2019-10-03,41,43\n"
        );
    }
}
