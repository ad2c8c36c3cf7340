use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::info;

use crate::calibration::parity::{calibrate_spots, ImpliedSpot};
use crate::config::PricingConfig;
use crate::market_data::loader::LoadedQuotes;
use crate::market_data::quote::PricedQuote;
use crate::market_data::series::{contract_series, ContractFilter, SeriesPoint};
use crate::monte_carlo::simulation::new_rng;
use crate::pricing::engine::price_quotes;
use crate::types::{with_metadata, ComputationOutput};
use crate::OptmarkResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Headline numbers for one batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub rows_loaded: usize,
    pub rows_skipped: usize,
    pub pairs_calibrated: usize,
    pub rows_priced: usize,
    /// Mean of `|model_price - close|`; zero for an empty book.
    pub mean_abs_difference: f64,
    /// Mean of `model_price - close`; positive when the model sits above the market.
    pub mean_difference: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationOutput {
    pub rows_loaded: usize,
    pub rows_skipped: usize,
    pub spots: Vec<ImpliedSpot>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchOutput {
    pub summary: BatchSummary,
    pub spots: Vec<ImpliedSpot>,
    pub rows: Vec<PricedQuote>,
}

/// One contract's market-versus-model history from a priced batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesOutput {
    pub contract: ContractFilter,
    pub rows_priced: usize,
    pub points: Vec<SeriesPoint>,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn summarize(loaded: &LoadedQuotes, pairs: usize, rows: &[PricedQuote]) -> BatchSummary {
    let n = rows.len();
    let (mean_abs, mean) = if n == 0 {
        (0.0, 0.0)
    } else {
        let abs_sum: f64 = rows.iter().map(|r| r.price_difference.abs()).sum();
        let sum: f64 = rows.iter().map(|r| r.price_difference).sum();
        (abs_sum / n as f64, sum / n as f64)
    };
    BatchSummary {
        rows_loaded: loaded.quotes.len(),
        rows_skipped: loaded.skipped_rows.len(),
        pairs_calibrated: pairs,
        rows_priced: n,
        mean_abs_difference: mean_abs,
        mean_difference: mean,
    }
}

fn load_warnings(loaded: &LoadedQuotes) -> Vec<String> {
    let mut warnings = Vec::new();
    if !loaded.skipped_rows.is_empty() {
        warnings.push(format!(
            "{} non-option row(s) skipped (first at row {})",
            loaded.skipped_rows.len(),
            loaded.skipped_rows[0]
        ));
    }
    warnings
}

fn assumptions(config: &PricingConfig) -> serde_json::Value {
    serde_json::json!({
        "risk_free_rate": config.risk_free_rate,
        "volatility": config.volatility,
        "num_paths": config.num_paths,
        "seed": config.seed,
        "pairing": config.pairing,
        "day_count": "ACT/365, floored at 1 day",
    })
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Calibrate implied spots only.
pub fn run_calibration(
    loaded: &LoadedQuotes,
    config: &PricingConfig,
) -> OptmarkResult<ComputationOutput<CalibrationOutput>> {
    let start = Instant::now();
    config.validate()?;

    let calibration = calibrate_spots(&loaded.quotes, config.risk_free_rate, config.pairing)?;
    let output = CalibrationOutput {
        rows_loaded: loaded.quotes.len(),
        rows_skipped: loaded.skipped_rows.len(),
        spots: calibration.entries().to_vec(),
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Put-call parity implied spot",
        &assumptions(config),
        load_warnings(loaded),
        elapsed,
        output,
    ))
}

/// Calibrate, then price, drawing every path from `rng`.
///
/// Calibration runs over the whole book before the first quote is priced.
pub fn run_pricing_batch_with_rng<R: Rng + ?Sized>(
    loaded: &LoadedQuotes,
    config: &PricingConfig,
    rng: &mut R,
) -> OptmarkResult<ComputationOutput<BatchOutput>> {
    let start = Instant::now();
    config.validate()?;
    let mut warnings = load_warnings(loaded);

    let calibration = calibrate_spots(&loaded.quotes, config.risk_free_rate, config.pairing)?;
    let rows = price_quotes(&loaded.quotes, &calibration, config, rng)?;
    let summary = summarize(loaded, calibration.len(), &rows);

    if config.seed.is_none() {
        warnings.push("Unseeded run: model prices are not reproducible across runs".into());
    }
    info!(
        rows = summary.rows_priced,
        pairs = summary.pairs_calibrated,
        mean_abs_difference = summary.mean_abs_difference,
        "batch complete"
    );

    let output = BatchOutput {
        summary,
        spots: calibration.entries().to_vec(),
        rows,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Put-call parity spot + risk-neutral Monte Carlo (European, flat vol)",
        &assumptions(config),
        warnings,
        elapsed,
        output,
    ))
}

/// Calibrate and price with a generator seeded from `config.seed`, or from
/// OS entropy when no seed is set.
pub fn run_pricing_batch(
    loaded: &LoadedQuotes,
    config: &PricingConfig,
) -> OptmarkResult<ComputationOutput<BatchOutput>> {
    let mut rng = new_rng(config.seed);
    run_pricing_batch_with_rng(loaded, config, &mut rng)
}

/// Price the whole book, then pull out one contract's history by observation date.
///
/// The full book is priced so that, for a given seed, each point carries the
/// same model price the batch output would.
pub fn run_contract_series(
    loaded: &LoadedQuotes,
    config: &PricingConfig,
    filter: &ContractFilter,
) -> OptmarkResult<ComputationOutput<SeriesOutput>> {
    let batch = run_pricing_batch(loaded, config)?;
    let start = Instant::now();

    let points = contract_series(&batch.result.rows, filter);
    let mut warnings = batch.warnings;
    if points.is_empty() {
        warnings.push(format!("No priced quote matches contract {filter}"));
    }
    info!(contract = %filter, points = points.len(), "contract series extracted");

    let output = SeriesOutput {
        contract: filter.clone(),
        rows_priced: batch.result.summary.rows_priced,
        points,
    };

    let elapsed = batch.metadata.computation_time_us + start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Market settlement versus Monte Carlo model price over observation dates",
        &batch.assumptions,
        warnings,
        elapsed,
        output,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market_data::loader::{load_quotes, LoadOptions};

    const BOOK: &str = "SYMBOL,STRIKE_PR,EXPIRY_DT,TIMESTAMP,OPTION_TYP,CLOSE,SETTLE_PR\n\
X,100,2019-10-31,2019-10-01,CE,12,12\n\
X,100,2019-10-31,2019-10-01,PE,7,7\n";

    fn loaded() -> LoadedQuotes {
        load_quotes(BOOK.as_bytes(), &LoadOptions::default()).unwrap()
    }

    #[test]
    fn test_seeded_batch_is_reproducible() {
        let cfg = PricingConfig {
            seed: Some(99),
            ..PricingConfig::default()
        };
        let a = run_pricing_batch(&loaded(), &cfg).unwrap();
        let b = run_pricing_batch(&loaded(), &cfg).unwrap();
        assert_eq!(a.result.rows, b.result.rows);
        assert!(a.warnings.is_empty());
    }

    #[test]
    fn test_unseeded_batch_warns() {
        let out = run_pricing_batch(&loaded(), &PricingConfig::default()).unwrap();
        assert!(out.warnings.iter().any(|w| w.contains("Unseeded")));
        assert_eq!(out.result.summary.rows_priced, 2);
    }

    #[test]
    fn test_summary_statistics() {
        let cfg = PricingConfig {
            seed: Some(5),
            ..PricingConfig::default()
        };
        let out = run_pricing_batch(&loaded(), &cfg).unwrap();
        let s = &out.result.summary;
        assert_eq!(s.rows_loaded, 2);
        assert_eq!(s.rows_skipped, 0);
        assert_eq!(s.pairs_calibrated, 1);
        let rows = &out.result.rows;
        let expected = (rows[0].price_difference.abs() + rows[1].price_difference.abs()) / 2.0;
        assert!((s.mean_abs_difference - expected).abs() < 1e-12);
        assert!(s.mean_abs_difference >= s.mean_difference.abs());
    }

    #[test]
    fn test_calibration_only() {
        let cfg = PricingConfig::default();
        let out = run_calibration(&loaded(), &cfg).unwrap();
        assert_eq!(out.result.spots.len(), 1);
        assert!((out.result.spots[0].spot - 104.5899).abs() < 1e-3);
        assert_eq!(out.assumptions["pairing"], "keyed");
    }

    #[test]
    fn test_invalid_config_fails_fast() {
        let cfg = PricingConfig {
            num_paths: 0,
            ..PricingConfig::default()
        };
        assert!(run_pricing_batch(&loaded(), &cfg).is_err());
        assert!(run_calibration(&loaded(), &cfg).is_err());
    }

    #[test]
    fn test_small_path_counts_are_accepted() {
        for num_paths in [1, 50] {
            let cfg = PricingConfig {
                num_paths,
                seed: Some(1),
                ..PricingConfig::default()
            };
            let out = run_pricing_batch(&loaded(), &cfg).unwrap();
            assert_eq!(out.result.rows.len(), 2);
            assert!(out.result.rows.iter().all(|r| r.model_price >= 0.0));
        }
    }

    #[test]
    fn test_contract_series_follows_one_contract() {
        let book = "SYMBOL,STRIKE_PR,EXPIRY_DT,TIMESTAMP,OPTION_TYP,CLOSE,SETTLE_PR\n\
X,100,2019-10-31,2019-10-02,CE,13,13.1\n\
X,100,2019-10-31,2019-10-02,PE,6,6.1\n\
X,100,2019-10-31,2019-10-01,CE,12,12.1\n\
X,100,2019-10-31,2019-10-01,PE,7,7.1\n";
        let loaded = load_quotes(book.as_bytes(), &LoadOptions::default()).unwrap();
        let cfg = PricingConfig {
            seed: Some(17),
            ..PricingConfig::default()
        };
        let filter = ContractFilter::parse("X", "2019-10-31", "CE", "100").unwrap();
        let out = run_contract_series(&loaded, &cfg, &filter).unwrap();
        assert_eq!(out.result.rows_priced, 4);
        assert!(out.warnings.is_empty());

        let dates: Vec<String> = out
            .result
            .points
            .iter()
            .map(|p| p.observation_date.to_string())
            .collect();
        assert_eq!(dates, vec!["2019-10-01", "2019-10-02"]);

        // Same seed, same model prices as the batch rows
        let batch = run_pricing_batch(&loaded, &cfg).unwrap();
        assert_eq!(out.result.points[0].model_price, batch.result.rows[2].model_price);
        assert_eq!(out.result.points[1].model_price, batch.result.rows[0].model_price);
    }

    #[test]
    fn test_contract_series_warns_when_nothing_matches() {
        let cfg = PricingConfig {
            seed: Some(1),
            ..PricingConfig::default()
        };
        let filter = ContractFilter::parse("X", "2019-11-28", "PE", "100").unwrap();
        let out = run_contract_series(&loaded(), &cfg, &filter).unwrap();
        assert!(out.result.points.is_empty());
        assert!(out.warnings.iter().any(|w| w.contains("No priced quote")));
    }
}
