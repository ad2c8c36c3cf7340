use clap::Args;
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use optmark_core::market_data::writer::{create_output, write_implied_spots};
use optmark_core::pipeline;
use optmark_core::ComputationOutput;

use crate::commands::ModelArgs;
use crate::input;

/// Arguments for spot calibration
#[derive(Args)]
pub struct CalibrateArgs {
    /// Path to the input quote CSV (reads stdin when omitted)
    #[arg(long)]
    pub input: Option<String>,

    /// Write the implied spots to this CSV
    #[arg(long)]
    pub output: Option<String>,

    #[command(flatten)]
    pub model: ModelArgs,
}

#[derive(Serialize)]
struct SpotRow {
    symbol: String,
    strike: String,
    expiry: String,
    observation_date: String,
    implied_spot: f64,
}

#[derive(Serialize)]
struct CalibrationReport {
    rows_loaded: usize,
    rows_skipped: usize,
    pairs_calibrated: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    output: Option<String>,
    spots: Vec<SpotRow>,
}

pub fn run_calibrate(args: CalibrateArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let config = args.model.resolve()?;
    let loaded = input::load_book(args.input.as_deref(), &config.load_options())?;

    let spots_file = args.output.as_ref().map(create_output).transpose()?;

    let calibrated = pipeline::run_calibration(&loaded, &config)?;
    let spots = &calibrated.result.spots;

    if let (Some(file), Some(path)) = (spots_file, args.output.as_ref()) {
        write_implied_spots(file, spots.iter().map(|s| (&s.key, s.spot)))?;
        info!(path = %path, pairs = spots.len(), "implied spots written");
    }

    let rows = spots
        .iter()
        .map(|s| SpotRow {
            symbol: s.key.underlying_symbol.clone(),
            strike: s.key.strike.to_string(),
            expiry: s.key.expiry_date.format("%Y-%m-%d").to_string(),
            observation_date: s.key.observation_date.format("%Y-%m-%d").to_string(),
            implied_spot: s.spot,
        })
        .collect();

    let report = ComputationOutput {
        result: CalibrationReport {
            rows_loaded: calibrated.result.rows_loaded,
            rows_skipped: calibrated.result.rows_skipped,
            pairs_calibrated: spots.len(),
            output: args.output,
            spots: rows,
        },
        methodology: calibrated.methodology,
        assumptions: calibrated.assumptions,
        warnings: calibrated.warnings,
        metadata: calibrated.metadata,
    };
    Ok(serde_json::to_value(report)?)
}
