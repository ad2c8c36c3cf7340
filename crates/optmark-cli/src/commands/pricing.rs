use clap::Args;
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use optmark_core::market_data::writer::{create_output, write_implied_spots, write_priced_quotes};
use optmark_core::pipeline::{self, BatchSummary};
use optmark_core::ComputationOutput;

use crate::commands::ModelArgs;
use crate::input;

/// Arguments for batch pricing
#[derive(Args)]
pub struct PriceArgs {
    /// Path to the input quote CSV (reads stdin when omitted)
    #[arg(long)]
    pub input: Option<String>,

    /// Path for the priced output CSV
    #[arg(long)]
    pub output: String,

    /// Also write the calibrated implied spots to this CSV
    #[arg(long)]
    pub spots_output: Option<String>,

    #[command(flatten)]
    pub model: ModelArgs,
}

#[derive(Serialize)]
struct PriceReport {
    input: String,
    output: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    spots_output: Option<String>,
    #[serde(flatten)]
    summary: BatchSummary,
}

pub fn run_price(args: PriceArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let config = args.model.resolve()?;
    let loaded = input::load_book(args.input.as_deref(), &config.load_options())?;

    // Open both outputs up front so a bad path fails before the simulation runs
    let priced_file = create_output(&args.output)?;
    let spots_file = args.spots_output.as_ref().map(create_output).transpose()?;

    let batch = pipeline::run_pricing_batch(&loaded, &config)?;

    write_priced_quotes(priced_file, &batch.result.rows)?;
    if let (Some(file), Some(path)) = (spots_file, args.spots_output.as_ref()) {
        let spots = batch.result.spots.iter().map(|s| (&s.key, s.spot));
        write_implied_spots(file, spots)?;
        info!(path = %path, "implied spots written");
    }
    info!(path = %args.output, rows = batch.result.rows.len(), "pricing complete");

    let report = ComputationOutput {
        result: PriceReport {
            input: args.input.unwrap_or_else(|| "<stdin>".into()),
            output: args.output,
            spots_output: args.spots_output,
            summary: batch.result.summary,
        },
        methodology: batch.methodology,
        assumptions: batch.assumptions,
        warnings: batch.warnings,
        metadata: batch.metadata,
    };
    Ok(serde_json::to_value(report)?)
}
