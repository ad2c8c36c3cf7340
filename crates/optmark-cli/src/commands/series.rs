use clap::Args;
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use optmark_core::market_data::series::{ContractFilter, SeriesPoint};
use optmark_core::market_data::writer::{create_output, write_series};
use optmark_core::pipeline;
use optmark_core::ComputationOutput;

use crate::commands::ModelArgs;
use crate::input;

/// Arguments for a single-contract price history
#[derive(Args)]
pub struct SeriesArgs {
    /// Path to the input quote CSV (reads stdin when omitted)
    #[arg(long)]
    pub input: Option<String>,

    /// Underlying symbol, e.g. BANKNIFTY
    #[arg(long)]
    pub symbol: String,

    /// Contract expiry (YYYY-MM-DD or DD-MON-YYYY)
    #[arg(long)]
    pub expiry: String,

    /// CE for calls, PE for puts
    #[arg(long)]
    pub option_type: String,

    /// Strike price
    #[arg(long)]
    pub strike: String,

    /// Write TIMESTAMP,SETTLE_PR,Model_Price rows to this CSV
    #[arg(long)]
    pub output: Option<String>,

    #[command(flatten)]
    pub model: ModelArgs,
}

#[derive(Serialize)]
struct SeriesReport {
    contract: String,
    rows_priced: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    output: Option<String>,
    points: Vec<SeriesPoint>,
}

pub fn run_series(args: SeriesArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let filter = ContractFilter::parse(&args.symbol, &args.expiry, &args.option_type, &args.strike)?;
    let config = args.model.resolve()?;
    let loaded = input::load_book(args.input.as_deref(), &config.load_options())?;

    let series_file = args.output.as_ref().map(create_output).transpose()?;

    let series = pipeline::run_contract_series(&loaded, &config, &filter)?;

    if let (Some(file), Some(path)) = (series_file, args.output.as_ref()) {
        write_series(file, &series.result.points)?;
        info!(path = %path, points = series.result.points.len(), "contract series written");
    }

    let report = ComputationOutput {
        result: SeriesReport {
            contract: filter.to_string(),
            rows_priced: series.result.rows_priced,
            output: args.output,
            points: series.result.points,
        },
        methodology: series.methodology,
        assumptions: series.assumptions,
        warnings: series.warnings,
        metadata: series.metadata,
    };
    Ok(serde_json::to_value(report)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const BOOK: &str = "SYMBOL,STRIKE_PR,EXPIRY_DT,TIMESTAMP,OPTION_TYP,CLOSE,SETTLE_PR\n\
ACC,1400,31-OCT-2019,03-OCT-2019,CE,47,46.5\n\
ACC,1400,31-OCT-2019,03-OCT-2019,PE,16.9,17\n\
ACC,1400,31-OCT-2019,01-OCT-2019,CE,45.5,44.9\n\
ACC,1400,31-OCT-2019,01-OCT-2019,PE,18.2,18\n";

    fn scratch(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("optmark-series-{}-{}", std::process::id(), name))
    }

    fn seeded_model() -> ModelArgs {
        ModelArgs {
            config: None,
            rate: None,
            volatility: None,
            paths: Some(500),
            seed: Some(4),
            pairing: None,
            skip_non_options: false,
        }
    }

    #[test]
    fn test_series_command_writes_dated_rows() {
        let input = scratch("book.csv");
        fs::write(&input, BOOK).unwrap();
        let output = scratch("series.csv");

        let report = run_series(SeriesArgs {
            input: Some(input.to_string_lossy().into_owned()),
            symbol: "ACC".into(),
            expiry: "2019-10-31".into(),
            option_type: "CE".into(),
            strike: "1400".into(),
            output: Some(output.to_string_lossy().into_owned()),
            model: seeded_model(),
        })
        .unwrap();

        assert_eq!(report["result"]["contract"], "ACC 2019-10-31 CE 1400");
        assert_eq!(report["result"]["rows_priced"], 4);

        let text = fs::read_to_string(&output).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "TIMESTAMP,SETTLE_PR,Model_Price");
        assert!(lines[1].starts_with("2019-10-01,44.9,"), "{}", lines[1]);
        assert!(lines[2].starts_with("2019-10-03,46.5,"), "{}", lines[2]);
    }

    #[test]
    fn test_bad_option_type_rejected_before_loading() {
        let err = run_series(SeriesArgs {
            input: Some("/definitely/not/here.csv".into()),
            symbol: "ACC".into(),
            expiry: "2019-10-31".into(),
            option_type: "FUT".into(),
            strike: "1400".into(),
            output: None,
            model: seeded_model(),
        })
        .unwrap_err();
        assert!(err.to_string().contains("option_type"), "{err}");
    }
}
