mod commands;
mod input;
mod output;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::EnvFilter;

use commands::calibration::CalibrateArgs;
use commands::pricing::PriceArgs;
use commands::series::SeriesArgs;

/// Mark listed option quotes to a Monte Carlo model price
#[derive(Parser)]
#[command(
    name = "optmark",
    version,
    about = "Mark listed option quotes to a Monte Carlo model price",
    long_about = "Reads a bhavcopy-style table of call/put quotes, infers the underlying \
                  spot from put-call parity for every call/put pair, prices each quote by \
                  risk-neutral Monte Carlo under a flat volatility, and writes the table \
                  back with model prices and model-minus-close differences."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Report format
    #[arg(long = "output-format", default_value = "json", global = true)]
    format: OutputFormat,

    /// Log verbosity on stderr (-v info, -vv debug, -vvv trace). RUST_LOG overrides.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Calibrate spots and price every quote, writing the augmented table
    Price(PriceArgs),
    /// Calibrate implied spots from call/put pairs only
    Calibrate(CalibrateArgs),
    /// Price the book and follow one contract's market and model price by date
    Series(SeriesArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Price(args) => commands::pricing::run_price(args),
        Commands::Calibrate(args) => commands::calibration::run_calibrate(args),
        Commands::Series(args) => commands::series::run_series(args),
        Commands::Version => {
            println!("optmark {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.format, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_flag_is_global() {
        let cli = Cli::try_parse_from([
            "optmark", "calibrate", "--input", "book.csv", "--output-format", "table",
        ])
        .unwrap();
        assert!(matches!(cli.format, OutputFormat::Table));
        assert!(matches!(cli.command, Commands::Calibrate(_)));
    }

    #[test]
    fn test_price_output_does_not_clash_with_report_format() {
        let cli = Cli::try_parse_from([
            "optmark", "price", "--input", "in.csv", "--output", "out.csv", "--output-format", "csv",
        ])
        .unwrap();
        assert!(matches!(cli.format, OutputFormat::Csv));
        match cli.command {
            Commands::Price(args) => assert_eq!(args.output, "out.csv"),
            _ => panic!("expected price"),
        }
        assert!(Cli::try_parse_from(["optmark", "--format", "json", "version"]).is_err());
    }

    #[test]
    fn test_series_arguments() {
        let cli = Cli::try_parse_from([
            "optmark", "series", "--symbol", "ACC", "--expiry", "2019-10-31", "--option-type", "PE",
            "--strike", "1400", "--seed", "7",
        ])
        .unwrap();
        match cli.command {
            Commands::Series(args) => {
                assert_eq!(args.option_type, "PE");
                assert_eq!(args.model.seed, Some(7));
            }
            _ => panic!("expected series"),
        }
    }
}
