pub mod calibration;
pub mod pricing;
pub mod series;

use clap::{Args, ValueEnum};
use optmark_core::config::PairingMode;
use optmark_core::PricingConfig;

use crate::input;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum PairingArg {
    /// Match calls and puts by symbol, strike, expiry and date
    Keyed,
    /// Consecutive rows form (call, put) pairs
    Positional,
}

impl From<PairingArg> for PairingMode {
    fn from(arg: PairingArg) -> Self {
        match arg {
            PairingArg::Keyed => PairingMode::Keyed,
            PairingArg::Positional => PairingMode::Positional,
        }
    }
}

/// Model parameters shared by every command. Flags override the config file.
#[derive(Args)]
pub struct ModelArgs {
    /// Path to a JSON or YAML pricing config
    #[arg(long)]
    pub config: Option<String>,

    /// Continuously compounded risk-free rate (default 0.05)
    #[arg(long)]
    pub rate: Option<f64>,

    /// Flat annualized volatility (default 0.20)
    #[arg(long)]
    pub volatility: Option<f64>,

    /// Simulated paths per quote (default 1000)
    #[arg(long)]
    pub paths: Option<u32>,

    /// Seed for a reproducible run
    #[arg(long)]
    pub seed: Option<u64>,

    /// Call/put pairing policy
    #[arg(long, value_enum)]
    pub pairing: Option<PairingArg>,

    /// Drop rows whose OPTION_TYP is not CE/PE instead of failing
    #[arg(long)]
    pub skip_non_options: bool,
}

impl ModelArgs {
    pub fn resolve(&self) -> Result<PricingConfig, Box<dyn std::error::Error>> {
        let mut config = match self.config {
            Some(ref path) => input::file::read_config(path)?,
            None => PricingConfig::default(),
        };
        if let Some(rate) = self.rate {
            config.risk_free_rate = rate;
        }
        if let Some(volatility) = self.volatility {
            config.volatility = volatility;
        }
        if let Some(paths) = self.paths {
            config.num_paths = paths;
        }
        if let Some(seed) = self.seed {
            config.seed = Some(seed);
        }
        if let Some(pairing) = self.pairing {
            config.pairing = pairing.into();
        }
        if self.skip_non_options {
            config.skip_non_option_rows = true;
        }
        config.validate()?;
        Ok(config)
    }
}
