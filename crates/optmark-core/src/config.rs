use serde::{Deserialize, Serialize};

use crate::error::OptmarkError;
use crate::market_data::loader::LoadOptions;
use crate::types::Rate;
use crate::OptmarkResult;

pub use crate::calibration::parity::PairingMode;

fn default_risk_free_rate() -> Rate {
    0.05
}

fn default_volatility() -> Rate {
    0.20
}

pub(crate) fn default_num_paths() -> u32 {
    1_000
}

/// Model parameters and batch policy for one pricing run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PricingConfig {
    /// Continuously compounded risk-free rate.
    #[serde(default = "default_risk_free_rate")]
    pub risk_free_rate: Rate,
    /// Flat annualized volatility used for every quote.
    #[serde(default = "default_volatility")]
    pub volatility: Rate,
    /// Simulated paths per quote.
    #[serde(default = "default_num_paths")]
    pub num_paths: u32,
    /// Fixes the random stream; `None` draws a fresh seed from OS entropy.
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub pairing: PairingMode,
    /// Drop non-CE/PE rows at load time instead of failing.
    #[serde(default)]
    pub skip_non_option_rows: bool,
}

impl Default for PricingConfig {
    fn default() -> Self {
        PricingConfig {
            risk_free_rate: default_risk_free_rate(),
            volatility: default_volatility(),
            num_paths: default_num_paths(),
            seed: None,
            pairing: PairingMode::default(),
            skip_non_option_rows: false,
        }
    }
}

impl PricingConfig {
    pub fn validate(&self) -> OptmarkResult<()> {
        if !self.risk_free_rate.is_finite() {
            return Err(OptmarkError::InvalidInput {
                field: "risk_free_rate".into(),
                reason: "must be finite".into(),
            });
        }
        if !self.volatility.is_finite() || self.volatility <= 0.0 {
            return Err(OptmarkError::InvalidInput {
                field: "volatility".into(),
                reason: "must be positive".into(),
            });
        }
        if self.num_paths == 0 {
            return Err(OptmarkError::InvalidInput {
                field: "num_paths".into(),
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }

    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            skip_non_option_rows: self.skip_non_option_rows,
        }
    }
}
