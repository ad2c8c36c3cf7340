pub mod calibration;
pub mod config;
pub mod error;
pub mod market_data;
pub mod time_value;
pub mod types;

#[cfg(feature = "analytic")]
pub mod analytic;

#[cfg(feature = "monte_carlo")]
pub mod monte_carlo;

#[cfg(feature = "monte_carlo")]
pub mod pricing;

#[cfg(feature = "pipeline")]
pub mod pipeline;

pub use config::PricingConfig;
pub use error::OptmarkError;
pub use types::*;

/// Standard result type for all optmark operations
pub type OptmarkResult<T> = Result<T, OptmarkError>;
