use rand::Rng;
use tracing::{debug, info};

use crate::calibration::parity::SpotCalibration;
use crate::config::PricingConfig;
use crate::error::OptmarkError;
use crate::market_data::quote::{PricedQuote, Quote};
use crate::monte_carlo::simulation::{price_european, McOptionInput};
use crate::OptmarkResult;

/// Mark one quote to the model at the given implied spot.
pub fn price_quote<R: Rng + ?Sized>(
    quote: &Quote,
    spot: f64,
    config: &PricingConfig,
    rng: &mut R,
) -> OptmarkResult<PricedQuote> {
    let input = McOptionInput {
        spot,
        strike: quote.strike_f64(),
        time_to_expiry: quote.time_to_expiry(),
        risk_free_rate: config.risk_free_rate,
        volatility: config.volatility,
        option_kind: quote.option_kind,
        num_paths: config.num_paths,
    };
    let estimate = price_european(&input, rng)?;
    Ok(PricedQuote::new(quote.clone(), spot, estimate.price))
}

/// Price every quote against its calibrated spot, preserving input order.
///
/// Every quote must have a calibrated key; calibration has to finish before
/// this is called. Quotes draw from `rng` one after another, so each gets
/// its own slice of the stream.
pub fn price_quotes<R: Rng + ?Sized>(
    quotes: &[Quote],
    calibration: &SpotCalibration,
    config: &PricingConfig,
    rng: &mut R,
) -> OptmarkResult<Vec<PricedQuote>> {
    config.validate()?;

    let mut priced = Vec::with_capacity(quotes.len());
    for quote in quotes {
        let key = quote.key();
        let spot = calibration.spot(&key).ok_or_else(|| OptmarkError::Calibration {
            key: key.to_string(),
            reason: "no implied spot for quote".into(),
        })?;
        let row = price_quote(quote, spot, config, rng)?;
        debug!(
            key = %key,
            kind = %quote.option_kind,
            model_price = row.model_price,
            diff = row.price_difference,
            "priced quote"
        );
        priced.push(row);
    }
    info!(rows = priced.len(), paths = config.num_paths, "pricing complete");
    Ok(priced)
}
