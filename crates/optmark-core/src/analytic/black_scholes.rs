use statrs::distribution::{ContinuousCDF, Normal};

use crate::error::OptmarkError;
use crate::types::{OptionKind, Rate, Years};
use crate::OptmarkResult;

/// Closed-form Black-Scholes price of a European option without dividends.
///
/// Used as the convergence reference for the Monte Carlo engine.
pub fn black_scholes_price(
    spot: f64,
    strike: f64,
    t: Years,
    rate: Rate,
    volatility: Rate,
    kind: OptionKind,
) -> OptmarkResult<f64> {
    for (field, value) in [
        ("spot", spot),
        ("strike", strike),
        ("time_to_expiry", t),
        ("volatility", volatility),
    ] {
        if !value.is_finite() || value <= 0.0 {
            return Err(OptmarkError::InvalidInput {
                field: field.into(),
                reason: "must be positive".into(),
            });
        }
    }
    if !rate.is_finite() {
        return Err(OptmarkError::InvalidInput {
            field: "risk_free_rate".into(),
            reason: "must be finite".into(),
        });
    }

    let n = Normal::new(0.0, 1.0).map_err(|e| OptmarkError::InvalidInput {
        field: "distribution".into(),
        reason: format!("Invalid Normal parameters: {e}"),
    })?;

    let sigma_sqrt_t = volatility * t.sqrt();
    let d1 = ((spot / strike).ln() + (rate + 0.5 * volatility * volatility) * t) / sigma_sqrt_t;
    let d2 = d1 - sigma_sqrt_t;
    let df = (-rate * t).exp();

    let price = match kind {
        OptionKind::Call => spot * n.cdf(d1) - strike * df * n.cdf(d2),
        OptionKind::Put => strike * df * n.cdf(-d2) - spot * n.cdf(-d1),
    };
    Ok(price.max(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_atm_reference_values() {
        let c = black_scholes_price(100.0, 100.0, 1.0, 0.05, 0.2, OptionKind::Call).unwrap();
        let p = black_scholes_price(100.0, 100.0, 1.0, 0.05, 0.2, OptionKind::Put).unwrap();
        assert!((c - 10.4506).abs() < 1e-4, "call={c}");
        assert!((p - 5.5735).abs() < 1e-4, "put={p}");
    }

    #[test]
    fn test_put_call_parity_holds() {
        let (s, k, t, r, v) = (104.59, 100.0, 30.0 / 365.0, 0.05, 0.2);
        let c = black_scholes_price(s, k, t, r, v, OptionKind::Call).unwrap();
        let p = black_scholes_price(s, k, t, r, v, OptionKind::Put).unwrap();
        assert!((c - p - (s - k * (-r * t).exp())).abs() < 1e-9);
    }

    #[test]
    fn test_short_dated_itm_call() {
        // S=104.59, K=100, 30 days: mostly intrinsic plus a little time value
        let c = black_scholes_price(104.59, 100.0, 30.0 / 365.0, 0.05, 0.2, OptionKind::Call).unwrap();
        assert!(c > 4.99 && c < 6.5, "call={c}");
    }

    #[test]
    fn test_rejects_degenerate_inputs() {
        assert!(black_scholes_price(0.0, 100.0, 1.0, 0.05, 0.2, OptionKind::Call).is_err());
        assert!(black_scholes_price(100.0, 100.0, 0.0, 0.05, 0.2, OptionKind::Call).is_err());
        assert!(black_scholes_price(100.0, 100.0, 1.0, 0.05, 0.0, OptionKind::Put).is_err());
        assert!(black_scholes_price(100.0, 100.0, 1.0, f64::NAN, 0.2, OptionKind::Put).is_err());
    }
}
