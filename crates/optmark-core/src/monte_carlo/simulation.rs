use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use statrs::distribution::Normal;

use crate::error::OptmarkError;
use crate::types::{OptionKind, Rate, Years};
use crate::OptmarkResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Input for a single European option valuation by simulation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McOptionInput {
    pub spot: f64,
    pub strike: f64,
    pub time_to_expiry: Years,
    pub risk_free_rate: Rate,
    pub volatility: Rate,
    pub option_kind: OptionKind,
    /// Number of simulated terminal prices (at least 1).
    #[serde(default = "crate::config::default_num_paths")]
    pub num_paths: u32,
}

/// Discounted payoff mean and its sampling error.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct McEstimate {
    pub price: f64,
    /// Standard error of `price`; shrinks like `1/sqrt(num_paths)`.
    /// NaN for a single path, where the sample variance is undefined.
    pub std_error: f64,
    pub num_paths: u32,
}

// ---------------------------------------------------------------------------
// Random source
// ---------------------------------------------------------------------------

/// Seeded generator when `seed` is given, otherwise seeded from OS entropy.
pub fn new_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(input: &McOptionInput) -> OptmarkResult<()> {
    if input.num_paths == 0 {
        return Err(OptmarkError::InvalidInput {
            field: "num_paths".into(),
            reason: "must be at least 1".into(),
        });
    }
    if !input.spot.is_finite() || input.spot <= 0.0 {
        return Err(OptmarkError::InvalidInput {
            field: "spot".into(),
            reason: "must be positive".into(),
        });
    }
    if !input.strike.is_finite() || input.strike <= 0.0 {
        return Err(OptmarkError::InvalidInput {
            field: "strike".into(),
            reason: "must be positive".into(),
        });
    }
    if !input.time_to_expiry.is_finite() || input.time_to_expiry <= 0.0 {
        return Err(OptmarkError::InvalidInput {
            field: "time_to_expiry".into(),
            reason: "must be positive".into(),
        });
    }
    if !input.volatility.is_finite() || input.volatility <= 0.0 {
        return Err(OptmarkError::InvalidInput {
            field: "volatility".into(),
            reason: "must be positive".into(),
        });
    }
    if !input.risk_free_rate.is_finite() {
        return Err(OptmarkError::InvalidInput {
            field: "risk_free_rate".into(),
            reason: "must be finite".into(),
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Simulation
// ---------------------------------------------------------------------------

/// Terminal price of one GBM path under the risk-neutral measure, given a
/// standard normal draw `z`.
pub fn terminal_price(spot: f64, rate: Rate, volatility: Rate, t: Years, z: f64) -> f64 {
    spot * ((rate - 0.5 * volatility * volatility) * t + volatility * t.sqrt() * z).exp()
}

/// Vanilla exercise value at expiry.
pub fn payoff(kind: OptionKind, terminal: f64, strike: f64) -> f64 {
    match kind {
        OptionKind::Call => (terminal - strike).max(0.0),
        OptionKind::Put => (strike - terminal).max(0.0),
    }
}

/// Price a European option as the discounted mean payoff over `num_paths`
/// independent terminal prices drawn from `rng`.
///
/// Single-step GBM with no variance reduction. The result is deterministic
/// only when `rng` is.
pub fn price_european<R: Rng + ?Sized>(input: &McOptionInput, rng: &mut R) -> OptmarkResult<McEstimate> {
    validate(input)?;

    let std_normal = Normal::new(0.0, 1.0).map_err(|e| OptmarkError::InvalidInput {
        field: "distribution".into(),
        reason: format!("Invalid Normal parameters: {e}"),
    })?;

    let (t, r) = (input.time_to_expiry, input.risk_free_rate);

    let mut sum = 0.0_f64;
    let mut sum_sq = 0.0_f64;
    for _ in 0..input.num_paths {
        let z: f64 = rng.sample(std_normal);
        let s_t = terminal_price(input.spot, r, input.volatility, t, z);
        let pay = payoff(input.option_kind, s_t, input.strike);
        sum += pay;
        sum_sq += pay * pay;
    }

    let n = input.num_paths as f64;
    let mean = sum / n;
    let discount = (-r * t).exp();
    let std_error = if input.num_paths > 1 {
        // Sample variance of the undiscounted payoff
        let variance = ((sum_sq - n * mean * mean) / (n - 1.0)).max(0.0);
        discount * (variance / n).sqrt()
    } else {
        f64::NAN
    };

    Ok(McEstimate {
        price: discount * mean,
        std_error,
        num_paths: input.num_paths,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const SEED: u64 = 42;

    fn atm_call(num_paths: u32) -> McOptionInput {
        McOptionInput {
            spot: 100.0,
            strike: 100.0,
            time_to_expiry: 1.0,
            risk_free_rate: 0.05,
            volatility: 0.2,
            option_kind: OptionKind::Call,
            num_paths,
        }
    }

    // Black-Scholes ATM call, S=K=100, T=1, r=5%, sigma=20%
    const BS_ATM_CALL: f64 = 10.450_583_572_185_565;

    #[test]
    fn test_seeded_reproducibility() {
        let input = atm_call(1_000);
        let a = price_european(&input, &mut StdRng::seed_from_u64(SEED)).unwrap();
        let b = price_european(&input, &mut StdRng::seed_from_u64(SEED)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_different_seeds_differ() {
        let input = atm_call(1_000);
        let a = price_european(&input, &mut StdRng::seed_from_u64(1)).unwrap();
        let b = price_european(&input, &mut StdRng::seed_from_u64(2)).unwrap();
        assert_ne!(a.price, b.price);
    }

    #[test]
    fn test_close_to_black_scholes() {
        let est = price_european(&atm_call(200_000), &mut StdRng::seed_from_u64(SEED)).unwrap();
        // 4 standard errors
        assert!(
            (est.price - BS_ATM_CALL).abs() < 4.0 * est.std_error,
            "price={} se={}",
            est.price,
            est.std_error
        );
        assert!(est.std_error < 0.05, "se={}", est.std_error);
    }

    #[test]
    fn test_std_error_shrinks_with_paths() {
        let small = price_european(&atm_call(1_000), &mut StdRng::seed_from_u64(SEED)).unwrap();
        let large = price_european(&atm_call(100_000), &mut StdRng::seed_from_u64(SEED)).unwrap();
        // 100x paths -> roughly 10x smaller error
        let ratio = small.std_error / large.std_error;
        assert!(ratio > 7.0 && ratio < 13.0, "ratio={ratio}");
    }

    #[test]
    fn test_put_non_negative_and_plausible() {
        let mut input = atm_call(50_000);
        input.option_kind = OptionKind::Put;
        let est = price_european(&input, &mut StdRng::seed_from_u64(SEED)).unwrap();
        // BS put = call - S + K e^{-rT} ≈ 5.5735
        assert!(est.price >= 0.0);
        assert!((est.price - 5.5735).abs() < 0.2, "put={}", est.price);
    }

    #[test]
    fn test_deep_otm_call_is_zero_but_not_negative() {
        let mut input = atm_call(1_000);
        input.strike = 10_000.0;
        input.time_to_expiry = 1.0 / 365.0;
        let est = price_european(&input, &mut StdRng::seed_from_u64(SEED)).unwrap();
        assert_eq!(est.price, 0.0);
        assert_eq!(est.std_error, 0.0);
    }

    #[test]
    fn test_deep_itm_put_near_intrinsic() {
        let input = McOptionInput {
            spot: 50.0,
            strike: 100.0,
            time_to_expiry: 1.0 / 365.0,
            risk_free_rate: 0.05,
            volatility: 0.2,
            option_kind: OptionKind::Put,
            num_paths: 1_000,
        };
        let est = price_european(&input, &mut StdRng::seed_from_u64(SEED)).unwrap();
        let forward_intrinsic = 100.0 * (-0.05_f64 / 365.0).exp() - 50.0;
        assert!((est.price - forward_intrinsic).abs() < 0.1, "put={}", est.price);
    }

    #[test]
    fn test_terminal_price_zero_shock() {
        let s = terminal_price(100.0, 0.05, 0.2, 1.0, 0.0);
        assert!((s - 100.0 * (0.05_f64 - 0.02).exp()).abs() < 1e-12);
    }

    #[test]
    fn test_payoff() {
        assert_eq!(payoff(OptionKind::Call, 110.0, 100.0), 10.0);
        assert_eq!(payoff(OptionKind::Call, 90.0, 100.0), 0.0);
        assert_eq!(payoff(OptionKind::Put, 90.0, 100.0), 10.0);
        assert_eq!(payoff(OptionKind::Put, 110.0, 100.0), 0.0);
    }

    #[test]
    fn test_path_count_validation() {
        assert!(price_european(&atm_call(0), &mut StdRng::seed_from_u64(SEED)).is_err());
        assert!(price_european(&atm_call(50), &mut StdRng::seed_from_u64(SEED)).is_ok());
    }

    #[test]
    fn test_single_path_has_undefined_std_error() {
        let est = price_european(&atm_call(1), &mut StdRng::seed_from_u64(SEED)).unwrap();
        assert!(est.price >= 0.0);
        assert!(est.price.is_finite());
        assert!(est.std_error.is_nan());
        assert_eq!(est.num_paths, 1);
    }

    #[test]
    fn test_single_path_matches_one_terminal_draw() {
        let input = atm_call(1);
        let est = price_european(&input, &mut StdRng::seed_from_u64(SEED)).unwrap();

        let mut rng = StdRng::seed_from_u64(SEED);
        let z: f64 = rng.sample(Normal::new(0.0, 1.0).unwrap());
        let s_t = terminal_price(100.0, 0.05, 0.2, 1.0, z);
        let expected = (-0.05_f64).exp() * payoff(OptionKind::Call, s_t, 100.0);
        assert!((est.price - expected).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_parameters() {
        let mut rng = StdRng::seed_from_u64(SEED);
        let mut input = atm_call(1_000);
        input.volatility = 0.0;
        assert!(price_european(&input, &mut rng).is_err());

        let mut input = atm_call(1_000);
        input.spot = -1.0;
        assert!(price_european(&input, &mut rng).is_err());

        let mut input = atm_call(1_000);
        input.time_to_expiry = 0.0;
        assert!(price_european(&input, &mut rng).is_err());

        let mut input = atm_call(1_000);
        input.risk_free_rate = f64::INFINITY;
        assert!(price_european(&input, &mut rng).is_err());
    }
}
