use serde::{Deserialize, Serialize};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use tracing::{debug, info};

use crate::error::OptmarkError;
use crate::market_data::quote::{CalibrationKey, Quote};
use crate::time_value::discount_factor;
use crate::types::{OptionKind, Rate, Years};
use crate::OptmarkResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// How calls are matched with their puts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PairingMode {
    /// Group by key; each key needs exactly one call and one put, in any order.
    #[default]
    Keyed,
    /// Consecutive rows form (call, put) pairs in input order.
    Positional,
}

/// Spot implied by one call/put pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImpliedSpot {
    pub key: CalibrationKey,
    pub spot: f64,
    /// Floored year fraction taken from the call leg.
    pub time_to_expiry: Years,
}

/// Implied spots for a batch, in the order their keys were first seen.
#[derive(Debug, Clone, Default)]
pub struct SpotCalibration {
    entries: Vec<ImpliedSpot>,
    index: HashMap<CalibrationKey, usize>,
}

impl SpotCalibration {
    fn insert(&mut self, entry: ImpliedSpot) -> OptmarkResult<()> {
        if self.index.contains_key(&entry.key) {
            return Err(OptmarkError::Calibration {
                key: entry.key.to_string(),
                reason: "key calibrated more than once".into(),
            });
        }
        self.index.insert(entry.key.clone(), self.entries.len());
        self.entries.push(entry);
        Ok(())
    }

    pub fn spot(&self, key: &CalibrationKey) -> Option<f64> {
        self.index.get(key).map(|&i| self.entries[i].spot)
    }

    pub fn get(&self, key: &CalibrationKey) -> Option<&ImpliedSpot> {
        self.index.get(key).map(|&i| &self.entries[i])
    }

    pub fn entries(&self) -> &[ImpliedSpot] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CalibrationKey, f64)> {
        self.entries.iter().map(|e| (&e.key, e.spot))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Parity
// ---------------------------------------------------------------------------

/// Solve put-call parity `C - P = S - K·e^(-rT)` for `S` (no dividends).
pub fn implied_spot(call_price: f64, put_price: f64, strike: f64, rate: Rate, t: Years) -> OptmarkResult<f64> {
    Ok(call_price - put_price + strike * discount_factor(rate, t)?)
}

fn calibrate_pair(call: &Quote, put: &Quote, rate: Rate) -> OptmarkResult<ImpliedSpot> {
    let key = call.key();
    let t = call.time_to_expiry();
    let spot = implied_spot(call.close_f64(), put.close_f64(), call.strike_f64(), rate, t)?;

    if !spot.is_finite() || spot <= 0.0 {
        return Err(OptmarkError::Calibration {
            key: key.to_string(),
            reason: format!(
                "implied spot {spot} is not positive (call close {}, put close {})",
                call.close_price, put.close_price
            ),
        });
    }

    debug!(key = %key, spot, t, "calibrated implied spot");
    Ok(ImpliedSpot {
        key,
        spot,
        time_to_expiry: t,
    })
}

// ---------------------------------------------------------------------------
// Pairing
// ---------------------------------------------------------------------------

/// Call and put seen for one key. Always holds at least the leg that opened it.
struct Legs<'a> {
    call: Option<&'a Quote>,
    put: Option<&'a Quote>,
}

impl<'a> Legs<'a> {
    fn opened_by(quote: &'a Quote) -> Self {
        match quote.option_kind {
            OptionKind::Call => Legs { call: Some(quote), put: None },
            OptionKind::Put => Legs { call: None, put: Some(quote) },
        }
    }

    fn add(&mut self, quote: &'a Quote) -> OptmarkResult<()> {
        let slot = match quote.option_kind {
            OptionKind::Call => &mut self.call,
            OptionKind::Put => &mut self.put,
        };
        if slot.is_some() {
            return Err(OptmarkError::Calibration {
                key: quote.key().to_string(),
                reason: format!("more than one {} quote", quote.option_kind),
            });
        }
        *slot = Some(quote);
        Ok(())
    }
}

fn pair_keyed(quotes: &[Quote], rate: Rate) -> OptmarkResult<SpotCalibration> {
    let mut order: Vec<CalibrationKey> = Vec::new();
    let mut groups: HashMap<CalibrationKey, Legs<'_>> = HashMap::new();

    for q in quotes {
        match groups.entry(q.key()) {
            Entry::Occupied(mut group) => group.get_mut().add(q)?,
            Entry::Vacant(slot) => {
                order.push(slot.key().clone());
                slot.insert(Legs::opened_by(q));
            }
        }
    }

    let mut calibration = SpotCalibration::default();
    for key in order {
        let legs = &groups[&key];
        match (legs.call, legs.put) {
            (Some(call), Some(put)) => calibration.insert(calibrate_pair(call, put, rate)?)?,
            (Some(_), None) => {
                return Err(OptmarkError::Calibration {
                    key: key.to_string(),
                    reason: "call has no matching put".into(),
                })
            }
            (None, _) => {
                return Err(OptmarkError::Calibration {
                    key: key.to_string(),
                    reason: "put has no matching call".into(),
                })
            }
        }
    }
    Ok(calibration)
}

fn pair_positional(quotes: &[Quote], rate: Rate) -> OptmarkResult<SpotCalibration> {
    let mut calibration = SpotCalibration::default();
    let mut pairs = quotes.chunks_exact(2);

    for pair in pairs.by_ref() {
        let (call, put) = (&pair[0], &pair[1]);
        if call.option_kind != OptionKind::Call || put.option_kind != OptionKind::Put {
            return Err(OptmarkError::Calibration {
                key: call.key().to_string(),
                reason: format!(
                    "positional pair must be (Call, Put), found ({}, {})",
                    call.option_kind, put.option_kind
                ),
            });
        }
        if call.key() != put.key() {
            return Err(OptmarkError::Calibration {
                key: call.key().to_string(),
                reason: format!("next row belongs to a different key ({})", put.key()),
            });
        }
        calibration.insert(calibrate_pair(call, put, rate)?)?;
    }

    if let Some(trailing) = pairs.remainder().first() {
        return Err(OptmarkError::Calibration {
            key: trailing.key().to_string(),
            reason: "unmatched trailing quote (odd number of rows)".into(),
        });
    }
    Ok(calibration)
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Build the implied spot for every call/put pair in the batch.
///
/// Each key must resolve to exactly one call and one put; anything else is a
/// calibration error naming the key. The parity time horizon comes from the
/// call leg.
pub fn calibrate_spots(quotes: &[Quote], rate: Rate, mode: PairingMode) -> OptmarkResult<SpotCalibration> {
    let calibration = match mode {
        PairingMode::Keyed => pair_keyed(quotes, rate)?,
        PairingMode::Positional => pair_positional(quotes, rate)?,
    };
    info!(pairs = calibration.len(), mode = ?mode, "spot calibration complete");
    Ok(calibration)
}
