//! Pivot conversion through the base currency.
//!
//! `result = round(amount * rate[from] / rate[to], 4)`, where every rate is
//! base currency per one unit. Rounding is half-to-even (banker's rounding):
//! `1.00005 -> 1.0000`, `1.00015 -> 1.0002`. Trailing zeros are dropped
//! from results, so `17.2050` is reported as `17.205`.

use std::fmt;
use std::str::FromStr;

use fxrates_common::Currency;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::error::{FxError, FxResult};
use crate::snapshot::RateSnapshot;

/// Decimal places kept in conversion results.
pub const RESULT_DECIMAL_PLACES: u32 = 4;

/// Rounding applied to conversion results.
pub const RESULT_ROUNDING: RoundingStrategy = RoundingStrategy::MidpointNearestEven;

/// Smallest positive amount a `Decimal` holds (`1e-28`).
pub const MIN_AMOUNT: Decimal = Decimal::from_parts(1, 0, 0, false, 28);

/// A completed conversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversion {
    /// Input amount.
    pub amount: Decimal,
    pub from: Currency,
    pub to: Currency,
    /// Output amount, rounded.
    pub result: Decimal,
    /// Source date of the rates used.
    pub source_date: String,
}

impl Conversion {
    /// Get the effective rate used.
    pub fn effective_rate(&self) -> Decimal {
        if self.amount.is_zero() {
            return Decimal::ZERO;
        }
        self.result / self.amount
    }
}

impl fmt::Display for Conversion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} = {} {}", self.amount, self.from, self.result, self.to)
    }
}

/// Exact decimal for a float, via its shortest round-tripping text.
///
/// `None` for NaN, infinities and magnitudes `Decimal` cannot hold.
pub fn decimal_from_f64(value: f64) -> Option<Decimal> {
    if !value.is_finite() {
        return None;
    }
    Decimal::from_str(&value.to_string()).ok()
}

/// Check a float amount and lift it into a decimal.
///
/// Positive amounts below [`MIN_AMOUNT`] are raised to it; they convert to
/// zero after rounding either way. Amounts above `Decimal::MAX` are rejected
/// as out of range.
pub fn validate_amount(amount: f64) -> FxResult<Decimal> {
    if !amount.is_finite() {
        return Err(FxError::InvalidAmount(format!("{} is not a finite number", amount)));
    }
    if amount <= 0.0 {
        return Err(FxError::InvalidAmount(format!(
            "amount must be greater than zero, got {}",
            amount
        )));
    }

    let value = decimal_from_f64(amount).ok_or_else(|| {
        FxError::AmountOutOfRange(format!("{} exceeds the largest supported amount {}", amount, Decimal::MAX))
    })?;
    Ok(value.max(MIN_AMOUNT))
}

/// Check a decimal amount.
pub fn validate_decimal_amount(amount: Decimal) -> FxResult<Decimal> {
    if amount <= Decimal::ZERO {
        return Err(FxError::InvalidAmount(format!(
            "amount must be greater than zero, got {}",
            amount
        )));
    }
    Ok(amount)
}

/// Convert through the pivot: `amount * from_rate / to_rate`, rounded.
pub fn pivot_convert(amount: Decimal, from_rate: Decimal, to_rate: Decimal) -> FxResult<Decimal> {
    let in_base = amount
        .checked_mul(from_rate)
        .ok_or_else(|| FxError::AmountOutOfRange(format!("{} is too large to convert", amount)))?;

    let result = in_base
        .checked_div(to_rate)
        .ok_or_else(|| FxError::AmountOutOfRange(format!("{} is too large to convert", amount)))?;

    Ok(result
        .round_dp_with_strategy(RESULT_DECIMAL_PLACES, RESULT_ROUNDING)
        .normalize())
}

/// Convert `amount` of `from` into `to` using the snapshot's rates.
///
/// The amount is validated before the currencies. Every code missing from
/// the snapshot is named in the error.
pub fn convert(
    snapshot: &RateSnapshot,
    amount: Decimal,
    from: &Currency,
    to: &Currency,
) -> FxResult<Conversion> {
    let amount = validate_decimal_amount(amount)?;

    let (from_rate, to_rate) = match (snapshot.rate(from), snapshot.rate(to)) {
        (Some(f), Some(t)) => (f, t),
        (f, t) => {
            let mut missing = Vec::new();
            if f.is_none() {
                missing.push(from.clone());
            }
            if t.is_none() && from != to {
                missing.push(to.clone());
            }
            return Err(FxError::CurrencyNotFound { missing });
        }
    };

    let result = pivot_convert(amount, from_rate, to_rate)?;

    Ok(Conversion {
        amount,
        from: from.clone(),
        to: to.clone(),
        result,
        source_date: snapshot.source_date().to_string(),
    })
}
