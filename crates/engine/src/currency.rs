//! Currencies and conversion to the base currency.
//!
//! Every monetary value the engine aggregates is expressed as an `i64` number
//! of **minor units** of the configured base currency. Expenses may be entered
//! in another currency together with the exchange rate valid at entry time;
//! [`to_base`] turns that pair into the base amount exactly once and the result
//! is stored next to the original values. Rates are never looked up: they are
//! always supplied by the caller, so a conversion is reproducible.

use rust_decimal::{Decimal, RoundingStrategy, prelude::ToPrimitive};
use serde::{Deserialize, Serialize};

use crate::{EngineError, ResultEngine};

/// ISO currency code of an amount.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    Uzs,
    Usd,
    Eur,
    Rub,
    Kzt,
}

impl Currency {
    /// Canonical currency code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Currency::Uzs => "UZS",
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
            Currency::Rub => "RUB",
            Currency::Kzt => "KZT",
        }
    }
}

impl core::fmt::Display for Currency {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.code())
    }
}

impl TryFrom<&str> for Currency {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_uppercase().as_str() {
            "UZS" => Ok(Currency::Uzs),
            "USD" => Ok(Currency::Usd),
            "EUR" => Ok(Currency::Eur),
            "RUB" => Ok(Currency::Rub),
            "KZT" => Ok(Currency::Kzt),
            other => Err(EngineError::Validation(format!(
                "unsupported currency: {other}"
            ))),
        }
    }
}

/// Converts `amount_minor` into base-currency minor units.
///
/// `base = round(amount_minor × exchange_rate)`, rounding half away from zero.
///
/// Fails with [`EngineError::InvalidAmount`] when the amount or the rate is not
/// strictly positive, when the result rounds to zero, or when it does not fit
/// an `i64`.
pub fn to_base(amount_minor: i64, exchange_rate: Decimal) -> ResultEngine<i64> {
    if amount_minor <= 0 {
        return Err(EngineError::InvalidAmount(
            "amount_minor must be > 0".to_string(),
        ));
    }
    if exchange_rate <= Decimal::ZERO {
        return Err(EngineError::InvalidAmount(
            "exchange_rate must be > 0".to_string(),
        ));
    }

    let overflow = || EngineError::InvalidAmount("converted amount too large".to_string());
    let base_minor = Decimal::from(amount_minor)
        .checked_mul(exchange_rate)
        .ok_or_else(overflow)?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .ok_or_else(overflow)?;
    if base_minor == 0 {
        return Err(EngineError::InvalidAmount(format!(
            "{amount_minor} at rate {exchange_rate} is below one base minor unit"
        )));
    }
    Ok(base_minor)
}

/// Picks the rate to freeze into an entry in `currency`.
///
/// Amounts already in the base currency use a rate of exactly `1`, which may
/// be omitted. Any other currency needs an explicit rate.
pub(crate) fn resolve_rate(
    currency: Currency,
    base: Currency,
    exchange_rate: Option<Decimal>,
) -> ResultEngine<Decimal> {
    match exchange_rate {
        None if currency == base => Ok(Decimal::ONE),
        None => Err(EngineError::Validation(format!(
            "exchange_rate is required for amounts in {currency}"
        ))),
        Some(rate) if currency == base && rate != Decimal::ONE => {
            Err(EngineError::Validation(format!(
                "amounts in the base currency {base} must use exchange_rate = 1"
            )))
        }
        Some(rate) => Ok(rate),
    }
}
