//! Flight settlement.
//!
//! Turns the leg totals and the settled expense total of a flight into its
//! profit/loss outcome:
//!
//! ```text
//! total_income   = total_payment + total_given_budget
//! net_profit     = total_income - total_expenses
//! driver_profit  = net_profit > 0 ? trunc(net_profit * percent / 100) : 0
//! driver_owes    = net_profit - driver_profit
//! ```
//!
//! The given budget is cash the driver holds on behalf of the business: it is
//! income for the business ledger and, when unspent, ends up in
//! `driver_owes`. A negative `driver_owes` means the business owes the driver.

use rust_decimal::{Decimal, prelude::ToPrimitive};
use serde::{Deserialize, Serialize};

use crate::{EngineError, LegTotals, ResultEngine};

/// Outcome of a flight, frozen when the flight completes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    pub total_income_minor: i64,
    pub total_expenses_minor: i64,
    pub net_profit_minor: i64,
    pub driver_profit_percent: Decimal,
    pub driver_profit_minor: i64,
    pub driver_owes_minor: i64,
}

/// Rejects a profit share outside `[0, 100]`.
pub fn validate_percent(percent: Decimal) -> ResultEngine<()> {
    if percent < Decimal::ZERO || percent > Decimal::ONE_HUNDRED {
        return Err(EngineError::Validation(format!(
            "driver_profit_percent must be within [0, 100], got {percent}"
        )));
    }
    Ok(())
}

/// Computes the settlement of a flight.
///
/// `total_expenses_minor` must only contain flight-scoped expenses with
/// timing `during` or `after`.
pub fn settle(
    totals: LegTotals,
    total_expenses_minor: i64,
    driver_profit_percent: Decimal,
) -> ResultEngine<Settlement> {
    validate_percent(driver_profit_percent)?;
    let overflow = || EngineError::InvalidAmount("settlement overflow".to_string());

    let total_income_minor = totals
        .total_payment_minor
        .checked_add(totals.total_given_budget_minor)
        .ok_or_else(overflow)?;
    let net_profit_minor = total_income_minor
        .checked_sub(total_expenses_minor)
        .ok_or_else(overflow)?;

    let driver_profit_minor = if net_profit_minor > 0 {
        (Decimal::from(net_profit_minor) * driver_profit_percent / Decimal::ONE_HUNDRED)
            .trunc()
            .to_i64()
            .ok_or_else(overflow)?
    } else {
        0
    };

    Ok(Settlement {
        total_income_minor,
        total_expenses_minor,
        net_profit_minor,
        driver_profit_percent,
        driver_profit_minor,
        driver_owes_minor: net_profit_minor - driver_profit_minor,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn totals(payment: i64, budget: i64) -> LegTotals {
        LegTotals {
            total_payment_minor: payment,
            total_given_budget_minor: budget,
        }
    }

    #[test]
    fn single_leg_with_expense() {
        let s = settle(totals(500_000, 200_000), 300_000, Decimal::from(30)).unwrap();
        assert_eq!(s.total_income_minor, 700_000);
        assert_eq!(s.total_expenses_minor, 300_000);
        assert_eq!(s.net_profit_minor, 400_000);
        assert_eq!(s.driver_profit_minor, 120_000);
        assert_eq!(s.driver_owes_minor, 280_000);
    }

    #[test]
    fn loss_gives_no_profit_share() {
        let s = settle(totals(500_000, 200_000), 800_000, Decimal::from(30)).unwrap();
        assert_eq!(s.net_profit_minor, -100_000);
        assert_eq!(s.driver_profit_minor, 0);
        assert_eq!(s.driver_owes_minor, -100_000);

        let s = settle(totals(100, 0), 100, Decimal::from(50)).unwrap();
        assert_eq!(s.net_profit_minor, 0);
        assert_eq!(s.driver_profit_minor, 0);
        assert_eq!(s.driver_owes_minor, 0);
    }

    #[test]
    fn truncates_without_drift() {
        for (net, pct) in [(1_i64, "33.3"), (999, "12.5"), (100_001, "66.67"), (7, "99.99")] {
            let pct: Decimal = pct.parse().unwrap();
            let s = settle(totals(net, 0), 0, pct).unwrap();
            assert_eq!(s.driver_profit_minor + s.driver_owes_minor, s.net_profit_minor);
            assert!(Decimal::from(s.driver_profit_minor) <= Decimal::from(net) * pct / Decimal::ONE_HUNDRED);
        }
        let s = settle(totals(999, 0), 0, "12.5".parse().unwrap()).unwrap();
        assert_eq!(s.driver_profit_minor, 124);
    }

    #[test]
    fn percent_bounds() {
        assert!(settle(totals(1, 0), 0, Decimal::ZERO).is_ok());
        assert!(settle(totals(1, 0), 0, Decimal::ONE_HUNDRED).is_ok());
        assert!(matches!(
            settle(totals(1, 0), 0, Decimal::from(101)),
            Err(EngineError::Validation(_))
        ));
        assert!(matches!(
            settle(totals(1, 0), 0, Decimal::from(-1)),
            Err(EngineError::Validation(_))
        ));
    }
}
