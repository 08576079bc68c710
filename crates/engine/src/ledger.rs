//! The expense ledger.
//!
//! Building, correcting and aggregating [`Expense`] entries. The functions
//! here validate the category/timing/quantity combination and normalize the
//! amount to the base currency; the mutability gate (finalized flights) is
//! checked by the owning aggregate before any of them is called.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    Currency, EngineError, Expense, ExpenseOwner, ExpensePatch, ExpenseTiming, NewExpense,
    ResultEngine,
    currency::{resolve_rate, to_base},
    util::normalize_optional_text,
};

/// Selects expenses for [`total_for`]. An empty filter matches everything.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExpenseFilter {
    pub leg_id: Option<Uuid>,
    pub timings: Vec<ExpenseTiming>,
}

impl ExpenseFilter {
    #[must_use]
    pub fn leg(mut self, leg_id: Uuid) -> Self {
        self.leg_id = Some(leg_id);
        self
    }

    #[must_use]
    pub fn timing(mut self, timing: ExpenseTiming) -> Self {
        self.timings.push(timing);
        self
    }

    /// Expenses that enter a flight settlement.
    #[must_use]
    pub fn settled() -> Self {
        Self::default()
            .timing(ExpenseTiming::During)
            .timing(ExpenseTiming::After)
    }

    fn matches(&self, expense: &Expense) -> bool {
        if let Some(leg_id) = self.leg_id
            && expense.leg_id != Some(leg_id)
        {
            return false;
        }
        self.timings.is_empty() || self.timings.contains(&expense.timing)
    }
}

/// Sums the base-currency amounts of the expenses matching `filter`.
///
/// Fails with [`EngineError::InvalidAmount`] when the sum does not fit an `i64`.
pub fn total_for(expenses: &[Expense], filter: &ExpenseFilter) -> ResultEngine<i64> {
    expenses
        .iter()
        .filter(|expense| filter.matches(expense))
        .try_fold(0_i64, |acc, expense| {
            acc.checked_add(expense.base_amount_minor)
                .ok_or_else(|| EngineError::InvalidAmount("expense total overflow".to_string()))
        })
}

/// Validates `input` and turns it into a stored entry for `owner`.
pub(crate) fn build_expense(
    owner: ExpenseOwner,
    input: NewExpense,
    base: Currency,
    now: DateTime<Utc>,
) -> ResultEngine<Expense> {
    let exchange_rate = resolve_rate(input.currency, base, input.exchange_rate)?;
    let base_amount_minor = to_base(input.amount_minor, exchange_rate)?;

    let expense = Expense {
        id: Uuid::now_v7(),
        owner,
        leg_id: input.leg_id,
        category: input.category,
        timing: input.timing,
        amount_minor: input.amount_minor,
        currency: input.currency,
        exchange_rate,
        base_amount_minor,
        quantity: input.quantity,
        odometer: input.odometer,
        description: normalize_optional_text(input.description.as_deref()),
        created_at: now,
        updated_at: now,
    };
    validate_shape(&expense)?;
    Ok(expense)
}

/// Applies `patch` to `expense`, re-normalizing the base amount when the
/// amount, currency or rate changed. On error `expense` is left untouched.
pub(crate) fn apply_patch(
    expense: &mut Expense,
    patch: ExpensePatch,
    base: Currency,
    now: DateTime<Utc>,
) -> ResultEngine<()> {
    let renormalize = patch.changes_amount();
    let mut candidate = expense.clone();

    if let Some(category) = patch.category {
        candidate.category = category;
    }
    if let Some(amount_minor) = patch.amount_minor {
        candidate.amount_minor = amount_minor;
    }
    // A new currency drops the stored rate.
    let rate = match (patch.currency, patch.exchange_rate) {
        (_, Some(rate)) => Some(rate),
        (Some(currency), None) if currency != expense.currency => None,
        _ => Some(expense.exchange_rate),
    };
    if let Some(currency) = patch.currency {
        candidate.currency = currency;
    }
    if let Some(leg_id) = patch.leg_id {
        candidate.leg_id = leg_id;
    }
    if let Some(quantity) = patch.quantity {
        candidate.quantity = quantity;
    }
    if let Some(odometer) = patch.odometer {
        candidate.odometer = odometer;
    }
    if let Some(description) = patch.description {
        candidate.description = normalize_optional_text(description.as_deref());
    }

    if renormalize {
        candidate.exchange_rate = resolve_rate(candidate.currency, base, rate)?;
        candidate.base_amount_minor = to_base(candidate.amount_minor, candidate.exchange_rate)?;
    }
    validate_shape(&candidate)?;

    candidate.updated_at = now;
    *expense = candidate;
    Ok(())
}

/// Removes the entry with `id`, returning it.
pub(crate) fn remove(expenses: &mut Vec<Expense>, id: Uuid) -> ResultEngine<Expense> {
    let index = expenses
        .iter()
        .position(|expense| expense.id == id)
        .ok_or_else(|| EngineError::KeyNotFound("expense not exists".to_string()))?;
    Ok(expenses.remove(index))
}

pub(crate) fn find_mut(expenses: &mut [Expense], id: Uuid) -> ResultEngine<&mut Expense> {
    expenses
        .iter_mut()
        .find(|expense| expense.id == id)
        .ok_or_else(|| EngineError::KeyNotFound("expense not exists".to_string()))
}

fn validate_shape(expense: &Expense) -> ResultEngine<()> {
    match (expense.owner, expense.timing) {
        (ExpenseOwner::Driver { .. }, ExpenseTiming::Before) => {}
        (ExpenseOwner::Driver { .. }, timing) => {
            return Err(EngineError::Validation(format!(
                "pocket expenses must have timing 'before', got '{}'",
                timing.as_str()
            )));
        }
        (ExpenseOwner::Flight { .. }, ExpenseTiming::Before) => {
            return Err(EngineError::Validation(
                "flight expenses must have timing 'during' or 'after'".to_string(),
            ));
        }
        (ExpenseOwner::Flight { .. }, _) => {}
    }

    if matches!(expense.owner, ExpenseOwner::Driver { .. }) && expense.leg_id.is_some() {
        return Err(EngineError::Validation(
            "pocket expenses cannot reference a leg".to_string(),
        ));
    }

    match (expense.category.unit(), expense.quantity) {
        (Some(_), None) => {
            return Err(EngineError::Validation(
                "fuel expenses require a quantity".to_string(),
            ));
        }
        (Some(_), Some(quantity)) if quantity <= Decimal::ZERO => {
            return Err(EngineError::Validation(
                "fuel quantity must be > 0".to_string(),
            ));
        }
        (None, Some(_)) => {
            return Err(EngineError::Validation(format!(
                "'{}' expenses cannot carry a quantity",
                expense.category.as_str()
            )));
        }
        _ => {}
    }

    if let Some(odometer) = expense.odometer
        && odometer < 0
    {
        return Err(EngineError::Validation(
            "odometer must be >= 0".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::{ExpenseCategory, FuelKind};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap()
    }

    fn flight_owner() -> ExpenseOwner {
        ExpenseOwner::Flight {
            flight_id: Uuid::new_v4(),
        }
    }

    fn driver_owner() -> ExpenseOwner {
        ExpenseOwner::Driver {
            driver_id: Uuid::new_v4(),
        }
    }

    fn diesel() -> ExpenseCategory {
        ExpenseCategory::Fuel {
            fuel: FuelKind::Diesel,
        }
    }

    #[test]
    fn build_normalizes_foreign_currency() {
        let input = NewExpense::new(diesel(), ExpenseTiming::During, 120_00, Currency::Usd)
            .exchange_rate("12650".parse().unwrap())
            .quantity("80.5".parse().unwrap());
        let expense = build_expense(flight_owner(), input, Currency::Uzs, now()).unwrap();
        assert_eq!(expense.base_amount_minor, 151_800_000);
        assert_eq!(expense.amount_minor, 120_00);
        assert_eq!(expense.created_at, now());
    }

    #[test]
    fn fuel_requires_positive_quantity() {
        let input = NewExpense::new(diesel(), ExpenseTiming::During, 1_000, Currency::Uzs);
        assert!(matches!(
            build_expense(flight_owner(), input.clone(), Currency::Uzs, now()),
            Err(EngineError::Validation(_))
        ));

        let input = input.quantity(Decimal::ZERO);
        assert!(matches!(
            build_expense(flight_owner(), input, Currency::Uzs, now()),
            Err(EngineError::Validation(_))
        ));
    }

    #[test]
    fn non_fuel_rejects_quantity() {
        let input = NewExpense::new(ExpenseCategory::Food, ExpenseTiming::During, 1_000, Currency::Uzs)
            .quantity(Decimal::ONE);
        assert!(matches!(
            build_expense(flight_owner(), input, Currency::Uzs, now()),
            Err(EngineError::Validation(_))
        ));
    }

    #[test]
    fn timing_must_match_owner() {
        let before = NewExpense::new(ExpenseCategory::Food, ExpenseTiming::Before, 1_000, Currency::Uzs);
        let during = NewExpense::new(ExpenseCategory::Food, ExpenseTiming::During, 1_000, Currency::Uzs);

        assert!(build_expense(driver_owner(), before.clone(), Currency::Uzs, now()).is_ok());
        assert!(build_expense(flight_owner(), during.clone(), Currency::Uzs, now()).is_ok());
        assert!(build_expense(driver_owner(), during, Currency::Uzs, now()).is_err());
        assert!(build_expense(flight_owner(), before, Currency::Uzs, now()).is_err());
    }

    #[test]
    fn rejects_non_positive_amount() {
        let input = NewExpense::new(ExpenseCategory::Toll, ExpenseTiming::During, 0, Currency::Uzs);
        assert!(matches!(
            build_expense(flight_owner(), input, Currency::Uzs, now()),
            Err(EngineError::InvalidAmount(_))
        ));
    }

    #[test]
    fn patch_renormalizes_only_on_amount_change() {
        let input = NewExpense::new(ExpenseCategory::Repair, ExpenseTiming::After, 50_00, Currency::Usd)
            .exchange_rate("12000".parse().unwrap());
        let mut expense = build_expense(flight_owner(), input, Currency::Uzs, now()).unwrap();
        assert_eq!(expense.base_amount_minor, 60_000_000);

        apply_patch(
            &mut expense,
            ExpensePatch::default().description(Some("new tyre".to_string())),
            Currency::Uzs,
            now(),
        )
        .unwrap();
        assert_eq!(expense.base_amount_minor, 60_000_000);
        assert_eq!(expense.description.as_deref(), Some("new tyre"));

        apply_patch(
            &mut expense,
            ExpensePatch::default().amount(40_00),
            Currency::Uzs,
            now(),
        )
        .unwrap();
        assert_eq!(expense.base_amount_minor, 48_000_000);
        assert_eq!(expense.exchange_rate, "12000".parse::<Decimal>().unwrap());
    }

    #[test]
    fn failed_patch_leaves_entry_untouched() {
        let input = NewExpense::new(ExpenseCategory::Food, ExpenseTiming::During, 1_000, Currency::Uzs);
        let mut expense = build_expense(flight_owner(), input, Currency::Uzs, now()).unwrap();
        let before = expense.clone();

        let err = apply_patch(
            &mut expense,
            ExpensePatch::default().amount(-5),
            Currency::Uzs,
            now(),
        );
        assert!(err.is_err());
        assert_eq!(expense, before);

        let err = apply_patch(
            &mut expense,
            ExpensePatch::default().category(diesel()),
            Currency::Uzs,
            now(),
        );
        assert!(err.is_err());
        assert_eq!(expense, before);
    }

    #[test]
    fn totals_respect_filter() {
        let leg = Uuid::new_v4();
        let owner = flight_owner();
        let expenses = vec![
            build_expense(
                owner,
                NewExpense::new(ExpenseCategory::Toll, ExpenseTiming::During, 100, Currency::Uzs)
                    .leg_id(leg),
                Currency::Uzs,
                now(),
            )
            .unwrap(),
            build_expense(
                owner,
                NewExpense::new(ExpenseCategory::Food, ExpenseTiming::After, 50, Currency::Uzs),
                Currency::Uzs,
                now(),
            )
            .unwrap(),
        ];

        assert_eq!(total_for(&expenses, &ExpenseFilter::default()).unwrap(), 150);
        assert_eq!(
            total_for(&expenses, &ExpenseFilter::default().leg(leg)).unwrap(),
            100
        );
        assert_eq!(
            total_for(&expenses, &ExpenseFilter::default().timing(ExpenseTiming::After)).unwrap(),
            50
        );
        assert_eq!(total_for(&expenses, &ExpenseFilter::settled()).unwrap(), 150);
    }

    #[test]
    fn totals_reject_overflow() {
        let owner = flight_owner();
        let amount = i64::MAX / 2 + 1;
        let huge = || {
            let input =
                NewExpense::new(ExpenseCategory::Toll, ExpenseTiming::During, amount, Currency::Uzs);
            build_expense(owner, input, Currency::Uzs, now()).unwrap()
        };
        let expenses = vec![huge(), huge()];

        assert!(matches!(
            total_for(&expenses, &ExpenseFilter::default()),
            Err(EngineError::InvalidAmount(_))
        ));
    }

    #[test]
    fn foreign_currency_without_rate_is_rejected() {
        let input = NewExpense::new(ExpenseCategory::Toll, ExpenseTiming::During, 25_00, Currency::Usd);
        assert!(matches!(
            build_expense(flight_owner(), input, Currency::Uzs, now()),
            Err(EngineError::Validation(_))
        ));
    }

    #[test]
    fn currency_change_requires_a_new_rate() {
        let input = NewExpense::new(ExpenseCategory::Toll, ExpenseTiming::During, 25_00, Currency::Usd)
            .exchange_rate("12000".parse().unwrap());
        let mut expense = build_expense(flight_owner(), input, Currency::Uzs, now()).unwrap();
        let before = expense.clone();

        let err = apply_patch(
            &mut expense,
            ExpensePatch::default().currency(Currency::Eur),
            Currency::Uzs,
            now(),
        );
        assert!(matches!(err, Err(EngineError::Validation(_))));
        assert_eq!(expense, before);

        apply_patch(
            &mut expense,
            ExpensePatch::default().currency(Currency::Uzs).amount(300_000),
            Currency::Uzs,
            now(),
        )
        .unwrap();
        assert_eq!(expense.exchange_rate, Decimal::ONE);
        assert_eq!(expense.base_amount_minor, 300_000);
    }
}
