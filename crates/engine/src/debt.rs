//! Driver debt tracking.
//!
//! After settlement a flight carries a [`DriverDebt`]: what the driver owes
//! the business and how much of it has been paid back. The payment status
//! only moves forward (`pending` → `partial` → `paid`) and the paid amount
//! never exceeds what is owed: overpayments are rejected and the caller must
//! cap the amount.
//!
//! The functions at the bottom of the module tie flights to the driver
//! balance ledger: pocket expenses, settlements and repayments each append a
//! [`BalanceEvent`].

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    BalanceEvent, BalanceEventKind, Driver, EngineError, Expense, ExpenseFilter, Flight,
    RecordPaymentCmd, ResultEngine, Settlement, balance, ledger, legs, settlement,
    util::{normalize_optional_text, parse_uuid},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Partial,
    Paid,
}

impl PaymentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Partial => "partial",
            Self::Paid => "paid",
        }
    }
}

impl TryFrom<&str> for PaymentStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "pending" => Ok(Self::Pending),
            "partial" => Ok(Self::Partial),
            "paid" => Ok(Self::Paid),
            other => Err(EngineError::Validation(format!(
                "invalid payment status: {other}"
            ))),
        }
    }
}

/// Debt of the driver for one completed flight.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverDebt {
    pub owes_minor: i64,
    pub paid_minor: i64,
    pub status: PaymentStatus,
}

impl DriverDebt {
    #[must_use]
    pub fn from_settlement(settlement: &Settlement) -> Self {
        let status = if settlement.driver_owes_minor > 0 {
            PaymentStatus::Pending
        } else {
            PaymentStatus::Paid
        };
        Self {
            owes_minor: settlement.driver_owes_minor,
            paid_minor: 0,
            status,
        }
    }

    /// Amount still to be paid back.
    #[must_use]
    pub fn outstanding_minor(&self) -> i64 {
        (self.owes_minor - self.paid_minor).max(0)
    }

    /// Applies a repayment of `amount_minor`.
    pub fn record(&mut self, amount_minor: i64) -> ResultEngine<()> {
        if !matches!(self.status, PaymentStatus::Pending | PaymentStatus::Partial) {
            return Err(EngineError::InvalidTransition(format!(
                "debt is already {}",
                self.status.as_str()
            )));
        }
        if amount_minor <= 0 {
            return Err(EngineError::InvalidAmount(
                "payment amount must be > 0".to_string(),
            ));
        }
        let paid_minor = self
            .paid_minor
            .checked_add(amount_minor)
            .ok_or_else(|| EngineError::InvalidAmount("payment too large".to_string()))?;
        if paid_minor > self.owes_minor {
            return Err(EngineError::Overpayment(format!(
                "payment of {amount_minor} exceeds the outstanding {}",
                self.outstanding_minor()
            )));
        }

        self.paid_minor = paid_minor;
        self.status = if self.paid_minor >= self.owes_minor {
            PaymentStatus::Paid
        } else if self.paid_minor > 0 {
            PaymentStatus::Partial
        } else {
            PaymentStatus::Pending
        };
        Ok(())
    }
}

/// One accepted repayment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebtPayment {
    pub id: Uuid,
    pub flight_id: Uuid,
    pub amount_minor: i64,
    pub idempotency_key: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

/// Deducts a pocket expense from the driver balance at entry time.
pub(crate) fn apply_pre_flight_expense(
    driver: &mut Driver,
    expense: &Expense,
    now: DateTime<Utc>,
) -> ResultEngine<()> {
    let event = BalanceEvent::new(
        driver.id,
        BalanceEventKind::PocketExpense,
        -expense.base_amount_minor,
        now,
    )
    .expense(expense.id);
    balance::append(&mut driver.balance_events, event)
}

/// Records the balance effect of correcting a pocket expense from
/// `old_base_minor` to `new_base_minor` (0 when removed).
pub(crate) fn apply_pocket_correction(
    driver: &mut Driver,
    expense_id: Uuid,
    old_base_minor: i64,
    new_base_minor: i64,
    now: DateTime<Utc>,
) -> ResultEngine<()> {
    let delta = old_base_minor - new_base_minor;
    if delta == 0 {
        return Ok(());
    }
    let event = BalanceEvent::new(
        driver.id,
        BalanceEventKind::PocketExpenseCorrection,
        delta,
        now,
    )
    .expense(expense_id);
    balance::append(&mut driver.balance_events, event)
}

/// Settles `flight` against `driver`, exactly once.
///
/// Reads legs and expenses from the flight as given: the caller must hold
/// the flight so that nothing is interleaved between reading the totals and
/// writing the result.
pub(crate) fn settle_flight(
    flight: &mut Flight,
    driver: &mut Driver,
    driver_profit_percent: Decimal,
    now: DateTime<Utc>,
) -> ResultEngine<Settlement> {
    if flight.settlement.is_some() {
        return Err(EngineError::StaleFlight(format!(
            "flight {} is already settled",
            flight.id
        )));
    }
    if flight.driver_id != driver.id {
        return Err(EngineError::Validation(
            "flight belongs to another driver".to_string(),
        ));
    }

    let totals = legs::totals(&flight.legs)?;
    let expenses = ledger::total_for(&flight.expenses, &ExpenseFilter::settled())?;
    let result = settlement::settle(totals, expenses, driver_profit_percent)?;
    let delta = result
        .driver_owes_minor
        .checked_neg()
        .ok_or_else(|| EngineError::InvalidAmount("settlement overflow".to_string()))?;

    balance::append(
        &mut driver.balance_events,
        BalanceEvent::new(driver.id, BalanceEventKind::Settlement, delta, now).flight(flight.id),
    )?;
    flight.settlement = Some(result);
    flight.debt = Some(DriverDebt::from_settlement(&result));

    Ok(result)
}

/// Applies a repayment to a settled flight.
///
/// Returns `false` without changing anything when a payment with the same
/// idempotency key was already recorded for this flight.
pub(crate) fn record_payment(
    flight: &mut Flight,
    driver: &mut Driver,
    cmd: &RecordPaymentCmd,
    now: DateTime<Utc>,
) -> ResultEngine<bool> {
    let key = normalize_optional_text(cmd.idempotency_key.as_deref());
    if let Some(key) = key.as_deref()
        && flight
            .payments
            .iter()
            .any(|payment| payment.idempotency_key.as_deref() == Some(key))
    {
        return Ok(false);
    }

    let debt = flight.debt.as_mut().ok_or_else(|| {
        EngineError::InvalidTransition(format!("flight {} is not settled", flight.id))
    })?;
    let mut updated = *debt;
    updated.record(cmd.amount_minor)?;
    balance::append(
        &mut driver.balance_events,
        BalanceEvent::new(driver.id, BalanceEventKind::DebtPayment, cmd.amount_minor, now)
            .flight(flight.id),
    )?;
    *debt = updated;

    flight.payments.push(DebtPayment {
        id: Uuid::now_v7(),
        flight_id: flight.id,
        amount_minor: cmd.amount_minor,
        idempotency_key: key,
        recorded_at: now,
    });
    Ok(true)
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "debt_payments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub flight_id: String,
    pub amount_minor: i64,
    pub idempotency_key: Option<String>,
    pub recorded_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::flights::Entity",
        from = "Column::FlightId",
        to = "super::flights::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Flights,
}

impl Related<super::flights::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Flights.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&DebtPayment> for ActiveModel {
    fn from(payment: &DebtPayment) -> Self {
        Self {
            id: ActiveValue::Set(payment.id.to_string()),
            flight_id: ActiveValue::Set(payment.flight_id.to_string()),
            amount_minor: ActiveValue::Set(payment.amount_minor),
            idempotency_key: ActiveValue::Set(payment.idempotency_key.clone()),
            recorded_at: ActiveValue::Set(payment.recorded_at),
        }
    }
}

impl TryFrom<Model> for DebtPayment {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "payment")?,
            flight_id: parse_uuid(&model.flight_id, "flight")?,
            amount_minor: model.amount_minor,
            idempotency_key: model.idempotency_key,
            recorded_at: model.recorded_at,
        })
    }
}
