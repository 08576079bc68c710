//! Flights.
//!
//! A [`Flight`] is a single trip of one driver with one vehicle, made of
//! ordered legs and carrying its own expenses. Its lifecycle is:
//!
//! ```text
//! pending ──start──▶ active ──complete──▶ completed
//!    │                  │
//!    └──cancel──▶ cancelled ◀──cancel──┘
//! ```
//!
//! `completed` and `cancelled` are terminal: legs and expenses of a terminal
//! flight are frozen. Completing a flight settles it exactly once, after
//! which only debt repayments are accepted.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    Currency, DebtPayment, Driver, DriverDebt, DriverStatus, EngineError, Expense, ExpenseFilter,
    ExpenseOwner, ExpensePatch, Leg, LegStatus, LegTotals, NewExpense, NewLeg, PaymentStatus,
    ResultEngine, Settlement, debt, ledger, legs, util::parse_uuid,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlightStatus {
    Pending,
    Active,
    Completed,
    Cancelled,
}

impl FlightStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

impl TryFrom<&str> for FlightStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "pending" => Ok(Self::Pending),
            "active" => Ok(Self::Active),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(EngineError::Validation(format!(
                "invalid flight status: {other}"
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlightType {
    #[default]
    Domestic,
    International,
}

impl FlightType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Domestic => "domestic",
            Self::International => "international",
        }
    }
}

impl TryFrom<&str> for FlightType {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "domestic" => Ok(Self::Domestic),
            "international" => Ok(Self::International),
            other => Err(EngineError::Validation(format!(
                "invalid flight type: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Flight {
    pub id: Uuid,
    pub driver_id: Uuid,
    pub vehicle_id: Uuid,
    pub flight_type: FlightType,
    pub status: FlightStatus,
    pub legs: Vec<Leg>,
    pub expenses: Vec<Expense>,
    /// Set exactly once, when the flight completes.
    pub settlement: Option<Settlement>,
    pub debt: Option<DriverDebt>,
    pub payments: Vec<DebtPayment>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub version: i64,
}

impl Flight {
    /// A `pending` flight without legs.
    #[must_use]
    pub fn plan(
        driver_id: Uuid,
        vehicle_id: Uuid,
        flight_type: FlightType,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            driver_id,
            vehicle_id,
            flight_type,
            status: FlightStatus::Pending,
            legs: Vec::new(),
            expenses: Vec::new(),
            settlement: None,
            debt: None,
            payments: Vec::new(),
            created_at: now,
            started_at: None,
            finished_at: None,
            version: 0,
        }
    }

    /// Moves a `pending` flight to `active` with its first leg.
    pub(crate) fn start(&mut self, first_leg: NewLeg, now: DateTime<Utc>) -> ResultEngine<()> {
        self.ensure_mutable()?;
        if self.status != FlightStatus::Pending {
            return Err(self.illegal("start"));
        }
        legs::append(&mut self.legs, self.id, first_leg, now)?;
        self.status = FlightStatus::Active;
        self.started_at = Some(now);
        Ok(())
    }

    /// Rejects any change to a terminal flight.
    pub(crate) fn ensure_mutable(&self) -> ResultEngine<()> {
        if self.status.is_terminal() {
            return Err(EngineError::ImmutableRecord(format!(
                "flight {} is {}",
                self.id,
                self.status.as_str()
            )));
        }
        Ok(())
    }

    fn ensure_active(&self, action: &str) -> ResultEngine<()> {
        self.ensure_mutable()?;
        if self.status != FlightStatus::Active {
            return Err(self.illegal(action));
        }
        Ok(())
    }

    fn illegal(&self, action: &str) -> EngineError {
        EngineError::InvalidTransition(format!(
            "cannot {action} flight {} in status {}",
            self.id,
            self.status.as_str()
        ))
    }

    fn ensure_leg(&self, leg_id: Option<Uuid>) -> ResultEngine<()> {
        if let Some(leg_id) = leg_id
            && !self.legs.iter().any(|leg| leg.id == leg_id)
        {
            return Err(EngineError::KeyNotFound(format!(
                "leg {leg_id} is not part of flight {}",
                self.id
            )));
        }
        Ok(())
    }

    pub(crate) fn add_leg(&mut self, data: NewLeg, now: DateTime<Utc>) -> ResultEngine<&Leg> {
        self.ensure_active("add a leg to")?;
        legs::append(&mut self.legs, self.id, data, now)
    }

    pub(crate) fn complete_leg(&mut self, leg_id: Uuid, now: DateTime<Utc>) -> ResultEngine<&Leg> {
        self.ensure_active("complete a leg of")?;
        legs::complete(&mut self.legs, leg_id, now)
    }

    pub fn totals(&self) -> ResultEngine<LegTotals> {
        legs::totals(&self.legs)
    }

    pub(crate) fn add_expense(
        &mut self,
        input: NewExpense,
        base: Currency,
        now: DateTime<Utc>,
    ) -> ResultEngine<&Expense> {
        self.ensure_active("add an expense to")?;
        self.ensure_leg(input.leg_id)?;
        let owner = ExpenseOwner::Flight { flight_id: self.id };
        let expense = ledger::build_expense(owner, input, base, now)?;
        self.expenses.push(expense);
        Ok(&self.expenses[self.expenses.len() - 1])
    }

    pub(crate) fn edit_expense(
        &mut self,
        expense_id: Uuid,
        patch: ExpensePatch,
        base: Currency,
        now: DateTime<Utc>,
    ) -> ResultEngine<&Expense> {
        self.ensure_active("edit an expense of")?;
        if let Some(leg_id) = patch.leg_id {
            self.ensure_leg(leg_id)?;
        }
        let expense = ledger::find_mut(&mut self.expenses, expense_id)?;
        ledger::apply_patch(expense, patch, base, now)?;
        Ok(expense)
    }

    pub(crate) fn remove_expense(&mut self, expense_id: Uuid) -> ResultEngine<Expense> {
        self.ensure_active("remove an expense of")?;
        ledger::remove(&mut self.expenses, expense_id)
    }

    pub fn expense_total(&self, filter: &ExpenseFilter) -> ResultEngine<i64> {
        ledger::total_for(&self.expenses, filter)
    }

    /// Completes an active flight and settles it against `driver`.
    ///
    /// Every leg must be completed. The driver is freed.
    pub(crate) fn complete(
        &mut self,
        driver: &mut Driver,
        driver_profit_percent: Decimal,
        now: DateTime<Utc>,
    ) -> ResultEngine<Settlement> {
        match self.status {
            FlightStatus::Active => {}
            FlightStatus::Completed => {
                return Err(EngineError::StaleFlight(format!(
                    "flight {} is already completed",
                    self.id
                )));
            }
            FlightStatus::Pending | FlightStatus::Cancelled => return Err(self.illegal("complete")),
        }
        if let Some(open) = self
            .legs
            .iter()
            .find(|leg| leg.status != LegStatus::Completed)
        {
            return Err(EngineError::InvalidTransition(format!(
                "leg {} is not completed",
                open.id
            )));
        }

        let settlement = debt::settle_flight(self, driver, driver_profit_percent, now)?;
        self.status = FlightStatus::Completed;
        self.finished_at = Some(now);
        driver.status = DriverStatus::Free;
        Ok(settlement)
    }

    /// Cancels a pending or active flight. No settlement is produced.
    pub(crate) fn cancel(&mut self, driver: &mut Driver, now: DateTime<Utc>) -> ResultEngine<()> {
        self.ensure_mutable()?;
        if self.status == FlightStatus::Active {
            driver.status = DriverStatus::Free;
        }
        self.status = FlightStatus::Cancelled;
        self.finished_at = Some(now);
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "flights")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub driver_id: String,
    pub vehicle_id: String,
    pub flight_type: String,
    pub status: String,
    pub total_income_minor: Option<i64>,
    pub total_expenses_minor: Option<i64>,
    pub net_profit_minor: Option<i64>,
    pub driver_profit_percent: Option<String>,
    pub driver_profit_minor: Option<i64>,
    pub driver_owes_minor: Option<i64>,
    pub driver_paid_minor: Option<i64>,
    pub driver_payment_status: Option<String>,
    pub created_at: DateTimeUtc,
    pub started_at: Option<DateTimeUtc>,
    pub finished_at: Option<DateTimeUtc>,
    pub version: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::drivers::Entity",
        from = "Column::DriverId",
        to = "super::drivers::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Drivers,
    #[sea_orm(has_many = "super::legs::Entity")]
    Legs,
    #[sea_orm(has_many = "super::debt::Entity")]
    DebtPayments,
}

impl Related<super::drivers::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Drivers.def()
    }
}

impl Related<super::legs::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Legs.def()
    }
}

impl Related<super::debt::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DebtPayments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Flight> for ActiveModel {
    fn from(flight: &Flight) -> Self {
        let settlement = flight.settlement.as_ref();
        let debt = flight.debt.as_ref();
        Self {
            id: ActiveValue::Set(flight.id.to_string()),
            driver_id: ActiveValue::Set(flight.driver_id.to_string()),
            vehicle_id: ActiveValue::Set(flight.vehicle_id.to_string()),
            flight_type: ActiveValue::Set(flight.flight_type.as_str().to_string()),
            status: ActiveValue::Set(flight.status.as_str().to_string()),
            total_income_minor: ActiveValue::Set(settlement.map(|s| s.total_income_minor)),
            total_expenses_minor: ActiveValue::Set(settlement.map(|s| s.total_expenses_minor)),
            net_profit_minor: ActiveValue::Set(settlement.map(|s| s.net_profit_minor)),
            driver_profit_percent: ActiveValue::Set(
                settlement.map(|s| s.driver_profit_percent.to_string()),
            ),
            driver_profit_minor: ActiveValue::Set(settlement.map(|s| s.driver_profit_minor)),
            driver_owes_minor: ActiveValue::Set(settlement.map(|s| s.driver_owes_minor)),
            driver_paid_minor: ActiveValue::Set(debt.map(|d| d.paid_minor)),
            driver_payment_status: ActiveValue::Set(debt.map(|d| d.status.as_str().to_string())),
            created_at: ActiveValue::Set(flight.created_at),
            started_at: ActiveValue::Set(flight.started_at),
            finished_at: ActiveValue::Set(flight.finished_at),
            version: ActiveValue::Set(flight.version),
        }
    }
}

fn settlement_from_model(model: &Model) -> ResultEngine<Option<(Settlement, DriverDebt)>> {
    let (
        Some(total_income_minor),
        Some(total_expenses_minor),
        Some(net_profit_minor),
        Some(percent),
        Some(driver_profit_minor),
        Some(driver_owes_minor),
        Some(paid_minor),
        Some(status),
    ) = (
        model.total_income_minor,
        model.total_expenses_minor,
        model.net_profit_minor,
        model.driver_profit_percent.as_deref(),
        model.driver_profit_minor,
        model.driver_owes_minor,
        model.driver_paid_minor,
        model.driver_payment_status.as_deref(),
    )
    else {
        return Ok(None);
    };

    let driver_profit_percent = percent.parse::<Decimal>().map_err(|_| {
        EngineError::Validation(format!("invalid driver_profit_percent: {percent}"))
    })?;
    let settlement = Settlement {
        total_income_minor,
        total_expenses_minor,
        net_profit_minor,
        driver_profit_percent,
        driver_profit_minor,
        driver_owes_minor,
    };
    let debt = DriverDebt {
        owes_minor: driver_owes_minor,
        paid_minor,
        status: PaymentStatus::try_from(status)?,
    };
    Ok(Some((settlement, debt)))
}

/// Builds a flight from its row plus legs, expenses and payments.
impl TryFrom<(Model, Vec<Leg>, Vec<Expense>, Vec<DebtPayment>)> for Flight {
    type Error = EngineError;

    fn try_from(
        (model, legs, expenses, payments): (Model, Vec<Leg>, Vec<Expense>, Vec<DebtPayment>),
    ) -> Result<Self, Self::Error> {
        let settled = settlement_from_model(&model)?;
        Ok(Self {
            id: parse_uuid(&model.id, "flight")?,
            driver_id: parse_uuid(&model.driver_id, "driver")?,
            vehicle_id: parse_uuid(&model.vehicle_id, "vehicle")?,
            flight_type: FlightType::try_from(model.flight_type.as_str())?,
            status: FlightStatus::try_from(model.status.as_str())?,
            legs,
            expenses,
            settlement: settled.map(|(settlement, _)| settlement),
            debt: settled.map(|(_, debt)| debt),
            payments,
            created_at: model.created_at,
            started_at: model.started_at,
            finished_at: model.finished_at,
            version: model.version,
        })
    }
}
