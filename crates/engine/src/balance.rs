//! Driver balance events.
//!
//! A driver's current balance is not stored: it is the sum of an append-only
//! list of [`BalanceEvent`]s. Each event records a signed delta in base
//! currency minor units together with what caused it, so a balance can always
//! be replayed and audited.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, ResultEngine, util::parse_uuid};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BalanceEventKind {
    /// Balance the driver was registered with.
    Opening,
    /// Pocket expense spent before any flight.
    PocketExpense,
    /// Edit or removal of a pocket expense.
    PocketExpenseCorrection,
    /// `-driver_owes` of a completed flight.
    Settlement,
    /// Repayment of a flight debt.
    DebtPayment,
}

impl BalanceEventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Opening => "opening",
            Self::PocketExpense => "pocket_expense",
            Self::PocketExpenseCorrection => "pocket_expense_correction",
            Self::Settlement => "settlement",
            Self::DebtPayment => "debt_payment",
        }
    }
}

impl TryFrom<&str> for BalanceEventKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "opening" => Ok(Self::Opening),
            "pocket_expense" => Ok(Self::PocketExpense),
            "pocket_expense_correction" => Ok(Self::PocketExpenseCorrection),
            "settlement" => Ok(Self::Settlement),
            "debt_payment" => Ok(Self::DebtPayment),
            other => Err(EngineError::Validation(format!(
                "invalid balance event kind: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceEvent {
    pub id: Uuid,
    pub driver_id: Uuid,
    pub kind: BalanceEventKind,
    pub delta_minor: i64,
    pub flight_id: Option<Uuid>,
    pub expense_id: Option<Uuid>,
    pub occurred_at: DateTime<Utc>,
}

impl BalanceEvent {
    pub(crate) fn new(
        driver_id: Uuid,
        kind: BalanceEventKind,
        delta_minor: i64,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            driver_id,
            kind,
            delta_minor,
            flight_id: None,
            expense_id: None,
            occurred_at,
        }
    }

    pub(crate) fn flight(mut self, flight_id: Uuid) -> Self {
        self.flight_id = Some(flight_id);
        self
    }

    pub(crate) fn expense(mut self, expense_id: Uuid) -> Self {
        self.expense_id = Some(expense_id);
        self
    }
}

/// Folds events into a balance.
///
/// Events only enter a driver through [`append`], so every running sum fits.
#[must_use]
pub fn fold(events: &[BalanceEvent]) -> i64 {
    events
        .iter()
        .fold(0_i64, |acc, event| acc.saturating_add(event.delta_minor))
}

/// Appends `event`, refusing it when the resulting balance would not fit an
/// `i64`.
pub(crate) fn append(events: &mut Vec<BalanceEvent>, event: BalanceEvent) -> ResultEngine<()> {
    fold(events)
        .checked_add(event.delta_minor)
        .ok_or_else(|| EngineError::InvalidAmount("driver balance overflow".to_string()))?;
    events.push(event);
    Ok(())
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "balance_events")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub driver_id: String,
    pub kind: String,
    pub delta_minor: i64,
    pub flight_id: Option<String>,
    pub expense_id: Option<String>,
    pub occurred_at: DateTimeUtc,
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
}

impl Related<super::drivers::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Drivers.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&BalanceEvent> for ActiveModel {
    fn from(event: &BalanceEvent) -> Self {
        Self {
            id: ActiveValue::Set(event.id.to_string()),
            driver_id: ActiveValue::Set(event.driver_id.to_string()),
            kind: ActiveValue::Set(event.kind.as_str().to_string()),
            delta_minor: ActiveValue::Set(event.delta_minor),
            flight_id: ActiveValue::Set(event.flight_id.map(|id| id.to_string())),
            expense_id: ActiveValue::Set(event.expense_id.map(|id| id.to_string())),
            occurred_at: ActiveValue::Set(event.occurred_at),
        }
    }
}

impl TryFrom<Model> for BalanceEvent {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "balance event")?,
            driver_id: parse_uuid(&model.driver_id, "driver")?,
            kind: BalanceEventKind::try_from(model.kind.as_str())?,
            delta_minor: model.delta_minor,
            flight_id: model
                .flight_id
                .as_deref()
                .map(|id| parse_uuid(id, "flight"))
                .transpose()?,
            expense_id: model
                .expense_id
                .as_deref()
                .map(|id| parse_uuid(id, "expense"))
                .transpose()?,
            occurred_at: model.occurred_at,
        })
    }
}
