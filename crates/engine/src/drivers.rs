//! Drivers.
//!
//! A [`Driver`] owns the pocket expenses spent before any flight and the
//! event list its running balance is folded from. A driver is `busy` while
//! assigned to an active flight and `free` otherwise.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    BalanceEvent, BalanceEventKind, EngineError, Expense, NewDriver, ResultEngine, balance,
    util::{normalize_optional_text, normalize_required_text, parse_uuid},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriverStatus {
    Free,
    Busy,
}

impl DriverStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Busy => "busy",
        }
    }
}

impl TryFrom<&str> for DriverStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "free" => Ok(Self::Free),
            "busy" => Ok(Self::Busy),
            other => Err(EngineError::Validation(format!(
                "invalid driver status: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Driver {
    pub id: Uuid,
    pub name: String,
    pub phone: Option<String>,
    pub status: DriverStatus,
    /// Anonymized drivers keep their history but accept no new work.
    pub deleted: bool,
    pub expenses: Vec<Expense>,
    pub balance_events: Vec<BalanceEvent>,
    pub created_at: DateTime<Utc>,
    /// Optimistic concurrency counter, bumped on every save.
    pub version: i64,
}

impl Driver {
    pub fn new(data: NewDriver, now: DateTime<Utc>) -> ResultEngine<Self> {
        let mut driver = Self {
            id: Uuid::now_v7(),
            name: normalize_required_text(&data.name, "driver name")?,
            phone: normalize_optional_text(data.phone.as_deref()),
            status: DriverStatus::Free,
            deleted: false,
            expenses: Vec::new(),
            balance_events: Vec::new(),
            created_at: now,
            version: 0,
        };
        if data.opening_balance_minor != 0 {
            balance::append(
                &mut driver.balance_events,
                BalanceEvent::new(
                    driver.id,
                    BalanceEventKind::Opening,
                    data.opening_balance_minor,
                    now,
                ),
            )?;
        }
        Ok(driver)
    }

    /// Running balance: positive when the business owes the driver.
    #[must_use]
    pub fn current_balance(&self) -> i64 {
        balance::fold(&self.balance_events)
    }

    pub(crate) fn ensure_active(&self) -> ResultEngine<()> {
        if self.deleted {
            return Err(EngineError::ImmutableRecord(format!(
                "driver {} is anonymized",
                self.id
            )));
        }
        Ok(())
    }

    /// Soft-deletes the driver, dropping personal data.
    pub(crate) fn anonymize(&mut self) -> ResultEngine<()> {
        self.ensure_active()?;
        if self.status == DriverStatus::Busy {
            return Err(EngineError::InvalidTransition(format!(
                "driver {} is on an active flight",
                self.id
            )));
        }
        self.name = "deleted driver".to_string();
        self.phone = None;
        self.deleted = true;
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "drivers")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    pub phone: Option<String>,
    pub status: String,
    pub deleted: bool,
    pub created_at: DateTimeUtc,
    pub version: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::balance::Entity")]
    BalanceEvents,
    #[sea_orm(has_many = "super::flights::Entity")]
    Flights,
}

impl Related<super::balance::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BalanceEvents.def()
    }
}

impl Related<super::flights::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Flights.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Driver> for ActiveModel {
    fn from(driver: &Driver) -> Self {
        Self {
            id: ActiveValue::Set(driver.id.to_string()),
            name: ActiveValue::Set(driver.name.clone()),
            phone: ActiveValue::Set(driver.phone.clone()),
            status: ActiveValue::Set(driver.status.as_str().to_string()),
            deleted: ActiveValue::Set(driver.deleted),
            created_at: ActiveValue::Set(driver.created_at),
            version: ActiveValue::Set(driver.version),
        }
    }
}

/// Builds a driver from its row plus its pocket expenses and balance events.
impl TryFrom<(Model, Vec<Expense>, Vec<BalanceEvent>)> for Driver {
    type Error = EngineError;

    fn try_from(
        (model, expenses, balance_events): (Model, Vec<Expense>, Vec<BalanceEvent>),
    ) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "driver")?,
            name: model.name,
            phone: model.phone,
            status: DriverStatus::try_from(model.status.as_str())?,
            deleted: model.deleted,
            expenses,
            balance_events,
            created_at: model.created_at,
            version: model.version,
        })
    }
}
