//! Expense entries.
//!
//! An [`Expense`] is attached either to a flight (optionally to one of its
//! legs) or directly to a driver as a pocket expense. The entered amount,
//! currency and exchange rate are kept together with the base-currency amount
//! computed at entry time.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Currency, EngineError, util::parse_uuid};

/// Fuel subtype of a fuel expense.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FuelKind {
    Diesel,
    Petrol,
    Propane,
    Methane,
}

impl FuelKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Diesel => "diesel",
            Self::Petrol => "petrol",
            Self::Propane => "propane",
            Self::Methane => "methane",
        }
    }

    /// Unit in which the quantity of this fuel is measured.
    #[must_use]
    pub fn unit(self) -> Unit {
        match self {
            Self::Methane => Unit::CubicMetre,
            Self::Diesel | Self::Petrol | Self::Propane => Unit::Litre,
        }
    }
}

impl TryFrom<&str> for FuelKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "diesel" => Ok(Self::Diesel),
            "petrol" => Ok(Self::Petrol),
            "propane" => Ok(Self::Propane),
            "methane" => Ok(Self::Methane),
            other => Err(EngineError::Validation(format!("invalid fuel kind: {other}"))),
        }
    }
}

/// Measurement unit of a fuel quantity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Unit {
    Litre,
    CubicMetre,
}

/// What an expense was spent on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExpenseCategory {
    Fuel { fuel: FuelKind },
    Food,
    Toll,
    Repair,
    Fine,
    Border,
    Other,
}

impl ExpenseCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fuel { .. } => "fuel",
            Self::Food => "food",
            Self::Toll => "toll",
            Self::Repair => "repair",
            Self::Fine => "fine",
            Self::Border => "border",
            Self::Other => "other",
        }
    }

    /// Unit of the quantity, only defined for fuel.
    #[must_use]
    pub fn unit(self) -> Option<Unit> {
        match self {
            Self::Fuel { fuel } => Some(fuel.unit()),
            _ => None,
        }
    }

    fn fuel_kind(self) -> Option<FuelKind> {
        match self {
            Self::Fuel { fuel } => Some(fuel),
            _ => None,
        }
    }

    fn from_parts(category: &str, fuel: Option<&str>) -> Result<Self, EngineError> {
        match (category, fuel) {
            ("fuel", Some(fuel)) => Ok(Self::Fuel {
                fuel: FuelKind::try_from(fuel)?,
            }),
            ("fuel", None) => Err(EngineError::Validation(
                "fuel expense without fuel kind".to_string(),
            )),
            ("food", None) => Ok(Self::Food),
            ("toll", None) => Ok(Self::Toll),
            ("repair", None) => Ok(Self::Repair),
            ("fine", None) => Ok(Self::Fine),
            ("border", None) => Ok(Self::Border),
            ("other", None) => Ok(Self::Other),
            (other, _) => Err(EngineError::Validation(format!(
                "invalid expense category: {other}"
            ))),
        }
    }
}

/// When an expense happened relative to a flight.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpenseTiming {
    Before,
    During,
    After,
}

impl ExpenseTiming {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Before => "before",
            Self::During => "during",
            Self::After => "after",
        }
    }
}

impl TryFrom<&str> for ExpenseTiming {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "before" => Ok(Self::Before),
            "during" => Ok(Self::During),
            "after" => Ok(Self::After),
            other => Err(EngineError::Validation(format!(
                "invalid expense timing: {other}"
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum OwnerKind {
    Flight,
    Driver,
}

impl OwnerKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Flight => "flight",
            Self::Driver => "driver",
        }
    }
}

impl TryFrom<&str> for OwnerKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "flight" => Ok(Self::Flight),
            "driver" => Ok(Self::Driver),
            other => Err(EngineError::Validation(format!(
                "invalid expense owner kind: {other}"
            ))),
        }
    }
}

/// Aggregate an expense belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "owner", rename_all = "snake_case")]
pub enum ExpenseOwner {
    Flight { flight_id: Uuid },
    Driver { driver_id: Uuid },
}

impl ExpenseOwner {
    pub(crate) fn kind(&self) -> OwnerKind {
        match self {
            Self::Flight { .. } => OwnerKind::Flight,
            Self::Driver { .. } => OwnerKind::Driver,
        }
    }

    pub(crate) fn id(&self) -> Uuid {
        match *self {
            Self::Flight { flight_id } => flight_id,
            Self::Driver { driver_id } => driver_id,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expense {
    pub id: Uuid,
    pub owner: ExpenseOwner,
    pub leg_id: Option<Uuid>,
    pub category: ExpenseCategory,
    pub timing: ExpenseTiming,
    pub amount_minor: i64,
    pub currency: Currency,
    /// Rate locked at entry time.
    pub exchange_rate: Decimal,
    /// `amount_minor × exchange_rate`, computed once by the ledger.
    pub base_amount_minor: i64,
    pub quantity: Option<Decimal>,
    pub odometer: Option<i64>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Expense {
    #[must_use]
    pub fn unit(&self) -> Option<Unit> {
        self.category.unit()
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "expenses")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub owner_kind: String,
    pub owner_id: String,
    pub leg_id: Option<String>,
    pub category: String,
    pub fuel_kind: Option<String>,
    pub timing: String,
    pub amount_minor: i64,
    pub currency: String,
    pub exchange_rate: String,
    pub base_amount_minor: i64,
    pub quantity: Option<String>,
    pub odometer: Option<i64>,
    pub description: Option<String>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Expense> for ActiveModel {
    fn from(expense: &Expense) -> Self {
        Self {
            id: ActiveValue::Set(expense.id.to_string()),
            owner_kind: ActiveValue::Set(expense.owner.kind().as_str().to_string()),
            owner_id: ActiveValue::Set(expense.owner.id().to_string()),
            leg_id: ActiveValue::Set(expense.leg_id.map(|id| id.to_string())),
            category: ActiveValue::Set(expense.category.as_str().to_string()),
            fuel_kind: ActiveValue::Set(
                expense
                    .category
                    .fuel_kind()
                    .map(|fuel| fuel.as_str().to_string()),
            ),
            timing: ActiveValue::Set(expense.timing.as_str().to_string()),
            amount_minor: ActiveValue::Set(expense.amount_minor),
            currency: ActiveValue::Set(expense.currency.code().to_string()),
            exchange_rate: ActiveValue::Set(expense.exchange_rate.to_string()),
            base_amount_minor: ActiveValue::Set(expense.base_amount_minor),
            quantity: ActiveValue::Set(expense.quantity.map(|q| q.to_string())),
            odometer: ActiveValue::Set(expense.odometer),
            description: ActiveValue::Set(expense.description.clone()),
            created_at: ActiveValue::Set(expense.created_at),
            updated_at: ActiveValue::Set(expense.updated_at),
        }
    }
}

fn parse_decimal(value: &str, label: &str) -> Result<Decimal, EngineError> {
    value
        .parse()
        .map_err(|_| EngineError::Validation(format!("invalid stored {label}: {value}")))
}

impl TryFrom<Model> for Expense {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let owner_id = parse_uuid(&model.owner_id, "expense owner")?;
        let owner = match OwnerKind::try_from(model.owner_kind.as_str())? {
            OwnerKind::Flight => ExpenseOwner::Flight {
                flight_id: owner_id,
            },
            OwnerKind::Driver => ExpenseOwner::Driver {
                driver_id: owner_id,
            },
        };

        Ok(Self {
            id: parse_uuid(&model.id, "expense")?,
            owner,
            leg_id: model
                .leg_id
                .as_deref()
                .map(|id| parse_uuid(id, "leg"))
                .transpose()?,
            category: ExpenseCategory::from_parts(&model.category, model.fuel_kind.as_deref())?,
            timing: ExpenseTiming::try_from(model.timing.as_str())?,
            amount_minor: model.amount_minor,
            currency: Currency::try_from(model.currency.as_str())?,
            exchange_rate: parse_decimal(&model.exchange_rate, "exchange rate")?,
            base_amount_minor: model.base_amount_minor,
            quantity: model
                .quantity
                .as_deref()
                .map(|q| parse_decimal(q, "quantity"))
                .transpose()?,
            odometer: model.odometer,
            description: model.description,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}
