//! Flight legs.
//!
//! A [`Leg`] is one point-to-point segment of a flight. It carries the
//! payment made by the cargo client and the cash advanced to the driver for
//! that segment. Both are realized when the leg is created, so every leg
//! contributes to the flight totals whatever its status.
//!
//! Amounts are stored as integer **minor units** of the base currency.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    EngineError, NewLeg, ResultEngine,
    util::{ensure_non_negative, normalize_required_text, parse_uuid},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LegStatus {
    InProgress,
    Completed,
}

impl LegStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
        }
    }
}

impl TryFrom<&str> for LegStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            other => Err(EngineError::Validation(format!(
                "invalid leg status: {other}"
            ))),
        }
    }
}

/// Map position of a city. Opaque to the engine.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Leg {
    pub id: Uuid,
    pub flight_id: Uuid,
    /// Position of the leg inside its flight, starting at 0.
    pub position: i32,
    pub from_city: String,
    pub to_city: String,
    pub from_coords: Option<Coordinates>,
    pub to_coords: Option<Coordinates>,
    pub payment_minor: i64,
    pub given_budget_minor: i64,
    pub status: LegStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Sums over all legs of a flight.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegTotals {
    pub total_payment_minor: i64,
    pub total_given_budget_minor: i64,
}

/// Appends a new `in_progress` leg.
///
/// At most one leg per flight may be in progress: the previous one must be
/// completed first.
pub(crate) fn append(
    legs: &mut Vec<Leg>,
    flight_id: Uuid,
    data: NewLeg,
    now: DateTime<Utc>,
) -> ResultEngine<&Leg> {
    if let Some(open) = legs.iter().find(|leg| leg.status == LegStatus::InProgress) {
        return Err(EngineError::InvalidTransition(format!(
            "leg {} is still in progress",
            open.id
        )));
    }
    ensure_non_negative(data.payment_minor, "payment")?;
    ensure_non_negative(data.given_budget_minor, "given_budget")?;

    let position = i32::try_from(legs.len())
        .map_err(|_| EngineError::Validation("too many legs".to_string()))?;
    legs.push(Leg {
        id: Uuid::now_v7(),
        flight_id,
        position,
        from_city: normalize_required_text(&data.from_city, "from_city")?,
        to_city: normalize_required_text(&data.to_city, "to_city")?,
        from_coords: data.from_coords,
        to_coords: data.to_coords,
        payment_minor: data.payment_minor,
        given_budget_minor: data.given_budget_minor,
        status: LegStatus::InProgress,
        started_at: now,
        completed_at: None,
    });

    Ok(&legs[legs.len() - 1])
}

/// Moves a leg from `in_progress` to `completed`.
pub(crate) fn complete(legs: &mut [Leg], leg_id: Uuid, now: DateTime<Utc>) -> ResultEngine<&Leg> {
    let leg = legs
        .iter_mut()
        .find(|leg| leg.id == leg_id)
        .ok_or_else(|| EngineError::KeyNotFound("leg not exists".to_string()))?;
    if leg.status == LegStatus::Completed {
        return Err(EngineError::InvalidTransition(format!(
            "leg {leg_id} is already completed"
        )));
    }
    leg.status = LegStatus::Completed;
    leg.completed_at = Some(now);
    Ok(leg)
}

/// Sums payments and budgets over every leg, completed or not.
pub fn totals(legs: &[Leg]) -> ResultEngine<LegTotals> {
    let overflow = || EngineError::InvalidAmount("leg totals overflow".to_string());
    legs.iter().try_fold(LegTotals::default(), |acc, leg| -> ResultEngine<LegTotals> {
        Ok(LegTotals {
            total_payment_minor: acc
                .total_payment_minor
                .checked_add(leg.payment_minor)
                .ok_or_else(overflow)?,
            total_given_budget_minor: acc
                .total_given_budget_minor
                .checked_add(leg.given_budget_minor)
                .ok_or_else(overflow)?,
        })
    })
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "legs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub flight_id: String,
    pub position: i32,
    pub from_city: String,
    pub to_city: String,
    pub from_lat: Option<f64>,
    pub from_lng: Option<f64>,
    pub to_lat: Option<f64>,
    pub to_lng: Option<f64>,
    pub payment_minor: i64,
    pub given_budget_minor: i64,
    pub status: String,
    pub started_at: DateTimeUtc,
    pub completed_at: Option<DateTimeUtc>,
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

impl From<&Leg> for ActiveModel {
    fn from(leg: &Leg) -> Self {
        Self {
            id: ActiveValue::Set(leg.id.to_string()),
            flight_id: ActiveValue::Set(leg.flight_id.to_string()),
            position: ActiveValue::Set(leg.position),
            from_city: ActiveValue::Set(leg.from_city.clone()),
            to_city: ActiveValue::Set(leg.to_city.clone()),
            from_lat: ActiveValue::Set(leg.from_coords.map(|c| c.lat)),
            from_lng: ActiveValue::Set(leg.from_coords.map(|c| c.lng)),
            to_lat: ActiveValue::Set(leg.to_coords.map(|c| c.lat)),
            to_lng: ActiveValue::Set(leg.to_coords.map(|c| c.lng)),
            payment_minor: ActiveValue::Set(leg.payment_minor),
            given_budget_minor: ActiveValue::Set(leg.given_budget_minor),
            status: ActiveValue::Set(leg.status.as_str().to_string()),
            started_at: ActiveValue::Set(leg.started_at),
            completed_at: ActiveValue::Set(leg.completed_at),
        }
    }
}

fn coords(lat: Option<f64>, lng: Option<f64>) -> Option<Coordinates> {
    match (lat, lng) {
        (Some(lat), Some(lng)) => Some(Coordinates { lat, lng }),
        _ => None,
    }
}

impl TryFrom<Model> for Leg {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "leg")?,
            flight_id: parse_uuid(&model.flight_id, "flight")?,
            position: model.position,
            from_city: model.from_city,
            to_city: model.to_city,
            from_coords: coords(model.from_lat, model.from_lng),
            to_coords: coords(model.to_lat, model.to_lng),
            payment_minor: model.payment_minor,
            given_budget_minor: model.given_budget_minor,
            status: LegStatus::try_from(model.status.as_str())?,
            started_at: model.started_at,
            completed_at: model.completed_at,
        })
    }
}
