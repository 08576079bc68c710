//! Vehicles (trucks). A vehicle only remembers which driver currently has it.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    EngineError, NewVehicle, ResultEngine,
    util::{normalize_optional_text, normalize_required_text, parse_uuid},
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: Uuid,
    pub plate: String,
    pub model: Option<String>,
    pub current_driver_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub version: i64,
}

impl Vehicle {
    pub fn new(data: NewVehicle, now: DateTime<Utc>) -> ResultEngine<Self> {
        Ok(Self {
            id: Uuid::now_v7(),
            plate: normalize_required_text(&data.plate, "plate")?.to_uppercase(),
            model: normalize_optional_text(data.model.as_deref()),
            current_driver_id: None,
            created_at: now,
            version: 0,
        })
    }

    /// Releases the vehicle if `driver_id` holds it. Returns `true` when it changed.
    pub(crate) fn release(&mut self, driver_id: Uuid) -> bool {
        if self.current_driver_id == Some(driver_id) {
            self.current_driver_id = None;
            return true;
        }
        false
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "vehicles")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub plate: String,
    pub model: Option<String>,
    pub current_driver_id: Option<String>,
    pub created_at: DateTimeUtc,
    pub version: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Vehicle> for ActiveModel {
    fn from(vehicle: &Vehicle) -> Self {
        Self {
            id: ActiveValue::Set(vehicle.id.to_string()),
            plate: ActiveValue::Set(vehicle.plate.clone()),
            model: ActiveValue::Set(vehicle.model.clone()),
            current_driver_id: ActiveValue::Set(vehicle.current_driver_id.map(|id| id.to_string())),
            created_at: ActiveValue::Set(vehicle.created_at),
            version: ActiveValue::Set(vehicle.version),
        }
    }
}

impl TryFrom<Model> for Vehicle {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "vehicle")?,
            plate: model.plate,
            model: model.model,
            current_driver_id: model
                .current_driver_id
                .as_deref()
                .map(|id| parse_uuid(id, "driver"))
                .transpose()?,
            created_at: model.created_at,
            version: model.version,
        })
    }
}
