//! Vehicle API endpoints

use api_types::{
    Created,
    vehicle::{VehicleNew, VehicleView},
};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use engine::NewVehicle;
use uuid::Uuid;

use crate::{ServerError, server::ServerState, views};

/// Handle requests for registering a new vehicle
pub async fn vehicle_new(
    State(state): State<ServerState>,
    Json(payload): Json<VehicleNew>,
) -> Result<(StatusCode, Json<Created>), ServerError> {
    let mut data = NewVehicle::new(payload.plate);
    if let Some(model) = payload.model {
        data = data.model(model);
    }
    let id = state.engine.new_vehicle(data).await?;

    Ok((StatusCode::CREATED, Json(Created { id })))
}

pub async fn get(
    State(state): State<ServerState>,
    Path(vehicle_id): Path<Uuid>,
) -> Result<Json<VehicleView>, ServerError> {
    let vehicle = state.engine.vehicle(vehicle_id).await?;
    Ok(Json(views::vehicle_out(&vehicle)))
}
