//! Driver API endpoints

use api_types::{
    Created,
    driver::{DriverNew, DriverView, StatementView},
};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use engine::NewDriver;
use uuid::Uuid;

use crate::{ServerError, server::ServerState, views};

/// Handle requests for registering a new driver
pub async fn driver_new(
    State(state): State<ServerState>,
    Json(payload): Json<DriverNew>,
) -> Result<(StatusCode, Json<Created>), ServerError> {
    let mut data = NewDriver::new(payload.name).opening_balance(payload.opening_balance_minor);
    if let Some(phone) = payload.phone {
        data = data.phone(phone);
    }
    let id = state.engine.new_driver(data).await?;

    Ok((StatusCode::CREATED, Json(Created { id })))
}

pub async fn get(
    State(state): State<ServerState>,
    Path(driver_id): Path<Uuid>,
) -> Result<Json<DriverView>, ServerError> {
    let driver = state.engine.driver(driver_id).await?;
    Ok(Json(views::driver_out(&driver)))
}

/// Soft delete: personal data is wiped, the money history stays.
pub async fn anonymize(
    State(state): State<ServerState>,
    Path(driver_id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state.engine.anonymize_driver(driver_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn statement(
    State(state): State<ServerState>,
    Path(driver_id): Path<Uuid>,
) -> Result<Json<StatementView>, ServerError> {
    let statement = state.engine.driver_statement(driver_id).await?;
    Ok(Json(views::statement_out(&statement)))
}
