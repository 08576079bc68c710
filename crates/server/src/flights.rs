//! Flight API endpoints
//!
//! Creating, planning and starting a flight answer with the full flight so
//! the client can reconcile its optimistic copy in one round trip.

use api_types::flight::{
    FlightComplete, FlightNew, FlightPlan, FlightStart, FlightView, LegNew, LegTotalsView,
    LegView, SettlementView,
};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use engine::CreateFlightCmd;
use uuid::Uuid;

use crate::{ServerError, server::ServerState, views};

/// Handle requests for creating an active flight with its first leg
pub async fn flight_new(
    State(state): State<ServerState>,
    Json(payload): Json<FlightNew>,
) -> Result<(StatusCode, Json<FlightView>), ServerError> {
    let mut cmd = CreateFlightCmd::new(
        payload.driver_id,
        payload.vehicle_id,
        views::leg_in(payload.first_leg),
    );
    cmd.flight_type = views::flight_type_in(payload.flight_type);
    let flight = state.engine.create_flight(cmd).await?;

    Ok((StatusCode::CREATED, Json(views::flight_out(&flight)?)))
}

pub async fn plan(
    State(state): State<ServerState>,
    Json(payload): Json<FlightPlan>,
) -> Result<(StatusCode, Json<FlightView>), ServerError> {
    let flight = state
        .engine
        .plan_flight(
            payload.driver_id,
            payload.vehicle_id,
            views::flight_type_in(payload.flight_type),
        )
        .await?;

    Ok((StatusCode::CREATED, Json(views::flight_out(&flight)?)))
}

pub async fn start(
    State(state): State<ServerState>,
    Path(flight_id): Path<Uuid>,
    Json(payload): Json<FlightStart>,
) -> Result<Json<FlightView>, ServerError> {
    let flight = state
        .engine
        .start_flight(flight_id, views::leg_in(payload.first_leg))
        .await?;
    Ok(Json(views::flight_out(&flight)?))
}

pub async fn get(
    State(state): State<ServerState>,
    Path(flight_id): Path<Uuid>,
) -> Result<Json<FlightView>, ServerError> {
    let flight = state.engine.flight(flight_id).await?;
    Ok(Json(views::flight_out(&flight)?))
}

pub async fn list_for_driver(
    State(state): State<ServerState>,
    Path(driver_id): Path<Uuid>,
) -> Result<Json<Vec<FlightView>>, ServerError> {
    let flights = state.engine.flights_of_driver(driver_id).await?;
    let flights = flights
        .iter()
        .map(views::flight_out)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(flights))
}

pub async fn leg_new(
    State(state): State<ServerState>,
    Path(flight_id): Path<Uuid>,
    Json(payload): Json<LegNew>,
) -> Result<(StatusCode, Json<LegView>), ServerError> {
    let leg = state
        .engine
        .add_leg(flight_id, views::leg_in(payload))
        .await?;
    Ok((StatusCode::CREATED, Json(views::leg_out(&leg))))
}

pub async fn leg_complete(
    State(state): State<ServerState>,
    Path((flight_id, leg_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<LegView>, ServerError> {
    let leg = state.engine.complete_leg(flight_id, leg_id).await?;
    Ok(Json(views::leg_out(&leg)))
}

pub async fn totals(
    State(state): State<ServerState>,
    Path(flight_id): Path<Uuid>,
) -> Result<Json<LegTotalsView>, ServerError> {
    let totals = state.engine.leg_totals(flight_id).await?;
    Ok(Json(views::totals_out(totals)))
}

/// Settle the flight. Repeating the call returns the same settlement.
pub async fn complete(
    State(state): State<ServerState>,
    Path(flight_id): Path<Uuid>,
    Json(payload): Json<FlightComplete>,
) -> Result<Json<SettlementView>, ServerError> {
    let settlement = state
        .engine
        .complete_flight(flight_id, payload.driver_profit_percent)
        .await?;
    Ok(Json(views::settlement_out(&settlement)))
}

pub async fn cancel(
    State(state): State<ServerState>,
    Path(flight_id): Path<Uuid>,
) -> Result<Json<FlightView>, ServerError> {
    let flight = state.engine.cancel_flight(flight_id).await?;
    Ok(Json(views::flight_out(&flight)?))
}
