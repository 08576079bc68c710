//! Expense API endpoints

use api_types::expense::{ExpenseNew, ExpenseTotal, ExpenseTotalQuery, ExpenseUpdate, ExpenseView};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use engine::{ExpenseFilter, ExpenseOwner, NewExpense};
use uuid::Uuid;

use crate::{ServerError, server::ServerState, views};

fn new_expense(payload: ExpenseNew) -> NewExpense {
    let mut data = NewExpense::new(
        views::category_in(payload.category),
        views::timing_in(payload.timing),
        payload.amount_minor,
        views::currency_in(payload.currency),
    );
    data.exchange_rate = payload.exchange_rate;
    if let Some(leg_id) = payload.leg_id {
        data = data.leg_id(leg_id);
    }
    if let Some(quantity) = payload.quantity {
        data = data.quantity(quantity);
    }
    if let Some(odometer) = payload.odometer {
        data = data.odometer(odometer);
    }
    if let Some(description) = payload.description {
        data = data.description(description);
    }
    data
}

async fn add(
    state: &ServerState,
    owner: ExpenseOwner,
    payload: ExpenseNew,
) -> Result<(StatusCode, Json<ExpenseView>), ServerError> {
    let expense = state.engine.add_expense(owner, new_expense(payload)).await?;
    Ok((StatusCode::CREATED, Json(views::expense_out(&expense))))
}

async fn list(state: &ServerState, owner: ExpenseOwner) -> Result<Json<Vec<ExpenseView>>, ServerError> {
    let expenses = state.engine.expenses(owner).await?;
    Ok(Json(expenses.iter().map(views::expense_out).collect()))
}

/// Handle requests for recording an expense during or after a flight
pub async fn flight_expense_new(
    State(state): State<ServerState>,
    Path(flight_id): Path<Uuid>,
    Json(payload): Json<ExpenseNew>,
) -> Result<(StatusCode, Json<ExpenseView>), ServerError> {
    add(&state, ExpenseOwner::Flight { flight_id }, payload).await
}

/// Handle requests for recording a pre-flight expense paid by the driver
pub async fn pocket_expense_new(
    State(state): State<ServerState>,
    Path(driver_id): Path<Uuid>,
    Json(payload): Json<ExpenseNew>,
) -> Result<(StatusCode, Json<ExpenseView>), ServerError> {
    add(&state, ExpenseOwner::Driver { driver_id }, payload).await
}

pub async fn list_for_flight(
    State(state): State<ServerState>,
    Path(flight_id): Path<Uuid>,
) -> Result<Json<Vec<ExpenseView>>, ServerError> {
    list(&state, ExpenseOwner::Flight { flight_id }).await
}

pub async fn list_for_driver(
    State(state): State<ServerState>,
    Path(driver_id): Path<Uuid>,
) -> Result<Json<Vec<ExpenseView>>, ServerError> {
    list(&state, ExpenseOwner::Driver { driver_id }).await
}

pub async fn total_for_flight(
    State(state): State<ServerState>,
    Path(flight_id): Path<Uuid>,
    Query(query): Query<ExpenseTotalQuery>,
) -> Result<Json<ExpenseTotal>, ServerError> {
    let mut filter = ExpenseFilter::default();
    if let Some(leg_id) = query.leg_id {
        filter = filter.leg(leg_id);
    }
    if let Some(timing) = query.timing {
        filter = filter.timing(views::timing_in(timing));
    }
    let total_minor = state
        .engine
        .expense_total(ExpenseOwner::Flight { flight_id }, &filter)
        .await?;
    Ok(Json(ExpenseTotal { total_minor }))
}

pub async fn update(
    State(state): State<ServerState>,
    Path(expense_id): Path<Uuid>,
    Json(payload): Json<ExpenseUpdate>,
) -> Result<Json<ExpenseView>, ServerError> {
    let expense = state
        .engine
        .edit_expense(expense_id, views::patch_in(payload))
        .await?;
    Ok(Json(views::expense_out(&expense)))
}

pub async fn remove(
    State(state): State<ServerState>,
    Path(expense_id): Path<Uuid>,
) -> Result<Json<ExpenseView>, ServerError> {
    let expense = state.engine.remove_expense(expense_id).await?;
    Ok(Json(views::expense_out(&expense)))
}
