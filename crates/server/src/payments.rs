//! Debt payment API endpoints

use api_types::payment::{DebtView, PaymentNew};
use axum::{
    Json,
    extract::{Path, State},
};
use engine::RecordPaymentCmd;
use uuid::Uuid;

use crate::{ServerError, server::ServerState, views};

/// Handle requests for recording a repayment of a flight debt
///
/// Retrying with the same `idempotency_key` returns the current debt without
/// paying twice.
pub async fn payment_new(
    State(state): State<ServerState>,
    Path(flight_id): Path<Uuid>,
    Json(payload): Json<PaymentNew>,
) -> Result<Json<DebtView>, ServerError> {
    let mut cmd = RecordPaymentCmd::new(flight_id, payload.amount_minor);
    if let Some(key) = payload.idempotency_key {
        cmd = cmd.idempotency_key(key);
    }
    let debt = state.engine.record_payment(cmd).await?;
    Ok(Json(views::debt_out(&debt)))
}
