use crate::{
    DriverDebt, EngineError, EngineEvent, FlightStatus, RecordPaymentCmd, ResultEngine, debt,
    repository::Changes,
};

use super::Engine;

impl Engine {
    /// Record a repayment of the driver's debt for a completed flight.
    ///
    /// A replayed `idempotency_key` returns the current debt and records
    /// nothing. Payments above the outstanding amount are rejected.
    pub async fn record_payment(&self, cmd: RecordPaymentCmd) -> ResultEngine<DriverDebt> {
        let (mut flight, mut driver, _guards) = self.lock_flight_with_driver(cmd.flight_id).await?;
        if flight.status != FlightStatus::Completed {
            return Err(EngineError::InvalidTransition(format!(
                "flight {} is {}, payments need a completed flight",
                flight.id,
                flight.status.as_str()
            )));
        }

        let applied = debt::record_payment(&mut flight, &mut driver, &cmd, self.clock.now())?;
        let debt = flight.debt.ok_or_else(|| {
            EngineError::InvalidTransition(format!("flight {} is not settled", flight.id))
        })?;
        if !applied {
            return Ok(debt);
        }

        flight.version += 1;
        driver.version += 1;
        self.repository
            .save(Changes::default().flight(&flight).driver(&driver))
            .await?;

        self.emit(EngineEvent::PaymentRecorded {
            flight_id: flight.id,
            driver_id: driver.id,
            amount_minor: cmd.amount_minor,
            debt,
        });
        Ok(debt)
    }
}
