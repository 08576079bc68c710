use serde::Serialize;
use uuid::Uuid;

use crate::{
    BalanceEvent, Driver, DriverDebt, DriverStatus, EngineError, ExpenseFilter, FlightStatus,
    NewDriver, NewVehicle, ResultEngine, Settlement, Vehicle, ledger, repository::Changes,
};

use super::Engine;

/// Settlement state of one flight in a [`DriverStatement`].
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FlightLine {
    pub flight_id: Uuid,
    pub status: FlightStatus,
    pub settlement: Option<Settlement>,
    pub debt: Option<DriverDebt>,
}

/// Read model of a driver's money position.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DriverStatement {
    pub driver_id: Uuid,
    pub name: String,
    pub status: DriverStatus,
    pub current_balance_minor: i64,
    pub pocket_expenses_minor: i64,
    /// Sum of unpaid flight debts.
    pub outstanding_debt_minor: i64,
    pub flights: Vec<FlightLine>,
    pub events: Vec<BalanceEvent>,
}

impl Engine {
    /// Register a driver, recording the opening balance as its first event.
    pub async fn new_driver(&self, data: NewDriver) -> ResultEngine<Uuid> {
        let mut driver = Driver::new(data, self.clock.now())?;
        driver.version = 1;
        self.repository
            .save(Changes::default().driver(&driver))
            .await?;
        Ok(driver.id)
    }

    pub async fn driver(&self, driver_id: Uuid) -> ResultEngine<Driver> {
        self.repository.load_driver(driver_id).await
    }

    /// Soft-delete a driver. History and balance events are kept.
    pub async fn anonymize_driver(&self, driver_id: Uuid) -> ResultEngine<()> {
        let _guard = self.locks.lock(driver_id).await;
        let mut driver = self.repository.load_driver(driver_id).await?;
        driver.anonymize()?;
        driver.version += 1;
        self.repository.save(Changes::default().driver(&driver)).await
    }

    pub async fn driver_statement(&self, driver_id: Uuid) -> ResultEngine<DriverStatement> {
        let driver = self.repository.load_driver(driver_id).await?;
        let flights = self.repository.flights_of_driver(driver_id).await?;

        let outstanding_debt_minor = flights
            .iter()
            .filter_map(|flight| flight.debt)
            .try_fold(0_i64, |acc, debt| acc.checked_add(debt.outstanding_minor()))
            .ok_or_else(|| EngineError::InvalidAmount("outstanding debt overflow".to_string()))?;
        let flights = flights
            .into_iter()
            .map(|flight| FlightLine {
                flight_id: flight.id,
                status: flight.status,
                settlement: flight.settlement,
                debt: flight.debt,
            })
            .collect();

        Ok(DriverStatement {
            driver_id: driver.id,
            current_balance_minor: driver.current_balance(),
            pocket_expenses_minor: ledger::total_for(&driver.expenses, &ExpenseFilter::default())?,
            outstanding_debt_minor,
            flights,
            name: driver.name,
            status: driver.status,
            events: driver.balance_events,
        })
    }

    pub async fn new_vehicle(&self, data: NewVehicle) -> ResultEngine<Uuid> {
        let mut vehicle = Vehicle::new(data, self.clock.now())?;
        vehicle.version = 1;
        self.repository
            .save(Changes::default().vehicle(&vehicle))
            .await?;
        Ok(vehicle.id)
    }

    pub async fn vehicle(&self, vehicle_id: Uuid) -> ResultEngine<Vehicle> {
        self.repository.load_vehicle(vehicle_id).await
    }
}
