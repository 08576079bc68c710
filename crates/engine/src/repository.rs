//! Persistence port.
//!
//! The engine talks to storage only through [`Repository`]. Aggregates are
//! loaded whole and written back whole; every write carries the aggregate's
//! new `version`, which must be exactly one above the stored one (or `1` for
//! a new aggregate). A mismatch means someone else saved in between and the
//! write fails with [`EngineError::Conflict`].
//!
//! [`MemoryRepository`] keeps everything in process and is used by tests and
//! by the server's `memory` database mode. The SQL implementation lives in
//! [`crate::store`].

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    Driver, EngineError, ExpenseOwner, Flight, FlightStatus, ResultEngine, Vehicle,
};

/// Aggregates to persist atomically: either all of them are written or none.
#[derive(Clone, Copy, Debug, Default)]
pub struct Changes<'a> {
    pub flight: Option<&'a Flight>,
    pub driver: Option<&'a Driver>,
    pub vehicle: Option<&'a Vehicle>,
}

impl<'a> Changes<'a> {
    #[must_use]
    pub fn flight(mut self, flight: &'a Flight) -> Self {
        self.flight = Some(flight);
        self
    }

    #[must_use]
    pub fn driver(mut self, driver: &'a Driver) -> Self {
        self.driver = Some(driver);
        self
    }

    #[must_use]
    pub fn vehicle(mut self, vehicle: &'a Vehicle) -> Self {
        self.vehicle = Some(vehicle);
        self
    }
}

#[async_trait]
pub trait Repository: Send + Sync {
    async fn load_flight(&self, id: Uuid) -> ResultEngine<Flight>;

    async fn load_driver(&self, id: Uuid) -> ResultEngine<Driver>;

    async fn load_vehicle(&self, id: Uuid) -> ResultEngine<Vehicle>;

    /// Id of the `active` flight of `driver_id`, if any.
    async fn active_flight_of(&self, driver_id: Uuid) -> ResultEngine<Option<Uuid>>;

    /// All flights of a driver, oldest first.
    async fn flights_of_driver(&self, driver_id: Uuid) -> ResultEngine<Vec<Flight>>;

    /// Aggregate that owns the expense with `expense_id`.
    async fn expense_owner(&self, expense_id: Uuid) -> ResultEngine<ExpenseOwner>;

    async fn save(&self, changes: Changes<'_>) -> ResultEngine<()>;
}

/// Checks that `new` is the successor of the `stored` version.
pub(crate) fn check_version(
    label: &str,
    id: Uuid,
    stored: Option<i64>,
    new: i64,
) -> ResultEngine<()> {
    let expected = stored.map_or(1, |version| version + 1);
    if new != expected {
        return Err(EngineError::Conflict(format!(
            "{label} {id} was modified concurrently"
        )));
    }
    Ok(())
}

#[derive(Debug, Default)]
struct State {
    flights: HashMap<Uuid, Flight>,
    drivers: HashMap<Uuid, Driver>,
    vehicles: HashMap<Uuid, Vehicle>,
}

#[derive(Debug, Default)]
pub struct MemoryRepository {
    state: RwLock<State>,
}

impl MemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn load_flight(&self, id: Uuid) -> ResultEngine<Flight> {
        self.state
            .read()
            .await
            .flights
            .get(&id)
            .cloned()
            .ok_or_else(|| EngineError::KeyNotFound("flight not exists".to_string()))
    }

    async fn load_driver(&self, id: Uuid) -> ResultEngine<Driver> {
        self.state
            .read()
            .await
            .drivers
            .get(&id)
            .cloned()
            .ok_or_else(|| EngineError::KeyNotFound("driver not exists".to_string()))
    }

    async fn load_vehicle(&self, id: Uuid) -> ResultEngine<Vehicle> {
        self.state
            .read()
            .await
            .vehicles
            .get(&id)
            .cloned()
            .ok_or_else(|| EngineError::KeyNotFound("vehicle not exists".to_string()))
    }

    async fn active_flight_of(&self, driver_id: Uuid) -> ResultEngine<Option<Uuid>> {
        Ok(self
            .state
            .read()
            .await
            .flights
            .values()
            .find(|flight| flight.driver_id == driver_id && flight.status == FlightStatus::Active)
            .map(|flight| flight.id))
    }

    async fn flights_of_driver(&self, driver_id: Uuid) -> ResultEngine<Vec<Flight>> {
        let state = self.state.read().await;
        let mut flights: Vec<Flight> = state
            .flights
            .values()
            .filter(|flight| flight.driver_id == driver_id)
            .cloned()
            .collect();
        flights.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(flights)
    }

    async fn expense_owner(&self, expense_id: Uuid) -> ResultEngine<ExpenseOwner> {
        let state = self.state.read().await;
        state
            .flights
            .values()
            .flat_map(|flight| flight.expenses.iter())
            .chain(state.drivers.values().flat_map(|driver| driver.expenses.iter()))
            .find(|expense| expense.id == expense_id)
            .map(|expense| expense.owner)
            .ok_or_else(|| EngineError::KeyNotFound("expense not exists".to_string()))
    }

    async fn save(&self, changes: Changes<'_>) -> ResultEngine<()> {
        let mut state = self.state.write().await;

        if let Some(flight) = changes.flight {
            let stored = state.flights.get(&flight.id).map(|f| f.version);
            check_version("flight", flight.id, stored, flight.version)?;
        }
        if let Some(driver) = changes.driver {
            let stored = state.drivers.get(&driver.id).map(|d| d.version);
            check_version("driver", driver.id, stored, driver.version)?;
        }
        if let Some(vehicle) = changes.vehicle {
            let stored = state.vehicles.get(&vehicle.id).map(|v| v.version);
            check_version("vehicle", vehicle.id, stored, vehicle.version)?;
        }

        if let Some(flight) = changes.flight {
            state.flights.insert(flight.id, flight.clone());
        }
        if let Some(driver) = changes.driver {
            state.drivers.insert(driver.id, driver.clone());
        }
        if let Some(vehicle) = changes.vehicle {
            state.vehicles.insert(vehicle.id, vehicle.clone());
        }
        Ok(())
    }
}
