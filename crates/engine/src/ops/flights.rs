use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    CreateFlightCmd, Driver, DriverStatus, EngineError, EngineEvent, Flight, FlightStatus,
    FlightType, Leg, LegTotals, NewLeg, ResultEngine, Settlement, repository::Changes,
    settlement::validate_percent,
};

use super::Engine;

impl Engine {
    pub async fn flight(&self, flight_id: Uuid) -> ResultEngine<Flight> {
        self.repository.load_flight(flight_id).await
    }

    pub async fn flights_of_driver(&self, driver_id: Uuid) -> ResultEngine<Vec<Flight>> {
        self.repository.flights_of_driver(driver_id).await
    }

    /// Create a `pending` flight. The driver stays free until it starts.
    pub async fn plan_flight(
        &self,
        driver_id: Uuid,
        vehicle_id: Uuid,
        flight_type: FlightType,
    ) -> ResultEngine<Flight> {
        self.repository.load_driver(driver_id).await?.ensure_active()?;
        self.repository.load_vehicle(vehicle_id).await?;

        let mut flight = Flight::plan(driver_id, vehicle_id, flight_type, self.clock.now());
        flight.version = 1;
        self.repository.save(Changes::default().flight(&flight)).await?;
        Ok(flight)
    }

    /// Create a flight directly in the `active` state with its first leg.
    pub async fn create_flight(&self, cmd: CreateFlightCmd) -> ResultEngine<Flight> {
        let _driver_guard = self.locks.lock(cmd.driver_id).await;
        let driver = self.repository.load_driver(cmd.driver_id).await?;
        let flight = Flight::plan(
            cmd.driver_id,
            cmd.vehicle_id,
            cmd.flight_type,
            self.clock.now(),
        );
        self.start_locked(flight, driver, cmd.first_leg).await
    }

    /// Move a `pending` flight to `active`.
    pub async fn start_flight(&self, flight_id: Uuid, first_leg: NewLeg) -> ResultEngine<Flight> {
        let (flight, driver, _guards) = self.lock_flight_with_driver(flight_id).await?;
        self.start_locked(flight, driver, first_leg).await
    }

    async fn start_locked(
        &self,
        mut flight: Flight,
        mut driver: Driver,
        first_leg: NewLeg,
    ) -> ResultEngine<Flight> {
        driver.ensure_active()?;
        if let Some(active) = self.repository.active_flight_of(driver.id).await? {
            return Err(EngineError::Conflict(format!(
                "driver {} is already on flight {active}",
                driver.id
            )));
        }

        let _vehicle_guard = self.locks.lock(flight.vehicle_id).await;
        let mut vehicle = self.repository.load_vehicle(flight.vehicle_id).await?;
        if let Some(holder) = vehicle.current_driver_id
            && holder != driver.id
        {
            return Err(EngineError::Conflict(format!(
                "vehicle {} is assigned to driver {holder}",
                vehicle.id
            )));
        }

        let now = self.clock.now();
        flight.start(first_leg, now)?;
        driver.status = DriverStatus::Busy;
        vehicle.current_driver_id = Some(driver.id);

        flight.version += 1;
        driver.version += 1;
        vehicle.version += 1;
        self.repository
            .save(
                Changes::default()
                    .flight(&flight)
                    .driver(&driver)
                    .vehicle(&vehicle),
            )
            .await?;

        self.emit(EngineEvent::FlightStarted {
            flight_id: flight.id,
            driver_id: driver.id,
        });
        Ok(flight)
    }

    pub async fn add_leg(&self, flight_id: Uuid, data: NewLeg) -> ResultEngine<Leg> {
        let _guard = self.locks.lock(flight_id).await;
        let mut flight = self.repository.load_flight(flight_id).await?;
        let leg = flight.add_leg(data, self.clock.now())?.clone();

        flight.version += 1;
        self.repository.save(Changes::default().flight(&flight)).await?;

        self.emit(EngineEvent::LegAdded {
            flight_id,
            leg: leg.clone(),
        });
        Ok(leg)
    }

    pub async fn complete_leg(&self, flight_id: Uuid, leg_id: Uuid) -> ResultEngine<Leg> {
        let _guard = self.locks.lock(flight_id).await;
        let mut flight = self.repository.load_flight(flight_id).await?;
        let leg = flight.complete_leg(leg_id, self.clock.now())?.clone();

        flight.version += 1;
        self.repository.save(Changes::default().flight(&flight)).await?;

        self.emit(EngineEvent::LegCompleted {
            flight_id,
            leg: leg.clone(),
        });
        Ok(leg)
    }

    /// Sums of payments and given budgets over all legs of a flight.
    pub async fn leg_totals(&self, flight_id: Uuid) -> ResultEngine<LegTotals> {
        self.repository.load_flight(flight_id).await?.totals()
    }

    /// Complete an active flight and settle it.
    ///
    /// Completing an already completed flight returns its stored settlement
    /// and changes nothing.
    pub async fn complete_flight(
        &self,
        flight_id: Uuid,
        driver_profit_percent: Decimal,
    ) -> ResultEngine<Settlement> {
        validate_percent(driver_profit_percent)?;
        let (mut flight, mut driver, _guards) = self.lock_flight_with_driver(flight_id).await?;
        if flight.status == FlightStatus::Completed
            && let Some(settlement) = flight.settlement
        {
            return Ok(settlement);
        }

        let settlement = flight.complete(&mut driver, driver_profit_percent, self.clock.now())?;
        let _vehicle_guard = self.locks.lock(flight.vehicle_id).await;
        let vehicle = self.release_vehicle(&flight).await?;

        flight.version += 1;
        driver.version += 1;
        let mut changes = Changes::default().flight(&flight).driver(&driver);
        if let Some(vehicle) = vehicle.as_ref() {
            changes = changes.vehicle(vehicle);
        }
        self.repository.save(changes).await?;

        self.emit(EngineEvent::FlightCompleted {
            flight_id,
            driver_id: driver.id,
            settlement,
        });
        Ok(settlement)
    }

    /// Cancel a pending or active flight. Nothing is settled.
    ///
    /// Only an active flight holds its vehicle, so a pending one leaves the
    /// vehicle assignment alone.
    pub async fn cancel_flight(&self, flight_id: Uuid) -> ResultEngine<Flight> {
        let (mut flight, mut driver, _guards) = self.lock_flight_with_driver(flight_id).await?;
        let was_active = flight.status == FlightStatus::Active;
        flight.cancel(&mut driver, self.clock.now())?;
        let (vehicle, _vehicle_guard) = if was_active {
            let guard = self.locks.lock(flight.vehicle_id).await;
            (self.release_vehicle(&flight).await?, Some(guard))
        } else {
            (None, None)
        };

        flight.version += 1;
        driver.version += 1;
        let mut changes = Changes::default().flight(&flight).driver(&driver);
        if let Some(vehicle) = vehicle.as_ref() {
            changes = changes.vehicle(vehicle);
        }
        self.repository.save(changes).await?;

        self.emit(EngineEvent::FlightCancelled {
            flight_id,
            driver_id: driver.id,
        });
        Ok(flight)
    }
}
