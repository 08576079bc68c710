use std::{fmt, sync::Arc};

use sea_orm::DatabaseConnection;
use uuid::Uuid;

use crate::{
    Clock, Currency, Driver, EngineError, EngineEvent, Flight, MemoryRepository, NoopNotifier,
    Notifier, ResultEngine, SqlRepository, SystemClock, Vehicle, repository::Repository,
};

mod drivers;
mod expenses;
mod flights;
mod locks;
mod payments;

pub use drivers::{DriverStatement, FlightLine};

use locks::Locks;

/// Entry point of every operation.
///
/// Operations on the same flight or driver are serialized through per-id
/// locks; when both are needed the driver is always locked first. Across
/// processes, optimistic versions on each aggregate turn a lost race into
/// [`EngineError::Conflict`].
pub struct Engine {
    repository: Arc<dyn Repository>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    base_currency: Currency,
    locks: Locks,
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("base_currency", &self.base_currency)
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    #[must_use]
    pub fn base_currency(&self) -> Currency {
        self.base_currency
    }

    fn emit(&self, event: EngineEvent) {
        self.notifier.emit(&event);
    }

    /// Loads the flight and its driver, both locked.
    ///
    /// The returned guards must be held until the aggregates are saved.
    async fn lock_flight_with_driver(
        &self,
        flight_id: Uuid,
    ) -> ResultEngine<(Flight, Driver, [locks::Guard; 2])> {
        let driver_id = self.repository.load_flight(flight_id).await?.driver_id;
        let driver_guard = self.locks.lock(driver_id).await;
        let flight_guard = self.locks.lock(flight_id).await;
        let flight = self.repository.load_flight(flight_id).await?;
        let driver = self.repository.load_driver(driver_id).await?;
        Ok((flight, driver, [driver_guard, flight_guard]))
    }

    /// Releases the flight's vehicle, if still assigned to its driver.
    async fn release_vehicle(&self, flight: &Flight) -> ResultEngine<Option<Vehicle>> {
        let mut vehicle = self.repository.load_vehicle(flight.vehicle_id).await?;
        if vehicle.release(flight.driver_id) {
            vehicle.version += 1;
            return Ok(Some(vehicle));
        }
        Ok(None)
    }
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    repository: Option<Arc<dyn Repository>>,
    notifier: Option<Arc<dyn Notifier>>,
    clock: Option<Arc<dyn Clock>>,
    base_currency: Currency,
}

impl EngineBuilder {
    /// Persist to the given database.
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.repository = Some(Arc::new(SqlRepository::new(db)));
        self
    }

    /// Keep everything in memory.
    pub fn in_memory(mut self) -> EngineBuilder {
        self.repository = Some(Arc::new(MemoryRepository::new()));
        self
    }

    pub fn repository(mut self, repository: Arc<dyn Repository>) -> EngineBuilder {
        self.repository = Some(repository);
        self
    }

    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> EngineBuilder {
        self.notifier = Some(notifier);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> EngineBuilder {
        self.clock = Some(clock);
        self
    }

    /// Currency every expense is normalized into. Defaults to UZS.
    pub fn base_currency(mut self, currency: Currency) -> EngineBuilder {
        self.base_currency = currency;
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        let repository = self.repository.ok_or_else(|| {
            EngineError::Validation("engine requires a database or repository".to_string())
        })?;
        Ok(Engine {
            repository,
            notifier: self.notifier.unwrap_or_else(|| Arc::new(NoopNotifier)),
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            base_currency: self.base_currency,
            locks: Locks::default(),
        })
    }
}
