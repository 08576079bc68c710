//! Financial settlement engine for trucking flights.
//!
//! Drivers run flights made of legs; expenses are recorded against flights
//! (or against the driver before a flight starts) in any supported currency
//! and normalized to the base currency. Completing a flight settles it once
//! and leaves the driver with a debt that is repaid over time.
//!
//! All amounts are integer minor units. All writes go through [`Engine`].

pub use balance::{BalanceEvent, BalanceEventKind};
pub use clock::{Clock, FixedClock, SystemClock};
pub use commands::{
    CreateFlightCmd, ExpensePatch, NewDriver, NewExpense, NewLeg, NewVehicle, RecordPaymentCmd,
};
pub use currency::{Currency, to_base};
pub use debt::{DebtPayment, DriverDebt, PaymentStatus};
pub use drivers::{Driver, DriverStatus};
pub use error::EngineError;
pub use events::{BroadcastNotifier, EngineEvent, NoopNotifier, Notifier};
pub use expenses::{Expense, ExpenseCategory, ExpenseOwner, ExpenseTiming, FuelKind, Unit};
pub use flights::{Flight, FlightStatus, FlightType};
pub use ledger::{ExpenseFilter, total_for};
pub use legs::{Coordinates, Leg, LegStatus, LegTotals};
pub use ops::{DriverStatement, Engine, EngineBuilder, FlightLine};
pub use repository::{Changes, MemoryRepository, Repository};
pub use settlement::{Settlement, settle, validate_percent};
pub use store::SqlRepository;
pub use vehicles::Vehicle;

mod balance;
mod clock;
mod commands;
mod currency;
mod debt;
mod drivers;
mod error;
mod events;
mod expenses;
mod flights;
mod ledger;
mod legs;
mod ops;
mod repository;
mod settlement;
mod store;
mod util;
mod vehicles;

pub type ResultEngine<T> = Result<T, EngineError>;
