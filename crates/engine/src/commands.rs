//! Command structs for engine operations.
//!
//! These types group parameters for write operations (flights, legs,
//! expenses, payments), keeping call sites readable and avoiding long
//! argument lists. They arrive already parsed: the engine never sees raw HTTP
//! bodies or voice transcripts.

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{Coordinates, Currency, ExpenseCategory, ExpenseTiming};

/// Register a new driver.
#[derive(Clone, Debug)]
pub struct NewDriver {
    pub name: String,
    pub phone: Option<String>,
    pub opening_balance_minor: i64,
}

impl NewDriver {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            phone: None,
            opening_balance_minor: 0,
        }
    }

    #[must_use]
    pub fn phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    #[must_use]
    pub fn opening_balance(mut self, amount_minor: i64) -> Self {
        self.opening_balance_minor = amount_minor;
        self
    }
}

/// Register a new vehicle.
#[derive(Clone, Debug)]
pub struct NewVehicle {
    pub plate: String,
    pub model: Option<String>,
}

impl NewVehicle {
    #[must_use]
    pub fn new(plate: impl Into<String>) -> Self {
        Self {
            plate: plate.into(),
            model: None,
        }
    }

    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}

/// Data of a leg to append to a flight.
#[derive(Clone, Debug)]
pub struct NewLeg {
    pub from_city: String,
    pub to_city: String,
    pub from_coords: Option<Coordinates>,
    pub to_coords: Option<Coordinates>,
    pub payment_minor: i64,
    pub given_budget_minor: i64,
}

impl NewLeg {
    #[must_use]
    pub fn new(from_city: impl Into<String>, to_city: impl Into<String>) -> Self {
        Self {
            from_city: from_city.into(),
            to_city: to_city.into(),
            from_coords: None,
            to_coords: None,
            payment_minor: 0,
            given_budget_minor: 0,
        }
    }

    #[must_use]
    pub fn payment(mut self, amount_minor: i64) -> Self {
        self.payment_minor = amount_minor;
        self
    }

    #[must_use]
    pub fn given_budget(mut self, amount_minor: i64) -> Self {
        self.given_budget_minor = amount_minor;
        self
    }

    #[must_use]
    pub fn coordinates(mut self, from: Coordinates, to: Coordinates) -> Self {
        self.from_coords = Some(from);
        self.to_coords = Some(to);
        self
    }
}

/// Create a flight directly in the `active` state.
#[derive(Clone, Debug)]
pub struct CreateFlightCmd {
    pub driver_id: Uuid,
    pub vehicle_id: Uuid,
    pub flight_type: crate::FlightType,
    pub first_leg: NewLeg,
}

impl CreateFlightCmd {
    #[must_use]
    pub fn new(driver_id: Uuid, vehicle_id: Uuid, first_leg: NewLeg) -> Self {
        Self {
            driver_id,
            vehicle_id,
            flight_type: crate::FlightType::Domestic,
            first_leg,
        }
    }

    #[must_use]
    pub fn international(mut self) -> Self {
        self.flight_type = crate::FlightType::International;
        self
    }
}

/// A new expense entry.
///
/// `exchange_rate` converts one minor unit of `currency` into base-currency
/// minor units and is frozen into the stored entry. It may only be omitted
/// for amounts already in the base currency.
#[derive(Clone, Debug)]
pub struct NewExpense {
    pub category: ExpenseCategory,
    pub timing: ExpenseTiming,
    pub amount_minor: i64,
    pub currency: Currency,
    pub exchange_rate: Option<Decimal>,
    pub leg_id: Option<Uuid>,
    pub quantity: Option<Decimal>,
    pub odometer: Option<i64>,
    pub description: Option<String>,
}

impl NewExpense {
    /// An expense in the given currency without a rate.
    #[must_use]
    pub fn new(
        category: ExpenseCategory,
        timing: ExpenseTiming,
        amount_minor: i64,
        currency: Currency,
    ) -> Self {
        Self {
            category,
            timing,
            amount_minor,
            currency,
            exchange_rate: None,
            leg_id: None,
            quantity: None,
            odometer: None,
            description: None,
        }
    }

    #[must_use]
    pub fn exchange_rate(mut self, rate: Decimal) -> Self {
        self.exchange_rate = Some(rate);
        self
    }

    #[must_use]
    pub fn leg_id(mut self, leg_id: Uuid) -> Self {
        self.leg_id = Some(leg_id);
        self
    }

    #[must_use]
    pub fn quantity(mut self, quantity: Decimal) -> Self {
        self.quantity = Some(quantity);
        self
    }

    #[must_use]
    pub fn odometer(mut self, odometer: i64) -> Self {
        self.odometer = Some(odometer);
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Correction of an existing expense. `None` fields are left untouched.
///
/// Nested options (`Option<Option<_>>`) distinguish "leave as is" (`None`)
/// from "clear" (`Some(None)`).
#[derive(Clone, Debug, Default)]
pub struct ExpensePatch {
    pub category: Option<ExpenseCategory>,
    pub amount_minor: Option<i64>,
    pub currency: Option<Currency>,
    pub exchange_rate: Option<Decimal>,
    pub leg_id: Option<Option<Uuid>>,
    pub quantity: Option<Option<Decimal>>,
    pub odometer: Option<Option<i64>>,
    pub description: Option<Option<String>>,
}

impl ExpensePatch {
    #[must_use]
    pub fn amount(mut self, amount_minor: i64) -> Self {
        self.amount_minor = Some(amount_minor);
        self
    }

    /// Moving to another currency needs a rate unless it is the base one.
    #[must_use]
    pub fn currency(mut self, currency: Currency) -> Self {
        self.currency = Some(currency);
        self
    }

    #[must_use]
    pub fn exchange_rate(mut self, rate: Decimal) -> Self {
        self.exchange_rate = Some(rate);
        self
    }

    #[must_use]
    pub fn category(mut self, category: ExpenseCategory) -> Self {
        self.category = Some(category);
        self
    }

    #[must_use]
    pub fn quantity(mut self, quantity: Option<Decimal>) -> Self {
        self.quantity = Some(quantity);
        self
    }

    #[must_use]
    pub fn description(mut self, description: Option<String>) -> Self {
        self.description = Some(description);
        self
    }

    /// Returns `true` when the patch touches the converted amount.
    pub(crate) fn changes_amount(&self) -> bool {
        self.amount_minor.is_some() || self.exchange_rate.is_some() || self.currency.is_some()
    }
}

/// Record a partial or full repayment of a driver's debt for a flight.
#[derive(Clone, Debug)]
pub struct RecordPaymentCmd {
    pub flight_id: Uuid,
    pub amount_minor: i64,
    pub idempotency_key: Option<String>,
}

impl RecordPaymentCmd {
    #[must_use]
    pub fn new(flight_id: Uuid, amount_minor: i64) -> Self {
        Self {
            flight_id,
            amount_minor,
            idempotency_key: None,
        }
    }

    #[must_use]
    pub fn idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }
}
