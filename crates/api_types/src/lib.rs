use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    Uzs,
    Usd,
    Eur,
    Rub,
    Kzt,
}

/// Response body for every create endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct Created {
    pub id: Uuid,
}

pub mod driver {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum DriverStatus {
        Free,
        Busy,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct DriverNew {
        pub name: String,
        pub phone: Option<String>,
        /// Balance carried over from before the driver was registered.
        #[serde(default)]
        pub opening_balance_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct DriverView {
        pub id: Uuid,
        pub name: String,
        pub phone: Option<String>,
        pub status: DriverStatus,
        pub deleted: bool,
        /// Positive when the business owes the driver.
        pub current_balance_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct FlightLineView {
        pub flight_id: Uuid,
        pub status: super::flight::FlightStatus,
        pub driver_owes_minor: Option<i64>,
        pub driver_paid_minor: Option<i64>,
        pub driver_payment_status: Option<super::payment::PaymentStatus>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BalanceEventView {
        pub id: Uuid,
        /// `opening`, `pocket_expense`, `pocket_expense_correction`,
        /// `settlement` or `debt_payment`.
        pub kind: String,
        pub delta_minor: i64,
        pub flight_id: Option<Uuid>,
        pub expense_id: Option<Uuid>,
        pub occurred_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct StatementView {
        pub driver_id: Uuid,
        pub name: String,
        pub status: DriverStatus,
        pub current_balance_minor: i64,
        pub pocket_expenses_minor: i64,
        pub outstanding_debt_minor: i64,
        pub flights: Vec<FlightLineView>,
        pub events: Vec<BalanceEventView>,
    }
}

pub mod vehicle {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct VehicleNew {
        pub plate: String,
        pub model: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct VehicleView {
        pub id: Uuid,
        pub plate: String,
        pub model: Option<String>,
        pub current_driver_id: Option<Uuid>,
    }
}

pub mod flight {
    use super::*;

    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum FlightType {
        #[default]
        Domestic,
        International,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum FlightStatus {
        Pending,
        Active,
        Completed,
        Cancelled,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum LegStatus {
        InProgress,
        Completed,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
    pub struct Coordinates {
        pub lat: f64,
        pub lng: f64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct LegNew {
        pub from_city: String,
        pub to_city: String,
        pub from_coords: Option<Coordinates>,
        pub to_coords: Option<Coordinates>,
        #[serde(default)]
        pub payment_minor: i64,
        #[serde(default)]
        pub given_budget_minor: i64,
    }

    /// Creates an `active` flight with its first leg.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct FlightNew {
        pub driver_id: Uuid,
        pub vehicle_id: Uuid,
        #[serde(default)]
        pub flight_type: FlightType,
        pub first_leg: LegNew,
    }

    /// Creates a `pending` flight.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct FlightPlan {
        pub driver_id: Uuid,
        pub vehicle_id: Uuid,
        #[serde(default)]
        pub flight_type: FlightType,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct FlightStart {
        pub first_leg: LegNew,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct FlightComplete {
        /// Share of a positive net profit kept by the driver, in `[0, 100]`.
        pub driver_profit_percent: Decimal,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct LegView {
        pub id: Uuid,
        pub position: i32,
        pub from_city: String,
        pub to_city: String,
        pub from_coords: Option<Coordinates>,
        pub to_coords: Option<Coordinates>,
        pub payment_minor: i64,
        pub given_budget_minor: i64,
        pub status: LegStatus,
        pub started_at: DateTime<Utc>,
        pub completed_at: Option<DateTime<Utc>>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct LegTotalsView {
        pub total_payment_minor: i64,
        pub total_given_budget_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SettlementView {
        pub total_income_minor: i64,
        pub total_expenses_minor: i64,
        pub net_profit_minor: i64,
        pub driver_profit_percent: Decimal,
        pub driver_profit_minor: i64,
        /// Negative when the business owes the driver.
        pub driver_owes_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct FlightView {
        pub id: Uuid,
        pub driver_id: Uuid,
        pub vehicle_id: Uuid,
        pub flight_type: FlightType,
        pub status: FlightStatus,
        pub legs: Vec<LegView>,
        pub totals: LegTotalsView,
        pub settlement: Option<SettlementView>,
        pub debt: Option<super::payment::DebtView>,
        pub created_at: DateTime<Utc>,
        pub started_at: Option<DateTime<Utc>>,
        pub finished_at: Option<DateTime<Utc>>,
    }
}

pub mod expense {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum FuelKind {
        Diesel,
        Petrol,
        Propane,
        Methane,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(tag = "kind", rename_all = "snake_case")]
    pub enum ExpenseCategory {
        Fuel { fuel: FuelKind },
        Food,
        Toll,
        Repair,
        Fine,
        Border,
        Other,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum ExpenseTiming {
        Before,
        During,
        After,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ExpenseNew {
        pub category: ExpenseCategory,
        pub timing: ExpenseTiming,
        pub amount_minor: i64,
        #[serde(default)]
        pub currency: Currency,
        /// Base-currency minor units per minor unit of `currency`. Required
        /// unless `currency` is the base currency.
        pub exchange_rate: Option<Decimal>,
        pub leg_id: Option<Uuid>,
        pub quantity: Option<Decimal>,
        pub odometer: Option<i64>,
        pub description: Option<String>,
    }

    /// Partial correction. Absent fields are left untouched.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct ExpenseUpdate {
        pub category: Option<ExpenseCategory>,
        pub amount_minor: Option<i64>,
        pub currency: Option<Currency>,
        pub exchange_rate: Option<Decimal>,
        pub leg_id: Option<Uuid>,
        pub quantity: Option<Decimal>,
        pub odometer: Option<i64>,
        pub description: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ExpenseView {
        pub id: Uuid,
        pub flight_id: Option<Uuid>,
        pub driver_id: Option<Uuid>,
        pub leg_id: Option<Uuid>,
        pub category: ExpenseCategory,
        pub timing: ExpenseTiming,
        pub amount_minor: i64,
        pub currency: Currency,
        pub exchange_rate: Decimal,
        pub base_amount_minor: i64,
        pub quantity: Option<Decimal>,
        /// `l` or `m3` for fuel.
        pub unit: Option<String>,
        pub odometer: Option<i64>,
        pub description: Option<String>,
        pub created_at: DateTime<Utc>,
        pub updated_at: DateTime<Utc>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct ExpenseTotalQuery {
        pub leg_id: Option<Uuid>,
        pub timing: Option<ExpenseTiming>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ExpenseTotal {
        pub total_minor: i64,
    }
}

pub mod payment {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum PaymentStatus {
        Pending,
        Partial,
        Paid,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct PaymentNew {
        pub amount_minor: i64,
        /// Optional idempotency key for safely retrying the same request.
        pub idempotency_key: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct DebtView {
        pub owes_minor: i64,
        pub paid_minor: i64,
        pub outstanding_minor: i64,
        pub status: PaymentStatus,
    }
}
