//! Mapping between wire types and engine types.

use api_types::{
    Currency,
    driver::{BalanceEventView, DriverStatus, DriverView, FlightLineView, StatementView},
    expense::{ExpenseCategory, ExpenseTiming, ExpenseUpdate, ExpenseView, FuelKind},
    flight::{
        Coordinates, FlightStatus, FlightType, FlightView, LegNew, LegStatus, LegTotalsView,
        LegView, SettlementView,
    },
    payment::{DebtView, PaymentStatus},
    vehicle::VehicleView,
};

pub(crate) fn currency_in(currency: Currency) -> engine::Currency {
    match currency {
        Currency::Uzs => engine::Currency::Uzs,
        Currency::Usd => engine::Currency::Usd,
        Currency::Eur => engine::Currency::Eur,
        Currency::Rub => engine::Currency::Rub,
        Currency::Kzt => engine::Currency::Kzt,
    }
}

fn currency_out(currency: engine::Currency) -> Currency {
    match currency {
        engine::Currency::Uzs => Currency::Uzs,
        engine::Currency::Usd => Currency::Usd,
        engine::Currency::Eur => Currency::Eur,
        engine::Currency::Rub => Currency::Rub,
        engine::Currency::Kzt => Currency::Kzt,
    }
}

fn fuel_in(fuel: FuelKind) -> engine::FuelKind {
    match fuel {
        FuelKind::Diesel => engine::FuelKind::Diesel,
        FuelKind::Petrol => engine::FuelKind::Petrol,
        FuelKind::Propane => engine::FuelKind::Propane,
        FuelKind::Methane => engine::FuelKind::Methane,
    }
}

fn fuel_out(fuel: engine::FuelKind) -> FuelKind {
    match fuel {
        engine::FuelKind::Diesel => FuelKind::Diesel,
        engine::FuelKind::Petrol => FuelKind::Petrol,
        engine::FuelKind::Propane => FuelKind::Propane,
        engine::FuelKind::Methane => FuelKind::Methane,
    }
}

pub(crate) fn category_in(category: ExpenseCategory) -> engine::ExpenseCategory {
    match category {
        ExpenseCategory::Fuel { fuel } => engine::ExpenseCategory::Fuel {
            fuel: fuel_in(fuel),
        },
        ExpenseCategory::Food => engine::ExpenseCategory::Food,
        ExpenseCategory::Toll => engine::ExpenseCategory::Toll,
        ExpenseCategory::Repair => engine::ExpenseCategory::Repair,
        ExpenseCategory::Fine => engine::ExpenseCategory::Fine,
        ExpenseCategory::Border => engine::ExpenseCategory::Border,
        ExpenseCategory::Other => engine::ExpenseCategory::Other,
    }
}

fn category_out(category: engine::ExpenseCategory) -> ExpenseCategory {
    match category {
        engine::ExpenseCategory::Fuel { fuel } => ExpenseCategory::Fuel {
            fuel: fuel_out(fuel),
        },
        engine::ExpenseCategory::Food => ExpenseCategory::Food,
        engine::ExpenseCategory::Toll => ExpenseCategory::Toll,
        engine::ExpenseCategory::Repair => ExpenseCategory::Repair,
        engine::ExpenseCategory::Fine => ExpenseCategory::Fine,
        engine::ExpenseCategory::Border => ExpenseCategory::Border,
        engine::ExpenseCategory::Other => ExpenseCategory::Other,
    }
}

pub(crate) fn timing_in(timing: ExpenseTiming) -> engine::ExpenseTiming {
    match timing {
        ExpenseTiming::Before => engine::ExpenseTiming::Before,
        ExpenseTiming::During => engine::ExpenseTiming::During,
        ExpenseTiming::After => engine::ExpenseTiming::After,
    }
}

fn timing_out(timing: engine::ExpenseTiming) -> ExpenseTiming {
    match timing {
        engine::ExpenseTiming::Before => ExpenseTiming::Before,
        engine::ExpenseTiming::During => ExpenseTiming::During,
        engine::ExpenseTiming::After => ExpenseTiming::After,
    }
}

pub(crate) fn flight_type_in(flight_type: FlightType) -> engine::FlightType {
    match flight_type {
        FlightType::Domestic => engine::FlightType::Domestic,
        FlightType::International => engine::FlightType::International,
    }
}

fn flight_type_out(flight_type: engine::FlightType) -> FlightType {
    match flight_type {
        engine::FlightType::Domestic => FlightType::Domestic,
        engine::FlightType::International => FlightType::International,
    }
}

fn flight_status_out(status: engine::FlightStatus) -> FlightStatus {
    match status {
        engine::FlightStatus::Pending => FlightStatus::Pending,
        engine::FlightStatus::Active => FlightStatus::Active,
        engine::FlightStatus::Completed => FlightStatus::Completed,
        engine::FlightStatus::Cancelled => FlightStatus::Cancelled,
    }
}

fn payment_status_out(status: engine::PaymentStatus) -> PaymentStatus {
    match status {
        engine::PaymentStatus::Pending => PaymentStatus::Pending,
        engine::PaymentStatus::Partial => PaymentStatus::Partial,
        engine::PaymentStatus::Paid => PaymentStatus::Paid,
    }
}

fn driver_status_out(status: engine::DriverStatus) -> DriverStatus {
    match status {
        engine::DriverStatus::Free => DriverStatus::Free,
        engine::DriverStatus::Busy => DriverStatus::Busy,
    }
}

fn coords_in(coords: Coordinates) -> engine::Coordinates {
    engine::Coordinates {
        lat: coords.lat,
        lng: coords.lng,
    }
}

fn coords_out(coords: engine::Coordinates) -> Coordinates {
    Coordinates {
        lat: coords.lat,
        lng: coords.lng,
    }
}

pub(crate) fn leg_in(leg: LegNew) -> engine::NewLeg {
    let mut data = engine::NewLeg::new(leg.from_city, leg.to_city)
        .payment(leg.payment_minor)
        .given_budget(leg.given_budget_minor);
    data.from_coords = leg.from_coords.map(coords_in);
    data.to_coords = leg.to_coords.map(coords_in);
    data
}

pub(crate) fn patch_in(update: ExpenseUpdate) -> engine::ExpensePatch {
    engine::ExpensePatch {
        category: update.category.map(category_in),
        amount_minor: update.amount_minor,
        currency: update.currency.map(currency_in),
        exchange_rate: update.exchange_rate,
        leg_id: update.leg_id.map(Some),
        quantity: update.quantity.map(Some),
        odometer: update.odometer.map(Some),
        description: update.description.map(Some),
    }
}

pub(crate) fn leg_out(leg: &engine::Leg) -> LegView {
    LegView {
        id: leg.id,
        position: leg.position,
        from_city: leg.from_city.clone(),
        to_city: leg.to_city.clone(),
        from_coords: leg.from_coords.map(coords_out),
        to_coords: leg.to_coords.map(coords_out),
        payment_minor: leg.payment_minor,
        given_budget_minor: leg.given_budget_minor,
        status: match leg.status {
            engine::LegStatus::InProgress => LegStatus::InProgress,
            engine::LegStatus::Completed => LegStatus::Completed,
        },
        started_at: leg.started_at,
        completed_at: leg.completed_at,
    }
}

pub(crate) fn totals_out(totals: engine::LegTotals) -> LegTotalsView {
    LegTotalsView {
        total_payment_minor: totals.total_payment_minor,
        total_given_budget_minor: totals.total_given_budget_minor,
    }
}

pub(crate) fn settlement_out(settlement: &engine::Settlement) -> SettlementView {
    SettlementView {
        total_income_minor: settlement.total_income_minor,
        total_expenses_minor: settlement.total_expenses_minor,
        net_profit_minor: settlement.net_profit_minor,
        driver_profit_percent: settlement.driver_profit_percent,
        driver_profit_minor: settlement.driver_profit_minor,
        driver_owes_minor: settlement.driver_owes_minor,
    }
}

pub(crate) fn debt_out(debt: &engine::DriverDebt) -> DebtView {
    DebtView {
        owes_minor: debt.owes_minor,
        paid_minor: debt.paid_minor,
        outstanding_minor: debt.outstanding_minor(),
        status: payment_status_out(debt.status),
    }
}

pub(crate) fn flight_out(flight: &engine::Flight) -> Result<FlightView, engine::EngineError> {
    Ok(FlightView {
        id: flight.id,
        driver_id: flight.driver_id,
        vehicle_id: flight.vehicle_id,
        flight_type: flight_type_out(flight.flight_type),
        status: flight_status_out(flight.status),
        legs: flight.legs.iter().map(leg_out).collect(),
        totals: totals_out(flight.totals()?),
        settlement: flight.settlement.as_ref().map(settlement_out),
        debt: flight.debt.as_ref().map(debt_out),
        created_at: flight.created_at,
        started_at: flight.started_at,
        finished_at: flight.finished_at,
    })
}

pub(crate) fn expense_out(expense: &engine::Expense) -> ExpenseView {
    let (flight_id, driver_id) = match expense.owner {
        engine::ExpenseOwner::Flight { flight_id } => (Some(flight_id), None),
        engine::ExpenseOwner::Driver { driver_id } => (None, Some(driver_id)),
    };
    ExpenseView {
        id: expense.id,
        flight_id,
        driver_id,
        leg_id: expense.leg_id,
        category: category_out(expense.category),
        timing: timing_out(expense.timing),
        amount_minor: expense.amount_minor,
        currency: currency_out(expense.currency),
        exchange_rate: expense.exchange_rate,
        base_amount_minor: expense.base_amount_minor,
        quantity: expense.quantity,
        unit: expense.unit().map(|unit| {
            match unit {
                engine::Unit::Litre => "l",
                engine::Unit::CubicMetre => "m3",
            }
            .to_string()
        }),
        odometer: expense.odometer,
        description: expense.description.clone(),
        created_at: expense.created_at,
        updated_at: expense.updated_at,
    }
}

pub(crate) fn driver_out(driver: &engine::Driver) -> DriverView {
    DriverView {
        id: driver.id,
        name: driver.name.clone(),
        phone: driver.phone.clone(),
        status: driver_status_out(driver.status),
        deleted: driver.deleted,
        current_balance_minor: driver.current_balance(),
    }
}

pub(crate) fn vehicle_out(vehicle: &engine::Vehicle) -> VehicleView {
    VehicleView {
        id: vehicle.id,
        plate: vehicle.plate.clone(),
        model: vehicle.model.clone(),
        current_driver_id: vehicle.current_driver_id,
    }
}

pub(crate) fn statement_out(statement: &engine::DriverStatement) -> StatementView {
    StatementView {
        driver_id: statement.driver_id,
        name: statement.name.clone(),
        status: driver_status_out(statement.status),
        current_balance_minor: statement.current_balance_minor,
        pocket_expenses_minor: statement.pocket_expenses_minor,
        outstanding_debt_minor: statement.outstanding_debt_minor,
        flights: statement
            .flights
            .iter()
            .map(|line| FlightLineView {
                flight_id: line.flight_id,
                status: flight_status_out(line.status),
                driver_owes_minor: line.settlement.map(|s| s.driver_owes_minor),
                driver_paid_minor: line.debt.map(|debt| debt.paid_minor),
                driver_payment_status: line.debt.map(|debt| payment_status_out(debt.status)),
            })
            .collect(),
        events: statement
            .events
            .iter()
            .map(|event| BalanceEventView {
                id: event.id,
                kind: event.kind.as_str().to_string(),
                delta_minor: event.delta_minor,
                flight_id: event.flight_id,
                expense_id: event.expense_id,
                occurred_at: event.occurred_at,
            })
            .collect(),
    }
}
