use std::sync::Arc;

use rust_decimal::Decimal;
use uuid::Uuid;

use engine::{
    BalanceEventKind, BroadcastNotifier, CreateFlightCmd, Currency, DriverStatus, Engine,
    EngineError, ExpenseCategory, ExpenseFilter, ExpenseOwner, ExpensePatch, ExpenseTiming,
    FlightStatus, FlightType, FuelKind, NewDriver, NewExpense, NewLeg, NewVehicle,
    PaymentStatus, RecordPaymentCmd,
};

async fn engine() -> Engine {
    Engine::builder().in_memory().build().await.unwrap()
}

async fn driver_and_truck(engine: &Engine) -> (Uuid, Uuid) {
    let driver = engine
        .new_driver(NewDriver::new("Aziz Karimov").phone("+998 90 123 45 67"))
        .await
        .unwrap();
    let vehicle = engine
        .new_vehicle(NewVehicle::new("01 a 777 aa").model("MAN TGX"))
        .await
        .unwrap();
    (driver, vehicle)
}

fn spend(category: ExpenseCategory, timing: ExpenseTiming, amount: i64) -> NewExpense {
    NewExpense::new(category, timing, amount, Currency::Uzs)
}

fn flight_owner(flight_id: Uuid) -> ExpenseOwner {
    ExpenseOwner::Flight { flight_id }
}

/// Completes every open leg and settles the flight.
async fn finish(engine: &Engine, flight_id: Uuid, percent: i64) -> engine::Settlement {
    let flight = engine.flight(flight_id).await.unwrap();
    for leg in flight.legs.iter().filter(|leg| leg.completed_at.is_none()) {
        engine.complete_leg(flight_id, leg.id).await.unwrap();
    }
    engine
        .complete_flight(flight_id, Decimal::from(percent))
        .await
        .unwrap()
}

#[tokio::test]
async fn single_leg_flight_settles_and_leaves_debt() {
    let engine = engine().await;
    let (driver_id, vehicle_id) = driver_and_truck(&engine).await;

    let flight = engine
        .create_flight(CreateFlightCmd::new(
            driver_id,
            vehicle_id,
            NewLeg::new("Tashkent", "Samarkand")
                .payment(500_000)
                .given_budget(200_000),
        ))
        .await
        .unwrap();
    assert_eq!(flight.status, FlightStatus::Active);
    assert_eq!(engine.driver(driver_id).await.unwrap().status, DriverStatus::Busy);
    assert_eq!(
        engine.vehicle(vehicle_id).await.unwrap().current_driver_id,
        Some(driver_id)
    );

    engine
        .add_expense(
            flight_owner(flight.id),
            spend(ExpenseCategory::Food, ExpenseTiming::During, 300_000),
        )
        .await
        .unwrap();

    let settlement = finish(&engine, flight.id, 30).await;
    assert_eq!(settlement.total_income_minor, 700_000);
    assert_eq!(settlement.total_expenses_minor, 300_000);
    assert_eq!(settlement.net_profit_minor, 400_000);
    assert_eq!(settlement.driver_profit_minor, 120_000);
    assert_eq!(settlement.driver_owes_minor, 280_000);

    let flight = engine.flight(flight.id).await.unwrap();
    assert_eq!(flight.status, FlightStatus::Completed);
    assert_eq!(flight.debt.unwrap().status, PaymentStatus::Pending);

    let driver = engine.driver(driver_id).await.unwrap();
    assert_eq!(driver.status, DriverStatus::Free);
    assert_eq!(driver.current_balance(), -280_000);
    assert_eq!(engine.vehicle(vehicle_id).await.unwrap().current_driver_id, None);
}

#[tokio::test]
async fn loss_means_business_owes_driver() {
    let engine = engine().await;
    let (driver_id, vehicle_id) = driver_and_truck(&engine).await;
    let flight = engine
        .create_flight(CreateFlightCmd::new(
            driver_id,
            vehicle_id,
            NewLeg::new("Tashkent", "Samarkand")
                .payment(500_000)
                .given_budget(200_000),
        ))
        .await
        .unwrap();
    engine
        .add_expense(
            flight_owner(flight.id),
            spend(ExpenseCategory::Repair, ExpenseTiming::After, 800_000),
        )
        .await
        .unwrap();

    let settlement = finish(&engine, flight.id, 30).await;
    assert_eq!(settlement.net_profit_minor, -100_000);
    assert_eq!(settlement.driver_profit_minor, 0);
    assert_eq!(settlement.driver_owes_minor, -100_000);

    let flight = engine.flight(flight.id).await.unwrap();
    assert_eq!(flight.debt.unwrap().status, PaymentStatus::Paid);
    assert_eq!(engine.driver(driver_id).await.unwrap().current_balance(), 100_000);
}

#[tokio::test]
async fn pocket_expense_hits_balance_but_not_settlements() {
    let engine = engine().await;
    let (driver_id, vehicle_id) = driver_and_truck(&engine).await;

    // A losing flight leaves the driver with +50 000.
    let first = engine
        .create_flight(CreateFlightCmd::new(
            driver_id,
            vehicle_id,
            NewLeg::new("Tashkent", "Andijan").payment(100_000),
        ))
        .await
        .unwrap();
    engine
        .add_expense(
            flight_owner(first.id),
            spend(ExpenseCategory::Toll, ExpenseTiming::During, 150_000),
        )
        .await
        .unwrap();
    finish(&engine, first.id, 30).await;
    assert_eq!(engine.driver(driver_id).await.unwrap().current_balance(), 50_000);

    let pocket = engine
        .add_expense(
            ExpenseOwner::Driver { driver_id },
            spend(ExpenseCategory::Food, ExpenseTiming::Before, 20_000),
        )
        .await
        .unwrap();
    assert_eq!(pocket.owner, ExpenseOwner::Driver { driver_id });
    assert_eq!(engine.driver(driver_id).await.unwrap().current_balance(), 30_000);

    let second = engine
        .create_flight(CreateFlightCmd::new(
            driver_id,
            vehicle_id,
            NewLeg::new("Andijan", "Tashkent").payment(200_000),
        ))
        .await
        .unwrap();
    let settlement = finish(&engine, second.id, 50).await;
    assert_eq!(settlement.total_expenses_minor, 0);
    assert_eq!(settlement.driver_owes_minor, 100_000);
    assert_eq!(
        engine
            .expense_total(flight_owner(second.id), &ExpenseFilter::default())
            .await
            .unwrap(),
        0
    );
}

#[tokio::test]
async fn multi_leg_flight_sums_every_leg() {
    let engine = engine().await;
    let (driver_id, vehicle_id) = driver_and_truck(&engine).await;
    let flight = engine
        .create_flight(CreateFlightCmd::new(
            driver_id,
            vehicle_id,
            NewLeg::new("Tashkent", "Samarkand").payment(100_000),
        ))
        .await
        .unwrap();

    let leg_err = engine
        .add_leg(flight.id, NewLeg::new("Samarkand", "Bukhara"))
        .await
        .unwrap_err();
    assert!(matches!(leg_err, EngineError::InvalidTransition(_)));

    engine.complete_leg(flight.id, flight.legs[0].id).await.unwrap();
    engine
        .add_leg(
            flight.id,
            NewLeg::new("Samarkand", "Bukhara")
                .payment(150_000)
                .given_budget(50_000),
        )
        .await
        .unwrap();

    let totals = engine.leg_totals(flight.id).await.unwrap();
    assert_eq!(totals.total_payment_minor, 250_000);
    assert_eq!(totals.total_given_budget_minor, 50_000);

    let settlement = finish(&engine, flight.id, 50).await;
    assert_eq!(settlement.total_income_minor, 300_000);
    assert_eq!(settlement.net_profit_minor, 300_000);
    assert_eq!(settlement.driver_profit_minor, 150_000);
    assert_eq!(settlement.driver_owes_minor, 150_000);
}

#[tokio::test]
async fn payments_are_capped_and_idempotent() {
    let engine = engine().await;
    let (driver_id, vehicle_id) = driver_and_truck(&engine).await;
    let flight = engine
        .create_flight(CreateFlightCmd::new(
            driver_id,
            vehicle_id,
            NewLeg::new("Tashkent", "Samarkand")
                .payment(500_000)
                .given_budget(200_000),
        ))
        .await
        .unwrap();
    engine
        .add_expense(
            flight_owner(flight.id),
            spend(ExpenseCategory::Food, ExpenseTiming::During, 300_000),
        )
        .await
        .unwrap();

    let early = engine
        .record_payment(RecordPaymentCmd::new(flight.id, 1_000))
        .await
        .unwrap_err();
    assert!(matches!(early, EngineError::InvalidTransition(_)));

    finish(&engine, flight.id, 30).await;

    let debt = engine
        .record_payment(RecordPaymentCmd::new(flight.id, 100_000).idempotency_key("cash-1"))
        .await
        .unwrap();
    assert_eq!(debt.status, PaymentStatus::Partial);
    assert_eq!(debt.paid_minor, 100_000);

    let replay = engine
        .record_payment(RecordPaymentCmd::new(flight.id, 100_000).idempotency_key("cash-1"))
        .await
        .unwrap();
    assert_eq!(replay.paid_minor, 100_000);

    let over = engine
        .record_payment(RecordPaymentCmd::new(flight.id, 180_001))
        .await
        .unwrap_err();
    assert!(matches!(over, EngineError::Overpayment(_)));

    let debt = engine
        .record_payment(RecordPaymentCmd::new(flight.id, 180_000))
        .await
        .unwrap();
    assert_eq!(debt.status, PaymentStatus::Paid);
    assert_eq!(debt.paid_minor, debt.owes_minor);

    let flight = engine.flight(flight.id).await.unwrap();
    assert_eq!(flight.payments.len(), 2);
    let driver = engine.driver(driver_id).await.unwrap();
    assert_eq!(driver.current_balance(), 0);
    assert_eq!(
        driver
            .balance_events
            .iter()
            .filter(|event| event.kind == BalanceEventKind::DebtPayment)
            .count(),
        2
    );
}

#[tokio::test]
async fn completing_twice_returns_the_same_settlement() {
    let engine = engine().await;
    let (driver_id, vehicle_id) = driver_and_truck(&engine).await;
    let flight = engine
        .create_flight(CreateFlightCmd::new(
            driver_id,
            vehicle_id,
            NewLeg::new("Tashkent", "Samarkand").payment(400_000),
        ))
        .await
        .unwrap();
    let first = finish(&engine, flight.id, 25).await;
    let second = engine
        .complete_flight(flight.id, Decimal::from(90))
        .await
        .unwrap();
    assert_eq!(first, second);

    let driver = engine.driver(driver_id).await.unwrap();
    assert_eq!(
        driver
            .balance_events
            .iter()
            .filter(|event| event.kind == BalanceEventKind::Settlement)
            .count(),
        1
    );
}

#[tokio::test]
async fn concurrent_completion_settles_once() {
    let engine = Arc::new(engine().await);
    let (driver_id, vehicle_id) = driver_and_truck(&engine).await;
    let flight = engine
        .create_flight(CreateFlightCmd::new(
            driver_id,
            vehicle_id,
            NewLeg::new("Tashkent", "Samarkand").payment(400_000),
        ))
        .await
        .unwrap();
    engine.complete_leg(flight.id, flight.legs[0].id).await.unwrap();

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move { engine.complete_flight(flight.id, Decimal::from(30)).await })
        })
        .collect();
    let mut settlements = Vec::new();
    for task in tasks {
        settlements.push(task.await.unwrap().unwrap());
    }
    assert!(settlements.windows(2).all(|pair| pair[0] == pair[1]));

    let driver = engine.driver(driver_id).await.unwrap();
    assert_eq!(driver.current_balance(), -280_000);
}

#[tokio::test]
async fn finalized_flight_rejects_changes() {
    let engine = engine().await;
    let (driver_id, vehicle_id) = driver_and_truck(&engine).await;
    let flight = engine
        .create_flight(CreateFlightCmd::new(
            driver_id,
            vehicle_id,
            NewLeg::new("Tashkent", "Samarkand").payment(400_000),
        ))
        .await
        .unwrap();
    let expense = engine
        .add_expense(
            flight_owner(flight.id),
            spend(ExpenseCategory::Toll, ExpenseTiming::During, 10_000),
        )
        .await
        .unwrap();
    finish(&engine, flight.id, 30).await;

    let err = engine
        .edit_expense(expense.id, ExpensePatch::default().amount(1))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::ImmutableRecord(_)));
    let err = engine.remove_expense(expense.id).await.unwrap_err();
    assert!(matches!(err, EngineError::ImmutableRecord(_)));
    let err = engine
        .add_expense(
            flight_owner(flight.id),
            spend(ExpenseCategory::Toll, ExpenseTiming::After, 1),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::ImmutableRecord(_)));
    let err = engine.cancel_flight(flight.id).await.unwrap_err();
    assert!(matches!(err, EngineError::ImmutableRecord(_)));
}

#[tokio::test]
async fn cancelled_flight_cannot_complete() {
    let engine = engine().await;
    let (driver_id, vehicle_id) = driver_and_truck(&engine).await;
    let flight = engine
        .create_flight(CreateFlightCmd::new(
            driver_id,
            vehicle_id,
            NewLeg::new("Tashkent", "Samarkand"),
        ))
        .await
        .unwrap();
    let cancelled = engine.cancel_flight(flight.id).await.unwrap();
    assert_eq!(cancelled.status, FlightStatus::Cancelled);
    assert_eq!(engine.driver(driver_id).await.unwrap().status, DriverStatus::Free);

    let err = engine
        .complete_flight(flight.id, Decimal::from(30))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidTransition(_)));
    assert!(engine.flight(flight.id).await.unwrap().settlement.is_none());
}

#[tokio::test]
async fn driver_runs_one_active_flight_at_a_time() {
    let engine = engine().await;
    let (driver_id, vehicle_id) = driver_and_truck(&engine).await;
    let other_truck = engine.new_vehicle(NewVehicle::new("10 B 001 BB")).await.unwrap();

    engine
        .create_flight(CreateFlightCmd::new(
            driver_id,
            vehicle_id,
            NewLeg::new("Tashkent", "Samarkand"),
        ))
        .await
        .unwrap();
    let err = engine
        .create_flight(CreateFlightCmd::new(
            driver_id,
            other_truck,
            NewLeg::new("Tashkent", "Namangan"),
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Conflict(_)));

    let planned = engine
        .plan_flight(driver_id, other_truck, FlightType::International)
        .await
        .unwrap();
    assert_eq!(planned.status, FlightStatus::Pending);
    let err = engine
        .start_flight(planned.id, NewLeg::new("Tashkent", "Almaty"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Conflict(_)));
}

#[tokio::test]
async fn planned_flight_starts_later() {
    let engine = engine().await;
    let (driver_id, vehicle_id) = driver_and_truck(&engine).await;
    let planned = engine
        .plan_flight(driver_id, vehicle_id, FlightType::International)
        .await
        .unwrap();
    assert_eq!(engine.driver(driver_id).await.unwrap().status, DriverStatus::Free);

    let err = engine
        .add_expense(
            flight_owner(planned.id),
            spend(ExpenseCategory::Border, ExpenseTiming::During, 5_000),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidTransition(_)));

    let started = engine
        .start_flight(planned.id, NewLeg::new("Tashkent", "Almaty").payment(900_000))
        .await
        .unwrap();
    assert_eq!(started.status, FlightStatus::Active);
    assert_eq!(started.legs.len(), 1);
    assert_eq!(engine.driver(driver_id).await.unwrap().status, DriverStatus::Busy);
}

#[tokio::test]
async fn foreign_fuel_is_normalized_and_editable() {
    let engine = engine().await;
    let (driver_id, vehicle_id) = driver_and_truck(&engine).await;
    let flight = engine
        .create_flight(
            CreateFlightCmd::new(driver_id, vehicle_id, NewLeg::new("Tashkent", "Almaty"))
                .international(),
        )
        .await
        .unwrap();

    let fuel = NewExpense::new(
        ExpenseCategory::Fuel {
            fuel: FuelKind::Diesel,
        },
        ExpenseTiming::During,
        120_00,
        Currency::Usd,
    )
    .exchange_rate(Decimal::from(12_650))
    .quantity(Decimal::from(150))
    .leg_id(flight.legs[0].id);
    let expense = engine
        .add_expense(flight_owner(flight.id), fuel)
        .await
        .unwrap();
    assert_eq!(expense.base_amount_minor, 151_800_000);

    let edited = engine
        .edit_expense(expense.id, ExpensePatch::default().amount(100_00))
        .await
        .unwrap();
    assert_eq!(edited.base_amount_minor, 126_500_000);
    assert_eq!(edited.exchange_rate, Decimal::from(12_650));

    let leg_total = engine
        .expense_total(
            flight_owner(flight.id),
            &ExpenseFilter::default().leg(flight.legs[0].id),
        )
        .await
        .unwrap();
    assert_eq!(leg_total, 126_500_000);

    engine.remove_expense(expense.id).await.unwrap();
    assert!(engine.expenses(flight_owner(flight.id)).await.unwrap().is_empty());
}

#[tokio::test]
async fn base_currency_rate_must_be_one() {
    let engine = engine().await;
    let (driver_id, _) = driver_and_truck(&engine).await;
    let err = engine
        .add_expense(
            ExpenseOwner::Driver { driver_id },
            spend(ExpenseCategory::Food, ExpenseTiming::Before, 10_000)
                .exchange_rate(Decimal::from(2)),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
    assert_eq!(engine.driver(driver_id).await.unwrap().current_balance(), 0);
}

#[tokio::test]
async fn foreign_currency_requires_a_rate() {
    let engine = engine().await;
    let (driver_id, vehicle_id) = driver_and_truck(&engine).await;
    let flight = engine
        .create_flight(
            CreateFlightCmd::new(driver_id, vehicle_id, NewLeg::new("Tashkent", "Almaty"))
                .international(),
        )
        .await
        .unwrap();

    let err = engine
        .add_expense(
            flight_owner(flight.id),
            NewExpense::new(ExpenseCategory::Border, ExpenseTiming::During, 50_00, Currency::Usd),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
    assert!(engine.expenses(flight_owner(flight.id)).await.unwrap().is_empty());

    let err = engine
        .add_expense(
            ExpenseOwner::Driver { driver_id },
            NewExpense::new(ExpenseCategory::Food, ExpenseTiming::Before, 10_00, Currency::Kzt),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
    assert_eq!(engine.driver(driver_id).await.unwrap().current_balance(), 0);
}

#[tokio::test]
async fn cancelling_a_planned_flight_keeps_the_truck_on_the_active_one() {
    let engine = engine().await;
    let (driver_id, vehicle_id) = driver_and_truck(&engine).await;
    let other_driver = engine.new_driver(NewDriver::new("Bekzod")).await.unwrap();

    engine
        .create_flight(CreateFlightCmd::new(
            driver_id,
            vehicle_id,
            NewLeg::new("Tashkent", "Samarkand"),
        ))
        .await
        .unwrap();
    let planned = engine
        .plan_flight(driver_id, vehicle_id, FlightType::Domestic)
        .await
        .unwrap();

    engine.cancel_flight(planned.id).await.unwrap();
    assert_eq!(
        engine.vehicle(vehicle_id).await.unwrap().current_driver_id,
        Some(driver_id)
    );
    assert_eq!(engine.driver(driver_id).await.unwrap().status, DriverStatus::Busy);

    let err = engine
        .create_flight(CreateFlightCmd::new(
            other_driver,
            vehicle_id,
            NewLeg::new("Tashkent", "Andijan"),
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Conflict(_)));
}

#[tokio::test]
async fn oversized_leg_totals_fail_without_settling() {
    let engine = engine().await;
    let (driver_id, vehicle_id) = driver_and_truck(&engine).await;
    let huge = i64::MAX / 2 + 1;
    let flight = engine
        .create_flight(CreateFlightCmd::new(
            driver_id,
            vehicle_id,
            NewLeg::new("Tashkent", "Samarkand").payment(huge),
        ))
        .await
        .unwrap();
    engine.complete_leg(flight.id, flight.legs[0].id).await.unwrap();
    engine
        .add_leg(flight.id, NewLeg::new("Samarkand", "Bukhara").payment(huge))
        .await
        .unwrap();

    let err = engine.leg_totals(flight.id).await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidAmount(_)));

    let flight = engine.flight(flight.id).await.unwrap();
    engine.complete_leg(flight.id, flight.legs[1].id).await.unwrap();
    let err = engine
        .complete_flight(flight.id, Decimal::from(10))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidAmount(_)));

    let flight = engine.flight(flight.id).await.unwrap();
    assert_eq!(flight.status, FlightStatus::Active);
    assert!(flight.settlement.is_none());
    let driver = engine.driver(driver_id).await.unwrap();
    assert_eq!(driver.status, DriverStatus::Busy);
    assert_eq!(driver.current_balance(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn expenses_racing_completion_are_settled_or_rejected() {
    let engine = Arc::new(engine().await);
    let (driver_id, vehicle_id) = driver_and_truck(&engine).await;
    let flight = engine
        .create_flight(CreateFlightCmd::new(
            driver_id,
            vehicle_id,
            NewLeg::new("Tashkent", "Samarkand").payment(1_000_000),
        ))
        .await
        .unwrap();
    engine.complete_leg(flight.id, flight.legs[0].id).await.unwrap();

    let expenses: Vec<_> = (0..16)
        .map(|_| {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move {
                engine
                    .add_expense(
                        flight_owner(flight.id),
                        spend(ExpenseCategory::Toll, ExpenseTiming::During, 10_000),
                    )
                    .await
            })
        })
        .collect();
    let completion = {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move { engine.complete_flight(flight.id, Decimal::from(30)).await })
    };

    let mut accepted = 0;
    for task in expenses {
        match task.await.unwrap() {
            Ok(expense) => accepted += expense.base_amount_minor,
            Err(err) => assert!(matches!(err, EngineError::ImmutableRecord(_)), "{err}"),
        }
    }
    let settlement = completion.await.unwrap().unwrap();

    assert_eq!(settlement.total_expenses_minor, accepted);
    let stored = engine
        .expense_total(flight_owner(flight.id), &ExpenseFilter::default())
        .await
        .unwrap();
    assert_eq!(stored, settlement.total_expenses_minor);
    assert_eq!(
        engine.driver(driver_id).await.unwrap().current_balance(),
        -settlement.driver_owes_minor
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_payments_never_exceed_the_debt() {
    let engine = Arc::new(engine().await);
    let (driver_id, vehicle_id) = driver_and_truck(&engine).await;
    let flight = engine
        .create_flight(CreateFlightCmd::new(
            driver_id,
            vehicle_id,
            NewLeg::new("Tashkent", "Samarkand")
                .payment(500_000)
                .given_budget(200_000),
        ))
        .await
        .unwrap();
    engine
        .add_expense(
            flight_owner(flight.id),
            spend(ExpenseCategory::Food, ExpenseTiming::During, 300_000),
        )
        .await
        .unwrap();
    let settlement = finish(&engine, flight.id, 30).await;
    assert_eq!(settlement.driver_owes_minor, 280_000);

    let tasks: Vec<_> = (0..10)
        .map(|_| {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move {
                engine
                    .record_payment(RecordPaymentCmd::new(flight.id, 40_000))
                    .await
            })
        })
        .collect();
    let mut accepted = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(debt) => {
                assert!(debt.paid_minor <= debt.owes_minor);
                accepted += 1;
            }
            Err(err) => assert!(
                matches!(
                    err,
                    EngineError::Overpayment(_) | EngineError::InvalidTransition(_)
                ),
                "{err}"
            ),
        }
    }
    assert_eq!(accepted, 7);

    let flight = engine.flight(flight.id).await.unwrap();
    let debt = flight.debt.unwrap();
    assert_eq!(debt.paid_minor, 280_000);
    assert_eq!(debt.status, PaymentStatus::Paid);
    assert_eq!(flight.payments.len(), 7);
    assert_eq!(engine.driver(driver_id).await.unwrap().current_balance(), 0);
}

#[tokio::test]
async fn pocket_corrections_adjust_balance() {
    let engine = engine().await;
    let (driver_id, _) = driver_and_truck(&engine).await;
    let owner = ExpenseOwner::Driver { driver_id };
    let expense = engine
        .add_expense(owner, spend(ExpenseCategory::Food, ExpenseTiming::Before, 20_000))
        .await
        .unwrap();

    engine
        .edit_expense(expense.id, ExpensePatch::default().amount(15_000))
        .await
        .unwrap();
    assert_eq!(engine.driver(driver_id).await.unwrap().current_balance(), -15_000);

    engine.remove_expense(expense.id).await.unwrap();
    let driver = engine.driver(driver_id).await.unwrap();
    assert_eq!(driver.current_balance(), 0);
    assert!(driver.expenses.is_empty());
    assert_eq!(
        driver
            .balance_events
            .iter()
            .filter(|event| event.kind == BalanceEventKind::PocketExpenseCorrection)
            .count(),
        2
    );
}

#[tokio::test]
async fn busy_driver_is_not_anonymized() {
    let engine = engine().await;
    let (driver_id, vehicle_id) = driver_and_truck(&engine).await;
    let flight = engine
        .create_flight(CreateFlightCmd::new(
            driver_id,
            vehicle_id,
            NewLeg::new("Tashkent", "Samarkand"),
        ))
        .await
        .unwrap();
    let err = engine.anonymize_driver(driver_id).await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidTransition(_)));

    engine.cancel_flight(flight.id).await.unwrap();
    engine.anonymize_driver(driver_id).await.unwrap();
    let driver = engine.driver(driver_id).await.unwrap();
    assert!(driver.deleted);
    assert_eq!(driver.phone, None);

    let err = engine
        .plan_flight(driver_id, vehicle_id, FlightType::Domestic)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::ImmutableRecord(_)));
}

#[tokio::test]
async fn statement_sums_outstanding_debt() {
    let engine = engine().await;
    let (driver_id, vehicle_id) = driver_and_truck(&engine).await;
    for payment in [400_000, 200_000] {
        let flight = engine
            .create_flight(CreateFlightCmd::new(
                driver_id,
                vehicle_id,
                NewLeg::new("Tashkent", "Samarkand").payment(payment),
            ))
            .await
            .unwrap();
        finish(&engine, flight.id, 50).await;
    }

    let statement = engine.driver_statement(driver_id).await.unwrap();
    assert_eq!(statement.flights.len(), 2);
    assert_eq!(statement.outstanding_debt_minor, 300_000);
    assert_eq!(statement.current_balance_minor, -300_000);
    assert_eq!(statement.pocket_expenses_minor, 0);
}

#[tokio::test]
async fn events_follow_the_lifecycle() {
    let notifier = Arc::new(BroadcastNotifier::new(32));
    let mut rx = notifier.subscribe();
    let engine = Engine::builder()
        .in_memory()
        .notifier(notifier.clone())
        .build()
        .await
        .unwrap();
    let (driver_id, vehicle_id) = driver_and_truck(&engine).await;

    let flight = engine
        .create_flight(CreateFlightCmd::new(
            driver_id,
            vehicle_id,
            NewLeg::new("Tashkent", "Samarkand").payment(100_000),
        ))
        .await
        .unwrap();
    engine
        .add_expense(
            flight_owner(flight.id),
            spend(ExpenseCategory::Food, ExpenseTiming::During, 10_000),
        )
        .await
        .unwrap();
    finish(&engine, flight.id, 10).await;

    let mut names = Vec::new();
    while let Ok(event) = rx.try_recv() {
        names.push(event.name());
    }
    assert_eq!(
        names,
        vec![
            "flight:started",
            "expense:added",
            "flight:leg_completed",
            "flight:completed",
        ]
    );

    let failed = engine
        .complete_leg(flight.id, Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(failed, EngineError::ImmutableRecord(_)));
    assert!(rx.try_recv().is_err());
}
