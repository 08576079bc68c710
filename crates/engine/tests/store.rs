use std::sync::Arc;

use chrono::{TimeZone, Utc};
use rust_decimal::Decimal;
use sea_orm::{Database, DatabaseConnection};

use engine::{
    Changes, CreateFlightCmd, Currency, Engine, EngineError, ExpenseCategory, ExpenseOwner,
    ExpenseTiming, FixedClock, FlightStatus, FuelKind, NewDriver, NewExpense, NewLeg, NewVehicle,
    PaymentStatus, RecordPaymentCmd, Repository, SqlRepository,
};
use migration::MigratorTrait;

async fn engine_with_db() -> (Engine, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let clock = FixedClock(Utc.with_ymd_and_hms(2026, 5, 4, 6, 30, 0).unwrap());
    let engine = Engine::builder()
        .database(db.clone())
        .clock(Arc::new(clock))
        .build()
        .await
        .unwrap();
    (engine, db)
}

#[tokio::test]
async fn flight_round_trips_through_sqlite() {
    let (engine, db) = engine_with_db().await;
    let driver_id = engine
        .new_driver(NewDriver::new("Bekzod").opening_balance(10_000))
        .await
        .unwrap();
    let vehicle_id = engine.new_vehicle(NewVehicle::new("01 B 222 CC")).await.unwrap();

    let flight = engine
        .create_flight(
            CreateFlightCmd::new(
                driver_id,
                vehicle_id,
                NewLeg::new("Tashkent", "Almaty")
                    .payment(500_000)
                    .given_budget(200_000),
            )
            .international(),
        )
        .await
        .unwrap();
    let fuel = NewExpense::new(
        ExpenseCategory::Fuel {
            fuel: FuelKind::Methane,
        },
        ExpenseTiming::During,
        2_500,
        Currency::Kzt,
    )
    .exchange_rate("24.5".parse().unwrap())
    .quantity("60.25".parse().unwrap())
    .odometer(120_400)
    .description("Shymkent station");
    let expense = engine
        .add_expense(ExpenseOwner::Flight { flight_id: flight.id }, fuel)
        .await
        .unwrap();
    assert_eq!(expense.base_amount_minor, 61_250);

    engine.complete_leg(flight.id, flight.legs[0].id).await.unwrap();
    let settlement = engine
        .complete_flight(flight.id, Decimal::from(30))
        .await
        .unwrap();
    engine
        .record_payment(RecordPaymentCmd::new(flight.id, 50_000).idempotency_key("bank-7"))
        .await
        .unwrap();

    // A second engine on the same database sees the same state.
    let reloaded = Engine::builder().database(db).build().await.unwrap();
    let flight = reloaded.flight(flight.id).await.unwrap();
    assert_eq!(flight.status, FlightStatus::Completed);
    assert_eq!(flight.settlement, Some(settlement));
    assert_eq!(flight.expenses, vec![expense]);
    assert_eq!(flight.legs.len(), 1);
    assert!(flight.legs[0].completed_at.is_some());
    assert_eq!(flight.payments.len(), 1);
    let debt = flight.debt.unwrap();
    assert_eq!(debt.paid_minor, 50_000);
    assert_eq!(debt.status, PaymentStatus::Partial);

    let driver = reloaded.driver(driver_id).await.unwrap();
    assert_eq!(
        driver.current_balance(),
        10_000 - settlement.driver_owes_minor + 50_000
    );
    assert_eq!(driver.balance_events.len(), 3);
}

#[tokio::test]
async fn pocket_expenses_persist_with_driver() {
    let (engine, _db) = engine_with_db().await;
    let driver_id = engine.new_driver(NewDriver::new("Bekzod")).await.unwrap();
    let owner = ExpenseOwner::Driver { driver_id };
    engine
        .add_expense(
            owner,
            NewExpense::new(ExpenseCategory::Fine, ExpenseTiming::Before, 30_000, Currency::Uzs),
        )
        .await
        .unwrap();

    let expenses = engine.expenses(owner).await.unwrap();
    assert_eq!(expenses.len(), 1);
    assert_eq!(expenses[0].category, ExpenseCategory::Fine);
    assert_eq!(engine.driver(driver_id).await.unwrap().current_balance(), -30_000);
}

#[tokio::test]
async fn stale_write_is_rejected() {
    let (engine, db) = engine_with_db().await;
    let driver_id = engine.new_driver(NewDriver::new("Bekzod")).await.unwrap();
    let repo = SqlRepository::new(db);

    let mut first = repo.load_driver(driver_id).await.unwrap();
    let mut second = repo.load_driver(driver_id).await.unwrap();
    first.version += 1;
    second.version += 1;
    first.phone = Some("+998 91 000 00 00".to_string());
    repo.save(Changes::default().driver(&first)).await.unwrap();

    let err = repo.save(Changes::default().driver(&second)).await.unwrap_err();
    assert!(matches!(err, EngineError::Conflict(_)));
    assert_eq!(
        repo.load_driver(driver_id).await.unwrap().phone.as_deref(),
        Some("+998 91 000 00 00")
    );
}

#[tokio::test]
async fn unknown_ids_are_not_found() {
    let (engine, _db) = engine_with_db().await;
    let missing = uuid::Uuid::new_v4();
    assert!(matches!(
        engine.flight(missing).await,
        Err(EngineError::KeyNotFound(_))
    ));
    assert!(matches!(
        engine.edit_expense(missing, Default::default()).await,
        Err(EngineError::KeyNotFound(_))
    ));
}
