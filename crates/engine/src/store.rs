//! SQL implementation of [`Repository`] on top of sea-orm.
//!
//! Aggregate rows are updated with a `version = stored` filter so a stale
//! write touches no row and is reported as a conflict. Child rows (legs,
//! expenses, payments) are rewritten with their aggregate; balance events are
//! append-only and only the new ones are inserted.

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction, QueryFilter,
    QueryOrder, TransactionTrait, prelude::*,
};
use uuid::Uuid;

use crate::{
    BalanceEvent, DebtPayment, Driver, EngineError, Expense, ExpenseOwner, Flight, FlightStatus,
    Leg, ResultEngine, Vehicle, balance, debt, drivers,
    expenses::{self, OwnerKind},
    flights, legs,
    repository::{Changes, Repository},
    util::parse_uuid,
    vehicles,
};

/// Run a block inside a DB transaction, committing on success and rolling back on error.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

#[derive(Debug, Clone)]
pub struct SqlRepository {
    database: DatabaseConnection,
}

impl SqlRepository {
    #[must_use]
    pub fn new(database: DatabaseConnection) -> Self {
        Self { database }
    }
}

fn conflict(label: &str, id: Uuid) -> EngineError {
    EngineError::Conflict(format!("{label} {id} was modified concurrently"))
}

async fn owned_expenses<C: ConnectionTrait>(
    db: &C,
    kind: OwnerKind,
    owner_id: &str,
) -> ResultEngine<Vec<Expense>> {
    expenses::Entity::find()
        .filter(expenses::Column::OwnerKind.eq(kind.as_str()))
        .filter(expenses::Column::OwnerId.eq(owner_id))
        .order_by_asc(expenses::Column::CreatedAt)
        .order_by_asc(expenses::Column::Id)
        .all(db)
        .await?
        .into_iter()
        .map(Expense::try_from)
        .collect()
}

async fn assemble_flight<C: ConnectionTrait>(db: &C, model: flights::Model) -> ResultEngine<Flight> {
    let legs = legs::Entity::find()
        .filter(legs::Column::FlightId.eq(model.id.clone()))
        .order_by_asc(legs::Column::Position)
        .all(db)
        .await?
        .into_iter()
        .map(Leg::try_from)
        .collect::<ResultEngine<Vec<_>>>()?;
    let expenses = owned_expenses(db, OwnerKind::Flight, &model.id).await?;
    let payments = debt::Entity::find()
        .filter(debt::Column::FlightId.eq(model.id.clone()))
        .order_by_asc(debt::Column::RecordedAt)
        .order_by_asc(debt::Column::Id)
        .all(db)
        .await?
        .into_iter()
        .map(DebtPayment::try_from)
        .collect::<ResultEngine<Vec<_>>>()?;

    Flight::try_from((model, legs, expenses, payments))
}

async fn assemble_driver<C: ConnectionTrait>(db: &C, model: drivers::Model) -> ResultEngine<Driver> {
    let expenses = owned_expenses(db, OwnerKind::Driver, &model.id).await?;
    let events = balance::Entity::find()
        .filter(balance::Column::DriverId.eq(model.id.clone()))
        .order_by_asc(balance::Column::OccurredAt)
        .order_by_asc(balance::Column::Id)
        .all(db)
        .await?
        .into_iter()
        .map(BalanceEvent::try_from)
        .collect::<ResultEngine<Vec<_>>>()?;

    Driver::try_from((model, expenses, events))
}

async fn replace_expenses(
    tx: &DatabaseTransaction,
    kind: OwnerKind,
    owner_id: &str,
    entries: &[Expense],
) -> ResultEngine<()> {
    expenses::Entity::delete_many()
        .filter(expenses::Column::OwnerKind.eq(kind.as_str()))
        .filter(expenses::Column::OwnerId.eq(owner_id))
        .exec(tx)
        .await?;
    for expense in entries {
        expenses::ActiveModel::from(expense).insert(tx).await?;
    }
    Ok(())
}

async fn write_flight(tx: &DatabaseTransaction, flight: &Flight) -> ResultEngine<()> {
    let id = flight.id.to_string();
    let model = flights::ActiveModel::from(flight);
    if flight.version == 1 {
        if flights::Entity::find_by_id(id.clone()).one(tx).await?.is_some() {
            return Err(conflict("flight", flight.id));
        }
        model.insert(tx).await?;
    } else {
        let result = flights::Entity::update_many()
            .set(model)
            .filter(flights::Column::Id.eq(id.clone()))
            .filter(flights::Column::Version.eq(flight.version - 1))
            .exec(tx)
            .await?;
        if result.rows_affected == 0 {
            return Err(conflict("flight", flight.id));
        }
    }

    legs::Entity::delete_many()
        .filter(legs::Column::FlightId.eq(id.clone()))
        .exec(tx)
        .await?;
    for leg in &flight.legs {
        legs::ActiveModel::from(leg).insert(tx).await?;
    }

    replace_expenses(tx, OwnerKind::Flight, &id, &flight.expenses).await?;

    debt::Entity::delete_many()
        .filter(debt::Column::FlightId.eq(id))
        .exec(tx)
        .await?;
    for payment in &flight.payments {
        debt::ActiveModel::from(payment).insert(tx).await?;
    }
    Ok(())
}

async fn write_driver(tx: &DatabaseTransaction, driver: &Driver) -> ResultEngine<()> {
    let id = driver.id.to_string();
    let model = drivers::ActiveModel::from(driver);
    if driver.version == 1 {
        if drivers::Entity::find_by_id(id.clone()).one(tx).await?.is_some() {
            return Err(conflict("driver", driver.id));
        }
        model.insert(tx).await?;
    } else {
        let result = drivers::Entity::update_many()
            .set(model)
            .filter(drivers::Column::Id.eq(id.clone()))
            .filter(drivers::Column::Version.eq(driver.version - 1))
            .exec(tx)
            .await?;
        if result.rows_affected == 0 {
            return Err(conflict("driver", driver.id));
        }
    }

    replace_expenses(tx, OwnerKind::Driver, &id, &driver.expenses).await?;

    let stored: Vec<String> = balance::Entity::find()
        .filter(balance::Column::DriverId.eq(id))
        .all(tx)
        .await?
        .into_iter()
        .map(|model| model.id)
        .collect();
    for event in &driver.balance_events {
        if !stored.contains(&event.id.to_string()) {
            balance::ActiveModel::from(event).insert(tx).await?;
        }
    }
    Ok(())
}

async fn write_vehicle(tx: &DatabaseTransaction, vehicle: &Vehicle) -> ResultEngine<()> {
    let id = vehicle.id.to_string();
    let model = vehicles::ActiveModel::from(vehicle);
    if vehicle.version == 1 {
        if vehicles::Entity::find_by_id(id).one(tx).await?.is_some() {
            return Err(conflict("vehicle", vehicle.id));
        }
        model.insert(tx).await?;
        return Ok(());
    }
    let result = vehicles::Entity::update_many()
        .set(model)
        .filter(vehicles::Column::Id.eq(id))
        .filter(vehicles::Column::Version.eq(vehicle.version - 1))
        .exec(tx)
        .await?;
    if result.rows_affected == 0 {
        return Err(conflict("vehicle", vehicle.id));
    }
    Ok(())
}

#[async_trait]
impl Repository for SqlRepository {
    async fn load_flight(&self, id: Uuid) -> ResultEngine<Flight> {
        with_tx!(self, |db_tx| {
            let model = flights::Entity::find_by_id(id.to_string())
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("flight not exists".to_string()))?;
            assemble_flight(&db_tx, model).await
        })
    }

    async fn load_driver(&self, id: Uuid) -> ResultEngine<Driver> {
        with_tx!(self, |db_tx| {
            let model = drivers::Entity::find_by_id(id.to_string())
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("driver not exists".to_string()))?;
            assemble_driver(&db_tx, model).await
        })
    }

    async fn load_vehicle(&self, id: Uuid) -> ResultEngine<Vehicle> {
        let model = vehicles::Entity::find_by_id(id.to_string())
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("vehicle not exists".to_string()))?;
        Vehicle::try_from(model)
    }

    async fn active_flight_of(&self, driver_id: Uuid) -> ResultEngine<Option<Uuid>> {
        flights::Entity::find()
            .filter(flights::Column::DriverId.eq(driver_id.to_string()))
            .filter(flights::Column::Status.eq(FlightStatus::Active.as_str()))
            .one(&self.database)
            .await?
            .map(|model| parse_uuid(&model.id, "flight"))
            .transpose()
    }

    async fn flights_of_driver(&self, driver_id: Uuid) -> ResultEngine<Vec<Flight>> {
        with_tx!(self, |db_tx| {
            let models = flights::Entity::find()
                .filter(flights::Column::DriverId.eq(driver_id.to_string()))
                .order_by_asc(flights::Column::CreatedAt)
                .order_by_asc(flights::Column::Id)
                .all(&db_tx)
                .await?;
            let mut flights = Vec::with_capacity(models.len());
            for model in models {
                flights.push(assemble_flight(&db_tx, model).await?);
            }
            Ok(flights)
        })
    }

    async fn expense_owner(&self, expense_id: Uuid) -> ResultEngine<ExpenseOwner> {
        let model = expenses::Entity::find_by_id(expense_id.to_string())
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("expense not exists".to_string()))?;
        let owner_id = parse_uuid(&model.owner_id, "owner")?;
        Ok(match OwnerKind::try_from(model.owner_kind.as_str())? {
            OwnerKind::Flight => ExpenseOwner::Flight {
                flight_id: owner_id,
            },
            OwnerKind::Driver => ExpenseOwner::Driver {
                driver_id: owner_id,
            },
        })
    }

    async fn save(&self, changes: Changes<'_>) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            if let Some(driver) = changes.driver {
                write_driver(&db_tx, driver).await?;
            }
            if let Some(vehicle) = changes.vehicle {
                write_vehicle(&db_tx, vehicle).await?;
            }
            if let Some(flight) = changes.flight {
                write_flight(&db_tx, flight).await?;
            }
            Ok(())
        })
    }
}
