//! Initial schema.
//!
//! - `drivers`: drivers and their status
//! - `vehicles`: trucks and their current driver
//! - `flights`: flights with the settlement frozen at completion
//! - `legs`: ordered segments of a flight
//! - `expenses`: flight and pocket expenses with the locked exchange rate
//! - `balance_events`: append-only driver balance ledger
//! - `debt_payments`: repayments of flight debts
//!
//! Decimal values (exchange rates, quantities, percentages) are stored as
//! text and parsed by the engine.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

// ─────────────────────────────────────────────────────────────────────────────
// Table identifiers
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Iden)]
enum Drivers {
    Table,
    Id,
    Name,
    Phone,
    Status,
    Deleted,
    CreatedAt,
    Version,
}

#[derive(Iden)]
enum Vehicles {
    Table,
    Id,
    Plate,
    Model,
    CurrentDriverId,
    CreatedAt,
    Version,
}

#[derive(Iden)]
enum Flights {
    Table,
    Id,
    DriverId,
    VehicleId,
    FlightType,
    Status,
    TotalIncomeMinor,
    TotalExpensesMinor,
    NetProfitMinor,
    DriverProfitPercent,
    DriverProfitMinor,
    DriverOwesMinor,
    DriverPaidMinor,
    DriverPaymentStatus,
    CreatedAt,
    StartedAt,
    FinishedAt,
    Version,
}

#[derive(Iden)]
enum Legs {
    Table,
    Id,
    FlightId,
    Position,
    FromCity,
    ToCity,
    FromLat,
    FromLng,
    ToLat,
    ToLng,
    PaymentMinor,
    GivenBudgetMinor,
    Status,
    StartedAt,
    CompletedAt,
}

#[derive(Iden)]
enum Expenses {
    Table,
    Id,
    OwnerKind,
    OwnerId,
    LegId,
    Category,
    FuelKind,
    Timing,
    AmountMinor,
    Currency,
    ExchangeRate,
    BaseAmountMinor,
    Quantity,
    Odometer,
    Description,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum BalanceEvents {
    Table,
    Id,
    DriverId,
    Kind,
    DeltaMinor,
    FlightId,
    ExpenseId,
    OccurredAt,
}

#[derive(Iden)]
enum DebtPayments {
    Table,
    Id,
    FlightId,
    AmountMinor,
    IdempotencyKey,
    RecordedAt,
}

// ─────────────────────────────────────────────────────────────────────────────
// Migration implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ───────────────────────────────────────────────────────────────────
        // 1. Drivers
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Drivers::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Drivers::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Drivers::Name).string().not_null())
                    .col(ColumnDef::new(Drivers::Phone).string())
                    .col(
                        ColumnDef::new(Drivers::Status)
                            .string()
                            .not_null()
                            .default("free"),
                    )
                    .col(
                        ColumnDef::new(Drivers::Deleted)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Drivers::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Drivers::Version).big_integer().not_null())
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 2. Vehicles
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Vehicles::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Vehicles::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Vehicles::Plate).string().not_null())
                    .col(ColumnDef::new(Vehicles::Model).string())
                    .col(ColumnDef::new(Vehicles::CurrentDriverId).string())
                    .col(ColumnDef::new(Vehicles::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Vehicles::Version).big_integer().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-vehicles-plate-unique")
                    .table(Vehicles::Table)
                    .col(Vehicles::Plate)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 3. Flights
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Flights::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Flights::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Flights::DriverId).string().not_null())
                    .col(ColumnDef::new(Flights::VehicleId).string().not_null())
                    .col(ColumnDef::new(Flights::FlightType).string().not_null())
                    .col(ColumnDef::new(Flights::Status).string().not_null())
                    .col(ColumnDef::new(Flights::TotalIncomeMinor).big_integer())
                    .col(ColumnDef::new(Flights::TotalExpensesMinor).big_integer())
                    .col(ColumnDef::new(Flights::NetProfitMinor).big_integer())
                    .col(ColumnDef::new(Flights::DriverProfitPercent).string())
                    .col(ColumnDef::new(Flights::DriverProfitMinor).big_integer())
                    .col(ColumnDef::new(Flights::DriverOwesMinor).big_integer())
                    .col(ColumnDef::new(Flights::DriverPaidMinor).big_integer())
                    .col(ColumnDef::new(Flights::DriverPaymentStatus).string())
                    .col(ColumnDef::new(Flights::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Flights::StartedAt).timestamp())
                    .col(ColumnDef::new(Flights::FinishedAt).timestamp())
                    .col(ColumnDef::new(Flights::Version).big_integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-flights-driver_id")
                            .from(Flights::Table, Flights::DriverId)
                            .to(Drivers::Table, Drivers::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-flights-vehicle_id")
                            .from(Flights::Table, Flights::VehicleId)
                            .to(Vehicles::Table, Vehicles::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-flights-driver_id-status")
                    .table(Flights::Table)
                    .col(Flights::DriverId)
                    .col(Flights::Status)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 4. Legs
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Legs::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Legs::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Legs::FlightId).string().not_null())
                    .col(ColumnDef::new(Legs::Position).integer().not_null())
                    .col(ColumnDef::new(Legs::FromCity).string().not_null())
                    .col(ColumnDef::new(Legs::ToCity).string().not_null())
                    .col(ColumnDef::new(Legs::FromLat).double())
                    .col(ColumnDef::new(Legs::FromLng).double())
                    .col(ColumnDef::new(Legs::ToLat).double())
                    .col(ColumnDef::new(Legs::ToLng).double())
                    .col(ColumnDef::new(Legs::PaymentMinor).big_integer().not_null())
                    .col(
                        ColumnDef::new(Legs::GivenBudgetMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Legs::Status).string().not_null())
                    .col(ColumnDef::new(Legs::StartedAt).timestamp().not_null())
                    .col(ColumnDef::new(Legs::CompletedAt).timestamp())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-legs-flight_id")
                            .from(Legs::Table, Legs::FlightId)
                            .to(Flights::Table, Flights::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-legs-flight_id-position-unique")
                    .table(Legs::Table)
                    .col(Legs::FlightId)
                    .col(Legs::Position)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 5. Expenses
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Expenses::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Expenses::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Expenses::OwnerKind).string().not_null())
                    .col(ColumnDef::new(Expenses::OwnerId).string().not_null())
                    .col(ColumnDef::new(Expenses::LegId).string())
                    .col(ColumnDef::new(Expenses::Category).string().not_null())
                    .col(ColumnDef::new(Expenses::FuelKind).string())
                    .col(ColumnDef::new(Expenses::Timing).string().not_null())
                    .col(ColumnDef::new(Expenses::AmountMinor).big_integer().not_null())
                    .col(ColumnDef::new(Expenses::Currency).string().not_null())
                    .col(ColumnDef::new(Expenses::ExchangeRate).string().not_null())
                    .col(
                        ColumnDef::new(Expenses::BaseAmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Expenses::Quantity).string())
                    .col(ColumnDef::new(Expenses::Odometer).big_integer())
                    .col(ColumnDef::new(Expenses::Description).string())
                    .col(ColumnDef::new(Expenses::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Expenses::UpdatedAt).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-expenses-owner")
                    .table(Expenses::Table)
                    .col(Expenses::OwnerKind)
                    .col(Expenses::OwnerId)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 6. Balance events
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(BalanceEvents::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(BalanceEvents::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(BalanceEvents::DriverId).string().not_null())
                    .col(ColumnDef::new(BalanceEvents::Kind).string().not_null())
                    .col(
                        ColumnDef::new(BalanceEvents::DeltaMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(BalanceEvents::FlightId).string())
                    .col(ColumnDef::new(BalanceEvents::ExpenseId).string())
                    .col(
                        ColumnDef::new(BalanceEvents::OccurredAt)
                            .timestamp()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-balance_events-driver_id")
                            .from(BalanceEvents::Table, BalanceEvents::DriverId)
                            .to(Drivers::Table, Drivers::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-balance_events-driver_id-occurred_at")
                    .table(BalanceEvents::Table)
                    .col(BalanceEvents::DriverId)
                    .col(BalanceEvents::OccurredAt)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 7. Debt payments
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(DebtPayments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DebtPayments::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(DebtPayments::FlightId).string().not_null())
                    .col(
                        ColumnDef::new(DebtPayments::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(DebtPayments::IdempotencyKey).string())
                    .col(
                        ColumnDef::new(DebtPayments::RecordedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-debt_payments-flight_id")
                            .from(DebtPayments::Table, DebtPayments::FlightId)
                            .to(Flights::Table, Flights::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-debt_payments-flight_id-idempotency_key-unique")
                    .table(DebtPayments::Table)
                    .col(DebtPayments::FlightId)
                    .col(DebtPayments::IdempotencyKey)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Drop in reverse order of creation (respecting FK dependencies)
        manager
            .drop_table(Table::drop().table(DebtPayments::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(BalanceEvents::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Expenses::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Legs::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Flights::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Vehicles::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Drivers::Table).to_owned())
            .await?;
        Ok(())
    }
}
