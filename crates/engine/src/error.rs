//! The module contains the errors the engine can return.
//!
//! Every failure is terminal for the current operation and is surfaced to the
//! caller verbatim; the engine never retries.
//!
//! - [`Validation`] malformed input shape or values.
//! - [`InvalidTransition`] an operation attempted outside its legal state.
//! - [`ImmutableRecord`] a mutation on a finalized flight.
//! - [`StaleFlight`] a second settlement of the same flight.
//! - [`Overpayment`] a debt payment exceeding what is owed.
//! - [`KeyNotFound`] an unknown id.
//!
//!  [`Validation`]: EngineError::Validation
//!  [`InvalidTransition`]: EngineError::InvalidTransition
//!  [`ImmutableRecord`]: EngineError::ImmutableRecord
//!  [`StaleFlight`]: EngineError::StaleFlight
//!  [`Overpayment`]: EngineError::Overpayment
//!  [`KeyNotFound`]: EngineError::KeyNotFound
use sea_orm::DbErr;
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
    #[error("Immutable record: {0}")]
    ImmutableRecord(String),
    #[error("Flight already settled: {0}")]
    StaleFlight(String),
    #[error("Overpayment: {0}")]
    Overpayment(String),
    #[error("\"{0}\" key not found!")]
    KeyNotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Validation(a), Self::Validation(b)) => a == b,
            (Self::InvalidAmount(a), Self::InvalidAmount(b)) => a == b,
            (Self::InvalidTransition(a), Self::InvalidTransition(b)) => a == b,
            (Self::ImmutableRecord(a), Self::ImmutableRecord(b)) => a == b,
            (Self::StaleFlight(a), Self::StaleFlight(b)) => a == b,
            (Self::Overpayment(a), Self::Overpayment(b)) => a == b,
            (Self::KeyNotFound(a), Self::KeyNotFound(b)) => a == b,
            (Self::Conflict(a), Self::Conflict(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
