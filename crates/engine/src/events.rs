//! Domain events.
//!
//! The engine emits an [`EngineEvent`] after each successful state change so
//! that outer layers can push realtime updates. Emission happens after the
//! change is persisted and never influences the outcome of an operation.

use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::{DriverDebt, Expense, Leg, Settlement};

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "event", content = "data")]
pub enum EngineEvent {
    #[serde(rename = "flight:started")]
    FlightStarted { flight_id: Uuid, driver_id: Uuid },
    #[serde(rename = "flight:leg_added")]
    LegAdded { flight_id: Uuid, leg: Leg },
    #[serde(rename = "flight:leg_completed")]
    LegCompleted { flight_id: Uuid, leg: Leg },
    #[serde(rename = "expense:added")]
    ExpenseAdded { expense: Expense },
    #[serde(rename = "expense:updated")]
    ExpenseUpdated { expense: Expense },
    #[serde(rename = "expense:removed")]
    ExpenseRemoved { expense: Expense },
    #[serde(rename = "flight:completed")]
    FlightCompleted {
        flight_id: Uuid,
        driver_id: Uuid,
        settlement: Settlement,
    },
    #[serde(rename = "flight:cancelled")]
    FlightCancelled { flight_id: Uuid, driver_id: Uuid },
    #[serde(rename = "debt:payment_recorded")]
    PaymentRecorded {
        flight_id: Uuid,
        driver_id: Uuid,
        amount_minor: i64,
        debt: DriverDebt,
    },
}

impl EngineEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::FlightStarted { .. } => "flight:started",
            Self::LegAdded { .. } => "flight:leg_added",
            Self::LegCompleted { .. } => "flight:leg_completed",
            Self::ExpenseAdded { .. } => "expense:added",
            Self::ExpenseUpdated { .. } => "expense:updated",
            Self::ExpenseRemoved { .. } => "expense:removed",
            Self::FlightCompleted { .. } => "flight:completed",
            Self::FlightCancelled { .. } => "flight:cancelled",
            Self::PaymentRecorded { .. } => "debt:payment_recorded",
        }
    }
}

/// Receives engine events. Implementations must not block.
pub trait Notifier: Send + Sync {
    fn emit(&self, event: &EngineEvent);
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn emit(&self, _event: &EngineEvent) {}
}

/// Fans events out to any number of subscribers.
///
/// Slow subscribers lag and lose the oldest events; having no subscriber is
/// not an error.
#[derive(Clone, Debug)]
pub struct BroadcastNotifier {
    sender: broadcast::Sender<EngineEvent>,
}

impl BroadcastNotifier {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.sender.subscribe()
    }
}

impl Notifier for BroadcastNotifier {
    fn emit(&self, event: &EngineEvent) {
        let _ = self.sender.send(event.clone());
    }
}
