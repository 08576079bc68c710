use axum::{Json, http::StatusCode, response::IntoResponse};
use engine::EngineError;

use serde::Serialize;
pub use notifier::TracingNotifier;
pub use server::{ServerState, router, run, run_with_listener, spawn_with_listener};

mod drivers;
mod expenses;
mod flights;
mod notifier;
mod payments;
mod server;
mod vehicles;
mod views;

pub mod types {
    pub use api_types::{Created, Currency};

    pub mod driver {
        pub use api_types::driver::{DriverNew, DriverView, StatementView};
    }

    pub mod vehicle {
        pub use api_types::vehicle::{VehicleNew, VehicleView};
    }

    pub mod flight {
        pub use api_types::flight::{
            FlightComplete, FlightNew, FlightPlan, FlightStart, FlightView, LegNew, LegTotalsView,
            LegView, SettlementView,
        };
    }

    pub mod expense {
        pub use api_types::expense::{ExpenseNew, ExpenseTotal, ExpenseUpdate, ExpenseView};
    }

    pub mod payment {
        pub use api_types::payment::{DebtView, PaymentNew};
    }
}

pub enum ServerError {
    Engine(EngineError),
}

#[derive(Serialize)]
struct Error {
    error: String,
}

fn status_for_engine_error(err: &EngineError) -> StatusCode {
    match err {
        EngineError::KeyNotFound(_) => StatusCode::NOT_FOUND,
        EngineError::Conflict(_)
        | EngineError::StaleFlight(_)
        | EngineError::InvalidTransition(_)
        | EngineError::ImmutableRecord(_) => StatusCode::CONFLICT,
        EngineError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        EngineError::Validation(_)
        | EngineError::InvalidAmount(_)
        | EngineError::Overpayment(_) => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

fn message_for_engine_error(err: EngineError) -> String {
    match err {
        EngineError::Database(db_err) => {
            tracing::error!("database error: {db_err}");
            "internal server error".to_string()
        }
        other => other.to_string(),
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        let (status, error) = match self {
            ServerError::Engine(err) => (status_for_engine_error(&err), message_for_engine_error(err)),
        };

        (status, Json(Error { error })).into_response()
    }
}

impl From<EngineError> for ServerError {
    fn from(value: EngineError) -> Self {
        Self::Engine(value)
    }
}
