use axum::{
    Router,
    routing::{get, patch, post},
};

use std::{net::SocketAddr, sync::Arc};

use crate::{drivers, expenses, flights, payments, vehicles};
use engine::Engine;

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<Engine>,
}

pub fn router(state: ServerState) -> Router {
    Router::new()
        .route("/drivers", post(drivers::driver_new))
        .route(
            "/drivers/{driver_id}",
            get(drivers::get).delete(drivers::anonymize),
        )
        .route("/drivers/{driver_id}/statement", get(drivers::statement))
        .route("/drivers/{driver_id}/flights", get(flights::list_for_driver))
        .route(
            "/drivers/{driver_id}/expenses",
            get(expenses::list_for_driver).post(expenses::pocket_expense_new),
        )
        .route("/vehicles", post(vehicles::vehicle_new))
        .route("/vehicles/{vehicle_id}", get(vehicles::get))
        .route("/flights", post(flights::flight_new))
        .route("/flights/plan", post(flights::plan))
        .route("/flights/{flight_id}", get(flights::get))
        .route("/flights/{flight_id}/start", post(flights::start))
        .route("/flights/{flight_id}/legs", post(flights::leg_new))
        .route(
            "/flights/{flight_id}/legs/{leg_id}/complete",
            post(flights::leg_complete),
        )
        .route("/flights/{flight_id}/totals", get(flights::totals))
        .route("/flights/{flight_id}/complete", post(flights::complete))
        .route("/flights/{flight_id}/cancel", post(flights::cancel))
        .route(
            "/flights/{flight_id}/expenses",
            get(expenses::list_for_flight).post(expenses::flight_expense_new),
        )
        .route(
            "/flights/{flight_id}/expenses/total",
            get(expenses::total_for_flight),
        )
        .route("/flights/{flight_id}/payments", post(payments::payment_new))
        .route(
            "/expenses/{expense_id}",
            patch(expenses::update).delete(expenses::remove),
        )
        .with_state(state)
}

pub async fn run(engine: Engine, addr: SocketAddr) {
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!("failed to bind server listener: {err}");
            return;
        }
    };
    if let Err(err) = run_with_listener(engine, listener).await {
        tracing::error!("server failed: {err}");
    }
}

pub async fn run_with_listener(
    engine: Engine,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    let state = ServerState {
        engine: Arc::new(engine),
    };

    axum::serve(listener, router(state)).await
}

pub fn spawn_with_listener(
    engine: Engine,
    listener: tokio::net::TcpListener,
) -> Result<SocketAddr, std::io::Error> {
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        if let Err(err) = run_with_listener(engine, listener).await {
            tracing::error!("server failed: {err}");
        }
    });

    Ok(addr)
}
