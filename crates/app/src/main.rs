use std::{net::SocketAddr, path::PathBuf, sync::Arc};

use clap::Parser;
use migration::{Migrator, MigratorTrait};
use settings::Database;

mod settings;

#[derive(Parser, Debug)]
#[command(name = "fleet")]
#[command(about = "Flight settlement server for trucking fleets")]
struct Cli {
    /// Settings file. Missing files are ignored; `FLEET__*` variables still apply.
    #[arg(long, env = "FLEET_CONFIG", default_value = "settings.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cli = Cli::parse();
    let settings = settings::Settings::new(&cli.config)?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "fleet={level},server={level},engine={level}",
            level = settings.app.level
        ))
        .init();

    let notifier = server::TracingNotifier::new(256);
    let mut builder = engine::Engine::builder()
        .notifier(Arc::new(notifier))
        .base_currency(settings.engine.base_currency);
    builder = match &settings.server.database {
        Database::Memory => {
            tracing::info!("Using in-memory storage, state is lost on exit");
            builder.in_memory()
        }
        Database::Sqlite(path) => builder.database(connect_sqlite(path).await?),
    };
    let engine = builder.build().await?;

    let bind = settings
        .server
        .bind
        .unwrap_or_else(|| "127.0.0.1".to_string());
    let addr: SocketAddr = format!("{}:{}", bind, settings.server.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    server::run_with_listener(engine, listener).await?;

    Ok(())
}

async fn connect_sqlite(
    path: &str,
) -> Result<sea_orm::DatabaseConnection, Box<dyn std::error::Error + Send + Sync>> {
    let database = sea_orm::Database::connect(format!("sqlite:{}?mode=rwc", path)).await?;
    Migrator::up(&database, None).await?;
    tracing::info!("Database {path} migrated");
    Ok(database)
}
