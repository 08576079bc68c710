//! Handles settings for the application.
//!
//! Configuration is read from `settings.toml` (when present) and overlaid by
//! `FLEET__<SECTION>__<KEY>` environment variables, e.g.
//! `FLEET__SERVER__PORT=8080`.
use std::path::Path;

use config::{Config, ConfigError, Environment, File};
use engine::Currency;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct App {
    #[serde(default = "default_level")]
    pub level: String,
}

impl Default for App {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}

/// Where the engine persists its state.
///
/// In TOML either `database = "memory"` or `database = { sqlite = "fleet.db" }`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Database {
    Memory,
    Sqlite(String),
}

#[derive(Debug, Deserialize)]
pub struct Server {
    pub bind: Option<String>,
    pub port: u16,
    pub database: Database,
}

#[derive(Debug, Default, Deserialize)]
pub struct Engine {
    #[serde(default)]
    pub base_currency: Currency,
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub app: App,
    pub server: Server,
    #[serde(default)]
    pub engine: Engine,
}

impl Settings {
    pub fn new(path: &Path) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path).required(false))
            .add_source(Environment::with_prefix("FLEET").separator("__"))
            .build()?;

        settings.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    fn parse(toml: &str) -> Settings {
        Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn sqlite_database_with_defaults() {
        let settings = parse(
            r#"
            [server]
            port = 3000
            database = { sqlite = "fleet.db" }
            "#,
        );
        assert_eq!(settings.app.level, "info");
        assert_eq!(settings.engine.base_currency, Currency::Uzs);
        assert!(matches!(settings.server.database, Database::Sqlite(ref path) if path == "fleet.db"));
        assert!(settings.server.bind.is_none());
    }

    #[test]
    fn memory_database_and_base_currency() {
        let settings = parse(
            r#"
            [app]
            level = "debug"

            [server]
            bind = "0.0.0.0"
            port = 8080
            database = "memory"

            [engine]
            base_currency = "USD"
            "#,
        );
        assert_eq!(settings.app.level, "debug");
        assert_eq!(settings.engine.base_currency, Currency::Usd);
        assert!(matches!(settings.server.database, Database::Memory));
    }
}
