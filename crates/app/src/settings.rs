//! Handles settings for the application. Configuration is read from an
//! optional `settings.toml` and from `PAYLEDGER__*` environment variables.
//!
//! See `settings.toml` at the repository root for an example.
use config::{Config, ConfigError, Environment, File};
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

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Database {
    Memory,
    Sqlite(String),
}

impl Default for Database {
    fn default() -> Self {
        Self::Sqlite("./payledger.db".to_string())
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct Settlement {
    /// Refuse to settle receipts still waiting for confirmation.
    #[serde(default)]
    pub require_confirmed_receipts: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub app: App,
    #[serde(default)]
    pub database: Database,
    #[serde(default)]
    pub settlement: Settlement,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("settings").required(false))
            .add_source(Environment::with_prefix("PAYLEDGER").separator("__"))
            .build()?;

        settings.try_deserialize()
    }
}
