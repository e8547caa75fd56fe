use std::{collections::HashMap, path::PathBuf, time::Duration};

use config::{Config, ConfigBuilder, ConfigError, Environment, File, builder::DefaultState};
use serde::Deserialize;

#[derive(Deserialize, Debug)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Browser origin allowed to call the API cross-origin.
    pub frontend_origin: String,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    Memory,
    Sqlite,
}

#[derive(Deserialize, Debug)]
pub struct StorageSettings {
    pub kind: StorageKind,
    pub path: PathBuf,
}

#[derive(Deserialize, Debug)]
pub struct ScannerSettings {
    pub interval_secs: u64,
    pub timezone: String,
}

impl ScannerSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }

    pub fn timezone(&self) -> Result<chrono_tz::Tz, ConfigError> {
        self.timezone.parse().map_err(|_| {
            ConfigError::Message(format!("unknown scanner.timezone {:?}", self.timezone))
        })
    }
}

/// Opaque bearer tokens mapped to the owner they identify.
#[derive(Deserialize, Debug, Default)]
pub struct AuthSettings {
    #[serde(default)]
    pub tokens: HashMap<String, String>,
}

#[derive(Deserialize, Debug)]
pub struct LoggingSettings {
    pub level: String,
}

#[derive(Deserialize, Debug)]
pub struct AppSettings {
    pub server: ServerSettings,
    pub storage: StorageSettings,
    pub scanner: ScannerSettings,
    #[serde(default)]
    pub auth: AuthSettings,
    pub logging: LoggingSettings,
}

impl AppSettings {
    pub fn load() -> Result<Self, ConfigError> {
        let builder = Self::defaults()?
            .add_source(File::with_name("appsettings").required(false))
            .add_source(File::with_name("appsettings.local").required(false))
            .add_source(Environment::with_prefix("APP").separator("__"))
            .set_override_option("server.port", std::env::var("PORT").ok())?
            .set_override_option(
                "server.frontend_origin",
                std::env::var("FRONTEND_ORIGIN").ok(),
            )?;

        Self::build(builder)
    }

    fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 5001)?
            .set_default("server.frontend_origin", "http://localhost:3000")?
            .set_default("storage.kind", "sqlite")?
            .set_default("storage.path", "taskminder.db")?
            .set_default("scanner.interval_secs", 60)?
            .set_default("scanner.timezone", "UTC")?
            .set_default("logging.level", "info")
    }

    fn build(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        let settings: Self = builder.build()?.try_deserialize()?;
        settings.scanner.timezone()?;
        Ok(settings)
    }
}
