use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct App {
    pub level: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Database {
    Memory,
    Sqlite(String),
}

/// Stale update-request sweep cadence.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Sweep {
    pub interval_hours: u64,
    pub max_age_days: i64,
}

impl Default for Sweep {
    fn default() -> Self {
        Self {
            interval_hours: 24,
            max_age_days: 7,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub app: App,
    pub database: Option<Database>,
    #[serde(default)]
    pub sweep: Sweep,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("atelia").required(false))
            .add_source(Environment::with_prefix("ATELIA").separator("__"))
            .set_default("app.level", "info")?
            .build()?;

        settings.try_deserialize()
    }
}
