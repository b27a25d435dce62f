//! Held order settings.
//!
//! Read from the same JSON settings payload the POS shell already passes
//! around; unknown keys are ignored and every field has a default.

use serde::Deserialize;
use std::path::PathBuf;

const DEFAULT_DB_FILE_NAME: &str = "held_orders.db";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeldOrdersConfig {
    /// Directory holding the database file (the app data dir).
    #[serde(default = "default_data_dir", alias = "data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "default_db_file_name", alias = "db_file_name")]
    pub db_file_name: String,
    /// Held orders older than this many days are purged. `None` keeps them.
    #[serde(default, alias = "retention_days")]
    pub retention_days: Option<u32>,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_db_file_name() -> String {
    DEFAULT_DB_FILE_NAME.to_string()
}

impl Default for HeldOrdersConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            db_file_name: default_db_file_name(),
            retention_days: None,
        }
    }
}

impl HeldOrdersConfig {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    pub fn with_retention_days(mut self, days: u32) -> Self {
        self.retention_days = Some(days);
        self
    }

    /// Parse from a settings value. A `heldOrders` sub-object is used when
    /// present, otherwise the value itself.
    pub fn from_settings(value: &serde_json::Value) -> Result<Self, String> {
        let section = value
            .get("heldOrders")
            .or_else(|| value.get("held_orders"))
            .unwrap_or(value);
        let mut config: Self = serde_json::from_value(section.clone())
            .map_err(|e| format!("Invalid held order settings: {e}"))?;
        config.db_file_name = config.db_file_name.trim().to_string();
        if config.db_file_name.is_empty() {
            config.db_file_name = default_db_file_name();
        }
        // A zero-day window would purge every hold on open.
        if config.retention_days == Some(0) {
            config.retention_days = None;
        }
        Ok(config)
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(&self.db_file_name)
    }
}
