//! Configuration file
//!
//! ```json
//! { "schema_path": "schema.json", "log_filter": "crudgate=debug" }
//! ```
//!
//! A relative `schema_path` is resolved against the directory holding the
//! configuration file.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::schema::EntityRegistry;

use super::errors::{CliError, CliResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Schema file describing the entities (required)
    pub schema_path: PathBuf,

    /// tracing filter directive (optional, default "info"); RUST_LOG wins
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| CliError::config_error(format!("Failed to read config: {}", e)))?;

        let mut config: Config = serde_json::from_str(&content)
            .map_err(|e| CliError::config_error(format!("Invalid config JSON: {}", e)))?;

        config.validate()?;

        if config.schema_path.is_relative() {
            if let Some(dir) = path.parent() {
                config.schema_path = dir.join(&config.schema_path);
            }
        }

        Ok(config)
    }

    fn validate(&self) -> CliResult<()> {
        if self.schema_path.as_os_str().is_empty() {
            return Err(CliError::config_error("schema_path must not be empty"));
        }
        if self.log_filter.trim().is_empty() {
            return Err(CliError::config_error("log_filter must not be empty"));
        }
        Ok(())
    }

    /// Load the entity registry named by `schema_path`.
    pub fn load_registry(&self) -> CliResult<EntityRegistry> {
        Ok(EntityRegistry::load(&self.schema_path)?)
    }
}
