//! Configuration for the migration engine
//!
//! [`MigrateConfig::load`] reads the optional `config/driftguard.toml`
//! (section `[migrate]`) and then environment variables prefixed with
//! `DRIFTGUARD_`, using `__` as the section separator, e.g.
//! `DRIFTGUARD_MIGRATE__ENVIRONMENT=production`. Values such as
//! `DRIFTGUARD_MIGRATE__ADVISORY_LOCK=true` are parsed to their field types.

use config::{Config, ConfigError, Environment as EnvSource, File, Map};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

pub const DEFAULT_CONFIG_FILE: &str = "config/driftguard.toml";
pub const DEFAULT_LEDGER_TABLE: &str = "driftguard_migrations";

/// Deployment environment; `Production` disables destructive operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    #[serde(alias = "dev", alias = "local")]
    Development,
    Test,
    #[serde(alias = "stage")]
    Staging,
    #[serde(alias = "prod")]
    Production,
}

impl Environment {
    pub fn is_production(self) -> bool {
        self == Environment::Production
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Test => "test",
            Environment::Staging => "staging",
            Environment::Production => "production",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" | "local" => Ok(Environment::Development),
            "test" => Ok(Environment::Test),
            "staging" | "stage" => Ok(Environment::Staging),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(format!(
                "unknown environment '{other}' (expected development, test, staging or production)"
            )),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct MigrateConfig {
    #[serde(default)]
    pub database_url: Option<String>,
    #[serde(default)]
    pub environment: Environment,
    #[serde(default = "default_ledger_table")]
    pub ledger_table: String,
    /// Wrap every run in a PostgreSQL advisory lock
    #[serde(default)]
    pub advisory_lock: bool,
}

fn default_ledger_table() -> String {
    DEFAULT_LEDGER_TABLE.to_string()
}

impl Default for MigrateConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            environment: Environment::default(),
            ledger_table: default_ledger_table(),
            advisory_lock: false,
        }
    }
}

impl MigrateConfig {
    /// Load from `config/driftguard.toml` (if present) and `DRIFTGUARD_*` env vars
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file exists but cannot be parsed, or a
    /// value has the wrong type.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(DEFAULT_CONFIG_FILE)
    }

    /// Load from an explicit file path, with env vars layered on top
    ///
    /// A missing file is not an error; an unreadable one is.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file cannot be parsed or the `[migrate]`
    /// section does not deserialize.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::load_with_env(path.as_ref(), None)
    }

    /// `env` replaces the process environment when given
    fn load_with_env(path: &Path, env: Option<Map<String, String>>) -> Result<Self, ConfigError> {
        let env_source = EnvSource::with_prefix("DRIFTGUARD")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
            .source(env);

        let settings = Config::builder()
            .add_source(File::from(path).required(false))
            .add_source(env_source)
            .build()
            .map_err(|e| {
                ConfigError::Message(format!(
                    "failed to load configuration from {}: {e}",
                    path.display()
                ))
            })?;

        match settings.get::<MigrateConfig>("migrate") {
            Ok(cfg) => Ok(cfg),
            Err(ConfigError::NotFound(_)) => {
                log::debug!("no [migrate] configuration found, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(ConfigError::Message(format!(
                "migration configuration is invalid: {e}"
            ))),
        }
    }
}
