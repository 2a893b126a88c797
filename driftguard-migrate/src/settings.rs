//! Runtime settings: config file and env vars, overridden by CLI flags

use driftguard::{Environment, MigrateConfig};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SettingsError {
    #[error(
        "database URL not provided. Use --database-url, set DRIFTGUARD_DATABASE_URL or DATABASE_URL, \
         or set database_url in the [migrate] section of the config file"
    )]
    MissingDatabaseUrl,
    #[error("APP_ENV: {0}")]
    InvalidEnvironment(String),
}

/// Values given on the command line
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub database_url: Option<String>,
    pub environment: Option<Environment>,
    pub advisory_lock: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub database_url: String,
    pub migrate: MigrateConfig,
}

impl Settings {
    /// Merge `config` with `overrides` and the process environment
    ///
    /// Precedence, highest first:
    /// - database URL: `--database-url`, `DRIFTGUARD_DATABASE_URL`, `DATABASE_URL`, config
    /// - environment: `--environment`, `APP_ENV`, config
    /// - advisory lock: enabled if either the flag or config enables it
    ///
    /// # Errors
    ///
    /// Returns `SettingsError` if no database URL is available or `APP_ENV`
    /// is not a known environment.
    pub fn resolve(
        config: MigrateConfig,
        overrides: Overrides,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, SettingsError> {
        let mut migrate = config;

        let database_url = overrides
            .database_url
            .or_else(|| env("DRIFTGUARD_DATABASE_URL"))
            .or_else(|| env("DATABASE_URL"))
            .or_else(|| migrate.database_url.clone())
            .filter(|url| !url.trim().is_empty())
            .ok_or(SettingsError::MissingDatabaseUrl)?;

        if let Some(environment) = overrides.environment {
            migrate.environment = environment;
        } else if let Some(raw) = env("APP_ENV") {
            migrate.environment = raw.parse().map_err(SettingsError::InvalidEnvironment)?;
        }

        migrate.advisory_lock |= overrides.advisory_lock;
        migrate.database_url = Some(database_url.clone());

        Ok(Self {
            database_url,
            migrate,
        })
    }

    /// [`Settings::resolve`] against the real process environment
    ///
    /// # Errors
    ///
    /// See [`Settings::resolve`].
    pub fn from_env(config: MigrateConfig, overrides: Overrides) -> Result<Self, SettingsError> {
        Self::resolve(config, overrides, |key| std::env::var(key).ok())
    }
}
