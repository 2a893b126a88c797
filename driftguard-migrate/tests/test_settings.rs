//! Tests for settings resolution

use driftguard::{Environment, MigrateConfig};
use driftguard_migrate::settings::{Overrides, Settings, SettingsError};
use std::collections::HashMap;
use std::io::Write;

fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key: &str| map.get(key).cloned()
}

#[test]
fn test_cli_url_wins() {
    let settings = Settings::resolve(
        MigrateConfig {
            database_url: Some("postgres://cfg:x@cfg/db".into()),
            ..MigrateConfig::default()
        },
        Overrides {
            database_url: Some("postgres://cli:x@cli/db".into()),
            ..Overrides::default()
        },
        env(&[("DATABASE_URL", "postgres://env:x@env/db")]),
    )
    .unwrap();
    assert_eq!(settings.database_url, "postgres://cli:x@cli/db");
}

#[test]
fn test_url_env_precedence() {
    let settings = Settings::resolve(
        MigrateConfig::default(),
        Overrides::default(),
        env(&[
            ("DATABASE_URL", "postgres://generic:x@h/db"),
            ("DRIFTGUARD_DATABASE_URL", "postgres://specific:x@h/db"),
        ]),
    )
    .unwrap();
    assert_eq!(settings.database_url, "postgres://specific:x@h/db");

    let settings = Settings::resolve(
        MigrateConfig {
            database_url: Some("postgres://cfg:x@h/db".into()),
            ..MigrateConfig::default()
        },
        Overrides::default(),
        env(&[]),
    )
    .unwrap();
    assert_eq!(settings.database_url, "postgres://cfg:x@h/db");
}

#[test]
fn test_missing_url_is_error() {
    let err =
        Settings::resolve(MigrateConfig::default(), Overrides::default(), env(&[])).unwrap_err();
    assert_eq!(err, SettingsError::MissingDatabaseUrl);

    let err = Settings::resolve(
        MigrateConfig::default(),
        Overrides::default(),
        env(&[("DATABASE_URL", "  ")]),
    )
    .unwrap_err();
    assert_eq!(err, SettingsError::MissingDatabaseUrl);
}

#[test]
fn test_environment_precedence() {
    let url = [("DATABASE_URL", "postgres://a:b@h/db")];

    let settings =
        Settings::resolve(MigrateConfig::default(), Overrides::default(), env(&url)).unwrap();
    assert_eq!(settings.migrate.environment, Environment::Development);

    let settings = Settings::resolve(
        MigrateConfig::default(),
        Overrides::default(),
        env(&[url[0], ("APP_ENV", "prod")]),
    )
    .unwrap();
    assert!(settings.migrate.environment.is_production());

    let settings = Settings::resolve(
        MigrateConfig::default(),
        Overrides {
            environment: Some(Environment::Test),
            ..Overrides::default()
        },
        env(&[url[0], ("APP_ENV", "production")]),
    )
    .unwrap();
    assert_eq!(settings.migrate.environment, Environment::Test);

    let err = Settings::resolve(
        MigrateConfig::default(),
        Overrides::default(),
        env(&[url[0], ("APP_ENV", "qa")]),
    )
    .unwrap_err();
    assert!(matches!(err, SettingsError::InvalidEnvironment(_)));
}

#[test]
fn test_config_file_feeds_settings() {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(
        file,
        "[migrate]\n\
         environment = \"staging\"\n\
         ledger_table = \"schema_history\"\n\
         database_url = \"postgres://app:pw@db/app\""
    )
    .unwrap();

    let config = MigrateConfig::load_from(file.path()).unwrap();
    let settings = Settings::resolve(
        config,
        Overrides {
            advisory_lock: true,
            ..Overrides::default()
        },
        env(&[]),
    )
    .unwrap();

    assert_eq!(settings.database_url, "postgres://app:pw@db/app");
    assert_eq!(settings.migrate.environment, Environment::Staging);
    assert_eq!(settings.migrate.ledger_table, "schema_history");
    assert!(settings.migrate.advisory_lock);
}
