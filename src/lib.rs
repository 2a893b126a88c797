//! # Driftguard
//!
//! Transactional, ledger-backed schema migrations for PostgreSQL on the
//! `may_postgres` client.
//!
//! Migrations are plain forward / backward SQL scripts registered in code.
//! Each one is applied together with its ledger row in a single transaction,
//! exactly once and in registry order; rollback and reset walk the ledger
//! backwards. See [`migration`] for the engine and [`MigrationManager`] for
//! the entry point.

pub mod config;
pub mod connection;
pub mod executor;
#[cfg(feature = "metrics")]
pub mod metrics;
pub mod migration;
#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;
pub mod transaction;
pub mod value;

pub use config::{Environment, MigrateConfig};
pub use connection::{connect, validate_connection_string, ConnectionError};
pub use executor::{DbError, MayPostgresExecutor, SqlExecutor};
pub use migration::{
    Migration, MigrationError, MigrationManager, MigrationStatus, Registry, ResetReport, RunReport,
};
pub use transaction::{with_transaction, Transaction};
pub use value::{SqlRow, SqlValue};
