//! Migration Runner - applies or reverts a single migration atomically
//!
//! Each call runs the script's statements and the matching ledger write
//! inside one transaction. Nothing is logged as applied or rolled back until
//! that transaction has been committed, and failures are logged only after
//! the rollback has been issued.

use std::time::{Duration, Instant};

use super::error::MigrationError;
use super::ledger::Ledger;
use super::migration::Migration;
use crate::executor::{DbError, SqlExecutor};
use crate::transaction::with_transaction;

/// Applies or reverts single migrations, one transaction each
///
/// The runner never consults the registry; ordering is the manager's job.
pub struct MigrationRunner<'a, E: SqlExecutor + ?Sized> {
    executor: &'a E,
    ledger: &'a Ledger,
}

impl<'a, E: SqlExecutor + ?Sized> MigrationRunner<'a, E> {
    pub fn new(executor: &'a E, ledger: &'a Ledger) -> Self {
        Self { executor, ledger }
    }

    /// Run `migration.up` and record it in the ledger, in one transaction
    ///
    /// # Errors
    ///
    /// Returns `MigrationError::Apply` (with `preceding = 0`; the manager
    /// fills in the run position) if any statement or the ledger insert
    /// fails. The transaction is rolled back in full.
    pub fn apply(&self, migration: &Migration) -> Result<Duration, MigrationError> {
        #[cfg(feature = "tracing")]
        let _span = tracing::info_span!("driftguard.apply", migration = migration.name()).entered();

        let start = Instant::now();
        let result = with_transaction(self.executor, |tx| -> Result<(), DbError> {
            for statement in migration.up_statements() {
                log::debug!("[{}] {}", migration.name(), statement);
                tx.execute(&statement, &[])?;
            }
            self.ledger.record_applied(tx, migration)
        });
        let elapsed = start.elapsed();

        match result {
            Ok(()) => {
                log::info!("applied migration {} in {:?}", migration.name(), elapsed);
                #[cfg(feature = "metrics")]
                if let Some(metrics) = crate::metrics::METRICS.as_ref() {
                    metrics.record_applied(migration.name(), elapsed);
                }
                Ok(elapsed)
            }
            Err(source) => {
                log::error!(
                    "migration {} failed and was rolled back: {}",
                    migration.name(),
                    source
                );
                Err(MigrationError::Apply {
                    name: migration.name().to_string(),
                    preceding: 0,
                    source,
                })
            }
        }
    }

    /// Run `migration.down` and delete its ledger row, in one transaction
    ///
    /// # Errors
    ///
    /// Returns `MigrationError::Rollback` if any statement fails or the ledger
    /// has no row for the migration. The transaction is rolled back in full.
    pub fn rollback(&self, migration: &Migration) -> Result<Duration, MigrationError> {
        #[cfg(feature = "tracing")]
        let _span =
            tracing::info_span!("driftguard.rollback", migration = migration.name()).entered();

        let start = Instant::now();
        let result = with_transaction(self.executor, |tx| -> Result<(), DbError> {
            for statement in migration.down_statements() {
                log::debug!("[{}] {}", migration.name(), statement);
                tx.execute(&statement, &[])?;
            }
            self.ledger.record_rolled_back(tx, migration.name())
        });
        let elapsed = start.elapsed();

        match result {
            Ok(()) => {
                log::info!("rolled back migration {} in {:?}", migration.name(), elapsed);
                #[cfg(feature = "metrics")]
                if let Some(metrics) = crate::metrics::METRICS.as_ref() {
                    metrics.record_rolled_back(migration.name(), elapsed);
                }
                Ok(elapsed)
            }
            Err(source) => {
                log::error!(
                    "rollback of migration {} failed; its transaction was rolled back: {}",
                    migration.name(),
                    source
                );
                Err(MigrationError::Rollback {
                    name: migration.name().to_string(),
                    source,
                })
            }
        }
    }
}
