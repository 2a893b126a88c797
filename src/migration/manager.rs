//! Migration Manager - orchestrates the registry against the ledger
//!
//! - `run_migrations`: ensure ledger, resolve pending, apply in registry order,
//!   halting at the first failure
//! - `rollback_last_migration`: revert the most recently applied migration
//! - `reset_database`: revert everything in reverse application order, then
//!   re-run; refused in production before touching the database
//!
//! The manager owns its executor (constructor injection; pass `&executor` to
//! keep using it elsewhere) and reports every error it returns to an
//! [`ErrorSink`].

use std::collections::HashSet;
use std::time::{Duration, Instant};

use super::error::MigrationError;
use super::ledger::Ledger;
use super::lock::{lock_key, MigrationLockGuard};
use super::migration::Migration;
use super::registry::Registry;
use super::runner::MigrationRunner;
use super::sink::{ErrorContext, ErrorSink, LogSink, Operation};
use super::status::MigrationStatus;
use crate::config::{Environment, MigrateConfig};
use crate::executor::SqlExecutor;

/// Outcome of a successful `run_migrations`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// Names applied by this run, in order
    pub applied: Vec<String>,
    /// Registry entries that were already applied
    pub skipped: usize,
    /// Wall time of the whole run, ledger reads included
    pub elapsed: Duration,
}

impl RunReport {
    /// True when nothing was pending
    pub fn is_noop(&self) -> bool {
        self.applied.is_empty()
    }
}

/// Outcome of a successful `reset_database`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResetReport {
    /// Names rolled back, most recent first
    pub rolled_back: Vec<String>,
    /// Names applied again afterwards, in registry order
    pub reapplied: Vec<String>,
}

/// Applies a [`Registry`] to a database and keeps its ledger in step
///
/// Defaults: the `driftguard_migrations` ledger, no advisory lock and a
/// [`LogSink`] for errors.
pub struct MigrationManager<E: SqlExecutor> {
    executor: E,
    environment: Environment,
    ledger: Ledger,
    advisory_lock: bool,
    sink: Box<dyn ErrorSink>,
}

impl<E: SqlExecutor> MigrationManager<E> {
    /// Manager with the default ledger and no advisory lock
    pub fn new(executor: E, environment: Environment) -> Self {
        Self {
            executor,
            environment,
            ledger: Ledger::default(),
            advisory_lock: false,
            sink: Box::new(LogSink),
        }
    }

    /// Build from loaded configuration
    ///
    /// # Errors
    ///
    /// Returns `MigrationError::LedgerInit` if the configured ledger table
    /// name is not a valid identifier.
    pub fn from_config(executor: E, config: &MigrateConfig) -> Result<Self, MigrationError> {
        let ledger = Ledger::new(config.ledger_table.as_str()).map_err(MigrationError::LedgerInit)?;
        Ok(Self::new(executor, config.environment)
            .with_ledger(ledger)
            .with_advisory_lock(config.advisory_lock))
    }

    /// Use a ledger table other than the default
    #[must_use]
    pub fn with_ledger(mut self, ledger: Ledger) -> Self {
        self.ledger = ledger;
        self
    }

    /// Wrap run / rollback / reset in a PostgreSQL advisory lock
    #[must_use]
    pub fn with_advisory_lock(mut self, enabled: bool) -> Self {
        self.advisory_lock = enabled;
        self
    }

    /// Report errors somewhere other than the log
    #[must_use]
    pub fn with_sink(mut self, sink: impl ErrorSink + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    pub fn environment(&self) -> Environment {
        self.environment
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Apply every pending migration in registry order
    ///
    /// Re-running after success is a no-op. On failure, migrations applied
    /// earlier in the run stay applied and later ones are not attempted.
    ///
    /// # Errors
    ///
    /// - `LedgerInit` if the ledger table cannot be created (nothing attempted)
    /// - `Ledger` if applied names cannot be read
    /// - `Apply` naming the failing migration and how many preceded it
    /// - `LockContention` if the advisory lock is enabled and busy
    pub fn run_migrations(&self, registry: &Registry) -> Result<RunReport, MigrationError> {
        self.reported(Operation::Migrate, || {
            let _lock = self.lock()?;
            self.apply_pending(registry)
        })
    }

    /// Roll back the most recently applied migration, if any
    ///
    /// Returns the rolled-back name, or `None` when the ledger is empty.
    ///
    /// # Errors
    ///
    /// - `UnknownMigration` if the last ledger entry is not in `registry`
    /// - `Rollback` if its down script or ledger delete fails
    /// - `LedgerInit`, `Ledger`, `LockContention` as for `run_migrations`
    pub fn rollback_last_migration(
        &self,
        registry: &Registry,
    ) -> Result<Option<String>, MigrationError> {
        self.reported(Operation::Rollback, || {
            let _lock = self.lock()?;
            self.ledger.ensure_exists(&self.executor)?;

            let applied = self.ledger.applied_names(&self.executor)?;
            let Some(last) = applied.last() else {
                log::info!("no applied migrations to roll back");
                return Ok(None);
            };

            let migration = resolve(registry, last)?;
            MigrationRunner::new(&self.executor, &self.ledger).rollback(migration)?;
            Ok(Some(last.clone()))
        })
    }

    /// Roll back every applied migration, newest first, then re-run all
    ///
    /// Refused in production before any database operation. Every applied
    /// name is resolved against `registry` before anything is rolled back.
    ///
    /// # Errors
    ///
    /// - `ForbiddenOperation` in production
    /// - `UnknownMigration` if any ledger entry is not in `registry`
    /// - `PartialReset` if a rollback fails after others succeeded; the
    ///   database is then in a mixed state
    /// - `Rollback` if the very first rollback fails
    /// - any `run_migrations` error from the reapply phase
    pub fn reset_database(&self, registry: &Registry) -> Result<ResetReport, MigrationError> {
        if self.environment.is_production() {
            let err = MigrationError::ForbiddenOperation {
                operation: "reset",
                environment: self.environment,
            };
            self.report(Operation::Reset, &err);
            return Err(err);
        }

        self.reported(Operation::Reset, || {
            let _lock = self.lock()?;
            self.ledger.ensure_exists(&self.executor)?;

            let applied = self.ledger.applied_names(&self.executor)?;
            let targets = applied
                .iter()
                .rev()
                .map(|name| resolve(registry, name))
                .collect::<Result<Vec<_>, _>>()?;

            log::warn!(
                "resetting database: rolling back {} migration(s)",
                targets.len()
            );

            let runner = MigrationRunner::new(&self.executor, &self.ledger);
            let mut rolled_back: Vec<String> = Vec::with_capacity(targets.len());
            for migration in targets {
                if let Err(err) = runner.rollback(migration) {
                    if rolled_back.is_empty() {
                        return Err(err);
                    }
                    let still_applied: Vec<String> = applied
                        .iter()
                        .filter(|name| !rolled_back.contains(*name))
                        .cloned()
                        .collect();
                    log::warn!(
                        "reset halted at '{}': rolled back [{}] but [{}] remain applied; \
                         the database is in a mixed state",
                        migration.name(),
                        rolled_back.join(", "),
                        still_applied.join(", ")
                    );
                    return Err(MigrationError::PartialReset {
                        rolled_back,
                        still_applied,
                        source: Box::new(err),
                    });
                }
                rolled_back.push(migration.name().to_string());
            }

            let report = self.apply_pending(registry)?;
            Ok(ResetReport {
                rolled_back,
                reapplied: report.applied,
            })
        })
    }

    /// Ledger contents compared with `registry`; never changes the schema
    ///
    /// # Errors
    ///
    /// `LedgerInit` or `Ledger` if the ledger cannot be prepared or read.
    pub fn status(&self, registry: &Registry) -> Result<MigrationStatus, MigrationError> {
        self.reported(Operation::Status, || self.load_status(registry))
    }

    /// Check the ledger for drift and modified migrations
    ///
    /// # Errors
    ///
    /// - `UnknownMigration` for the first ledger entry missing from `registry`
    /// - `ChecksumMismatch` for the first applied migration whose up script changed
    /// - `LedgerInit` or `Ledger` as for `status`
    pub fn validate(&self, registry: &Registry) -> Result<MigrationStatus, MigrationError> {
        self.reported(Operation::Validate, || {
            let status = self.load_status(registry)?;
            for entry in &status.applied {
                let migration = resolve(registry, &entry.name)?;
                let current = migration.checksum();
                if current != entry.checksum {
                    return Err(MigrationError::ChecksumMismatch {
                        name: entry.name.clone(),
                        stored: entry.checksum.clone(),
                        current,
                    });
                }
            }
            Ok(status)
        })
    }

    fn load_status(&self, registry: &Registry) -> Result<MigrationStatus, MigrationError> {
        self.ledger.ensure_exists(&self.executor)?;
        let applied = self.ledger.list_applied(&self.executor)?;
        Ok(MigrationStatus::new(registry, applied))
    }

    fn apply_pending(&self, registry: &Registry) -> Result<RunReport, MigrationError> {
        let start = Instant::now();
        self.ledger.ensure_exists(&self.executor)?;

        let applied: HashSet<String> = self
            .ledger
            .applied_names(&self.executor)?
            .into_iter()
            .collect();
        let pending: Vec<&Migration> = registry
            .iter()
            .filter(|m| !applied.contains(m.name()))
            .collect();
        let skipped = registry.len() - pending.len();

        if pending.is_empty() {
            log::info!("database is up to date ({skipped} migration(s) applied)");
            return Ok(RunReport {
                applied: Vec::new(),
                skipped,
                elapsed: start.elapsed(),
            });
        }

        log::info!("applying {} pending migration(s)", pending.len());
        let runner = MigrationRunner::new(&self.executor, &self.ledger);
        let mut done = Vec::with_capacity(pending.len());
        for migration in pending {
            match runner.apply(migration) {
                Ok(_) => done.push(migration.name().to_string()),
                Err(MigrationError::Apply { name, source, .. }) => {
                    return Err(MigrationError::Apply {
                        name,
                        preceding: done.len(),
                        source,
                    });
                }
                Err(other) => return Err(other),
            }
        }

        let elapsed = start.elapsed();
        log::info!("applied {} migration(s) in {:?}", done.len(), elapsed);
        Ok(RunReport {
            applied: done,
            skipped,
            elapsed,
        })
    }

    fn lock(&self) -> Result<Option<MigrationLockGuard<'_, E>>, MigrationError> {
        if !self.advisory_lock {
            return Ok(None);
        }
        MigrationLockGuard::acquire(&self.executor, lock_key(self.ledger.table())).map(Some)
    }

    fn reported<T>(
        &self,
        operation: Operation,
        f: impl FnOnce() -> Result<T, MigrationError>,
    ) -> Result<T, MigrationError> {
        f().map_err(|err| {
            self.report(operation, &err);
            err
        })
    }

    fn report(&self, operation: Operation, err: &MigrationError) {
        self.sink.report(err, &ErrorContext::new(operation, err));
        #[cfg(feature = "metrics")]
        if let Some(metrics) = crate::metrics::METRICS.as_ref() {
            metrics.record_failure(operation.as_str());
        }
    }
}

fn resolve<'r>(registry: &'r Registry, name: &str) -> Result<&'r Migration, MigrationError> {
    registry
        .get(name)
        .ok_or_else(|| MigrationError::UnknownMigration {
            name: name.to_string(),
        })
}
