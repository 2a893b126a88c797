//! Migration ledger table management
//!
//! The ledger is the single source of truth for which migrations are
//! applied. Rows are only ever written through [`Ledger::record_applied`] and
//! [`Ledger::record_rolled_back`], both of which are called by the runner on
//! the executor of an open transaction, never on their own commit.

use once_cell::sync::Lazy;
use regex::Regex;

use super::error::MigrationError;
use super::migration::Migration;
use super::record::LedgerEntry;
use crate::config::DEFAULT_LEDGER_TABLE;
use crate::executor::{DbError, SqlExecutor};
use crate::value::SqlValue;

/// Plain or schema-qualified identifier; the table name is interpolated into SQL
static TABLE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::unwrap_used)] // literal pattern
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]{0,62}(\.[A-Za-z_][A-Za-z0-9_]{0,62})?$").unwrap()
});

/// Handle on the ledger table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ledger {
    table: String,
}

impl Default for Ledger {
    fn default() -> Self {
        Self {
            table: DEFAULT_LEDGER_TABLE.to_string(),
        }
    }
}

impl Ledger {
    /// Ledger stored in `table`
    ///
    /// # Errors
    ///
    /// Returns `DbError::Other` if `table` is not a plain SQL identifier.
    pub fn new(table: impl Into<String>) -> Result<Self, DbError> {
        let table = table.into();
        if !TABLE_PATTERN.is_match(&table) {
            return Err(DbError::Other(format!(
                "invalid ledger table name '{table}': expected an identifier like driftguard_migrations or schema.table"
            )));
        }
        Ok(Self { table })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Create the ledger table if it does not exist
    ///
    /// Safe to call on every startup.
    ///
    /// # Errors
    ///
    /// Returns `MigrationError::LedgerInit` if the table cannot be created.
    pub fn ensure_exists<E>(&self, executor: &E) -> Result<(), MigrationError>
    where
        E: SqlExecutor + ?Sized,
    {
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {} (
                id BIGSERIAL PRIMARY KEY,
                name VARCHAR(255) NOT NULL UNIQUE,
                checksum VARCHAR(64) NOT NULL,
                applied_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )",
            self.table
        );
        executor
            .execute(&sql, &[])
            .map_err(MigrationError::LedgerInit)?;
        log::debug!("ledger table {} is ready", self.table);
        Ok(())
    }

    /// Applied migrations in application order (ledger insertion order)
    ///
    /// # Errors
    ///
    /// Returns `MigrationError::Ledger` if the query fails or a row cannot be decoded.
    pub fn list_applied<E>(&self, executor: &E) -> Result<Vec<LedgerEntry>, MigrationError>
    where
        E: SqlExecutor + ?Sized,
    {
        let sql = format!(
            "SELECT id, name, checksum, applied_at FROM {} ORDER BY id ASC",
            self.table
        );
        executor
            .query_all(&sql, &[])
            .and_then(|rows| {
                rows.iter()
                    .map(LedgerEntry::from_row)
                    .collect::<Result<Vec<_>, _>>()
            })
            .map_err(MigrationError::Ledger)
    }

    /// Names of applied migrations in application order
    ///
    /// # Errors
    ///
    /// See [`Ledger::list_applied`].
    pub fn applied_names<E>(&self, executor: &E) -> Result<Vec<String>, MigrationError>
    where
        E: SqlExecutor + ?Sized,
    {
        Ok(self
            .list_applied(executor)?
            .into_iter()
            .map(|entry| entry.name)
            .collect())
    }

    /// Insert the ledger row for `migration`; call inside its transaction
    ///
    /// # Errors
    ///
    /// Returns the executor's `DbError`, e.g. on a duplicate name.
    pub fn record_applied<E>(&self, executor: &E, migration: &Migration) -> Result<(), DbError>
    where
        E: SqlExecutor + ?Sized,
    {
        let sql = format!("INSERT INTO {} (name, checksum) VALUES ($1, $2)", self.table);
        executor.execute(
            &sql,
            &[
                SqlValue::from(migration.name()),
                SqlValue::from(migration.checksum()),
            ],
        )?;
        Ok(())
    }

    /// Delete the ledger row for `name`; call inside its transaction
    ///
    /// # Errors
    ///
    /// Returns the executor's `DbError`, or `DbError::Query` if no row existed,
    /// which aborts the surrounding rollback.
    pub fn record_rolled_back<E>(&self, executor: &E, name: &str) -> Result<(), DbError>
    where
        E: SqlExecutor + ?Sized,
    {
        let sql = format!("DELETE FROM {} WHERE name = $1", self.table);
        let removed = executor.execute(&sql, &[SqlValue::from(name)])?;
        if removed == 0 {
            return Err(DbError::Query(format!(
                "ledger {} has no entry for migration '{name}'",
                self.table
            )));
        }
        Ok(())
    }
}
