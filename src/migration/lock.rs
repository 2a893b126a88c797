//! Advisory-lock based mutual exclusion for migration runs
//!
//! When enabled, the manager wraps each run, rollback and reset in a
//! session-level `pg_try_advisory_lock`. The lock is attempted once: a busy
//! lock is reported as [`MigrationError::LockContention`] and never retried.

use sha2::{Digest, Sha256};

use super::error::MigrationError;
use crate::executor::SqlExecutor;
use crate::value::SqlValue;

/// Derive the advisory lock key for a ledger table
///
/// Different ledger tables in the same database get different keys, so
/// independent migration sets do not block each other.
pub fn lock_key(ledger_table: &str) -> i64 {
    let digest = Sha256::digest(format!("driftguard:{ledger_table}").as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    i64::from_be_bytes(bytes)
}

/// Held advisory lock; released when dropped
pub struct MigrationLockGuard<'a, E: SqlExecutor + ?Sized> {
    executor: &'a E,
    key: i64,
}

impl<'a, E: SqlExecutor + ?Sized> MigrationLockGuard<'a, E> {
    /// Try once to take the lock for `key`
    ///
    /// # Errors
    ///
    /// Returns `MigrationError::LockContention` if another session holds the
    /// lock, or if the lock query itself fails.
    pub fn acquire(executor: &'a E, key: i64) -> Result<Self, MigrationError> {
        let granted = executor
            .query_all("SELECT pg_try_advisory_lock($1)", &[SqlValue::Int(key)])
            .and_then(|rows| match rows.first() {
                Some(row) => row.get_bool(0),
                None => Ok(false),
            })
            .map_err(|e| {
                MigrationError::LockContention(format!("could not query advisory lock {key}: {e}"))
            })?;

        if !granted {
            return Err(MigrationError::LockContention(format!(
                "advisory lock {key} is held by another session; another migration run is in progress"
            )));
        }

        log::debug!("acquired migration advisory lock {key}");
        Ok(Self { executor, key })
    }

    pub fn key(&self) -> i64 {
        self.key
    }
}

impl<E: SqlExecutor + ?Sized> Drop for MigrationLockGuard<'_, E> {
    fn drop(&mut self) {
        match self
            .executor
            .query_all("SELECT pg_advisory_unlock($1)", &[SqlValue::Int(self.key)])
        {
            Ok(_) => log::debug!("released migration advisory lock {}", self.key),
            Err(e) => log::warn!("failed to release migration advisory lock {}: {e}", self.key),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::FakeDatabase;

    #[test]
    fn test_lock_key_is_stable_per_table() {
        assert_eq!(lock_key("driftguard_migrations"), lock_key("driftguard_migrations"));
        assert_ne!(lock_key("driftguard_migrations"), lock_key("schema_history"));
    }

    #[test]
    fn test_guard_releases_on_drop() {
        let db = FakeDatabase::new();
        {
            let guard = MigrationLockGuard::acquire(&db, 7).unwrap();
            assert_eq!(guard.key(), 7);
            assert!(db.lock_held());
        }
        assert!(!db.lock_held());
        assert_eq!(
            db.statements(),
            vec!["SELECT pg_try_advisory_lock($1)", "SELECT pg_advisory_unlock($1)"]
        );
    }

    #[test]
    fn test_contention_is_not_retried() {
        let db = FakeDatabase::new();
        db.hold_lock_elsewhere(true);
        let err = MigrationLockGuard::acquire(&db, 7).err().unwrap();
        assert!(matches!(err, MigrationError::LockContention(_)));
        assert_eq!(db.statement_count(), 1);
    }
}
