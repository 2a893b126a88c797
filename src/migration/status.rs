//! Migration status: ledger contents compared with the registry

use serde::Serialize;

use super::migration::Migration;
use super::record::LedgerEntry;
use super::registry::Registry;

/// A registry entry that has not been applied
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingMigration {
    pub id: i64,
    pub name: String,
    pub checksum: String,
}

impl From<&Migration> for PendingMigration {
    fn from(migration: &Migration) -> Self {
        Self {
            id: migration.id(),
            name: migration.name().to_string(),
            checksum: migration.checksum(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationStatus {
    /// Ledger entries in application order
    pub applied: Vec<LedgerEntry>,

    /// Registry entries absent from the ledger, in registry order
    pub pending: Vec<PendingMigration>,

    /// Ledger names the registry no longer contains (drift)
    pub unknown: Vec<String>,
}

impl MigrationStatus {
    /// Classify `applied` (ledger order) against `registry`
    pub fn new(registry: &Registry, applied: Vec<LedgerEntry>) -> Self {
        let pending = registry
            .iter()
            .filter(|m| !applied.iter().any(|entry| entry.name == m.name()))
            .map(PendingMigration::from)
            .collect();
        let unknown = applied
            .iter()
            .filter(|entry| !registry.contains(&entry.name))
            .map(|entry| entry.name.clone())
            .collect();

        Self {
            applied,
            pending,
            unknown,
        }
    }

    #[must_use]
    pub fn is_up_to_date(&self) -> bool {
        self.pending.is_empty()
    }

    #[must_use]
    pub fn has_drift(&self) -> bool {
        !self.unknown.is_empty()
    }

    /// Name of the most recently applied migration
    #[must_use]
    pub fn last_applied(&self) -> Option<&str> {
        self.applied.last().map(|entry| entry.name.as_str())
    }
}
