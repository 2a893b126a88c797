//! Migration-specific error types

use crate::config::Environment;
use crate::executor::DbError;

/// Errors raised while building a [`Registry`](super::Registry)
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// Name is empty or contains characters outside `[a-z0-9_]`
    #[error("invalid migration name '{0}': use lowercase letters, digits and underscores")]
    InvalidName(String),
    /// Two migrations share a name
    #[error("migration name '{0}' is registered more than once")]
    DuplicateName(String),
    /// Two migrations share an id
    #[error("migration id {id} is used by both '{first}' and '{second}'")]
    DuplicateId {
        id: i64,
        first: String,
        second: String,
    },
    /// Ids must increase strictly in registry order
    #[error("migration '{name}' (id {id}) is listed after id {previous}; ids must increase in registry order")]
    OutOfOrder { name: String, id: i64, previous: i64 },
    /// `up` or `down` contains no statements
    #[error("migration '{name}' has an empty {direction} script")]
    BlankScript {
        name: String,
        direction: &'static str,
    },
}

/// Migration engine errors
///
/// Every variant that concerns a specific migration carries its name, so
/// callers and the CLI can always point at the failing migration.
#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    /// The ledger table could not be created or verified; nothing was attempted
    #[error("failed to initialize migration ledger: {0}")]
    LedgerInit(#[source] DbError),

    /// Reading the ledger failed
    #[error("failed to read migration ledger: {0}")]
    Ledger(#[source] DbError),

    /// A forward script or its ledger write failed; its transaction was rolled back
    #[error("migration '{name}' failed to apply ({preceding} migration(s) applied before it in this run): {source}")]
    Apply {
        name: String,
        preceding: usize,
        #[source]
        source: DbError,
    },

    /// A backward script or its ledger delete failed; its transaction was rolled back
    #[error("migration '{name}' failed to roll back: {source}")]
    Rollback {
        name: String,
        #[source]
        source: DbError,
    },

    /// The ledger references a migration the registry no longer contains
    #[error("ledger references migration '{name}' which is not in the registry (drift between code and database history)")]
    UnknownMigration { name: String },

    /// Destructive operation refused in the current environment
    #[error("{operation} is forbidden in the {environment} environment")]
    ForbiddenOperation {
        operation: &'static str,
        environment: Environment,
    },

    /// Another session holds the migration lock
    #[error("migration lock is held by another session: {0}")]
    LockContention(String),

    /// An applied migration's forward script no longer matches what was applied
    #[error("migration '{name}' has been modified after being applied (stored checksum {stored}, current {current})")]
    ChecksumMismatch {
        name: String,
        stored: String,
        current: String,
    },

    /// A reset stopped partway through rolling back, leaving a mixed schema
    #[error(
        "reset stopped after rolling back {} migration(s); still applied: [{}]. \
         The database is in a mixed state and needs manual attention: {source}",
        .rolled_back.len(),
        .still_applied.join(", ")
    )]
    PartialReset {
        rolled_back: Vec<String>,
        still_applied: Vec<String>,
        #[source]
        source: Box<MigrationError>,
    },

    /// The registry itself is invalid
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl MigrationError {
    /// Name of the migration the error concerns, if any
    pub fn migration_name(&self) -> Option<&str> {
        match self {
            MigrationError::Apply { name, .. }
            | MigrationError::Rollback { name, .. }
            | MigrationError::UnknownMigration { name }
            | MigrationError::ChecksumMismatch { name, .. } => Some(name.as_str()),
            MigrationError::PartialReset { source, .. } => source.migration_name(),
            MigrationError::Registry(
                RegistryError::InvalidName(name) | RegistryError::DuplicateName(name),
            ) => Some(name.as_str()),
            MigrationError::Registry(
                RegistryError::OutOfOrder { name, .. } | RegistryError::BlankScript { name, .. },
            ) => Some(name.as_str()),
            MigrationError::Registry(RegistryError::DuplicateId { second, .. }) => {
                Some(second.as_str())
            }
            MigrationError::LedgerInit(_)
            | MigrationError::Ledger(_)
            | MigrationError::ForbiddenOperation { .. }
            | MigrationError::LockContention(_) => None,
        }
    }

    /// Whether re-running the same operation could succeed without code changes
    ///
    /// Used by callers deciding whether to retry; the engine itself never retries.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            MigrationError::Apply { .. }
                | MigrationError::Rollback { .. }
                | MigrationError::Ledger(_)
                | MigrationError::LockContention(_)
        )
    }
}
