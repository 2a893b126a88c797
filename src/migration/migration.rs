//! Migration definition

use sha2::{Digest, Sha256};

use super::script::split_statements;

/// A named, ordered pair of forward and backward SQL scripts
///
/// Migrations are defined in code and never persisted as entities; the ledger
/// only stores their `name`. `id` orders migrations within a single
/// deployment's registry and is never used to look anything up in the ledger,
/// so renumbering migrations without renaming them is safe.
///
/// # Example
///
/// ```rust
/// use driftguard::migration::Migration;
///
/// let migration = Migration::new(
///     1,
///     "create_users",
///     "CREATE TABLE users (id BIGSERIAL PRIMARY KEY, email TEXT NOT NULL UNIQUE);",
///     "DROP TABLE users;",
/// );
/// assert_eq!(migration.up_statements().len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Migration {
    id: i64,
    name: String,
    up: String,
    down: String,
}

impl Migration {
    pub fn new(
        id: i64,
        name: impl Into<String>,
        up: impl Into<String>,
        down: impl Into<String>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            up: up.into(),
            down: down.into(),
        }
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    /// Stable identifier, used as the ledger key
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Forward script
    pub fn up(&self) -> &str {
        &self.up
    }

    /// Backward script; must exactly reverse [`Migration::up`]
    pub fn down(&self) -> &str {
        &self.down
    }

    pub fn up_statements(&self) -> Vec<String> {
        split_statements(&self.up)
    }

    pub fn down_statements(&self) -> Vec<String> {
        split_statements(&self.down)
    }

    /// Hex SHA-256 of the forward script, recorded in the ledger on apply
    pub fn checksum(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.up.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}
