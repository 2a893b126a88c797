//! `LedgerEntry` - one row of the migration ledger

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::executor::DbError;
use crate::value::SqlRow;

/// An applied migration, as recorded in the ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerEntry {
    /// Surrogate key; its order is the application order
    pub id: i64,

    pub name: String,

    /// SHA-256 of the `up` script at the time it was applied
    pub checksum: String,

    pub applied_at: DateTime<Utc>,
}

impl LedgerEntry {
    /// Decode a row selected as `id, name, checksum, applied_at`
    ///
    /// # Errors
    ///
    /// Returns `DbError::Parse` if a column is missing, NULL, or of the wrong
    /// type, or if a text `applied_at` is in an unrecognized format.
    pub fn from_row(row: &SqlRow) -> Result<Self, DbError> {
        Ok(Self {
            id: row.get_i64(0)?,
            name: row.get_string(1)?,
            checksum: row.get_string(2)?,
            applied_at: row.get_timestamp(3)?,
        })
    }
}
