//! Parameter and row values exchanged with a [`SqlExecutor`](crate::executor::SqlExecutor)
//!
//! The engine owns these types instead of handing driver types around, so any
//! executor (the `may_postgres` one, or an in-memory double) can bind
//! parameters and hand back rows without sharing a driver dependency.

use chrono::{DateTime, NaiveDateTime, Utc};
use std::fmt;

use crate::executor::DbError;

/// A single SQL value, used both for bound parameters and for decoded columns
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlValue {
    /// SQL `NULL`
    Null,
    /// `BOOLEAN`
    Bool(bool),
    /// Any integer column, widened to `i64`
    Int(i64),
    /// `TEXT`, `VARCHAR` and friends
    Text(String),
    /// `TIMESTAMP` / `TIMESTAMPTZ`, normalised to UTC
    Timestamp(DateTime<Utc>),
}

impl SqlValue {
    /// Short type label used in decode errors
    pub fn type_name(&self) -> &'static str {
        match self {
            SqlValue::Null => "null",
            SqlValue::Bool(_) => "bool",
            SqlValue::Int(_) => "int",
            SqlValue::Text(_) => "text",
            SqlValue::Timestamp(_) => "timestamp",
        }
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlValue::Null => write!(f, "NULL"),
            SqlValue::Bool(b) => write!(f, "{b}"),
            SqlValue::Int(i) => write!(f, "{i}"),
            SqlValue::Text(s) => write!(f, "'{s}'"),
            SqlValue::Timestamp(ts) => write!(f, "'{}'", ts.to_rfc3339()),
        }
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::Int(value)
    }
}

impl From<bool> for SqlValue {
    fn from(value: bool) -> Self {
        SqlValue::Bool(value)
    }
}

impl From<DateTime<Utc>> for SqlValue {
    fn from(value: DateTime<Utc>) -> Self {
        SqlValue::Timestamp(value)
    }
}

/// One decoded result row, columns in `SELECT` order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SqlRow {
    values: Vec<SqlValue>,
}

impl SqlRow {
    pub fn new(values: Vec<SqlValue>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Raw access to a column
    ///
    /// # Errors
    ///
    /// Returns `DbError::Parse` if `idx` is out of range.
    pub fn get(&self, idx: usize) -> Result<&SqlValue, DbError> {
        self.values.get(idx).ok_or_else(|| {
            DbError::Parse(format!(
                "column index {idx} out of range for row with {} column(s)",
                self.values.len()
            ))
        })
    }

    /// # Errors
    ///
    /// Returns `DbError::Parse` if the column is missing or not an integer.
    pub fn get_i64(&self, idx: usize) -> Result<i64, DbError> {
        match self.get(idx)? {
            SqlValue::Int(i) => Ok(*i),
            other => Err(mismatch(idx, "int", other)),
        }
    }

    /// # Errors
    ///
    /// Returns `DbError::Parse` if the column is missing or not a boolean.
    pub fn get_bool(&self, idx: usize) -> Result<bool, DbError> {
        match self.get(idx)? {
            SqlValue::Bool(b) => Ok(*b),
            other => Err(mismatch(idx, "bool", other)),
        }
    }

    /// # Errors
    ///
    /// Returns `DbError::Parse` if the column is missing or not text.
    pub fn get_string(&self, idx: usize) -> Result<String, DbError> {
        match self.get(idx)? {
            SqlValue::Text(s) => Ok(s.clone()),
            other => Err(mismatch(idx, "text", other)),
        }
    }

    /// Read a timestamp column
    ///
    /// Some executors hand timestamps back as text; those are parsed using the
    /// formats PostgreSQL emits for `TIMESTAMP` and `TIMESTAMPTZ` output.
    ///
    /// # Errors
    ///
    /// Returns `DbError::Parse` if the column is missing, of another type, or
    /// holds text in an unrecognised format.
    pub fn get_timestamp(&self, idx: usize) -> Result<DateTime<Utc>, DbError> {
        match self.get(idx)? {
            SqlValue::Timestamp(ts) => Ok(*ts),
            SqlValue::Text(s) => parse_timestamp(s),
            other => Err(mismatch(idx, "timestamp", other)),
        }
    }
}

fn mismatch(idx: usize, expected: &str, found: &SqlValue) -> DbError {
    DbError::Parse(format!(
        "column {idx}: expected {expected}, found {}",
        found.type_name()
    ))
}

/// Parse a PostgreSQL text timestamp (with or without offset) into UTC
///
/// # Errors
///
/// Returns `DbError::Parse` if none of the known formats match.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, DbError> {
    let raw = raw.trim();

    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%.f%#z", "%Y-%m-%d %H:%M:%S%#z"] {
        if let Ok(ts) = DateTime::parse_from_str(raw, fmt) {
            return Ok(ts.with_timezone(&Utc));
        }
    }
    for fmt in [
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
    ] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Ok(naive.and_utc());
        }
    }

    Err(DbError::Parse(format!(
        "failed to parse timestamp '{raw}': unrecognized format"
    )))
}
