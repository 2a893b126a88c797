//! In-memory executor for exercising the migration engine without PostgreSQL
//!
//! `FakeDatabase` understands just enough SQL to stand in for a real server
//! in tests:
//!
//! - `CREATE TABLE` (column names are tracked), `DROP TABLE`
//! - `ALTER TABLE .. ADD/DROP [COLUMN]`; other `ALTER TABLE` forms only check
//!   that the table exists
//! - `CREATE INDEX`, `DROP INDEX`
//! - `CREATE [OR REPLACE] FUNCTION`, `DROP FUNCTION`
//! - `CREATE TRIGGER .. ON t .. EXECUTE FUNCTION f()`, `DROP TRIGGER .. ON t`;
//!   a function with triggers cannot be dropped and dropping a table drops
//!   its triggers
//! - `INSERT INTO t (..) VALUES (..)`: the row is `[id, params.., now()]`, with
//!   `id` drawn from a per-table sequence and the first parameter unique
//! - `DELETE FROM t WHERE .. = $1`: matches on the first inserted column
//! - `SELECT .. FROM t`: every row of `t`, ordered by `id`
//! - `BEGIN` / `COMMIT` / `ROLLBACK` with snapshot semantics; a failed
//!   statement aborts the open transaction like PostgreSQL does
//! - `pg_try_advisory_lock` / `pg_advisory_unlock`
//!
//! Every statement is recorded (including failing ones) so tests can assert
//! on exactly what the engine sent. Clones share state.

use chrono::Utc;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::executor::{DbError, SqlExecutor};
use crate::value::{SqlRow, SqlValue};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct FakeTable {
    columns: Vec<String>,
    rows: Vec<Vec<SqlValue>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Schema {
    tables: BTreeMap<String, FakeTable>,
    indexes: BTreeSet<String>,
    functions: BTreeSet<String>,
    /// `(table, trigger)` -> function
    triggers: BTreeMap<(String, String), String>,
}

/// Structure of the fake database without its rows
///
/// Two snapshots compare equal when the same tables (with the same columns
/// in the same order), indexes, functions and triggers exist.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaSnapshot {
    pub tables: BTreeMap<String, Vec<String>>,
    pub indexes: BTreeSet<String>,
    pub functions: BTreeSet<String>,
    pub triggers: BTreeSet<(String, String)>,
}

#[derive(Debug, Default)]
struct State {
    schema: Schema,
    /// Sequences are not transactional, matching PostgreSQL `BIGSERIAL`
    sequences: BTreeMap<String, i64>,
    snapshot: Option<Schema>,
    aborted: bool,
    statements: Vec<String>,
    fail_patterns: Vec<String>,
    lock_held_elsewhere: bool,
    lock_held: bool,
}

/// Shared, cloneable in-memory database
#[derive(Debug, Clone, Default)]
pub struct FakeDatabase {
    state: Arc<Mutex<State>>,
}

impl FakeDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // A poisoned lock only means another test thread panicked mid-statement.
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Make every statement containing `pattern` fail
    pub fn fail_on(&self, pattern: &str) {
        self.lock().fail_patterns.push(pattern.to_string());
    }

    pub fn clear_failures(&self) {
        self.lock().fail_patterns.clear();
    }

    /// Simulate another session holding the migration advisory lock
    pub fn hold_lock_elsewhere(&self, held: bool) {
        self.lock().lock_held_elsewhere = held;
    }

    /// Whether this session currently holds the advisory lock
    pub fn lock_held(&self) -> bool {
        self.lock().lock_held
    }

    /// Every statement received so far, trimmed, in order
    pub fn statements(&self) -> Vec<String> {
        self.lock().statements.clone()
    }

    pub fn statement_count(&self) -> usize {
        self.lock().statements.len()
    }

    pub fn clear_statements(&self) {
        self.lock().statements.clear();
    }

    pub fn has_table(&self, name: &str) -> bool {
        self.lock().schema.tables.contains_key(&name.to_lowercase())
    }

    pub fn has_index(&self, name: &str) -> bool {
        self.lock().schema.indexes.contains(&name.to_lowercase())
    }

    /// Table names, sorted
    pub fn tables(&self) -> Vec<String> {
        self.lock().schema.tables.keys().cloned().collect()
    }

    /// Index names, sorted
    pub fn indexes(&self) -> Vec<String> {
        self.lock().schema.indexes.iter().cloned().collect()
    }

    /// Column names of `table` in definition order
    pub fn columns(&self, table: &str) -> Option<Vec<String>> {
        self.lock()
            .schema
            .tables
            .get(&table.to_lowercase())
            .map(|t| t.columns.clone())
    }

    pub fn has_function(&self, name: &str) -> bool {
        self.lock().schema.functions.contains(&name.to_lowercase())
    }

    /// `(table, trigger)` pairs, sorted
    pub fn triggers(&self) -> Vec<(String, String)> {
        self.lock().schema.triggers.keys().cloned().collect()
    }

    pub fn schema_snapshot(&self) -> SchemaSnapshot {
        let state = self.lock();
        SchemaSnapshot {
            tables: state
                .schema
                .tables
                .iter()
                .map(|(name, table)| (name.clone(), table.columns.clone()))
                .collect(),
            indexes: state.schema.indexes.clone(),
            functions: state.schema.functions.clone(),
            triggers: state.schema.triggers.keys().cloned().collect(),
        }
    }

    /// Rows of `table` in insertion order, or `None` if it does not exist
    pub fn rows(&self, table: &str) -> Option<Vec<SqlRow>> {
        self.lock()
            .schema
            .tables
            .get(&table.to_lowercase())
            .map(|t| t.rows.iter().cloned().map(SqlRow::new).collect())
    }

    pub fn in_transaction(&self) -> bool {
        self.lock().snapshot.is_some()
    }

    fn run(&self, sql: &str, params: &[SqlValue]) -> Result<Option<Vec<SqlRow>>, DbError> {
        let mut state = self.lock();
        let trimmed = sql.trim();
        state.statements.push(trimmed.to_string());

        let normalized = normalize(trimmed);
        let tokens: Vec<&str> = normalized.split(' ').collect();
        let keyword = tokens.first().map(|t| t.to_uppercase()).unwrap_or_default();

        let injected = state.fail_patterns.iter().any(|p| trimmed.contains(p.as_str()));

        match keyword.as_str() {
            "BEGIN" => {
                if injected {
                    return Err(injected_failure(trimmed));
                }
                if state.snapshot.is_some() {
                    return Err(DbError::Query(
                        "there is already a transaction in progress".into(),
                    ));
                }
                state.snapshot = Some(state.schema.clone());
                state.aborted = false;
                return Ok(None);
            }
            "COMMIT" => {
                let snapshot = state.snapshot.take();
                let aborted = std::mem::replace(&mut state.aborted, false);
                if injected || aborted {
                    if let Some(schema) = snapshot {
                        state.schema = schema;
                    }
                }
                if injected {
                    return Err(injected_failure(trimmed));
                }
                return Ok(None);
            }
            "ROLLBACK" => {
                if injected {
                    return Err(injected_failure(trimmed));
                }
                if let Some(schema) = state.snapshot.take() {
                    state.schema = schema;
                }
                state.aborted = false;
                return Ok(None);
            }
            _ => {}
        }

        if state.aborted {
            return Err(DbError::Query(
                "current transaction is aborted, commands ignored until end of transaction block"
                    .into(),
            ));
        }

        let result = if injected {
            Err(injected_failure(trimmed))
        } else {
            apply(&mut state, &tokens, params)
        };

        if result.is_err() && state.snapshot.is_some() {
            state.aborted = true;
        }
        result
    }
}

impl SqlExecutor for FakeDatabase {
    fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<u64, DbError> {
        self.run(sql, params)
            .map(|rows| rows.map_or(0, |r| r.len() as u64))
    }

    fn query_all(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<SqlRow>, DbError> {
        self.run(sql, params).map(Option::unwrap_or_default)
    }
}

fn injected_failure(sql: &str) -> DbError {
    DbError::Query(format!("injected failure: {sql}"))
}

/// Drop `--` comments, collapse whitespace and any trailing `;`
fn normalize(sql: &str) -> String {
    sql.lines()
        .map(|line| line.split("--").next().unwrap_or_default())
        .collect::<Vec<_>>()
        .join(" ")
        .trim()
        .trim_end_matches(';')
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Column names from the parenthesised body of a `CREATE TABLE`
fn column_names(statement: &str) -> Vec<String> {
    let (Some(open), Some(close)) = (statement.find('('), statement.rfind(')')) else {
        return Vec::new();
    };
    if close <= open {
        return Vec::new();
    }

    let mut items = Vec::new();
    let mut depth = 0usize;
    let mut current = String::new();
    for c in statement[open + 1..close].chars() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                items.push(std::mem::take(&mut current));
                continue;
            }
            _ => {}
        }
        current.push(c);
    }
    items.push(current);

    items
        .iter()
        .filter_map(|item| item.split_whitespace().next())
        .filter(|first| {
            !matches!(
                first.to_uppercase().as_str(),
                "PRIMARY" | "UNIQUE" | "CONSTRAINT" | "FOREIGN" | "CHECK" | "EXCLUDE" | "LIKE"
            )
        })
        .map(ident)
        .collect()
}

fn ident(token: &str) -> String {
    token
        .split('(')
        .next()
        .unwrap_or_default()
        .trim_matches('"')
        .to_lowercase()
}

fn upper(tokens: &[&str]) -> Vec<String> {
    tokens.iter().map(|t| t.to_uppercase()).collect()
}

/// Index of the first token at or after `start` that is not
/// `IF [NOT] EXISTS` / `CONCURRENTLY` noise
fn skip_noise(tokens: &[&str], start: usize) -> usize {
    let mut i = start;
    while i < tokens.len()
        && matches!(
            tokens[i].to_uppercase().as_str(),
            "IF" | "NOT" | "EXISTS" | "CONCURRENTLY"
        )
    {
        i += 1;
    }
    i
}

/// Skip optional `IF [NOT] EXISTS` noise and return the object name
fn object_name(tokens: &[&str], start: usize) -> Option<String> {
    tokens.get(skip_noise(tokens, start)).map(|t| ident(t))
}

fn has_if(tokens: &[&str], start: usize) -> bool {
    tokens
        .get(start)
        .map(|t| t.eq_ignore_ascii_case("IF"))
        .unwrap_or(false)
}

fn table_after(tokens: &[&str], keyword: &str) -> Option<String> {
    let up = upper(tokens);
    up.iter()
        .position(|t| t == keyword)
        .and_then(|i| tokens.get(i + 1))
        .map(|t| ident(t))
}

fn missing(kind: &str, name: &str) -> DbError {
    DbError::Query(format!("{kind} \"{name}\" does not exist"))
}

/// `ALTER TABLE [IF EXISTS] t ADD|DROP [COLUMN] [IF [NOT] EXISTS] c ..`
fn alter_table(state: &mut State, tokens: &[&str]) -> Result<Option<Vec<SqlRow>>, DbError> {
    let name_at = skip_noise(tokens, 2);
    let name = tokens.get(name_at).map(|t| ident(t)).unwrap_or_default();
    let Some(table) = state.schema.tables.get_mut(&name) else {
        if has_if(tokens, 2) {
            return Ok(None);
        }
        return Err(missing("relation", &name));
    };

    let up = upper(tokens);
    let action = up.get(name_at + 1).map(String::as_str).unwrap_or_default();
    let mut at = name_at + 2;
    if up.get(at).map(String::as_str) == Some("COLUMN") {
        at += 1;
    } else if matches!(
        up.get(at).map(String::as_str),
        Some("CONSTRAINT" | "PRIMARY" | "UNIQUE" | "FOREIGN" | "CHECK")
    ) {
        return Ok(None);
    }
    let tolerant = has_if(tokens, at);
    let column = match tokens.get(skip_noise(tokens, at)) {
        Some(token) => ident(token),
        None => return Ok(None),
    };

    match action {
        "ADD" => {
            if table.columns.contains(&column) {
                if tolerant {
                    return Ok(None);
                }
                return Err(DbError::Query(format!(
                    "column \"{column}\" of relation \"{name}\" already exists"
                )));
            }
            table.columns.push(column);
        }
        "DROP" => match table.columns.iter().position(|c| *c == column) {
            Some(index) => {
                table.columns.remove(index);
            }
            None if tolerant => {}
            None => {
                return Err(DbError::Query(format!(
                    "column \"{column}\" of relation \"{name}\" does not exist"
                )))
            }
        },
        _ => {}
    }
    Ok(None)
}

fn apply(
    state: &mut State,
    tokens: &[&str],
    params: &[SqlValue],
) -> Result<Option<Vec<SqlRow>>, DbError> {
    let up = upper(tokens);
    let head: Vec<&str> = up.iter().take(3).map(String::as_str).collect();

    match head.as_slice() {
        ["CREATE", "TABLE", ..] => {
            let name = object_name(tokens, 2).unwrap_or_default();
            if state.schema.tables.contains_key(&name) {
                if has_if(tokens, 2) {
                    return Ok(None);
                }
                return Err(DbError::Query(format!("relation \"{name}\" already exists")));
            }
            let table = FakeTable {
                columns: column_names(&tokens.join(" ")),
                rows: Vec::new(),
            };
            state.schema.tables.insert(name, table);
            Ok(None)
        }
        ["DROP", "TABLE", ..] => {
            let name = object_name(tokens, 2).unwrap_or_default();
            if state.schema.tables.remove(&name).is_none() {
                if !has_if(tokens, 2) {
                    return Err(missing("table", &name));
                }
                return Ok(None);
            }
            state.schema.triggers.retain(|(table, _), _| *table != name);
            Ok(None)
        }
        ["ALTER", "TABLE", ..] => alter_table(state, tokens),
        ["CREATE", "FUNCTION", ..] | ["CREATE", "OR", "REPLACE"] => {
            let start = if up[1] == "OR" { 4 } else { 2 };
            if up.get(start - 1).map(String::as_str) != Some("FUNCTION") {
                return Ok(None);
            }
            let name = object_name(tokens, start).unwrap_or_default();
            if !state.schema.functions.insert(name.clone()) && start == 2 {
                return Err(DbError::Query(format!("function \"{name}\" already exists")));
            }
            Ok(None)
        }
        ["DROP", "FUNCTION", ..] => {
            let name = object_name(tokens, 2).unwrap_or_default();
            if state.schema.triggers.values().any(|f| *f == name) {
                return Err(DbError::Query(format!(
                    "cannot drop function {name}() because other objects depend on it"
                )));
            }
            if !state.schema.functions.remove(&name) && !has_if(tokens, 2) {
                return Err(missing("function", &name));
            }
            Ok(None)
        }
        ["CREATE", "TRIGGER", ..] => {
            let name = object_name(tokens, 2).unwrap_or_default();
            let table = table_after(tokens, "ON").unwrap_or_default();
            let function = table_after(tokens, "FUNCTION")
                .or_else(|| table_after(tokens, "PROCEDURE"))
                .unwrap_or_default();
            if !state.schema.tables.contains_key(&table) {
                return Err(missing("relation", &table));
            }
            if !state.schema.functions.contains(&function) {
                return Err(missing("function", &function));
            }
            let key = (table, name);
            if state.schema.triggers.contains_key(&key) {
                return Err(DbError::Query(format!(
                    "trigger \"{}\" for relation \"{}\" already exists",
                    key.1, key.0
                )));
            }
            state.schema.triggers.insert(key, function);
            Ok(None)
        }
        ["DROP", "TRIGGER", ..] => {
            let name = object_name(tokens, 2).unwrap_or_default();
            let table = table_after(tokens, "ON").unwrap_or_default();
            if state.schema.triggers.remove(&(table, name.clone())).is_none()
                && !has_if(tokens, 2)
            {
                return Err(missing("trigger", &name));
            }
            Ok(None)
        }
        ["CREATE", "INDEX", ..] | ["CREATE", "UNIQUE", "INDEX"] => {
            let start = if up[1] == "UNIQUE" { 3 } else { 2 };
            let name = object_name(tokens, start).unwrap_or_default();
            let table = table_after(tokens, "ON").unwrap_or_default();
            if !state.schema.tables.contains_key(&table) {
                return Err(missing("relation", &table));
            }
            if !state.schema.indexes.insert(name.clone()) && !has_if(tokens, start) {
                return Err(DbError::Query(format!("relation \"{name}\" already exists")));
            }
            Ok(None)
        }
        ["DROP", "INDEX", ..] => {
            let name = object_name(tokens, 2).unwrap_or_default();
            if !state.schema.indexes.remove(&name) && !has_if(tokens, 2) {
                return Err(missing("index", &name));
            }
            Ok(None)
        }
        ["INSERT", "INTO", ..] => {
            let name = ident(tokens.get(2).copied().unwrap_or_default());
            let next_id = state.sequences.get(&name).copied().unwrap_or(0) + 1;
            let table = state
                .schema
                .tables
                .get_mut(&name)
                .ok_or_else(|| missing("relation", &name))?;
            if let Some(key) = params.first() {
                if table.rows.iter().any(|r| r.get(1) == Some(key)) {
                    return Err(DbError::Query(format!(
                        "duplicate key value violates unique constraint on \"{name}\": {key}"
                    )));
                }
            }
            let mut row = Vec::with_capacity(params.len() + 2);
            row.push(SqlValue::Int(next_id));
            row.extend(params.iter().cloned());
            row.push(SqlValue::Timestamp(Utc::now()));
            table.rows.push(row);
            state.sequences.insert(name, next_id);
            Ok(Some(vec![SqlRow::default()]))
        }
        ["DELETE", "FROM", ..] => {
            let name = ident(tokens.get(2).copied().unwrap_or_default());
            let table = state
                .schema
                .tables
                .get_mut(&name)
                .ok_or_else(|| missing("relation", &name))?;
            let before = table.rows.len();
            if let Some(key) = params.first() {
                table.rows.retain(|r| r.get(1) != Some(key));
            } else {
                table.rows.clear();
            }
            let removed = before - table.rows.len();
            Ok(Some(vec![SqlRow::default(); removed]))
        }
        ["SELECT", ..] => {
            let joined = tokens.join(" ").to_lowercase();
            if joined.contains("pg_try_advisory_lock") {
                let granted = !state.lock_held_elsewhere;
                if granted {
                    state.lock_held = true;
                }
                return Ok(Some(vec![SqlRow::new(vec![SqlValue::Bool(granted)])]));
            }
            if joined.contains("pg_advisory_unlock") {
                let was_held = std::mem::replace(&mut state.lock_held, false);
                return Ok(Some(vec![SqlRow::new(vec![SqlValue::Bool(was_held)])]));
            }
            match table_after(tokens, "FROM") {
                Some(name) => {
                    let table = state
                        .schema
                        .tables
                        .get(&name)
                        .ok_or_else(|| missing("relation", &name))?;
                    let mut rows = table.rows.clone();
                    rows.sort_by_key(|r| match r.first() {
                        Some(SqlValue::Int(id)) => *id,
                        _ => 0,
                    });
                    Ok(Some(rows.into_iter().map(SqlRow::new).collect()))
                }
                None => Ok(Some(vec![SqlRow::new(vec![SqlValue::Int(1)])])),
            }
        }
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_and_drop_table() {
        let db = FakeDatabase::new();
        db.execute("CREATE TABLE users (id INT)", &[]).unwrap();
        assert!(db.has_table("users"));
        assert!(db.execute("CREATE TABLE users (id INT)", &[]).is_err());
        db.execute("CREATE TABLE IF NOT EXISTS users (id INT)", &[]).unwrap();
        db.execute("DROP TABLE users", &[]).unwrap();
        assert!(!db.has_table("users"));
        assert!(db.execute("DROP TABLE users", &[]).is_err());
        db.execute("DROP TABLE IF EXISTS users", &[]).unwrap();
    }

    #[test]
    fn test_index_requires_table() {
        let db = FakeDatabase::new();
        assert!(db.execute("CREATE INDEX idx_users_email ON users(email)", &[]).is_err());
        db.execute("CREATE TABLE users (email TEXT)", &[]).unwrap();
        db.execute("CREATE UNIQUE INDEX idx_users_email ON users (email)", &[]).unwrap();
        assert!(db.has_index("idx_users_email"));
        db.execute("DROP INDEX idx_users_email", &[]).unwrap();
        assert!(db.indexes().is_empty());
    }

    #[test]
    fn test_insert_select_delete() {
        let db = FakeDatabase::new();
        db.execute("CREATE TABLE ledger (id BIGSERIAL, name TEXT)", &[]).unwrap();
        db.execute("INSERT INTO ledger (name) VALUES ($1)", &["b".into()]).unwrap();
        db.execute("INSERT INTO ledger (name) VALUES ($1)", &["a".into()]).unwrap();
        assert!(db.execute("INSERT INTO ledger (name) VALUES ($1)", &["a".into()]).is_err());

        let rows = db.query_all("SELECT id, name FROM ledger ORDER BY id", &[]).unwrap();
        let names: Vec<String> = rows.iter().map(|r| r.get_string(1).unwrap()).collect();
        assert_eq!(names, vec!["b", "a"]);

        let removed = db.execute("DELETE FROM ledger WHERE name = $1", &["b".into()]).unwrap();
        assert_eq!(removed, 1);
        assert_eq!(db.rows("ledger").unwrap().len(), 1);
    }

    #[test]
    fn test_rollback_restores_schema_but_not_sequences() {
        let db = FakeDatabase::new();
        db.execute("CREATE TABLE ledger (id BIGSERIAL, name TEXT)", &[]).unwrap();
        db.execute("BEGIN", &[]).unwrap();
        db.execute("INSERT INTO ledger (name) VALUES ($1)", &["a".into()]).unwrap();
        db.execute("CREATE TABLE scratch (id INT)", &[]).unwrap();
        db.execute("ROLLBACK", &[]).unwrap();

        assert!(!db.has_table("scratch"));
        assert!(db.rows("ledger").unwrap().is_empty());

        db.execute("INSERT INTO ledger (name) VALUES ($1)", &["a".into()]).unwrap();
        let rows = db.rows("ledger").unwrap();
        assert_eq!(rows[0].get_i64(0).unwrap(), 2);
    }

    #[test]
    fn test_failed_statement_aborts_transaction() {
        let db = FakeDatabase::new();
        db.fail_on("boom");
        db.execute("BEGIN", &[]).unwrap();
        db.execute("CREATE TABLE kept (id INT)", &[]).unwrap();
        assert!(db.execute("SELECT boom", &[]).is_err());
        assert!(db.execute("CREATE TABLE other (id INT)", &[]).is_err());
        db.execute("COMMIT", &[]).unwrap();
        assert!(!db.has_table("kept"));
    }

    #[test]
    fn test_advisory_lock_simulation() {
        let db = FakeDatabase::new();
        let rows = db.query_all("SELECT pg_try_advisory_lock($1)", &[SqlValue::Int(1)]).unwrap();
        assert!(rows[0].get_bool(0).unwrap());
        assert!(db.lock_held());
        db.query_all("SELECT pg_advisory_unlock($1)", &[SqlValue::Int(1)]).unwrap();
        assert!(!db.lock_held());

        db.hold_lock_elsewhere(true);
        let rows = db.query_all("SELECT pg_try_advisory_lock($1)", &[SqlValue::Int(1)]).unwrap();
        assert!(!rows[0].get_bool(0).unwrap());
    }

    #[test]
    fn test_leading_comments_are_ignored() {
        let db = FakeDatabase::new();
        db.execute("CREATE TABLE tokens (expires_at TIMESTAMPTZ)", &[]).unwrap();
        db.execute(
            "-- cleanup deletes by expiry\nCREATE INDEX idx_tokens_expires_at ON tokens (expires_at)",
            &[],
        )
        .unwrap();
        assert!(db.has_index("idx_tokens_expires_at"));
    }

    #[test]
    fn test_create_table_tracks_columns() {
        let db = FakeDatabase::new();
        db.execute(
            "CREATE TABLE users (id BIGSERIAL PRIMARY KEY, email VARCHAR(255) NOT NULL, \
             score NUMERIC(10, 2), UNIQUE (email))",
            &[],
        )
        .unwrap();
        assert_eq!(db.columns("users").unwrap(), vec!["id", "email", "score"]);
    }

    #[test]
    fn test_alter_table_add_and_drop_column() {
        let db = FakeDatabase::new();
        db.execute("CREATE TABLE users (id INT)", &[]).unwrap();
        db.execute("ALTER TABLE users ADD COLUMN password_changed_at TIMESTAMPTZ", &[])
            .unwrap();
        assert!(db.execute("ALTER TABLE users ADD COLUMN password_changed_at TEXT", &[]).is_err());
        db.execute("ALTER TABLE users ADD COLUMN IF NOT EXISTS password_changed_at TEXT", &[])
            .unwrap();
        assert_eq!(db.columns("users").unwrap(), vec!["id", "password_changed_at"]);

        db.execute("ALTER TABLE users DROP COLUMN password_changed_at", &[]).unwrap();
        assert_eq!(db.columns("users").unwrap(), vec!["id"]);
        assert!(db.execute("ALTER TABLE users DROP COLUMN password_changed_at", &[]).is_err());
        db.execute("ALTER TABLE users DROP COLUMN IF EXISTS password_changed_at", &[])
            .unwrap();
    }

    #[test]
    fn test_functions_and_triggers() {
        let db = FakeDatabase::new();
        db.execute("CREATE TABLE users (id INT)", &[]).unwrap();
        assert!(db
            .execute(
                "CREATE TRIGGER users_touch BEFORE UPDATE ON users \
                 FOR EACH ROW EXECUTE FUNCTION touch()",
                &[],
            )
            .is_err());

        db.execute(
            "CREATE OR REPLACE FUNCTION touch() RETURNS trigger AS $$ BEGIN RETURN NEW; END; $$ \
             LANGUAGE plpgsql",
            &[],
        )
        .unwrap();
        assert!(db.has_function("touch"));
        db.execute(
            "CREATE TRIGGER users_touch BEFORE UPDATE ON users \
             FOR EACH ROW EXECUTE FUNCTION touch()",
            &[],
        )
        .unwrap();
        assert_eq!(db.triggers(), vec![("users".to_string(), "users_touch".to_string())]);

        // the trigger still depends on the function
        assert!(db.execute("DROP FUNCTION touch()", &[]).is_err());
        db.execute("DROP TRIGGER users_touch ON users", &[]).unwrap();
        db.execute("DROP FUNCTION touch()", &[]).unwrap();
        assert!(!db.has_function("touch"));
        assert!(db.execute("DROP FUNCTION touch()", &[]).is_err());
        db.execute("DROP FUNCTION IF EXISTS touch()", &[]).unwrap();
    }

    #[test]
    fn test_drop_table_drops_its_triggers() {
        let db = FakeDatabase::new();
        db.execute("CREATE TABLE leads (id INT)", &[]).unwrap();
        db.execute("CREATE FUNCTION touch() RETURNS trigger AS $$ SELECT 1 $$", &[]).unwrap();
        db.execute(
            "CREATE TRIGGER leads_touch BEFORE UPDATE ON leads EXECUTE FUNCTION touch()",
            &[],
        )
        .unwrap();
        db.execute("DROP TABLE leads", &[]).unwrap();
        assert!(db.triggers().is_empty());
        db.execute("DROP FUNCTION touch()", &[]).unwrap();
    }

    #[test]
    fn test_statements_are_recorded() {
        let db = FakeDatabase::new();
        db.execute("  SELECT 1  ", &[]).unwrap();
        assert_eq!(db.statements(), vec!["SELECT 1"]);
        db.clear_statements();
        assert_eq!(db.statement_count(), 0);
    }
}
