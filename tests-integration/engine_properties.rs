//! Engine-level guarantees, checked against the in-memory executor
//!
//! - idempotence of repeated runs
//! - ledger order equals registry order
//! - atomicity of a failing migration
//! - halt at the first failure
//! - rollback of exactly the last migration
//! - drift detection
//! - production guard on reset, with zero database calls
//! - reset is equivalent to a fresh run

use driftguard::migration::{
    Ledger, Migration, MigrationError, MigrationManager, Registry,
};
use driftguard::test_helpers::FakeDatabase;
use driftguard::{DbError, Environment, SqlExecutor, SqlRow, SqlValue};
use std::cell::Cell;

fn migration(id: i64, table: &str) -> Migration {
    Migration::new(
        id,
        format!("create_{table}"),
        format!(
            "CREATE TABLE {table} (id BIGSERIAL PRIMARY KEY, label TEXT);
             CREATE INDEX idx_{table}_label ON {table} (label);"
        ),
        format!("DROP INDEX idx_{table}_label; DROP TABLE {table};"),
    )
}

fn registry_of(tables: &[&str]) -> Registry {
    Registry::new(
        tables
            .iter()
            .enumerate()
            .map(|(i, t)| migration(i as i64 + 1, t))
            .collect(),
    )
    .unwrap()
}

fn dev(db: &FakeDatabase) -> MigrationManager<FakeDatabase> {
    MigrationManager::new(db.clone(), Environment::Development)
}

fn ledger(db: &FakeDatabase) -> Vec<String> {
    Ledger::default().applied_names(db).unwrap()
}

/// Counts every call and forwards to an inner executor
struct CountingExecutor {
    inner: FakeDatabase,
    calls: Cell<usize>,
}

impl SqlExecutor for CountingExecutor {
    fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<u64, DbError> {
        self.calls.set(self.calls.get() + 1);
        self.inner.execute(sql, params)
    }

    fn query_all(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<SqlRow>, DbError> {
        self.calls.set(self.calls.get() + 1);
        self.inner.query_all(sql, params)
    }
}

#[test]
fn idempotent_second_run_applies_nothing() {
    let db = FakeDatabase::new();
    let registry = registry_of(&["a", "b", "c"]);

    assert_eq!(dev(&db).run_migrations(&registry).unwrap().applied.len(), 3);
    let schema_after_first = db.schema_snapshot();

    let second = dev(&db).run_migrations(&registry).unwrap();
    assert!(second.is_noop());
    assert_eq!(second.skipped, 3);
    assert_eq!(db.schema_snapshot(), schema_after_first);
}

#[test]
fn ledger_order_matches_registry_order() {
    for size in 1..=6 {
        let tables: Vec<String> = (0..size).map(|i| format!("t{}", size - i)).collect();
        let refs: Vec<&str> = tables.iter().map(String::as_str).collect();
        let registry = registry_of(&refs);

        let db = FakeDatabase::new();
        dev(&db).run_migrations(&registry).unwrap();
        assert_eq!(ledger(&db), registry.names());
    }
}

#[test]
fn failing_statement_leaves_no_trace_of_its_migration() {
    let db = FakeDatabase::new();
    db.fail_on("CREATE INDEX idx_b_label");

    let err = dev(&db).run_migrations(&registry_of(&["a", "b"])).unwrap_err();
    assert!(matches!(err, MigrationError::Apply { .. }));

    // b's CREATE TABLE ran before its index failed; the transaction undid it
    assert!(!db.has_table("b"));
    assert!(!db.has_index("idx_b_label"));
    assert_eq!(ledger(&db), vec!["create_a"]);
}

#[test]
fn run_halts_at_first_failure_and_names_it() {
    let db = FakeDatabase::new();
    db.fail_on("CREATE TABLE b");

    let err = dev(&db).run_migrations(&registry_of(&["a", "b", "c"])).unwrap_err();
    assert_eq!(err.migration_name(), Some("create_b"));
    assert!(matches!(err, MigrationError::Apply { preceding: 1, .. }));
    assert!(err.to_string().contains("create_b"));

    assert_eq!(ledger(&db), vec!["create_a"]);
    assert!(db.has_table("a"));
    assert!(!db.has_table("c"));
    assert!(!db.statements().iter().any(|s| s.contains("TABLE c")));
}

#[test]
fn rollback_removes_only_the_last_migration() {
    let db = FakeDatabase::new();
    let registry = registry_of(&["a", "b"]);
    dev(&db).run_migrations(&registry).unwrap();

    assert_eq!(
        dev(&db).rollback_last_migration(&registry).unwrap().as_deref(),
        Some("create_b")
    );
    assert_eq!(ledger(&db), vec!["create_a"]);
    assert!(db.has_table("a"));
    assert!(!db.has_table("b"));
}

#[test]
fn rollback_refuses_unknown_ledger_entries() {
    let db = FakeDatabase::new();
    dev(&db).run_migrations(&registry_of(&["a", "b"])).unwrap();

    let err = dev(&db)
        .rollback_last_migration(&registry_of(&["a"]))
        .unwrap_err();
    assert!(matches!(err, MigrationError::UnknownMigration { ref name } if name == "create_b"));
    // nothing was rolled back, not even create_a
    assert_eq!(ledger(&db), vec!["create_a", "create_b"]);
}

#[test]
fn reset_in_production_touches_nothing() {
    let executor = CountingExecutor {
        inner: FakeDatabase::new(),
        calls: Cell::new(0),
    };
    let manager = MigrationManager::new(&executor, Environment::Production);

    for _ in 0..3 {
        let err = manager.reset_database(&registry_of(&["a"])).unwrap_err();
        assert!(matches!(err, MigrationError::ForbiddenOperation { .. }));
    }
    assert_eq!(executor.calls.get(), 0);
    assert_eq!(executor.inner.statement_count(), 0);
}

#[test]
fn reset_equals_fresh_run() {
    let registry = registry_of(&["a", "b", "c"]);

    let reset = FakeDatabase::new();
    dev(&reset).run_migrations(&registry).unwrap();
    let report = dev(&reset).reset_database(&registry).unwrap();
    assert_eq!(report.rolled_back, vec!["create_c", "create_b", "create_a"]);
    assert_eq!(report.reapplied, registry.names());

    let fresh = FakeDatabase::new();
    dev(&fresh).run_migrations(&registry).unwrap();

    assert_eq!(reset.schema_snapshot(), fresh.schema_snapshot());
    let contents = |db: &FakeDatabase| -> Vec<(String, String)> {
        Ledger::default()
            .list_applied(db)
            .unwrap()
            .into_iter()
            .map(|e| (e.name, e.checksum))
            .collect()
    };
    assert_eq!(contents(&reset), contents(&fresh));
}

#[test]
fn application_registry_round_trips() {
    let registry = driftguard_migrate::registry().unwrap();
    let db = FakeDatabase::new();

    dev(&db).run_migrations(&registry).unwrap();
    let migrated = db.schema_snapshot();
    let report = dev(&db).reset_database(&registry).unwrap();

    assert_eq!(report.rolled_back.len(), registry.len());
    assert_eq!(db.schema_snapshot(), migrated);
    assert!(migrated.functions.contains("touch_updated_at"));
    assert_eq!(migrated.triggers.len(), 2);
    assert!(dev(&db).validate(&registry).unwrap().is_up_to_date());
}
