//! Tests for the composed application registry

use driftguard::migration::{MigrationManager, MigrationRunner};
use driftguard::test_helpers::FakeDatabase;
use driftguard::Environment;
use driftguard_migrate::migrations::{auth_tokens, core_schema, password_reset};
use driftguard_migrate::registry;

#[test]
fn test_registry_is_valid() {
    let registry = registry().expect("application registry must validate");
    assert_eq!(
        registry.len(),
        core_schema::migrations().len()
            + auth_tokens::migrations().len()
            + password_reset::migrations().len()
    );
}

#[test]
fn test_modules_are_concatenated_in_dependency_order() {
    let registry = registry().unwrap();
    let names = registry.names();

    let position = |name: &str| names.iter().position(|n| *n == name).unwrap();
    assert_eq!(position("create_users"), 0);
    assert!(position("create_users") < position("create_leads"));
    assert!(position("create_users") < position("create_auth_tokens"));
    assert!(position("create_auth_tokens") < position("create_password_resets"));
}

#[test]
fn test_trigger_function_body_is_one_statement() {
    let registry = registry().unwrap();
    let triggers = registry.get("add_updated_at_triggers").unwrap();
    let statements = triggers.up_statements();
    assert_eq!(statements.len(), 3);
    assert!(statements[0].contains("RETURN NEW;"));
}

#[test]
fn test_full_cycle_against_fake_database() {
    let db = FakeDatabase::new();
    let registry = registry().unwrap();
    let manager = MigrationManager::new(db.clone(), Environment::Development);

    let report = manager.run_migrations(&registry).unwrap();
    assert_eq!(report.applied.len(), registry.len());
    for table in ["users", "leads", "auth_tokens", "password_resets"] {
        assert!(db.has_table(table), "{table} should exist");
    }
    assert!(db.has_index("idx_auth_tokens_expires_at"));
    assert!(db.has_function("touch_updated_at"));
    assert_eq!(db.triggers().len(), 2);
    assert!(db
        .columns("users")
        .unwrap()
        .contains(&"password_changed_at".to_string()));
    let migrated = db.schema_snapshot();

    while manager.rollback_last_migration(&registry).unwrap().is_some() {}
    assert_eq!(db.tables(), vec!["driftguard_migrations"]);
    assert!(db.indexes().is_empty());
    assert!(!db.has_function("touch_updated_at"));
    assert!(db.triggers().is_empty());

    let report = manager.run_migrations(&registry).unwrap();
    assert_eq!(report.applied.len(), registry.len());
    assert_eq!(db.schema_snapshot(), migrated);
    manager.validate(&registry).unwrap();
}

#[test]
fn test_each_down_script_restores_the_previous_schema() {
    let db = FakeDatabase::new();
    let registry = registry().unwrap();
    let manager = MigrationManager::new(db.clone(), Environment::Development);

    manager.ledger().ensure_exists(&db).unwrap();
    let runner = MigrationRunner::new(&db, manager.ledger());

    // step forward one migration at a time, then step back and compare
    let mut snapshots = vec![];
    for migration in registry.iter() {
        snapshots.push(db.schema_snapshot());
        runner.apply(migration).unwrap();
    }

    for migration in registry.iter().rev() {
        let rolled_back = manager.rollback_last_migration(&registry).unwrap();
        assert_eq!(rolled_back.as_deref(), Some(migration.name()));
        let before = snapshots.pop().unwrap();
        assert_eq!(db.schema_snapshot(), before, "down of {} left drift", migration.name());
    }
}
