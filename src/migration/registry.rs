//! Ordered, validated list of every migration the application knows about
//!
//! A [`Registry`] is built once at startup, usually by concatenating the
//! migrations contributed by each feature module through a
//! [`RegistryBuilder`], and is read-only afterwards. List position is the
//! application order; the registry validates that ids increase along it but
//! never re-sorts anything.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

use super::error::RegistryError;
use super::migration::Migration;

static NAME_PATTERN: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::unwrap_used)] // literal pattern
    Regex::new(r"^[a-z0-9_]+$").unwrap()
});

/// Validated, immutable migration list
#[derive(Debug, Clone, Default)]
pub struct Registry {
    migrations: Vec<Migration>,
    by_name: HashMap<String, usize>,
}

impl Registry {
    /// Validate `migrations` and freeze them in the given order
    ///
    /// # Errors
    ///
    /// Returns the first `RegistryError` found, scanning in list order.
    pub fn new(migrations: Vec<Migration>) -> Result<Self, RegistryError> {
        let mut by_name = HashMap::with_capacity(migrations.len());
        let mut by_id: HashMap<i64, &str> = HashMap::with_capacity(migrations.len());
        let mut previous: Option<i64> = None;

        for (index, migration) in migrations.iter().enumerate() {
            let name = migration.name();
            if !NAME_PATTERN.is_match(name) {
                return Err(RegistryError::InvalidName(name.to_string()));
            }
            if by_name.insert(name.to_string(), index).is_some() {
                return Err(RegistryError::DuplicateName(name.to_string()));
            }
            if let Some(first) = by_id.insert(migration.id(), name) {
                return Err(RegistryError::DuplicateId {
                    id: migration.id(),
                    first: first.to_string(),
                    second: name.to_string(),
                });
            }
            if let Some(prev) = previous {
                if migration.id() <= prev {
                    return Err(RegistryError::OutOfOrder {
                        name: name.to_string(),
                        id: migration.id(),
                        previous: prev,
                    });
                }
            }
            previous = Some(migration.id());

            if migration.up_statements().is_empty() {
                return Err(RegistryError::BlankScript {
                    name: name.to_string(),
                    direction: "up",
                });
            }
            if migration.down_statements().is_empty() {
                return Err(RegistryError::BlankScript {
                    name: name.to_string(),
                    direction: "down",
                });
            }
        }

        Ok(Self {
            migrations,
            by_name,
        })
    }

    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    pub fn get(&self, name: &str) -> Option<&Migration> {
        self.by_name.get(name).map(|&i| &self.migrations[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Migrations in application order
    pub fn iter(&self) -> std::slice::Iter<'_, Migration> {
        self.migrations.iter()
    }

    pub fn migrations(&self) -> &[Migration] {
        &self.migrations
    }

    pub fn names(&self) -> Vec<&str> {
        self.migrations.iter().map(Migration::name).collect()
    }

    pub fn len(&self) -> usize {
        self.migrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.migrations.is_empty()
    }
}

impl<'a> IntoIterator for &'a Registry {
    type Item = &'a Migration;
    type IntoIter = std::slice::Iter<'a, Migration>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Concatenates per-feature migration lists before validation
///
/// ```rust
/// use driftguard::migration::{Migration, Registry};
///
/// let core = vec![Migration::new(
///     1,
///     "create_users",
///     "CREATE TABLE users (id INT);",
///     "DROP TABLE users;",
/// )];
/// let auth = vec![Migration::new(
///     2,
///     "create_auth_tokens",
///     "CREATE TABLE auth_tokens (id INT);",
///     "DROP TABLE auth_tokens;",
/// )];
///
/// let registry = Registry::builder().extend(core).extend(auth).build().unwrap();
/// assert_eq!(registry.names(), vec!["create_users", "create_auth_tokens"]);
/// ```
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    migrations: Vec<Migration>,
}

impl RegistryBuilder {
    #[must_use]
    pub fn add(mut self, migration: Migration) -> Self {
        self.migrations.push(migration);
        self
    }

    /// Append a feature module's migrations after everything added so far
    #[must_use]
    pub fn extend(mut self, migrations: impl IntoIterator<Item = Migration>) -> Self {
        self.migrations.extend(migrations);
        self
    }

    /// # Errors
    ///
    /// See [`Registry::new`].
    pub fn build(self) -> Result<Registry, RegistryError> {
        Registry::new(self.migrations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn m(id: i64, name: &str) -> Migration {
        Migration::new(
            id,
            name,
            format!("CREATE TABLE {name} (id INT);"),
            format!("DROP TABLE {name};"),
        )
    }

    #[test]
    fn test_preserves_list_order() {
        let registry = Registry::new(vec![m(1, "c"), m(5, "a"), m(9, "b")]).unwrap();
        assert_eq!(registry.names(), vec!["c", "a", "b"]);
        assert_eq!(registry.get("a").map(Migration::id), Some(5));
        assert!(registry.contains("b"));
        assert!(!registry.contains("z"));
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_rejects_duplicate_name() {
        let err = Registry::new(vec![m(1, "users"), m(2, "users")]).unwrap_err();
        assert_eq!(err, RegistryError::DuplicateName("users".into()));
    }

    #[test]
    fn test_rejects_duplicate_id() {
        let err = Registry::new(vec![m(1, "users"), m(1, "leads")]).unwrap_err();
        assert_eq!(
            err,
            RegistryError::DuplicateId {
                id: 1,
                first: "users".into(),
                second: "leads".into()
            }
        );
    }

    #[test]
    fn test_rejects_out_of_order_ids() {
        let err = Registry::new(vec![m(2, "users"), m(1, "leads")]).unwrap_err();
        assert!(matches!(
            err,
            RegistryError::OutOfOrder { ref name, id: 1, previous: 2 } if name == "leads"
        ));
    }

    #[test]
    fn test_rejects_invalid_names() {
        for bad in ["", "Users", "create-users", "drop table", "naïve"] {
            let bad_migration = Migration::new(2, bad, "SELECT 1;", "SELECT 1;");
            let err = Registry::new(vec![m(1, "ok"), bad_migration]).unwrap_err();
            assert_eq!(err, RegistryError::InvalidName(bad.into()), "{bad:?}");
        }
    }

    #[test]
    fn test_rejects_blank_scripts() {
        let err = Registry::new(vec![Migration::new(1, "noop", "  -- nothing\n", "SELECT 1;")])
            .unwrap_err();
        assert!(matches!(err, RegistryError::BlankScript { direction: "up", .. }));

        let err = Registry::new(vec![Migration::new(1, "noop", "SELECT 1;", ";")]).unwrap_err();
        assert!(matches!(err, RegistryError::BlankScript { direction: "down", .. }));
    }

    #[test]
    fn test_builder_concatenates_modules() {
        let registry = RegistryBuilder::default()
            .extend(vec![m(1, "users"), m(2, "leads")])
            .add(m(3, "auth_tokens"))
            .extend(vec![m(4, "password_resets")])
            .build()
            .unwrap();
        assert_eq!(
            registry.names(),
            vec!["users", "leads", "auth_tokens", "password_resets"]
        );
    }

    #[test]
    fn test_empty_registry_is_valid() {
        let registry = Registry::builder().build().unwrap();
        assert!(registry.is_empty());
        assert_eq!((&registry).into_iter().count(), 0);
    }
}
