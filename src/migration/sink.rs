//! Error reporting hook
//!
//! Every error that leaves the [`MigrationManager`](super::MigrationManager)
//! is handed to an [`ErrorSink`] before being returned, so surrounding
//! observability tooling sees failures even when the caller swallows them.

use serde::Serialize;
use std::fmt;

use super::error::MigrationError;

/// Manager operation during which an error occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Migrate,
    Rollback,
    Reset,
    Status,
    Validate,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Migrate => "migrate",
            Operation::Rollback => "rollback",
            Operation::Reset => "reset",
            Operation::Status => "status",
            Operation::Validate => "validate",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorContext {
    pub operation: Operation,
    pub migration_name: Option<String>,
}

impl ErrorContext {
    pub fn new(operation: Operation, error: &MigrationError) -> Self {
        Self {
            operation,
            migration_name: error.migration_name().map(str::to_string),
        }
    }
}

/// Receives every failure surfaced by the manager
pub trait ErrorSink: Send + Sync {
    fn report(&self, error: &MigrationError, context: &ErrorContext);
}

/// Default sink: `log::error!`
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl ErrorSink for LogSink {
    fn report(&self, error: &MigrationError, context: &ErrorContext) {
        match &context.migration_name {
            Some(name) => log::error!(
                "{} failed at migration '{}': {}",
                context.operation,
                name,
                error
            ),
            None => log::error!("{} failed: {}", context.operation, error),
        }
    }
}

impl<F> ErrorSink for F
where
    F: Fn(&MigrationError, &ErrorContext) + Send + Sync,
{
    fn report(&self, error: &MigrationError, context: &ErrorContext) {
        self(error, context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::DbError;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_context_carries_migration_name() {
        let err = MigrationError::Rollback {
            name: "create_leads".into(),
            source: DbError::Query("boom".into()),
        };
        let ctx = ErrorContext::new(Operation::Rollback, &err);
        assert_eq!(ctx.migration_name.as_deref(), Some("create_leads"));
        assert_eq!(ctx.operation.to_string(), "rollback");
    }

    #[test]
    fn test_closures_are_sinks() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let captured = Arc::clone(&seen);
        let sink = move |_: &MigrationError, ctx: &ErrorContext| {
            captured.lock().unwrap().push(ctx.operation);
        };

        let err = MigrationError::LockContention("held".into());
        sink.report(&err, &ErrorContext::new(Operation::Migrate, &err));
        LogSink.report(&err, &ErrorContext::new(Operation::Migrate, &err));

        assert_eq!(*seen.lock().unwrap(), vec![Operation::Migrate]);
    }
}
