//! Application migrations
//!
//! Each feature module contributes its own list; [`registry`] concatenates
//! them in dependency order. Ids are creation timestamps (`YYYYMMDDHHMMSS`)
//! and must keep increasing across modules, so new migrations are always
//! appended to the last module in the chain or to a new module added at the
//! end.

use driftguard::migration::{Registry, RegistryError};

pub mod auth_tokens;
pub mod core_schema;
pub mod password_reset;

/// The full, validated application registry
///
/// # Errors
///
/// Returns `RegistryError` if the composed list is invalid, which is a
/// programming error caught by this crate's tests.
pub fn registry() -> Result<Registry, RegistryError> {
    Registry::builder()
        .extend(core_schema::migrations())
        .extend(auth_tokens::migrations())
        .extend(password_reset::migrations())
        .build()
}
