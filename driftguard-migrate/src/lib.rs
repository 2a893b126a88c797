//! Driftguard Migration CLI library
//!
//! The binary (main.rs) is a thin shell over this crate: the application's
//! migration registry, settings resolution and the reset confirmation gate
//! live here so they can be tested without a database.

pub mod confirm;
pub mod migrations;
pub mod settings;

pub use migrations::registry;
