//! SQLite persistence for Greenlight: pooled connections, embedded
//! migrations, repositories and deterministic fixtures.

pub mod connection;
pub mod fixtures;
pub mod migrations;
pub mod repositories;

pub use connection::{connect, connect_with_settings, DbPool};
