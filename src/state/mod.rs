//! Healthwatch State Module
//!
//! SQLite-backed durable store shared by the registry, the sweep, and
//! the outbox. The store is the only coordination point between the
//! HTTP surface, the sweep daemon, and external pollers, so every
//! mutation here is transactional.

mod database;
mod schema;

pub use database::{Database, ResolvedAlert};
pub use schema::{CREATE_TABLES, SCHEMA_VERSION};
