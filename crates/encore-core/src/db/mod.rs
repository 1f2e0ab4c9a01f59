//! Database layer for Encore

mod connection;
mod event_repository;
mod migrations;
mod resolution_repository;

pub use connection::Database;
pub use event_repository::{EventRepository, SqliteEventRepository};
pub use resolution_repository::{ResolutionLedger, SqliteResolutionLedger};
