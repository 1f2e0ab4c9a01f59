//! encore-core - Core library for Encore
//!
//! This crate contains the event models, the booking conflict engine, the
//! resolution ledger, and the `SQLite` persistence adapter shared by every
//! Encore interface.

pub mod config;
pub mod conflicts;
pub mod db;
pub mod error;
pub mod export;
pub mod models;
pub mod services;
mod util;

pub use config::EngineConfig;
pub use error::{Error, Result};
pub use models::{
    ConflictEntry, ConflictGroup, ConflictSummary, Event, EventDate, EventDraft, EventKind,
    EventRef, OwnerId, Resolution, ResolutionId, ResolutionType, Severity,
};
