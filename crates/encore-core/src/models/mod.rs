//! Data models for Encore

mod conflict;
mod event;
mod resolution;

pub use conflict::{ConflictEntry, ConflictGroup, ConflictSummary, Severity};
pub use event::{Event, EventDate, EventDraft, EventKind, EventRef, OwnerId};
pub use resolution::{Resolution, ResolutionId, ResolutionType};
