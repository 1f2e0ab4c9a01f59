//! Booking conflict engine
//!
//! Normalizer → pairwise detector → aggregator → summary writer. Everything
//! up to the writer is pure; persistence is behind [`ConflictSummaryStore`].

mod aggregate;
mod detect;
pub mod normalize;
mod writer;

pub use aggregate::{aggregate, ConflictReport, GroupStatus};
pub use detect::{detect, estimate_travel_minutes, Slot};
pub use normalize::{normalize, ExclusionReason, Normalized, NormalizedInterval};
pub use writer::{apply, ConflictSummaryStore, WriteReport};
