//! Services shared by Encore clients.

mod conflicts;

pub use conflicts::{ConflictService, RecomputeReport};
