pub mod common;
pub mod completions;
pub mod conflicts;
pub mod event;
pub mod recompute;
pub mod resolve;
