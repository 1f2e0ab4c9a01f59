//! Writes aggregation results back onto event records

use std::collections::HashMap;

use serde::Serialize;

use crate::error::Result;
use crate::models::{ConflictSummary, Event, EventRef, OwnerId};

use super::aggregate::ConflictReport;

/// Persistence side of the summary writer
pub trait ConflictSummaryStore {
    /// Overwrite the derived conflict fields of one event
    fn persist_conflict_summary(
        &self,
        owner: &OwnerId,
        event: EventRef,
        summary: &ConflictSummary,
    ) -> Result<()>;
}

/// Outcome of one write-back pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteReport {
    pub updated: usize,
    pub unchanged: usize,
    pub failed: usize,
    pub failed_events: Vec<EventRef>,
}

impl WriteReport {
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.failed == 0
    }
}

/// Persist every summary in `report` that differs from the stored event.
///
/// `persisted` is the event set the report was computed from. A failed
/// write is logged and counted; the remaining events are still written.
pub fn apply<S: ConflictSummaryStore + ?Sized>(
    store: &S,
    owner: &OwnerId,
    persisted: &[Event],
    report: &ConflictReport,
) -> WriteReport {
    let current = persisted
        .iter()
        .filter(|event| event.owner_id == *owner)
        .map(|event| (event.event_ref(), event))
        .collect::<HashMap<_, _>>();

    let mut outcome = WriteReport::default();
    for (event_ref, summary) in &report.summaries {
        if current
            .get(event_ref)
            .is_some_and(|event| event.summary_matches(summary))
        {
            outcome.unchanged += 1;
            continue;
        }

        match store.persist_conflict_summary(owner, *event_ref, summary) {
            Ok(()) => outcome.updated += 1,
            Err(error) => {
                tracing::warn!(
                    owner = %owner,
                    event = %event_ref,
                    "Failed to persist conflict summary: {error}"
                );
                outcome.failed += 1;
                outcome.failed_events.push(*event_ref);
            }
        }
    }

    outcome
}
