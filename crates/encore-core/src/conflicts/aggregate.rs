//! Conflict aggregation across one owner's calendar
//!
//! Builds a collision graph per day, derives every event's summary from its
//! neighbors, and identifies connected components as [`ConflictGroup`]s to
//! check against the resolution ledger snapshot.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use serde::Serialize;

use crate::config::EngineConfig;
use crate::models::{
    ConflictEntry, ConflictGroup, ConflictSummary, Event, EventRef, OwnerId, Resolution,
    ResolutionId, Severity,
};

use super::detect::{detect, Slot};
use super::normalize::{normalize, Normalized};

/// A connected collision cluster and whether an active resolution covers it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupStatus {
    pub group: ConflictGroup,
    pub group_key: String,
    pub resolved: bool,
    pub resolution_id: Option<ResolutionId>,
}

/// Result of one aggregation run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictReport {
    pub owner_id: OwnerId,
    pub summaries: BTreeMap<EventRef, ConflictSummary>,
    /// Ordered by day, then by first member
    pub groups: Vec<GroupStatus>,
}

impl ConflictReport {
    #[must_use]
    pub fn summary(&self, event: EventRef) -> Option<&ConflictSummary> {
        self.summaries.get(&event)
    }

    /// Groups no active resolution covers
    pub fn unresolved_groups(&self) -> impl Iterator<Item = &GroupStatus> {
        self.groups.iter().filter(|status| !status.resolved)
    }

    /// Events flagged with at least one conflict
    #[must_use]
    pub fn conflicted_count(&self) -> usize {
        self.summaries
            .values()
            .filter(|summary| summary.has_conflicts)
            .count()
    }
}

/// Compute conflict summaries for every event of `owner`.
///
/// Pure and deterministic: the same events and resolutions always produce
/// the same report. Events belonging to another owner are ignored. Excluded
/// events (no usable date, withdrawn/declined enquiries) still get an empty
/// summary so stale flags are cleared when written back.
#[must_use]
pub fn aggregate(
    owner: &OwnerId,
    events: &[Event],
    resolutions: &[Resolution],
    config: &EngineConfig,
    now_ms: i64,
) -> ConflictReport {
    let mut summaries = BTreeMap::new();
    let mut by_day: BTreeMap<NaiveDate, Vec<Slot<'_>>> = BTreeMap::new();

    for event in events {
        let event_ref = event.event_ref();
        if event.owner_id != *owner {
            tracing::warn!(owner = %owner, event = %event_ref, "Ignoring event of another owner");
            continue;
        }
        if summaries.contains_key(&event_ref) {
            tracing::warn!(owner = %owner, event = %event_ref, "Ignoring duplicate event record");
            continue;
        }
        summaries.insert(event_ref, ConflictSummary::default());

        if event.is_status_excluded(&config.excluded_enquiry_statuses) {
            tracing::debug!(event = %event_ref, status = %event.status, "Excluding event by status");
            continue;
        }
        if let Normalized::Interval(interval) = normalize(event) {
            by_day
                .entry(interval.day)
                .or_default()
                .push(Slot::new(event, interval));
        }
    }

    let active = resolutions
        .iter()
        .filter(|resolution| resolution.owner_id == *owner && resolution.is_active(now_ms))
        .map(|resolution| (resolution.group.key(), resolution))
        .collect::<HashMap<_, _>>();

    let mut groups = Vec::new();
    for (day, mut slots) in by_day {
        slots.sort_by_key(|slot| slot.event.event_ref());
        let neighbors = collision_graph(&slots, config);

        for (index, slot) in slots.iter().enumerate() {
            if neighbors[index].is_empty() {
                continue;
            }
            let details = neighbors[index]
                .iter()
                .map(|&(other, severity)| conflict_entry(slots[other].event, severity))
                .collect::<Vec<_>>();
            summaries.insert(
                slot.event.event_ref(),
                ConflictSummary {
                    has_conflicts: true,
                    conflict_count: u32::try_from(details.len()).unwrap_or(u32::MAX),
                    conflict_details: details,
                    resolved: false,
                },
            );
        }

        for component in connected_components(&neighbors) {
            let group = ConflictGroup::new(
                component.iter().map(|&index| slots[index].event.event_ref()),
                day,
            );
            let group_key = group.key();
            let resolution = active.get(&group_key);
            if resolution.is_some() {
                for member in group.members() {
                    if let Some(summary) = summaries.get_mut(member) {
                        summary.resolved = true;
                    }
                }
            }
            groups.push(GroupStatus {
                group,
                group_key,
                resolved: resolution.is_some(),
                resolution_id: resolution.map(|resolution| resolution.id),
            });
        }
    }

    ConflictReport {
        owner_id: owner.clone(),
        summaries,
        groups,
    }
}

/// Adjacency lists over `slots`; each list is in ascending index order
fn collision_graph(slots: &[Slot<'_>], config: &EngineConfig) -> Vec<Vec<(usize, Severity)>> {
    let mut neighbors = vec![Vec::new(); slots.len()];
    for i in 0..slots.len() {
        for j in (i + 1)..slots.len() {
            if let Some(severity) = detect(&slots[i], &slots[j], config) {
                neighbors[i].push((j, severity));
                neighbors[j].push((i, severity));
            }
        }
    }
    for list in &mut neighbors {
        list.sort_unstable_by_key(|&(index, _)| index);
    }
    neighbors
}

/// Components with at least one edge, each in ascending index order
fn connected_components(neighbors: &[Vec<(usize, Severity)>]) -> Vec<Vec<usize>> {
    let mut seen = vec![false; neighbors.len()];
    let mut components = Vec::new();

    for start in 0..neighbors.len() {
        if seen[start] || neighbors[start].is_empty() {
            continue;
        }
        seen[start] = true;
        let mut stack = vec![start];
        let mut component = Vec::new();
        while let Some(node) = stack.pop() {
            component.push(node);
            for &(next, _) in &neighbors[node] {
                if !seen[next] {
                    seen[next] = true;
                    stack.push(next);
                }
            }
        }
        component.sort_unstable();
        components.push(component);
    }

    components
}

fn conflict_entry(counterpart: &Event, severity: Severity) -> ConflictEntry {
    ConflictEntry {
        kind: counterpart.kind,
        counterpart_id: counterpart.id,
        counterpart_name: counterpart.client_name.clone(),
        counterpart_time: display_time(counterpart),
        counterpart_status: counterpart.status.clone(),
        counterpart_venue: counterpart
            .venue_name
            .clone()
            .or_else(|| counterpart.venue_address.clone()),
        severity,
    }
}

/// `start - end`, `start`, or `None`, using the times as entered
fn display_time(event: &Event) -> Option<String> {
    let clean = |value: Option<&String>| {
        value
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
    };
    match (clean(event.start_time.as_ref()), clean(event.end_time.as_ref())) {
        (Some(start), Some(end)) => Some(format!("{start} - {end}")),
        (Some(start), None) => Some(start),
        (None, _) => None,
    }
}
