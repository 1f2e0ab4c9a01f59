//! Conflict report rendering shared by Encore clients.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::conflicts::ConflictReport;
use crate::models::{ConflictEntry, Event, EventRef};

/// Report output format shared by all clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportFormat {
    Json,
    Markdown,
}

impl ReportFormat {
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Markdown => "md",
        }
    }
}

/// One conflicted event as it appears in an exported report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportEvent {
    pub event: EventRef,
    pub client_name: Option<String>,
    pub date: Option<String>,
    pub status: String,
    pub resolved: bool,
    pub conflicts: Vec<ConflictEntry>,
}

/// One conflict group as it appears in an exported report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportGroup {
    pub key: String,
    pub conflict_date: String,
    pub members: Vec<EventRef>,
    pub resolved: bool,
}

/// Serializable conflict report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportExport {
    pub owner_id: String,
    pub groups: Vec<ReportGroup>,
    pub events: Vec<ReportEvent>,
}

/// Pair a report with the events it was computed from, keeping only
/// conflicted events in stable reference order.
#[must_use]
pub fn report_to_export(report: &ConflictReport, events: &[Event]) -> ReportExport {
    let mut conflicted = events
        .iter()
        .filter_map(|event| {
            let summary = report.summary(event.event_ref())?;
            summary.has_conflicts.then(|| ReportEvent {
                event: event.event_ref(),
                client_name: event.client_name.clone(),
                date: event.date.as_ref().map(crate::models::EventDate::to_storage),
                status: event.status.clone(),
                resolved: summary.resolved,
                conflicts: summary.conflict_details.clone(),
            })
        })
        .collect::<Vec<_>>();
    conflicted.sort_by_key(|item| item.event);

    ReportExport {
        owner_id: report.owner_id.to_string(),
        groups: report
            .groups
            .iter()
            .map(|status| ReportGroup {
                key: status.group_key.clone(),
                conflict_date: status.group.conflict_date.to_string(),
                members: status.group.members().to_vec(),
                resolved: status.resolved,
            })
            .collect(),
        events: conflicted,
    }
}

/// Render a report as pretty-printed JSON.
pub fn render_json_report(report: &ConflictReport, events: &[Event]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&report_to_export(report, events))
}

/// Render a report as Markdown, one section per conflict date.
#[must_use]
pub fn render_markdown_report(report: &ConflictReport, events: &[Event]) -> String {
    let export = report_to_export(report, events);
    let mut output = String::new();

    let _ = writeln!(output, "# Booking conflicts for {}", export.owner_id);
    if export.groups.is_empty() {
        let _ = writeln!(output);
        let _ = writeln!(output, "No conflicts.");
        return output;
    }

    for group in &export.groups {
        let state = if group.resolved { "resolved" } else { "open" };
        let _ = writeln!(output);
        let _ = writeln!(output, "## {} ({state})", group.conflict_date);
        let _ = writeln!(output);
        let _ = writeln!(output, "Group: `{}`", group.key);
        let _ = writeln!(output);
        for item in export
            .events
            .iter()
            .filter(|item| group.members.contains(&item.event))
        {
            let client = item.client_name.as_deref().unwrap_or("(no client)");
            let _ = writeln!(output, "- {} {client} [{}]", item.event, item.status);
            for entry in &item.conflicts {
                let time = entry.counterpart_time.as_deref().unwrap_or("time unknown");
                let _ = writeln!(
                    output,
                    "  - {}: {} with {} ({time})",
                    entry.severity,
                    entry.counterpart(),
                    entry.counterpart_name.as_deref().unwrap_or("(no client)"),
                );
            }
        }
    }

    output
}

/// Render a report based on the selected format.
pub fn render_report(
    report: &ConflictReport,
    events: &[Event],
    format: ReportFormat,
) -> serde_json::Result<String> {
    match format {
        ReportFormat::Json => render_json_report(report, events),
        ReportFormat::Markdown => Ok(render_markdown_report(report, events)),
    }
}

/// Build a deterministic default file name for report exports.
#[must_use]
pub fn suggested_report_file_name(format: ReportFormat, timestamp_ms: i64) -> String {
    format!("encore-conflicts-{timestamp_ms}.{}", format.extension())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conflicts::aggregate;
    use crate::models::{EventDraft, EventKind, OwnerId};
    use crate::EngineConfig;
    use pretty_assertions::assert_eq;

    fn fixture() -> (ConflictReport, Vec<Event>) {
        let owner = OwnerId::new("performer-1").unwrap();
        let events = vec![
            Event::from_draft(
                owner.clone(),
                1,
                EventDraft::booking("2025-08-02")
                    .times("14:00", "16:00")
                    .client("Ada"),
            ),
            Event::from_draft(
                owner.clone(),
                2,
                EventDraft::booking("2025-08-02")
                    .times("15:00", "17:00")
                    .client("Grace"),
            ),
            Event::from_draft(owner.clone(), 3, EventDraft::booking("2025-08-09")),
        ];
        let report = aggregate(&owner, &events, &[], &EngineConfig::default(), 0);
        (report, events)
    }

    #[test]
    fn export_keeps_only_conflicted_events() {
        let (report, events) = fixture();
        let export = report_to_export(&report, &events);

        assert_eq!(
            export.events.iter().map(|item| item.event).collect::<Vec<_>>(),
            vec![EventRef::booking(1), EventRef::booking(2)]
        );
        assert_eq!(export.groups.len(), 1);
        assert_eq!(export.groups[0].key, "booking:1,booking:2");
        assert_eq!(export.groups[0].conflict_date, "2025-08-02");
        assert!(!export.groups[0].resolved);
    }

    #[test]
    fn json_report_uses_camel_case_fields() {
        let (report, events) = fixture();
        let rendered = render_json_report(&report, &events).unwrap();

        assert!(rendered.contains("\"ownerId\": \"performer-1\""));
        assert!(rendered.contains("\"conflictDate\": \"2025-08-02\""));
        assert!(rendered.contains("\"event\": \"booking:1\""));
        assert!(rendered.contains("\"severity\": \"critical\""));
    }

    #[test]
    fn markdown_report_lists_groups_and_counterparts() {
        let (report, events) = fixture();
        let rendered = render_markdown_report(&report, &events);

        assert!(rendered.starts_with("# Booking conflicts for performer-1\n"));
        assert!(rendered.contains("## 2025-08-02 (open)"));
        assert!(rendered.contains("- booking:1 Ada [confirmed]"));
        assert!(rendered.contains("  - critical: booking:2 with Grace (15:00 - 17:00)"));
        assert!(!rendered.contains("2025-08-09"));
    }

    #[test]
    fn markdown_report_without_groups_says_so() {
        let owner = OwnerId::new("performer-1").unwrap();
        let events = vec![Event::from_draft(
            owner.clone(),
            1,
            EventDraft::new(EventKind::Enquiry),
        )];
        let report = aggregate(&owner, &events, &[], &EngineConfig::default(), 0);

        assert_eq!(
            render_markdown_report(&report, &events),
            "# Booking conflicts for performer-1\n\nNo conflicts.\n"
        );
    }

    #[test]
    fn suggested_report_file_name_uses_format_extension() {
        assert_eq!(
            suggested_report_file_name(ReportFormat::Json, 123),
            "encore-conflicts-123.json"
        );
        assert_eq!(
            suggested_report_file_name(ReportFormat::Markdown, 456),
            "encore-conflicts-456.md"
        );
    }
}
