use std::env;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use encore_core::services::ConflictService;
use encore_core::{EngineConfig, Event, EventDraft, OwnerId, Resolution};

use crate::cli::EventFields;
use crate::error::CliError;

pub fn resolve_db_path(cli_db_path: Option<PathBuf>) -> PathBuf {
    cli_db_path
        .or_else(|| env::var_os("ENCORE_DB_PATH").map(PathBuf::from))
        .unwrap_or_else(default_db_path)
}

pub fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(env::temp_dir)
        .join("encore")
        .join("encore.db")
}

pub fn resolve_config_path(cli_config: Option<PathBuf>) -> Option<PathBuf> {
    cli_config.or_else(|| env::var_os("ENCORE_CONFIG").map(PathBuf::from))
}

pub fn resolve_owner(cli_owner: Option<String>) -> Result<OwnerId, CliError> {
    let raw = cli_owner
        .or_else(|| env::var("ENCORE_OWNER").ok())
        .filter(|value| !value.trim().is_empty())
        .ok_or(CliError::MissingOwner)?;
    Ok(OwnerId::new(raw)?)
}

pub fn open_service(
    db_path: &Path,
    cli_config: Option<PathBuf>,
) -> Result<ConflictService, CliError> {
    let config_path = resolve_config_path(cli_config);
    let config = EngineConfig::load(config_path.as_deref())?;
    tracing::debug!(db_path = %db_path.display(), ?config, "Opening conflict service");
    Ok(ConflictService::open_path(db_path, config)?)
}

/// Overlay the provided fields on a draft; returns whether anything changed.
pub fn apply_event_fields(draft: &mut EventDraft, fields: EventFields) -> bool {
    let mut changed = false;
    let mut set = |target: &mut Option<String>, value: Option<String>| {
        if let Some(value) = value {
            *target = Some(value);
            changed = true;
        }
    };
    set(&mut draft.client_name, fields.client);
    set(&mut draft.start_time, fields.start);
    set(&mut draft.end_time, fields.end);
    set(&mut draft.venue_name, fields.venue);
    set(&mut draft.venue_address, fields.address);

    if let Some(date) = fields.date {
        draft.date = Some(date.trim().into());
        changed = true;
    }
    if let Some(minutes) = fields.travel_minutes {
        draft.travel_minutes = Some(minutes);
        changed = true;
    }
    if let Some(miles) = fields.distance_miles {
        draft.distance_miles = Some(miles);
        changed = true;
    }
    if let Some(status) = fields.status {
        draft.status = status;
        changed = true;
    }
    changed
}

pub fn format_event_lines(events: &[Event]) -> Vec<String> {
    events.iter().map(format_event_line).collect()
}

pub fn format_event_line(event: &Event) -> String {
    let date = event
        .date
        .as_ref()
        .map_or_else(|| "(no date)".to_string(), encore_core::EventDate::to_storage);
    let time = match (event.start_time.as_deref(), event.end_time.as_deref()) {
        (Some(start), Some(end)) => format!("{start}-{end}"),
        (Some(start), None) => start.to_string(),
        (None, _) => "--:--".to_string(),
    };
    let client = event.client_name.as_deref().unwrap_or("(no client)");

    let mut line = format!(
        "{:<12}  {date:<10}  {time:<11}  {client}  [{}]",
        event.event_ref().to_string(),
        event.status
    );
    if event.has_conflicts {
        let worst = encore_core::Severity::worst(&event.conflict_details)
            .map_or("", encore_core::Severity::as_str);
        let _ = write!(line, "  conflicts={} {worst}", event.conflict_count);
        if event.conflicts_resolved {
            line.push_str(" (resolved)");
        }
    }
    line
}

pub fn format_resolution_lines(resolutions: &[Resolution]) -> Vec<String> {
    resolutions
        .iter()
        .map(|resolution| {
            let mut line = format!(
                "{}  {:<11}  {}  by={}  at={}",
                resolution.group.conflict_date,
                resolution.resolution_type.as_str(),
                resolution.group.key(),
                resolution.resolved_by,
                format_timestamp(resolution.resolved_at),
            );
            if let Some(expires_at) = resolution.expires_at {
                let _ = write!(line, "  expires={}", format_timestamp(expires_at));
            }
            line
        })
        .collect()
}

pub fn format_timestamp(timestamp_ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(timestamp_ms).map_or_else(
        || timestamp_ms.to_string(),
        |date_time| date_time.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    )
}

pub fn parse_expiry(raw: &str) -> Result<i64, CliError> {
    chrono::DateTime::parse_from_rfc3339(raw.trim())
        .map(|timestamp| timestamp.timestamp_millis())
        .map_err(|_| CliError::InvalidTimestamp(raw.to_string()))
}
