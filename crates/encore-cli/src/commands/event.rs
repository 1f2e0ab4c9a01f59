use encore_core::services::ConflictService;
use encore_core::{EventDraft, EventKind, EventRef, OwnerId};

use crate::cli::EventFields;
use crate::commands::common::{apply_event_fields, format_event_line, format_event_lines};
use crate::error::CliError;

pub async fn run_event_add(
    service: &ConflictService,
    owner: &OwnerId,
    kind: EventKind,
    fields: EventFields,
) -> Result<(), CliError> {
    let mut draft = EventDraft::new(kind);
    apply_event_fields(&mut draft, fields);

    let event = service.create_event(owner, &draft).await?;
    println!("{}", format_event_line(&event));
    Ok(())
}

pub async fn run_event_update(
    service: &ConflictService,
    owner: &OwnerId,
    event: EventRef,
    fields: EventFields,
) -> Result<(), CliError> {
    let existing = service
        .get_event(owner, event)
        .await?
        .ok_or_else(|| CliError::EventNotFound(event.to_string()))?;

    let mut draft = existing.to_draft();
    if !apply_event_fields(&mut draft, fields) {
        return Err(CliError::NothingToUpdate);
    }

    let updated = service.update_event(owner, event, &draft).await?;
    println!("{}", format_event_line(&updated));
    Ok(())
}

pub async fn run_event_delete(
    service: &ConflictService,
    owner: &OwnerId,
    event: EventRef,
) -> Result<(), CliError> {
    let removed = service.delete_event(owner, event).await?;
    println!("{event}");
    if removed > 0 {
        println!("Removed {removed} resolution(s) involving {event}");
    }
    Ok(())
}

pub async fn run_event_list(
    service: &ConflictService,
    owner: &OwnerId,
    as_json: bool,
) -> Result<(), CliError> {
    let events = service.events(owner).await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&events)?);
    } else {
        for line in format_event_lines(&events) {
            println!("{line}");
        }
    }

    Ok(())
}
