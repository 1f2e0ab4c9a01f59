use encore_core::services::ConflictService;
use encore_core::OwnerId;

use crate::error::CliError;

pub async fn run_recompute(
    service: &ConflictService,
    owner: &OwnerId,
    as_json: bool,
) -> Result<(), CliError> {
    let report = service.recompute(owner).await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "{} conflicted event(s) in {} group(s); {} updated, {} unchanged, {} failed",
            report.conflicts.conflicted_count(),
            report.conflicts.groups.len(),
            report.writes.updated,
            report.writes.unchanged,
            report.writes.failed,
        );
        for event in &report.writes.failed_events {
            println!("failed: {event}");
        }
    }

    Ok(())
}
