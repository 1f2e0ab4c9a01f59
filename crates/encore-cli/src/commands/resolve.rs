use encore_core::services::ConflictService;
use encore_core::{EventRef, OwnerId};

use crate::cli::ResolveArgs;
use crate::commands::common::{format_resolution_lines, parse_expiry};
use crate::error::CliError;

pub async fn run_resolve(
    service: &ConflictService,
    owner: &OwnerId,
    args: ResolveArgs,
) -> Result<(), CliError> {
    let expires_at = args.expires_at.as_deref().map(parse_expiry).transpose()?;
    let resolution = service
        .resolve(
            owner,
            &args.members,
            &args.by,
            args.resolution_type,
            args.notes.as_deref(),
            expires_at,
        )
        .await?;

    println!("{}", resolution.id);
    Ok(())
}

pub async fn run_unresolve(
    service: &ConflictService,
    owner: &OwnerId,
    members: &[EventRef],
) -> Result<(), CliError> {
    if service.unresolve(owner, members).await? {
        println!("Removed resolution");
    } else {
        println!("No resolution for that exact group");
    }
    Ok(())
}

pub async fn run_resolutions(
    service: &ConflictService,
    owner: &OwnerId,
    as_json: bool,
) -> Result<(), CliError> {
    let resolutions = service.resolutions(owner).await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&resolutions)?);
    } else {
        for line in format_resolution_lines(&resolutions) {
            println!("{line}");
        }
    }

    Ok(())
}
