//! Encore CLI - Booking conflict checks from the command line
//!
//! Manage a performer's enquiries and bookings, recompute conflicts, and
//! record which collisions have been accepted.

mod cli;
mod commands;
mod error;


use clap::Parser;

use crate::cli::{Cli, Commands, EventCommands};
use crate::commands::common::{open_service, resolve_db_path, resolve_owner};
use crate::commands::completions::run_completions;
use crate::commands::conflicts::run_conflicts;
use crate::commands::event::{run_event_add, run_event_delete, run_event_list, run_event_update};
use crate::commands::recompute::run_recompute;
use crate::commands::resolve::{run_resolutions, run_resolve, run_unresolve};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("encore=info".parse().expect("valid tracing directive")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Commands::Completions { shell, output } = &cli.command {
        return run_completions(*shell, output.as_deref());
    }

    let db_path = resolve_db_path(cli.db_path);
    let owner = resolve_owner(cli.owner)?;
    let service = open_service(&db_path, cli.config)?;

    match cli.command {
        Commands::Event { command } => match command {
            EventCommands::Add { kind, fields } => {
                run_event_add(&service, &owner, kind, fields).await?;
            }
            EventCommands::Update { event, fields } => {
                run_event_update(&service, &owner, event, fields).await?;
            }
            EventCommands::Delete { event } => run_event_delete(&service, &owner, event).await?,
            EventCommands::List { json } => run_event_list(&service, &owner, json).await?,
        },
        Commands::Recompute { json } => run_recompute(&service, &owner, json).await?,
        Commands::Conflicts {
            json,
            markdown,
            output,
        } => {
            run_conflicts(&service, &owner, json, markdown, output.as_deref()).await?;
        }
        Commands::Resolve(args) => run_resolve(&service, &owner, args).await?,
        Commands::Unresolve { members } => run_unresolve(&service, &owner, &members).await?,
        Commands::Resolutions { json } => run_resolutions(&service, &owner, json).await?,
        Commands::Completions { .. } => {}
    }

    Ok(())
}
