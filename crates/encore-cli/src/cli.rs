use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use encore_core::{EventKind, EventRef, ResolutionType};

#[derive(Parser)]
#[command(name = "encore")]
#[command(about = "Detect and resolve booking conflicts from the command line")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to local database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,

    /// Performer account to operate on (defaults to ENCORE_OWNER)
    #[arg(long, global = true, value_name = "ID")]
    pub owner: Option<String>,

    /// Engine config JSON file (defaults to ENCORE_CONFIG)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage enquiries and bookings
    Event {
        #[command(subcommand)]
        command: EventCommands,
    },
    /// Recompute and store conflict flags for every event
    Recompute {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the current conflict report
    Conflicts {
        /// Output as JSON
        #[arg(long, conflicts_with = "markdown")]
        json: bool,
        /// Output as Markdown
        #[arg(long)]
        markdown: bool,
        /// Optional output file or directory (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
    /// Accept the conflict between a set of events
    Resolve(ResolveArgs),
    /// Remove the resolution for exactly this set of events
    Unresolve {
        /// Group member as kind:id, repeated for each member
        #[arg(long = "member", value_name = "KIND:ID", required = true)]
        members: Vec<EventRef>,
    },
    /// List recorded resolutions
    Resolutions {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
pub enum EventCommands {
    /// Create an enquiry or booking
    #[command(alias = "new")]
    Add {
        /// Event kind
        #[arg(long, default_value = "booking")]
        kind: EventKind,
        #[command(flatten)]
        fields: EventFields,
    },
    /// Change fields of an existing event
    Update {
        /// Event as kind:id
        event: EventRef,
        #[command(flatten)]
        fields: EventFields,
    },
    /// Delete an event
    Delete {
        /// Event as kind:id
        event: EventRef,
    },
    /// List events with their stored conflict flags
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug, Default)]
pub struct EventFields {
    /// Calendar date, e.g. 2025-08-02
    #[arg(long)]
    pub date: Option<String>,
    /// Start time, e.g. 14:00 or 2:30pm
    #[arg(long)]
    pub start: Option<String>,
    /// End time
    #[arg(long)]
    pub end: Option<String>,
    /// Client name
    #[arg(long)]
    pub client: Option<String>,
    /// Venue name
    #[arg(long)]
    pub venue: Option<String>,
    /// Venue address
    #[arg(long)]
    pub address: Option<String>,
    /// Travel time to the venue in minutes
    #[arg(long, value_name = "MINUTES")]
    pub travel_minutes: Option<u32>,
    /// Distance to the venue in miles
    #[arg(long, value_name = "MILES")]
    pub distance_miles: Option<f64>,
    /// Lifecycle status
    #[arg(long)]
    pub status: Option<String>,
}

#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// Group member as kind:id, repeated for each member
    #[arg(long = "member", value_name = "KIND:ID", required = true)]
    pub members: Vec<EventRef>,
    /// Who accepted the conflict
    #[arg(long, default_value = "cli")]
    pub by: String,
    /// Resolution type
    #[arg(long = "type", default_value = "accepted")]
    pub resolution_type: ResolutionType,
    /// Free-form notes
    #[arg(long)]
    pub notes: Option<String>,
    /// Stop suppressing after this RFC 3339 timestamp
    #[arg(long, value_name = "TIMESTAMP")]
    pub expires_at: Option<String>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}
