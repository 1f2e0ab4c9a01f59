use std::path::{Path, PathBuf};

use encore_core::export::{render_report, suggested_report_file_name, ReportFormat};
use encore_core::services::ConflictService;
use encore_core::OwnerId;

use crate::error::CliError;

pub async fn run_conflicts(
    service: &ConflictService,
    owner: &OwnerId,
    as_json: bool,
    as_markdown: bool,
    output_path: Option<&Path>,
) -> Result<(), CliError> {
    let report = service.report(owner).await?;
    let events = service.events(owner).await?;

    let format = if as_json {
        ReportFormat::Json
    } else if as_markdown || output_path.is_some() {
        ReportFormat::Markdown
    } else {
        for status in &report.groups {
            let state = if status.resolved { "resolved" } else { "open" };
            println!(
                "{}  {:<8}  {}",
                status.group.conflict_date, state, status.group_key
            );
        }
        if report.groups.is_empty() {
            println!("No conflicts");
        }
        return Ok(());
    };

    let rendered = render_report(&report, &events, format)?;
    if let Some(path) = output_path {
        let path = report_output_path(path, format, chrono::Utc::now().timestamp_millis());
        std::fs::write(&path, rendered)?;
        println!("{}", path.display());
    } else {
        println!("{rendered}");
    }

    Ok(())
}

/// A directory gets a generated report file name; any other path is used as is.
pub fn report_output_path(path: &Path, format: ReportFormat, timestamp_ms: i64) -> PathBuf {
    if path.is_dir() {
        path.join(suggested_report_file_name(format, timestamp_ms))
    } else {
        path.to_path_buf()
    }
}
