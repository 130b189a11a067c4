use super::CliError;
use anyhow::Context;
use specgroup_core::domain::GroupingError;
use specgroup_core::progress::ProgressReporter;
use specgroup_core::{
    GroupingOutput, GroupingRequest, GroupingSummary, RequestLoadError, Workspace,
    WorkspaceIoError, read_workspace, write_grouping_output,
};
use std::cell::Cell;
use std::path::Path;

pub(super) fn load_request(path: &Path) -> Result<GroupingRequest, CliError> {
    GroupingRequest::load(path).map_err(|error| {
        let grouping_error = match &error {
            RequestLoadError::Read { .. } => {
                GroupingError::io_system("IO.REQUEST_READ", error.to_string())
            }
            RequestLoadError::Parse { .. } => {
                GroupingError::configuration("CONFIG.REQUEST", error.to_string())
            }
        };
        CliError::Compute(grouping_error)
    })
}

pub(super) fn load_workspace(path: &Path) -> Result<Workspace, CliError> {
    read_workspace(path).map_err(|error| {
        let grouping_error = match &error {
            WorkspaceIoError::Read { .. } => {
                GroupingError::io_system("IO.DATASET_READ", error.to_string())
            }
            _ => GroupingError::format("FORMAT.DATASET", error.to_string()),
        };
        CliError::Compute(grouping_error)
    })
}

pub(super) fn write_output(path: &Path, output: &GroupingOutput) -> Result<(), CliError> {
    write_grouping_output(path, output)
        .with_context(|| format!("failed to store grouped dataset '{}'", output.workspace.name))?;
    Ok(())
}

pub(super) fn render_human_summary(name: &str, summary: &GroupingSummary) -> String {
    format!(
        "Grouped '{}': {} group(s), {} passthrough row(s), {} output row(s), \
         {} skipped reference(s), {} reused row(s)",
        name,
        summary.group_count,
        summary.passthrough_count,
        summary.output_row_count(),
        summary.skipped_references,
        summary.duplicate_uses
    )
}

pub(super) fn render_summary_json(summary: &GroupingSummary) -> Result<String, CliError> {
    let text = serde_json::to_string(summary).context("failed to encode grouping summary")?;
    Ok(text)
}

/// Prints whole percentages to stderr as they change.
#[derive(Debug, Default)]
pub(super) struct StderrProgress {
    last_percent: Cell<Option<u32>>,
}

impl ProgressReporter for StderrProgress {
    fn report_progress(&self, fraction: f64) {
        let percent = (fraction.clamp(0.0, 1.0) * 100.0).floor() as u32;
        if self.last_percent.get() != Some(percent) {
            self.last_percent.set(Some(percent));
            eprintln!("progress: {percent}%");
        }
    }
}
