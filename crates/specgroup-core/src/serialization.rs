use crate::assembler::GroupingOutput;
use crate::domain::{Rows, Workspace};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum WorkspaceIoError {
    #[error("failed to read dataset '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse dataset '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("dataset '{}' is inconsistent: {detail}", path.display())]
    Invalid { path: PathBuf, detail: String },
    #[error("failed to encode '{}': {source}", path.display())]
    Encode {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("failed to write '{}': {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

pub fn normalize_text_artifact(content: &str) -> String {
    let mut normalized = content.replace("\r\n", "\n").replace('\r', "\n");
    if !normalized.is_empty() && !normalized.ends_with('\n') {
        normalized.push('\n');
    }
    normalized
}

pub fn read_workspace(path: impl AsRef<Path>) -> Result<Workspace, WorkspaceIoError> {
    let path = path.as_ref();
    let source = fs::read_to_string(path).map_err(|source| WorkspaceIoError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let workspace: Workspace =
        serde_json::from_str(&source).map_err(|source| WorkspaceIoError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    check_row_shapes(&workspace).map_err(|detail| WorkspaceIoError::Invalid {
        path: path.to_path_buf(),
        detail,
    })?;
    Ok(workspace)
}

pub fn write_workspace(
    path: impl AsRef<Path>,
    workspace: &Workspace,
) -> Result<(), WorkspaceIoError> {
    write_json_artifact(path.as_ref(), workspace)
}

pub fn write_grouping_output(
    path: impl AsRef<Path>,
    output: &GroupingOutput,
) -> Result<(), WorkspaceIoError> {
    write_json_artifact(path.as_ref(), output)
}

fn write_json_artifact(path: &Path, value: &impl Serialize) -> Result<(), WorkspaceIoError> {
    let text = serde_json::to_string_pretty(value).map_err(|source| WorkspaceIoError::Encode {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, normalize_text_artifact(&text)).map_err(|source| WorkspaceIoError::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// Histogram rows need one uncertainty per value and one more edge than
/// values; event rows need at least two edges.
fn check_row_shapes(workspace: &Workspace) -> Result<(), String> {
    match &workspace.rows {
        Rows::Histogram(rows) => {
            for (index, row) in rows.iter().enumerate() {
                if row.e.len() != row.y.len() {
                    return Err(format!(
                        "row {} has {} values but {} uncertainties",
                        index,
                        row.y.len(),
                        row.e.len()
                    ));
                }
                if row.x.len() != row.y.len() + 1 {
                    return Err(format!(
                        "row {} has {} values but {} bin edges",
                        index,
                        row.y.len(),
                        row.x.len()
                    ));
                }
            }
        }
        Rows::Event(rows) => {
            if let Some(index) = rows.iter().position(|row| row.x.len() < 2) {
                return Err(format!("event row {} needs at least two bin edges", index));
            }
        }
        Rows::GroupNumbers(_) => {}
    }
    Ok(())
}
