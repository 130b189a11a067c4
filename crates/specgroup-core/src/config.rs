use crate::domain::{
    Behaviour, DetectorId, GroupKey, GroupingError, GroupingResult, SpectrumNumber, Workspace,
};
use crate::engine::GroupingOptions;
use crate::grouping::{ExplicitList, GroupingSource};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// One grouping invocation as read from a JSON request file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GroupingRequest {
    pub map_file: Option<PathBuf>,
    pub grouping_pattern: Option<String>,
    pub spectra_list: Vec<SpectrumNumber>,
    pub detector_list: Vec<DetectorId>,
    pub workspace_index_list: Vec<i64>,
    pub exclude_group_numbers: Vec<GroupKey>,
    pub behaviour: Behaviour,
    pub keep_ungrouped: bool,
    pub ignore_group_numbers: bool,
}

impl Default for GroupingRequest {
    fn default() -> Self {
        Self {
            map_file: None,
            grouping_pattern: None,
            spectra_list: Vec::new(),
            detector_list: Vec::new(),
            workspace_index_list: Vec::new(),
            exclude_group_numbers: Vec::new(),
            behaviour: Behaviour::Sum,
            keep_ungrouped: false,
            ignore_group_numbers: true,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RequestLoadError {
    #[error("failed to read grouping request '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse grouping request '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl GroupingRequest {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RequestLoadError> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|source| RequestLoadError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&source).map_err(|source| RequestLoadError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn options(&self) -> GroupingOptions {
        GroupingOptions {
            behaviour: self.behaviour,
            keep_ungrouped: self.keep_ungrouped,
            ignore_group_numbers: self.ignore_group_numbers,
        }
    }

    /// Picks the grouping source: a template first, then the group file, then
    /// the pattern, then exactly one explicit list.
    pub fn select_source<'a>(
        &self,
        template: Option<&'a Workspace>,
    ) -> GroupingResult<GroupingSource<'a>> {
        if let Some(template) = template {
            debug!(template = %template.name, "using template dataset");
            return Ok(GroupingSource::Template(template));
        }

        if let Some(path) = self
            .map_file
            .as_ref()
            .filter(|path| !path.as_os_str().is_empty())
        {
            return Ok(GroupingSource::File {
                path: path.clone(),
                exclude_group_numbers: self.exclude_group_numbers.clone(),
            });
        }

        if let Some(pattern) = self
            .grouping_pattern
            .as_deref()
            .map(str::trim)
            .filter(|pattern| !pattern.is_empty())
        {
            return Ok(GroupingSource::Pattern(pattern.to_string()));
        }

        let mut lists = [
            ExplicitList::SpectrumNumbers(self.spectra_list.clone()),
            ExplicitList::DetectorIds(self.detector_list.clone()),
            ExplicitList::RowIndices(self.workspace_index_list.clone()),
        ]
        .into_iter()
        .filter(|list| !list.is_empty());

        match (lists.next(), lists.next()) {
            (Some(list), None) => Ok(GroupingSource::Explicit(list)),
            (Some(_), Some(_)) => Err(GroupingError::configuration(
                "CONFIG.MULTIPLE_LISTS",
                "only one of the spectrum, detector or row index lists may be given",
            )),
            (None, _) => Err(GroupingError::configuration(
                "CONFIG.NOTHING_TO_GROUP",
                "nothing to group: give a template, a group file, a pattern or one explicit list",
            )),
        }
    }
}
