use super::loader::{GroupFileFormat, GroupFileLoader};
use super::map_file::read_map_file;
use super::pattern::pattern_to_map_text;
use super::template::groups_from_template;
use super::xml::read_xml_group_file;
use crate::domain::{
    DetectorId, GroupKey, GroupMap, GroupingError, IdentifierLookup, ParserResult, RowUsage,
    SpectrumNumber, UsedRowSet, Workspace,
};
use crate::progress::PhaseProgress;
use std::path::PathBuf;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExplicitList {
    SpectrumNumbers(Vec<SpectrumNumber>),
    DetectorIds(Vec<DetectorId>),
    RowIndices(Vec<i64>),
}

impl ExplicitList {
    pub fn is_empty(&self) -> bool {
        match self {
            Self::SpectrumNumbers(values) | Self::DetectorIds(values) => values.is_empty(),
            Self::RowIndices(values) => values.is_empty(),
        }
    }
}

/// Where the groups come from. Exactly one source is used per invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum GroupingSource<'a> {
    Template(&'a Workspace),
    File {
        path: PathBuf,
        exclude_group_numbers: Vec<GroupKey>,
    },
    Pattern(String),
    Explicit(ExplicitList),
}

impl GroupingSource<'_> {
    pub fn describe(&self) -> String {
        match self {
            Self::Template(workspace) => format!("template dataset '{}'", workspace.name),
            Self::File { path, .. } => format!("group file '{}'", path.display()),
            Self::Pattern(pattern) => format!("grouping pattern '{}'", pattern),
            Self::Explicit(ExplicitList::SpectrumNumbers(_)) => "spectrum number list".to_string(),
            Self::Explicit(ExplicitList::DetectorIds(_)) => "detector ID list".to_string(),
            Self::Explicit(ExplicitList::RowIndices(_)) => "row index list".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedGroups {
    pub groups: GroupMap,
    pub used: UsedRowSet,
    /// Identifiers in bulk sources that the dataset does not know about.
    pub skipped_references: usize,
    pub duplicate_uses: usize,
}

/// Normalizes any grouping source into a [`GroupMap`] over one dataset.
pub struct GroupSpecParser<'a> {
    workspace: &'a Workspace,
    lookup: &'a dyn IdentifierLookup,
    loader: &'a dyn GroupFileLoader,
    ignore_group_numbers: bool,
}

impl<'a> GroupSpecParser<'a> {
    pub fn new(
        workspace: &'a Workspace,
        lookup: &'a dyn IdentifierLookup,
        loader: &'a dyn GroupFileLoader,
    ) -> Self {
        Self {
            workspace,
            lookup,
            loader,
            ignore_group_numbers: true,
        }
    }

    /// When set, file groups are numbered 1, 2, 3, ... in file order.
    pub fn ignore_group_numbers(mut self, ignore: bool) -> Self {
        self.ignore_group_numbers = ignore;
        self
    }

    pub fn parse(
        &self,
        source: &GroupingSource<'_>,
        progress: &PhaseProgress<'_>,
    ) -> ParserResult<ParsedGroups> {
        let mut builder = GroupBuilder::new(self.workspace.row_count());

        match source {
            GroupingSource::Template(template) => {
                let resolved = groups_from_template(template, self.lookup, progress)?;
                builder.skipped_references = resolved.skipped_detectors;
                for group in &resolved.groups {
                    builder.add(group.key, group.rows().to_vec(), false)?;
                }
            }
            GroupingSource::File {
                path,
                exclude_group_numbers,
            } => {
                let text = self.loader.load(path)?;
                let source_name = path.display().to_string();
                match GroupFileFormat::from_path(path) {
                    GroupFileFormat::Xml => self.collect_xml(
                        &source_name,
                        &text,
                        exclude_group_numbers,
                        progress,
                        &mut builder,
                    )?,
                    GroupFileFormat::Flat => self.collect_map_file(
                        &source_name,
                        &text,
                        exclude_group_numbers,
                        progress,
                        &mut builder,
                    )?,
                }
            }
            GroupingSource::Pattern(pattern) => {
                let text = pattern_to_map_text(pattern, self.workspace.row_count())?;
                let map = read_map_file("grouping pattern", &text, progress)?;
                for group in map.groups {
                    let rows = group
                        .numbers
                        .into_iter()
                        .map(|index| index as usize)
                        .collect();
                    builder.add(group.group_number, rows, true)?;
                }
            }
            GroupingSource::Explicit(list) => {
                let rows = self.resolve_explicit(list)?;
                builder.add(0, rows, true)?;
                progress.finish();
            }
        }

        if builder.groups.is_empty() {
            return Err(GroupingError::configuration(
                "CONFIG.NOTHING_TO_GROUP",
                format!("{} did not produce any groups", source.describe()),
            ));
        }
        if builder.skipped_references > 0 {
            warn!(
                skipped = builder.skipped_references,
                source = %source.describe(),
                "identifiers not found in the dataset were skipped"
            );
        }

        Ok(ParsedGroups {
            groups: builder.groups,
            used: builder.used,
            skipped_references: builder.skipped_references,
            duplicate_uses: builder.duplicate_uses,
        })
    }

    fn collect_map_file(
        &self,
        source_name: &str,
        text: &str,
        exclude_group_numbers: &[GroupKey],
        progress: &PhaseProgress<'_>,
        builder: &mut GroupBuilder,
    ) -> ParserResult<()> {
        let map = read_map_file(source_name, text, progress)?;
        let mut sequence = 0;
        for group in map.groups {
            if exclude_group_numbers.contains(&group.group_number) {
                continue;
            }
            sequence += 1;

            let mut rows = Vec::with_capacity(group.numbers.len());
            for spectrum_number in group.numbers {
                match self.lookup.row_for_spectrum(spectrum_number) {
                    Some(row) => rows.push(row),
                    None => {
                        builder.skipped_references += 1;
                        warn!(
                            file = source_name,
                            line = group.line,
                            group = group.group_number,
                            spectrum_number,
                            "spectrum number not found in the dataset; skipping"
                        );
                    }
                }
            }
            let key = self.output_key(group.group_number, sequence);
            builder.add(key, rows, true)?;
        }
        Ok(())
    }

    fn collect_xml(
        &self,
        source_name: &str,
        text: &str,
        exclude_group_numbers: &[GroupKey],
        progress: &PhaseProgress<'_>,
        builder: &mut GroupBuilder,
    ) -> ParserResult<()> {
        let file = read_xml_group_file(source_name, text, progress)?;
        let mut sequence = 0;
        for group in file.groups {
            if exclude_group_numbers.contains(&group.id) {
                continue;
            }
            sequence += 1;

            let mut rows = Vec::new();
            for &detector_id in &group.detector_ids {
                match self.lookup.row_for_detector(detector_id) {
                    Some(row) => rows.push(row),
                    None => {
                        builder.skipped_references += 1;
                        warn!(
                            file = source_name,
                            group = group.id,
                            detector_id,
                            "detector not found in the dataset; skipping"
                        );
                    }
                }
            }
            for &spectrum_number in &group.spectrum_numbers {
                match self.lookup.row_for_spectrum(spectrum_number) {
                    Some(row) => rows.push(row),
                    None => {
                        builder.skipped_references += 1;
                        warn!(
                            file = source_name,
                            group = group.id,
                            spectrum_number,
                            "spectrum number not found in the dataset; skipping"
                        );
                    }
                }
            }
            let key = self.output_key(group.id, sequence);
            builder.add(key, rows, true)?;
        }
        Ok(())
    }

    fn resolve_explicit(&self, list: &ExplicitList) -> ParserResult<Vec<usize>> {
        match list {
            ExplicitList::SpectrumNumbers(numbers) => numbers
                .iter()
                .map(|&number| {
                    self.lookup.row_for_spectrum(number).ok_or_else(|| {
                        GroupingError::range(
                            "RANGE.SPECTRUM_NUMBER",
                            format!(
                                "spectrum number {} is not present in '{}'",
                                number, self.workspace.name
                            ),
                        )
                    })
                })
                .collect(),
            ExplicitList::DetectorIds(detectors) => detectors
                .iter()
                .map(|&detector_id| {
                    self.lookup.row_for_detector(detector_id).ok_or_else(|| {
                        GroupingError::range(
                            "RANGE.DETECTOR_ID",
                            format!(
                                "detector {} is not present in '{}'",
                                detector_id, self.workspace.name
                            ),
                        )
                    })
                })
                .collect(),
            ExplicitList::RowIndices(indices) => {
                let row_count = self.workspace.row_count();
                indices
                    .iter()
                    .map(|&index| {
                        usize::try_from(index)
                            .ok()
                            .filter(|row| *row < row_count)
                            .ok_or_else(|| {
                                GroupingError::range(
                                    "RANGE.ROW_INDEX",
                                    format!(
                                        "row index {} is out of range for '{}' with {} rows",
                                        index, self.workspace.name, row_count
                                    ),
                                )
                            })
                    })
                    .collect()
            }
        }
    }

    fn output_key(&self, group_number: GroupKey, sequence: GroupKey) -> GroupKey {
        if self.ignore_group_numbers {
            sequence
        } else {
            group_number
        }
    }
}

struct GroupBuilder {
    groups: GroupMap,
    used: UsedRowSet,
    skipped_references: usize,
    duplicate_uses: usize,
}

impl GroupBuilder {
    fn new(row_count: usize) -> Self {
        Self {
            groups: GroupMap::new(),
            used: UsedRowSet::new(row_count),
            skipped_references: 0,
            duplicate_uses: 0,
        }
    }

    /// Reuse across groups is legal; `warn_on_reuse` only controls logging.
    fn add(&mut self, key: GroupKey, rows: Vec<usize>, warn_on_reuse: bool) -> ParserResult<()> {
        if rows.is_empty() {
            warn!(group = key, "group has no rows in the dataset; dropping it");
            return Ok(());
        }

        let dropped = self.groups.push_group(key, rows);
        if dropped > 0 {
            warn!(group = key, dropped, "row listed more than once in a group; keeping one");
        }

        let Some(group) = self.groups.iter().last() else {
            return Ok(());
        };
        for &row in group.rows() {
            if self.used.mark(row)? == RowUsage::Repeated {
                self.duplicate_uses += 1;
                if warn_on_reuse {
                    warn!(group = key, row, "row is already used by another group");
                }
            }
        }
        Ok(())
    }
}
