use crate::combine::{combine_events, combine_histograms};
use crate::domain::{
    Behaviour, EventRow, GroupKey, GroupMap, GroupingError, GroupingResult, Rows, SpectrumNumber,
    UsedRowSet, Workspace,
};
use crate::progress::PhaseProgress;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssemblyOptions {
    pub keep_ungrouped: bool,
    /// Number output groups 1, 2, 3, ... instead of using their keys.
    pub sequential_numbers: bool,
    pub behaviour: Behaviour,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupingSummary {
    pub group_count: usize,
    pub passthrough_count: usize,
    pub skipped_references: usize,
    pub duplicate_uses: usize,
}

impl GroupingSummary {
    pub fn output_row_count(&self) -> usize {
        self.group_count + self.passthrough_count
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupingOutput {
    pub workspace: Workspace,
    pub summary: GroupingSummary,
    /// Per output row, the divisor already applied to averaged event weights.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_average_counts: Option<Vec<Option<usize>>>,
}

#[derive(Debug)]
pub struct AssembledRows {
    pub rows: Rows,
    pub passthrough_count: usize,
    pub event_average_counts: Option<Vec<Option<usize>>>,
}

/// Builds the output rows: one per group in map order, then one passthrough
/// row per unused source row in ascending index order when requested.
pub fn assemble(
    groups: &GroupMap,
    used: &UsedRowSet,
    source: &Workspace,
    options: AssemblyOptions,
    progress: &PhaseProgress<'_>,
) -> GroupingResult<AssembledRows> {
    let passthrough = if options.keep_ungrouped {
        used.unused().collect::<Vec<_>>()
    } else {
        Vec::new()
    };
    let total = (groups.len() + passthrough.len()).max(1) as f64;
    let mut produced = 0;
    let mut step = || -> GroupingResult<()> {
        progress.interruption_point()?;
        produced += 1;
        progress.advance(produced as f64 / total);
        Ok(())
    };

    match &source.rows {
        Rows::Histogram(rows) => {
            let mut output = Vec::with_capacity(groups.len() + passthrough.len());
            for (position, group) in groups.iter().enumerate() {
                step()?;
                let members = group.rows().iter().map(|&row| &rows[row]).collect::<Vec<_>>();
                let mut combined = combine_histograms(&members, options.behaviour)?;
                combined.header.spectrum_number =
                    Some(output_number(group.key, position, options.sequential_numbers));
                output.push(combined);
            }
            for &row in &passthrough {
                step()?;
                output.push(rows[row].clone());
            }
            Ok(AssembledRows {
                rows: Rows::Histogram(output),
                passthrough_count: passthrough.len(),
                event_average_counts: None,
            })
        }
        Rows::Event(rows) => {
            let mut output: Vec<EventRow> = Vec::with_capacity(groups.len() + passthrough.len());
            let mut counts = Vec::with_capacity(output.capacity());
            for (position, group) in groups.iter().enumerate() {
                step()?;
                let members = group.rows().iter().map(|&row| &rows[row]).collect::<Vec<_>>();
                let mut combined = combine_events(&members, options.behaviour)?;
                if let Some(count) = combined.average_count {
                    combined.row.scale_weights(1.0 / count as f64);
                }
                combined.row.header.spectrum_number =
                    Some(output_number(group.key, position, options.sequential_numbers));
                output.push(combined.row);
                counts.push(combined.average_count);
            }
            for &row in &passthrough {
                step()?;
                output.push(rows[row].clone());
                counts.push(None);
            }
            Ok(AssembledRows {
                rows: Rows::Event(output),
                passthrough_count: passthrough.len(),
                event_average_counts: Some(counts),
            })
        }
        Rows::GroupNumbers(_) => Err(GroupingError::type_mismatch(
            "TYPE.ROW_KIND",
            format!(
                "'{}' holds {} rows; only histogram or event datasets can be grouped",
                source.name,
                source.kind()
            ),
        )),
    }
}

fn output_number(key: GroupKey, position: usize, sequential: bool) -> SpectrumNumber {
    if sequential {
        position as SpectrumNumber + 1
    } else {
        key
    }
}
