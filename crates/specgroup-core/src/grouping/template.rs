use crate::domain::{GroupKey, GroupMap, IdentifierLookup, ParserResult, Rows, Workspace};
use crate::progress::PhaseProgress;
use std::collections::{BTreeMap, BTreeSet};
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateGroups {
    pub groups: GroupMap,
    pub skipped_detectors: usize,
}

/// Builds groups over the target dataset from a template dataset.
///
/// A group-number template pools every target row owning a detector of
/// group `g` into group `g` (zero means ungrouped). Any other template turns
/// each row `i` owning more than one detector into group `i`. Groups come out
/// in ascending key order with ascending row indices, and the same target row
/// may land in several groups.
pub fn groups_from_template(
    template: &Workspace,
    target: &dyn IdentifierLookup,
    progress: &PhaseProgress<'_>,
) -> ParserResult<TemplateGroups> {
    let mut pooled: BTreeMap<GroupKey, BTreeSet<usize>> = BTreeMap::new();
    let mut skipped_detectors = 0;
    let row_count = template.row_count();

    for index in 0..row_count {
        progress.interruption_point()?;
        progress.advance((index + 1) as f64 / row_count as f64);

        let Some(header) = template.header(index) else {
            continue;
        };
        let key = match &template.rows {
            Rows::GroupNumbers(rows) => match rows[index].group {
                0 => continue,
                group => group,
            },
            _ => {
                if header.detector_ids.len() <= 1 {
                    continue;
                }
                index as GroupKey
            }
        };

        for &detector_id in &header.detector_ids {
            match target.row_for_detector(detector_id) {
                Some(row) => {
                    pooled.entry(key).or_default().insert(row);
                }
                None => {
                    skipped_detectors += 1;
                    warn!(
                        template = %template.name,
                        detector_id,
                        group = key,
                        "template detector is not present in the target dataset; skipping"
                    );
                }
            }
        }
    }

    let mut groups = GroupMap::new();
    for (key, rows) in pooled {
        groups.push_group(key, rows);
    }
    Ok(TemplateGroups {
        groups,
        skipped_detectors,
    })
}
