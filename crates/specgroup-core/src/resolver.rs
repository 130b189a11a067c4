use crate::domain::{GroupMap, GroupingError, GroupingResult, RowUsage, UsedRowSet};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedGroups {
    pub groups: GroupMap,
    pub used: UsedRowSet,
    pub duplicate_uses: usize,
}

/// Validates every referenced row index against the dataset and rebuilds the
/// used-row set. A row consumed by more than one group is counted, not
/// rejected.
pub fn resolve(groups: GroupMap, row_count: usize) -> GroupingResult<ResolvedGroups> {
    let mut used = UsedRowSet::new(row_count);
    let mut duplicate_uses = 0;

    for group in &groups {
        for &row in group.rows() {
            if row >= row_count {
                return Err(GroupingError::range(
                    "RANGE.ROW_INDEX",
                    format!(
                        "group {} references row {} but the dataset has {} rows",
                        group.key, row, row_count
                    ),
                ));
            }
            if used.mark(row)? == RowUsage::Repeated {
                duplicate_uses += 1;
                debug!(group = group.key, row, "row reused by a later group");
            }
        }
    }

    Ok(ResolvedGroups {
        groups,
        used,
        duplicate_uses,
    })
}
