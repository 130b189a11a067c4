use super::{GroupingError, GroupingResult};

/// Either a sequence number assigned while parsing or a group number taken
/// from the grouping source.
pub type GroupKey = i32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub key: GroupKey,
    rows: Vec<usize>,
}

impl Group {
    pub fn rows(&self) -> &[usize] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Insertion-ordered groups of source row indices.
///
/// Keys are not deduplicated: pushing the same key twice yields two groups.
/// Row indices are unique within one group but may repeat across groups.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GroupMap {
    groups: Vec<Group>,
}

impl GroupMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a group, dropping repeated row indices after their first
    /// occurrence. Returns how many repeats were dropped.
    pub fn push_group(&mut self, key: GroupKey, rows: impl IntoIterator<Item = usize>) -> usize {
        let mut unique = Vec::new();
        let mut dropped = 0;
        for row in rows {
            if unique.contains(&row) {
                dropped += 1;
            } else {
                unique.push(row);
            }
        }
        self.groups.push(Group { key, rows: unique });
        dropped
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn get(&self, position: usize) -> Option<&Group> {
        self.groups.get(position)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Group> {
        self.groups.iter()
    }

    pub fn keys(&self) -> Vec<GroupKey> {
        self.groups.iter().map(|group| group.key).collect()
    }

    pub fn referenced_row_count(&self) -> usize {
        self.groups.iter().map(Group::len).sum()
    }
}

impl<'a> IntoIterator for &'a GroupMap {
    type Item = &'a Group;
    type IntoIter = std::slice::Iter<'a, Group>;

    fn into_iter(self) -> Self::IntoIter {
        self.groups.iter()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowUsage {
    First,
    Repeated,
}

/// Marks which source rows at least one group consumes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsedRowSet {
    used: Vec<bool>,
    used_count: usize,
}

impl UsedRowSet {
    pub fn new(row_count: usize) -> Self {
        Self {
            used: vec![false; row_count],
            used_count: 0,
        }
    }

    pub fn row_count(&self) -> usize {
        self.used.len()
    }

    pub fn mark(&mut self, index: usize) -> GroupingResult<RowUsage> {
        let row_count = self.used.len();
        let slot = self.used.get_mut(index).ok_or_else(|| {
            GroupingError::range(
                "RANGE.ROW_INDEX",
                format!(
                    "row index {} is out of range for a dataset with {} rows",
                    index, row_count
                ),
            )
        })?;

        if *slot {
            return Ok(RowUsage::Repeated);
        }
        *slot = true;
        self.used_count += 1;
        Ok(RowUsage::First)
    }

    pub fn is_used(&self, index: usize) -> bool {
        self.used.get(index).copied().unwrap_or(false)
    }

    pub fn used_count(&self) -> usize {
        self.used_count
    }

    pub fn unused_count(&self) -> usize {
        self.used.len() - self.used_count
    }

    /// Unused row indices in ascending order.
    pub fn unused(&self) -> impl Iterator<Item = usize> + '_ {
        self.used
            .iter()
            .enumerate()
            .filter_map(|(index, used)| (!used).then_some(index))
    }
}

#[cfg(test)]
mod tests {
    use super::{GroupMap, RowUsage, UsedRowSet};
    use crate::domain::GroupingErrorCategory;

    #[test]
    fn push_group_keeps_first_occurrence_order() {
        let mut groups = GroupMap::new();
        let dropped = groups.push_group(4, [3, 1, 3, 2, 1]);

        assert_eq!(dropped, 2);
        assert_eq!(groups.get(0).expect("group").rows(), &[3, 1, 2]);
    }

    #[test]
    fn repeated_keys_stay_independent_groups() {
        let mut groups = GroupMap::new();
        groups.push_group(1, [0]);
        groups.push_group(1, [1]);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups.keys(), vec![1, 1]);
        assert_eq!(groups.referenced_row_count(), 2);
    }

    #[test]
    fn used_rows_track_repeats_and_complement() {
        let mut used = UsedRowSet::new(5);
        assert_eq!(used.mark(2).expect("in range"), RowUsage::First);
        assert_eq!(used.mark(2).expect("in range"), RowUsage::Repeated);
        assert_eq!(used.mark(0).expect("in range"), RowUsage::First);

        assert_eq!(used.used_count(), 2);
        assert_eq!(used.unused_count(), 3);
        assert_eq!(used.unused().collect::<Vec<_>>(), vec![1, 3, 4]);
    }

    #[test]
    fn marking_beyond_row_count_is_a_range_error() {
        let mut used = UsedRowSet::new(2);
        let error = used.mark(2).expect_err("index 2 should be rejected");
        assert_eq!(error.category(), GroupingErrorCategory::RangeError);
        assert!(!used.is_used(2));
    }
}
