//! Compact grouping patterns over row indices.
//!
//! `,` separates groups, `+` joins pieces into one group, `a-b` is an
//! inclusive range summed into one group and `a:b[:step]` yields one group
//! per row. `0-2+5, 7:9` gives the groups `{0,1,2,5}`, `{7}`, `{8}`, `{9}`.

use super::map_file::RangeToken;
use crate::domain::{GroupingError, ParserResult};
use std::fmt::Write;

const PATTERN_SOURCE: &str = "grouping pattern";

pub fn parse_grouping_pattern(pattern: &str, row_count: usize) -> ParserResult<Vec<Vec<usize>>> {
    let mut groups = Vec::new();
    for entry in pattern.split(',') {
        let entry = entry.trim();
        if entry.is_empty() {
            return Err(GroupingError::format(
                "FORMAT.PATTERN_EMPTY_ENTRY",
                format!("grouping pattern '{}' contains an empty group", pattern),
            ));
        }

        if entry.contains(':') {
            for index in expand_stepped_entry(entry, row_count)? {
                groups.push(vec![index]);
            }
            continue;
        }

        let mut group = Vec::new();
        for piece in entry.split('+') {
            let range = RangeToken::parse(piece, 1, PATTERN_SOURCE)?;
            let first = check_index(i64::from(range.first), row_count)?;
            let last = check_index(i64::from(range.last), row_count)?;
            group.extend(first..=last);
        }
        groups.push(group);
    }
    Ok(groups)
}

/// Renders a pattern as flat group-file text listing row indices, numbered
/// from 1 in pattern order.
pub fn pattern_to_map_text(pattern: &str, row_count: usize) -> ParserResult<String> {
    let groups = parse_grouping_pattern(pattern, row_count)?;
    let mut text = String::new();
    let _ = writeln!(text, "{}", groups.len());
    for (position, group) in groups.iter().enumerate() {
        let members = group
            .iter()
            .map(|index| index.to_string())
            .collect::<Vec<_>>()
            .join(" ");
        let _ = writeln!(text, "{}\n{}\n{}", position + 1, group.len(), members);
    }
    Ok(text)
}

fn expand_stepped_entry(entry: &str, row_count: usize) -> ParserResult<Vec<usize>> {
    let parts = entry.split(':').map(str::trim).collect::<Vec<_>>();
    let (first, last, step) = match parts.as_slice() {
        [first, last] => (parse_bound(first, entry)?, parse_bound(last, entry)?, 1),
        [first, last, step] => (
            parse_bound(first, entry)?,
            parse_bound(last, entry)?,
            parse_bound(step, entry)?,
        ),
        _ => {
            return Err(GroupingError::format(
                "FORMAT.PATTERN_STEP",
                format!("'{}' should be 'first:last' or 'first:last:step'", entry),
            ));
        }
    };

    if step == 0 {
        return Err(GroupingError::format(
            "FORMAT.PATTERN_STEP",
            format!("step in '{}' must be positive", entry),
        ));
    }
    if first > last {
        return Err(GroupingError::range(
            "RANGE.PATTERN_RANGE",
            format!("range '{}' runs backwards", entry),
        ));
    }

    let first = check_index(first, row_count)?;
    let last = check_index(last, row_count)?;
    Ok((first..=last).step_by(step as usize).collect())
}

fn parse_bound(token: &str, entry: &str) -> ParserResult<i64> {
    token.parse::<u32>().map(i64::from).map_err(|_| {
        GroupingError::format(
            "FORMAT.PATTERN_INTEGER",
            format!("expected a row index in '{}', found '{}'", entry, token),
        )
    })
}

fn check_index(index: i64, row_count: usize) -> ParserResult<usize> {
    usize::try_from(index)
        .ok()
        .filter(|index| *index < row_count)
        .ok_or_else(|| {
            GroupingError::range(
                "RANGE.PATTERN_INDEX",
                format!(
                    "grouping pattern names row {} but the dataset has {} rows",
                    index, row_count
                ),
            )
        })
}

#[cfg(test)]
mod tests {
    use super::{parse_grouping_pattern, pattern_to_map_text};
    use crate::domain::GroupingErrorCategory;

    #[test]
    fn pattern_supports_joins_ranges_and_steps() {
        let groups = parse_grouping_pattern("0-2+5, 7:9, 10:14:2, 3", 20).expect("pattern");
        assert_eq!(
            groups,
            vec![
                vec![0, 1, 2, 5],
                vec![7],
                vec![8],
                vec![9],
                vec![10],
                vec![12],
                vec![14],
                vec![3],
            ]
        );
    }

    #[test]
    fn pattern_renders_flat_map_text() {
        let text = pattern_to_map_text("0+2, 4-5", 6).expect("pattern");
        assert_eq!(text, "2\n1\n2\n0 2\n2\n2\n4 5\n");
    }

    #[test]
    fn index_beyond_dataset_is_a_range_error() {
        let error = parse_grouping_pattern("1, 6", 6).expect_err("row 6 does not exist");
        assert_eq!(error.category(), GroupingErrorCategory::RangeError);
    }

    #[test]
    fn huge_ranges_are_rejected_before_expansion() {
        for pattern in ["0-2000000000", "1+3-2000000000", "0:4000000000", "0:4000000000:2"] {
            let error = parse_grouping_pattern(pattern, 4).expect_err(pattern);
            assert_eq!(error.category(), GroupingErrorCategory::RangeError, "{pattern}");
            assert_eq!(error.placeholder(), "RANGE.PATTERN_INDEX", "{pattern}");
        }
    }

    #[test]
    fn malformed_entries_are_format_errors() {
        for pattern in ["1,,2", "1:", "1:4:0", "a+1", "2-"] {
            let error = parse_grouping_pattern(pattern, 10).expect_err(pattern);
            assert_eq!(error.category(), GroupingErrorCategory::FormatError, "{pattern}");
        }
    }

    #[test]
    fn backwards_ranges_are_range_errors() {
        for pattern in ["5-3", "5:3"] {
            let error = parse_grouping_pattern(pattern, 10).expect_err(pattern);
            assert_eq!(error.category(), GroupingErrorCategory::RangeError, "{pattern}");
        }
    }
}
