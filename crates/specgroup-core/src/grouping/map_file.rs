//! Reader for flat text group files.
//!
//! ```text
//! 2          # number of groups
//! 1          # group number
//! 3          # number of spectra in the group
//! 1 2-3
//! 7
//! 1
//! 4
//! ```
//!
//! Everything after `#` on a line is ignored and blank lines are skipped.
//! A spectrum list may span several lines and continues until the declared
//! count is reached.

use crate::domain::{GroupingError, ParserResult};
use crate::progress::PhaseProgress;
use std::ops::RangeInclusive;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapFileGroup {
    pub group_number: i32,
    /// Line holding the group number.
    pub line: usize,
    pub numbers: Vec<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapFile {
    pub declared_group_count: usize,
    pub groups: Vec<MapFileGroup>,
}

pub fn read_map_file(
    source_name: &str,
    text: &str,
    progress: &PhaseProgress<'_>,
) -> ParserResult<MapFile> {
    let mut cursor = LineCursor::new(text);

    let Some((count_line, count_text)) = cursor.next_content_line(progress)? else {
        return Err(GroupingError::format(
            "FORMAT.MAP_FILE_EMPTY",
            format!("group file '{}' does not contain a group count", source_name),
        ));
    };
    let declared = parse_single_integer(source_name, count_line, count_text, "group count")?;
    let declared_group_count = usize::try_from(declared).map_err(|_| {
        GroupingError::format(
            "FORMAT.MAP_FILE_COUNT",
            format!(
                "group count {} at line {} of '{}' is negative",
                declared, count_line, source_name
            ),
        )
    })?;

    let mut groups = Vec::new();
    while let Some((group_line, group_text)) = cursor.next_content_line(progress)? {
        let group_number =
            parse_single_integer(source_name, group_line, group_text, "group number")?;

        let Some((size_line, size_text)) = cursor.next_content_line(progress)? else {
            return Err(GroupingError::format(
                "FORMAT.MAP_FILE_TRUNCATED",
                format!(
                    "premature end of '{}' after line {}: group {} has no spectrum count",
                    source_name, group_line, group_number
                ),
            ));
        };
        let declared_size =
            parse_single_integer(source_name, size_line, size_text, "spectrum count")?;
        let expected = usize::try_from(declared_size).map_err(|_| {
            GroupingError::format(
                "FORMAT.MAP_FILE_COUNT",
                format!(
                    "spectrum count {} at line {} of '{}' is negative",
                    declared_size, size_line, source_name
                ),
            )
        })?;

        let mut numbers = Vec::new();
        let mut last_line = size_line;
        while numbers.len() < expected {
            let Some((list_line, list_text)) = cursor.next_content_line(progress)? else {
                return Err(GroupingError::format(
                    "FORMAT.MAP_FILE_COUNT",
                    format!(
                        "premature end of '{}' after line {}: group {} declares {} spectra \
                         but lists {}",
                        source_name,
                        last_line,
                        group_number,
                        expected,
                        numbers.len()
                    ),
                ));
            };
            last_line = list_line;
            for token in list_text.split_whitespace() {
                let range = RangeToken::parse(token, list_line, source_name)?;
                let remaining = (expected - numbers.len()) as u64;
                if range.value_count() > remaining {
                    return Err(GroupingError::format(
                        "FORMAT.MAP_FILE_COUNT",
                        format!(
                            "line {} of '{}' brings group {} to {} spectra but {} were declared",
                            list_line,
                            source_name,
                            group_number,
                            numbers.len() as u64 + range.value_count(),
                            expected
                        ),
                    ));
                }
                numbers.extend(range.iter());
            }
        }

        groups.push(MapFileGroup {
            group_number,
            line: group_line,
            numbers,
        });
    }

    if groups.len() != declared_group_count {
        warn!(
            file = source_name,
            declared = declared_group_count,
            found = groups.len(),
            "group file declares a different number of groups than it contains"
        );
    }
    progress.finish();

    Ok(MapFile {
        declared_group_count,
        groups,
    })
}

/// One list entry of a group file: `a`, or the inclusive range `a-b`.
///
/// Only the bounds are stored so callers can check the size of a range
/// before expanding it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeToken {
    pub first: i32,
    pub last: i32,
}

impl RangeToken {
    pub fn parse(token: &str, line: usize, source_name: &str) -> ParserResult<Self> {
        let token = token.trim();
        let Some((first, last)) = token.split_once('-') else {
            let value = parse_integer(token, line, source_name)?;
            return Ok(Self {
                first: value,
                last: value,
            });
        };

        if first.trim().is_empty() || last.trim().is_empty() {
            return Err(GroupingError::format(
                "FORMAT.MAP_FILE_RANGE",
                format!(
                    "range '{}' at line {} of '{}' is missing a bound",
                    token, line, source_name
                ),
            ));
        }

        let first = parse_integer(first, line, source_name)?;
        let last = parse_integer(last, line, source_name)?;
        if first > last {
            return Err(GroupingError::range(
                "RANGE.MAP_FILE_RANGE",
                format!(
                    "range '{}' at line {} of '{}' runs backwards",
                    token, line, source_name
                ),
            ));
        }
        Ok(Self { first, last })
    }

    /// Number of values in the range; never zero.
    pub fn value_count(&self) -> u64 {
        (i64::from(self.last) - i64::from(self.first) + 1) as u64
    }

    pub fn iter(&self) -> RangeInclusive<i32> {
        self.first..=self.last
    }
}

fn parse_integer(token: &str, line: usize, source_name: &str) -> ParserResult<i32> {
    let token = token.trim();
    token.parse::<i32>().map_err(|_| {
        GroupingError::format(
            "FORMAT.MAP_FILE_INTEGER",
            format!(
                "expected an integer at line {} of '{}', found '{}'",
                line, source_name, token
            ),
        )
    })
}

fn parse_single_integer(
    source_name: &str,
    line: usize,
    text: &str,
    what: &str,
) -> ParserResult<i32> {
    let mut tokens = text.split_whitespace();
    let (Some(token), None) = (tokens.next(), tokens.next()) else {
        return Err(GroupingError::format(
            "FORMAT.MAP_FILE_INTEGER",
            format!(
                "expected a single integer {} at line {} of '{}', found '{}'",
                what, line, source_name, text
            ),
        ));
    };
    parse_integer(token, line, source_name)
}

struct LineCursor<'t> {
    lines: Vec<&'t str>,
    position: usize,
}

impl<'t> LineCursor<'t> {
    fn new(text: &'t str) -> Self {
        Self {
            lines: text.lines().collect(),
            position: 0,
        }
    }

    /// Next line with content after comment stripping, with its 1-based number.
    fn next_content_line(
        &mut self,
        progress: &PhaseProgress<'_>,
    ) -> ParserResult<Option<(usize, &'t str)>> {
        while self.position < self.lines.len() {
            progress.interruption_point()?;
            let raw = self.lines[self.position];
            self.position += 1;
            progress.advance(self.position as f64 / self.lines.len() as f64);

            let content = raw.split_once('#').map_or(raw, |(before, _)| before).trim();
            if !content.is_empty() {
                return Ok(Some((self.position, content)));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::{RangeToken, read_map_file};
    use crate::domain::GroupingErrorCategory;
    use crate::progress::{CancellationToken, NoProgress, PhaseProgress};

    fn read(text: &str) -> crate::domain::ParserResult<super::MapFile> {
        read_map_file("groups.map", text, &PhaseProgress::new(&NoProgress, "parsing", 0.0, 0.25))
    }

    #[test]
    fn range_token_expands_inclusively() {
        let range = RangeToken::parse("3-5", 1, "f").expect("range");
        assert_eq!(range.value_count(), 3);
        assert_eq!(range.iter().collect::<Vec<_>>(), vec![3, 4, 5]);
        let single = RangeToken::parse("8", 1, "f").expect("single");
        assert_eq!(single.value_count(), 1);
        assert_eq!(single.iter().collect::<Vec<_>>(), vec![8]);
    }

    #[test]
    fn backwards_range_is_a_range_error() {
        let error = RangeToken::parse("5-3", 4, "f").expect_err("5-3 is backwards");
        assert_eq!(error.category(), GroupingErrorCategory::RangeError);
        assert!(error.message().contains("line 4"));
    }

    #[test]
    fn dangling_dash_is_a_format_error() {
        for token in ["3-", "-", "-3"] {
            let error = RangeToken::parse(token, 2, "f").expect_err("dangling dash");
            assert_eq!(error.category(), GroupingErrorCategory::FormatError, "{token}");
        }
    }

    #[test]
    fn reads_groups_spanning_lines_and_comments() {
        let map = read(
            "# detector groups\n\
             2\n\
             \n\
             10   # first\n\
             4\n\
             1 2\n\
             \n\
             5-6\n\
             20\n\
             1\n\
             9\n",
        )
        .expect("map file should parse");

        assert_eq!(map.declared_group_count, 2);
        assert_eq!(map.groups.len(), 2);
        assert_eq!(map.groups[0].group_number, 10);
        assert_eq!(map.groups[0].line, 4);
        assert_eq!(map.groups[0].numbers, vec![1, 2, 5, 6]);
        assert_eq!(map.groups[1].numbers, vec![9]);
    }

    #[test]
    fn group_count_mismatch_is_not_fatal() {
        let map = read("5\n1\n1\n3\n").expect("count mismatch is informational");
        assert_eq!(map.declared_group_count, 5);
        assert_eq!(map.groups.len(), 1);
    }

    #[test]
    fn repeated_group_numbers_stay_separate() {
        let map = read("2\n1\n1\n3\n1\n1\n4\n").expect("map file should parse");
        assert_eq!(map.groups.len(), 2);
        assert_eq!(map.groups[0].group_number, 1);
        assert_eq!(map.groups[1].group_number, 1);
    }

    #[test]
    fn overlong_spectrum_list_reports_its_line() {
        let error = read("1\n1\n2\n1 2 3\n").expect_err("three spectra for a group of two");
        assert_eq!(error.category(), GroupingErrorCategory::FormatError);
        assert!(error.message().contains("line 4"), "{}", error.message());
        assert!(error.message().contains("groups.map"));
    }

    #[test]
    fn range_larger_than_the_declared_count_is_rejected_before_expansion() {
        let error = read("1\n1\n2\n0-2147483000\n").expect_err("range exceeds two spectra");
        assert_eq!(error.category(), GroupingErrorCategory::FormatError);
        assert_eq!(error.placeholder(), "FORMAT.MAP_FILE_COUNT");
        assert!(error.message().contains("line 4"), "{}", error.message());
    }

    #[test]
    fn huge_declared_count_without_spectra_is_truncated() {
        let error = read("1\n1\n2147483000\n1 2\n").expect_err("list ends early");
        assert_eq!(error.category(), GroupingErrorCategory::FormatError);
        assert!(error.message().contains("after line 4"), "{}", error.message());
    }

    #[test]
    fn truncated_spectrum_list_is_a_format_error() {
        let error = read("1\n1\n3\n1 2\n").expect_err("missing third spectrum");
        assert_eq!(error.category(), GroupingErrorCategory::FormatError);
        assert!(error.message().contains("after line 4"), "{}", error.message());
    }

    #[test]
    fn non_integer_reports_line_number() {
        let error = read("1\n1\n2\n1 x\n").expect_err("x is not a spectrum number");
        assert_eq!(error.category(), GroupingErrorCategory::FormatError);
        assert!(error.message().contains("line 4"));
        assert!(error.message().contains("'x'"));
    }

    #[test]
    fn empty_file_is_rejected() {
        let error = read("# nothing here\n\n").expect_err("empty file");
        assert_eq!(error.category(), GroupingErrorCategory::FormatError);
    }

    #[test]
    fn cancellation_stops_reading() {
        let token = CancellationToken::new();
        token.cancel();
        let error = read_map_file(
            "groups.map",
            "1\n1\n1\n1\n",
            &PhaseProgress::new(&token, "parsing", 0.0, 0.25),
        )
        .expect_err("cancelled before the first line");
        assert!(error.is_cancelled());
    }
}
