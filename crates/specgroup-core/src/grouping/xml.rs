//! Reader for XML detector-grouping files.
//!
//! ```xml
//! <detector-grouping instrument="MUSR">
//!   <group ID="1" name="forward">
//!     <detids val="1-16, 33"/>
//!   </group>
//!   <group name="backward">
//!     <ids val="17-32"/>
//!   </group>
//! </detector-grouping>
//! ```

use super::map_file::RangeToken;
use crate::domain::{GroupingError, ParserResult};
use crate::progress::PhaseProgress;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use tracing::warn;

/// Upper bound on the IDs a single `a-b` entry may expand to.
pub const MAX_RANGE_LEN: u64 = 1 << 20;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct XmlGroup {
    pub id: i32,
    pub name: Option<String>,
    pub detector_ids: Vec<i32>,
    pub spectrum_numbers: Vec<i32>,
    /// `<component>` children; geometry lookups are not performed here.
    pub ignored_components: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct XmlGroupFile {
    pub instrument: Option<String>,
    pub groups: Vec<XmlGroup>,
}

pub fn read_xml_group_file(
    source_name: &str,
    text: &str,
    progress: &PhaseProgress<'_>,
) -> ParserResult<XmlGroupFile> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    let mut file = XmlGroupFile::default();
    let mut saw_root = false;
    let mut current: Option<usize> = None;
    let mut next_auto_id = 1;

    loop {
        progress.interruption_point()?;
        let (element, has_children) = match reader.read_event() {
            Ok(Event::Start(element)) => (element, true),
            Ok(Event::Empty(element)) => (element, false),
            Ok(Event::End(element)) => {
                if element.name().as_ref() == b"group" {
                    current = None;
                }
                continue;
            }
            Ok(Event::Eof) => break,
            Ok(_) => continue,
            Err(error) => {
                let line = line_at(text, reader.error_position() as usize);
                return Err(malformed(source_name, line, error.to_string()));
            }
        };
        let offset = reader.buffer_position() as usize;
        let line = line_at(text, offset);
        progress.advance(offset as f64 / text.len().max(1) as f64);

        match element.name().as_ref() {
            b"detector-grouping" => {
                saw_root = true;
                file.instrument = attribute(&element, &["instrument"], source_name, line)?;
            }
            b"group" => {
                let explicit_id = attribute(&element, &["ID", "id"], source_name, line)?
                    .map(|value| {
                        value.trim().parse::<i32>().map_err(|_| {
                            let detail = format!("group ID '{}' is not an integer", value);
                            malformed(source_name, line, detail)
                        })
                    })
                    .transpose()?;
                let id = explicit_id.unwrap_or(next_auto_id);
                next_auto_id = next_auto_id.max(id.saturating_add(1));

                let position = match file.groups.iter().position(|group| group.id == id) {
                    Some(position) => {
                        warn!(
                            file = source_name,
                            group = id,
                            line,
                            "group ID repeated; pooling into the first group"
                        );
                        position
                    }
                    None => {
                        file.groups.push(XmlGroup {
                            id,
                            name: attribute(&element, &["name"], source_name, line)?,
                            ..XmlGroup::default()
                        });
                        file.groups.len() - 1
                    }
                };
                current = has_children.then_some(position);
            }
            tag @ (b"detids" | b"ids" | b"component") => {
                let tag_name = String::from_utf8_lossy(tag).into_owned();
                let Some(position) = current else {
                    return Err(malformed(
                        source_name,
                        line,
                        format!("<{}> appears outside a <group>", tag_name),
                    ));
                };
                let group = &mut file.groups[position];

                if tag == b"component" {
                    group.ignored_components += 1;
                    warn!(
                        file = source_name,
                        group = group.id,
                        line,
                        "component references are not resolved; skipping"
                    );
                    continue;
                }

                let Some(value) = attribute(&element, &["val"], source_name, line)? else {
                    return Err(malformed(
                        source_name,
                        line,
                        format!("<{}> is missing its 'val' attribute", tag_name),
                    ));
                };
                let numbers = parse_id_list(&value, line, source_name)?;
                if tag == b"detids" {
                    group.detector_ids.extend(numbers);
                } else {
                    group.spectrum_numbers.extend(numbers);
                }
            }
            _ => {}
        }
    }

    if !saw_root {
        return Err(GroupingError::format(
            "FORMAT.XML_ROOT",
            format!("'{}' has no <detector-grouping> root element", source_name),
        ));
    }
    progress.finish();
    Ok(file)
}

fn parse_id_list(value: &str, line: usize, source_name: &str) -> ParserResult<Vec<i32>> {
    let mut numbers = Vec::new();
    for token in value.split(',').map(str::trim).filter(|token| !token.is_empty()) {
        let range = RangeToken::parse(token, line, source_name)?;
        if range.value_count() > MAX_RANGE_LEN {
            return Err(malformed(
                source_name,
                line,
                format!("range '{}' spans more than {} IDs", token, MAX_RANGE_LEN),
            ));
        }
        numbers.extend(range.iter());
    }
    Ok(numbers)
}

fn attribute(
    element: &BytesStart<'_>,
    keys: &[&str],
    source_name: &str,
    line: usize,
) -> ParserResult<Option<String>> {
    for attribute in element.attributes() {
        let attribute =
            attribute.map_err(|error| malformed(source_name, line, error.to_string()))?;
        if keys.iter().any(|key| attribute.key.as_ref() == key.as_bytes()) {
            let value = attribute
                .unescape_value()
                .map_err(|error| malformed(source_name, line, error.to_string()))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

fn line_at(text: &str, offset: usize) -> usize {
    let end = offset.min(text.len());
    text.as_bytes()[..end].iter().filter(|byte| **byte == b'\n').count() + 1
}

fn malformed(source_name: &str, line: usize, detail: String) -> GroupingError {
    GroupingError::format(
        "FORMAT.XML_GROUP_FILE",
        format!("malformed group file '{}' near line {}: {}", source_name, line, detail),
    )
}

#[cfg(test)]
mod tests {
    use super::read_xml_group_file;
    use crate::domain::GroupingErrorCategory;
    use crate::progress::{NoProgress, PhaseProgress};

    fn read(text: &str) -> crate::domain::ParserResult<super::XmlGroupFile> {
        let progress = PhaseProgress::new(&NoProgress, "parsing", 0.0, 0.25);
        read_xml_group_file("groups.xml", text, &progress)
    }

    #[test]
    fn reads_detector_and_spectrum_groups() {
        let file = read(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<detector-grouping instrument="MUSR">
  <group ID="3" name="fwd">
    <detids val="1-3, 7"/>
  </group>
  <group name="bwd">
    <ids val="10,11"/>
    <detids val="20"/>
  </group>
</detector-grouping>
"#,
        )
        .expect("xml should parse");

        assert_eq!(file.instrument.as_deref(), Some("MUSR"));
        assert_eq!(file.groups.len(), 2);
        assert_eq!(file.groups[0].id, 3);
        assert_eq!(file.groups[0].name.as_deref(), Some("fwd"));
        assert_eq!(file.groups[0].detector_ids, vec![1, 2, 3, 7]);
        assert_eq!(file.groups[1].id, 4);
        assert_eq!(file.groups[1].spectrum_numbers, vec![10, 11]);
        assert_eq!(file.groups[1].detector_ids, vec![20]);
    }

    #[test]
    fn repeated_ids_pool_into_first_group() {
        let file = read(
            r#"<detector-grouping>
  <group ID="1"><detids val="1"/></group>
  <group ID="1"><detids val="2"/></group>
</detector-grouping>"#,
        )
        .expect("xml should parse");

        assert_eq!(file.groups.len(), 1);
        assert_eq!(file.groups[0].detector_ids, vec![1, 2]);
    }

    #[test]
    fn components_are_counted_not_resolved() {
        let file = read(concat!(
            r#"<detector-grouping><group><component val="bank1"/>"#,
            r#"<detids val="5"/></group></detector-grouping>"#,
        ))
        .expect("xml should parse");
        assert_eq!(file.groups[0].id, 1);
        assert_eq!(file.groups[0].ignored_components, 1);
        assert_eq!(file.groups[0].detector_ids, vec![5]);
    }

    #[test]
    fn ids_outside_a_group_are_rejected_with_line() {
        let error = read("<detector-grouping>\n<detids val=\"1\"/>\n</detector-grouping>")
            .expect_err("detids must be inside a group");
        assert_eq!(error.category(), GroupingErrorCategory::FormatError);
        assert!(error.message().contains("line 2"), "{}", error.message());
    }

    #[test]
    fn bad_ranges_propagate_their_category() {
        let error = read(concat!(
            r#"<detector-grouping><group><ids val="9-4"/></group>"#,
            "</detector-grouping>",
        ))
        .expect_err("backwards range");
        assert_eq!(error.category(), GroupingErrorCategory::RangeError);
    }

    #[test]
    fn oversized_ranges_are_format_errors() {
        let error = read(concat!(
            "<detector-grouping>\n",
            "<group><detids val=\"0-2147483000\"/></group>\n",
            "</detector-grouping>",
        ))
        .expect_err("range is far too long");
        assert_eq!(error.category(), GroupingErrorCategory::FormatError);
        assert!(error.message().contains("line 2"), "{}", error.message());
    }

    #[test]
    fn unrelated_xml_is_rejected() {
        let error = read("<workbook/>").expect_err("wrong root element");
        assert_eq!(error.category(), GroupingErrorCategory::FormatError);
    }

    #[test]
    fn mismatched_tags_are_format_errors() {
        let error = read("<detector-grouping><group></detector-grouping>")
            .expect_err("unclosed group");
        assert_eq!(error.category(), GroupingErrorCategory::FormatError);
    }
}
