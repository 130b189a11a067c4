//! Turns every supported grouping source into one canonical [`GroupMap`].
//!
//! [`GroupMap`]: crate::domain::GroupMap

mod loader;
mod map_file;
mod pattern;
mod source;
mod template;
mod xml;

pub use loader::{FileSystemLoader, GroupFileFormat, GroupFileLoader, InMemoryLoader};
pub use map_file::{MapFile, MapFileGroup, RangeToken, read_map_file};
pub use pattern::{parse_grouping_pattern, pattern_to_map_text};
pub use source::{ExplicitList, GroupSpecParser, GroupingSource, ParsedGroups};
pub use template::{TemplateGroups, groups_from_template};
pub use xml::{XmlGroup, XmlGroupFile, read_xml_group_file};
