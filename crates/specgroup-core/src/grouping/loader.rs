use crate::domain::{GroupingError, GroupingResult};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// The single file-read the engine performs.
pub trait GroupFileLoader {
    fn load(&self, path: &Path) -> GroupingResult<String>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct FileSystemLoader;

impl GroupFileLoader for FileSystemLoader {
    fn load(&self, path: &Path) -> GroupingResult<String> {
        fs::read_to_string(path).map_err(|source| {
            GroupingError::io_system(
                "IO.GROUP_FILE_READ",
                format!("failed to read group file '{}': {}", path.display(), source),
            )
        })
    }
}

/// Serves group files from memory, keyed by path.
#[derive(Debug, Default, Clone)]
pub struct InMemoryLoader {
    files: HashMap<PathBuf, String>,
}

impl InMemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: impl Into<PathBuf>, contents: impl Into<String>) -> Self {
        self.files.insert(path.into(), contents.into());
        self
    }
}

impl GroupFileLoader for InMemoryLoader {
    fn load(&self, path: &Path) -> GroupingResult<String> {
        self.files.get(path).cloned().ok_or_else(|| {
            GroupingError::io_system(
                "IO.GROUP_FILE_READ",
                format!("group file '{}' is not available", path.display()),
            )
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupFileFormat {
    Xml,
    Flat,
}

impl GroupFileFormat {
    /// `.xml` in any case selects the XML reader; every other extension is flat text.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|extension| extension.to_str()) {
            Some(extension) if extension.eq_ignore_ascii_case("xml") => Self::Xml,
            _ => Self::Flat,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{FileSystemLoader, GroupFileFormat, GroupFileLoader, InMemoryLoader};
    use crate::domain::GroupingErrorCategory;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    #[test]
    fn format_is_chosen_by_extension() {
        assert_eq!(GroupFileFormat::from_path(Path::new("a/b.XML")), GroupFileFormat::Xml);
        assert_eq!(GroupFileFormat::from_path(Path::new("b.map")), GroupFileFormat::Flat);
        assert_eq!(GroupFileFormat::from_path(Path::new("groups")), GroupFileFormat::Flat);
    }

    #[test]
    fn file_system_loader_reads_and_reports_missing_files() {
        let temp = TempDir::new().expect("tempdir should be created");
        let path = temp.path().join("groups.map");
        fs::write(&path, "1\n1\n1\n0\n").expect("fixture should be written");

        assert_eq!(
            FileSystemLoader.load(&path).expect("file should load"),
            "1\n1\n1\n0\n"
        );

        let error = FileSystemLoader
            .load(&temp.path().join("missing.map"))
            .expect_err("missing file should fail");
        assert_eq!(error.category(), GroupingErrorCategory::IoSystemError);
    }

    #[test]
    fn in_memory_loader_serves_registered_paths() {
        let loader = InMemoryLoader::new().with_file("g.map", "0\n");
        assert_eq!(loader.load(Path::new("g.map")).expect("registered"), "0\n");
        assert!(loader.load(Path::new("other.map")).is_err());
    }
}
