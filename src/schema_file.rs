use std::fmt;
use std::path::{Path, PathBuf};

/// A schema file the user picked or dropped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub path: PathBuf,
    pub name: String,
    pub size_bytes: u64,
}

impl SelectedFile {
    pub fn new(path: impl Into<PathBuf>, size_bytes: u64) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self {
            path,
            name,
            size_bytes,
        }
    }

    /// Build from a path on disk, reading its size
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let metadata = std::fs::metadata(path)?;
        Ok(Self::new(path, metadata.len()))
    }

    /// Size formatted the way the upload panel shows it, e.g. `12.5 KB`
    pub fn size_display(&self) -> String {
        format!("{:.1} KB", self.size_bytes as f64 / 1024.0)
    }
}

/// How a file reached the upload controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileSource {
    Dropped,
    Picker,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    WrongSuffix,
    FileAlreadyAttached,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::WrongSuffix => write!(f, "not a schema file"),
            RejectReason::FileAlreadyAttached => write!(f, "a file is already attached"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileDecision {
    Accept,
    Reject(RejectReason),
}

/// Accept/reject predicate for schema files
#[derive(Debug, Clone)]
pub struct SchemaFileFilter {
    suffix: String,
}

impl Default for SchemaFileFilter {
    fn default() -> Self {
        Self::new(".sql")
    }
}

impl SchemaFileFilter {
    pub fn new(suffix: &str) -> Self {
        Self {
            suffix: suffix.to_string(),
        }
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    /// Decide whether `name` can be uploaded given the current attachment state
    pub fn check(&self, name: &str, file_attached: bool) -> FileDecision {
        if file_attached {
            FileDecision::Reject(RejectReason::FileAlreadyAttached)
        } else if !self.matches(name) {
            FileDecision::Reject(RejectReason::WrongSuffix)
        } else {
            FileDecision::Accept
        }
    }

    pub fn matches(&self, name: &str) -> bool {
        name.ends_with(&self.suffix)
    }

    /// Database name derived from a file name: suffix stripped, lowercased
    pub fn database_name(&self, file_name: &str) -> String {
        file_name
            .strip_suffix(self.suffix.as_str())
            .unwrap_or(file_name)
            .to_lowercase()
    }
}

/// Split pasted text into candidate paths.
///
/// Terminals paste dropped files as whitespace or newline separated paths,
/// optionally quoted, with spaces escaped as `\ `, or as `file://` URLs.
pub fn paths_from_drop(text: &str) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), c) => current.push(c),
            (None, '\'' | '"') => quote = Some(c),
            (None, '\\') => {
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            }
            (None, c) if c.is_whitespace() => {
                if !current.is_empty() {
                    paths.push(normalize_dropped(&current));
                    current.clear();
                }
            }
            (None, c) => current.push(c),
        }
    }
    if !current.is_empty() {
        paths.push(normalize_dropped(&current));
    }
    paths
}

fn normalize_dropped(raw: &str) -> PathBuf {
    PathBuf::from(raw.strip_prefix("file://").unwrap_or(raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_sql_suffix() {
        let filter = SchemaFileFilter::default();
        assert_eq!(filter.check("sales.sql", false), FileDecision::Accept);
    }

    #[test]
    fn test_rejects_other_suffixes() {
        let filter = SchemaFileFilter::default();
        for name in ["sales.csv", "sales.sql.bak", "sales", "sales.SQL", "notes.txt"] {
            assert_eq!(
                filter.check(name, false),
                FileDecision::Reject(RejectReason::WrongSuffix),
                "{} should be rejected",
                name
            );
        }
    }

    #[test]
    fn test_rejects_when_file_attached() {
        let filter = SchemaFileFilter::default();
        assert_eq!(
            filter.check("sales.sql", true),
            FileDecision::Reject(RejectReason::FileAlreadyAttached)
        );
    }

    #[test]
    fn test_database_name_strips_suffix_and_lowercases() {
        let filter = SchemaFileFilter::default();
        assert_eq!(filter.database_name("Sales.sql"), "sales");
        assert_eq!(filter.database_name("NorthWind_Seed.sql"), "northwind_seed");
        assert_eq!(filter.database_name("my.sql.dump.sql"), "my.sql.dump");
    }

    #[test]
    fn test_custom_suffix() {
        let filter = SchemaFileFilter::new(".ddl");
        assert!(filter.matches("schema.ddl"));
        assert!(!filter.matches("schema.sql"));
        assert_eq!(filter.database_name("Schema.ddl"), "schema");
    }

    #[test]
    fn test_paths_from_drop_handles_quotes_and_escapes() {
        let paths = paths_from_drop("'/tmp/my file.sql' /tmp/other\\ one.sql\nfile:///tmp/x.sql");
        assert_eq!(
            paths,
            vec![
                PathBuf::from("/tmp/my file.sql"),
                PathBuf::from("/tmp/other one.sql"),
                PathBuf::from("/tmp/x.sql"),
            ]
        );
    }

    #[test]
    fn test_selected_file_name_and_size() {
        let file = SelectedFile::new("/data/sales.sql", 2048);
        assert_eq!(file.name, "sales.sql");
        assert_eq!(file.size_display(), "2.0 KB");
    }
}
