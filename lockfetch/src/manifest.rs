//! Decoding the `Gopkg.lock` manifest into [`Entry`] values.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// The lock manifest read from the working directory.
pub const LOCK_FILE_NAME: &str = "Gopkg.lock";

/// Errors encountered when reading the lock manifest.
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    /// The manifest could not be read.
    #[error("failed to read lock manifest {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        err: std::io::Error,
    },

    /// A toml deserialisation error occurred.
    #[error(transparent)]
    TomlInvalid(#[from] toml::de::Error),

    /// A project was declared without the revision it is pinned to.
    #[error("project '{name}' has no revision")]
    MissingRevision { name: String },
}

/// One `[[projects]]` record of the lock manifest.
#[derive(Debug, Clone, serde::Deserialize, serde::Serialize, PartialEq, Eq)]
pub struct Entry {
    /// The import path, which is also the entry's location below the vendor root.
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    /// The commit every transport pins to.
    #[serde(default)]
    pub revision: String,
    /// Informational only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Explicit remote, overriding the one derived from the name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default)]
    pub packages: Vec<String>,
}

impl Entry {
    pub fn new<N: Into<String>, R: Into<String>>(name: N, revision: R) -> Self {
        Self {
            name: name.into(),
            branch: None,
            revision: revision.into(),
            version: None,
            source: None,
            packages: Vec::new(),
        }
    }

    pub fn with_source<S: Into<String>>(mut self, source: S) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_packages<I, S>(mut self, packages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.packages = packages.into_iter().map(Into::into).collect();
        self
    }

    /// The string the resolver classifies: the explicit source if given, else the name.
    pub fn source(&self) -> &str {
        match self.source.as_deref() {
            Some(source) if !source.is_empty() => source,
            _ => &self.name,
        }
    }

    /// The top-level directories of the archive to retain.
    pub fn allow_set(&self) -> AllowSet {
        AllowSet::from_packages(&self.packages)
    }
}

impl std::fmt::Display for Entry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)?;
        if let Some(source) = &self.source {
            write!(f, " (source: {source})")?;
        }
        write!(f, " @ {}", self.revision)?;
        if let Some(version) = &self.version {
            write!(f, " [{version}]")?;
        } else if let Some(branch) = &self.branch {
            write!(f, " [branch: {branch}]")?;
        }
        Ok(())
    }
}

/// Names of the immediate child directories of an archive root which extraction retains.
///
/// An empty set retains everything. The root package `"."` is stored as the empty name: it keeps
/// the set non-empty (so child directories are filtered) without matching any child.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowSet(BTreeSet<String>);

impl AllowSet {
    pub fn from_packages<I, S>(packages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(
            packages
                .into_iter()
                .map(|pkg| {
                    let pkg = pkg.as_ref().trim_start_matches("./");
                    match pkg.split('/').next() {
                        Some(".") | None => String::new(),
                        Some(first) => first.to_string(),
                    }
                })
                .collect(),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether the child directory `name` is retained.
    pub fn allows(&self, name: &str) -> bool {
        self.0.is_empty() || (!name.is_empty() && self.0.contains(name))
    }
}

#[derive(Debug, serde::Deserialize)]
struct Lock {
    #[serde(default)]
    projects: Vec<Entry>,
}

/// Parse the contents of a lock manifest into its entries, in declaration order.
pub fn try_parse_toml<S: AsRef<str>>(toml_str: S) -> Result<Vec<Entry>, ManifestError> {
    let lock: Lock = toml::from_str(toml_str.as_ref())?;
    if let Some(entry) = lock.projects.iter().find(|e| e.revision.trim().is_empty()) {
        return Err(ManifestError::MissingRevision {
            name: entry.name.clone(),
        });
    }
    Ok(lock.projects)
}

/// Read and parse the lock manifest at `path`.
pub fn load<P: AsRef<Path>>(path: P) -> Result<Vec<Entry>, ManifestError> {
    let path = path.as_ref();
    let document = std::fs::read_to_string(path).map_err(|err| ManifestError::Read {
        path: path.to_path_buf(),
        err,
    })?;
    try_parse_toml(document)
}

#[cfg(test)]
use ManifestError::*;


#[cfg(test)]
mod test_entry {
    use super::*;

    #[test]
    fn source_defaults_to_name() {
        let entry = Entry::new("github.com/foo/bar", "abc");
        assert_eq!(entry.source(), "github.com/foo/bar");
        let entry = entry.with_source("https://github.com/fork/bar.git");
        assert_eq!(entry.source(), "https://github.com/fork/bar.git");
    }

    #[test]
    fn allow_set_without_packages_retains_everything() {
        let allow = Entry::new("x", "abc").allow_set();
        assert!(allow.is_empty());
        assert!(allow.allows("anything"));
    }

    #[test]
    fn allow_set_keeps_first_segment_of_nested_packages() {
        let allow = AllowSet::from_packages(["foo", "bar/baz"]);
        assert!(allow.allows("foo"));
        assert!(allow.allows("bar"));
        assert!(!allow.allows("baz"));
    }

    #[test]
    fn root_package_filters_every_child() {
        let allow = AllowSet::from_packages(["."]);
        assert!(!allow.is_empty());
        assert!(!allow.allows("internal"));
        assert!(!allow.allows(""));
    }
}
