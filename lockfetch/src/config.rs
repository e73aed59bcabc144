//! Immutable run configuration.

use std::num::NonZeroUsize;
use std::path::{Component, Path, PathBuf};

use crate::error::Error;

/// Base URL of the archive host API serving per-revision tarballs.
pub const DEFAULT_ARCHIVE_API: &str = "https://api.github.com";

/// Default number of entries fetched at once.
pub const DEFAULT_PARALLELISM: NonZeroUsize = NonZeroUsize::new(4).unwrap();

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// URL scheme used for go-import discovery requests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Scheme {
    #[default]
    Https,
    Http,
}

impl std::fmt::Display for Scheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Https => write!(f, "https"),
            Self::Http => write!(f, "http"),
        }
    }
}

/// Settings shared by every fetch unit in a run.
///
/// Built once before the run starts and passed by reference; nothing in the crate mutates it
/// afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    vendor_root: PathBuf,
    verbose: bool,
    parallelism: NonZeroUsize,
    archive_api: String,
    discovery_scheme: Scheme,
    user_agent: String,
}

impl Config {
    /// A configuration writing entries below `vendor_root` with default settings.
    pub fn new<P: Into<PathBuf>>(vendor_root: P) -> Self {
        Self {
            vendor_root: vendor_root.into(),
            verbose: false,
            parallelism: DEFAULT_PARALLELISM,
            archive_api: DEFAULT_ARCHIVE_API.to_string(),
            discovery_scheme: Scheme::default(),
            user_agent: USER_AGENT.to_string(),
        }
    }

    /// Log every path written during extraction.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn with_parallelism(mut self, parallelism: NonZeroUsize) -> Self {
        self.parallelism = parallelism;
        self
    }

    /// Override the archive host API, e.g. to point at a mirror.
    pub fn with_archive_api<S: Into<String>>(mut self, url: S) -> Self {
        self.archive_api = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_discovery_scheme(mut self, scheme: Scheme) -> Self {
        self.discovery_scheme = scheme;
        self
    }

    pub fn with_user_agent<S: Into<String>>(mut self, user_agent: S) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn vendor_root(&self) -> &Path {
        &self.vendor_root
    }

    pub fn verbose(&self) -> bool {
        self.verbose
    }

    pub fn parallelism(&self) -> NonZeroUsize {
        self.parallelism
    }

    pub fn archive_api(&self) -> &str {
        &self.archive_api
    }

    pub fn discovery_scheme(&self) -> Scheme {
        self.discovery_scheme
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// The directory an entry is written to. Each component of the name maps onto a
    /// subdirectory of the vendor root. Empty and absolute names, and names starting with `.` or
    /// containing `..`, are rejected.
    pub fn target_dir<S: AsRef<str>>(&self, name: S) -> Result<PathBuf, Error> {
        let name = name.as_ref();
        let invalid = || Error::InvalidName {
            name: name.to_string(),
        };
        let mut relative = PathBuf::new();
        for component in Path::new(name).components() {
            match component {
                Component::Normal(segment) => relative.push(segment),
                _ => return Err(invalid()),
            }
        }
        if relative.as_os_str().is_empty() {
            return Err(invalid());
        }
        Ok(self.vendor_root.join(relative))
    }
}
