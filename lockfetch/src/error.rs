use crate::discovery::MetaImport;

/// The main error enum for this crate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),
    #[error("failed getting tarball: status {status} (URL: {url})")]
    HttpStatus {
        status: reqwest::StatusCode,
        url: String,
    },
    #[error("failed to parse go-import metadata for '{path}'")]
    Discovery {
        path: String,
        #[source]
        err: quick_xml::Error,
    },
    #[error("expected exactly one go-import for '{path}' but found {}: [{}]", candidates.len(), candidates.iter().map(|c| c.to_string()).collect::<Vec<_>>().join(", "))]
    AmbiguousImports {
        path: String,
        candidates: Vec<MetaImport>,
    },
    #[error("unsupported VCS type: {vcs}")]
    UnsupportedVcs { vcs: String },
    #[error("archive entry '{}' escapes the target directory", path.display())]
    UnsafeEntryPath { path: std::path::PathBuf },
    #[error("archive entry '{}' has unsupported type {kind:?}", path.display())]
    UnsupportedEntry {
        path: std::path::PathBuf,
        kind: tar::EntryType,
    },
    #[error("entry name '{name}' does not name a directory below the vendor root")]
    InvalidName { name: String },
    #[error("entry '{name}' has no revision")]
    MissingRevision { name: String },
    #[error("Command '{command}' exited with status {status}")]
    Subprocess {
        command: String,
        status: std::process::ExitStatus,
        output: String,
    },
    #[error(transparent)]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
    #[error("fetch unit panicked: {message}")]
    Panicked { message: String },
}

impl Error {
    /// Output captured from an external process, if this error carries any.
    pub fn captured_output(&self) -> Option<&str> {
        match self {
            Error::Subprocess { output, .. } if !output.trim().is_empty() => Some(output),
            _ => None,
        }
    }
}

/// A failure to fetch one named entry.
#[derive(Debug, thiserror::Error)]
#[error("failed to fetch '{name}'")]
pub struct FetchError {
    pub name: String,
    #[source]
    pub err: Error,
}

impl FetchError {
    pub fn new<S: Into<String>>(name: S, err: Error) -> Self {
        Self {
            name: name.into(),
            err,
        }
    }
}
