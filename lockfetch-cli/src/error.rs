use std::path::PathBuf;
use std::process::ExitCode;

use lockfetch::ManifestError;

/// Categories of application errors that can be matched on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppErrorKind {
    /// Argument validation errors
    ArgValidation,
    /// General IO errors
    IO,
    /// Manifest file reading errors
    ManifestRead,
    /// Manifest file parsing errors
    ManifestParse,
    /// Used to indicate that one or more entries failed to fetch; those failures are reported as
    /// they are collected, so this variant only exists to produce the correct `ExitCode`.
    Fetch,
    /// The fetcher or its worker pool could not be set up
    Setup,
    /// Profile report writing errors
    ProfileWrite,
}

/// Internal error type that contains all application error variants.
#[derive(Debug, thiserror::Error)]
pub enum AppErrorInner {
    #[error("Argument error: {0}")]
    ArgValidation(String),
    #[error(transparent)]
    IO(#[from] std::io::Error),
    #[error("Failed to read manifest file: {}", manifest.display())]
    ManifestRead {
        manifest: PathBuf,
        #[source]
        err: ManifestError,
    },
    #[error("Failed to parse manifest file: {}", manifest.display())]
    ManifestParse {
        manifest: PathBuf,
        #[source]
        err: ManifestError,
    },
    #[error("Failed to fetch one or more entries")]
    Fetch,
    #[error("failed to start fetching")]
    Setup(#[source] lockfetch::Error),
    #[error("failed to write profile to {}", path.display())]
    ProfileWrite {
        path: PathBuf,
        #[source]
        err: serde_json::Error,
    },
}

/// The application-level error type, carrying the kind that decides the exit code alongside the
/// error reported to the user. Failures of individual entries are reported as soon as the run
/// finishes, so `Fetch` carries no detail.
///
/// This type uses the newtype pattern to wrap a boxed inner error, reducing stack size.
#[derive(Debug)]
pub struct AppError(Box<AppErrorInner>, AppErrorKind);

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.source()
    }
}

impl AppError {
    /// Create a new AppError with the given inner error and kind
    pub fn new(inner: AppErrorInner, kind: AppErrorKind) -> Self {
        Self(Box::new(inner), kind)
    }

    /// Get the error kind for pattern matching
    pub fn error_kind(&self) -> &AppErrorKind {
        &self.1
    }

    /// Create an argument validation error
    pub fn arg_validation(msg: String) -> Self {
        Self::new(AppErrorInner::ArgValidation(msg), AppErrorKind::ArgValidation)
    }

    /// Create a manifest error, distinguishing unreadable files from bad contents
    pub fn manifest(manifest: PathBuf, err: ManifestError) -> Self {
        match err {
            ManifestError::Read { .. } => Self::new(
                AppErrorInner::ManifestRead { manifest, err },
                AppErrorKind::ManifestRead,
            ),
            _ => Self::new(
                AppErrorInner::ManifestParse { manifest, err },
                AppErrorKind::ManifestParse,
            ),
        }
    }

    /// Create a fetch error
    pub fn fetch() -> Self {
        Self::new(AppErrorInner::Fetch, AppErrorKind::Fetch)
    }

    pub fn setup(err: lockfetch::Error) -> Self {
        Self::new(AppErrorInner::Setup(err), AppErrorKind::Setup)
    }

    pub fn profile_write(path: PathBuf, err: serde_json::Error) -> Self {
        Self::new(
            AppErrorInner::ProfileWrite { path, err },
            AppErrorKind::ProfileWrite,
        )
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::new(AppErrorInner::IO(err), AppErrorKind::IO)
    }
}

impl From<AppError> for ExitCode {
    fn from(error: AppError) -> Self {
        ExitCode::from(match error.error_kind() {
            AppErrorKind::Fetch => 1,
            AppErrorKind::ArgValidation => 2,
            _ => 3,
        })
    }
}
