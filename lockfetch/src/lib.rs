//! Fetch the pinned source trees listed in a `Gopkg.lock` manifest into a vendor directory.
//!
//! Each entry of the manifest names an import path and a concrete revision. For every entry the
//! crate picks the fastest transport that can produce that revision:
//!
//! - Import paths on the archive host (`github.com/<owner>/<repo>`) are downloaded as a single
//!   per-revision tarball and extracted, keeping only the subdirectories the entry lists in
//!   `packages`.
//! - Path-versioned aliases (`gopkg.in/...`) are cloned with `git` and hard-reset to the revision.
//! - Anything else is looked up with a `?go-get=1` request, whose `go-import` meta tag names the
//!   repository root and version-control system.
//!
//! Entries are fetched on a bounded pool of worker threads. A failing entry never stops the
//! others; the [`RunReport`] returned by [`Fetcher::fetch_all`] records what happened to each.
//!
//! # Usage
//!
//! Parse a manifest:
//!
//! ```rust
//! let lock = r#"
//! [[projects]]
//!   name = "github.com/pkg/errors"
//!   packages = ["."]
//!   revision = "645ef00459ed84a119197bfb8d8205042c6df63d"
//!   version = "v0.8.0"
//! "#;
//!
//! for entry in lockfetch::manifest::try_parse_toml(lock)? {
//!     println!("{entry}");
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! Classify a source without touching the network:
//!
//! ```rust
//! use lockfetch::{ResolvedSource, resolve::classify};
//!
//! assert_eq!(
//!     classify("github.com/pkg/errors"),
//!     ResolvedSource::ArchiveRepo { owner: "pkg".into(), repo: "errors".into() }
//! );
//! assert_eq!(classify("golang.org/x/net"), ResolvedSource::Unresolved);
//! ```
//!
//! Fetch every entry into `./vendor`:
//!
//! ```no_run
//! use lockfetch::{Config, Fetcher};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let entries = lockfetch::manifest::load("Gopkg.lock")?;
//! let fetcher = Fetcher::new(Config::new("vendor"))?;
//! let report = fetcher.fetch_all(&entries)?;
//! for failure in report.failures() {
//!     eprintln!("{failure}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod archive;
pub mod config;
pub mod discovery;
mod error;
pub mod fetch;
pub mod manifest;
pub mod parallel;
pub mod resolve;
mod target;
pub mod vcs;

#[doc(inline)]
pub use crate::config::{Config, Scheme};
#[doc(inline)]
pub use crate::discovery::{Discover, HttpDiscovery, MetaImport};
#[doc(inline)]
pub use crate::error::{Error, FetchError};
#[doc(inline)]
pub use crate::fetch::{Artefact, Fetcher, RunReport, UnitReport};
#[doc(inline)]
pub use crate::manifest::{AllowSet, Entry, ManifestError};
#[doc(inline)]
pub use crate::resolve::{Remote, ResolvedSource};
#[doc(inline)]
pub use crate::vcs::{GitCli, VcsClient};
