//! The per-entry fetch unit and the report of a whole run.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::archive;
use crate::config::Config;
use crate::discovery::{Discover, HttpDiscovery};
use crate::error::{Error, FetchError};
use crate::manifest::Entry;
use crate::parallel;
use crate::resolve::{Remote, Resolver};
use crate::vcs::{self, GitCli, VcsClient};

/// What a successful fetch unit left on disk.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "transport", rename_all = "lowercase")]
pub enum Artefact {
    /// Extracted from a per-revision tarball.
    Archive {
        path: PathBuf,
        owner: String,
        repo: String,
        entries: usize,
    },
    /// Cloned and reset with the version-control client.
    Clone { path: PathBuf, url: String },
}

impl Artefact {
    /// Short name of the transport that produced this artefact.
    pub fn transport(&self) -> &'static str {
        match self {
            Artefact::Archive { .. } => "archive",
            Artefact::Clone { .. } => "clone",
        }
    }
}

impl AsRef<Path> for Artefact {
    fn as_ref(&self) -> &Path {
        match self {
            Artefact::Archive { path, .. } | Artefact::Clone { path, .. } => path,
        }
    }
}

/// The outcome of one entry in a run.
#[derive(Debug)]
pub struct UnitReport {
    pub name: String,
    pub result: Result<Artefact, FetchError>,
    pub elapsed: Duration,
}

/// Outcomes of every entry in manifest order.
#[derive(Debug)]
pub struct RunReport {
    pub units: Vec<UnitReport>,
    pub elapsed: Duration,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.units.iter().all(|u| u.result.is_ok())
    }

    pub fn successes(&self) -> impl Iterator<Item = (&str, &Artefact)> {
        self.units
            .iter()
            .filter_map(|u| u.result.as_ref().ok().map(|a| (u.name.as_str(), a)))
    }

    pub fn failures(&self) -> impl Iterator<Item = &FetchError> {
        self.units.iter().filter_map(|u| u.result.as_ref().err())
    }
}

/// Resolves entries and dispatches them to the archive or clone transport.
pub struct Fetcher<D = HttpDiscovery, V = GitCli> {
    config: Config,
    client: reqwest::blocking::Client,
    resolver: Resolver<D>,
    vcs: V,
}

impl Fetcher {
    /// A fetcher using HTTP discovery and the `git` binary.
    pub fn new(config: Config) -> Result<Self, Error> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(config.user_agent())
            .build()?;
        let discovery = HttpDiscovery::new(client.clone(), config.discovery_scheme());
        Ok(Self::with_parts(config, client, discovery, GitCli::default()))
    }
}

impl<D: Discover, V: VcsClient> Fetcher<D, V> {
    pub fn with_parts(
        config: Config,
        client: reqwest::blocking::Client,
        discovery: D,
        vcs: V,
    ) -> Self {
        Self {
            config,
            client,
            resolver: Resolver::new(discovery),
            vcs,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Fetch one entry into its target directory below the vendor root.
    pub fn fetch(&self, entry: &Entry) -> Result<Artefact, Error> {
        if entry.revision.trim().is_empty() {
            return Err(Error::MissingRevision {
                name: entry.name.clone(),
            });
        }
        let path = self.config.target_dir(&entry.name)?;
        match self.resolver.resolve(entry)? {
            Remote::Archive { owner, repo } => {
                tracing::info!(
                    name = %entry.name,
                    source = %entry.source(),
                    revision = %entry.revision,
                    "Downloading from github"
                );
                let url =
                    archive::tarball_url(self.config.archive_api(), &owner, &repo, &entry.revision);
                let body = archive::download(&self.client, &url)?;
                let entries = archive::extract(
                    body.as_slice(),
                    &path,
                    &entry.allow_set(),
                    self.config.verbose(),
                )?;
                Ok(Artefact::Archive {
                    path,
                    owner,
                    repo,
                    entries,
                })
            }
            Remote::Raw { url } => {
                tracing::info!(
                    name = %entry.name,
                    %url,
                    revision = %entry.revision,
                    "Cloning"
                );
                vcs::fetch_raw(&self.vcs, &url, &path, &entry.revision)?;
                Ok(Artefact::Clone { path, url })
            }
        }
    }

    /// Fetch every entry, at most [`Config::parallelism`] at a time. One entry failing does not
    /// stop the others; inspect the returned report for failures.
    pub fn fetch_all(&self, entries: &[Entry]) -> Result<RunReport, Error> {
        let start = Instant::now();
        let outcomes = parallel::run_bounded(self.config.parallelism(), entries, |entry| {
            self.fetch(entry)
        })?;
        let units = entries
            .iter()
            .zip(outcomes)
            .map(|(entry, outcome)| {
                if let Err(err) = &outcome.result {
                    tracing::debug!(name = %entry.name, error = %err, "fetch failed");
                }
                UnitReport {
                    name: entry.name.clone(),
                    result: outcome
                        .result
                        .map_err(|err| FetchError::new(entry.name.clone(), err)),
                    elapsed: outcome.elapsed,
                }
            })
            .collect();
        Ok(RunReport {
            units,
            elapsed: start.elapsed(),
        })
    }
}

#[cfg(test)]
mod test_fetcher {
    use super::*;
    use crate::discovery::MetaImport;
    use crate::vcs::fake::{Call, FakeVcs};

    struct Svn;

    impl Discover for Svn {
        fn discover(&self, path: &str) -> Result<MetaImport, Error> {
            Ok(MetaImport {
                prefix: path.to_string(),
                vcs: "svn".to_string(),
                repo_root: "https://svn.example.org/repo".to_string(),
            })
        }
    }

    fn fetcher<D: Discover>(root: &Path, discovery: D) -> Fetcher<D, FakeVcs> {
        Fetcher::with_parts(
            Config::new(root),
            reqwest::blocking::Client::new(),
            discovery,
            FakeVcs::default(),
        )
    }

    #[test]
    fn alias_host_is_cloned_and_reset() {
        let tmp = tempfile::tempdir().unwrap();
        let fetcher = fetcher(tmp.path(), Svn);
        let artefact = fetcher
            .fetch(&Entry::new("gopkg.in/yaml.v2", "5420a8b"))
            .unwrap();
        let target = tmp.path().join("gopkg.in/yaml.v2");
        assert_eq!(
            artefact,
            Artefact::Clone {
                path: target.clone(),
                url: "https://gopkg.in/yaml.v2".to_string()
            }
        );
        assert_eq!(fetcher.vcs.calls.lock().unwrap().len(), 2);
        assert!(target.join("CLONED_FROM").is_file());
    }

    #[test]
    fn unsupported_vcs_fails_before_clone() {
        let tmp = tempfile::tempdir().unwrap();
        let fetcher = fetcher(tmp.path(), Svn);
        let result = fetcher.fetch(&Entry::new("example.org/pkg", "abc"));
        assert!(matches!(result, Err(Error::UnsupportedVcs { vcs }) if vcs == "svn"));
        assert!(fetcher.vcs.calls.lock().unwrap().is_empty());
        assert!(!tmp.path().join("example.org").exists());
    }

    #[test]
    fn empty_revision_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let fetcher = fetcher(tmp.path(), Svn);
        let result = fetcher.fetch(&Entry::new("gopkg.in/yaml.v2", ""));
        assert!(matches!(result, Err(Error::MissingRevision { .. })));
        assert!(fetcher.vcs.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn names_outside_own_directory_are_rejected_before_any_io() {
        let tmp = tempfile::tempdir().unwrap();
        let sibling = tmp.path().join("github.com/other/dep/keep.go");
        std::fs::create_dir_all(sibling.parent().unwrap()).unwrap();
        std::fs::write(&sibling, "package dep").unwrap();

        let fetcher = fetcher(tmp.path(), Svn);
        for name in ["", ".", "/", "github.com/..", "../outside"] {
            let entry = Entry::new(name, "abc").with_source("gopkg.in/yaml.v2");
            let result = fetcher.fetch(&entry);
            assert!(
                matches!(result, Err(Error::InvalidName { .. })),
                "{name:?} gave {result:?}"
            );
        }
        assert!(fetcher.vcs.calls.lock().unwrap().is_empty());
        assert!(sibling.is_file());
    }

    #[test]
    fn fetch_all_reports_every_entry_in_order() {
        let tmp = tempfile::tempdir().unwrap();
        let fetcher = fetcher(tmp.path(), Svn);
        let entries = vec![
            Entry::new("gopkg.in/yaml.v2", "5420a8b"),
            Entry::new("example.org/pkg", "abc"),
            Entry::new("gopkg.in/check.v1", "788fd78"),
        ];
        let report = fetcher.fetch_all(&entries).unwrap();
        let names: Vec<_> = report.units.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, vec!["gopkg.in/yaml.v2", "example.org/pkg", "gopkg.in/check.v1"]);
        assert!(!report.is_success());
        assert_eq!(report.successes().count(), 2);
        let failures: Vec<_> = report.failures().collect();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].name, "example.org/pkg");
        let clones = fetcher
            .vcs
            .calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| matches!(c, Call::Clone { .. }))
            .count();
        assert_eq!(clones, 2);
    }
}
