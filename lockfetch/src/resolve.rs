//! Classifying an entry's source into the transport used to fetch it.
//!
//! Rules are tried in order and the first match wins:
//!
//! 1. `github.com/<owner>/<repo>` anywhere in the source: [`ResolvedSource::ArchiveRepo`].
//! 2. `gopkg.in/<path>`: [`ResolvedSource::RawRemote`] over `https`.
//! 3. Anything else is [`ResolvedSource::Unresolved`] and needs go-import discovery.
//!
//! Only the last rule performs network I/O, and only inside [`Resolver::resolve`].

use std::sync::LazyLock;

use regex::Regex;

use crate::discovery::Discover;
use crate::error::Error;
use crate::manifest::Entry;

static ARCHIVE_HOST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"github\.com/([^/ \n]+)/([^/ \n]+)").expect("archive host pattern is valid")
});

static PATH_VERSIONED_ALIAS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"gopkg\.in/(.+)").expect("alias pattern is valid"));

/// The transport chosen for an entry.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResolvedSource {
    /// Download a per-revision tarball from the archive host.
    ArchiveRepo { owner: String, repo: String },
    /// Clone the remote with git.
    RawRemote { url: String },
    /// Needs discovery before it can be fetched.
    Unresolved,
}

impl std::fmt::Display for ResolvedSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ArchiveRepo { owner, repo } => write!(f, "github.com/{owner}/{repo}"),
            Self::RawRemote { url } => write!(f, "{url}"),
            Self::Unresolved => write!(f, "<unresolved>"),
        }
    }
}

/// Match the archive-host pattern, returning the whole match, owner and repo.
pub(crate) fn archive_reference(source: &str) -> Option<(&str, &str, &str)> {
    let captures = ARCHIVE_HOST.captures(source)?;
    let whole = captures.get(0)?.as_str();
    Some((whole, captures.get(1)?.as_str(), captures.get(2)?.as_str()))
}

/// Classify a source string without touching the network.
pub fn classify(source: &str) -> ResolvedSource {
    if let Some((_, owner, repo)) = archive_reference(source) {
        return ResolvedSource::ArchiveRepo {
            owner: owner.to_string(),
            repo: repo.to_string(),
        };
    }
    if PATH_VERSIONED_ALIAS.is_match(source) {
        let url = if source.starts_with("https://") {
            source.to_string()
        } else {
            format!("https://{source}")
        };
        return ResolvedSource::RawRemote { url };
    }
    ResolvedSource::Unresolved
}

/// A remote that can be fetched without further lookups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Remote {
    Archive { owner: String, repo: String },
    Raw { url: String },
}

impl From<Remote> for ResolvedSource {
    fn from(remote: Remote) -> Self {
        match remote {
            Remote::Archive { owner, repo } => ResolvedSource::ArchiveRepo { owner, repo },
            Remote::Raw { url } => ResolvedSource::RawRemote { url },
        }
    }
}

/// Turns entries into concrete [`Remote`]s, running discovery when classification alone cannot
/// decide.
#[derive(Debug, Clone)]
pub struct Resolver<D> {
    discovery: D,
}

impl<D: Discover> Resolver<D> {
    pub fn new(discovery: D) -> Self {
        Self { discovery }
    }

    /// Resolve `entry` to either an archive or a raw remote.
    pub fn resolve(&self, entry: &Entry) -> Result<Remote, Error> {
        let source = entry.source();
        match classify(source) {
            ResolvedSource::ArchiveRepo { owner, repo } => Ok(Remote::Archive { owner, repo }),
            ResolvedSource::RawRemote { url } => Ok(Remote::Raw { url }),
            ResolvedSource::Unresolved => {
                let meta = self.discovery.discover(source)?;
                tracing::debug!(name = %entry.name, import = %meta, "discovered go-import");
                if !meta.vcs.eq_ignore_ascii_case("git") {
                    return Err(Error::UnsupportedVcs { vcs: meta.vcs });
                }
                Ok(match archive_reference(&meta.repo_root) {
                    Some((_, owner, repo)) => Remote::Archive {
                        owner: owner.to_string(),
                        repo: repo.to_string(),
                    },
                    None => Remote::Raw {
                        url: meta.repo_root,
                    },
                })
            }
        }
    }
}

#[cfg(test)]
mod test_classify {
    use super::*;

    fn archive(owner: &str, repo: &str) -> ResolvedSource {
        ResolvedSource::ArchiveRepo {
            owner: owner.to_string(),
            repo: repo.to_string(),
        }
    }

    #[test]
    fn archive_host_yields_owner_and_repo() {
        assert_eq!(classify("github.com/pkg/errors"), archive("pkg", "errors"));
        assert_eq!(
            classify("https://github.com/sirupsen/logrus"),
            archive("sirupsen", "logrus")
        );
    }

    #[test]
    fn archive_host_ignores_deeper_path() {
        assert_eq!(
            classify("github.com/golang/protobuf/proto"),
            archive("golang", "protobuf")
        );
    }

    #[test]
    fn archive_host_wins_over_alias() {
        assert_eq!(classify("github.com/go-yaml/gopkg.in"), archive("go-yaml", "gopkg.in"));
    }

    #[test]
    fn alias_host_gets_https_scheme() {
        assert_eq!(
            classify("gopkg.in/yaml.v2"),
            ResolvedSource::RawRemote {
                url: "https://gopkg.in/yaml.v2".to_string()
            }
        );
        assert_eq!(
            classify("https://gopkg.in/yaml.v2"),
            ResolvedSource::RawRemote {
                url: "https://gopkg.in/yaml.v2".to_string()
            }
        );
    }

    #[test]
    fn other_hosts_need_discovery() {
        assert_eq!(classify("golang.org/x/net"), ResolvedSource::Unresolved);
        assert_eq!(classify("github.com/incomplete"), ResolvedSource::Unresolved);
    }
}

#[cfg(test)]
mod test_resolver {
    use super::*;
    use crate::discovery::MetaImport;

    struct Fixed(Option<MetaImport>);

    impl Discover for Fixed {
        fn discover(&self, path: &str) -> Result<MetaImport, Error> {
            self.0.clone().ok_or_else(|| Error::AmbiguousImports {
                path: path.to_string(),
                candidates: Vec::new(),
            })
        }
    }

    fn meta(vcs: &str, root: &str) -> Fixed {
        Fixed(Some(MetaImport {
            prefix: "golang.org/x/net".to_string(),
            vcs: vcs.to_string(),
            repo_root: root.to_string(),
        }))
    }

    #[test]
    fn discovered_git_remote_is_raw() {
        let resolver = Resolver::new(meta("git", "https://go.googlesource.com/net"));
        let resolved = resolver.resolve(&Entry::new("golang.org/x/net", "abc")).unwrap();
        assert_eq!(
            resolved,
            Remote::Raw {
                url: "https://go.googlesource.com/net".to_string()
            }
        );
    }

    #[test]
    fn discovered_archive_host_prefers_archive() {
        let resolver = Resolver::new(meta("git", "https://github.com/golang/net"));
        let resolved = resolver.resolve(&Entry::new("golang.org/x/net", "abc")).unwrap();
        assert_eq!(
            resolved,
            Remote::Archive {
                owner: "golang".to_string(),
                repo: "net".to_string()
            }
        );
    }

    #[test]
    fn discovered_vcs_is_case_insensitive() {
        let resolver = Resolver::new(meta("GIT", "https://example.org/repo"));
        assert!(resolver.resolve(&Entry::new("example.org/pkg", "abc")).is_ok());
    }

    #[test]
    fn discovered_svn_is_unsupported() {
        let resolver = Resolver::new(meta("svn", "https://svn.example.org/repo"));
        let result = resolver.resolve(&Entry::new("example.org/pkg", "abc"));
        assert!(matches!(result, Err(Error::UnsupportedVcs { vcs }) if vcs == "svn"));
    }

    #[test]
    fn discovery_failure_is_propagated() {
        let resolver = Resolver::new(Fixed(None));
        let result = resolver.resolve(&Entry::new("example.org/pkg", "abc"));
        assert!(matches!(result, Err(Error::AmbiguousImports { .. })));
    }

    #[test]
    fn explicit_source_overrides_name() {
        let resolver = Resolver::new(Fixed(None));
        let entry = Entry::new("example.org/pkg", "abc").with_source("github.com/fork/pkg");
        assert_eq!(
            resolver.resolve(&entry).unwrap(),
            Remote::Archive {
                owner: "fork".to_string(),
                repo: "pkg".to_string()
            }
        );
    }

    #[test]
    fn remote_converts_to_resolved_source() {
        assert_eq!(
            ResolvedSource::from(Remote::Raw {
                url: "https://gopkg.in/yaml.v2".to_string()
            }),
            classify("gopkg.in/yaml.v2")
        );
        assert_eq!(
            ResolvedSource::from(Remote::Archive {
                owner: "pkg".to_string(),
                repo: "errors".to_string()
            }),
            classify("github.com/pkg/errors")
        );
    }
}
