//! Cloning and pinning repositories with an external version-control client.

use std::ffi::{OsStr, OsString};
use std::path::Path;
use std::process::{Command, Stdio};

use crate::error::Error;
use crate::target;

/// The operations a raw fetch needs from a version-control client.
pub trait VcsClient: Send + Sync {
    /// Clone `url` into the (not yet existing) directory `into`.
    fn clone_repo(&self, url: &str, into: &Path) -> Result<(), Error>;

    /// Hard-reset the working tree of `repo` to `revision`.
    fn reset_hard(&self, repo: &Path, revision: &str) -> Result<(), Error>;
}

/// Runs the `git` binary found on `PATH`, inheriting whatever authentication it is configured
/// with.
#[derive(Debug, Clone)]
pub struct GitCli {
    program: OsString,
}

impl Default for GitCli {
    fn default() -> Self {
        Self {
            program: OsString::from("git"),
        }
    }
}

impl GitCli {
    /// Use a specific git executable.
    pub fn with_program<S: Into<OsString>>(program: S) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn describe(&self, args: &[&OsStr]) -> String {
        std::iter::once(self.program.as_os_str())
            .chain(args.iter().copied())
            .map(|arg| arg.to_string_lossy())
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn run(&self, args: &[&OsStr], dir: Option<&Path>) -> Result<(), Error> {
        let mut git = Command::new(&self.program);
        git.args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .stdin(Stdio::null());
        if let Some(dir) = dir {
            git.current_dir(dir);
        }
        let result = git.output()?;
        if result.status.success() {
            return Ok(());
        }
        let mut output = String::from_utf8_lossy(&result.stdout).into_owned();
        output.push_str(&String::from_utf8_lossy(&result.stderr));
        Err(Error::Subprocess {
            command: self.describe(args),
            status: result.status,
            output,
        })
    }
}

impl VcsClient for GitCli {
    fn clone_repo(&self, url: &str, into: &Path) -> Result<(), Error> {
        self.run(
            &[OsStr::new("clone"), OsStr::new(url), into.as_os_str()],
            None,
        )
    }

    fn reset_hard(&self, repo: &Path, revision: &str) -> Result<(), Error> {
        self.run(
            &[OsStr::new("reset"), OsStr::new("--hard"), OsStr::new(revision)],
            Some(repo),
        )
    }
}

/// Replace `target` with a clone of `url` pinned at `revision`.
///
/// A failed clone or reset leaves whatever the client managed to write in place.
pub fn fetch_raw<V: VcsClient + ?Sized>(
    vcs: &V,
    url: &str,
    target: &Path,
    revision: &str,
) -> Result<(), Error> {
    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent)?;
    }
    target::remove_if_present(target)?;
    vcs.clone_repo(url, target)?;
    vcs.reset_hard(target, revision)
}

#[cfg(test)]
pub(crate) mod fake {
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;

    use super::VcsClient;
    use crate::error::Error;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Call {
        Clone { url: String, into: PathBuf },
        Reset { repo: PathBuf, revision: String },
    }

    /// Records calls and writes a marker file instead of cloning.
    #[derive(Debug, Default)]
    pub struct FakeVcs {
        pub calls: Mutex<Vec<Call>>,
        pub fail_reset: bool,
    }

    impl VcsClient for FakeVcs {
        fn clone_repo(&self, url: &str, into: &Path) -> Result<(), Error> {
            self.calls.lock().unwrap().push(Call::Clone {
                url: url.to_string(),
                into: into.to_path_buf(),
            });
            std::fs::create_dir_all(into)?;
            std::fs::write(into.join("CLONED_FROM"), url)?;
            Ok(())
        }

        fn reset_hard(&self, repo: &Path, revision: &str) -> Result<(), Error> {
            self.calls.lock().unwrap().push(Call::Reset {
                repo: repo.to_path_buf(),
                revision: revision.to_string(),
            });
            if self.fail_reset {
                return Err(Error::Subprocess {
                    command: format!("git reset --hard {revision}"),
                    status: failed_status(),
                    output: format!("fatal: ambiguous argument '{revision}'"),
                });
            }
            Ok(())
        }
    }

    #[cfg(unix)]
    fn failed_status() -> std::process::ExitStatus {
        use std::os::unix::process::ExitStatusExt;
        std::process::ExitStatus::from_raw(128 << 8)
    }

    #[cfg(windows)]
    fn failed_status() -> std::process::ExitStatus {
        use std::os::windows::process::ExitStatusExt;
        std::process::ExitStatus::from_raw(128)
    }
}
