use std::num::NonZeroUsize;
use std::path::PathBuf;

use clap::Parser;
use lockfetch::{Config, Scheme};

use crate::error::AppError;

// Shamelessly borrowed from https://github.com/crate-ci/clap-cargo/blob/0378657ffdf2b67bcd6f1ab56e04a1322b92dd0e/src/style.rs
// thanks to https://stackoverflow.com/a/79614957
use anstyle::AnsiColor::*;
use anstyle::Effects;
use anstyle::Style;

const HEADER: Style = Green.on_default().effects(Effects::BOLD);
const USAGE: Style = Green.on_default().effects(Effects::BOLD);
const LITERAL: Style = Cyan.on_default().effects(Effects::BOLD);
const PLACEHOLDER: Style = Cyan.on_default();
const ERROR: Style = Red.on_default().effects(Effects::BOLD);
const VALID: Style = Cyan.on_default().effects(Effects::BOLD);
const INVALID: Style = Yellow.on_default().effects(Effects::BOLD);

const APP_STYLING: clap::builder::styling::Styles = clap::builder::styling::Styles::styled()
    .header(HEADER)
    .usage(USAGE)
    .literal(LITERAL)
    .placeholder(PLACEHOLDER)
    .error(ERROR)
    .valid(VALID)
    .invalid(INVALID);

#[derive(Debug, Parser)]
#[command(name = "lockfetch")]
#[command(version)]
#[command(about = "Fetch the pinned dependencies of a Gopkg.lock into a vendor directory")]
#[command(long_about = None)]
#[command(styles = APP_STYLING)]
#[command(term_width = 80)]
struct Args {
    /// Log every file written and the details of each resolution.
    #[arg(long, short = 'v')]
    verbose: bool,

    /// Maximum number of entries fetched at the same time.
    #[arg(long, short = 'p', value_name = "N", default_value_t = lockfetch::config::DEFAULT_PARALLELISM.get())]
    parallelism: usize,

    /// Write a JSON timing report of the run to this file.
    #[arg(long, value_name = "PATH")]
    profile: Option<PathBuf>,

    /// Path to the lock manifest.
    #[arg(long, value_name = "PATH", default_value = lockfetch::manifest::LOCK_FILE_NAME)]
    manifest: PathBuf,

    /// Directory the entries are fetched into.
    #[arg(long, value_name = "PATH", default_value = "vendor")]
    vendor_dir: PathBuf,

    /// Base URL of the archive host's API.
    #[arg(long, value_name = "URL", default_value = lockfetch::config::DEFAULT_ARCHIVE_API)]
    archive_api: String,

    /// Use plain http for go-import discovery.
    #[arg(long)]
    insecure: bool,
}

#[derive(Debug)]
pub struct ValidatedArgs {
    pub manifest: PathBuf,
    pub profile: Option<PathBuf>,
    pub config: Config,
}

impl TryFrom<Args> for ValidatedArgs {
    type Error = AppError;

    fn try_from(args: Args) -> Result<Self, Self::Error> {
        let parallelism = NonZeroUsize::new(args.parallelism).ok_or_else(|| {
            AppError::arg_validation("parallelism must be at least 1".to_string())
        })?;

        if !(args.archive_api.starts_with("https://") || args.archive_api.starts_with("http://")) {
            return Err(AppError::arg_validation(format!(
                "archive API must be an http(s) URL: {}",
                args.archive_api
            )));
        }

        if args.vendor_dir.exists() && !args.vendor_dir.is_dir() {
            return Err(AppError::arg_validation(format!(
                "vendor directory is not a directory: {}",
                args.vendor_dir.display()
            )));
        }

        let scheme = if args.insecure {
            Scheme::Http
        } else {
            Scheme::Https
        };

        Ok(ValidatedArgs {
            manifest: args.manifest,
            profile: args.profile,
            config: Config::new(args.vendor_dir)
                .with_verbose(args.verbose)
                .with_parallelism(parallelism)
                .with_archive_api(args.archive_api)
                .with_discovery_scheme(scheme),
        })
    }
}

pub fn parse() -> Result<ValidatedArgs, AppError> {
    ValidatedArgs::try_from(Args::parse())
}
