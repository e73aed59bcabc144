use std::process::ExitCode;

use lockfetch::{Artefact, Fetcher, RunReport};

mod args;
mod error;
mod logging;
mod profile;

use crate::error::AppError;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("❌ {err}");
            print_causes(&err);
            err.into()
        }
    }
}

fn run() -> Result<(), AppError> {
    let args = args::parse()?;
    logging::init(args.config.verbose());
    tracing::debug!(?args, "parsed arguments");

    let entries = lockfetch::manifest::load(&args.manifest)
        .map_err(|err| AppError::manifest(args.manifest.clone(), err))?;

    std::fs::create_dir_all(args.config.vendor_root())?;
    println!("Download start:");
    let fetcher = Fetcher::new(args.config).map_err(AppError::setup)?;
    let report = fetcher.fetch_all(&entries).map_err(AppError::setup)?;
    print_report(&report);

    if let Some(path) = &args.profile {
        profile::Profile::from(&report)
            .write(path)
            .map_err(|err| AppError::profile_write(path.clone(), err))?;
        tracing::info!(path = %path.display(), "wrote profile");
    }

    if report.is_success() {
        Ok(())
    } else {
        Err(AppError::fetch())
    }
}

fn print_report(report: &RunReport) {
    for unit in &report.units {
        match &unit.result {
            Ok(Artefact::Archive { path, entries, .. }) => {
                println!(
                    "✅ 📦 Extracted {} ({entries} entries) into {}",
                    unit.name,
                    path.display()
                );
            }
            Ok(Artefact::Clone { path, url }) => {
                println!("✅ 🔗 Cloned {url} into {}", path.display());
            }
            Err(fetch_error) => {
                if let Some(output) = fetch_error.err.captured_output() {
                    eprintln!("{}", output.trim_end());
                }
                eprintln!("❌ {fetch_error}");
                print_causes(fetch_error);
            }
        }
    }
    let fetched = report.successes().count();
    println!(
        "\n🎉 Fetched {fetched} of {} entries in {:.2}s",
        report.units.len(),
        report.elapsed.as_secs_f64()
    );
    println!("Download done.");
}

fn print_causes(err: &dyn std::error::Error) {
    let mut source = err.source();
    while let Some(cause) = source {
        eprintln!("   caused by: {cause}");
        source = cause.source();
    }
}
