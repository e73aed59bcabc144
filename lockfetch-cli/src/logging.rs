//! Diagnostic logging to stderr.

use std::io;

use tracing_subscriber::{filter::EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// The filter used when `RUST_LOG` is unset.
fn default_directives(verbose: bool) -> String {
    let level = if verbose { "debug" } else { "info" };
    format!("warn,lockfetch={level},lockfetch_cli={level}")
}

/// Install a compact stderr subscriber. `RUST_LOG` takes precedence over `verbose`.
pub fn init(verbose: bool) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(verbose)));
    let layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_writer(io::stderr)
        .with_target(false)
        .with_thread_names(true);
    tracing_subscriber::registry()
        .with(env_filter)
        .with(layer)
        .init();
}

#[cfg(test)]
mod test_logging {
    use super::*;

    #[test]
    fn verbose_lowers_level() {
        assert_eq!(
            default_directives(false),
            "warn,lockfetch=info,lockfetch_cli=info"
        );
        assert_eq!(
            default_directives(true),
            "warn,lockfetch=debug,lockfetch_cli=debug"
        );
    }
}
