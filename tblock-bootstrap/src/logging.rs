//! Tracing subscriber setup.

use tracing::Level;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Installs the global subscriber. `RUST_LOG` wins over `verbose` when set.
///
/// Output goes to stderr so the installer owns stdout.
pub fn init(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_ascii_lowercase()));

    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}
