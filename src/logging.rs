//! `tracing` subscriber setup.

use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LoggingConfig;

/// Installs the global subscriber, writing to stderr so stdout stays free for results.
///
/// `RUST_LOG` takes precedence over the configured level when set. Calling this more than
/// once is harmless: later calls leave the first subscriber in place.
pub fn init(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = fmt().with_env_filter(filter).with_writer(std::io::stderr).with_target(false);
    let _ = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}
