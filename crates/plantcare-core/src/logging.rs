//! Subscriber setup for binaries. Library code only emits `tracing` events;
//! whoever owns the process decides where they go.
use tracing_subscriber::EnvFilter;

use crate::config::LoggingSettings;

/// Install the global subscriber. `RUST_LOG` wins over the configured filter.
/// Returns false when a subscriber was already installed.
pub fn init(settings: &LoggingSettings) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr);
    if settings.json { builder.json().try_init().is_ok() } else { builder.try_init().is_ok() }
}
