//! Tracing initialisation for pipeline hosts.
//!
//! Call [`init_tracing`] once at program start. Safe to call more than
//! once; the global subscriber can only be set once per process and
//! subsequent calls are silently ignored.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Initialise the global tracing subscriber.
///
/// * `json` — when `true`, emit newline-delimited JSON log lines for
///   log aggregation.
/// * `level` — default verbosity when `RUST_LOG` is not set.
///
/// Respects the `RUST_LOG` environment variable for fine-grained
/// filtering.
pub fn init_tracing(json: bool, level: Level) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));

    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_target(false).json())
            .try_init()
            .ok();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_target(false))
            .try_init()
            .ok();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reinit_is_silently_ignored() {
        // First call installs the global subscriber; the second would
        // panic if the fallible init were not swallowed.
        init_tracing(false, Level::DEBUG);
        init_tracing(true, Level::INFO);

        tracing::info!("subscriber available after repeated init");
    }
}
