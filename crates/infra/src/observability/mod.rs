//! Logging setup
//!
//! The library only emits `tracing` events; binaries and tests that want to
//! see them call [`init_tracing`] once at startup.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::ClientConfig;

/// Level used when `RUST_LOG` is unset
pub fn default_directive(debug: bool) -> &'static str {
    if debug {
        "debug"
    } else {
        "info"
    }
}

/// Install a global `fmt` subscriber filtered by `RUST_LOG`
///
/// Falls back to `debug` or `info` depending on `debug`. Returns `false`
/// if a global subscriber was already installed.
pub fn init_tracing(debug: bool) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(debug)));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .try_init()
        .is_ok()
}

/// [`init_tracing`] using the config's `debug` flag
pub fn init_tracing_for(config: &ClientConfig) -> bool {
    init_tracing(config.debug)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_flag_selects_directive() {
        assert_eq!(default_directive(true), "debug");
        assert_eq!(default_directive(false), "info");
    }

    #[test]
    fn second_init_is_rejected() {
        let _ = init_tracing(false);
        assert!(!init_tracing(true));
    }
}
