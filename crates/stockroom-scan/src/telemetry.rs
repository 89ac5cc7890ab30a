//! Tracing subscriber setup for binaries embedding the scanner.
//!
//! ## Log Levels
//! - `RUST_LOG=debug` - Show debug messages
//! - `RUST_LOG=stockroom_scan::scanner=trace` - Trace the state machine only
//! - Default: `info,stockroom=debug`

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset or invalid.
pub const DEFAULT_FILTER: &str = "info,stockroom=debug";

fn env_filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

/// Installs the global fmt subscriber.
///
/// Returns false if a subscriber was already installed.
pub fn init_tracing() -> bool {
    try_init_tracing(DEFAULT_FILTER)
}

/// Like [`init_tracing`] with a custom fallback filter.
pub fn try_init_tracing(default_filter: &str) -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(default_filter))
        .with_target(true)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_rejected() {
        init_tracing();
        assert!(!init_tracing());
    }
}
