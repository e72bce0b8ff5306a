//! Tracing subscriber setup for the binary.
//!
//! Logs go to stderr so stdout carries only command output.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::error::{CommandError, Result};

/// Level used when neither `--log-level` nor `RUST_LOG` is set.
const DEFAULT_LEVEL: &str = "warn";

/// Picks the filter directive: explicit level, then `--verbose`, then
/// `RUST_LOG`, then [`DEFAULT_LEVEL`].
#[must_use]
pub fn filter_directive(log_level: Option<&str>, verbose: bool) -> String {
    match (log_level, verbose) {
        (Some(level), _) => level.to_string(),
        (None, true) => "debug".to_string(),
        (None, false) => {
            std::env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_LEVEL.to_string())
        }
    }
}

/// Installs the global subscriber.
///
/// # Errors
///
/// Returns [`CommandError::InvalidArgument`] for an unparseable filter and
/// [`CommandError::ExecutionFailed`] if a subscriber is already installed.
pub fn init_logging(log_level: Option<&str>, verbose: bool, no_color: bool) -> Result<()> {
    let directive = filter_directive(log_level, verbose);
    let env_filter = EnvFilter::try_new(&directive)
        .map_err(|e| CommandError::InvalidArgument(format!("invalid log filter '{directive}': {e}")))?;

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_ansi(!no_color && std::env::var_os("NO_COLOR").is_none());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| CommandError::ExecutionFailed(format!("failed to init logging: {e}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_level_wins() {
        assert_eq!(filter_directive(Some("search_agent=trace"), true), "search_agent=trace");
    }

    #[test]
    fn test_verbose_is_debug() {
        assert_eq!(filter_directive(None, true), "debug");
    }

    #[test]
    fn test_invalid_filter_rejected() {
        let result = init_logging(Some("search_agent=loud"), false, true);
        assert!(matches!(
            result,
            Err(crate::error::Error::Command(CommandError::InvalidArgument(_)))
        ));
    }
}
