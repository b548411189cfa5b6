//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber once at startup
//! - Let `RUST_LOG` override the configured level
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - Human-readable fmt output on stderr

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::ObservabilityConfig;

/// Filter built from `observability.log_level`, used verbatim.
///
/// Accepts a bare level (`info`) or full directives
/// (`warn,http_monitor=debug`).
pub fn config_filter(config: &ObservabilityConfig) -> EnvFilter {
    EnvFilter::new(&config.log_level)
}

/// Install the global subscriber. Fails if one is already installed.
pub fn init_logging(config: &ObservabilityConfig) -> Result<(), tracing_subscriber::util::TryInitError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| config_filter(config));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn observability(log_level: &str) -> ObservabilityConfig {
        ObservabilityConfig {
            log_level: log_level.to_string(),
            ..ObservabilityConfig::default()
        }
    }

    #[test]
    fn test_bare_level_applies_to_every_target() {
        assert_eq!(config_filter(&observability("info")).to_string(), "info");
    }

    #[test]
    fn test_directives_pass_through() {
        let filter = config_filter(&observability("warn,http_monitor=debug")).to_string();

        assert!(filter.contains("http_monitor=debug"));
        assert!(filter.split(',').any(|directive| directive == "warn"));
    }
}
