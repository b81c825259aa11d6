//! Tracing subscriber setup
//!
//! `RUST_LOG` takes precedence over the configured level.

use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;

/// Build the filter from `RUST_LOG`, else from the configured level
pub fn env_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber
///
/// `format = "json"` emits one JSON object per event; anything else uses the
/// human-readable formatter. Fails if a global subscriber is already set.
pub fn init(config: &LoggingConfig) -> Result<(), TryInitError> {
    let json = config.format.eq_ignore_ascii_case("json");

    tracing_subscriber::registry()
        .with(env_filter(config))
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(|| tracing_subscriber::fmt::layer()))
        .try_init()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_fails() {
        let config = LoggingConfig::default();
        let _ = init(&config);
        assert!(init(&config).is_err());
    }
}
