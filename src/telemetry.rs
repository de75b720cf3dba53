//! Tracing subscriber setup.

use tracing_subscriber::EnvFilter;

use crate::config::TelemetryConfig;
use crate::error::{EngineError, EngineResult};

/// Builds the filter: `RUST_LOG` when set, else the configured level.
fn env_filter(config: &TelemetryConfig) -> EngineResult<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(&config.log_level).map_err(|source| EngineError::Telemetry {
            message: format!("invalid log level/filter '{}': {source}", config.log_level),
        }),
    }
}

/// Installs the global compact formatter.
///
/// Fails if the level is not a valid filter directive or a global
/// subscriber is already installed.
pub fn init(config: &TelemetryConfig) -> EngineResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(config)?)
        .with_target(false)
        .compact()
        .with_ansi(false)
        .try_init()
        .map_err(|err| EngineError::Telemetry {
            message: err.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_level_is_reported() {
        // Only meaningful when RUST_LOG is unset.
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }
        let config = TelemetryConfig {
            log_level: "exeat=[".to_string(),
        };
        assert!(matches!(env_filter(&config), Err(EngineError::Telemetry { .. })));
    }

    #[test]
    fn test_valid_level_builds_filter() {
        let config = TelemetryConfig {
            log_level: "debug".to_string(),
        };
        assert!(env_filter(&config).is_ok());
    }
}
