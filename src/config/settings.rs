//! Environment-driven runtime settings.

use std::env;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use crate::error::{EngineError, EngineResult};

/// Default policy data directory.
pub const DEFAULT_CONFIG_DIR: &str = "./config/michaelhouse";

/// Distinguishes runtime behaviour for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    /// Local development.
    Development,
    /// Automated tests and CI.
    Test,
    /// Production.
    Production,
}

impl AppEnvironment {
    fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSettings {
    /// Host name or IP address.
    pub host: String,
    /// TCP port.
    pub port: u16,
}

impl ServerSettings {
    /// Resolves the bind address; `localhost` maps to 127.0.0.1.
    pub fn socket_addr(&self) -> EngineResult<SocketAddr> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self.host.parse().map_err(|_| EngineError::InvalidSetting {
            name: "APP_HOST".to_string(),
            message: format!("'{}' is not an IPv4 or IPv6 address", self.host),
        })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    /// Filter directive used when `RUST_LOG` is unset.
    pub log_level: String,
}

/// Top-level runtime settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Deployment stage.
    pub environment: AppEnvironment,
    /// HTTP binding.
    pub server: ServerSettings,
    /// Logging.
    pub telemetry: TelemetryConfig,
    /// Directory holding `calendar.yaml` and `roster.yaml`.
    pub config_dir: PathBuf,
    /// SQLite file; `None` selects the in-memory store.
    pub database_path: Option<PathBuf>,
}

impl Settings {
    /// Loads settings from the process environment, reading `.env` first.
    pub fn load() -> EngineResult<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds settings from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> EngineResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment =
            AppEnvironment::parse(&lookup("APP_ENV").unwrap_or_else(|| "development".to_string()));

        let host = lookup("APP_HOST").unwrap_or_else(|| "127.0.0.1".to_string());
        let port = match lookup("APP_PORT") {
            Some(raw) => raw.trim().parse::<u16>().map_err(|_| EngineError::InvalidSetting {
                name: "APP_PORT".to_string(),
                message: format!("'{raw}' is not a valid port"),
            })?,
            None => 3000,
        };

        let log_level = lookup("APP_LOG_LEVEL").unwrap_or_else(|| "info".to_string());
        let config_dir = lookup("EXEAT_CONFIG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_DIR));
        let database_path = lookup("EXEAT_DATABASE_PATH")
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from);

        Ok(Self {
            environment,
            server: ServerSettings { host, port },
            telemetry: TelemetryConfig { log_level },
            config_dir,
            database_path,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults_when_env_missing() {
        let settings = Settings::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(settings.environment, AppEnvironment::Development);
        assert_eq!(settings.server.host, "127.0.0.1");
        assert_eq!(settings.server.port, 3000);
        assert_eq!(settings.telemetry.log_level, "info");
        assert_eq!(settings.config_dir, PathBuf::from(DEFAULT_CONFIG_DIR));
        assert!(settings.database_path.is_none());
    }

    #[test]
    fn test_overrides_are_applied() {
        let settings = Settings::from_lookup(lookup_from(&[
            ("APP_ENV", "production"),
            ("APP_PORT", "8080"),
            ("EXEAT_DATABASE_PATH", "/var/lib/exeat.db"),
        ]))
        .unwrap();
        assert_eq!(settings.environment, AppEnvironment::Production);
        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.database_path, Some(PathBuf::from("/var/lib/exeat.db")));
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        let result = Settings::from_lookup(lookup_from(&[("APP_PORT", "eighty")]));
        assert!(matches!(result, Err(EngineError::InvalidSetting { name, .. }) if name == "APP_PORT"));
    }

    #[test]
    fn test_localhost_resolves() {
        let server = ServerSettings {
            host: "localhost".to_string(),
            port: 3000,
        };
        assert_eq!(
            server.socket_addr().unwrap(),
            SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000)
        );
    }

    #[test]
    fn test_bad_host_is_rejected() {
        let server = ServerSettings {
            host: "not a host".to_string(),
            port: 3000,
        };
        assert!(server.socket_addr().is_err());
    }
}
