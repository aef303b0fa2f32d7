//! Runtime configuration.
//!
//! Every setting resolves as: command-line flag, then environment variable,
//! then built-in default.

use crate::enrichment::{LlmConfig, DEFAULT_ENRICHMENT_TIMEOUT};
use crate::server::rate_limit::RateLimitConfig;
use std::path::PathBuf;
use std::time::Duration;

pub const HOST_ENV: &str = "DEVICE_REGISTRY_HOST";
pub const PORT_ENV: &str = "DEVICE_REGISTRY_PORT";
pub const DB_ENV: &str = "DEVICE_REGISTRY_DB";
pub const STATIC_DIR_ENV: &str = "DEVICE_REGISTRY_STATIC_DIR";
pub const LLM_TIMEOUT_ENV: &str = "DEVICE_REGISTRY_LLM_TIMEOUT_SECS";
pub const RATE_LIMIT_MAX_ENV: &str = "DEVICE_REGISTRY_RATE_LIMIT_MAX";
pub const RATE_LIMIT_WINDOW_ENV: &str = "DEVICE_REGISTRY_RATE_LIMIT_WINDOW_SECS";

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 3000;

/// Command-line values that take precedence over the environment.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub db_path: Option<PathBuf>,
    pub static_dir: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub static_dir: Option<PathBuf>,
    /// None disables generated descriptions.
    pub llm: Option<LlmConfig>,
    pub enrichment_timeout: Duration,
    pub rate_limit: RateLimitConfig,
}

impl ServerConfig {
    pub fn resolve(overrides: ConfigOverrides) -> Self {
        let host = overrides
            .host
            .or_else(|| env_value(HOST_ENV))
            .unwrap_or_else(|| DEFAULT_HOST.to_string());

        let port = overrides.port.or_else(|| env_parsed(PORT_ENV)).unwrap_or(DEFAULT_PORT);

        let db_path = overrides
            .db_path
            .or_else(|| env_value(DB_ENV).map(PathBuf::from))
            .unwrap_or_else(default_db_path);

        let static_dir = overrides
            .static_dir
            .or_else(|| env_value(STATIC_DIR_ENV).map(PathBuf::from));

        let enrichment_timeout = env_parsed::<u64>(LLM_TIMEOUT_ENV)
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_ENRICHMENT_TIMEOUT);

        let defaults = RateLimitConfig::default();
        let rate_limit = RateLimitConfig {
            max_requests: env_parsed(RATE_LIMIT_MAX_ENV).unwrap_or(defaults.max_requests),
            window: env_parsed::<u64>(RATE_LIMIT_WINDOW_ENV)
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.window),
        };

        Self {
            host,
            port,
            db_path,
            static_dir,
            llm: LlmConfig::from_env(),
            enrichment_timeout,
            rate_limit,
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Resolve the database path without the server-only settings.
pub fn resolve_db_path(db_path: Option<PathBuf>) -> PathBuf {
    db_path
        .or_else(|| env_value(DB_ENV).map(PathBuf::from))
        .unwrap_or_else(default_db_path)
}

/// `<data dir>/device-registry/devices.db`, or `./devices.db` without one.
pub fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("device-registry").join("devices.db"))
        .unwrap_or_else(|| PathBuf::from("devices.db"))
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_parsed<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = env_value(name)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(variable = name, value = %raw, "Ignoring unparsable environment variable");
            None
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        for name in [
            HOST_ENV,
            PORT_ENV,
            DB_ENV,
            STATIC_DIR_ENV,
            LLM_TIMEOUT_ENV,
            RATE_LIMIT_MAX_ENV,
            RATE_LIMIT_WINDOW_ENV,
        ] {
            std::env::remove_var(name);
        }
    }

    #[test]
    #[serial]
    fn test_defaults() {
        clear_env();
        let config = ServerConfig::resolve(ConfigOverrides::default());

        assert_eq!(config.host, DEFAULT_HOST);
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.db_path, default_db_path());
        assert!(config.static_dir.is_none());
        assert_eq!(config.enrichment_timeout, DEFAULT_ENRICHMENT_TIMEOUT);
        assert_eq!(config.bind_addr(), "127.0.0.1:3000");
        assert_eq!(config.rate_limit, RateLimitConfig::default());
    }

    #[test]
    #[serial]
    fn test_rate_limit_from_env() {
        clear_env();
        std::env::set_var(RATE_LIMIT_MAX_ENV, "0");
        std::env::set_var(RATE_LIMIT_WINDOW_ENV, "30");

        let config = ServerConfig::resolve(ConfigOverrides::default());
        assert_eq!(config.rate_limit.max_requests, 0);
        assert_eq!(config.rate_limit.window, Duration::from_secs(30));

        std::env::set_var(RATE_LIMIT_WINDOW_ENV, "0");
        let config = ServerConfig::resolve(ConfigOverrides::default());
        assert_eq!(config.rate_limit.window, RateLimitConfig::default().window);

        clear_env();
    }

    #[test]
    #[serial]
    fn test_env_overrides_defaults() {
        clear_env();
        std::env::set_var(HOST_ENV, "0.0.0.0");
        std::env::set_var(PORT_ENV, "8080");
        std::env::set_var(DB_ENV, "/tmp/registry.db");
        std::env::set_var(LLM_TIMEOUT_ENV, "3");

        let config = ServerConfig::resolve(ConfigOverrides::default());
        assert_eq!(config.bind_addr(), "0.0.0.0:8080");
        assert_eq!(config.db_path, PathBuf::from("/tmp/registry.db"));
        assert_eq!(config.enrichment_timeout, Duration::from_secs(3));

        clear_env();
    }

    #[test]
    #[serial]
    fn test_flags_override_env() {
        clear_env();
        std::env::set_var(PORT_ENV, "8080");
        std::env::set_var(DB_ENV, "/tmp/from-env.db");

        let config = ServerConfig::resolve(ConfigOverrides {
            port: Some(9090),
            db_path: Some(PathBuf::from("/tmp/from-flag.db")),
            ..Default::default()
        });
        assert_eq!(config.port, 9090);
        assert_eq!(config.db_path, PathBuf::from("/tmp/from-flag.db"));
        assert_eq!(
            resolve_db_path(None),
            PathBuf::from("/tmp/from-env.db")
        );

        clear_env();
    }

    #[test]
    #[serial]
    fn test_invalid_port_falls_back_to_default() {
        clear_env();
        std::env::set_var(PORT_ENV, "not-a-port");

        let config = ServerConfig::resolve(ConfigOverrides::default());
        assert_eq!(config.port, DEFAULT_PORT);

        clear_env();
    }
}
