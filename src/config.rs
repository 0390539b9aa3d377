//! Application-level configuration loading for the scoring engine.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the engine looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "SCOREBOOK_CONFIG_PATH";

const DEFAULT_API_BASE_URL: &str = "http://localhost:8080/api/v1";
const DEFAULT_DB_PATH: &str = "data/scorebook.redb";
const DEFAULT_SYNC_INTERVAL_SECS: u64 = 30;
const DEFAULT_PROBE_INTERVAL_SECS: u64 = 10;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
/// Delivery attempts before an action is dropped permanently.
const DEFAULT_RETRY_CEILING: u32 = 3;

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    /// Base URL of the remote scoring API.
    pub api_base_url: String,
    /// Bearer token for the remote API, if required.
    pub api_token: Option<String>,
    /// Location of the embedded offline store.
    pub offline_db_path: PathBuf,
    /// Interval between periodic drain passes.
    pub sync_interval: Duration,
    /// Interval between connectivity probes.
    pub probe_interval: Duration,
    /// Timeout applied to each remote request.
    pub request_timeout: Duration,
    /// Delivery attempts before an action is dropped permanently.
    pub retry_ceiling: u32,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to the
    /// baked-in defaults when the file is missing or unreadable.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        api = %config.api_base_url,
                        "loaded configuration"
                    );
                    config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.into(),
            api_token: None,
            offline_db_path: PathBuf::from(DEFAULT_DB_PATH),
            sync_interval: Duration::from_secs(DEFAULT_SYNC_INTERVAL_SECS),
            probe_interval: Duration::from_secs(DEFAULT_PROBE_INTERVAL_SECS),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            retry_ceiling: DEFAULT_RETRY_CEILING,
        }
    }
}

#[derive(Debug, Deserialize)]
/// JSON representation of the configuration file located at
/// [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    api_base_url: Option<String>,
    api_token: Option<String>,
    offline_db_path: Option<PathBuf>,
    sync_interval_secs: Option<u64>,
    probe_interval_secs: Option<u64>,
    request_timeout_secs: Option<u64>,
    retry_ceiling: Option<u32>,
}

impl From<RawConfig> for AppConfig {
    fn from(raw: RawConfig) -> Self {
        let defaults = Self::default();
        Self {
            api_base_url: raw.api_base_url.unwrap_or(defaults.api_base_url),
            api_token: raw.api_token,
            offline_db_path: raw.offline_db_path.unwrap_or(defaults.offline_db_path),
            sync_interval: raw
                .sync_interval_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.sync_interval),
            probe_interval: raw
                .probe_interval_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.probe_interval),
            request_timeout: raw
                .request_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.request_timeout),
            retry_ceiling: raw.retry_ceiling.unwrap_or(defaults.retry_ceiling),
        }
    }
}

/// Resolve the configuration path taking the environment override into
/// account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_config_fills_in_defaults() {
        let raw: RawConfig = serde_json::from_str(r#"{"api_base_url": "https://scores.example/api"}"#)
            .unwrap();
        let config: AppConfig = raw.into();
        assert_eq!(config.api_base_url, "https://scores.example/api");
        assert_eq!(config.retry_ceiling, DEFAULT_RETRY_CEILING);
        assert_eq!(
            config.sync_interval,
            Duration::from_secs(DEFAULT_SYNC_INTERVAL_SECS)
        );
    }

    #[test]
    fn raw_config_honors_every_field() {
        let raw: RawConfig = serde_json::from_str(
            r#"{
                "api_base_url": "https://scores.example/api",
                "api_token": "secret",
                "offline_db_path": "/tmp/q.redb",
                "sync_interval_secs": 5,
                "probe_interval_secs": 2,
                "request_timeout_secs": 3,
                "retry_ceiling": 7
            }"#,
        )
        .unwrap();
        let config: AppConfig = raw.into();
        assert_eq!(config.api_token.as_deref(), Some("secret"));
        assert_eq!(config.offline_db_path, PathBuf::from("/tmp/q.redb"));
        assert_eq!(config.sync_interval, Duration::from_secs(5));
        assert_eq!(config.probe_interval, Duration::from_secs(2));
        assert_eq!(config.request_timeout, Duration::from_secs(3));
        assert_eq!(config.retry_ceiling, 7);
    }
}
