//! Application-level configuration loading: database location, join link base URL, the
//! default moderator credential and refresh cadence.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

use crate::services::auth_gate::AuthConfig;

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "LIVE_POLL_CONFIG_PATH";
const DATABASE_PATH_ENV: &str = "LIVE_POLL_DATABASE_PATH";
const JOIN_BASE_URL_ENV: &str = "LIVE_POLL_JOIN_BASE_URL";
const MODERATOR_PASSWORD_ENV: &str = "LIVE_POLL_MODERATOR_PASSWORD";

const DEFAULT_DATABASE_PATH: &str = "app_live.db";
const DEFAULT_JOIN_BASE_URL: &str = "http://localhost:8080";
/// Built-in credential seeded on first start when nothing else is configured.
pub const FALLBACK_MODERATOR_PASSWORD: &str = "admin123";
const DEFAULT_AUTO_REFRESH_SECS: u64 = 5;
const DEFAULT_PIN_ATTEMPTS: u32 = 5;
const DEFAULT_VISITOR_IDLE_SECS: u64 = 2 * 60 * 60;

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    database_path: PathBuf,
    join_base_url: String,
    default_moderator_password: Option<String>,
    auto_refresh_interval: Duration,
    pin_attempts: u32,
    visitor_idle_timeout: Duration,
}

impl AppConfig {
    /// Load the application configuration from disk and the environment, falling back to
    /// built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        let config = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    info!(path = %path.display(), "loaded configuration file");
                    raw.into()
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
        };

        config.with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        if let Some(path) = non_empty_env(DATABASE_PATH_ENV) {
            self.database_path = PathBuf::from(path);
        }
        if let Some(url) = non_empty_env(JOIN_BASE_URL_ENV) {
            self.join_base_url = url;
        }
        if let Some(password) = non_empty_env(MODERATOR_PASSWORD_ENV) {
            self.default_moderator_password = Some(password);
        }
        self
    }

    /// Override the base URL embedded into join links and QR codes.
    pub fn with_join_base_url(mut self, url: impl Into<String>) -> Self {
        self.join_base_url = url.into();
        self
    }

    /// Override the credential seeded on first start.
    pub fn with_default_moderator_password(mut self, password: impl Into<String>) -> Self {
        self.default_moderator_password = Some(password.into());
        self
    }

    /// Override the delay between two moderator auto-refresh cycles.
    pub fn with_auto_refresh_interval(mut self, interval: Duration) -> Self {
        self.auto_refresh_interval = interval;
        self
    }

    /// Override how long an untouched visitor context is kept.
    pub fn with_visitor_idle_timeout(mut self, timeout: Duration) -> Self {
        self.visitor_idle_timeout = timeout;
        self
    }

    /// Location of the SQLite database file.
    pub fn database_path(&self) -> &PathBuf {
        &self.database_path
    }

    /// Base URL participants open; the PIN is appended as a `pin` query parameter.
    pub fn join_base_url(&self) -> &str {
        &self.join_base_url
    }

    /// Delay between two moderator auto-refresh cycles.
    pub fn auto_refresh_interval(&self) -> Duration {
        self.auto_refresh_interval
    }

    /// Number of PIN candidates tried before session creation gives up.
    pub fn pin_attempts(&self) -> u32 {
        self.pin_attempts
    }

    /// Visitor contexts not touched for this long are evicted.
    pub fn visitor_idle_timeout(&self) -> Duration {
        self.visitor_idle_timeout
    }

    /// Settings handed to the auth gate at construction.
    pub fn auth(&self) -> AuthConfig {
        let default_password = match &self.default_moderator_password {
            Some(password) => password.clone(),
            None => {
                warn!(
                    "no moderator password configured; the built-in default will be seeded \
                     on first start, change it as soon as possible"
                );
                FALLBACK_MODERATOR_PASSWORD.to_string()
            }
        };
        AuthConfig::new(default_password)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from(DEFAULT_DATABASE_PATH),
            join_base_url: DEFAULT_JOIN_BASE_URL.to_string(),
            default_moderator_password: None,
            auto_refresh_interval: Duration::from_secs(DEFAULT_AUTO_REFRESH_SECS),
            pin_attempts: DEFAULT_PIN_ATTEMPTS,
            visitor_idle_timeout: Duration::from_secs(DEFAULT_VISITOR_IDLE_SECS),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    database_path: Option<PathBuf>,
    join_base_url: Option<String>,
    default_moderator_password: Option<String>,
    auto_refresh_interval_secs: Option<u64>,
    pin_attempts: Option<u32>,
    visitor_idle_timeout_secs: Option<u64>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let defaults = Self::default();
        Self {
            database_path: value.database_path.unwrap_or(defaults.database_path),
            join_base_url: value.join_base_url.unwrap_or(defaults.join_base_url),
            default_moderator_password: value.default_moderator_password,
            auto_refresh_interval: value
                .auto_refresh_interval_secs
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.auto_refresh_interval),
            pin_attempts: value
                .pin_attempts
                .filter(|attempts| *attempts > 0)
                .unwrap_or(defaults.pin_attempts),
            visitor_idle_timeout: value
                .visitor_idle_timeout_secs
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.visitor_idle_timeout),
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

fn non_empty_env(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_config_fills_missing_fields_with_defaults() {
        let raw: RawConfig =
            serde_json::from_str(r#"{ "join_base_url": "https://poll.example" }"#).unwrap();
        let config = AppConfig::from(raw);

        assert_eq!(config.join_base_url(), "https://poll.example");
        assert_eq!(config.database_path(), &PathBuf::from(DEFAULT_DATABASE_PATH));
        assert_eq!(config.auto_refresh_interval(), Duration::from_secs(5));
        assert_eq!(config.pin_attempts(), 5);
        assert_eq!(config.visitor_idle_timeout(), Duration::from_secs(7200));
    }

    #[test]
    fn idle_timeout_is_read_from_seconds() {
        let raw: RawConfig =
            serde_json::from_str(r#"{ "visitor_idle_timeout_secs": 90 }"#).unwrap();
        assert_eq!(
            AppConfig::from(raw).visitor_idle_timeout(),
            Duration::from_secs(90)
        );
    }

    #[test]
    fn zero_values_are_ignored() {
        let raw: RawConfig =
            serde_json::from_str(r#"{ "auto_refresh_interval_secs": 0, "pin_attempts": 0 }"#)
                .unwrap();
        let config = AppConfig::from(raw);

        assert_eq!(config.auto_refresh_interval(), Duration::from_secs(5));
        assert_eq!(config.pin_attempts(), 5);
    }

    #[test]
    fn configured_password_is_handed_to_auth() {
        let config = AppConfig::default().with_default_moderator_password("s3cret!");
        assert_eq!(config.auth().default_password(), "s3cret!");
    }
}
