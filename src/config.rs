//! YAML configuration
//!
//! Every field has a default, so an empty or missing file yields a usable
//! configuration except for the CAS server URL, which has no sensible
//! default and is checked when the logout destination is resolved.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::hook::FailurePolicy;
use crate::settings::CasSettings;
use crate::utils::constants::{
    DEFAULT_BASE_URL, DEFAULT_MENU_INTERVAL_MS, DEFAULT_MENU_TIMEOUT_MS,
    DEFAULT_POPUP_INTERVAL_MS, DEFAULT_POPUP_TIMEOUT_MS, LOGOUT_ENDPOINT, MAX_LOGOUT_RETRIES,
};
use crate::utils::{validate_discovery_timeout, validate_interval};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing CAS server URL (cas.server_url)")]
    MissingCasServerUrl,

    #[error("cas.logout_redirect is enabled but the service URL (cas.sonar_server_url) is missing")]
    MissingServiceUrl,

    #[error("{field}: timeout cannot exceed {max_ms}ms. Received: {received_ms}ms")]
    TimeoutTooLarge {
        field: &'static str,
        max_ms: u64,
        received_ms: u64,
    },

    #[error("{field}: polling interval must be at least 1ms")]
    ZeroInterval { field: &'static str },

    #[error("logout.retries cannot exceed {max}. Received: {received}")]
    TooManyRetries { max: u32, received: u32 },

    #[error("Failed to read {path}: {reason}")]
    Io { path: String, reason: String },

    #[error("Invalid YAML configuration: {0}")]
    Parse(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub menu: MenuConfig,

    #[serde(default)]
    pub popup: PopupConfig,

    #[serde(default)]
    pub logout: LogoutConfig,

    #[serde(default)]
    pub cas: CasSettings,

    #[serde(default)]
    pub http: HttpConfig,
}

/// Discovery of the user menu trigger
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuConfig {
    #[serde(default = "default_menu_interval_ms")]
    pub interval_ms: u64,

    /// `null` probes until the hook shuts down
    #[serde(default = "default_menu_timeout_ms")]
    pub timeout_ms: Option<u64>,
}

/// Discovery of the logout link inside the user popup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopupConfig {
    #[serde(default = "default_popup_interval_ms")]
    pub interval_ms: u64,

    #[serde(default = "default_popup_timeout_ms")]
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogoutConfig {
    #[serde(default = "default_logout_endpoint")]
    pub endpoint: String,

    /// Overrides the destination derived from the `cas` section
    #[serde(default)]
    pub destination: Option<String>,

    /// What to do when the logout request fails
    #[serde(default)]
    pub failure: FailurePolicy,

    /// Extra attempts after a network or server error
    #[serde(default)]
    pub retries: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Origin the logout endpoint is resolved against
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// `null` waits for the response indefinitely
    #[serde(default)]
    pub request_timeout_ms: Option<u64>,
}

fn default_menu_interval_ms() -> u64 {
    DEFAULT_MENU_INTERVAL_MS
}
fn default_menu_timeout_ms() -> Option<u64> {
    Some(DEFAULT_MENU_TIMEOUT_MS)
}
fn default_popup_interval_ms() -> u64 {
    DEFAULT_POPUP_INTERVAL_MS
}
fn default_popup_timeout_ms() -> Option<u64> {
    Some(DEFAULT_POPUP_TIMEOUT_MS)
}
fn default_logout_endpoint() -> String {
    LOGOUT_ENDPOINT.to_string()
}
fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

impl Default for MenuConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_menu_interval_ms(),
            timeout_ms: default_menu_timeout_ms(),
        }
    }
}

impl Default for PopupConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_popup_interval_ms(),
            timeout_ms: default_popup_timeout_ms(),
        }
    }
}

impl Default for LogoutConfig {
    fn default() -> Self {
        Self {
            endpoint: default_logout_endpoint(),
            destination: None,
            failure: FailurePolicy::default(),
            retries: 0,
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_ms: None,
        }
    }
}

impl Config {
    /// Load `path`, falling back to defaults when the file does not exist
    pub fn load(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_yaml_str(&contents)
    }

    pub fn from_yaml_str(contents: &str) -> ConfigResult<Self> {
        // An empty document deserializes to `()`, not to a mapping
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Config =
            serde_yaml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check intervals, timeouts and retry bounds
    pub fn validate(&self) -> ConfigResult<()> {
        validate_interval("menu.interval_ms", self.menu.interval_ms)?;
        validate_interval("popup.interval_ms", self.popup.interval_ms)?;
        validate_discovery_timeout("menu.timeout_ms", self.menu.timeout_ms)?;
        validate_discovery_timeout("popup.timeout_ms", self.popup.timeout_ms)?;

        if self.logout.retries > MAX_LOGOUT_RETRIES {
            return Err(ConfigError::TooManyRetries {
                max: MAX_LOGOUT_RETRIES,
                received: self.logout.retries,
            });
        }
        Ok(())
    }

    /// Explicit `logout.destination`, else the CAS logout URL
    pub fn logout_destination(&self) -> ConfigResult<String> {
        match self.logout.destination.as_deref() {
            Some(destination) if !destination.trim().is_empty() => Ok(destination.to_string()),
            _ => self.cas.logout_destination(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config = Config::from_yaml_str("").unwrap();
        assert_eq!(config.menu.interval_ms, 250);
        assert_eq!(config.popup.interval_ms, 100);
        assert_eq!(config.menu.timeout_ms, Some(60_000));
        assert_eq!(config.logout.endpoint, "/api/authentication/logout");
        assert_eq!(config.logout.failure, FailurePolicy::Silent);
        assert_eq!(config.http.request_timeout_ms, None);
    }

    #[test]
    fn partial_sections_keep_field_defaults() {
        let config = Config::from_yaml_str(
            r#"
popup:
  timeout_ms: null
logout:
  failure: redirect
  retries: 2
cas:
  server_url: https://cas.example.com/cas/
  sonar_server_url: https://sonar.example.com
"#,
        )
        .unwrap();

        assert_eq!(config.popup.interval_ms, 100);
        assert_eq!(config.popup.timeout_ms, None);
        assert_eq!(config.logout.failure, FailurePolicy::Redirect);
        assert_eq!(config.logout.retries, 2);
        assert_eq!(
            config.logout_destination().unwrap(),
            "https://cas.example.com/cas/logout?service=https://sonar.example.com"
        );
    }

    #[test]
    fn explicit_destination_wins() {
        let config = Config::from_yaml_str("logout:\n  destination: https://sso.example.com/bye\n")
            .unwrap();
        assert_eq!(config.logout_destination().unwrap(), "https://sso.example.com/bye");
    }

    #[test]
    fn rejects_invalid_values() {
        assert!(matches!(
            Config::from_yaml_str("menu:\n  interval_ms: 0\n"),
            Err(ConfigError::ZeroInterval { field: "menu.interval_ms" })
        ));
        assert!(matches!(
            Config::from_yaml_str("popup:\n  timeout_ms: 900000\n"),
            Err(ConfigError::TimeoutTooLarge { .. })
        ));
        assert!(matches!(
            Config::from_yaml_str("logout:\n  retries: 50\n"),
            Err(ConfigError::TooManyRetries { max: 5, received: 50 })
        ));
        assert!(matches!(
            Config::from_yaml_str("logout:\n  failure: loudly\n"),
            Err(ConfigError::Parse(_))
        ));
    }
}
