//! CAS server settings and the logout destination derived from them

use serde::{Deserialize, Serialize};

use crate::config::{ConfigError, ConfigResult};
use crate::utils::constants::DEFAULT_CAS_LOGOUT_PATH;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CasSettings {
    /// Root URL of the CAS server, e.g. `https://cas.example.com/cas`
    #[serde(default)]
    pub server_url: Option<String>,

    #[serde(default = "default_logout_path")]
    pub logout_path: String,

    /// Ask CAS to send the user back to the service after logout
    #[serde(default = "default_logout_redirect")]
    pub logout_redirect: bool,

    /// Public URL of the protected service, used as the `service` parameter
    #[serde(default)]
    pub sonar_server_url: Option<String>,
}

fn default_logout_path() -> String {
    DEFAULT_CAS_LOGOUT_PATH.to_string()
}

fn default_logout_redirect() -> bool {
    true
}

impl Default for CasSettings {
    fn default() -> Self {
        Self {
            server_url: None,
            logout_path: default_logout_path(),
            logout_redirect: default_logout_redirect(),
            sonar_server_url: None,
        }
    }
}

impl CasSettings {
    /// CAS server URL joined with the logout path, exactly one `/` between them
    pub fn server_logout_url(&self) -> ConfigResult<String> {
        let server_url = self
            .server_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .ok_or(ConfigError::MissingCasServerUrl)?;

        let server_url = server_url.strip_suffix('/').unwrap_or(server_url);
        let logout_path = if self.logout_path.starts_with('/') {
            self.logout_path.clone()
        } else {
            format!("/{}", self.logout_path)
        };
        Ok(format!("{}{}", server_url, logout_path))
    }

    /// Where the browser goes once the local session is closed
    ///
    /// The service URL is appended verbatim as `?service=`, the form CAS
    /// servers accept for the logout redirect.
    pub fn logout_destination(&self) -> ConfigResult<String> {
        let logout_url = self.server_logout_url()?;
        if !self.logout_redirect {
            return Ok(logout_url);
        }

        let service = self
            .sonar_server_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .ok_or(ConfigError::MissingServiceUrl)?;
        Ok(format!("{}?service={}", logout_url, service))
    }
}
