//! Timeout and interval validation for discovery settings

use std::time::Duration;

use crate::config::{ConfigError, ConfigResult};

/// Maximum discovery timeout (5 minutes)
/// Covers slow page shells on heavily loaded instances
pub const MAX_DISCOVERY_TIMEOUT_MS: u64 = 300_000; // 5 minutes

/// Validate an optional discovery timeout
///
/// # Arguments
/// * `field` - Configuration key, for the error message
/// * `timeout_ms` - Timeout in milliseconds, `None` for unbounded discovery
///
/// # Returns
/// * `Ok(Option<Duration>)` - Validated timeout
/// * `Err(ConfigError)` - If the timeout exceeds MAX_DISCOVERY_TIMEOUT_MS
///
/// # Example
/// ```rust
/// # use cas_logout_hook::utils::validate_discovery_timeout;
/// let timeout = validate_discovery_timeout("menu.timeout_ms", Some(45_000)).unwrap();
/// assert_eq!(timeout, Some(std::time::Duration::from_secs(45)));
/// ```
pub fn validate_discovery_timeout(
    field: &'static str,
    timeout_ms: Option<u64>,
) -> ConfigResult<Option<Duration>> {
    match timeout_ms {
        Some(ms) if ms > MAX_DISCOVERY_TIMEOUT_MS => Err(ConfigError::TimeoutTooLarge {
            field,
            max_ms: MAX_DISCOVERY_TIMEOUT_MS,
            received_ms: ms,
        }),
        Some(ms) => Ok(Some(Duration::from_millis(ms))),
        None => Ok(None),
    }
}

/// Validate a polling interval; zero would spin
pub fn validate_interval(field: &'static str, interval_ms: u64) -> ConfigResult<Duration> {
    if interval_ms == 0 {
        return Err(ConfigError::ZeroInterval { field });
    }
    Ok(Duration::from_millis(interval_ms))
}
