//! Shared configuration constants for the logout hook
//!
//! Default values used by the configuration layer and the hook, kept in one
//! place to avoid magic numbers.

/// Probe interval while waiting for the user menu trigger
pub const DEFAULT_MENU_INTERVAL_MS: u64 = 250;

/// Probe interval while waiting for the user popup
///
/// Shorter than the menu interval: the popup renders right after a click.
pub const DEFAULT_POPUP_INTERVAL_MS: u64 = 100;

/// How long to wait for the page shell to render the navigation (1 minute)
pub const DEFAULT_MENU_TIMEOUT_MS: u64 = 60_000;

/// How long to wait for the popup after a click on the trigger (10 seconds)
pub const DEFAULT_POPUP_TIMEOUT_MS: u64 = 10_000;

/// Endpoint closing the local session
pub const LOGOUT_ENDPOINT: &str = "/api/authentication/logout";

/// Path of the logout page on the CAS server
pub const DEFAULT_CAS_LOGOUT_PATH: &str = "/logout";

/// Origin used for relative requests when none is configured
pub const DEFAULT_BASE_URL: &str = "http://localhost:9000";

/// Upper bound for `logout.retries`
pub const MAX_LOGOUT_RETRIES: u32 = 5;

/// First delay between logout retries, doubled on each retry
pub const RETRY_BASE_DELAY_MS: u64 = 250;

/// Cap for the delay between logout retries
pub const RETRY_MAX_DELAY_MS: u64 = 2_000;
