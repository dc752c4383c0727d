// Configuration helpers shared by the hook and the binary
pub mod constants;
mod timeout;

pub use timeout::{MAX_DISCOVERY_TIMEOUT_MS, validate_discovery_timeout, validate_interval};
