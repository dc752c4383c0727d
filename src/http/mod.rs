//! HTTP helper used for the logout request
//!
//! [`HttpClient`] is injected into the hook so the transport can be stubbed.
//! Only `200 OK` and `304 Not Modified` count as success; every other
//! outcome is reported as an [`HttpError`] kind the caller can act on.

mod client;

pub use client::ReqwestHttpClient;

use async_trait::async_trait;
use thiserror::Error;

/// Response of a successful request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HttpError {
    #[error("Client error: HTTP {status}")]
    Client { status: u16 },

    #[error("Server error: HTTP {status}")]
    Server { status: u16 },

    #[error("Unexpected status: HTTP {status}")]
    UnexpectedStatus { status: u16 },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("HTTP client setup failed: {0}")]
    Setup(String),
}

impl HttpError {
    /// Whether sending the same request again may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, HttpError::Network(_) | HttpError::Server { .. })
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            HttpError::Client { status }
            | HttpError::Server { status }
            | HttpError::UnexpectedStatus { status } => Some(*status),
            _ => None,
        }
    }
}

pub type HttpResult<T> = Result<T, HttpError>;

/// Map a received status onto the success / error contract
pub fn check_status(status: u16, body: String) -> HttpResult<HttpResponse> {
    match status {
        200 | 304 => Ok(HttpResponse { status, body }),
        400..=499 => Err(HttpError::Client { status }),
        500..=599 => Err(HttpError::Server { status }),
        _ => Err(HttpError::UnexpectedStatus { status }),
    }
}

/// `application/x-www-form-urlencoded` body from key/value pairs
pub fn encode_form(pairs: &[(&str, &str)]) -> String {
    pairs
        .iter()
        .map(|(key, value)| format!("{}={}", urlencoding::encode(key), urlencoding::encode(value)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Transport for the hook's requests
///
/// Relative URLs are resolved by the implementation (against the page
/// origin for a browser, a configured base URL otherwise).
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn get(&self, url: &str) -> HttpResult<HttpResponse>;

    /// POST with an optional URL-encoded form body
    async fn post(&self, url: &str, form: Option<String>) -> HttpResult<HttpResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_ok_and_not_modified_succeed() {
        assert!(check_status(200, String::new()).is_ok());
        assert!(check_status(304, String::new()).is_ok());
        assert_eq!(
            check_status(204, String::new()),
            Err(HttpError::UnexpectedStatus { status: 204 })
        );
        assert_eq!(
            check_status(302, String::new()),
            Err(HttpError::UnexpectedStatus { status: 302 })
        );
        assert_eq!(check_status(401, String::new()), Err(HttpError::Client { status: 401 }));
        assert_eq!(check_status(503, String::new()), Err(HttpError::Server { status: 503 }));
    }

    #[test]
    fn retryable_kinds() {
        assert!(HttpError::Network("reset".into()).is_retryable());
        assert!(HttpError::Server { status: 502 }.is_retryable());
        assert!(!HttpError::Client { status: 403 }.is_retryable());
        assert!(!HttpError::UnexpectedStatus { status: 204 }.is_retryable());
        assert_eq!(HttpError::Client { status: 403 }.status(), Some(403));
        assert_eq!(HttpError::Network("reset".into()).status(), None);
    }

    #[test]
    fn form_values_are_escaped() {
        assert_eq!(
            encode_form(&[("service", "https://sonar.example.com/?a=b"), ("x", "1 2")]),
            "service=https%3A%2F%2Fsonar.example.com%2F%3Fa%3Db&x=1%202"
        );
        assert_eq!(encode_form(&[]), "");
    }
}
