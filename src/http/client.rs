//! `reqwest` implementation of [`HttpClient`]

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, trace};
use url::Url;

use super::{HttpClient, HttpError, HttpResponse, HttpResult, check_status};

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// HTTP client resolving relative paths against a base URL
#[derive(Debug, Clone)]
pub struct ReqwestHttpClient {
    client: reqwest::Client,
    base_url: Url,
}

impl ReqwestHttpClient {
    /// # Arguments
    /// * `base_url` - Origin relative request paths are resolved against
    /// * `request_timeout` - Per-request timeout, `None` waits indefinitely
    pub fn new(base_url: &str, request_timeout: Option<Duration>) -> HttpResult<Self> {
        let base_url = Url::parse(base_url).map_err(|e| HttpError::InvalidUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| HttpError::Setup(e.to_string()))?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn resolve(&self, url: &str) -> HttpResult<Url> {
        self.base_url.join(url).map_err(|e| HttpError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }

    async fn send(&self, request: reqwest::RequestBuilder, url: &Url) -> HttpResult<HttpResponse> {
        let response = request
            .send()
            .await
            .map_err(|e| HttpError::Network(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| HttpError::Network(e.to_string()))?;

        debug!("{} answered HTTP {}", url, status);
        let response = check_status(status, body)?;
        trace!("{} body: {}", url, response.body);
        Ok(response)
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn get(&self, url: &str) -> HttpResult<HttpResponse> {
        let url = self.resolve(url)?;
        self.send(self.client.get(url.clone()), &url).await
    }

    async fn post(&self, url: &str, form: Option<String>) -> HttpResult<HttpResponse> {
        let url = self.resolve(url)?;
        let mut request = self
            .client
            .post(url.clone())
            .header(CONTENT_TYPE, FORM_CONTENT_TYPE);
        if let Some(form) = form {
            request = request.body(form);
        }
        self.send(request, &url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unparsable_base_url() {
        assert!(matches!(
            ReqwestHttpClient::new("not a url", None),
            Err(HttpError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn resolves_relative_paths_against_origin() {
        let client = ReqwestHttpClient::new("https://sonar.example.com/app/", None).unwrap();
        assert_eq!(
            client.resolve("/api/authentication/logout").unwrap().as_str(),
            "https://sonar.example.com/api/authentication/logout"
        );
        assert_eq!(
            client.resolve("https://cas.example.com/logout").unwrap().as_str(),
            "https://cas.example.com/logout"
        );
    }
}
