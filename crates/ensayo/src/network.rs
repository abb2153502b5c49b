//! Network collaborator for API-level steps.
//!
//! `request_get` steps do not go through the page; they issue a plain GET via
//! a [`NetworkClient`]. With the `http` feature, [`HttpClient`] provides a
//! reqwest-backed implementation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::driver::DriverError;

/// Response to a GET request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    /// URL that was requested
    pub url: String,
    /// HTTP status code
    pub status: u16,
    /// Response body
    pub body: String,
}

impl Response {
    /// Create a response
    #[must_use]
    pub fn new(url: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            status,
            body: body.into(),
        }
    }

    /// Create a 404 response
    #[must_use]
    pub fn not_found(url: impl Into<String>) -> Self {
        Self::new(url, 404, r#"{"error":"Not found"}"#)
    }
}

/// Performs HTTP GET requests
#[async_trait]
pub trait NetworkClient: Send + Sync {
    /// GET the URL; an `Err` means the request never produced a response
    async fn get(&self, url: &str) -> Result<Response, DriverError>;
}

/// reqwest-backed network client
#[cfg(feature = "http")]
#[derive(Debug, Clone, Default)]
pub struct HttpClient {
    client: reqwest::Client,
}

#[cfg(feature = "http")]
impl HttpClient {
    /// Create a client with reqwest defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing reqwest client
    #[must_use]
    pub const fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[cfg(feature = "http")]
#[async_trait]
impl NetworkClient for HttpClient {
    async fn get(&self, url: &str) -> Result<Response, DriverError> {
        let unreachable = |e: reqwest::Error| DriverError::Unreachable {
            url: url.to_string(),
            message: e.to_string(),
        };
        let response = self.client.get(url).send().await.map_err(unreachable)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(unreachable)?;
        Ok(Response::new(url, status, body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_response() {
        let resp = Response::not_found("https://demo.playwright.dev/api/user/123");
        assert_eq!(resp.status, 404);
        assert!(resp.body.contains("Not found"));
    }
}
