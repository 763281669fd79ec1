//! HTTP transport seam
//!
//! Clients talk to the network through `Transport` so tests can substitute an
//! in-memory implementation. `ReqwestTransport` is the production one.

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use serde_json::Value;

use super::error::FetchError;

/// Raw HTTP answer: status code and body text
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Decode the body as JSON
    pub fn json(&self, url: &str) -> Result<Value, FetchError> {
        serde_json::from_str(&self.body).map_err(|source| FetchError::Decode {
            url: url.to_string(),
            source,
        })
    }

    /// Decode the body, turning non-2xx statuses into `FetchError::Status`
    pub fn into_json(self, url: &str) -> Result<Value, FetchError> {
        if !self.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: self.status,
            });
        }
        self.json(url)
    }
}

/// Something that can perform a GET and hand back the status and body
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &str, query: &[(&str, String)]) -> Result<HttpResponse, FetchError>;
}

/// Connection options for `ReqwestTransport`
#[derive(Debug, Clone, Default)]
pub struct HttpSettings {
    pub accept_invalid_certs: bool,
    pub timeout: Option<Duration>,
}

/// `Transport` backed by a shared `reqwest::Client`
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(settings: &HttpSettings) -> Result<Self, FetchError> {
        let mut builder = reqwest::Client::builder()
            .user_agent(concat!("infotecnica-cli/", env!("CARGO_PKG_VERSION")))
            .danger_accept_invalid_certs(settings.accept_invalid_certs);
        if let Some(timeout) = settings.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(FetchError::Client)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn get(&self, url: &str, query: &[(&str, String)]) -> Result<HttpResponse, FetchError> {
        // The query may carry credentials; only the bare URL goes into errors
        let transport_err = |source: reqwest::Error| FetchError::Transport {
            url: url.to_string(),
            source: source.without_url(),
        };

        debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(transport_err)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(transport_err)?;
        Ok(HttpResponse { status, body })
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_into_json_maps_status() {
        let err = HttpResponse::new(503, "").into_json("http://x").unwrap_err();
        assert_eq!(err.status(), Some(503));
    }

    #[test]
    fn test_into_json_decodes() {
        let value = HttpResponse::new(200, r#"{"count": 2}"#)
            .into_json("http://x")
            .unwrap();
        assert_eq!(value, json!({"count": 2}));
    }

    #[test]
    fn test_decode_error() {
        let err = HttpResponse::new(200, "<html>").into_json("http://x").unwrap_err();
        assert!(matches!(err, FetchError::Decode { .. }));
    }
}
