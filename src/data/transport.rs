//! HTTP transport behind the API client
//!
//! The client only needs "GET this URL and give me the body", so that is the
//! whole trait. Tests swap in scripted implementations.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::Client;
use tracing::debug;

use super::ApiError;

/// Performs a single GET request
///
/// Implementations must map any non-2xx response to [`ApiError::Status`].
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &str) -> Result<String, ApiError>;
}

/// reqwest-backed transport
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Creates a transport sending `user_agent` and `Accept: application/json`
    pub fn new(user_agent: &str) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .user_agent(user_agent)
            .default_headers(headers)
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &str) -> Result<String, ApiError> {
        debug!(url, "dispatching request");

        let response = self.client.get(url).send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(ApiError::status(status.as_u16(), &text));
        }

        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_transport_builds() {
        assert!(HttpTransport::new("clara-test/0.1").is_ok());
    }
}
