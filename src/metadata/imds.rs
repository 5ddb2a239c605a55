//! EC2 Instance Metadata Service v2 client
//!
//! Two-step protocol: `PUT /latest/api/token` with a TTL header returns a
//! session token, then `GET /latest/<path>` carrying the token returns the
//! raw value as the body. Any non-2xx status is an error.

use async_trait::async_trait;
use tracing::{debug, instrument};

use super::MetadataClient;
use crate::config::MetadataConfig;
use crate::error::{BindError, MetadataError};
use crate::util::{TOKEN_HEADER, TOKEN_PATH, TOKEN_TTL, TOKEN_TTL_HEADER};

/// IMDSv2 client with an injected HTTP client and endpoint
#[derive(Debug, Clone)]
pub struct ImdsClient {
    http: reqwest::Client,
    /// Base URL without trailing slash, e.g. `http://169.254.169.254`
    endpoint: String,
    token_ttl_secs: u64,
}

impl ImdsClient {
    /// Create a client over an existing HTTP client
    pub fn new(http: reqwest::Client, endpoint: impl Into<String>) -> Self {
        let endpoint = endpoint.into();
        Self {
            http,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            token_ttl_secs: TOKEN_TTL.as_secs(),
        }
    }

    /// Build a dedicated HTTP client from settings.
    ///
    /// Proxies are disabled: the service is link-local.
    pub fn from_config(config: &MetadataConfig) -> Result<Self, BindError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .no_proxy()
            .user_agent(concat!("eip-binder/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| BindError::Config {
                reason: format!("Failed to build metadata HTTP client: {}", e),
            })?;

        Ok(Self::new(http, config.endpoint.as_str()).with_token_ttl(config.token_ttl.as_secs()))
    }

    pub fn with_token_ttl(mut self, secs: u64) -> Self {
        self.token_ttl_secs = secs;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn url(&self, path: &str) -> String {
        format!("{}/latest/{}", self.endpoint, path.trim_start_matches('/'))
    }

    async fn read_body(path: &str, response: reqwest::Response) -> Result<String, MetadataError> {
        let status = response.status();
        if !status.is_success() {
            return Err(MetadataError::Status {
                path: path.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(|e| MetadataError::Request {
            path: path.to_string(),
            reason: format!("failed to read body: {}", e),
        })
    }
}

#[async_trait]
impl MetadataClient for ImdsClient {
    #[instrument(skip(self), fields(endpoint = %self.endpoint))]
    async fn fetch_token(&self) -> Result<String, MetadataError> {
        let response = self
            .http
            .put(self.url(TOKEN_PATH))
            .header(TOKEN_TTL_HEADER, self.token_ttl_secs.to_string())
            .send()
            .await
            .map_err(|e| MetadataError::Request {
                path: TOKEN_PATH.to_string(),
                reason: e.to_string(),
            })?;

        let token = Self::read_body(TOKEN_PATH, response).await?;
        debug!(ttl_secs = self.token_ttl_secs, "acquired metadata token");
        Ok(token)
    }

    #[instrument(skip(self, token), fields(endpoint = %self.endpoint))]
    async fn fetch_metadata(&self, token: &str, path: &str) -> Result<String, MetadataError> {
        let response = self
            .http
            .get(self.url(path))
            .header(TOKEN_HEADER, token)
            .send()
            .await
            .map_err(|e| MetadataError::Request {
                path: path.to_string(),
                reason: e.to_string(),
            })?;

        let value = Self::read_body(path, response).await?;
        debug!(%value, "read metadata");
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joins_under_latest() {
        let client = ImdsClient::new(reqwest::Client::new(), "http://169.254.169.254/");
        assert_eq!(
            client.url("meta-data/instance-id"),
            "http://169.254.169.254/latest/meta-data/instance-id"
        );
        assert_eq!(
            client.url("/api/token"),
            "http://169.254.169.254/latest/api/token"
        );
    }

    #[test]
    fn test_from_config_uses_configured_endpoint_and_ttl() {
        let config = MetadataConfig {
            endpoint: "http://127.0.0.1:9".to_string(),
            token_ttl: std::time::Duration::from_secs(60),
            ..Default::default()
        };
        let client = ImdsClient::from_config(&config).unwrap();
        assert_eq!(client.endpoint(), "http://127.0.0.1:9");
        assert_eq!(client.token_ttl_secs, 60);
    }
}
