//! IMDSv2 client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};

use crate::config::MetadataConfig;

use super::{MetadataError, MetadataKey, MetadataProvider};

/// Header carrying the requested token lifetime.
pub const TOKEN_TTL_HEADER: &str = "X-aws-ec2-metadata-token-ttl-seconds";

/// Header carrying the session token on metadata reads.
pub const TOKEN_HEADER: &str = "X-aws-ec2-metadata-token";

const TOKEN_TARGET: &str = "api/token";

/// Build an HTTP client with the metadata timeout applied to both phases.
fn build_http_client(timeout: Duration) -> Result<Client, MetadataError> {
    Client::builder()
        .connect_timeout(timeout)
        .timeout(timeout)
        .build()
        .map_err(MetadataError::Client)
}

/// Client for the EC2 instance metadata service (token-based, v2).
#[derive(Debug, Clone)]
pub struct ImdsClient {
    client: Client,
    endpoint: String,
    token_ttl_secs: u32,
}

impl ImdsClient {
    /// Create a new client.
    ///
    /// # Errors
    ///
    /// Returns `MetadataError::Client` if the HTTP client cannot be built.
    pub fn new(
        endpoint: impl Into<String>,
        token_ttl_secs: u32,
        timeout: Duration,
    ) -> Result<Self, MetadataError> {
        Ok(Self {
            client: build_http_client(timeout)?,
            endpoint: endpoint.into(),
            token_ttl_secs,
        })
    }

    /// Create a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns `MetadataError::Client` if the HTTP client cannot be built.
    pub fn from_config(config: &MetadataConfig) -> Result<Self, MetadataError> {
        Self::new(
            config.endpoint.clone(),
            config.token_ttl_secs,
            Duration::from_secs(config.timeout_secs),
        )
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn url(&self, path: &str) -> String {
        format!("{}/latest/{path}", self.endpoint.trim_end_matches('/'))
    }

    async fn send_text(
        request: RequestBuilder,
        target: &'static str,
    ) -> Result<String, MetadataError> {
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                MetadataError::Timeout { target }
            } else {
                MetadataError::Request { target, source: e }
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(MetadataError::Status { target, status });
        }

        let text = response
            .text()
            .await
            .map_err(|e| MetadataError::Request { target, source: e })?;
        let value = text.trim();
        if value.is_empty() {
            return Err(MetadataError::Empty { target });
        }
        Ok(value.to_string())
    }
}

#[async_trait]
impl MetadataProvider for ImdsClient {
    async fn acquire_token(&self) -> Result<String, MetadataError> {
        let request = self
            .client
            .put(self.url(TOKEN_TARGET))
            .header(TOKEN_TTL_HEADER, self.token_ttl_secs.to_string());

        let token = Self::send_text(request, TOKEN_TARGET).await?;
        tracing::debug!(ttl_secs = self.token_ttl_secs, "Acquired metadata token");
        Ok(token)
    }

    async fn fetch(&self, token: &str, key: MetadataKey) -> Result<String, MetadataError> {
        let request = self
            .client
            .get(self.url(&format!("meta-data/{}", key.path())))
            .header(TOKEN_HEADER, token);

        Self::send_text(request, key.path()).await
    }
}
